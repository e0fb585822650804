//! Shared dialogue graph model for Parley conversation tooling.

pub mod defs;
pub mod edit;
pub mod validate;

pub use defs::*;
pub use edit::EditError;
pub use validate::{ValidationError, validate_graph};
