//! parley_graph: conversation documents as editable dialogue graphs.
//!
//! A conversation is a YAML mapping of named sections:
//! - `__option__` holds document metadata and is carried through untouched
//! - every other section with `npc` and/or `player` becomes a graph node
//! - a player option whose `then` is exactly `goto <node>` becomes an edge
//!
//! [`decode_document`] turns a document into a [`Graph`], [`encode_graph`]
//! turns an edited graph back into a document. Both are pure functions over
//! their inputs.

pub mod config;
pub mod decode;
pub mod encode;
pub mod layout;
pub mod lint;
pub mod script;

pub use config::{ParleyConfig, load_config, try_load_config};
pub use decode::{decode_document, decode_str};
pub use encode::{
    EncodeConfig, EncodeWarning, Encoded, OptionAction, encode_graph, encode_to_string, resolve_option_action,
};
pub use layout::LayoutConfig;
pub use lint::{LintIssue, lint_graph};
pub use parley_data::{DialogueNode, Edge, Graph, PassthroughSection, PlayerOption, Position};

use thiserror::Error;

/// Errors that abort a single decode or encode call.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("conversation document must be a mapping of sections, found {found}")]
    NotAMapping { found: &'static str },
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
