//! Editor-facing checks layered on top of structural validation.

use std::fmt;

use parley_data::{Graph, ValidationError, validate_graph};

use crate::script::is_goto_identifier;

/// Problem worth showing an author before saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintIssue {
    /// Broken identity or reference (includes unresolved goto targets).
    Invalid(ValidationError),
    /// Connections into this node would be written as a goto that does not decode back into an edge.
    UnreachableByGoto { node: String },
    /// `npc` is not plain text lines; it is saved as written unless its lines are edited.
    VerbatimNpc { node: String },
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintIssue::Invalid(err) => write!(f, "{err}"),
            LintIssue::UnreachableByGoto { node } => {
                write!(f, "node id '{node}' is not a plain identifier; goto connections to it will not reload")
            },
            LintIssue::VerbatimNpc { node } => {
                write!(f, "npc of node '{node}' is not a list of text lines; editing its lines replaces it")
            },
        }
    }
}

/// Validate the graph and flag nodes the editor cannot fully round-trip.
pub fn lint_graph(graph: &Graph) -> Vec<LintIssue> {
    let mut issues: Vec<LintIssue> = validate_graph(graph).into_iter().map(LintIssue::Invalid).collect();
    for node in &graph.nodes {
        if !node.id.trim().is_empty() && !is_goto_identifier(&node.id) {
            issues.push(LintIssue::UnreachableByGoto { node: node.id.clone() });
        }
        if node.raw_npc.is_some() {
            issues.push(LintIssue::VerbatimNpc { node: node.id.clone() });
        }
    }
    issues
}
