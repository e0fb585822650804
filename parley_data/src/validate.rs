use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::*;

/// Structural problem in a dialogue graph that the editor should surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateNode { id: NodeId },
    /// Two options of one node share an id.
    DuplicateOption { node: NodeId, option: OptionId },
    EmptyNodeId,
    /// Node uses the key reserved for document metadata.
    ReservedNodeId { id: NodeId },
    /// Edge leaves a node that is not in the graph.
    UnknownSourceNode { node: NodeId, option: OptionId },
    /// Edge leaves an option its node does not have.
    UnknownSourceOption { node: NodeId, option: OptionId },
    /// Edge (usually a decoded goto) points at a node that is not in the graph.
    UnresolvedTarget { node: NodeId, option: OptionId, target: NodeId },
    /// More than one edge leaves the same option.
    AmbiguousConnection { node: NodeId, option: OptionId, count: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateNode { id } => write!(f, "node id '{id}' is used more than once"),
            ValidationError::DuplicateOption { node, option } => {
                write!(f, "node '{node}' has more than one option '{option}'")
            },
            ValidationError::EmptyNodeId => write!(f, "a node has an empty id"),
            ValidationError::ReservedNodeId { id } => {
                write!(f, "node id '{id}' is reserved for document metadata")
            },
            ValidationError::UnknownSourceNode { node, option } => {
                write!(f, "connection from option '{option}' starts at missing node '{node}'")
            },
            ValidationError::UnknownSourceOption { node, option } => {
                write!(f, "connection starts at option '{option}', which node '{node}' does not have")
            },
            ValidationError::UnresolvedTarget { node, option, target } => {
                write!(f, "option '{option}' of node '{node}' leads to missing node '{target}'")
            },
            ValidationError::AmbiguousConnection { node, option, count } => {
                write!(f, "option '{option}' of node '{node}' has {count} outgoing connections")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate identity and edge references in a Graph.
///
/// Unresolved goto targets produced by decoding are reported here as missing
/// node references; nothing is removed from the graph.
///
/// ```
/// use parley_data::{DialogueNode, Edge, Graph, PlayerOption, Position, validate_graph};
///
/// let mut start = DialogueNode::new("start", Position::default());
/// start.options.push(PlayerOption::new("start-opt-0", "Bye"));
/// let graph = Graph {
///     nodes: vec![start, DialogueNode::new("end", Position::default())],
///     edges: vec![Edge::new("start", "start-opt-0", "end")],
///     ..Graph::default()
/// };
/// assert!(validate_graph(&graph).is_empty());
/// ```
pub fn validate_graph(graph: &Graph) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut node_ids = HashSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNode { id: node.id.clone() });
        }
        if node.id.trim().is_empty() {
            errors.push(ValidationError::EmptyNodeId);
        } else if node.id == METADATA_KEY {
            errors.push(ValidationError::ReservedNodeId { id: node.id.clone() });
        }

        let mut option_ids = HashSet::new();
        for option in &node.options {
            if !option_ids.insert(option.id.as_str()) {
                errors.push(ValidationError::DuplicateOption {
                    node: node.id.clone(),
                    option: option.id.clone(),
                });
            }
        }
    }

    // Outgoing edge count per (node, option) so ambiguous connections are reported once.
    let mut outgoing: HashMap<(&str, &str), usize> = HashMap::new();
    for edge in &graph.edges {
        match graph.node(&edge.source) {
            None => errors.push(ValidationError::UnknownSourceNode {
                node: edge.source.clone(),
                option: edge.source_option.clone(),
            }),
            Some(node) if node.option(&edge.source_option).is_none() => {
                errors.push(ValidationError::UnknownSourceOption {
                    node: edge.source.clone(),
                    option: edge.source_option.clone(),
                });
            },
            Some(_) => {},
        }
        if !node_ids.contains(edge.target.as_str()) {
            errors.push(ValidationError::UnresolvedTarget {
                node: edge.source.clone(),
                option: edge.source_option.clone(),
                target: edge.target.clone(),
            });
        }
        *outgoing.entry((edge.source.as_str(), edge.source_option.as_str())).or_default() += 1;
    }

    // Report in edge order for stable output.
    let mut reported = HashSet::new();
    for edge in &graph.edges {
        let key = (edge.source.as_str(), edge.source_option.as_str());
        let count = outgoing.get(&key).copied().unwrap_or(0);
        if count > 1 && reported.insert(key) {
            errors.push(ValidationError::AmbiguousConnection {
                node: edge.source.clone(),
                option: edge.source_option.clone(),
                count,
            });
        }
    }

    errors
}
