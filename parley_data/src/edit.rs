//! Editing operations that keep a Graph's identity and edge invariants intact.
//!
//! The canvas can mutate `Graph` fields directly, but going through these
//! helpers guarantees unique node ids, per-node unique option ids, at most one
//! outgoing edge per option, and no edges touching removed nodes or options.

use std::fmt;

use crate::*;

/// NPC line given to nodes created with [`Graph::add_node`].
pub const NEW_NODE_LINE: &str = "Hello!";

/// Reply given to options created alongside a new node.
pub const NEW_NODE_REPLY: &str = "Hi there";

/// Rejected graph edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    UnknownNode { id: String },
    UnknownOption { node: String, option: String },
    DuplicateNode { id: String },
    InvalidNodeId { id: String, reason: &'static str },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::UnknownNode { id } => write!(f, "no node with id '{id}'"),
            EditError::UnknownOption { node, option } => {
                write!(f, "node '{node}' has no option '{option}'")
            },
            EditError::DuplicateNode { id } => write!(f, "section key '{id}' is already in use"),
            EditError::InvalidNodeId { id, reason } => write!(f, "invalid node id '{id}': {reason}"),
        }
    }
}

impl std::error::Error for EditError {}

impl Graph {
    /// Smallest `node_<n>` id not used by a node or a passthrough section.
    pub fn fresh_node_id(&self) -> NodeId {
        (1..)
            .map(|n| format!("node_{n}"))
            .find(|id| !self.is_key_taken(id))
            .unwrap_or_default()
    }

    /// Append a template node at `position` and return its id.
    pub fn add_node(&mut self, position: Position) -> NodeId {
        let id = self.fresh_node_id();
        let mut node = DialogueNode::new(id.clone(), position);
        node.npc_lines.push(NEW_NODE_LINE.to_string());
        node.options.push(PlayerOption::new(node.fresh_option_id(), NEW_NODE_REPLY));
        self.nodes.push(node);
        id
    }

    /// Rename a node, rewriting every edge that starts or ends at it.
    ///
    /// # Errors
    /// Fails if `old` does not exist, or `new` is empty, reserved, or already
    /// taken by a node or passthrough section.
    pub fn rename_node(&mut self, old: &str, new: &str) -> Result<(), EditError> {
        if old == new {
            return if self.contains_node(old) {
                Ok(())
            } else {
                Err(EditError::UnknownNode { id: old.to_string() })
            };
        }
        check_node_id(new)?;
        if self.is_key_taken(new) {
            return Err(EditError::DuplicateNode { id: new.to_string() });
        }
        let node = self.node_mut(old).ok_or_else(|| EditError::UnknownNode { id: old.to_string() })?;
        node.id = new.to_string();

        for section in &mut self.passthrough {
            if section.after.as_deref() == Some(old) {
                section.after = Some(new.to_string());
            }
        }
        for edge in &mut self.edges {
            if edge.source == old {
                edge.source = new.to_string();
            }
            if edge.target == old {
                edge.target = new.to_string();
            }
        }
        Ok(())
    }

    /// Remove a node together with its incoming and outgoing edges.
    ///
    /// Passthrough sections that followed the node move up to its predecessor.
    ///
    /// # Errors
    /// Fails if the node does not exist.
    pub fn remove_node(&mut self, id: &str) -> Result<DialogueNode, EditError> {
        let index = self
            .nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or_else(|| EditError::UnknownNode { id: id.to_string() })?;
        self.edges.retain(|edge| edge.source != id && edge.target != id);
        let removed = self.nodes.remove(index);

        if !self.contains_node(id) {
            let predecessor = index.checked_sub(1).map(|prev| self.nodes[prev].id.clone());
            for section in &mut self.passthrough {
                if section.after.as_deref() == Some(id) {
                    section.after = predecessor.clone();
                }
            }
        }
        Ok(removed)
    }

    /// Move a node on the canvas.
    ///
    /// # Errors
    /// Fails if the node does not exist.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), EditError> {
        let node = self.node_mut(id).ok_or_else(|| EditError::UnknownNode { id: id.to_string() })?;
        node.position = position;
        Ok(())
    }

    /// Append an option with a fresh node-scoped id.
    ///
    /// # Errors
    /// Fails if the node does not exist.
    pub fn add_option(&mut self, node: &str, text: impl Into<String>) -> Result<OptionId, EditError> {
        let owner = self.node_mut(node).ok_or_else(|| EditError::UnknownNode { id: node.to_string() })?;
        let id = owner.fresh_option_id();
        owner.options.push(PlayerOption::new(id.clone(), text));
        Ok(id)
    }

    /// Remove an option and the edge leaving it.
    ///
    /// # Errors
    /// Fails if the node or the option does not exist.
    pub fn remove_option(&mut self, node: &str, option: &str) -> Result<PlayerOption, EditError> {
        let owner = self.node_mut(node).ok_or_else(|| EditError::UnknownNode { id: node.to_string() })?;
        let index = owner
            .options
            .iter()
            .position(|opt| opt.id == option)
            .ok_or_else(|| EditError::UnknownOption {
                node: node.to_string(),
                option: option.to_string(),
            })?;
        let removed = owner.options.remove(index);
        self.edges.retain(|edge| !edge.starts_at(node, option));
        Ok(removed)
    }

    /// Connect an option to a target node, replacing any edge already leaving that option.
    ///
    /// # Errors
    /// Fails if the source option or the target node does not exist.
    pub fn connect(&mut self, node: &str, option: &str, target: &str) -> Result<(), EditError> {
        let owner = self.node(node).ok_or_else(|| EditError::UnknownNode { id: node.to_string() })?;
        if owner.option(option).is_none() {
            return Err(EditError::UnknownOption {
                node: node.to_string(),
                option: option.to_string(),
            });
        }
        if !self.contains_node(target) {
            return Err(EditError::UnknownNode { id: target.to_string() });
        }
        self.edges.retain(|edge| !edge.starts_at(node, option));
        self.edges.push(Edge::new(node, option, target));
        Ok(())
    }

    /// Drop the edge leaving an option, returning it if there was one.
    pub fn disconnect(&mut self, node: &str, option: &str) -> Option<Edge> {
        let index = self.edges.iter().position(|edge| edge.starts_at(node, option))?;
        let removed = self.edges.remove(index);
        self.edges.retain(|edge| !edge.starts_at(node, option));
        Some(removed)
    }
}

impl DialogueNode {
    /// Smallest `<node>-opt-<n>` id not used by this node's options.
    pub fn fresh_option_id(&self) -> OptionId {
        (self.options.len()..)
            .map(|n| format!("{}-opt-{n}", self.id))
            .find(|id| self.option(id).is_none())
            .unwrap_or_default()
    }
}

fn check_node_id(id: &str) -> Result<(), EditError> {
    if id.trim().is_empty() {
        return Err(EditError::InvalidNodeId {
            id: id.to_string(),
            reason: "empty",
        });
    }
    if id == METADATA_KEY {
        return Err(EditError::InvalidNodeId {
            id: id.to_string(),
            reason: "reserved for document metadata",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_yaml::{Mapping, Value};

    use super::*;
    use crate::validate_graph;

    fn two_node_graph() -> Graph {
        let mut graph = Graph::default();
        let first = graph.add_node(Position::new(100.0, 100.0));
        let second = graph.add_node(Position::new(450.0, 100.0));
        graph.connect(&first, "node_1-opt-0", &second).expect("connect");
        graph
    }

    #[test]
    fn add_node_uses_fresh_ids_and_template_content() {
        let graph = two_node_graph();
        assert_eq!(graph.nodes[0].id, "node_1");
        assert_eq!(graph.nodes[1].id, "node_2");
        assert_eq!(graph.nodes[0].npc_lines, vec![NEW_NODE_LINE.to_string()]);
        assert_eq!(graph.nodes[0].options[0].id, "node_1-opt-0");
        assert_eq!(graph.nodes[0].options[0].text, NEW_NODE_REPLY);
        assert!(validate_graph(&graph).is_empty());
    }

    #[test]
    fn fresh_node_id_fills_gaps() {
        let mut graph = two_node_graph();
        graph.remove_node("node_1").expect("remove");
        assert_eq!(graph.fresh_node_id(), "node_1");
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn rename_rewrites_edges() {
        let mut graph = two_node_graph();
        graph.rename_node("node_2", "farewell").expect("rename");
        assert_eq!(graph.edges[0].target, "farewell");
        graph.rename_node("node_1", "greeting").expect("rename");
        assert_eq!(graph.edges[0].source, "greeting");
        assert!(validate_graph(&graph).is_empty());
    }

    #[test]
    fn rename_rejects_taken_and_reserved_ids() {
        let mut graph = two_node_graph();
        assert_eq!(
            graph.rename_node("node_1", "node_2"),
            Err(EditError::DuplicateNode { id: "node_2".into() })
        );
        assert!(matches!(
            graph.rename_node("node_1", METADATA_KEY),
            Err(EditError::InvalidNodeId { .. })
        ));
        assert!(matches!(graph.rename_node("node_1", "  "), Err(EditError::InvalidNodeId { .. })));
        assert_eq!(
            graph.rename_node("missing", "other"),
            Err(EditError::UnknownNode { id: "missing".into() })
        );
    }

    fn graph_with_switch(key: &str, after: Option<&str>) -> Graph {
        let mut graph = two_node_graph();
        graph.passthrough.push(PassthroughSection {
            key: key.into(),
            value: Value::Mapping(Mapping::new()),
            after: after.map(str::to_string),
        });
        graph
    }

    #[test]
    fn new_nodes_avoid_passthrough_keys() {
        let mut graph = graph_with_switch("node_3", None);
        assert_eq!(graph.add_node(Position::default()), "node_4");
        assert!(graph.passthrough.iter().any(|section| section.key == Value::from("node_3")));
    }

    #[test]
    fn rename_rejects_passthrough_keys() {
        let mut graph = graph_with_switch("switch_0", None);
        assert_eq!(
            graph.rename_node("node_1", "switch_0"),
            Err(EditError::DuplicateNode { id: "switch_0".into() })
        );
        assert!(graph.contains_node("node_1"));
    }

    #[test]
    fn passthrough_anchors_follow_renames_and_removals() {
        let mut graph = graph_with_switch("switch_0", Some("node_2"));
        graph.rename_node("node_2", "farewell").expect("rename");
        assert_eq!(graph.passthrough[0].after.as_deref(), Some("farewell"));

        graph.remove_node("farewell").expect("remove");
        assert_eq!(graph.passthrough[0].after.as_deref(), Some("node_1"));
        graph.remove_node("node_1").expect("remove");
        assert_eq!(graph.passthrough[0].after, None);
    }

    #[test]
    fn option_ids_stay_unique_after_removal() {
        let mut graph = two_node_graph();
        let added = graph.add_option("node_1", "Second").expect("add");
        assert_eq!(added, "node_1-opt-1");
        graph.remove_option("node_1", "node_1-opt-0").expect("remove");
        assert!(graph.edges.is_empty());
        let again = graph.add_option("node_1", "Third").expect("add");
        assert_ne!(again, added);
        assert!(validate_graph(&graph).is_empty());
    }

    #[test]
    fn connect_replaces_existing_edge() {
        let mut graph = two_node_graph();
        graph.connect("node_1", "node_1-opt-0", "node_1").expect("connect");
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].target, "node_1");
    }

    #[test]
    fn connect_requires_existing_endpoints() {
        let mut graph = two_node_graph();
        assert!(matches!(
            graph.connect("node_1", "node_1-opt-9", "node_2"),
            Err(EditError::UnknownOption { .. })
        ));
        assert!(matches!(
            graph.connect("node_1", "node_1-opt-0", "nowhere"),
            Err(EditError::UnknownNode { .. })
        ));
    }

    #[test]
    fn disconnect_returns_removed_edge() {
        let mut graph = two_node_graph();
        let edge = graph.disconnect("node_1", "node_1-opt-0").expect("edge");
        assert_eq!(edge.target, "node_2");
        assert!(graph.disconnect("node_1", "node_1-opt-0").is_none());
    }
}
