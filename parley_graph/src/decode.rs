//! Document → graph.
//!
//! Dialogue sections become nodes in document order, `goto` fragments become
//! edges, and everything the graph does not model is kept aside so encoding
//! can write it back.

use log::{debug, warn};
use parley_data::{
    DialogueNode, Edge, Graph, METADATA_KEY, NodeId, PassthroughSection, PlayerOption, Position, REPLY_PLACEHOLDER,
    key_text,
};
use serde_yaml::{Mapping, Value};

use crate::GraphError;
use crate::layout::LayoutConfig;
use crate::script::goto_target_value;

const NPC_KEY: &str = "npc";
const PLAYER_KEY: &str = "player";
const REPLY_KEY: &str = "reply";
const THEN_KEY: &str = "then";

/// Parse YAML text and decode it.
///
/// # Errors
/// Returns [`GraphError::Yaml`] for syntax errors and [`GraphError::NotAMapping`]
/// if the top level is not a mapping.
pub fn decode_str(text: &str, layout: &LayoutConfig) -> Result<Graph, GraphError> {
    let document: Value = serde_yaml::from_str(text)?;
    decode_document(&document, layout)
}

/// Decode a structured conversation document into nodes and edges.
///
/// Edges are inferred for every option whose `then` is exactly `goto <id>`,
/// whether or not `<id>` names a node in this document.
///
/// # Errors
/// Returns [`GraphError::NotAMapping`] if `document` is not a key-value mapping.
///
/// ```
/// use parley_graph::{LayoutConfig, decode_str};
///
/// let graph = decode_str(
///     "start:\n  npc: Hi\n  player:\n    - reply: Bye\n      then: goto end\n",
///     &LayoutConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(graph.nodes[0].npc_lines, vec!["Hi".to_string()]);
/// assert_eq!(graph.edges[0].target, "end");
/// ```
pub fn decode_document(document: &Value, layout: &LayoutConfig) -> Result<Graph, GraphError> {
    // An empty file deserializes to null; treat it as an empty document.
    if document.is_null() {
        return Ok(Graph::default());
    }
    let entries = document.as_mapping().ok_or(GraphError::NotAMapping {
        found: value_kind(document),
    })?;

    let mut graph = Graph::default();
    let mut positions = layout.grid();
    let mut previous: Option<NodeId> = None;

    for (key, section) in entries {
        if key.as_str() == Some(METADATA_KEY) {
            graph.metadata = Some(section.clone());
            continue;
        }
        let Some(id) = key_text(key).filter(|_| is_dialogue_section(section)) else {
            debug!("keeping non-dialogue entry {key:?} as passthrough");
            graph.passthrough.push(PassthroughSection {
                key: key.clone(),
                value: section.clone(),
                after: previous.clone(),
            });
            continue;
        };
        let position = positions.next().unwrap_or_default();
        let mut node = decode_node(&id, section, position);
        if !key.is_string() {
            node.source_key = Some(key.clone());
        }
        graph
            .edges
            .extend(node.options.iter().filter_map(|option| inferred_edge(&node, option)));
        previous = Some(id);
        graph.nodes.push(node);
    }

    debug!(
        "decoded {} nodes, {} edges, {} passthrough entries",
        graph.nodes.len(),
        graph.edges.len(),
        graph.passthrough.len()
    );
    Ok(graph)
}

fn is_dialogue_section(section: &Value) -> bool {
    section
        .as_mapping()
        .is_some_and(|map| map.contains_key(NPC_KEY) || map.contains_key(PLAYER_KEY))
}

fn decode_node(id: &str, section: &Value, position: Position) -> DialogueNode {
    let mut node = DialogueNode::new(id, position);
    let Some(map) = section.as_mapping() else {
        return node;
    };

    for (key, value) in map {
        match key.as_str() {
            Some(NPC_KEY) => {
                node.npc_lines = npc_text(value);
                if !is_plain_npc(value) {
                    debug!("node '{id}': keeping npc {value:?} as written");
                    node.raw_npc = Some(value.clone());
                }
            },
            Some(PLAYER_KEY) => node.options = player_options(id, value),
            _ => {
                node.extra.insert(key.clone(), value.clone());
            },
        }
    }
    node
}

/// Editable lines of an `npc` value; items that are not scalars have no line.
pub(crate) fn npc_text(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(lines) => lines.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// Null, one string, or a list of strings; anything else is kept verbatim.
fn is_plain_npc(value: &Value) -> bool {
    match value {
        Value::Null | Value::String(_) => true,
        Value::Sequence(lines) => lines.iter().all(Value::is_string),
        _ => false,
    }
}

fn player_options(node: &str, value: &Value) -> Vec<PlayerOption> {
    let Value::Sequence(entries) = value else {
        if !value.is_null() {
            warn!("node '{node}': `player` is not a sequence, treating node as terminal");
        }
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let id = format!("{node}-opt-{index}");
            match entry {
                Value::Mapping(map) => Some(decode_option(id, map)),
                // A bare string entry is shorthand for a reply without a script.
                Value::String(reply) => Some(PlayerOption::new(id, reply.clone())),
                other => {
                    warn!("node '{node}': skipping malformed player option {other:?}");
                    None
                },
            }
        })
        .collect()
}

fn decode_option(id: String, map: &Mapping) -> PlayerOption {
    let mut option = PlayerOption::new(id, REPLY_PLACEHOLDER);
    for (key, value) in map {
        match key.as_str() {
            Some(REPLY_KEY) => {
                if let Some(text) = scalar_text(value) {
                    option.text = text;
                }
            },
            Some(THEN_KEY) => {
                if !value.is_null() {
                    option.then = Some(value.clone());
                }
            },
            _ => {
                option.extra.insert(key.clone(), value.clone());
            },
        }
    }
    option
}

fn inferred_edge(node: &DialogueNode, option: &PlayerOption) -> Option<Edge> {
    let target = option.then.as_ref().and_then(goto_target_value)?;
    Some(Edge::new(node.id.clone(), option.id.clone(), target))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Graph {
        decode_str(text, &LayoutConfig::default()).expect("decode ok")
    }

    #[test]
    fn non_mapping_documents_are_rejected() {
        let err = decode_str("- a\n- b\n", &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, GraphError::NotAMapping { found: "a sequence" }));
        assert!(err.to_string().contains("a sequence"));
    }

    #[test]
    fn empty_document_decodes_to_empty_graph() {
        assert_eq!(decode(""), Graph::default());
    }

    #[test]
    fn options_get_positional_ids_and_placeholder_text() {
        let graph = decode(
            r#"
ask:
  npc: [One, Two]
  player:
    - reply: First
    - then: give diamond
    - Plain
"#,
        );
        let node = &graph.nodes[0];
        let ids: Vec<&str> = node.options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["ask-opt-0", "ask-opt-1", "ask-opt-2"]);
        assert_eq!(node.options[1].text, REPLY_PLACEHOLDER);
        assert_eq!(node.options[1].then, Some(Value::from("give diamond")));
        assert_eq!(node.options[2].text, "Plain");
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn sections_without_npc_or_player_are_passed_through() {
        let graph = decode(
            r#"
switch_0:
  when:
    - if: "check"
      open: other
hello:
  player: []
"#,
        );
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "hello");
        assert_eq!(graph.passthrough[0].key, Value::from("switch_0"));
        assert_eq!(graph.passthrough[0].after, None);
    }

    #[test]
    fn passthrough_remembers_the_preceding_node() {
        let graph = decode("a: {npc: x}
switch_0: {when: []}
b: {npc: y}
tail: 3
");
        let anchors: Vec<Option<&str>> = graph.passthrough.iter().map(|s| s.after.as_deref()).collect();
        assert_eq!(anchors, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn scalar_keys_name_nodes() {
        let graph = decode("404:\n  npc: [Lost]\n  player: []\ntrue:\n  npc: Yes\n");
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.passthrough.is_empty());
        assert_eq!(graph.nodes[0].id, "404");
        assert_eq!(graph.nodes[0].source_key.as_ref().and_then(Value::as_u64), Some(404));
        assert_eq!(graph.nodes[1].id, "true");
    }

    #[test]
    fn structured_npc_is_kept_as_written() {
        let graph = decode("a:\n  npc: {text: Hi, delay: 3}\nb:\n  npc: [Hello, {wait: 2}, 7]\nc:\n  npc: [Plain]\n");
        let a = &graph.nodes[0];
        assert!(a.npc_lines.is_empty());
        assert!(a.raw_npc.as_ref().is_some_and(Value::is_mapping));

        let b = &graph.nodes[1];
        assert_eq!(b.npc_lines, vec!["Hello".to_string(), "7".to_string()]);
        assert!(b.raw_npc.is_some());

        assert_eq!(graph.nodes[2].raw_npc, None);
    }

    #[test]
    fn nodes_are_placed_on_the_grid_in_order() {
        let graph = decode("a: {npc: x}\nskip: 3\nb: {npc: y}\n");
        assert_eq!(graph.nodes[0].position, Position::new(100.0, 100.0));
        assert_eq!(graph.nodes[1].position, Position::new(450.0, 100.0));
    }

    #[test]
    fn forward_references_still_produce_edges() {
        let graph = decode("a:\n  player:\n    - reply: go\n      then: goto not_written_yet\n");
        assert_eq!(graph.edges, vec![Edge::new("a", "a-opt-0", "not_written_yet")]);
    }
}
