//! Graph → document.
//!
//! Each option's `then` is resolved once into an [`OptionAction`]: a drawn
//! connection wins, an author's non-goto script is preserved, and a goto
//! whose connection was removed is dropped.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::warn;
use parley_data::{DialogueNode, Edge, Graph, METADATA_KEY, PassthroughSection, PlayerOption, key_text};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::GraphError;
use crate::decode::npc_text;
use crate::script::{goto_script, goto_target_value};

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Emit `default_metadata` when the graph carries none.
    pub emit_default_metadata: bool,
    /// `__option__` value written for graphs decoded without one.
    pub default_metadata: Value,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        let mut metadata = Mapping::new();
        metadata.insert("theme".into(), "chat".into());
        metadata.insert("title".into(), "{name}".into());
        Self {
            emit_default_metadata: true,
            default_metadata: Value::Mapping(metadata),
        }
    }
}

/// What to write as an option's `then`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionAction<'a> {
    /// A connection leads to this existing node.
    Goto(&'a str),
    /// No connection; the loaded script is not a goto and is kept verbatim.
    Preserve(&'a Value),
    /// A connection leads to a node that is not in the graph; nothing is written.
    Dangling(&'a str),
    /// Nothing to write.
    Omit,
}

impl OptionAction<'_> {
    /// Value for the `then` key, if one is written.
    pub fn then_value(&self) -> Option<Value> {
        match self {
            OptionAction::Goto(target) => Some(Value::String(goto_script(target))),
            OptionAction::Preserve(script) => Some((*script).clone()),
            OptionAction::Dangling(_) | OptionAction::Omit => None,
        }
    }
}

/// Decide the `then` content for one option.
///
/// `edge` is the connection leaving the option (if any) and `target_exists`
/// says whether its target is a node of the graph being encoded.
pub fn resolve_option_action<'a>(
    option: &'a PlayerOption,
    edge: Option<&'a Edge>,
    target_exists: bool,
) -> OptionAction<'a> {
    match (edge, &option.then) {
        (Some(edge), _) if target_exists => OptionAction::Goto(&edge.target),
        (Some(edge), _) => OptionAction::Dangling(&edge.target),
        (None, Some(script)) if goto_target_value(script).is_none() => OptionAction::Preserve(script),
        (None, _) => OptionAction::Omit,
    }
}

/// Irregularity the encoder degraded around instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeWarning {
    /// Edge target is not a node; the option was written without `then`.
    DanglingEdge { node: String, option: String, target: String },
    /// More than one edge leaves the option; the first one was used.
    DuplicateEdge { node: String, option: String },
    /// Edge source node or option does not exist; the edge was ignored.
    OrphanEdge { node: String, option: String },
    /// Two nodes share an id; the later one replaced the earlier section.
    DuplicateNode { id: String },
    /// A passthrough entry uses a node's id; the node was kept.
    ShadowedSection { key: String },
    /// Edited lines replaced an `npc` value that was kept as written.
    NpcReplaced { node: String },
}

impl fmt::Display for EncodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeWarning::DanglingEdge { node, option, target } => {
                write!(f, "option '{option}' of node '{node}' points at missing node '{target}'")
            },
            EncodeWarning::DuplicateEdge { node, option } => {
                write!(f, "option '{option}' of node '{node}' has several connections; kept the first")
            },
            EncodeWarning::OrphanEdge { node, option } => {
                write!(f, "connection from unknown option '{option}' of node '{node}' ignored")
            },
            EncodeWarning::DuplicateNode { id } => write!(f, "node id '{id}' used more than once; last one wins"),
            EncodeWarning::ShadowedSection { key } => {
                write!(f, "unmodelled section '{key}' shares a node id and was dropped")
            },
            EncodeWarning::NpcReplaced { node } => {
                write!(f, "structured npc of node '{node}' was replaced by its edited lines")
            },
        }
    }
}

/// Encoder output: the new document and whatever was degraded on the way.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub document: Value,
    pub warnings: Vec<EncodeWarning>,
}

/// Encode a graph into a conversation document.
///
/// Metadata comes first, then nodes in list order. Each passthrough entry is
/// written right after the node it followed when decoded (or before the first
/// node); entries whose node is gone go last. Never fails; irregular input is
/// reported in [`Encoded::warnings`].
pub fn encode_graph(graph: &Graph, config: &EncodeConfig) -> Encoded {
    let mut warnings = Vec::new();
    let mut document = Mapping::new();

    if let Some(metadata) = &graph.metadata {
        document.insert(METADATA_KEY.into(), metadata.clone());
    } else if config.emit_default_metadata && !config.default_metadata.is_null() {
        document.insert(METADATA_KEY.into(), config.default_metadata.clone());
    }

    let index = EdgeIndex::build(graph, &mut warnings);
    let node_keys: Vec<Value> = graph.nodes.iter().map(DialogueNode::section_key).collect();
    let mut sections = Passthrough {
        node_keys: &node_keys,
        anchored: HashSet::new(),
    };

    sections.write_after(None, graph, &mut document, &mut warnings);
    for (node, key) in graph.nodes.iter().zip(&node_keys) {
        if document.contains_key(key) {
            warnings.push(EncodeWarning::DuplicateNode { id: node.id.clone() });
        }
        let section = encode_node(node, &index, &mut warnings);
        document.insert(key.clone(), Value::Mapping(section));
        sections.write_after(Some(node.id.as_str()), graph, &mut document, &mut warnings);
    }
    for section in graph
        .passthrough
        .iter()
        .filter(|section| section.after.as_deref().is_some_and(|after| !index.has_node(after)))
    {
        sections.write(section, &mut document, &mut warnings);
    }

    for warning in &warnings {
        warn!("{warning}");
    }

    Encoded {
        document: Value::Mapping(document),
        warnings,
    }
}

/// Places passthrough entries between the node sections.
struct Passthrough<'a> {
    node_keys: &'a [Value],
    anchored: HashSet<Option<&'a str>>,
}

impl<'a> Passthrough<'a> {
    /// Write the entries anchored after `node`, once per anchor.
    fn write_after(
        &mut self,
        node: Option<&'a str>,
        graph: &'a Graph,
        document: &mut Mapping,
        warnings: &mut Vec<EncodeWarning>,
    ) {
        if !self.anchored.insert(node) {
            return;
        }
        for section in graph.passthrough.iter().filter(|section| section.after.as_deref() == node) {
            self.write(section, document, warnings);
        }
    }

    fn write(&self, section: &PassthroughSection, document: &mut Mapping, warnings: &mut Vec<EncodeWarning>) {
        if self.node_keys.contains(&section.key) || document.contains_key(&section.key) {
            warnings.push(EncodeWarning::ShadowedSection {
                key: key_text(&section.key).unwrap_or_else(|| format!("{:?}", section.key)),
            });
            return;
        }
        document.insert(section.key.clone(), section.value.clone());
    }
}

/// Encode a graph and render the document as YAML text.
///
/// # Errors
/// Returns [`GraphError::Yaml`] if serialization fails.
pub fn encode_to_string(graph: &Graph, config: &EncodeConfig) -> Result<(String, Vec<EncodeWarning>), GraphError> {
    let Encoded { document, warnings } = encode_graph(graph, config);
    Ok((serde_yaml::to_string(&document)?, warnings))
}

fn encode_node(node: &DialogueNode, index: &EdgeIndex<'_>, warnings: &mut Vec<EncodeWarning>) -> Mapping {
    let mut section = Mapping::new();
    let npc = match &node.raw_npc {
        Some(raw) if npc_text(raw) == node.npc_lines => raw.clone(),
        raw => {
            if raw.is_some() {
                warnings.push(EncodeWarning::NpcReplaced { node: node.id.clone() });
            }
            Value::Sequence(node.npc_lines.iter().cloned().map(Value::String).collect())
        },
    };
    section.insert("npc".into(), npc);

    let options = node
        .options
        .iter()
        .map(|option| {
            let edge = index.edge_from(&node.id, &option.id);
            let target_exists = edge.is_some_and(|edge| index.has_node(&edge.target));
            let action = resolve_option_action(option, edge, target_exists);
            if let OptionAction::Dangling(target) = action {
                warnings.push(EncodeWarning::DanglingEdge {
                    node: node.id.clone(),
                    option: option.id.clone(),
                    target: target.to_string(),
                });
            }
            Value::Mapping(encode_option(option, &action))
        })
        .collect();
    section.insert("player".into(), Value::Sequence(options));

    for (key, value) in &node.extra {
        section.insert(key.clone(), value.clone());
    }
    section
}

fn encode_option(option: &PlayerOption, action: &OptionAction<'_>) -> Mapping {
    let mut entry = Mapping::new();
    entry.insert("reply".into(), Value::String(option.text.clone()));
    for (key, value) in &option.extra {
        entry.insert(key.clone(), value.clone());
    }
    if let Some(then) = action.then_value() {
        entry.insert("then".into(), then);
    }
    entry
}

/// Lookup of the connection leaving each option, built once per encode.
struct EdgeIndex<'a> {
    nodes: HashSet<&'a str>,
    outgoing: HashMap<&'a str, HashMap<&'a str, &'a Edge>>,
}

impl<'a> EdgeIndex<'a> {
    fn build(graph: &'a Graph, warnings: &mut Vec<EncodeWarning>) -> Self {
        let nodes: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        let mut outgoing: HashMap<&str, HashMap<&str, &Edge>> = HashMap::new();
        for edge in &graph.edges {
            let known_source = graph
                .node(&edge.source)
                .is_some_and(|node| node.option(&edge.source_option).is_some());
            if !known_source {
                warnings.push(EncodeWarning::OrphanEdge {
                    node: edge.source.clone(),
                    option: edge.source_option.clone(),
                });
                continue;
            }
            let from_node = outgoing.entry(edge.source.as_str()).or_default();
            if from_node.contains_key(edge.source_option.as_str()) {
                warnings.push(EncodeWarning::DuplicateEdge {
                    node: edge.source.clone(),
                    option: edge.source_option.clone(),
                });
                continue;
            }
            from_node.insert(edge.source_option.as_str(), edge);
        }
        Self { nodes, outgoing }
    }

    fn edge_from(&self, node: &str, option: &str) -> Option<&'a Edge> {
        self.outgoing.get(node)?.get(option).copied()
    }

    fn has_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }
}
