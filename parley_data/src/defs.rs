use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Identifier of a dialogue node. Doubles as the section key in the document.
pub type NodeId = String;

/// Identifier of a player option, unique only within its owning node.
pub type OptionId = String;

/// Reserved top-level key holding document metadata (theme, title template).
pub const METADATA_KEY: &str = "__option__";

/// Reply text used when an option entry has no `reply`.
pub const REPLY_PLACEHOLDER: &str = "...";

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// In-memory dialogue graph exchanged with the editing surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Raw value of the `__option__` entry, if the document had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub nodes: Vec<DialogueNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Top-level entries that are neither metadata nor dialogue sections, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passthrough: Vec<PassthroughSection>,
}

/// A top-level entry the graph does not model, such as a `when` switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassthroughSection {
    pub key: Value,
    pub value: Value,
    /// Node this entry followed in the document; `None` puts it before the first node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<NodeId>,
}

/// One conversation turn: NPC lines followed by the player's choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub npc_lines: Vec<String>,
    /// Empty when the conversation ends at this node.
    #[serde(default)]
    pub options: Vec<PlayerOption>,
    /// `npc` value as written when it is not a plain string or list of strings.
    /// Written back verbatim as long as `npc_lines` still matches its text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_npc: Option<Value>,
    /// Original section key when it was not a string (e.g. `404:`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<Value>,
    /// Section keys other than `npc` and `player`, carried through untouched.
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// A player-selectable reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerOption {
    pub id: OptionId,
    pub text: String,
    /// The `then` script exactly as loaded; kept even when it is not a goto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Value>,
    /// Option keys other than `reply` and `then` (e.g. an `if` condition).
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// Directed link from a specific option to the node it leads to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub source_option: OptionId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, source_option: impl Into<OptionId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            source_option: source_option.into(),
            target: target.into(),
        }
    }

    /// Display id in the form used by the canvas (`e-<option>-<target>`).
    pub fn id(&self) -> String {
        format!("e-{}-{}", self.source_option, self.target)
    }

    /// True if this edge starts at the given option.
    pub fn starts_at(&self, node: &str, option: &str) -> bool {
        self.source == node && self.source_option == option
    }
}

impl DialogueNode {
    /// Create an empty (terminal, silent) node.
    pub fn new(id: impl Into<NodeId>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            npc_lines: Vec::new(),
            options: Vec::new(),
            raw_npc: None,
            source_key: None,
            extra: Mapping::new(),
        }
    }

    /// Key this node is written under: the original key while it still spells the id.
    pub fn section_key(&self) -> Value {
        match &self.source_key {
            Some(key) if key_text(key).as_deref() == Some(self.id.as_str()) => key.clone(),
            _ => Value::String(self.id.clone()),
        }
    }

    pub fn option(&self, id: &str) -> Option<&PlayerOption> {
        self.options.iter().find(|opt| opt.id == id)
    }

    pub fn is_terminal(&self) -> bool {
        self.options.is_empty()
    }
}

impl PlayerOption {
    pub fn new(id: impl Into<OptionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            then: None,
            extra: Mapping::new(),
        }
    }

    /// Attach a raw `then` script.
    pub fn with_then(mut self, script: impl Into<Value>) -> Self {
        self.then = Some(script.into());
        self
    }
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&DialogueNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut DialogueNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// True if `id` is used by a node or spelled by a passthrough key.
    pub fn is_key_taken(&self, id: &str) -> bool {
        self.contains_node(id)
            || self
                .passthrough
                .iter()
                .any(|section| key_text(&section.key).as_deref() == Some(id))
    }

    /// First edge leaving the given option, if any.
    pub fn edge_from(&self, node: &str, option: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.starts_at(node, option))
    }
}

/// Text of a scalar section key; `404` and `true` spell `"404"` and `"true"`.
pub fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
