//! Recognition of the one script shape the editor understands: `goto <node>`.
//!
//! Everything else in a `then` fragment is opaque text.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

static GOTO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*goto\s+([A-Za-z0-9_]+)\s*$").expect("goto pattern compiles"));

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier pattern compiles"));

/// Target node of a script that is exactly a goto fragment.
///
/// ```
/// use parley_graph::script::goto_target;
///
/// assert_eq!(goto_target("  goto roomB\n"), Some("roomB"));
/// assert_eq!(goto_target("goto roomB extra tokens"), None);
/// assert_eq!(goto_target("Goto roomB"), None);
/// ```
pub fn goto_target(script: &str) -> Option<&str> {
    GOTO_PATTERN
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Like [`goto_target`], for a raw `then` value. Non-string values never match.
pub fn goto_target_value(value: &Value) -> Option<&str> {
    value.as_str().and_then(goto_target)
}

/// Script text for a transition to `target`.
pub fn goto_script(target: &str) -> String {
    format!("goto {target}")
}

/// True if `id` can appear as a goto target and be recognized again on decode.
pub fn is_goto_identifier(id: &str) -> bool {
    IDENTIFIER.is_match(id)
}
