//! Concept graph data and the trigger policy that decides when one is
//! extracted from a conversation turn.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::subject::Subject;

/// Minimum settled response length (in characters) before a concept graph is
/// worth extracting.
pub const GRAPH_TEXT_THRESHOLD: usize = 200;

/// Number of leading characters of the user's message used as the graph topic.
pub const TOPIC_MAX_CHARS: usize = 50;

/// A node in a concept graph. `group` ranks importance (1–3); `val` is the
/// display size (5–20).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: String,
    pub group: u8,
    pub val: u8,
}

/// A weighted edge between two concept nodes (weight 1–5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptLink {
    pub source: String,
    pub target: String,
    pub value: u8,
}

/// A node/link structure representing extracted topic relationships.
///
/// At most one graph is current at a time; replacing it discards the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptGraph {
    pub nodes: Vec<ConceptNode>,
    pub links: Vec<ConceptLink>,
}

impl ConceptGraph {
    /// Validate the ranges the generator is asked to honor: node ids
    /// non-empty and unique, `group` in 1–3, `val` in 5–20, link weights in
    /// 1–5, and every link endpoint naming a known node.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut ids = std::collections::HashSet::new();
        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(CoreError::GraphSchema("empty node id".to_string()));
            }
            if !ids.insert(node.id.as_str()) {
                return Err(CoreError::GraphSchema(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
            if !(1..=3).contains(&node.group) {
                return Err(CoreError::GraphSchema(format!(
                    "node {} group {} outside 1..=3",
                    node.id, node.group
                )));
            }
            if !(5..=20).contains(&node.val) {
                return Err(CoreError::GraphSchema(format!(
                    "node {} val {} outside 5..=20",
                    node.id, node.val
                )));
            }
        }
        for link in &self.links {
            if !(1..=5).contains(&link.value) {
                return Err(CoreError::GraphSchema(format!(
                    "link {}->{} value {} outside 1..=5",
                    link.source, link.target, link.value
                )));
            }
            if !ids.contains(link.source.as_str()) || !ids.contains(link.target.as_str()) {
                return Err(CoreError::GraphSchema(format!(
                    "link {}->{} references unknown node",
                    link.source, link.target
                )));
            }
        }
        Ok(())
    }
}

/// Trigger policy: extract a graph iff the subject is Science or History and
/// the settled bot response exceeds [`GRAPH_TEXT_THRESHOLD`] characters.
pub fn should_request_graph(subject: Subject, settled_text_chars: usize) -> bool {
    matches!(subject, Subject::Science | Subject::History)
        && settled_text_chars > GRAPH_TEXT_THRESHOLD
}

/// The topic handed to the generator: the first [`TOPIC_MAX_CHARS`]
/// characters of the triggering user message.
pub fn topic_from_prompt(prompt: &str) -> String {
    prompt.chars().take(TOPIC_MAX_CHARS).collect()
}
