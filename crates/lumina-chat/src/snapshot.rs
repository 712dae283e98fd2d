use serde::Serialize;

use lumina_core::models::concept_graph::ConceptGraph;
use lumina_core::models::message::Message;
use lumina_core::models::subject::Subject;

/// A point-in-time view of the conversation, published to the shell on
/// every mutation. During a stream these snapshots are monotonic: the
/// streaming message's text only grows and its grounding URL set only
/// grows, until the turn settles.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineSnapshot {
    pub messages: Vec<Message>,
    pub active_subject: Subject,
    pub concept_graph: Option<ConceptGraph>,
    /// True while a primary generation (text stream or image) is in flight.
    pub busy: bool,
    pub total_sessions: u64,
}
