//! lumina-chat
//!
//! The conversation core: [`controller::ConversationController`] owns the
//! message timeline and session counters, orchestrates chat and
//! image-generation turns against a [`lumina_gemini::provider::TutorProvider`],
//! and schedules concept-graph extraction as a fire-and-forget side effect.

pub mod controller;
pub mod error;
pub mod snapshot;

pub use controller::{ConversationController, TurnOutcome};
pub use error::ChatError;
pub use snapshot::TimelineSnapshot;
