//! lumina-gemini
//!
//! The AI provider boundary: the [`provider::TutorProvider`] capability
//! trait consumed by the conversation core, and its Google Gemini REST
//! implementation (streaming chat, structured concept-graph generation,
//! image generation).

pub mod chat;
pub mod client;
pub mod error;
pub mod graph;
pub mod image;
pub mod provider;
mod wire;
