//! The abstract provider contract consumed by the conversation core.
//!
//! Methods return boxed futures for dyn compatibility; streaming responses
//! are delivered as a strict tagged-union event sequence over a channel,
//! with the conversation controller as the single consumer.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use lumina_core::models::concept_graph::ConceptGraph;
use lumina_core::models::subject::Subject;

use crate::error::ProviderError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Role of a history entry on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

/// One prior committed turn, as sent to the provider.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub text: String,
}

/// An inline image accompanying a chat turn.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Everything the provider needs for one streaming chat turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub subject: Subject,
    pub history: Vec<HistoryEntry>,
    pub text: String,
    pub image: Option<ImagePayload>,
}

/// An image produced by the provider.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// One event of a streaming chat response. The stream yields any number of
/// fragments followed by exactly one terminal event.
#[derive(Debug)]
pub enum StreamEvent {
    /// An incremental slice of the response.
    Fragment {
        text: Option<String>,
        grounding_urls: Vec<String>,
    },
    /// The provider closed the stream normally.
    Completed,
    /// The provider failed mid-stream.
    Failed(ProviderError),
}

/// The receiving half of a streaming chat response. Events arrive in
/// receipt order; the channel closes after the terminal event.
pub struct ChatStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl ChatStream {
    pub fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self { rx }
    }

    /// A connected sender/stream pair, for provider implementations and
    /// test doubles.
    pub fn channel(buffer: usize) -> (mpsc::Sender<StreamEvent>, ChatStream) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }

    /// The next event, or `None` once the channel is closed.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

/// The capability set the conversation core requires from an AI provider.
pub trait TutorProvider: Send + Sync {
    /// Open a streaming conversational response for one turn.
    fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> BoxFuture<'_, Result<ChatStream, ProviderError>>;

    /// Generate a structured concept graph for a topic string. The result
    /// is validated against the graph schema before it is returned.
    fn generate_concept_graph(
        &self,
        topic: &str,
    ) -> BoxFuture<'_, Result<ConceptGraph, ProviderError>>;

    /// Generate a single illustrative image from a text prompt.
    fn generate_image(
        &self,
        prompt: &str,
    ) -> BoxFuture<'_, Result<GeneratedImage, ProviderError>>;
}
