//! The Gemini REST client and its model-selection table.

use lumina_core::models::concept_graph::ConceptGraph;
use lumina_core::models::subject::ReasoningTier;
use lumina_storage::credential::{Credential, CredentialStore};

use crate::error::ProviderError;
use crate::provider::{
    BoxFuture, ChatRequest, ChatStream, GeneratedImage, TutorProvider,
};
use crate::wire::ApiErrorEnvelope;
use crate::{chat, graph, image};

pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Low-latency model for everyday tutoring.
pub const CHAT_MODEL_FAST: &str = "gemini-2.5-flash";
/// High-reasoning model for Math and Literature.
pub const CHAT_MODEL_DEEP: &str = "gemini-3-pro-preview";
/// Model used for concept-graph extraction.
pub const GRAPH_MODEL: &str = "gemini-2.5-flash";
/// Imagen model used for image generation.
pub const IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// A Gemini API client. The credential is resolved from the store at call
/// time, so a key supplied after construction is picked up without
/// rebuilding the client.
pub struct GeminiClient {
    http: reqwest::Client,
    credentials: CredentialStore,
    base_url: String,
}

impl GeminiClient {
    pub fn new(credentials: CredentialStore) -> Self {
        Self::with_base_url(credentials, BASE_URL)
    }

    pub fn with_base_url(credentials: CredentialStore, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            base_url: base_url.into(),
        }
    }

    pub fn chat_model(tier: ReasoningTier) -> &'static str {
        match tier {
            ReasoningTier::Fast => CHAT_MODEL_FAST,
            ReasoningTier::Deep => CHAT_MODEL_DEEP,
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_key(&self) -> Result<Credential, ProviderError> {
        self.credentials
            .current()
            .ok_or(ProviderError::CredentialMissing)
    }
}

impl TutorProvider for GeminiClient {
    fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> BoxFuture<'_, Result<ChatStream, ProviderError>> {
        Box::pin(chat::stream(self, request))
    }

    fn generate_concept_graph(
        &self,
        topic: &str,
    ) -> BoxFuture<'_, Result<ConceptGraph, ProviderError>> {
        let topic = topic.to_string();
        Box::pin(async move { graph::generate(self, &topic).await })
    }

    fn generate_image(
        &self,
        prompt: &str,
    ) -> BoxFuture<'_, Result<GeneratedImage, ProviderError>> {
        let prompt = prompt.to_string();
        Box::pin(async move { image::generate(self, &prompt).await })
    }
}

/// Map a non-2xx API response to a [`ProviderError`]. Authorization
/// failures and key-rejection messages become `CredentialMissing` so the
/// caller can re-prompt instead of showing a generic failure.
pub(crate) fn error_for_status(status: u16, body: String) -> ProviderError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    if status == 401 || status == 403 || message.to_lowercase().contains("api key") {
        return ProviderError::CredentialMissing;
    }

    ProviderError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_statuses_map_to_credential_missing() {
        assert!(error_for_status(401, String::new()).is_credential_missing());
        assert!(error_for_status(403, String::new()).is_credential_missing());
    }

    #[test]
    fn key_rejection_message_maps_to_credential_missing() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(error_for_status(400, body.to_string()).is_credential_missing());
    }

    #[test]
    fn other_errors_keep_status_and_message() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        match error_for_status(429, body.to_string()) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_falls_back_to_raw_text() {
        match error_for_status(500, "  upstream exploded \n".to_string()) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn deep_tier_selects_the_pro_model() {
        assert_eq!(GeminiClient::chat_model(ReasoningTier::Deep), CHAT_MODEL_DEEP);
        assert_eq!(GeminiClient::chat_model(ReasoningTier::Fast), CHAT_MODEL_FAST);
    }
}
