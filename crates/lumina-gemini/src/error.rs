use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API credential is configured")]
    CredentialMissing,

    #[error("request to the Gemini API failed: {0}")]
    Transport(String),

    #[error("Gemini API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("response parsing failed: {0}")]
    ResponseParse(String),

    #[error("response did not conform to expected schema: {0}")]
    SchemaViolation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether this failure means the credential is absent or rejected, as
    /// opposed to a transient provider problem.
    pub fn is_credential_missing(&self) -> bool {
        matches!(self, ProviderError::CredentialMissing)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.to_string())
    }
}
