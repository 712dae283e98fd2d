use thiserror::Error;

use lumina_storage::error::StorageError;

/// Failures a turn can surface to the shell. Validation rejections are not
/// errors — they come back as [`crate::TurnOutcome::Rejected`] — and
/// transient provider failures settle into the timeline as apology
/// messages.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No credential is configured (or the provider rejected it). The shell
    /// should re-prompt for a key; the interrupted operation left no
    /// streaming placeholder behind.
    #[error("no API credential is configured")]
    CredentialMissing,

    /// Profile, credential, or counter state could not be persisted. Silent
    /// loss of learner data is unacceptable, so this blocks the operation.
    #[error("failed to persist state: {0}")]
    Persistence(#[from] StorageError),
}
