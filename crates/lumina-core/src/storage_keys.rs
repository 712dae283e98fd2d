//! Local storage key conventions.
//!
//! Pure constants — no storage dependency. These define the canonical keys
//! under which Lumina persists state in the local key-value store.

/// The learner profile, serialized as a whole JSON object.
pub const USER_PROFILE: &str = "lumina_user";

/// Per-subject session counters, serialized as a JSON mapping.
pub const SESSION_COUNTERS: &str = "lumina_sessions";

/// The user-supplied API credential, stored as a raw string.
pub const USER_CREDENTIAL: &str = "lumina_api_key";
