use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// A learner profile. Persisted as a whole on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    /// Avatar image reference: a URL or an inline data URI.
    pub avatar: String,
}

impl UserProfile {
    /// A profile with the deterministic identicon avatar for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let avatar = Self::default_avatar_for(&name);
        Self { name, avatar }
    }

    pub fn with_avatar(name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.into(),
        }
    }

    /// Deterministic identicon keyed by name: a DiceBear initials image on
    /// the product's indigo background.
    pub fn default_avatar_for(name: &str) -> String {
        let seed = utf8_percent_encode(name.trim(), NON_ALPHANUMERIC);
        format!("https://api.dicebear.com/7.x/initials/svg?seed={seed}&backgroundColor=6366f1")
    }

    /// Whether the avatar is the generated identicon rather than a custom
    /// upload.
    pub fn has_default_avatar(&self) -> bool {
        self.avatar.starts_with("https://api.dicebear.com")
    }
}
