use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// Kind of payload attached to a message. Images only, for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
}

/// A binary payload attached to a message. Immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl Attachment {
    pub fn image(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Image,
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// One entry in the conversation timeline.
///
/// A bot message is created with `is_streaming = true` and settles exactly
/// once via [`Message::settle`]; until then its text and grounding URLs only
/// grow, and after settling both are frozen. The mutators enforce this —
/// appends against a settled message are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: Timestamp,
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// A committed user message, optionally carrying an attachment.
    pub fn user(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Timestamp::now(),
            is_streaming: false,
            grounding_urls: Vec::new(),
            attachments: attachment.into_iter().collect(),
        }
    }

    /// A committed bot message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Bot,
            text: text.into(),
            timestamp: Timestamp::now(),
            is_streaming: false,
            grounding_urls: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// A bot message that is still receiving streamed fragments.
    pub fn streaming_bot() -> Self {
        Self {
            is_streaming: true,
            ..Self::bot("")
        }
    }

    /// Append a streamed text fragment. Ignored once the message has settled.
    pub fn append_text(&mut self, fragment: &str) {
        if self.is_streaming {
            self.text.push_str(fragment);
        }
    }

    /// Merge grounding URLs into the message, deduplicating while preserving
    /// insertion order. Ignored once the message has settled.
    pub fn merge_grounding_urls<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.is_streaming {
            return;
        }
        for url in urls {
            let url = url.into();
            if !self.grounding_urls.contains(&url) {
                self.grounding_urls.push(url);
            }
        }
    }

    /// Settle the message: freezes text and grounding URLs.
    pub fn settle(&mut self) {
        self.is_streaming = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_bot_starts_empty_and_streaming() {
        let msg = Message::streaming_bot();
        assert_eq!(msg.sender, Sender::Bot);
        assert!(msg.is_streaming);
        assert!(msg.text.is_empty());
        assert!(msg.grounding_urls.is_empty());
    }

    #[test]
    fn fragments_concatenate_in_order() {
        let mut msg = Message::streaming_bot();
        msg.append_text("The ");
        msg.append_text("Roman ");
        msg.append_text("Empire");
        assert_eq!(msg.text, "The Roman Empire");
    }

    #[test]
    fn grounding_urls_dedupe_and_keep_insertion_order() {
        let mut msg = Message::streaming_bot();
        msg.merge_grounding_urls(["https://a.example", "https://b.example"]);
        msg.merge_grounding_urls(["https://a.example", "https://c.example"]);
        assert_eq!(
            msg.grounding_urls,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
    }

    #[test]
    fn settled_message_is_frozen() {
        let mut msg = Message::streaming_bot();
        msg.append_text("final");
        msg.settle();
        msg.append_text(" more");
        msg.merge_grounding_urls(["https://late.example"]);
        assert_eq!(msg.text, "final");
        assert!(msg.grounding_urls.is_empty());
        assert!(!msg.is_streaming);
    }

    #[test]
    fn user_message_carries_attachment() {
        let att = Attachment::image(vec![1, 2, 3], "image/png");
        let msg = Message::user("look at this", Some(att));
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].mime_type, "image/png");
        assert!(!msg.is_streaming);
    }
}
