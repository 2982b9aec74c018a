use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ImageRef;

/// Role of a conversation turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking for help.
    User,

    /// The AI assistant.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// A single turn in the conversation.
///
/// Messages are immutable once appended; `ordinal` is the position in the
/// conversation, starting at zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Who produced the message.
    pub role: Role,

    /// Text content. For assistant messages this is the formatted markdown.
    pub text: String,

    /// The image attached to a user message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,

    /// Position in the conversation.
    pub ordinal: usize,
}

impl Message {
    /// Create a user message.
    pub fn user(text: impl Into<String>, image: Option<ImageRef>, ordinal: usize) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            image,
            ordinal,
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>, ordinal: usize) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            image: None,
            ordinal,
        }
    }

    /// Returns true for user messages.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMediaType;
    use serde_json::{json, to_value};

    #[test]
    fn user_message_serialization() {
        let message = Message::user("I cut my finger", None, 0);
        assert_eq!(
            to_value(&message).unwrap(),
            json!({"role": "user", "text": "I cut my finger", "ordinal": 0})
        );
    }

    #[test]
    fn image_reference_round_trips_through_transcript_json() {
        let image = ImageRef {
            name: "burn.png".to_string(),
            media_type: ImageMediaType::Png,
            size: 2048,
        };
        let message = Message::user("", Some(image.clone()), 4);
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image, Some(image));
        assert_eq!(back.ordinal, 4);
        assert!(back.is_user());
    }
}
