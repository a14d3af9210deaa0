use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Inline binary payload sent along with a message (usually an image).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttachment {
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<MessageAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Only set on assistant messages. `None` counts as read.
    pub is_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Coins charged for this response
    pub cost: Option<u32>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            attachment: None,
            is_read: None,
            cost: None,
        }
    }

    pub fn user(content: impl Into<String>, attachment: Option<MessageAttachment>) -> Self {
        Self {
            attachment,
            ..Self::new(Role::User, content)
        }
    }

    /// Assistant notice that is not a model response (errors, balance warnings).
    pub fn notice(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// A billed model response, unread until its conversation is viewed.
    pub fn reply(content: impl Into<String>, cost: u32) -> Self {
        Self {
            is_read: Some(false),
            cost: Some(cost),
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn is_unread(&self) -> bool {
        self.role == Role::Assistant && self.is_read == Some(false)
    }

    /// A message must carry text or an attachment to be worth sending.
    pub fn has_payload(&self) -> bool {
        !self.content.trim().is_empty() || self.attachment.is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachment: Option<MessageAttachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_starts_unread() {
        let msg = Message::reply("hello", 1);
        assert!(msg.is_unread());
        assert_eq!(msg.cost, Some(1));
    }

    #[test]
    fn test_notice_counts_as_read() {
        assert!(!Message::notice("out of coins").is_unread());
    }

    #[test]
    fn test_has_payload() {
        assert!(!Message::user("   ", None).has_payload());
        let attachment = MessageAttachment {
            mime_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
        };
        assert!(Message::user("", Some(attachment)).has_payload());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json = serde_json::to_value(Message::user("hi", None)).unwrap();
        assert!(json.get("isRead").is_none());
        assert!(json.get("attachment").is_none());
        assert_eq!(json["role"], "user");
    }
}
