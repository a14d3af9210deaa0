use super::character::Character;
use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Personality {
    #[default]
    Friendly,
    Playful,
    #[serde(rename = "Calm Supportive")]
    CalmSupportive,
}

/// Content-filter strictness requested from the remote model.
///
/// Stored under the labels shown to users; the short names are accepted on input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyLevel {
    #[default]
    #[serde(rename = "پیش‌فرض (توصیه می‌شود)", alias = "default")]
    Default,
    #[serde(rename = "آسان‌گیر", alias = "relaxed")]
    Relaxed,
    #[serde(rename = "بدون فیلتر (با احتیاط استفاده شود)", alias = "no_filters")]
    NoFilters,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub personality: Personality,
    pub system_prompt: String,
    pub safety_level: SafetyLevel,
    pub last_updated: DateTime<Utc>,
    pub character_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl Conversation {
    pub fn new(user_id: Uuid, character: &Character) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: format!("Chat with {}", character.name),
            messages: Vec::new(),
            personality: Personality::default(),
            system_prompt: character.system_prompt.clone(),
            safety_level: SafetyLevel::default(),
            last_updated: Utc::now(),
            character_id: character.id,
            user_id: Some(user_id),
        }
    }

    pub fn belongs_to(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.last_updated = Utc::now();
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_unread()).count()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OpenConversationRequest {
    pub character_id: Uuid,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConversationSettingsRequest {
    #[serde(default)]
    pub personality: Option<Personality>,
    #[serde(default)]
    pub safety_level: Option<SafetyLevel>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Row of the conversation sidebar.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: String,
    pub character_id: Uuid,
    pub character_name: String,
    pub last_message: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub unread: usize,
}

/// Where the client should go after the active conversation is deleted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "next", rename_all = "snake_case")]
pub enum Reselect {
    Conversation { id: Uuid },
    Catalog,
}

/// Result of sending a message, as seen by the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnResponse {
    Replied {
        conversation: Conversation,
        balance: f64,
        cost: u32,
    },
    Failed {
        conversation: Conversation,
    },
    InsufficientBalance {
        conversation: Conversation,
    },
    /// The conversation was deleted before the reply arrived.
    Discarded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_enums_use_stored_labels() {
        assert_eq!(
            serde_json::to_string(&Personality::CalmSupportive).unwrap(),
            "\"Calm Supportive\""
        );
        assert_eq!(
            serde_json::to_string(&SafetyLevel::Relaxed).unwrap(),
            "\"آسان‌گیر\""
        );
        let stored: SafetyLevel =
            serde_json::from_str("\"بدون فیلتر (با احتیاط استفاده شود)\"").unwrap();
        assert_eq!(stored, SafetyLevel::NoFilters);
        let short: SafetyLevel = serde_json::from_str("\"no_filters\"").unwrap();
        assert_eq!(short, SafetyLevel::NoFilters);
    }
}
