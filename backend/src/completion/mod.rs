use async_trait::async_trait;
use shared::models::{CompletionSettings, Message, Role, SafetyLevel};
use std::sync::Arc;
use thiserror::Error;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("No API key configured for {0}")]
    MissingCredential(&'static str),
    #[error("Response blocked by safety policy")]
    SafetyBlocked,
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl CompletionError {
    /// Text shown in the conversation in place of a reply.
    pub fn notice(&self) -> &'static str {
        match self {
            CompletionError::SafetyBlocked => crate::notices::SAFETY_BLOCKED,
            _ => crate::notices::GENERIC_FAILURE,
        }
    }
}

/// A remote text-generation service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn send(
        &self,
        transcript: &[Message],
        system_prompt: &str,
        safety: SafetyLevel,
    ) -> Result<String, CompletionError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub settings: CompletionSettings,
}

pub fn build_provider(config: ProviderConfig) -> Arc<dyn CompletionProvider> {
    match config.kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config.api_key, config.settings)),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config.api_key, config.settings)),
    }
}

/// Messages worth sending: no system notes and nothing without a payload.
pub fn outgoing(transcript: &[Message]) -> impl Iterator<Item = &Message> {
    transcript
        .iter()
        .filter(|m| m.role != Role::System && m.has_payload())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::MessageAttachment;

    #[test]
    fn test_outgoing_skips_system_and_empty_messages() {
        let transcript = vec![
            Message::new(Role::System, "internal"),
            Message::user("hi", None),
            Message::user("   ", None),
            Message::user(
                "",
                Some(MessageAttachment {
                    mime_type: "image/png".into(),
                    data: "AAAA".into(),
                }),
            ),
            Message::reply("hello!", 1),
        ];
        let kept: Vec<&Message> = outgoing(&transcript).collect();
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].content, "hi");
        assert!(kept[1].attachment.is_some());
        assert_eq!(kept[2].role, Role::Assistant);
    }

    #[test]
    fn test_only_safety_blocks_get_their_own_notice() {
        assert_eq!(CompletionError::SafetyBlocked.notice(), crate::notices::SAFETY_BLOCKED);
        assert_eq!(
            CompletionError::MissingCredential("Gemini").notice(),
            crate::notices::GENERIC_FAILURE
        );
        assert_eq!(
            CompletionError::Request("timeout".into()).notice(),
            crate::notices::GENERIC_FAILURE
        );
    }
}
