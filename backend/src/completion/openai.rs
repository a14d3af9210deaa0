use super::{CompletionError, CompletionProvider, outgoing};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FinishReason, ImageUrl,
    },
};
use async_trait::async_trait;
use shared::models::{CompletionSettings, Message, Role, SafetyLevel};

const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Build the request messages: the system prompt first, then the transcript.
fn build_conversation(
    messages: &[Message],
    system_prompt: &str,
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    let mut conversation: Vec<ChatCompletionRequestMessage> = Vec::new();

    if !system_prompt.is_empty() {
        let msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt.to_string())
            .build()?;
        conversation.push(ChatCompletionRequestMessage::System(msg));
    }

    for msg in outgoing(messages) {
        let req_msg = match msg.role {
            Role::User => {
                let content = match &msg.attachment {
                    None => ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    Some(attachment) => {
                        let mut parts = Vec::new();
                        if !msg.content.trim().is_empty() {
                            parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                                ChatCompletionRequestMessageContentPartText {
                                    text: msg.content.clone(),
                                    prompt_cache_breakpoint: None,
                                },
                            ));
                        }
                        parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                            ChatCompletionRequestMessageContentPartImage {
                                image_url: ImageUrl {
                                    url: format!(
                                        "data:{};base64,{}",
                                        attachment.mime_type, attachment.data
                                    ),
                                    detail: None,
                                },
                                prompt_cache_breakpoint: None,
                            },
                        ));
                        ChatCompletionRequestUserMessageContent::Array(parts)
                    }
                };
                let user_msg = ChatCompletionRequestUserMessageArgs::default()
                    .content(content)
                    .build()?;
                ChatCompletionRequestMessage::User(user_msg)
            }
            Role::Assistant => {
                let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                    .content(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    ))
                    .build()?;
                ChatCompletionRequestMessage::Assistant(assistant_msg)
            }
            Role::System => continue,
        };
        conversation.push(req_msg);
    }

    Ok(conversation)
}

fn is_content_filter_error(e: &OpenAIError) -> bool {
    let text = e.to_string();
    text.contains("content_filter") || text.contains("content_policy")
}

fn classify_error(e: OpenAIError) -> CompletionError {
    if is_content_filter_error(&e) {
        CompletionError::SafetyBlocked
    } else {
        CompletionError::Request(e.to_string())
    }
}

/// Text of the first choice. A content-filter stop counts as a safety block.
fn extract_reply(response: CreateChatCompletionResponse) -> Result<String, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Malformed("no choices in response".to_string()))?;

    if matches!(choice.finish_reason, Some(FinishReason::ContentFilter)) {
        return Err(CompletionError::SafetyBlocked);
    }

    match choice.message.content {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(CompletionError::Malformed("choice has no content".to_string())),
    }
}

/// Any OpenAI-compatible chat-completion API (OpenAI, OpenRouter, local servers).
///
/// These APIs take no per-request filter threshold, so the safety level is only
/// logged; a content-filter stop is still reported as a safety block.
pub struct OpenAiProvider {
    api_key: Option<String>,
    settings: CompletionSettings,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>, settings: CompletionSettings) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            settings,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn send(
        &self,
        transcript: &[Message],
        system_prompt: &str,
        safety: SafetyLevel,
    ) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or(CompletionError::MissingCredential("OpenAI"))?;

        let api_base = self
            .settings
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        let client = Client::with_config(config);

        let conversation = build_conversation(transcript, system_prompt)
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        tracing::debug!(
            model = %self.settings.model,
            messages = conversation.len(),
            ?safety,
            "Sending chat completion request"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.settings.model.clone())
            .messages(conversation)
            .temperature(self.settings.temperature)
            .top_p(self.settings.top_p)
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;
        extract_reply(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::MessageAttachment;

    #[test]
    fn test_build_conversation_puts_system_prompt_first() {
        let transcript = vec![
            Message::user("hi", None),
            Message::new(Role::System, "note"),
            Message::reply("hello", 1),
            Message::user(
                "",
                Some(MessageAttachment {
                    mime_type: "image/png".into(),
                    data: "AAAA".into(),
                }),
            ),
        ];
        let conversation = build_conversation(&transcript, "be kind").unwrap();
        assert_eq!(conversation.len(), 4);
        assert!(matches!(conversation[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(conversation[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(conversation[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(conversation[3], ChatCompletionRequestMessage::User(_)));
    }

    fn response(choices: serde_json::Value) -> CreateChatCompletionResponse {
        serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "test-model",
            "choices": choices,
        }))
        .unwrap()
    }

    fn choice(content: Option<&str>, finish_reason: &str) -> serde_json::Value {
        serde_json::json!([{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": finish_reason,
        }])
    }

    #[test]
    fn test_extract_reply_returns_first_choice_text() {
        let reply = extract_reply(response(choice(Some("salam!"), "stop"))).unwrap();
        assert_eq!(reply, "salam!");
    }

    #[test]
    fn test_content_filter_stop_is_a_safety_block() {
        let result = extract_reply(response(choice(Some("partial"), "content_filter")));
        assert!(matches!(result, Err(CompletionError::SafetyBlocked)));
    }

    #[test]
    fn test_missing_choices_or_content_is_malformed() {
        let empty = extract_reply(response(serde_json::json!([])));
        assert!(matches!(empty, Err(CompletionError::Malformed(_))));

        let no_content = extract_reply(response(choice(None, "stop")));
        assert!(matches!(no_content, Err(CompletionError::Malformed(_))));
    }

    #[test]
    fn test_content_policy_errors_are_safety_blocks() {
        let blocked = OpenAIError::InvalidArgument("content_policy_violation".into());
        assert!(matches!(classify_error(blocked), CompletionError::SafetyBlocked));

        let other = OpenAIError::InvalidArgument("model not found".into());
        assert!(matches!(classify_error(other), CompletionError::Request(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let provider = OpenAiProvider::new(None, CompletionSettings::default());
        let err = provider
            .send(&[Message::user("hi", None)], "p", SafetyLevel::Relaxed)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::MissingCredential("OpenAI")));
    }
}
