use super::{CompletionError, CompletionProvider, outgoing};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{CompletionSettings, Message, Role, SafetyLevel};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Finish and block reasons that mean the content filter stepped in.
const SAFETY_REASONS: [&str; 4] = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

pub fn threshold(level: SafetyLevel) -> &'static str {
    match level {
        SafetyLevel::Default => "BLOCK_MEDIUM_AND_ABOVE",
        SafetyLevel::Relaxed => "BLOCK_ONLY_HIGH",
        SafetyLevel::NoFilters => "BLOCK_NONE",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Google Gemini over the public `generateContent` REST endpoint.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    settings: CompletionSettings,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, settings: CompletionSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            settings,
        }
    }

    fn endpoint(&self) -> String {
        let base = self
            .settings
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        format!("{}/models/{}:generateContent", base, self.settings.model)
    }
}

fn build_request(
    transcript: &[Message],
    system_prompt: &str,
    safety: SafetyLevel,
    settings: &CompletionSettings,
) -> GenerateContentRequest {
    let contents = outgoing(transcript)
        .map(|m| {
            let mut parts = Vec::new();
            if !m.content.trim().is_empty() {
                parts.push(Part {
                    text: Some(m.content.clone()),
                    inline_data: None,
                });
            }
            if let Some(attachment) = &m.attachment {
                parts.push(Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: attachment.mime_type.clone(),
                        data: attachment.data.clone(),
                    }),
                });
            }
            let role = if m.role == Role::Assistant { "model" } else { "user" };
            Content {
                role: Some(role.to_string()),
                parts,
            }
        })
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: Some(system_prompt.to_string()),
                inline_data: None,
            }],
        },
        generation_config: GenerationConfig {
            temperature: settings.temperature,
            top_p: settings.top_p,
        },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: threshold(safety),
            })
            .collect(),
    }
}

fn is_safety_reason(reason: &str) -> bool {
    SAFETY_REASONS.contains(&reason)
}

fn extract_text(response: GenerateContentResponse) -> Result<String, CompletionError> {
    if response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
        .is_some()
    {
        return Err(CompletionError::SafetyBlocked);
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Malformed("no candidates in response".to_string()))?;

    if candidate.finish_reason.as_deref().is_some_and(is_safety_reason) {
        return Err(CompletionError::SafetyBlocked);
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(CompletionError::Malformed("candidate has no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn send(
        &self,
        transcript: &[Message],
        system_prompt: &str,
        safety: SafetyLevel,
    ) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingCredential("Gemini"))?;

        let request = build_request(transcript, system_prompt, safety, &self.settings);
        tracing::debug!(
            model = %self.settings.model,
            messages = request.contents.len(),
            "Sending Gemini request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("SAFETY") {
                return Err(CompletionError::SafetyBlocked);
            }
            return Err(CompletionError::Request(format!("{}: {}", status, body)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;
        extract_text(parsed)
    }
}
