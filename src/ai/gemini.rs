// Google Gemini `generateContent` backend.

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::ApiError;
use super::{CompletionBackend, CompletionRequest, Role, Turn};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Everything needed to open a Gemini session.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        GeminiSettings {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: GEMINI_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    api_base: String,
    client: HttpClient,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self, ApiError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::Configuration("no Gemini API key configured".to_string()))?;

        let client = HttpClient::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiSystemInstruction,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

// Non-text parts (function calls and the like) deserialize with `text: None`.
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

fn map_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

fn build_request(request: &CompletionRequest<'_>) -> GeminiRequest {
    GeminiRequest {
        contents: request
            .turns
            .iter()
            .map(|turn: &Turn| GeminiContent {
                role: map_role(turn.role).to_string(),
                parts: vec![GeminiPart {
                    text: Some(turn.text.clone()),
                }],
            })
            .collect(),
        system_instruction: GeminiSystemInstruction {
            parts: vec![GeminiPart {
                text: Some(request.system.to_string()),
            }],
        },
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

fn extract_text(provider: &str, response: GeminiResponse) -> Result<String, ApiError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NoChoices {
            provider: provider.to_string(),
        })?;

    Ok(candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<String>>()
                .join("")
        })
        .unwrap_or_default())
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn generate(&self, request: CompletionRequest<'_>) -> Result<String, ApiError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let body = build_request(&request);
        debug!(
            "Sending {} turn(s) to {} model {}",
            body.contents.len(),
            self.name(),
            self.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout {
                        provider: self.name().to_string(),
                    }
                } else {
                    ApiError::Network(e)
                }
            })?;

        let status = response.status();
        let response_text = response.text().await?;

        if status != StatusCode::OK {
            error!("Gemini API error response. Status: {}, Body: {}", status, response_text);
            return Err(ApiError::from_status(self.name(), status.as_u16(), response_text));
        }

        match serde_json::from_str::<GeminiResponse>(&response_text) {
            Ok(parsed) => extract_text(self.name(), parsed),
            Err(e) => {
                error!("Failed to parse Gemini JSON: {}. Body:\n{}", e, response_text);
                Err(ApiError::ResponseParsingError {
                    provider: self.name().to_string(),
                    details: e.to_string(),
                })
            }
        }
    }
}
