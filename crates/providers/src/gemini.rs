//! Gemini native provider implementation.
//!
//! Uses the `generateContent` REST endpoint directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - System instruction as a top-level field
//! - Native function calling with `functionCall` / `functionResponse` parts
//! - Throttling classification with the service-suggested retry delay
//!   parsed out of the error payload

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use steward_core::error::ProviderError;
use steward_core::message::{Message, Part, Role, ToolCall, ToolResponse};
use steward_core::provider::*;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert conversation turns to the wire format.
    ///
    /// Tool-result turns ride in a `user`-role content entry; the wire
    /// protocol only knows `user` and `model` roles.
    fn to_api_contents(messages: &[Message]) -> Vec<GeminiContent> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::Model => "model",
                    Role::User | Role::Tool => "user",
                };
                GeminiContent {
                    role: role.into(),
                    parts: msg.parts.iter().map(Self::to_api_part).collect(),
                }
            })
            .collect()
    }

    fn to_api_part(part: &Part) -> GeminiPart {
        match part {
            Part::Text { text } => GeminiPart {
                text: Some(text.clone()),
                function_call: None,
                function_response: None,
            },
            Part::Call(call) => GeminiPart {
                text: None,
                function_call: Some(GeminiFunctionCall {
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                function_response: None,
            },
            Part::Response(resp) => GeminiPart {
                text: None,
                function_call: None,
                function_response: Some(GeminiFunctionResponse {
                    name: resp.name.clone(),
                    response: resp.payload.clone(),
                }),
            },
        }
    }

    /// Convert tool definitions to the wire format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<GeminiTool> {
        if tools.is_empty() {
            return Vec::new();
        }
        vec![GeminiTool {
            function_declarations: tools
                .iter()
                .map(|t| GeminiFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                })
                .collect(),
        }]
    }

    /// Convert a wire response into our domain message.
    fn response_to_provider_response(
        resp: GeminiResponse,
        requested_model: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "Response contained no candidates".into(),
            });
        };

        let mut parts = Vec::new();
        for part in candidate.content.parts {
            if let Some(text) = part.text {
                parts.push(Part::Text { text });
            }
            if let Some(call) = part.function_call {
                parts.push(Part::Call(ToolCall {
                    name: call.name,
                    args: call.args,
                }));
            }
            if let Some(fr) = part.function_response {
                parts.push(Part::Response(ToolResponse {
                    name: fr.name,
                    payload: fr.response,
                }));
            }
        }

        let usage = resp.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(ProviderResponse {
            message: Message::model(parts),
            usage,
            model: resp
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

/// Pull a suggested retry delay (in whole seconds) out of a throttling
/// error payload, if the service included one.
fn parse_retry_delay(body: &str) -> Option<u64> {
    // Only reached on throttling responses, so compiling per call is fine.
    let structured = regex::Regex::new(r#""retryDelay"\s*:\s*"(\d+)(?:\.\d+)?s""#).ok()?;
    let prose = regex::Regex::new(r"(?i)retry in (\d+)(?:\.\d+)?\s*s").ok()?;

    structured
        .captures(body)
        .or_else(|| prose.captures(body))
        .and_then(|c| c[1].parse().ok())
}

#[async_trait]
impl steward_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );

        let body = GeminiRequest {
            system_instruction: Some(GeminiSystemInstruction {
                parts: vec![GeminiPart {
                    text: Some(request.system.clone()),
                    function_call: None,
                    function_response: None,
                }],
            }),
            contents: Self::to_api_contents(&request.messages),
            tools: Self::to_api_tools(&request.tools),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
            },
        };

        debug!(provider = "gemini", model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(body = %error_body, "Gemini throttled the request");
            return Err(ProviderError::RateLimited {
                retry_after_secs: parse_retry_delay(&error_body),
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: GeminiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Gemini response: {e}"),
            })?;

        Self::response_to_provider_response(api_resp, &request.model)
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "system_instruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(rename = "functionResponse", skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}
