//! Gemini API client for client-line generation
//!
//! One JSON POST to `generateContent` per turn: the prompt text, a fixed
//! sampling configuration, and content-safety thresholds. The first
//! candidate's first part is the completion. A single attempt per turn —
//! the engine's scripted fallback covers every failure, so there is no
//! retry and no request timeout here.

use std::sync::OnceLock;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::api_key;
use crate::settings::AppSettings;

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

// f64 so the sampling values serialize exactly as written.
const TEMPERATURE: f64 = 0.9;
const TOP_K: u32 = 40;
const TOP_P: f64 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 200;

/// Global HTTP client for reuse across requests (avoids TLS handshake overhead)
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(Client::new)
}

/// Errors that can occur during line generation
#[derive(Debug)]
pub enum GenerationError {
    /// Gemini API key not configured
    MissingApiKey,
    /// Network/HTTP error
    NetworkError(String),
    /// Gemini API returned a non-success status
    ApiError { status: u16, message: String },
    /// Response parsed but carried no usable candidate
    MalformedResponse(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::MissingApiKey => {
                write!(
                    f,
                    "Gemini API key not configured. Set GEMINI_API_KEY environment variable."
                )
            }
            GenerationError::NetworkError(e) => write!(f, "Network error: {}", e),
            GenerationError::ApiError { status, message } => {
                write!(f, "Gemini API error ({}): {}", status, message)
            }
            GenerationError::MalformedResponse(e) => {
                write!(f, "Unexpected Gemini response: {}", e)
            }
        }
    }
}

impl std::error::Error for GenerationError {}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn safety_settings() -> Vec<SafetySetting> {
    const CATEGORIES: &[&str] = &[
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ];

    CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category,
            threshold: "BLOCK_MEDIUM_AND_ABOVE",
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Gemini API error response
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Resolve the API key: environment first, then the settings override, then
/// the OS keyring.
pub fn resolve_api_key(settings: &AppSettings) -> Option<String> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            return Some(key);
        }
    }

    if let Some(key) = &settings.gemini_api_key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }

    api_key::get_gemini_api_key()
}

/// Check if an API key is configured (for status display)
pub fn is_api_key_configured(settings: &AppSettings) -> bool {
    resolve_api_key(settings).is_some()
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the endpoint; used by tests against a mock server.
    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self { api_key, endpoint }
    }

    /// Request one completion for the given prompt.
    pub async fn generate_line(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: safety_settings(),
        };

        let url = format!("{}?key={}", self.endpoint, self.api_key);

        let response = get_http_client()
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let body: GenerateResponse = response
                .json()
                .await
                .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

            let text = body
                .candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content)
                .and_then(|content| content.parts.into_iter().next())
                .map(|part| part.text.trim().to_string())
                .ok_or_else(|| {
                    GenerationError::MalformedResponse("no candidates in response".to_string())
                })?;

            log::debug!("Generated line: {} chars", text.len());
            Ok(text)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            let message =
                if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            log::error!("Gemini API error ({}): {}", status.as_u16(), message);

            Err(GenerationError::ApiError {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Probe the endpoint with a minimal request.
    /// Ok(true) means the key works; Ok(false) means it was rejected.
    pub async fn test_connection(&self) -> Result<bool, String> {
        if self.api_key.is_empty() {
            return Ok(false);
        }

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "Hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: safety_settings(),
        };

        let url = format!("{}?key={}", self.endpoint, self.api_key);

        let response = get_http_client()
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        match response.status().as_u16() {
            200 => Ok(true),
            400 | 401 | 403 => {
                log::debug!("Gemini key check rejected: {}", response.status());
                Ok(false)
            }
            status => {
                log::warn!("Gemini key check: unexpected status {}", status);
                Err(format!("Unexpected API response: {}", status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_error_display() {
        let err = GenerationError::MissingApiKey;
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_api_error_display() {
        let err = GenerationError::ApiError {
            status: 429,
            message: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_request_serializes_wire_names() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: safety_settings(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 200);
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_empty_key_fails_before_any_request() {
        let client = GeminiClient::new(String::new());
        let result = client.generate_line("prompt").await;
        assert!(matches!(result, Err(GenerationError::MissingApiKey)));
    }
}
