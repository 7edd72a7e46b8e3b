use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimal seam over a text (optionally vision) model: prompt in, raw
/// response text out. `None` means the model could not be reached or
/// produced nothing usable.
pub trait TextInference {
    fn infer_text(&self, prompt: &str, images: &[String]) -> Option<String>;
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "llava:7b";
pub const DEFAULT_OLLAMA_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout: DEFAULT_OLLAMA_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            timeout,
        }
    }
}

impl TextInference for OllamaBackend {
    fn infer_text(&self, prompt: &str, images: &[String]) -> Option<String> {
        // Ollama wants bare base64, without a data: URL prefix.
        let images = images
            .iter()
            .map(|img| img.split_once(";base64,").map_or(img.as_str(), |(_, b)| b))
            .filter(|img| !img.is_empty())
            .collect();

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            images,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .ok()?;
        let response = client.post(&self.endpoint).json(&request).send().ok()?;
        if !response.status().is_success() {
            return None;
        }

        let ollama_response: OllamaResponse = response.json().ok()?;
        Some(ollama_response.response)
    }
}

// ============================================================================
// Mock Backend (for testing without Ollama)
// ============================================================================

/// Returns a canned response for every prompt.
pub struct MockTextInference {
    pub response: String,
}

impl TextInference for MockTextInference {
    fn infer_text(&self, _prompt: &str, _images: &[String]) -> Option<String> {
        Some(self.response.clone())
    }
}

/// Strip a Markdown code fence some models wrap JSON answers in.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
