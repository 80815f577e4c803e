//! Gemini `generateContent` client.
//!
//! Thin HTTP wrapper for `/v1beta/models/{model}:generateContent`. One
//! request per call: no retry, no streaming. Request building and response
//! parsing are pure functions for testability.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{LlmConfig, Sampling};
use super::types::{ChatResponse, LlmError};
use crate::message::{Role, Turn};

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    sampling: Sampling,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key.clone(), base_url: config.base_url.clone(), sampling: config.sampling })
    }

    /// # Errors
    ///
    /// Returns an [`LlmError`] on transport failure, a non-200 status, an
    /// unparseable body, or a blocked answer.
    pub async fn generate(
        &self,
        model: &str,
        system: Option<&str>,
        history: &[Turn],
        message: &str,
    ) -> Result<ChatResponse, LlmError> {
        let body = build_request(system, history, message, self.sampling);

        let response = self
            .http
            .post(endpoint(&self.base_url, model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.without_url().to_string()))?;

        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }

        debug!(model, bytes = text.len(), "gemini response received");
        parse_response(&text, model)
    }
}

fn endpoint(base_url: &str, model: &str) -> String {
    format!("{base_url}/v1beta/models/{model}:generateContent")
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
}

impl From<Sampling> for GenerationConfig {
    fn from(s: Sampling) -> Self {
        Self { temperature: s.temperature, top_p: s.top_p, top_k: s.top_k, max_output_tokens: s.max_output_tokens }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

// =============================================================================
// BUILDING / PARSING
// =============================================================================

fn build_request<'a>(
    system: Option<&'a str>,
    history: &'a [Turn],
    message: &'a str,
    sampling: Sampling,
) -> ApiRequest<'a> {
    let mut contents: Vec<WireContent<'a>> = history
        .iter()
        .map(|turn| WireContent { role: Some(turn.role), parts: vec![WirePart { text: &turn.content }] })
        .collect();
    contents.push(WireContent { role: Some(Role::User), parts: vec![WirePart { text: message }] });

    ApiRequest {
        contents,
        system_instruction: system.map(|text| WireContent { role: None, parts: vec![WirePart { text }] }),
        generation_config: sampling.into(),
    }
}

fn parse_response(json: &str, model: &str) -> Result<ChatResponse, LlmError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    let Some(candidate) = api.candidates.into_iter().next() else {
        return Err(match api.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => LlmError::Blocked(reason),
            None => LlmError::ApiParse("response has no candidates".into()),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(match candidate.finish_reason {
            Some(reason) if reason != "STOP" => LlmError::Blocked(reason),
            _ => LlmError::ApiParse("candidate has no text".into()),
        });
    }

    let usage = api.usage_metadata;
    Ok(ChatResponse {
        text,
        model: api.model_version.unwrap_or_else(|| model.to_string()),
        finish_reason: candidate.finish_reason,
        input_tokens: usage.as_ref().map_or(0, |u| u.prompt_token_count),
        output_tokens: usage.as_ref().map_or(0, |u| u.candidates_token_count),
    })
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
