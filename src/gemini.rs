use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

use crate::config::Config;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Anything that can turn one prompt into one block of text. Called from a worker thread.
pub trait CompletionService: Send + Sync {
    fn submit(&self, prompt: &str) -> Result<String>;
}

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(serde::Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(serde::Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(serde::Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

pub struct GeminiClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl GeminiClient {
    /// Fails when the key is blank or cannot be sent as a header value.
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            bail!("GEMINI_API_KEY is not set");
        }
        let mut key = HeaderValue::from_str(api_key).context("GEMINI_API_KEY is not a valid header value")?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            url: format!("{base}/v1beta/models/{model}:generateContent"),
            model: model.to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.gemini_api_key,
            &cfg.gemini_model,
            &cfg.api_base_url,
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let req = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
        };

        let resp = self.client.post(&self.url).json(&req).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) if !env.error.message.is_empty() => {
                    bail!("Gemini error {} ({}): {}", status, env.error.status, env.error.message)
                }
                _ => bail!("Gemini error {}: {}", status, text),
            }
        }

        let parsed: GenerateResponse = resp.json().await.context("malformed Gemini response")?;
        extract_text(parsed)
    }
}

fn extract_text(parsed: GenerateResponse) -> Result<String> {
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        bail!("prompt blocked by Gemini: {reason}");
    }
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty response"))?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        bail!("Empty response (finish reason: {reason})");
    }
    Ok(text)
}

impl CompletionService for GeminiClient {
    fn submit(&self, prompt: &str) -> Result<String> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        rt.block_on(self.generate_content(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", "gemini-2.5-flash", &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = GeminiClient::new("  ", "m", "http://localhost", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn key_with_control_characters_is_rejected() {
        assert!(GeminiClient::new("abc\ndef", "m", "http://localhost", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn url_is_built_from_base_and_model() {
        let c = GeminiClient::new("k", "gemini-2.5-flash", "http://host:1/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.url, "http://host:1/v1beta/models/gemini-2.5-flash:generateContent");
        assert_eq!(c.model(), "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn returns_joined_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_json(json!({
                "contents": [{ "parts": [{ "text": "Resuma este texto de forma clara: abc" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "The cat " }, { "text": "sat on the mat." }], "role": "model" },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = client_for(&server)
            .generate_content("Resuma este texto de forma clara: abc")
            .await
            .unwrap();
        assert_eq!(out, "The cat sat on the mat.");
    }

    #[tokio::test]
    async fn api_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_content("x").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"), "{msg}");
        assert!(msg.contains("API key not valid."), "{msg}");
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_content("x").await.unwrap_err();
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_content("x").await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn candidate_without_text_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "MAX_TOKENS" }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_content("x").await.unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_content("x").await.unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn submit_blocks_on_its_own_runtime() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
                })))
                .mount(&server)
                .await;
            server
        });

        let client = client_for(&server);
        let out = std::thread::spawn(move || client.submit("hello")).join().unwrap().unwrap();
        assert_eq!(out, "ok");
    }
}
