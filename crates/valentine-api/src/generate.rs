//! Love-letter and poem generation through an OpenAI-compatible
//! chat-completions API.

use std::time::Duration;

use axum::{Extension, Json, extract::State};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use valentine_types::api::{Claims, GenerateRequest, GeneratedMessage, GeneratedPoem};
use valentine_types::generate::{LetterStyle, PoemStyle};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const MAX_PROMPT_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("rate limited")]
    RateLimited,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("completion contained no text")]
    Empty,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client. Requests are sent once; failures are reported,
/// never retried.
#[derive(Debug, Clone)]
pub struct Generator {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Generator {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Result<Self, GenerateError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("valentine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerateError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn love_letter(&self, prompt: &str, style: LetterStyle) -> Result<String, GenerateError> {
        let system = format!(
            "You write short love letters. Keep it under 200 words, address the \
             recipient directly and make the tone {}. Reply with the letter only.",
            style.tone()
        );
        self.complete(system, prompt, 400).await
    }

    pub async fn poem(&self, prompt: &str, style: PoemStyle) -> Result<String, GenerateError> {
        let system = format!(
            "You write love poems of 6 to 10 lines. Make the tone {}. Reply with \
             the poem only, one line per line, no title.",
            style.tone()
        );
        self.complete(system, prompt, 300).await
    }

    async fn complete(&self, system: String, prompt: &str, max_tokens: u32) -> Result<String, GenerateError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.9,
            max_tokens,
        };

        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let body = match res.status() {
            s if s.is_success() => res
                .json::<ChatResponse>()
                .await
                .map_err(|e| GenerateError::Serde(e.to_string()))?,
            StatusCode::UNAUTHORIZED => return Err(GenerateError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => return Err(GenerateError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                return Err(GenerateError::Http { status, body });
            }
        };

        body.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GenerateError::Empty)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GenerateError {
    if e.is_timeout() {
        GenerateError::Timeout
    } else {
        GenerateError::Transport(e.to_string())
    }
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        warn!("Text generation failed: {}", e);
        ApiError::Upstream("text generation failed, please try again".into())
    }
}

fn checked_prompt(req: &GenerateRequest) -> ApiResult<&str> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt is required".into()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "prompt must be at most {} characters",
            MAX_PROMPT_CHARS
        )));
    }
    Ok(prompt)
}

fn generator(state: &AppState) -> ApiResult<&Generator> {
    state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("text generation is not configured".into()))
}

pub async fn generate_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GeneratedMessage>> {
    let prompt = checked_prompt(&req)?;
    let style = LetterStyle::parse_or_default(req.style.as_deref());
    let generator = generator(&state)?;

    info!("Generating {:?} letter for {}", style, claims.username);
    let message = generator.love_letter(prompt, style).await?;
    Ok(Json(GeneratedMessage { message }))
}

pub async fn generate_poem(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GeneratedPoem>> {
    let prompt = checked_prompt(&req)?;
    let style = PoemStyle::parse_or_default(req.style.as_deref());
    let generator = generator(&state)?;

    info!("Generating {:?} poem for {}", style, claims.username);
    let poem = generator.poem(prompt, style).await?;
    Ok(Json(GeneratedPoem { poem }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::HeaderMap, routing::post};
    use tokio::net::TcpListener;

    /// Serves a canned chat-completions endpoint and returns its base URL.
    async fn mock_api(status: u16, body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move |headers: HeaderMap, Json(req): Json<serde_json::Value>| {
                let body = body.clone();
                async move {
                    assert_eq!(headers["authorization"], "Bearer test-key");
                    assert_eq!(req["messages"][0]["role"], "system");
                    assert_eq!(req["messages"][1]["content"], "our first date");
                    (StatusCode::from_u16(status).unwrap(), Json(body))
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> Generator {
        Generator::new("test-key".into(), Some(base_url), None).unwrap()
    }

    #[tokio::test]
    async fn returns_trimmed_completion_text() {
        let base = mock_api(
            200,
            serde_json::json!({"choices": [{"message": {"role": "assistant", "content": "  Dear you,\n...  "}}]}),
        )
        .await;

        let text = client(base)
            .love_letter("our first date", LetterStyle::Sweet)
            .await
            .unwrap();
        assert_eq!(text, "Dear you,\n...");
    }

    #[tokio::test]
    async fn upstream_errors_are_not_retried() {
        let base = mock_api(429, serde_json::json!({"error": "slow down"})).await;
        let err = client(base.clone())
            .poem("our first date", PoemStyle::Poetic)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::RateLimited));

        let base = mock_api(503, serde_json::json!({"error": "down"})).await;
        let err = client(base).poem("our first date", PoemStyle::Funny).await.unwrap_err();
        assert!(matches!(err, GenerateError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let base = mock_api(200, serde_json::json!({"choices": []})).await;
        let err = client(base)
            .love_letter("our first date", LetterStyle::Romantic)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Empty));
    }

    #[test]
    fn prompts_are_required_and_bounded() {
        let req = |prompt: &str| GenerateRequest {
            prompt: prompt.to_string(),
            style: None,
        };
        assert!(matches!(checked_prompt(&req("   ")), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            checked_prompt(&req(&"x".repeat(MAX_PROMPT_CHARS + 1))),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(checked_prompt(&req(" hi ")).unwrap(), "hi");
    }
}
