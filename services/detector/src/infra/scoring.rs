//! Client for the external AI-detection provider.
//!
//! The provider speaks the OpenAI chat-completions protocol and is asked to
//! answer with a single JSON object. Its output is normalized here so the rest
//! of the service only ever sees clamped scores and known severities.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use veritext_domain::analysis::{Indicator, Language, MAX_TEXT_CHARS, Severity, SuspiciousPart};

use crate::domain::repository::ScoringPort;
use crate::domain::types::ScoreResult;
use crate::error::ScoringError;

/// Settings for [`HttpScoringClient`].
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Provider base URL, without the `/v1/...` path.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    pub backoff_base: Duration,
    /// Advisory price per 1k tokens, only logged.
    pub cost_per_1k_tokens: f64,
}

impl ScoringConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_owned(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            cost_per_1k_tokens: 0.00015,
        }
    }
}

/// Rough token count used for cost logging: one token per four characters.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

pub fn estimate_cost(tokens: u64, cost_per_1k_tokens: f64) -> f64 {
    tokens as f64 / 1000.0 * cost_per_1k_tokens
}

#[derive(Clone)]
pub struct HttpScoringClient {
    client: reqwest::Client,
    config: Arc<ScoringConfig>,
}

impl HttpScoringClient {
    pub fn new(config: ScoringConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .backoff_base
            .saturating_mul(1u32 << attempt.min(16))
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<RawAnalysis, ScoringError> {
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ScoringError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScoringError::Unavailable(format!("provider returned {status}")));
        }
        if !status.is_success() {
            return Err(ScoringError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ScoringError::Unavailable(e.to_string()))?;
        parse_completion(&body)
    }
}

impl ScoringPort for HttpScoringClient {
    async fn score(&self, text: &str, language: Language) -> Result<ScoreResult, ScoringError> {
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(ScoringError::InputTooLong {
                limit: MAX_TEXT_CHARS,
            });
        }

        let tokens = estimate_tokens(text);
        debug!(
            model = %self.config.model,
            estimated_tokens = tokens,
            estimated_cost = estimate_cost(tokens, self.config.cost_per_1k_tokens),
            language = %language,
            "scoring request"
        );

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt(language),
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        };

        let started = Instant::now();
        let mut attempt = 0;
        loop {
            match self.send(&request).await {
                Ok(raw) => {
                    let mut result = normalize(raw)?;
                    result.processing_time_ms =
                        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    return Ok(result);
                }
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "scoring attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "scoring failed");
                    return Err(e);
                }
            }
        }
    }
}

fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::Pt => {
            "Você é um especialista em detectar textos gerados por inteligência artificial. \
             Analise o texto do usuário e responda somente com um objeto JSON no formato \
             {\"aiScore\": número de 0 a 100, \"indicators\": [{\"type\": string, \
             \"description\": string, \"severity\": \"low\"|\"medium\"|\"high\"}], \
             \"explanation\": string, \"suspiciousParts\": [{\"text\": string, \
             \"score\": número de 0 a 100, \"reason\": string}]}. \
             Escreva descrições e explicação em português."
        }
        Language::En => {
            "You are an expert at detecting AI-generated text. Analyze the user's text \
             and reply with a single JSON object of the form {\"aiScore\": number from 0 \
             to 100, \"indicators\": [{\"type\": string, \"description\": string, \
             \"severity\": \"low\"|\"medium\"|\"high\"}], \"explanation\": string, \
             \"suspiciousParts\": [{\"text\": string, \"score\": number from 0 to 100, \
             \"reason\": string}]}. Write descriptions and the explanation in English."
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    ai_score: f64,
    #[serde(default)]
    indicators: Vec<RawIndicator>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    suspicious_parts: Vec<RawSuspiciousPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIndicator {
    #[serde(rename = "type")]
    kind: String,
    description: String,
    severity: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSuspiciousPart {
    text: String,
    score: f64,
    reason: String,
}

fn parse_completion(body: &str) -> Result<RawAnalysis, ScoringError> {
    let completion: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ScoringError::InvalidResponse(format!("completion: {e}")))?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ScoringError::InvalidResponse("empty completion".to_owned()))?;
    serde_json::from_str(&content)
        .map_err(|e| ScoringError::InvalidResponse(format!("analysis payload: {e}")))
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

fn normalize(raw: RawAnalysis) -> Result<ScoreResult, ScoringError> {
    if raw.ai_score.is_nan() {
        return Err(ScoringError::InvalidResponse("aiScore is NaN".to_owned()));
    }

    let indicators = raw
        .indicators
        .into_iter()
        .filter(|i| !i.description.trim().is_empty())
        .map(|i| Indicator {
            kind: match i.kind.trim() {
                "" => "general".to_owned(),
                kind => kind.to_owned(),
            },
            description: i.description.trim().to_owned(),
            severity: Severity::from_provider(&i.severity),
        })
        .collect();

    let suspicious_parts = raw
        .suspicious_parts
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| SuspiciousPart {
            text: p.text.trim().to_owned(),
            score: if p.score.is_nan() { 0.0 } else { clamp_score(p.score) },
            reason: p.reason.trim().to_owned(),
        })
        .collect();

    Ok(ScoreResult {
        ai_score: clamp_score(raw.ai_score),
        indicators,
        explanation: raw.explanation.trim().to_owned(),
        suspicious_parts,
        processing_time_ms: 0,
    })
}
