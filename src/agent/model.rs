//! Model Boundary
//!
//! The external vision-language model is reached through the [`ActionModel`]
//! trait: one JPEG plus a text prompt in, one clamped [`ActionCommand`] out.
//! [`ChatCompletionsModel`] speaks the OpenAI-compatible
//! `POST {base}/chat/completions` dialect.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::control::action::{round_duration, ActionButtons, ActionCommand, LookMode};

/// Default action duration when the model omits one (ms).
pub const DEFAULT_DURATION_MS: u32 = 150;

/// Bytes of an error body kept in [`ModelError::Status`].
const ERROR_BODY_LIMIT: usize = 500;

/// One inference request.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// JPEG bytes of the frame to decide on.
    pub jpeg: Vec<u8>,
    /// Free-text objective.
    pub goal: String,
    /// Compact state JSON, e.g. `{"health":20,"hunger":18}`.
    pub state_summary: Option<String>,
}

/// Model boundary failures. None are retried.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("Model returned HTTP {code}: {body}")]
    Status {
        /// Status code.
        code: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Response did not contain a usable action.
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

/// Anything that can turn a frame into an action.
#[async_trait]
pub trait ActionModel: Send + Sync {
    /// Ask for the next action. Returned commands are already clamped.
    async fn decide(&self, request: DecisionRequest) -> Result<ActionCommand, ModelError>;
}

// =============================================================================
// CHAT COMPLETIONS CLIENT
// =============================================================================

/// Connection settings for an OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// API base, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Model name sent in each request.
    pub model: String,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Duration used when the response omits `duration_ms`.
    pub default_duration_ms: u32,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7000/v1".to_string(),
            model: "Qwen/Qwen2-VL-2B-Instruct".to_string(),
            max_tokens: 128,
            default_duration_ms: DEFAULT_DURATION_MS,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

const SYSTEM_PROMPT: &str = "You control a player in a 3D voxel game from screenshots. \
Reply with a single JSON object and nothing else:\n\
{\"forward\": number -1..1, \"strafe\": number -1..1, \"yaw\": absolute degrees, \
\"pitch\": absolute degrees -90..90, \"jump\": bool, \"attack\": bool, \"use\": bool, \
\"sneak\": bool, \"sprint\": bool, \"duration_ms\": integer 20..2000}\n\
Prefer short actions (100-300 ms).";

/// HTTP client for `POST {base}/chat/completions`.
pub struct ChatCompletionsModel {
    client: reqwest::Client,
    config: ModelConfig,
    endpoint: String,
}

impl ChatCompletionsModel {
    /// Build a client with the configured timeouts.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Full request URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for one decision.
    pub fn request_body(&self, request: &DecisionRequest) -> Value {
        let image_url = format!("data:image/jpeg;base64,{}", BASE64.encode(&request.jpeg));
        let mut text = format!("Goal: {}", request.goal);
        if let Some(state) = &request.state_summary {
            text.push_str("\nState: ");
            text.push_str(state);
        }

        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": 0.0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": text },
                        { "type": "image_url", "image_url": { "url": image_url } },
                    ],
                },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": action_json_schema(),
            },
        })
    }
}

#[async_trait]
impl ActionModel for ChatCompletionsModel {
    #[instrument(skip(self, request), fields(jpeg_bytes = request.jpeg.len()))]
    async fn decide(&self, request: DecisionRequest) -> Result<ActionCommand, ModelError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                code: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body: Value = response.json().await?;
        let content = completion_content(&body)?;
        debug!("Model replied: {}", content);
        parse_action(content, self.config.default_duration_ms)
    }
}

/// Structured-output schema for one action.
pub fn action_json_schema() -> Value {
    let number = json!({ "type": "number" });
    let boolean = json!({ "type": "boolean" });
    json!({
        "name": "game_action",
        "strict": true,
        "schema": {
            "type": "object",
            "properties": {
                "forward": number,
                "strafe": number,
                "yaw": number,
                "pitch": number,
                "jump": boolean,
                "attack": boolean,
                "use": boolean,
                "sneak": boolean,
                "sprint": boolean,
                "duration_ms": { "type": "integer" },
            },
            "required": [
                "forward", "strafe", "yaw", "pitch", "jump",
                "attack", "use", "sneak", "sprint", "duration_ms",
            ],
            "additionalProperties": false,
        },
    })
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// `choices[0].message.content` of a chat completion.
pub fn completion_content(body: &Value) -> Result<&str, ModelError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::InvalidResponse("missing choices[0].message.content".into()))
}

/// Parse model text into a clamped command.
///
/// Markdown code fences are stripped; if the text still is not a bare
/// object, the outermost `{...}` span is used. Missing or null fields take
/// neutral defaults; present fields of the wrong type are rejected.
pub fn parse_action(content: &str, default_duration_ms: u32) -> Result<ActionCommand, ModelError> {
    let text = strip_code_fences(content);
    let value: Value = serde_json::from_str(text)
        .or_else(|_| serde_json::from_str(outermost_object(text)?))
        .map_err(|e| ModelError::InvalidResponse(format!("not JSON: {}", e)))?;

    let obj = value
        .as_object()
        .ok_or_else(|| ModelError::InvalidResponse("action is not a JSON object".into()))?;

    let look_mode = match obj.get("look_mode") {
        None | Some(Value::Null) => LookMode::Absolute,
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|_| ModelError::InvalidResponse(format!("look_mode: unexpected {}", v)))?,
    };

    Ok(ActionCommand::with_look_mode(
        number_field(obj, "forward", 0.0)? as f32,
        number_field(obj, "strafe", 0.0)? as f32,
        number_field(obj, "yaw", 0.0)? as f32,
        number_field(obj, "pitch", 0.0)? as f32,
        look_mode,
        ActionButtons {
            jump: bool_field(obj, "jump")?,
            attack: bool_field(obj, "attack")?,
            use_item: bool_field(obj, "use")?,
            sneak: bool_field(obj, "sneak")?,
            sprint: bool_field(obj, "sprint")?,
        },
        round_duration(number_field(obj, "duration_ms", default_duration_ms as f64)?),
    ))
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // Drop the opening fence line (with any language tag) and the closing fence.
    let body = trimmed.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim()
}

fn outermost_object(text: &str) -> Result<&str, serde_json::Error> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        // Reparse to surface serde's own error for the original text.
        _ => serde_json::from_str::<Value>(text).map(|_| text),
    }
}

fn number_field(obj: &Map<String, Value>, key: &str, default: f64) -> Result<f64, ModelError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| ModelError::InvalidResponse(format!("{}: expected number, got {}", key, v))),
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> Result<bool, ModelError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| ModelError::InvalidResponse(format!("{}: expected bool, got {}", key, v))),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
