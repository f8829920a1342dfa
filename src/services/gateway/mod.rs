// OpenRouter-style chat-completions client.
//
// One attempt per call, 30 second budget. Callers never see an Err from
// `send`: connection-level failures collapse into the profile's offline
// notice, everything else into a short diagnostic string, so the analysis
// pipeline always has text to put in the envelope.

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{GatewayError, GatewayResult};
use crate::services::prompt::AnalysisProfile;
use crate::utils::metrics::Metrics;

/// Total budget for a single gateway round trip
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AiGateway {
    config: Arc<Config>,
    profile: AnalysisProfile,
    http_client: reqwest::Client,
    metrics: Arc<Metrics>,
}

impl AiGateway {
    pub fn new(
        config: Arc<Config>,
        profile: AnalysisProfile,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            profile,
            http_client,
            metrics,
        })
    }

    /// Send a prompt, optionally with a base64-encoded image, and always get
    /// text back. Unreachable upstream becomes the profile's offline notice;
    /// other failures become their `Display` form ("Network error: ..." or
    /// "API Error: ...").
    #[instrument(skip(self, prompt, image_base64), fields(has_image = image_base64.is_some()))]
    pub async fn send(&self, prompt: &str, image_base64: Option<&str>) -> String {
        match self.dispatch(prompt, image_base64).await {
            Ok(content) => content,
            Err(GatewayError::Unreachable(e)) => {
                warn!("AI gateway unreachable, serving offline notice: {}", e);
                self.profile.offline_notice().to_string()
            }
            Err(e) => {
                warn!("AI gateway call failed: {}", e);
                e.to_string()
            }
        }
    }

    async fn dispatch(&self, prompt: &str, image_base64: Option<&str>) -> GatewayResult<String> {
        let url = format!("{}/chat/completions", self.config.gateway_base_url());
        let model = self.model_for(image_base64.is_some());

        let request_body = json!({
            "model": model,
            "messages": self.build_messages(prompt, image_base64),
            "max_tokens": self.profile.max_tokens(),
        });

        debug!("🔍 Dispatching {} request to {}", model, url);
        let start = Instant::now();

        let result = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("HTTP-Referer", self.profile.referer())
            .header("X-Title", self.profile.title())
            .json(&request_body)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_api_call(false, start.elapsed(), 0, 0);
                return Err(classify_transport_error(e));
            }
        };

        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.record_api_call(false, start.elapsed(), 0, 0);
                return Err(classify_transport_error(e));
            }
        };

        let duration = start.elapsed();
        let (input_tokens, output_tokens) = extract_token_usage(&payload);

        match payload["choices"][0]["message"]["content"].as_str() {
            Some(content) => {
                self.metrics
                    .record_api_call(true, duration, input_tokens, output_tokens);
                debug!(
                    "✓ Gateway responded in {:.0}ms ({} in / {} out tokens)",
                    duration.as_secs_f64() * 1000.0,
                    input_tokens,
                    output_tokens
                );
                Ok(content.to_string())
            }
            None => {
                self.metrics
                    .record_api_call(false, duration, input_tokens, output_tokens);
                let message = payload["error"]["message"]
                    .as_str()
                    .unwrap_or("Unknown error")
                    .to_string();
                Err(GatewayError::Remote { message })
            }
        }
    }

    fn model_for(&self, has_image: bool) -> &str {
        if has_image {
            self.config.vision_model()
        } else {
            self.config.text_model()
        }
    }

    /// Build the chat message list: optional profile persona as a system
    /// message, then the user turn. With an image the user content is a
    /// two-part array (text + data URL); text-only stays a plain string.
    fn build_messages(&self, prompt: &str, image_base64: Option<&str>) -> serde_json::Value {
        let mut messages = Vec::new();

        if let Some(persona) = self.profile.system_prompt() {
            messages.push(json!({"role": "system", "content": persona}));
        }

        match image_base64 {
            Some(b64) => messages.push(json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {
                        "type": "image_url",
                        "image_url": {"url": format!("data:image/jpeg;base64,{b64}")}
                    }
                ]
            })),
            None => messages.push(json!({"role": "user", "content": prompt})),
        }

        serde_json::Value::Array(messages)
    }
}

/// Connection-level failures (DNS, refused, timed out) mean the upstream is
/// unreachable and the caller substitutes the offline notice. Everything
/// else, HTTP error statuses included, stays a plain network error.
fn classify_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_connect() || e.is_timeout() {
        GatewayError::Unreachable(e)
    } else {
        GatewayError::Transport(e)
    }
}

/// Extract token usage from a chat-completions response
///
/// Returns (input_tokens, output_tokens), zero when the usage block is absent
fn extract_token_usage(response: &serde_json::Value) -> (u64, u64) {
    let usage = &response["usage"];
    let input_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0);
    let output_tokens = usage["completion_tokens"].as_u64().unwrap_or(0);

    (input_tokens, output_tokens)
}
