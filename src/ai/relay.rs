// ABOUTME: HTTP relay client implementing the NutritionAi collaborator trait
// ABOUTME: Posts action envelopes and reassembles SSE chat streams with line buffering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Relay Client
//!
//! The production AI collaborator. All intelligence lives behind a thin
//! relay endpoint that accepts `{ "action": ..., "payload": ... }` and
//! answers `{ "data": ... }`; chat streams arrive as `data:`-prefixed SSE
//! lines. TCP gives no alignment between network chunks and SSE events, so
//! the stream parser buffers partial lines across chunk boundaries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{AiAction, ChatMessage, ChatStream, NutritionAi, StreamChunk};
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    /// A `data:` payload with the JSON string (prefix stripped)
    Data(String),
    /// Explicit termination signal
    Done,
}

/// Line-buffering SSE parser that handles partial lines across chunk
/// boundaries. Complete lines (terminated by `\n`) are extracted and parsed;
/// any trailing partial line stays buffered for the next `feed()`.
#[derive(Debug, Default)]
struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    fn new() -> Self {
        Self::default()
    }

    fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let text = String::from_utf8_lossy(bytes);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].trim_end_matches('\r').to_owned();
            self.buffer = self.buffer[newline_pos + 1..].to_owned();

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue; // SSE event separator
            }

            if let Some(payload) = trimmed.strip_prefix("data:") {
                let payload = payload.trim();
                if payload == "[DONE]" {
                    events.push(SseEvent::Done);
                } else if !payload.is_empty() {
                    events.push(SseEvent::Data(payload.to_owned()));
                }
            }
        }
        events
    }
}

/// Success envelope returned by the relay for request/response actions
#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    data: serde_json::Value,
}

/// Error envelope returned by the relay on failure
#[derive(Debug, Deserialize)]
struct RelayError {
    error: String,
}

/// Per-chunk payload on the chat stream
#[derive(Debug, Deserialize)]
struct RelayStreamChunk {
    #[serde(default)]
    text: String,
}

/// HTTP client for the AI relay endpoint
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    /// Create a client for the given relay endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client from application configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(config.relay_url.clone(), config.relay_timeout_secs)
    }

    /// Map a non-success relay response into the single human-readable
    /// message the core surfaces
    async fn error_from_response(response: reqwest::Response, context: &str) -> AppError {
        let status = response.status();
        let message = match response.json::<RelayError>().await {
            Ok(body) => body.error,
            Err(_) if status.as_u16() == 429 => {
                "The AI service is receiving too many requests. Please try again later.".to_owned()
            }
            Err(_) => format!("AI service error during '{context}' ({status})"),
        };
        warn!(%status, context, "relay call failed");
        AppError::ai_invocation_failed(message)
    }

    async fn post_action(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> AppResult<reqwest::Response> {
        self.client
            .post(&self.endpoint)
            .json(&json!({ "action": action, "payload": payload }))
            .send()
            .await
            .map_err(|e| {
                AppError::ai_invocation_failed(format!(
                    "could not reach the AI service during '{action}': {e}"
                ))
            })
    }
}

#[async_trait]
impl NutritionAi for RelayClient {
    async fn invoke(
        &self,
        action: AiAction,
        payload: serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        debug!(%action, "invoking relay action");
        let response = self.post_action(action.as_str(), payload).await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, action.as_str()).await);
        }

        let envelope: RelayEnvelope = response.json().await.map_err(|e| {
            AppError::malformed_ai_output(format!("relay envelope for '{action}': {e}"))
        })?;
        Ok(envelope.data)
    }

    async fn invoke_stream(&self, message: &str, history: &[ChatMessage]) -> AppResult<ChatStream> {
        let response = self
            .post_action("chatStream", json!({ "message": message, "history": history }))
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, "chatStream").await);
        }

        let mut bytes = Box::pin(response.bytes_stream());
        let stream = async_stream::try_stream! {
            let mut parser = SseLineBuffer::new();
            while let Some(chunk) = bytes.next().await {
                let chunk: Bytes = chunk.map_err(|e| {
                    AppError::ai_invocation_failed(format!("chat stream interrupted: {e}"))
                })?;
                for event in parser.feed(&chunk) {
                    match event {
                        SseEvent::Data(payload) => {
                            let parsed: RelayStreamChunk = serde_json::from_str(&payload)
                                .map_err(|e| {
                                    AppError::malformed_ai_output(format!(
                                        "chat stream chunk: {e}"
                                    ))
                                })?;
                            yield StreamChunk {
                                delta: parsed.text,
                                is_final: false,
                            };
                        }
                        SseEvent::Done => {
                            yield StreamChunk {
                                delta: String::new(),
                                is_final: true,
                            };
                            return;
                        }
                    }
                }
            }
            yield StreamChunk {
                delta: String::new(),
                is_final: true,
            };
        };

        Ok(Box::pin(stream))
    }
}
