//! OpenAI Chat Completions streaming client.
//!
//! Opens a `stream: true` completion request with a JSON-object response
//! format hint and exposes the response as a channel of [`UpstreamEvent`]s.
//! SSE framing is decoded with [`SseDecoder`].

use anyhow::Result;
use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::CONFIG;
use crate::core::{SseDecoder, SseFrame};
use crate::error::GenerationError;

use super::UpstreamEvent;

/// Streaming client for the text provider.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new() -> Result<Self> {
        if CONFIG.openai_api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY not set");
        }
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(CONFIG.upstream_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: CONFIG.openai_api_key.clone(),
            base_url: CONFIG.openai_base_url.clone(),
        })
    }

    /// Open a streaming completion for a story prompt.
    ///
    /// Returns a bounded receiver; the spawned reader task ends when the
    /// provider finishes, the stream errors, or the receiver is dropped
    /// (client disconnect — dropping the receiver aborts the upstream read).
    pub async fn stream_story(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<UpstreamEvent>, GenerationError> {
        let body = ChatCompletionRequest {
            model: CONFIG.story_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            stream: true,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: CONFIG.story_temperature,
            top_p: CONFIG.story_top_p,
            frequency_penalty: CONFIG.story_frequency_penalty,
            presence_penalty: CONFIG.story_presence_penalty,
            max_tokens: CONFIG.story_max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream {
                status: 0,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {})", e));
            return Err(GenerationError::Upstream {
                status,
                message: text,
            });
        }

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(Self::read_sse_stream(response, tx));
        Ok(rx)
    }

    /// Drain the provider's SSE body into the channel.
    async fn read_sse_stream(response: reqwest::Response, tx: mpsc::Sender<UpstreamEvent>) {
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut saw_done = false;

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    let _ = tx.send(UpstreamEvent::Error(e.to_string())).await;
                    return;
                }
            };

            for frame in decoder.push(&chunk) {
                if frame.is_done() {
                    debug!("upstream stream signalled [DONE]");
                    saw_done = true;
                    break 'outer;
                }
                if !Self::forward_frame(frame, &tx).await {
                    // Receiver gone: the generation was cancelled.
                    return;
                }
            }
        }

        if !saw_done {
            // The provider may close the body without a trailing newline;
            // the last frame is then still sitting in the decoder.
            for frame in decoder.flush() {
                if frame.is_done() {
                    saw_done = true;
                    break;
                }
                if !Self::forward_frame(frame, &tx).await {
                    return;
                }
            }
        }
        if !saw_done {
            debug!("upstream stream ended without [DONE] sentinel");
        }
        let _ = tx.send(UpstreamEvent::Done).await;
    }

    /// Forward one frame's content deltas. Returns false when the receiver
    /// is gone.
    async fn forward_frame(frame: SseFrame, tx: &mpsc::Sender<UpstreamEvent>) -> bool {
        let parsed: ChatStreamChunk = match frame.parse() {
            Ok(c) => c,
            Err(e) => {
                debug!("skipping unparseable frame: {}", e);
                return true;
            }
        };
        for choice in parsed.choices {
            if let Some(content) = choice.delta.content {
                if !content.is_empty()
                    && tx.send(UpstreamEvent::Delta(content)).await.is_err()
                {
                    return false;
                }
            }
        }
        true
    }
}

const SYSTEM_PROMPT: &str = "You are a children's story writer. Respond with a single JSON \
object of the shape {\"title\": string, \"paragraphs\": string[], \"moral\": string or null} \
and nothing else.";

// ============================================================================
// Wire types (OpenAI Chat Completions format)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    response_format: ResponseFormat,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    content: Option<String>,
}
