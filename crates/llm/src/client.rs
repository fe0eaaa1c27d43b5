//! LLM Client (C9, §4.9).
//!
//! Grounded on the teacher's `llm::claude::ClaudeBackend`: a pooled
//! `reqwest::Client`, SSE `data:` line parsing over a growing string
//! buffer, and a `tokio::sync::mpsc` channel bridging the HTTP response
//! stream to an async consumer. The vendor wire format is out of scope
//! (§1 non-goals), so this client targets the OpenAI-compatible chat
//! completion envelope described in §6 rather than Claude's native
//! `content_block_delta` shape.

use crate::error::LlmError;
use crate::prompt::Message;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// `{model, messages, temperature, max_tokens, stream}` (§4.9).
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Result of [`LlmClient::complete`].
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub finish_reason: Option<String>,
}

/// One streamed fragment from [`LlmClient::stream`]. A chunk carries zero
/// or more delta content fragments; `done` marks the provider's terminal
/// marker.
#[derive(Debug, Clone, Default)]
pub struct ChatChunk {
    pub delta: String,
    pub done: bool,
}

/// Chat-completion client over an OpenAI-compatible HTTP API. Holds a
/// pooled, HTTP/2-preferring `reqwest::Client`; authentication and base
/// URL are injected at construction (§4.9). Never retries — retry/fallback
/// policy belongs to the orchestrator (C12) via the circuit breaker (C7).
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        // reqwest negotiates HTTP/2 via ALPN automatically when the server
        // supports it; we just tune the idle pool for a long-lived process.
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, messages: Vec<Message>, temperature: f32, max_tokens: u32, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
            stream,
        }
    }

    /// `complete(ctx, req) -> response` (§4.9): blocking single-shot call.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatResponse, LlmError> {
        let body = self.request_body(messages, temperature, max_tokens, false);

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider { status: status.as_u16(), body: text });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response had no choices".to_string()))?;

        Ok(ChatResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
        })
    }

    /// `stream(ctx, req) -> lazy sequence of chunk` (§4.9), realized as a
    /// bounded `mpsc::Receiver<ChatChunk>`. Dropping the receiver (or the
    /// caller's future being cancelled) closes the sender side and, in
    /// turn, the SSE read loop and the underlying HTTP connection on its
    /// next poll.
    pub async fn stream(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<mpsc::Receiver<Result<ChatChunk, LlmError>>, LlmError> {
        let body = self.request_body(messages, temperature, max_tokens, true);

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider { status: status.as_u16(), body: text });
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(Self::pump_sse(response, tx));
        Ok(rx)
    }

    async fn pump_sse(response: reqwest::Response, tx: mpsc::Sender<Result<ChatChunk, LlmError>>) {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        loop {
            let next = stream.next().await;
            let Some(chunk) = next else { break };

            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(Err(LlmError::from(e))).await;
                    break;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer = buffer[line_end + 1..].to_string();

                if line.is_empty() {
                    continue;
                }
                let Some(json_str) = line.strip_prefix("data: ") else {
                    continue;
                };
                if json_str == "[DONE]" {
                    let _ = tx.send(Ok(ChatChunk { delta: String::new(), done: true })).await;
                    return;
                }

                match serde_json::from_str::<StreamChunk>(json_str) {
                    Ok(parsed) => {
                        let Some(choice) = parsed.choices.into_iter().next() else {
                            tracing::warn!("dropping malformed LLM chunk: no choices");
                            continue;
                        };
                        let delta = choice.delta.content.unwrap_or_default();
                        let done = choice.finish_reason.is_some();
                        if tx.send(Ok(ChatChunk { delta, done })).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed LLM chunk");
                        continue;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_trailing_slash_base_url() {
        let client = LlmClient::new("https://api.example.com/v1/", "key", "test-model").unwrap();
        assert_eq!(client.chat_url(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn request_body_carries_stream_flag() {
        let client = LlmClient::new("https://api.example.com/v1", "key", "test-model").unwrap();
        let body = client.request_body(vec![Message::user("hi")], 0.7, 256, true);
        assert!(body.stream);
        assert_eq!(body.model, "test-model");
    }

    #[test]
    fn malformed_stream_chunk_json_is_not_fatal() {
        let result = serde_json::from_str::<StreamChunk>("{not json");
        assert!(result.is_err());
    }

    #[test]
    fn stream_chunk_with_no_choices_parses_but_is_empty() {
        let parsed: StreamChunk = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[tokio::test]
    async fn complete_request_serializes_expected_shape() {
        let client = LlmClient::new("https://api.example.com/v1", "key", "test-model").unwrap();
        let body = client.request_body(
            vec![Message::system("sys"), Message::user("hello")],
            0.5,
            128,
            false,
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["max_tokens"], 128);
        assert_eq!(json["stream"], false);
    }

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn complete_parses_first_choice_content() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "you're doing great"}, "finish_reason": "stop"}]
            })))
            .mount(&mock_server)
            .await;

        let client = LlmClient::new(mock_server.uri(), "key", "test-model").unwrap();
        let response = client.complete(vec![Message::user("hi")], 0.7, 200).await.unwrap();

        assert_eq!(response.content, "you're doing great");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn complete_surfaces_provider_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .mount(&mock_server)
            .await;

        let client = LlmClient::new(mock_server.uri(), "key", "test-model").unwrap();
        let err = client.complete(vec![Message::user("hi")], 0.7, 200).await.unwrap_err();

        assert!(matches!(err, LlmError::Provider { status: 503, .. }));
    }

    #[tokio::test]
    async fn stream_yields_deltas_then_done() {
        let mock_server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"hel\"},\"finish_reason\":null}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n\
                    data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&mock_server)
            .await;

        let client = LlmClient::new(mock_server.uri(), "key", "test-model").unwrap();
        let mut rx = client.stream(vec![Message::user("hi")], 0.7, 200).await.unwrap();

        let mut full = String::new();
        let mut saw_done = false;
        while let Some(item) = rx.recv().await {
            let chunk = item.unwrap();
            if chunk.done {
                saw_done = true;
                break;
            }
            full.push_str(&chunk.delta);
        }

        assert_eq!(full, "hello");
        assert!(saw_done);
    }

    #[tokio::test]
    async fn stream_drops_malformed_chunk_without_aborting() {
        let mock_server = MockServer::start().await;
        let body = "data: {not valid json}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"ok\"},\"finish_reason\":\"stop\"}]}\n\n\
                    data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&mock_server)
            .await;

        let client = LlmClient::new(mock_server.uri(), "key", "test-model").unwrap();
        let mut rx = client.stream(vec![Message::user("hi")], 0.7, 200).await.unwrap();

        let mut deltas = Vec::new();
        while let Some(item) = rx.recv().await {
            let chunk = item.unwrap();
            if !chunk.delta.is_empty() {
                deltas.push(chunk.delta);
            }
            if chunk.done {
                break;
            }
        }

        assert_eq!(deltas, vec!["ok".to_string()]);
    }
}
