//! Ollama backend implementation.
//!
//! Ollama is a local LLM server; `/api/generate` streams the completion back as
//! newline-delimited JSON.

use crate::protocol::framing::LineDecoder;
use crate::protocol::{ErrorBody, GenerateChunk, GenerateRequest};
use anyhow::{anyhow, Context, Result};
use futures::{stream, Stream, StreamExt};
use reqwest::Client;
use tracing::debug;

/// Ollama client for local LLM inference.
pub struct OllamaClient {
    pub model: String,
    host: String,
    client: Client,
}

impl OllamaClient {
    /// Create a new Ollama client. No request timeout is set.
    pub fn new(model: String, host: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            model,
            host: host.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Start a streaming generation and return its fragments.
    pub async fn generate_stream(
        &self,
        prompt: &str,
    ) -> Result<impl Stream<Item = Result<String>>> {
        let url = format!("{}/api/generate", self.host);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: true,
        };

        debug!("POST {} (model {})", url, self.model);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to connect to Ollama at {}", self.host))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Ollama request failed with status {}: {}",
                status,
                ErrorBody::message_from(&body)
            ));
        }

        Ok(fragments(Box::pin(response.bytes_stream())))
    }

    /// Generate a full response for the prompt.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let fragments = self.generate_stream(prompt).await?;
        super::collect_response(fragments).await
    }
}

struct FragmentState<S> {
    chunks: S,
    decoder: LineDecoder,
    exhausted: bool,
    done: bool,
}

/// Decode a chunked NDJSON body into text fragments.
///
/// Ends after the line marked `done`, or when the body ends.
pub fn fragments<S, B, E>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = FragmentState {
        chunks,
        decoder: LineDecoder::default(),
        exhausted: false,
        done: false,
    };
    stream::try_unfold(state, next_fragment::<S, B, E>)
}

async fn next_fragment<S, B, E>(
    mut state: FragmentState<S>,
) -> Result<Option<(String, FragmentState<S>)>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    loop {
        if state.done {
            return Ok(None);
        }

        if let Some(line) = state.decoder.next_line() {
            let chunk: GenerateChunk = serde_json::from_slice(&line).with_context(|| {
                format!(
                    "Malformed response line from Ollama: {}",
                    String::from_utf8_lossy(&line)
                )
            })?;
            if let Some(error) = chunk.error {
                return Err(anyhow!("Ollama reported an error: {}", error));
            }
            state.done = chunk.done;
            return Ok(Some((chunk.response, state)));
        }

        if state.exhausted {
            return Ok(None);
        }

        match state.chunks.next().await {
            Some(bytes) => {
                let bytes = bytes.context("Failed to read response stream from Ollama")?;
                state.decoder.push(bytes.as_ref());
            }
            None => {
                state.decoder.finish();
                state.exhausted = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::collect_response;
    use std::io;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = io::Result<&'static [u8]>> + Unpin {
        stream::iter(parts.iter().copied().map(|p| Ok(p.as_bytes())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_fragments_in_order() {
        let body = chunks(&[
            "{\"response\":\"echo \",\"done\":false}\n",
            "{\"response\":\"hello\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}\n",
        ]);
        assert_eq!(collect_response(fragments(body)).await.unwrap(), "echo hello");
    }

    #[tokio::test]
    async fn test_fragments_split_across_chunks() {
        let body = chunks(&[
            "{\"respon",
            "se\":\"ls\"}\n{\"resp",
            "onse\":\" -la\"}\n{\"done\":true}",
        ]);
        assert_eq!(collect_response(fragments(body)).await.unwrap(), "ls -la");
    }

    #[tokio::test]
    async fn test_fragments_stop_after_done() {
        let body = chunks(&[
            "{\"response\":\"pwd\",\"done\":true}\n",
            "{\"response\":\"ignored\"}\n",
        ]);
        let collected: Vec<String> = fragments(body)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(collected, vec!["pwd".to_string()]);
    }

    #[tokio::test]
    async fn test_fragments_stream_error() {
        let body = chunks(&[
            "{\"response\":\"rm\"}\n",
            "{\"error\":\"out of memory\"}\n",
        ]);
        let err = collect_response(fragments(body)).await.unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_fragments_malformed_line() {
        let body = chunks(&["not json\n"]);
        let err = collect_response(fragments(body)).await.unwrap_err();
        assert!(err.to_string().contains("Malformed response line"));
    }

    #[tokio::test]
    async fn test_fragments_transport_error() {
        let body = stream::iter(vec![
            Ok(&b"{\"response\":\"a\"}\n"[..]),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let err = collect_response(fragments(body)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("reset"));
    }

    /// Serve a single canned HTTP response and hand back the request body.
    async fn serve_once(status: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut tmp = [0u8; 4096];
            let request_body = loop {
                let n = socket.read(&mut tmp).await.unwrap();
                buf.extend_from_slice(&tmp[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break text[header_end + 4..].to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request_body
        });

        (host, handle)
    }

    #[tokio::test]
    async fn test_generate_against_server() {
        let body = concat!(
            "{\"model\":\"m\",\"response\":\"echo \",\"done\":false}\n",
            "{\"model\":\"m\",\"response\":\"hello\",\"done\":false}\n",
            "{\"model\":\"m\",\"response\":\"\",\"done\":true}\n",
        )
        .to_string();
        let (host, server) = serve_once("200 OK", body).await;

        let client = OllamaClient::new("test-model".to_string(), format!("{}/", host)).unwrap();
        let response = client.generate("Task: say hello").await.unwrap();
        assert_eq!(response, "echo hello");

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["model"], "test-model");
        assert_eq!(request["prompt"], "Task: say hello");
        assert_eq!(request["stream"], true);
    }

    #[tokio::test]
    async fn test_generate_status_error() {
        let body = "{\"error\":\"model 'nope' not found\"}".to_string();
        let (host, server) = serve_once("404 Not Found", body).await;

        let client = OllamaClient::new("nope".to_string(), host).unwrap();
        let err = client.generate("Task: x").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("model 'nope' not found"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = OllamaClient::new("m".to_string(), host.clone()).unwrap();
        let err = client.generate("Task: x").await.unwrap_err();
        assert!(err.to_string().contains(&host));
    }
}
