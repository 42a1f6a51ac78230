//! Wire types for the Ollama generate API.
//!
//! Requests are a single JSON object; streamed responses are newline-delimited
//! JSON, one [`GenerateChunk`] per line.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model to run, e.g. `deepseek-coder:latest`.
    pub model: String,
    /// Full prompt text.
    pub prompt: String,
    /// Ask the server to stream fragments as they are produced.
    pub stream: bool,
}

/// One line of a streamed generate response.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateChunk {
    /// Text fragment produced since the previous line.
    #[serde(default)]
    pub response: String,
    /// Set on the final line of the stream.
    #[serde(default)]
    pub done: bool,
    /// Server-side error reported mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

/// Error body returned with a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    /// Extract the server's error message, falling back to the raw body.
    pub fn message_from(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) => body.trim().to_string(),
        }
    }
}

/// Framing for streamed responses: newline-delimited JSON.
pub mod framing {
    use std::collections::VecDeque;

    /// Splits an arbitrarily chunked byte stream into lines.
    #[derive(Debug, Default)]
    pub struct LineDecoder {
        partial: Vec<u8>,
        lines: VecDeque<Vec<u8>>,
    }

    impl LineDecoder {
        /// Feed the next transport chunk.
        pub fn push(&mut self, bytes: &[u8]) {
            for &byte in bytes {
                if byte == b'\n' {
                    self.lines.push_back(std::mem::take(&mut self.partial));
                } else {
                    self.partial.push(byte);
                }
            }
        }

        /// Flush a final line that was not newline-terminated.
        pub fn finish(&mut self) {
            if !self.partial.is_empty() {
                self.lines.push_back(std::mem::take(&mut self.partial));
            }
        }

        /// Next complete, non-blank line, with a trailing `\r` removed.
        pub fn next_line(&mut self) -> Option<Vec<u8>> {
            while let Some(mut line) = self.lines.pop_front() {
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if !line.iter().all(u8::is_ascii_whitespace) {
                    return Some(line);
                }
            }
            None
        }
    }
}
