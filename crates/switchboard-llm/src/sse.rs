//! Parsing for OpenAI-compatible streaming chat completion bodies.
//!
//! ```text
//! data: {"id":"...","choices":[{"delta":{"content":"Hello"}}]}
//! data: {"id":"...","choices":[{"delta":{"content":" world"}}]}
//! data: [DONE]
//! ```
//!
//! Only `data:` lines matter. A malformed event is skipped, `[DONE]` ends the
//! sequence, and every other line (comments, `event:`, blanks) is ignored.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use switchboard_core::SwitchboardError;
use tracing::debug;

use crate::provider::FragmentStream;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Wire types (deserialization only)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SseFrame {
    #[serde(default)]
    choices: Vec<SseChoice>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    delta: Option<SseDelta>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    content: Option<String>,
}

/// What a single line of the body means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

/// Classify one line of an event-stream body.
pub fn parse_line(line: &str) -> SseLine {
    let Some(data) = line.trim_end().strip_prefix(DATA_PREFIX) else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return SseLine::Done;
    }

    match serde_json::from_str::<SseFrame>(data) {
        Ok(frame) => frame
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|c| !c.is_empty())
            .map(SseLine::Fragment)
            .unwrap_or(SseLine::Skip),
        Err(e) => {
            debug!(error = %e, "skipping malformed event");
            SseLine::Skip
        }
    }
}

/// Splits a chunked byte body into lines.
///
/// Bytes are buffered until a newline arrives, so multi-byte characters split
/// across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        lines
    }

    /// Take the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&raw).trim_end().to_string())
    }
}

/// Drive an event-stream body into a [`FragmentStream`].
///
/// A transport error while reading the body becomes a provider error for
/// `provider`. A body that ends without `[DONE]` ends the stream normally.
pub fn fragments<S, E>(provider: String, body: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut lines = LineBuffer::default();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield Err(SwitchboardError::provider(&provider, format!("stream read error: {e}")));
                    return;
                }
            };
            for line in lines.push(&bytes) {
                match parse_line(&line) {
                    SseLine::Fragment(text) => {
                        yield Ok(text);
                    }
                    SseLine::Done => return,
                    SseLine::Skip => {}
                }
            }
        }

        if let Some(line) = lines.finish()
            && let SseLine::Fragment(text) = parse_line(&line)
        {
            yield Ok(text);
        }
    })
}
