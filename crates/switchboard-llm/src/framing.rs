//! Downstream framing in the `data: {json}` / `data: [DONE]` streaming
//! convention used by chat completion APIs.

use serde::Serialize;

const CHUNK_OBJECT: &str = "chat.completion.chunk";

#[derive(Debug, Serialize)]
struct Chunk<'a> {
    id: &'a str,
    object: &'static str,
    created: i64,
    model: &'a str,
    choices: [ChunkChoice<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChunkChoice<'a> {
    index: u32,
    delta: Delta<'a>,
    finish_reason: Option<&'static str>,
}

#[derive(Debug, Default, Serialize)]
struct Delta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

/// Renders one completion's fragments as server-sent events.
///
/// Every event of a completion carries the same `id` and `created`.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    id: String,
    created: i64,
    model: String,
}

impl ChunkEncoder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn fragment(&self, content: &str) -> String {
        self.event(Delta { content: Some(content) }, None)
    }

    /// The closing chunk followed by the `[DONE]` sentinel.
    pub fn finish(&self) -> String {
        let mut out = self.event(Delta::default(), Some("stop"));
        out.push_str(&done());
        out
    }

    /// An error event followed by the `[DONE]` sentinel.
    pub fn error(&self, message: &str) -> String {
        let body = serde_json::json!({ "error": message });
        format!("data: {body}\n\n{}", done())
    }

    fn event(&self, delta: Delta<'_>, finish_reason: Option<&'static str>) -> String {
        let chunk = Chunk {
            id: &self.id,
            object: CHUNK_OBJECT,
            created: self.created,
            model: &self.model,
            choices: [ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        };
        // Serializing borrowed strings and integers cannot fail.
        let body = serde_json::to_string(&chunk).unwrap_or_default();
        format!("data: {body}\n\n")
    }
}

fn done() -> String {
    "data: [DONE]\n\n".to_string()
}
