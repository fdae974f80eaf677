use serde::{Deserialize, Serialize};

/// Structured record emitted once at the end of every generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GenerationLog {
    pub request_id: Option<String>,
    /// Transport name, e.g. "http", "scripted".
    pub transport: Option<String>,
    pub server_request_id: Option<String>,
    pub created_at_ms: Option<u64>,
    pub latency_ms: Option<u64>,

    pub fragments: u32,
    /// Length of the generated text in chars.
    pub text_len: u32,
    pub finish_reason: Option<String>,
    pub aborted: bool,

    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl GenerationLog {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn request_id_opt(mut self, v: Option<&str>) -> Self {
        self.request_id = v.map(|s| s.to_string());
        self
    }
    pub fn transport(mut self, v: &str) -> Self {
        self.transport = Some(v.to_string());
        self
    }
    pub fn server_request_id_opt(mut self, v: Option<&str>) -> Self {
        self.server_request_id = v.map(|s| s.to_string());
        self
    }
    pub fn created_at_ms(mut self, v: u64) -> Self {
        self.created_at_ms = Some(v);
        self
    }
    pub fn latency_ms(mut self, v: u64) -> Self {
        self.latency_ms = Some(v);
        self
    }
    pub fn output(mut self, fragments: u32, text_len: u32) -> Self {
        self.fragments = fragments;
        self.text_len = text_len;
        self
    }
    pub fn finish_reason_opt(mut self, v: Option<&str>) -> Self {
        self.finish_reason = v.map(|s| s.to_string());
        self
    }
    pub fn aborted(mut self, v: bool) -> Self {
        self.aborted = v;
        self
    }
    pub fn error(mut self, kind: &str, message: &str) -> Self {
        self.error_kind = Some(kind.to_string());
        self.error_message = Some(message.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generation_log_serializes() {
        let log = GenerationLog::new()
            .request_id_opt(Some("req-1"))
            .transport("http")
            .latency_ms(42)
            .output(3, 17)
            .finish_reason_opt(Some("stop"));

        let as_json = serde_json::to_value(&log).unwrap();
        assert_eq!(as_json["request_id"], json!("req-1"));
        assert_eq!(as_json["transport"], json!("http"));
        assert_eq!(as_json["latency_ms"], json!(42));
        assert_eq!(as_json["fragments"], json!(3));
        assert_eq!(as_json["text_len"], json!(17));
        assert_eq!(as_json["finish_reason"], json!("stop"));
        assert_eq!(as_json["aborted"], json!(false));
        assert_eq!(as_json["error_kind"], json!(null));
    }
}
