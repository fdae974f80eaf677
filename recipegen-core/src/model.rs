use serde::{Deserialize, Serialize};

/// Body of the POST to the generate endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    pub fn from_wire(s: Option<&str>) -> Option<Self> {
        match s {
            Some("stop") => Some(Self::Stop),
            Some("length") => Some(Self::Length),
            Some("content_filter") => Some(Self::ContentFilter),
            Some(_) => Some(Self::Other),
            None => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::Other => "other",
        }
    }
}

/// One candidate completion fragment inside a streamed record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Choice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub logprobs: Option<serde_json::Value>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One streamed completion record, as carried by a `data:` frame.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletionRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    /// Absent or `null` choices decode as `None`; both count as empty.
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    #[serde(default)]
    pub model: String,
}

impl CompletionRecord {
    /// The only choice this client consumes.
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.as_deref().and_then(<[Choice]>::first)
    }
}

/// Item of the lazy fragment stream produced for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub index: u32,
    pub finish_reason: Option<FinishReason>,
}

impl From<&Choice> for Fragment {
    fn from(c: &Choice) -> Self {
        Self {
            text: c.text.clone(),
            index: c.index,
            finish_reason: FinishReason::from_wire(c.finish_reason.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_decodes_wire_shape() {
        let json = r#"{"id":"1","object":"text_completion","created":1670000000,
            "choices":[{"text":"Bolo ","index":0,"logprobs":null,"finish_reason":null}],
            "model":"text-davinci-003"}"#;
        let rec: CompletionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.id, "1");
        assert_eq!(rec.created, 1_670_000_000);
        let c = rec.first_choice().unwrap();
        assert_eq!(c.text, "Bolo ");
        assert_eq!(c.finish_reason, None);
        assert_eq!(rec.model, "text-davinci-003");
    }

    #[test]
    fn missing_or_null_choices_decode_as_empty() {
        let rec: CompletionRecord = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(rec.first_choice().is_none());
        let rec: CompletionRecord = serde_json::from_str(r#"{"id":"x","choices":null}"#).unwrap();
        assert!(rec.first_choice().is_none());
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(FinishReason::from_wire(Some("stop")), Some(FinishReason::Stop));
        assert_eq!(FinishReason::from_wire(Some("length")), Some(FinishReason::Length));
        assert_eq!(
            FinishReason::from_wire(Some("content_filter")),
            Some(FinishReason::ContentFilter)
        );
        assert_eq!(FinishReason::from_wire(Some("weird")), Some(FinishReason::Other));
        assert_eq!(FinishReason::from_wire(None), None);
    }

    #[test]
    fn fragment_from_choice() {
        let c = Choice {
            text: "fim".into(),
            index: 0,
            logprobs: None,
            finish_reason: Some("length".into()),
        };
        let f = Fragment::from(&c);
        assert_eq!(f.text, "fim");
        assert_eq!(f.finish_reason, Some(FinishReason::Length));
    }

    #[test]
    fn generate_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest { prompt: "p".into() }).unwrap();
        assert_eq!(body, serde_json::json!({"prompt": "p"}));
    }
}
