//! Partial-frame reassembly.
//!
//! The transport does not promise that a frame arrives inside one chunk. A
//! payload that does not parse is parked in a single-slot carry buffer and
//! glued onto the first segment of the next chunk before parsing again.
//!
//! Only one fragment can be pending. If several segments of one chunk fail to
//! parse, the last one wins and the earlier ones are lost as noise.
//!
//! The `[DONE]` sentinel closes the stream: every segment after it, in the
//! same chunk or a later one, is ignored.

use crate::decoder::strip_marker;
use crate::model::CompletionRecord;

/// End-of-stream payload. Never parsed, never contributes text.
pub const SENTINEL: &str = "[DONE]";

/// Result of parsing one frame payload.
#[derive(Debug)]
pub enum ParseOutcome {
    Record(CompletionRecord),
    Sentinel,
    /// Well-formed record without any choice entry.
    EmptyChoices(CompletionRecord),
    /// Not a complete record (cut by a chunk boundary, or plain noise).
    Incomplete(serde_json::Error),
}

pub fn parse_payload(payload: &str) -> ParseOutcome {
    if payload == SENTINEL {
        return ParseOutcome::Sentinel;
    }
    match serde_json::from_str::<CompletionRecord>(payload) {
        Ok(rec) if rec.first_choice().is_some() => ParseOutcome::Record(rec),
        Ok(rec) => ParseOutcome::EmptyChoices(rec),
        Err(e) => ParseOutcome::Incomplete(e),
    }
}

/// One decoded frame handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub raw: String,
    pub record: Option<CompletionRecord>,
}

impl StreamEvent {
    pub fn is_valid(&self) -> bool {
        self.record.is_some()
    }

    /// Text of the first choice, for valid events.
    pub fn text(&self) -> Option<&str> {
        self.record
            .as_ref()
            .and_then(CompletionRecord::first_choice)
            .map(|c| c.text.as_str())
    }
}

#[derive(Debug, Default)]
pub struct Reassembler {
    carry: Option<String>,
    sentinel_seen: bool,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the segments of one chunk, in order.
    ///
    /// Valid records come back as valid events, zero-choice records as invalid
    /// events. Sentinels and blank segments produce nothing, and nothing is
    /// produced once the sentinel has been seen.
    pub fn feed(&mut self, segments: Vec<String>) -> Vec<StreamEvent> {
        if self.sentinel_seen {
            return Vec::new();
        }
        let mut segments = segments.into_iter();
        let Some(first) = segments.next() else {
            return Vec::new();
        };
        let first = match self.carry.take() {
            Some(mut carried) => {
                carried.push_str(&first);
                carried
            }
            None => first,
        };

        let mut events = Vec::new();
        for raw in std::iter::once(first).chain(segments) {
            let payload = strip_marker(raw.trim());
            if payload.is_empty() {
                continue;
            }
            match parse_payload(payload) {
                ParseOutcome::Sentinel => {
                    self.sentinel_seen = true;
                    if let Some(left) = self.carry.take() {
                        tracing::trace!(len = left.len(), "carry dropped at sentinel");
                    }
                    break;
                }
                ParseOutcome::Record(rec) => events.push(StreamEvent {
                    raw: payload.to_string(),
                    record: Some(rec),
                }),
                ParseOutcome::EmptyChoices(_) => events.push(StreamEvent {
                    raw: payload.to_string(),
                    record: None,
                }),
                ParseOutcome::Incomplete(e) => {
                    tracing::trace!(error = %e, len = raw.len(), "frame incomplete, carrying");
                    self.carry = Some(raw);
                }
            }
        }
        events
    }

    pub fn pending(&self) -> Option<&str> {
        self.carry.as_deref()
    }

    pub fn sentinel_seen(&self) -> bool {
        self.sentinel_seen
    }

    /// Drain whatever is still carried once the stream is over.
    pub fn finish(&mut self) -> Option<String> {
        self.carry.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_chunk;

    fn frame(text: &str) -> String {
        format!(
            "data: {{\"id\":\"1\",\"object\":\"x\",\"created\":0,\"choices\":[{{\"text\":{},\"index\":0,\"logprobs\":null,\"finish_reason\":null}}],\"model\":\"m\"}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    fn texts(events: &[StreamEvent]) -> Vec<&str> {
        events.iter().filter_map(StreamEvent::text).collect()
    }

    #[test]
    fn parse_outcomes() {
        assert!(matches!(parse_payload("[DONE]"), ParseOutcome::Sentinel));
        assert!(matches!(parse_payload("{\"id\":"), ParseOutcome::Incomplete(_)));
        assert!(matches!(
            parse_payload("{\"id\":\"1\",\"choices\":[]}"),
            ParseOutcome::EmptyChoices(_)
        ));
        assert!(matches!(
            parse_payload("{\"choices\":[{\"text\":\"a\"}]}"),
            ParseOutcome::Record(_)
        ));
    }

    #[test]
    fn whole_frames_in_one_chunk() {
        let mut r = Reassembler::new();
        let chunk = format!("{}{}", frame("Bolo "), frame("de milho"));
        let events = r.feed(decode_chunk(chunk.as_bytes()));
        assert_eq!(texts(&events), vec!["Bolo ", "de milho"]);
        assert!(r.pending().is_none());
    }

    #[test]
    fn frame_split_mid_json_is_carried_and_merged() {
        let whole = frame("Bolo ");
        let (a, b) = whole.split_at(40);
        let mut r = Reassembler::new();
        assert!(r.feed(decode_chunk(a.as_bytes())).is_empty());
        assert!(r.pending().is_some());
        let events = r.feed(decode_chunk(b.as_bytes()));
        assert_eq!(texts(&events), vec!["Bolo "]);
        assert!(r.pending().is_none());
    }

    #[test]
    fn split_inside_marker() {
        let whole = frame("x");
        let mut r = Reassembler::new();
        assert!(r.feed(decode_chunk(whole[..2].as_bytes())).is_empty());
        assert_eq!(r.pending(), Some("da"));
        let events = r.feed(decode_chunk(whole[2..].as_bytes()));
        assert_eq!(texts(&events), vec!["x"]);
    }

    #[test]
    fn split_keeps_whitespace_inside_strings() {
        let whole = frame("a   b");
        let cut = whole.find("a   b").unwrap() + 2;
        let mut r = Reassembler::new();
        r.feed(decode_chunk(whole[..cut].as_bytes()));
        let events = r.feed(decode_chunk(whole[cut..].as_bytes()));
        assert_eq!(texts(&events), vec!["a   b"]);
    }

    #[test]
    fn sentinel_is_skipped_and_noted() {
        let mut r = Reassembler::new();
        let events = r.feed(decode_chunk(b"data: [DONE]\n\n"));
        assert!(events.is_empty());
        assert!(r.sentinel_seen());
        assert!(r.pending().is_none());
    }

    #[test]
    fn split_sentinel_is_still_recognised() {
        let mut r = Reassembler::new();
        r.feed(decode_chunk(b"data: [DO"));
        let events = r.feed(decode_chunk(b"NE]\n\n"));
        assert!(events.is_empty());
        assert!(r.sentinel_seen());
    }

    #[test]
    fn empty_choices_surface_as_invalid_event_only() {
        let mut r = Reassembler::new();
        let chunk = format!(
            "data: {{\"id\":\"e\",\"choices\":[]}}\n\n{}",
            frame("ok")
        );
        let events = r.feed(decode_chunk(chunk.as_bytes()));
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_valid());
        assert_eq!(events[1].text(), Some("ok"));
        assert!(r.pending().is_none());
    }

    #[test]
    fn last_unparsable_segment_wins_the_slot() {
        let mut r = Reassembler::new();
        let events = r.feed(vec!["noise-1".into(), "noise-2".into()]);
        assert!(events.is_empty());
        assert_eq!(r.pending(), Some("noise-2"));
    }

    #[test]
    fn nothing_after_sentinel_is_emitted() {
        let mut r = Reassembler::new();
        let chunk = format!("{}data: [DONE]\n\n{}", frame("a"), frame("b"));
        let events = r.feed(decode_chunk(chunk.as_bytes()));
        assert_eq!(texts(&events), vec!["a"]);
        assert!(r.feed(decode_chunk(frame("c").as_bytes())).is_empty());
        assert!(r.pending().is_none());
    }

    #[test]
    fn carry_survives_chunk_without_segments() {
        let mut r = Reassembler::new();
        r.feed(vec!["{\"choices\":[{\"text\":".into()]);
        assert!(r.feed(Vec::new()).is_empty());
        let events = r.feed(vec!["\"z\"}]}".into()]);
        assert_eq!(texts(&events), vec!["z"]);
    }

    #[test]
    fn finish_drains_leftover() {
        let mut r = Reassembler::new();
        r.feed(vec!["{\"trunc".into()]);
        assert_eq!(r.finish().as_deref(), Some("{\"trunc"));
        assert!(r.pending().is_none());
    }
}
