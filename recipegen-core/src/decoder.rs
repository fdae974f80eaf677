//! Chunk decoding: raw body bytes → ordered frame payload segments.
//!
//! A chunk is decoded as UTF-8 (lossy), split on the blank-line frame
//! delimiter, and stripped of the `data:` marker at the start of each segment.
//! Segment sides that touch a delimiter are trimmed. The outer edges of the
//! chunk are left alone: a frame cut in the middle of a JSON string must keep
//! its whitespace when the reassembler glues the halves back together.

/// Terminates every frame on the wire.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Literal prefix in front of each frame payload.
pub const DATA_MARKER: &str = "data:";

/// Remove the leading `data:` marker (and the single space that usually follows it).
pub fn strip_marker(segment: &str) -> &str {
    match segment.strip_prefix(DATA_MARKER) {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => segment,
    }
}

/// Decode one chunk in isolation. Invalid byte sequences become U+FFFD.
pub fn decode_chunk(bytes: &[u8]) -> Vec<String> {
    split_frames(&String::from_utf8_lossy(bytes))
}

fn split_frames(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split(FRAME_DELIMITER).collect();
    let last = pieces.len().saturating_sub(1);
    pieces
        .into_iter()
        .enumerate()
        .filter_map(|(i, piece)| {
            let mut s = piece;
            if i > 0 {
                s = s.trim_start();
            }
            if i < last {
                s = s.trim_end();
            }
            let s = strip_marker(s);
            (!s.is_empty()).then(|| s.to_string())
        })
        .collect()
}

/// Stateful decoder for a whole response body.
///
/// Holds back an unfinished multi-byte UTF-8 sequence at the end of a chunk
/// so characters like `ã` survive being cut by the transport.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let keep = incomplete_tail_len(&self.pending);
        let tail = self.pending.split_off(self.pending.len() - keep);
        let head = std::mem::replace(&mut self.pending, tail);
        split_frames(&String::from_utf8_lossy(&head))
    }

    /// Flush held bytes at end of stream.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.pending);
        split_frames(&String::from_utf8_lossy(&rest))
    }

    pub fn has_pending_bytes(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Length of a truncated UTF-8 sequence at the end of `buf` (0 if none).
fn incomplete_tail_len(buf: &[u8]) -> usize {
    for back in 1..=buf.len().min(3) {
        let b = buf[buf.len() - back];
        if b & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let need = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if need > back { back } else { 0 };
    }
    0
}
