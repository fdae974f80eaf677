//! Fragment streaming: body chunks in, ordered text fragments out.
//!
//! Contract:
//! - Fragments come out in the order their frames arrived, one per valid
//!   record (its first choice). Sentinels, zero-choice records and noise never
//!   produce a fragment.
//! - The stream ends when the body ends or at the `[DONE]` sentinel. Nothing
//!   after the sentinel is emitted, wherever the chunk boundaries fall.
//! - A body read error is yielded once as `Err` and ends the stream.

use std::collections::VecDeque;

use futures_util::StreamExt;

use crate::decoder::ChunkDecoder;
use crate::error::CoreResult;
use crate::http_client::ByteStream;
use crate::model::{CompletionRecord, Fragment};
use crate::reassembler::Reassembler;

/// Boxed stream of fragments for one generation.
pub type FragmentStream = futures::stream::BoxStream<'static, CoreResult<Fragment>>;

/// Synchronous core of the stream: decoder plus reassembler.
#[derive(Debug, Default)]
pub struct FrameParser {
    decoder: ChunkDecoder,
    reassembler: Reassembler,
    skipped: usize,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the fragments it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Fragment> {
        let segments = self.decoder.decode(chunk);
        self.absorb(segments)
    }

    /// End of body: flush held bytes and drop whatever is still carried.
    pub fn finish(&mut self) -> Vec<Fragment> {
        let segments = self.decoder.finish();
        let out = self.absorb(segments);
        if let Some(left) = self.reassembler.finish() {
            tracing::warn!(len = left.len(), "dropping incomplete frame at end of stream");
        }
        out
    }

    /// True once the `[DONE]` sentinel has been seen.
    pub fn sentinel_seen(&self) -> bool {
        self.reassembler.sentinel_seen()
    }

    /// Number of zero-choice records skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn absorb(&mut self, segments: Vec<String>) -> Vec<Fragment> {
        let mut out = Vec::new();
        for ev in self.reassembler.feed(segments) {
            match ev.record.as_ref().and_then(CompletionRecord::first_choice) {
                Some(choice) => out.push(Fragment::from(choice)),
                None => {
                    self.skipped += 1;
                    tracing::warn!(raw = %ev.raw, "record without choices skipped");
                }
            }
        }
        out
    }
}

struct Pump {
    chunks: ByteStream,
    parser: FrameParser,
    ready: VecDeque<Fragment>,
    chunk_no: usize,
    done: bool,
}

impl Pump {
    fn end(&mut self) {
        let tail = self.parser.finish();
        self.ready.extend(tail);
        self.done = true;
    }
}

/// Drive a chunk stream through the parser, lazily.
pub fn fragment_stream(chunks: ByteStream) -> FragmentStream {
    let pump = Pump {
        chunks,
        parser: FrameParser::new(),
        ready: VecDeque::new(),
        chunk_no: 0,
        done: false,
    };
    futures::stream::unfold(pump, |mut pump| async move {
        loop {
            if let Some(f) = pump.ready.pop_front() {
                return Some((Ok(f), pump));
            }
            if pump.done {
                return None;
            }
            if pump.parser.sentinel_seen() {
                tracing::debug!(chunks = pump.chunk_no, "sentinel received");
                pump.end();
                continue;
            }
            match pump.chunks.next().await {
                Some(Ok(bytes)) => {
                    pump.chunk_no += 1;
                    tracing::debug!(chunk = pump.chunk_no, len = bytes.len(), "chunk");
                    let fragments = pump.parser.push(&bytes);
                    pump.ready.extend(fragments);
                }
                Some(Err(e)) => {
                    pump.done = true;
                    return Some((Err(e), pump));
                }
                None => pump.end(),
            }
        }
    })
    .boxed()
}
