//! Length-capped line framing for serial byte streams.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

/// Splits a byte stream into `\n`-terminated lines of bounded length.
///
/// A line longer than `max_len` bytes (terminator excluded) is discarded up
/// to and including its terminator, so a peer that never sends a newline
/// cannot grow the buffer. Partial lines are kept across calls, which makes
/// [`next_line`](Self::next_line) cancel-safe.
#[derive(Debug)]
pub struct LineReader {
    buffer: Vec<u8>,
    max_len: usize,
    discarding: bool,
    dropped: u64,
}

impl LineReader {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_len.min(1024)),
            max_len,
            discarding: false,
            dropped: 0,
        }
    }

    /// Number of overlong lines discarded so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Next line without its `\n`, or `None` at end of stream.
    ///
    /// An unterminated final line is returned before `None`.
    pub async fn next_line<R>(&mut self, reader: &mut R) -> io::Result<Option<Vec<u8>>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let available = reader.fill_buf().await?;

            if available.is_empty() {
                if self.discarding {
                    self.finish_discard();
                }
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buffer)));
            }

            let (used, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };

            if !self.discarding {
                let body = if complete { &available[..used - 1] } else { &available[..used] };
                if self.buffer.len() + body.len() > self.max_len {
                    self.buffer.clear();
                    self.discarding = true;
                } else {
                    self.buffer.extend_from_slice(body);
                }
            }
            reader.consume(used);

            if complete {
                if self.discarding {
                    self.finish_discard();
                    continue;
                }
                return Ok(Some(std::mem::take(&mut self.buffer)));
            }
        }
    }

    fn finish_discard(&mut self) {
        self.discarding = false;
        self.dropped += 1;
        warn!("Dropped line longer than {} bytes", self.max_len);
    }
}
