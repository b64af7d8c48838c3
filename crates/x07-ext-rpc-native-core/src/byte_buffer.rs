use std::collections::VecDeque;
use std::io::{self, BufRead, Read};

use bytes::{Buf, Bytes};

/// A message payload held as a sequence of byte runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    chunks: Vec<Bytes>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `data` into a single owned chunk.
    pub fn from_copied(data: &[u8]) -> Self {
        ByteBuffer {
            chunks: vec![Bytes::copy_from_slice(data)],
        }
    }

    /// Copies `data` into chunks of at most `chunk_bytes` bytes. Zero means a
    /// single chunk.
    pub fn from_copied_chunked(data: &[u8], chunk_bytes: usize) -> Self {
        if chunk_bytes == 0 || data.len() <= chunk_bytes {
            return Self::from_copied(data);
        }
        ByteBuffer {
            chunks: data
                .chunks(chunk_bytes)
                .map(Bytes::copy_from_slice)
                .collect(),
        }
    }

    pub fn push_chunk(&mut self, chunk: Bytes) {
        self.chunks.push(chunk);
    }

    /// Total length across all chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Bytes::is_empty)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> std::slice::Iter<'_, Bytes> {
        self.chunks.iter()
    }

    /// Copies every chunk, front to back, into `dst` and returns the number of
    /// bytes written.
    ///
    /// Panics if `dst` cannot hold the whole payload. Nothing is ever
    /// truncated.
    pub fn copy_to_slice(&self, dst: &mut [u8]) -> usize {
        let mut offset = 0;
        for chunk in &self.chunks {
            let end = offset + chunk.len();
            assert!(
                end <= dst.len(),
                "destination buffer too small: {} bytes for a message of at least {end}",
                dst.len()
            );
            dst[offset..end].copy_from_slice(chunk);
            offset = end;
        }
        offset
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    pub fn into_reader(self) -> MessageReader {
        let remaining = self.len();
        MessageReader {
            chunks: self.chunks.into(),
            remaining,
        }
    }
}

impl From<Bytes> for ByteBuffer {
    fn from(chunk: Bytes) -> Self {
        ByteBuffer {
            chunks: vec![chunk],
        }
    }
}

impl FromIterator<Bytes> for ByteBuffer {
    fn from_iter<I: IntoIterator<Item = Bytes>>(iter: I) -> Self {
        ByteBuffer {
            chunks: iter.into_iter().collect(),
        }
    }
}

/// Sequential reader over a chunked payload.
#[derive(Debug)]
pub struct MessageReader {
    chunks: VecDeque<Bytes>,
    remaining: usize,
}

impl MessageReader {
    /// Bytes not yet read.
    pub fn len(&self) -> usize {
        self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

impl Read for MessageReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = {
            let chunk = self.fill_buf()?;
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for MessageReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.chunks.front().is_some_and(Bytes::is_empty) {
            self.chunks.pop_front();
        }
        Ok(self.chunks.front().map_or(&[][..], |c| &c[..]))
    }

    fn consume(&mut self, amt: usize) {
        let Some(front) = self.chunks.front_mut() else {
            return;
        };
        let amt = amt.min(front.len());
        front.advance(amt);
        self.remaining -= amt;
        if front.is_empty() {
            self.chunks.pop_front();
        }
    }
}
