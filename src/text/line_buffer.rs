use memchr::memchr3;

use crate::error::Error;
use crate::source::ByteSource;

/// Bytes are pulled `READ_CHUNK` at a time, the same strategy as `READ_SIZE`
/// in `ihm_format.c`'s `expand_buffer`, but sized larger than that constant's
/// 1 MiB to keep the amortized read cost low on the larger files this reader
/// is meant to stream. Growing in large chunks, rather than a line at a
/// time, keeps the amortized cost of reading independent of line length.
const READ_CHUNK: usize = 4 << 20;

/// Buffers input and splits it into physical lines.
///
/// Consumed bytes are periodically shifted out of the front of the buffer
/// (rather than ever being retained), so memory use tracks the longest line
/// still live, not the size of the file read so far.
pub(crate) struct LineBuffer<S> {
    source: S,
    buf: Vec<u8>,
    /// Bytes before this index have been returned by `next_line` already.
    pos: usize,
    /// Bytes before this index are valid data read from `source`.
    filled: usize,
    eof: bool,
    pub(crate) line_no: u64,
}

impl<S: ByteSource> LineBuffer<S> {
    pub(crate) fn new(source: S) -> Self {
        LineBuffer {
            source,
            buf: Vec::new(),
            pos: 0,
            filled: 0,
            eof: false,
            line_no: 0,
        }
    }

    fn fill_more(&mut self) -> Result<(), Error> {
        debug_assert!(!self.eof);
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.filled, 0);
            self.filled -= self.pos;
            self.pos = 0;
        }
        let want = self.filled + READ_CHUNK;
        if self.buf.len() < want {
            self.buf.resize(want, 0);
        }
        let n = self.source.fill(&mut self.buf[self.filled..])?;
        self.filled += n;
        if n == 0 {
            self.eof = true;
        }
        Ok(())
    }

    /// Returns the next logical line, with its terminator stripped, or `None`
    /// at end of input. A line ends at the first of `\n`, `\r`, `\r\n`, or an
    /// embedded `\0` (mirroring `ihm_file_read_line` in `ihm_format.c`).
    pub(crate) fn next_line(&mut self) -> Result<Option<&[u8]>, Error> {
        loop {
            if let Some(rel) = memchr3(b'\n', b'\r', b'\0', &self.buf[self.pos..self.filled]) {
                let line_end = self.pos + rel;
                let mut next_pos = line_end + 1;
                if self.buf[line_end] == b'\r' && self.buf.get(next_pos) == Some(&b'\n') {
                    next_pos += 1;
                }
                let start = self.pos;
                self.pos = next_pos;
                self.line_no += 1;
                return Ok(Some(&self.buf[start..line_end]));
            }
            if self.eof {
                if self.pos < self.filled {
                    let start = self.pos;
                    self.pos = self.filled;
                    self.line_no += 1;
                    return Ok(Some(&self.buf[start..self.filled]));
                }
                return Ok(None);
            }
            self.fill_more()?;
        }
    }
}
