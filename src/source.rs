use std::io::{self, Read};
use std::thread;
use std::time::Duration;

/// A pull source of bytes. `fill` returns the number of bytes written into
/// `buf`, or `0` at end of input. Implementations may return fewer bytes than
/// `buf.len()` for any reason; the caller retries as needed.
///
/// This is the sole I/O seam of the crate: neither the textual nor the binary
/// reader ever open a file or a socket themselves.
pub trait ByteSource {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Brief pause between retries of a transient, no-progress read, mirroring
/// `fd_read_callback`'s `usleep(100)` loop on `EAGAIN` in `ihm_format.c`.
const RETRY_SLEEP: Duration = Duration::from_micros(100);

impl<R: Read> ByteSource for R {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(RETRY_SLEEP);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Reads into `buf` until it is full or the source reaches EOF, in which case
/// an `UnexpectedEof` error is returned. Used by the binary reader, which
/// needs exact-size reads for MessagePack atoms.
pub(crate) fn read_exact<S: ByteSource>(source: &mut S, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.fill(&mut buf[filled..])?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        filled += n;
    }
    Ok(())
}
