use std::io;

use bytes::{Bytes, BytesMut};
use itertools::Itertools;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Provides a facility to read CRLF-terminated reply lines and fixed-length
/// data chunks from a stream.
pub struct LineReader<T: AsyncRead + Unpin> {
    /// Stores data that's been read in but not yet consumed.
    buf: BytesMut,
    /// Index in buf from which a valid CRLF pair may appear (and before which
    /// a CRLF sequence hasn't been seen).
    maybe_crlf_from: usize,
    /// Data source
    reader: T,
    /// On a reading error, this field is set and its value returned once the
    /// buffer is drained of pending lines.
    pending_error: Option<io::Error>,
}

impl<T: AsyncRead + Unpin> LineReader<T> {
    /// Reads a line from the internal buffer and/or reader, without the
    /// trailing CRLF. On an end-of-stream condition, returns a None result,
    /// discarding any partly-read line in the internal buffer.
    ///
    /// On a read error, the error value is returned after processing all
    /// pending lines in the internal buffer, but calling `read_line` again
    /// will attempt a new read safely.
    pub async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            // Scan for a CRLF from one byte before the newest data, so a \r
            // arriving in one read and its \n in the next are still paired.
            // Restarting from maybe_crlf_from keeps this O(bytes_read) even
            // when a long line arrives in many small reads.
            if let Some(eol) = self
                .buf
                .iter()
                .skip(self.maybe_crlf_from)
                .tuple_windows::<(_, _)>()
                .position(|x| x == (&b'\r', &b'\n'))
            {
                // A complete line. Freeze the result to make it read-only.
                let line =
                    self.buf.split_to(self.maybe_crlf_from + eol + 2).freeze();

                // Drop trailing b"\r\n".
                let line = line.slice(0..line.len() - 2);

                // Restart the CRLF scan from the front of the unread section.
                self.maybe_crlf_from = 0;

                return Ok(Some(line));
            }

            if !self.fill_buf().await? {
                return match self.pending_error.take() {
                    Some(e) => Err(e),
                    None => Ok(None),
                };
            }
        }
    }

    /// Reads a data chunk of exactly `n` bytes followed by a CRLF, as sent
    /// after `FOUND`, `RESERVED`, and `OK` reply lines. Returns None on an
    /// end-of-stream condition before the full chunk arrived.
    pub async fn read_chunk(&mut self, n: usize) -> io::Result<Option<Bytes>> {
        while self.buf.len() < n + 2 {
            if !self.fill_buf().await? {
                return match self.pending_error.take() {
                    Some(e) => Err(e),
                    None => Ok(None),
                };
            }
        }

        let chunk = self.buf.split_to(n + 2).freeze();
        self.maybe_crlf_from = 0;

        if &chunk[n..] != b"\r\n" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "data chunk not CRLF-terminated",
            ));
        }

        Ok(Some(chunk.slice(0..n)))
    }

    /// Reads from the underlying reader into the buffer, returning false on
    /// an end-of-stream condition (including a deferred read error).
    async fn fill_buf(&mut self) -> io::Result<bool> {
        let n_bytes_read = match self.reader.read_buf(&mut self.buf).await {
            Ok(n) => n,
            Err(e) => {
                self.pending_error = Some(e);
                0
            },
        };

        // Set maybe_crlf_from to the byte before the first byte returned by
        // this read (and 0 if buf is empty).
        self.maybe_crlf_from =
            self.buf.len().checked_sub(n_bytes_read + 1).unwrap_or(0);

        Ok(n_bytes_read != 0)
    }
}

impl<T: AsyncRead + Unpin> From<T> for LineReader<T> {
    fn from(value: T) -> Self {
        Self {
            buf: BytesMut::new(),
            maybe_crlf_from: 0,
            reader: value,
            pending_error: None,
        }
    }
}
