//! Input reassembly: raw socket bytes in, complete IRC lines out.
//!
//! TCP delivers arbitrary chunks, so the fragment after the last CRLF is kept
//! and prepended to the next read. Any read failure (error, timeout, EOF, an
//! oversized fragment) latches the buffer into an error state that only a new
//! connection clears.

use bytes::BytesMut;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

use super::codec::LineCodec;

const READ_CHUNK: usize = 4096;

pub struct InputBuffer<R> {
    reader: R,
    codec: LineCodec,
    residual: BytesMut,
    lines: VecDeque<String>,
    read_timeout: Duration,
    error: bool,
}

impl<R: AsyncRead + Unpin> InputBuffer<R> {
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        Self {
            reader,
            codec: LineCodec::new(),
            residual: BytesMut::with_capacity(READ_CHUNK),
            lines: VecDeque::new(),
            read_timeout,
            error: false,
        }
    }

    /// Perform one read and move every completed line onto the queue.
    ///
    /// Cancel-safe: dropping the future mid-read loses no bytes.
    pub async fn receive(&mut self) {
        let mut chunk = [0u8; READ_CHUNK];
        let read = tokio::time::timeout(self.read_timeout, self.reader.read(&mut chunk)).await;
        match read {
            Ok(Ok(0)) => {
                warn!("Input error: connection closed by server");
                self.error = true;
            }
            Ok(Ok(n)) => {
                self.residual.extend_from_slice(&chunk[..n]);
                self.split_lines();
            }
            Ok(Err(e)) => {
                warn!("Input error: {e}");
                self.error = true;
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.read_timeout.as_secs_f64(),
                    "Input error: no data before read timeout"
                );
                self.error = true;
            }
        }
    }

    fn split_lines(&mut self) {
        loop {
            match self.codec.decode(&mut self.residual) {
                Ok(Some(line)) => {
                    trace!(%line, "<<");
                    self.lines.push_back(line);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Input error: {e}");
                    self.residual.clear();
                    self.error = true;
                    break;
                }
            }
        }
    }

    /// Next complete line, if one is queued.
    ///
    /// With nothing queued and no error, performs one [`receive`](Self::receive)
    /// and returns `None`; the caller loops. In error, returns `None` at once.
    pub async fn get_line(&mut self) -> Option<String> {
        if let Some(line) = self.lines.pop_front() {
            return Some(line);
        }
        if !self.error {
            self.receive().await;
        }
        None
    }

    pub fn is_in_error(&self) -> bool {
        self.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc::codec::MAX_LINE_LENGTH;
    use tokio::io::AsyncWriteExt;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_reassembles_split_lines() {
        let (mut server, client) = tokio::io::duplex(64);
        let mut input = InputBuffer::new(client, TIMEOUT);

        server.write_all(b":srv 001 bot :Wel").await.unwrap();
        assert_eq!(input.get_line().await, None);

        server.write_all(b"come\r\nPING :a\r\nPI").await.unwrap();
        assert_eq!(input.get_line().await, None);
        assert_eq!(input.get_line().await.as_deref(), Some(":srv 001 bot :Welcome"));
        assert_eq!(input.get_line().await.as_deref(), Some("PING :a"));

        server.write_all(b"NG :b\r\n").await.unwrap();
        assert_eq!(input.get_line().await, None);
        assert_eq!(input.get_line().await.as_deref(), Some("PING :b"));
        assert!(!input.is_in_error());
    }

    #[tokio::test]
    async fn test_lone_newline_is_not_a_terminator() {
        let (mut server, client) = tokio::io::duplex(64);
        let mut input = InputBuffer::new(client, TIMEOUT);

        server.write_all(b"one\ntwo\r\n").await.unwrap();
        input.receive().await;
        assert_eq!(input.get_line().await.as_deref(), Some("one\ntwo"));
    }

    #[tokio::test]
    async fn test_eof_latches_error() {
        let (server, client) = tokio::io::duplex(64);
        let mut input = InputBuffer::new(client, TIMEOUT);
        drop(server);

        assert_eq!(input.get_line().await, None);
        assert!(input.is_in_error());
        // No further reads once in error.
        assert_eq!(input.get_line().await, None);
        assert!(input.is_in_error());
    }

    #[tokio::test]
    async fn test_queued_lines_survive_error() {
        let (mut server, client) = tokio::io::duplex(64);
        let mut input = InputBuffer::new(client, TIMEOUT);

        server.write_all(b"A\r\nB\r\n").await.unwrap();
        input.receive().await;
        drop(server);
        input.receive().await;
        assert!(input.is_in_error());

        assert_eq!(input.get_line().await.as_deref(), Some("A"));
        assert_eq!(input.get_line().await.as_deref(), Some("B"));
        assert_eq!(input.get_line().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_past_timeout_is_an_error() {
        let (_server, client) = tokio::io::duplex(64);
        let mut input = InputBuffer::new(client, Duration::from_secs(180));

        assert_eq!(input.get_line().await, None);
        assert!(input.is_in_error());
    }

    #[tokio::test]
    async fn test_oversized_fragment_is_an_error() {
        let (mut server, client) = tokio::io::duplex(MAX_LINE_LENGTH * 2);
        let mut input = InputBuffer::new(client, TIMEOUT);

        server.write_all(&vec![b'x'; MAX_LINE_LENGTH + 1]).await.unwrap();
        while !input.is_in_error() {
            input.receive().await;
        }
        assert_eq!(input.get_line().await, None);
    }
}
