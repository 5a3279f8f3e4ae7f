//! CRLF line framing for the input side.
//!
//! Lines are decoded lossily as UTF-8: a stray byte from a misbehaving client
//! must not cost the whole connection.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::CodecError;

/// Longest fragment accepted without a terminator (IRCv3 tag-inclusive limit).
pub const MAX_LINE_LENGTH: usize = 8191;

/// Splits a byte stream on `\r\n`.
///
/// Remembers how far the previous call scanned, so bytes that arrive in many
/// small reads are not searched again from the start.
#[derive(Debug, Default)]
pub struct LineCodec {
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        // Step back one byte: a CR at the old end may pair with a new LF.
        let start = self.next_index.saturating_sub(1).min(src.len());
        match src[start..].windows(2).position(|w| w == b"\r\n") {
            Some(offset) => {
                let line = src.split_to(start + offset);
                src.advance(2);
                self.next_index = 0;
                Ok(Some(String::from_utf8_lossy(&line).into_owned()))
            }
            None if src.len() > MAX_LINE_LENGTH => {
                self.next_index = 0;
                Err(CodecError::LineTooLong(src.len()))
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("NICK bot\r\nPING :srv\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("NICK bot"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :srv"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_terminator_split_across_reads() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(":srv 001 bot :Welcome\r");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\nPI");
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some(":srv 001 bot :Welcome")
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"PI");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :caf\xe9\r\n"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("PRIVMSG #c :caf\u{fffd}")
        );
    }

    #[test]
    fn test_rejects_oversized_fragment() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(vec![b'A'; MAX_LINE_LENGTH + 1].as_slice());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::LineTooLong(len)) if len == MAX_LINE_LENGTH + 1
        ));
    }
}
