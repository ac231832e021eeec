//! Header-delimited message framing.
//!
//! Wire format, one message:
//! - header lines terminated by `\r\n`, including `Content-Length: <n>`
//!   (header names are case-insensitive, other headers are ignored)
//! - an empty line
//! - exactly `n` bytes of UTF-8 JSON
//!
//! Stray `\r\n` pairs between messages are skipped.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Longest header block accepted before giving up on finding its end
pub const MAX_HEADER_SIZE: usize = 8 * 1024;

static CONTENT_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^content-length:[ \t]*(\d+)[ \t]*\r?$").expect("Invalid Content-Length regex")
});

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message header has no Content-Length")]
    MissingContentLength,

    #[error("invalid message header: {0}")]
    InvalidHeader(String),

    #[error("message header exceeds {0} bytes")]
    HeaderTooLarge(usize),

    #[error("message of {size} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },
}

/// Codec for `Content-Length` framed JSON-RPC messages
#[derive(Debug, Clone)]
pub struct JsonRpcCodec {
    max_message_size: usize,
    /// Body length of a message whose header has been consumed
    body_length: Option<usize>,
}

impl JsonRpcCodec {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            body_length: None,
        }
    }

    /// Extract the body length from a complete header block
    pub fn parse_header(header: &[u8]) -> Result<usize, CodecError> {
        let text = std::str::from_utf8(header)
            .map_err(|e| CodecError::InvalidHeader(format!("not UTF-8: {}", e)))?;

        let captures = CONTENT_LENGTH
            .captures(text)
            .ok_or(CodecError::MissingContentLength)?;

        captures[1]
            .parse::<usize>()
            .map_err(|e| CodecError::InvalidHeader(format!("Content-Length: {}", e)))
    }

    fn skip_blank_lines(src: &mut BytesMut) {
        while src.starts_with(b"\r\n") {
            src.advance(2);
        }
    }
}

impl Default for JsonRpcCodec {
    fn default() -> Self {
        Self::new(4 * 1024 * 1024)
    }
}

impl Decoder for JsonRpcCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let body_length = match self.body_length {
            Some(length) => length,
            None => {
                Self::skip_blank_lines(src);

                let Some(end) = src
                    .windows(HEADER_TERMINATOR.len())
                    .position(|window| window == HEADER_TERMINATOR)
                else {
                    if src.len() > MAX_HEADER_SIZE {
                        return Err(CodecError::HeaderTooLarge(MAX_HEADER_SIZE));
                    }
                    return Ok(None);
                };

                let length = Self::parse_header(&src[..end + 2])?;
                if length > self.max_message_size {
                    return Err(CodecError::FrameTooLarge {
                        size: length,
                        max: self.max_message_size,
                    });
                }

                src.advance(end + HEADER_TERMINATOR.len());
                self.body_length = Some(length);
                length
            }
        };

        if src.len() < body_length {
            src.reserve(body_length - src.len());
            return Ok(None);
        }

        self.body_length = None;
        Ok(Some(src.split_to(body_length).freeze()))
    }
}

impl Encoder<Bytes> for JsonRpcCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_message_size {
            return Err(CodecError::FrameTooLarge {
                size: item.len(),
                max: self.max_message_size,
            });
        }

        let header = format!("Content-Length: {}\r\n\r\n", item.len());
        dst.reserve(header.len() + item.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &str) -> BytesMut {
        BytesMut::from(format!("Content-Length: {}\r\n\r\n{}", body.len(), body).as_bytes())
    }

    #[test]
    fn test_decode_single_frame() {
        let mut codec = JsonRpcCodec::default();
        let mut src = frame(r#"{"id":1}"#);

        let body = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&body[..], br#"{"id":1}"#);
        assert!(src.is_empty());
    }

    #[test]
    fn test_decode_partial_body() {
        let mut codec = JsonRpcCodec::default();
        let mut src = BytesMut::from(&b"Content-Length: 8\r\n\r\n{\"id\""[..]);

        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b":1}");
        let body = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&body[..], br#"{"id":1}"#);
    }

    #[test]
    fn test_decode_partial_header() {
        let mut codec = JsonRpcCodec::default();
        let mut src = BytesMut::from(&b"Content-Len"[..]);

        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b"gth: 2\r\n\r\n{}");
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"{}");
    }

    #[test]
    fn test_extra_headers_and_case() {
        let mut codec = JsonRpcCodec::default();
        let mut src = BytesMut::from(
            &b"\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\ncontent-length: 2\r\n\r\n{}"[..],
        );
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"{}");
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut codec = JsonRpcCodec::default();
        let mut src = frame("[1]");
        src.extend_from_slice(&frame("[2]"));

        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"[1]");
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"[2]");
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_missing_content_length() {
        let mut codec = JsonRpcCodec::default();
        let mut src = BytesMut::from(&b"Content-Type: text/plain\r\n\r\n{}"[..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::MissingContentLength)
        ));
    }

    #[test]
    fn test_frame_too_large() {
        let mut codec = JsonRpcCodec::new(4);
        let mut src = frame("123456");
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::FrameTooLarge { size: 6, max: 4 })
        ));
    }

    #[test]
    fn test_unterminated_header_is_bounded() {
        let mut codec = JsonRpcCodec::default();
        let mut src = BytesMut::from(vec![b'x'; MAX_HEADER_SIZE + 1].as_slice());
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::HeaderTooLarge(_))
        ));
    }

    #[test]
    fn test_encode() {
        let mut codec = JsonRpcCodec::default();
        let mut dst = BytesMut::new();
        codec
            .encode(Bytes::from_static(br#"{"id":1}"#), &mut dst)
            .unwrap();
        assert_eq!(&dst[..], b"Content-Length: 8\r\n\r\n{\"id\":1}");
    }
}
