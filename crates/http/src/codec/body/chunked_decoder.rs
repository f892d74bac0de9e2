//! Decoder for chunked transfer encoding.
//!
//! Each chunk is `size-in-hex [;extensions] CRLF data CRLF`; a zero sized
//! chunk starts the trailer section, which ends with an empty line. Chunk
//! extensions and trailer fields are accepted and ignored.

use crate::codec::body::MAX_BODY_BYTES;
use crate::ensure;
use crate::protocol::ParseError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Longest size or trailer line we are willing to buffer
const MAX_LINE_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    body: BytesMut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size line
    Size,
    /// Read `remaining` data bytes followed by CRLF
    Data { remaining: usize },
    /// Read trailer lines until the empty one
    Trailer,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: ChunkedState::Size, body: BytesMut::new() }
    }
}

impl Decoder for ChunkedDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::Size => {
                    let Some(line) = take_line(src)? else { return Ok(None) };
                    let size = parse_chunk_size(&line)?;
                    trace!(size, "read chunk size");

                    let total = (self.body.len() as u64).saturating_add(size as u64);
                    ensure!(total <= MAX_BODY_BYTES, ParseError::too_large_body(total, MAX_BODY_BYTES));

                    self.state = if size == 0 { ChunkedState::Trailer } else { ChunkedState::Data { remaining: size } };
                }

                ChunkedState::Data { remaining } => {
                    if src.len() < remaining.saturating_add(2) {
                        return Ok(None);
                    }
                    self.body.extend_from_slice(&src[..remaining]);
                    src.advance(remaining);
                    ensure!(&src[..2] == b"\r\n", ParseError::invalid_body("chunk data must end with CRLF"));
                    src.advance(2);
                    self.state = ChunkedState::Size;
                }

                ChunkedState::Trailer => {
                    let Some(line) = take_line(src)? else { return Ok(None) };
                    if line.is_empty() {
                        trace!(len = self.body.len(), "finished reading chunked data");
                        self.state = ChunkedState::Size;
                        return Ok(Some(self.body.split().freeze()));
                    }
                }
            }
        }
    }
}

/// Removes one CRLF terminated line from `src`, returning it without the CRLF.
fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
    match src.windows(2).position(|window| window == b"\r\n") {
        Some(end) => {
            let line = src.split_to(end);
            src.advance(2);
            Ok(Some(line))
        }
        None => {
            ensure!(src.len() <= MAX_LINE_BYTES, ParseError::invalid_body("chunk line too long"));
            Ok(None)
        }
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let size = line.split(|b| *b == b';').next().unwrap_or_default();
    let size = std::str::from_utf8(size).map_err(|_| ParseError::invalid_body("invalid chunk size line"))?.trim();
    ensure!(!size.is_empty(), ParseError::invalid_body("empty chunk size"));
    usize::from_str_radix(size, 16).map_err(|_| ParseError::invalid_body(format!("invalid chunk size: {size}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut buffer = BytesMut::from(&b"10\r\n1234567890abcdef\r\n0\r\n\r\nrest"[..]);
        let mut decoder = ChunkedDecoder::new();

        let bytes = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&bytes[..], b"1234567890abcdef");
        assert_eq!(&buffer[..], b"rest");
    }

    #[test]
    fn test_split_across_reads() {
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::from(&b"3\r\nab"[..]);
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"c\r\n2;name=value\r\nde\r\n0\r\nTrailer: x\r\n");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"\r\n");
        let bytes = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&bytes[..], b"abcde");
    }

    #[test]
    fn test_invalid_size() {
        let mut buffer = BytesMut::from(&b"zz\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn test_huge_chunk_size_is_rejected() {
        let mut buffer = BytesMut::from(&b"1\r\na\r\nFFFFFFFFFFFFFFFF\r\nxyz"[..]);
        let result = ChunkedDecoder::new().decode(&mut buffer);
        assert!(matches!(result, Err(ParseError::TooLargeBody { .. })));
    }

    #[test]
    fn test_chunk_over_body_limit_is_rejected() {
        let mut buffer = BytesMut::from(format!("{:x}\r\n", MAX_BODY_BYTES + 1).as_bytes());
        let result = ChunkedDecoder::new().decode(&mut buffer);
        assert!(matches!(result, Err(ParseError::TooLargeBody { .. })));
    }

    #[test]
    fn test_missing_crlf_after_data() {
        let mut buffer = BytesMut::from(&b"2\r\nabXY0\r\n\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }
}
