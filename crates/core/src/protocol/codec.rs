//! Wire codec (C1, spec §4.1): frames/parses RTSP requests, responses, and
//! interleaved binary frames on a single bytestream.
//!
//! Grounded on the read-line-until-blank-line loop in the teacher's
//! `transport/tcp.rs::Connection::run`, extended with `Content-Length` body
//! reads and `$`-prefixed interleaved frame detection, neither of which the
//! teacher's push-only server needed. The reader/writer split over one
//! socket (so frames and responses never interleave mid-write) is grounded
//! on `other_examples/01718558_Lohann-oddity-rtsp_..._connection.rs`'s
//! `reader_loop`/`writer_loop` pair.

use std::fmt;
use std::io::{self, BufRead, Read, Write};

use crate::error::RtspError;
use crate::protocol::request::RtspRequest;
use crate::protocol::response::RtspResponse;

/// Leading byte of an interleaved binary frame (RFC 2326 §10.12).
pub const INTERLEAVED_MAGIC: u8 = 0x24;

/// One message read off an RTSP connection's bytestream: either a
/// request, or an interleaved RTP/RTCP frame.
#[derive(Debug)]
pub enum Message {
    Request(RtspRequest),
    Interleaved { channel: u8, payload: Vec<u8> },
}

/// Error reading or writing a codec message, distinguishable from a clean
/// EOF (spec §4.1: "Failure to parse surfaces a codec error distinguishable
/// from EOF").
#[derive(Debug)]
pub enum CodecError {
    /// The peer closed the connection cleanly.
    Eof,
    /// A configured read/write timeout elapsed.
    Timeout,
    /// Underlying socket error.
    Io(io::Error),
    /// Malformed request line, header, or `Content-Length`.
    Parse(RtspError),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "connection closed by peer"),
            Self::Timeout => write!(f, "read/write timeout"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => CodecError::Timeout,
            io::ErrorKind::UnexpectedEof => CodecError::Eof,
            _ => CodecError::Io(e),
        }
    }
}

impl From<RtspError> for CodecError {
    fn from(e: RtspError) -> Self {
        CodecError::Parse(e)
    }
}

/// Read one [`Message`] from `reader`.
///
/// Peeks the next byte to distinguish an interleaved frame (`0x24`) from a
/// request line. The caller is responsible for having set the socket's
/// read timeout; a timed-out read surfaces as [`CodecError::Timeout`].
pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Message, CodecError> {
    let buf = reader.fill_buf()?;
    if buf.is_empty() {
        return Err(CodecError::Eof);
    }

    if buf[0] == INTERLEAVED_MAGIC {
        reader.consume(1);
        let mut header = [0u8; 3];
        reader.read_exact(&mut header)?;
        let channel = header[0];
        let len = u16::from_be_bytes([header[1], header[2]]) as usize;
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;
        return Ok(Message::Interleaved { channel, payload });
    }

    read_request(reader)
}

fn read_request<R: BufRead>(reader: &mut R) -> Result<Message, CodecError> {
    let mut request_text = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Err(CodecError::Eof);
        }
        request_text.push_str(&line);
        if line == "\r\n" || line == "\n" {
            break;
        }
    }

    let request = RtspRequest::parse(&request_text)?;
    let content_length = request.content_length()?;
    let request = if content_length > 0 {
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body)?;
        request.with_body(body)
    } else {
        request
    };

    Ok(Message::Request(request))
}

/// Write a complete RTSP response.
pub fn write_response<W: Write>(writer: &mut W, response: &RtspResponse) -> io::Result<()> {
    writer.write_all(&response.serialize())
}

/// Write one interleaved binary frame: `0x24 | channel | len16_be | payload`.
pub fn write_interleaved<W: Write>(writer: &mut W, channel: u8, payload: &[u8]) -> io::Result<()> {
    if payload.len() > u16::MAX as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "interleaved frame payload exceeds u16::MAX",
        ));
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.push(INTERLEAVED_MAGIC);
    frame.push(channel);
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    writer.write_all(&frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    #[test]
    fn reads_request_without_body() {
        let raw = b"OPTIONS rtsp://h/cam RTSP/1.0\r\nCSeq: 1\r\n\r\n";
        let mut reader = BufReader::new(Cursor::new(raw.to_vec()));
        match read_message(&mut reader).unwrap() {
            Message::Request(req) => {
                assert_eq!(req.method, "OPTIONS");
                assert!(req.body.is_empty());
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn reads_request_with_body() {
        let raw = b"ANNOUNCE rtsp://h/cam RTSP/1.0\r\nCSeq: 2\r\nContent-Type: application/sdp\r\nContent-Length: 5\r\n\r\nv=0\r\n";
        let mut reader = BufReader::new(Cursor::new(raw.to_vec()));
        match read_message(&mut reader).unwrap() {
            Message::Request(req) => {
                assert_eq!(req.method, "ANNOUNCE");
                assert_eq!(req.body, b"v=0\r\n");
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn reads_interleaved_frame() {
        let mut raw = vec![0x24, 0x00];
        raw.extend_from_slice(&3u16.to_be_bytes());
        raw.extend_from_slice(b"abc");
        let mut reader = BufReader::new(Cursor::new(raw));
        match read_message(&mut reader).unwrap() {
            Message::Interleaved { channel, payload } => {
                assert_eq!(channel, 0);
                assert_eq!(payload, b"abc");
            }
            _ => panic!("expected interleaved frame"),
        }
    }

    #[test]
    fn clean_eof_is_distinguished_from_parse_error() {
        let mut reader = BufReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(read_message(&mut reader), Err(CodecError::Eof)));

        let mut reader = BufReader::new(Cursor::new(b"GARBAGE\r\n\r\n".to_vec()));
        assert!(matches!(read_message(&mut reader), Err(CodecError::Parse(_))));
    }

    #[test]
    fn write_then_read_interleaved_roundtrips() {
        let mut buf = Vec::new();
        write_interleaved(&mut buf, 3, b"hello").unwrap();
        let mut reader = BufReader::new(Cursor::new(buf));
        match read_message(&mut reader).unwrap() {
            Message::Interleaved { channel, payload } => {
                assert_eq!(channel, 3);
                assert_eq!(payload, b"hello");
            }
            _ => panic!("expected interleaved frame"),
        }
    }

    #[test]
    fn write_response_serializes_status_line() {
        let mut buf = Vec::new();
        let resp = RtspResponse::ok().add_header("CSeq", "1");
        write_response(&mut buf, &resp).unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("RTSP/1.0 200 OK\r\n"));
    }
}
