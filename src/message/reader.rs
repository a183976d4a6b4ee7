use std::io::{self, Read};

use bytes::{Buf, Bytes, BytesMut};

/// One complete backend message: a type tag and its body, header stripped.
#[derive(Debug)]
pub struct RawMessage {
    pub tag: u8,
    pub body: Bytes,
}

/// Reads complete backend messages off a blocking stream into one reusable
/// buffer.
///
/// Every [`Self::read_message`] call blocks until a full message (header and
/// body) has arrived, or the stream's configured read timeout elapses. The
/// internal buffer is reused across calls rather than reallocated per
/// message.
#[derive(Default, Debug)]
pub struct MessageReader {
    buf: BytesMut,
}

const HEADER_LEN: usize = 1 + 4;

impl MessageReader {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Read exactly one message, blocking on `stream` until it is complete.
    pub fn read_message<S: Read>(&mut self, stream: &mut S) -> io::Result<RawMessage> {
        self.fill_exact(stream, HEADER_LEN)?;

        let tag = self.buf[0];
        let len = u32::from_be_bytes(self.buf[1..5].try_into().unwrap()) as usize;

        if len < 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "backend message declared a length shorter than its own header",
            ));
        }

        let body_len = len - 4;
        self.fill_exact(stream, HEADER_LEN + body_len)?;

        self.buf.advance(HEADER_LEN);
        let body = self.buf.split_to(body_len).freeze();

        Ok(RawMessage { tag, body })
    }

    /// Read a single byte, used for the SSL negotiation response (`S` or `N`)
    /// which precedes the normal message stream and has no header of its own.
    pub fn read_ssl_response<S: Read>(stream: &mut S) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn fill_exact<S: Read>(&mut self, stream: &mut S, want: usize) -> io::Result<()> {
        while self.buf.len() < want {
            let mut chunk = [0u8; 4096];
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while waiting for a backend message",
                ));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }
}
