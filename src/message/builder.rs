use bytes::{BufMut, Bytes, BytesMut};

/// Accumulates frontend messages into one reusable outbound buffer.
///
/// This is the client's half of the wire: [`crate::protocol::frontend::write`]
/// appends a complete, length-prefixed message at a time, and [`Self::split`]
/// hands the accumulated bytes to the socket without reallocating the buffer
/// itself.
#[derive(Default, Debug)]
pub struct MessageBuilder {
    buf: BytesMut,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_byte(&mut self, byte: u8) {
        self.buf.put_u8(byte);
    }

    pub fn put_int16(&mut self, val: i16) {
        self.buf.put_i16(val);
    }

    pub fn put_int32(&mut self, val: i32) {
        self.buf.put_i32(val);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn put_c_string(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }

    /// Overwrite 4 bytes at `offset` with `val` in network byte order. Used to
    /// backpatch a length prefix once the body it measures has been written.
    pub fn patch_int32(&mut self, offset: usize, val: i32) {
        self.buf[offset..offset + 4].copy_from_slice(&val.to_be_bytes());
    }

    /// Take the accumulated bytes, leaving the buffer empty and ready for
    /// reuse.
    pub fn split(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
