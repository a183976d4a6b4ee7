//! Small extension traits used while encoding and decoding wire messages.
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::ByteStr;

/// PostgreSQL's integer signedness is a minefield: this makes the narrowing
/// explicit and panics loudly instead of silently wrapping.
pub trait UsizeExt {
    fn to_u32(self) -> u32;
    fn to_u16(self) -> u16;
}

impl UsizeExt for usize {
    fn to_u32(self) -> u32 {
        self.try_into().expect("message size too large for the wire protocol")
    }

    fn to_u16(self) -> u16 {
        self.try_into().expect("message size too large for the wire protocol")
    }
}

/// Nul-terminated string length, including the terminator.
pub trait StrExt {
    fn nul_string_len(&self) -> u32;
}

impl StrExt for str {
    fn nul_string_len(&self) -> u32 {
        self.len().to_u32() + 1
    }
}

/// Write a nul-terminated string.
pub trait BufMutExt {
    fn put_nul_string(&mut self, string: &str);
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_string(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }
}

/// Read a nul-terminated string out of a `Bytes`/`BytesMut` cursor.
pub trait BytesExt {
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error>;
}

impl BytesExt for Bytes {
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error> {
        let end = self
            .iter()
            .position(|b| *b == 0)
            .expect("postgres string was not nul terminated");
        let me = self.split_to(end);
        Buf::advance(self, 1);
        ByteStr::from_utf8(me)
    }
}

impl BytesExt for BytesMut {
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error> {
        let end = self
            .iter()
            .position(|b| *b == 0)
            .expect("postgres string was not nul terminated");
        let me = self.split_to(end);
        Buf::advance(self, 1);
        ByteStr::from_utf8(me.freeze())
    }
}

/// Lossy display of raw bytes, escaping non-printable characters.
pub struct LossyFmt<'a>(pub &'a [u8]);

pub trait FmtExt {
    fn lossy(&self) -> LossyFmt<'_>;
}

impl FmtExt for [u8] {
    fn lossy(&self) -> LossyFmt<'_> {
        LossyFmt(self)
    }
}

impl std::fmt::Display for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() || b.is_ascii_whitespace() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"{self}\"")
    }
}
