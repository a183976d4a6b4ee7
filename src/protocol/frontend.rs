//! Postgres frontend (client-to-server) messages.
use crate::{
    ext::{StrExt, UsizeExt},
    message::MessageBuilder,
};

use super::Oid;

/// A type that can be encoded into a postgres frontend message.
pub trait FrontendProtocol {
    /// Message type tag.
    const MSGTYPE: u8;

    /// Size of the main body, not counting the tag byte or the length itself.
    fn size_hint(&self) -> u32;

    /// Write the main body. Must write exactly `size_hint()` bytes.
    fn encode(self, buf: &mut MessageBuilder);
}

/// Write a frontend message to `buf`, with tag and length prefix.
pub fn write<F: FrontendProtocol>(msg: F, buf: &mut MessageBuilder) {
    const PREFIX: usize = 1 + 4;

    let size_hint = msg.size_hint();
    let offset = buf.len();

    buf.put_byte(F::MSGTYPE);
    buf.put_int32((4 + size_hint) as i32);

    msg.encode(buf);

    assert_eq!(
        buf.len() - offset,
        PREFIX + size_hint as usize,
        "frontend message body size did not match size_hint"
    );
}

/// Postgres Startup message.
///
/// For historical reasons, the startup message has no leading message-type
/// byte, so it does not implement [`FrontendProtocol`] — use [`write_startup`]
/// directly.
#[derive(Debug)]
pub struct Startup<'a> {
    pub user: &'a str,
    pub database: Option<&'a str>,
    pub replication: Option<&'a str>,
}

pub fn write_startup(startup: Startup<'_>, buf: &mut MessageBuilder) {
    let offset = buf.len();

    buf.put_int32(0); // length placeholder, patched below
    buf.put_int32(196_608); // protocol version 3.0

    buf.put_c_string("user");
    buf.put_c_string(startup.user);

    if let Some(db) = startup.database {
        buf.put_c_string("database");
        buf.put_c_string(db);
    }

    if let Some(repl) = startup.replication {
        buf.put_c_string("replication");
        buf.put_c_string(repl);
    }

    buf.put_byte(0);

    let len = (buf.len() - offset) as u32;
    buf.patch_int32(offset, len as i32);
}

/// Identifies the message as a password response.
pub struct PasswordMessage<'a> {
    pub password: &'a str,
}

impl FrontendProtocol for PasswordMessage<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> u32 {
        self.password.nul_string_len()
    }

    fn encode(self, buf: &mut MessageBuilder) {
        buf.put_c_string(self.password);
    }
}

/// Identifies the message as a simple query.
pub struct Query<'a> {
    pub sql: &'a str,
}

impl FrontendProtocol for Query<'_> {
    const MSGTYPE: u8 = b'Q';

    fn size_hint(&self) -> u32 {
        self.sql.nul_string_len()
    }

    fn encode(self, buf: &mut MessageBuilder) {
        buf.put_c_string(self.sql);
    }
}

/// Identifies the message as a Parse command.
pub struct Parse<'a> {
    pub prepare_name: &'a str,
    pub sql: &'a str,
    pub oids: &'a [Oid],
}

impl FrontendProtocol for Parse<'_> {
    const MSGTYPE: u8 = b'P';

    fn size_hint(&self) -> u32 {
        self.prepare_name.nul_string_len()
            + self.sql.nul_string_len()
            + 2
            + self.oids.len().to_u32() * 4
    }

    fn encode(self, buf: &mut MessageBuilder) {
        buf.put_c_string(self.prepare_name);
        buf.put_c_string(self.sql);
        buf.put_int16(self.oids.len().to_u16() as i16);
        for oid in self.oids {
            buf.put_int32(*oid as i32);
        }
    }
}

/// Identifies the message as a Sync command.
pub struct Sync;

impl FrontendProtocol for Sync {
    const MSGTYPE: u8 = b'S';

    fn size_hint(&self) -> u32 {
        0
    }

    fn encode(self, _: &mut MessageBuilder) {}
}

/// Identifies the message as a Terminate command.
pub struct Terminate;

impl FrontendProtocol for Terminate {
    const MSGTYPE: u8 = b'X';

    fn size_hint(&self) -> u32 {
        0
    }

    fn encode(self, _: &mut MessageBuilder) {}
}

/// A single bound parameter, already text-encoded (or NULL).
pub enum BoundParam<'a> {
    Null,
    Text(&'a str),
}

/// Identifies the message as a Bind command.
pub struct Bind<'a> {
    pub portal_name: &'a str,
    pub stmt_name: &'a str,
    pub params: &'a [BoundParam<'a>],
}

impl FrontendProtocol for Bind<'_> {
    const MSGTYPE: u8 = b'B';

    fn size_hint(&self) -> u32 {
        let params_size: u32 = self
            .params
            .iter()
            .map(|p| match p {
                BoundParam::Null => 4,
                BoundParam::Text(s) => 4 + s.len().to_u32(),
            })
            .sum();

        self.portal_name.nul_string_len()
            + self.stmt_name.nul_string_len()
            + 2 // param format count (0, all-text default)
            + 2 // param count
            + params_size
            + 2 // result format count (0, all-text default)
    }

    fn encode(self, buf: &mut MessageBuilder) {
        buf.put_c_string(self.portal_name);
        buf.put_c_string(self.stmt_name);

        buf.put_int16(0); // zero param format codes: all default to text

        buf.put_int16(self.params.len().to_u16() as i16);
        for param in self.params {
            match param {
                BoundParam::Null => buf.put_int32(-1),
                BoundParam::Text(s) => {
                    buf.put_int32(s.len() as i32);
                    buf.put_bytes(s.as_bytes());
                }
            }
        }

        buf.put_int16(0); // zero result format codes: all default to text
    }
}

/// Identifies the message as an Execute command.
pub struct Execute<'a> {
    pub portal_name: &'a str,
    pub max_rows: u32,
}

impl FrontendProtocol for Execute<'_> {
    const MSGTYPE: u8 = b'E';

    fn size_hint(&self) -> u32 {
        self.portal_name.nul_string_len() + 4
    }

    fn encode(self, buf: &mut MessageBuilder) {
        buf.put_c_string(self.portal_name);
        buf.put_int32(self.max_rows as i32);
    }
}

/// Identifies the message as a Describe command.
pub struct Describe<'a> {
    /// `b'S'` to describe a prepared statement, `b'P'` for a portal.
    pub kind: u8,
    pub name: &'a str,
}

impl FrontendProtocol for Describe<'_> {
    const MSGTYPE: u8 = b'D';

    fn size_hint(&self) -> u32 {
        1 + self.name.nul_string_len()
    }

    fn encode(self, buf: &mut MessageBuilder) {
        buf.put_byte(self.kind);
        buf.put_c_string(self.name);
    }
}

/// Identifies the message as a Close command.
pub struct Close<'a> {
    /// `b'S'` to close a prepared statement, `b'P'` for a portal.
    pub kind: u8,
    pub name: &'a str,
}

impl FrontendProtocol for Close<'_> {
    const MSGTYPE: u8 = b'C';

    fn size_hint(&self) -> u32 {
        1 + self.name.nul_string_len()
    }

    fn encode(self, buf: &mut MessageBuilder) {
        buf.put_byte(self.kind);
        buf.put_c_string(self.name);
    }
}

/// The bare 8-byte `SSLRequest` preamble, sent with no tag byte.
pub fn write_ssl_request(buf: &mut MessageBuilder) {
    buf.put_int32(8);
    buf.put_int32(80_877_103);
}

/// The raw `CancelRequest` message, sent on its own short-lived connection.
pub fn write_cancel_request(buf: &mut MessageBuilder, process_id: u32, secret_key: u32) {
    buf.put_int32(16);
    buf.put_int32(80_877_102);
    buf.put_int32(process_id as i32);
    buf.put_int32(secret_key as i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_message_has_tag_and_length() {
        let mut buf = MessageBuilder::new();
        write(Query { sql: "select 1" }, &mut buf);
        let bytes = buf.split();

        assert_eq!(bytes[0], b'Q');
        let len = i32::from_be_bytes(bytes[1..5].try_into().unwrap());
        assert_eq!(len as usize, bytes.len() - 1);
        assert_eq!(&bytes[5..], b"select 1\0");
    }

    #[test]
    fn sync_message_has_no_body() {
        let mut buf = MessageBuilder::new();
        write(Sync, &mut buf);
        let bytes = buf.split();
        assert_eq!(bytes.as_ref(), [b'S', 0, 0, 0, 4]);
    }

    #[test]
    fn startup_has_no_leading_tag_byte() {
        let mut buf = MessageBuilder::new();
        write_startup(Startup { user: "alice", database: Some("db"), replication: None }, &mut buf);
        let bytes = buf.split();

        let len = i32::from_be_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(len as usize, bytes.len());

        let version = i32::from_be_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(version, 196_608);

        assert!(bytes.ends_with(&[0]));
        let body = &bytes[8..bytes.len() - 1];
        assert_eq!(body, b"user\0alice\0database\0db\0");
    }

    #[test]
    fn ssl_request_preamble_has_no_tag_byte() {
        let mut buf = MessageBuilder::new();
        write_ssl_request(&mut buf);
        assert_eq!(buf.split().as_ref(), [0, 0, 0, 8, 0x04, 0xd2, 0x16, 0x2f]);
    }

    #[test]
    fn bind_with_null_and_text_params() {
        let mut buf = MessageBuilder::new();
        let params = [BoundParam::Text("hi"), BoundParam::Null];
        write(Bind { portal_name: "", stmt_name: "s1", params: &params }, &mut buf);
        let bytes = buf.split();

        assert_eq!(bytes[0], b'B');
        // portal name (nul), stmt name (nul), 0 format codes, 2 params, "hi", NULL, 0 result codes
        assert!(bytes.windows(2).any(|w| w == b"hi"));
        // a NULL parameter is encoded as length -1
        assert!(bytes.windows(4).any(|w| w == (-1i32).to_be_bytes()));
    }

    #[test]
    fn parse_encodes_param_oids() {
        let mut buf = MessageBuilder::new();
        write(Parse { prepare_name: "", sql: "select $1::int4", oids: &[23] }, &mut buf);
        let bytes = buf.split();
        assert!(bytes.windows(4).any(|w| w == 23u32.to_be_bytes()));
    }
}
