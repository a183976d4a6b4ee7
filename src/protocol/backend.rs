//! Postgres backend (server-to-client) messages.
use bytes::{Buf, Bytes};

use crate::{common::ByteStr, ext::BytesExt};

use super::{Oid, ProtocolError};

/// A type that can be decoded from a postgres backend message.
pub trait BackendProtocol: Sized + std::fmt::Debug {
    /// Message type tag this decoder expects.
    const MSGTYPE: u8;

    /// Decode `body`, the bytes following the tag and length prefix.
    fn decode(body: Bytes) -> Result<Self, ProtocolError>;
}

/// Any backend message, dispatched on its type tag.
pub enum BackendMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    ErrorResponse(ErrorResponse),
    EmptyQueryResponse(EmptyQueryResponse),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

macro_rules! match_backend {
    ($($name:ident,)*) => {
        impl BackendMessage {
            /// Human-readable name for an arbitrary message tag, for logs and
            /// error messages. Returns `"Unknown"` for an unrecognized tag.
            pub const fn message_name(msgtype: u8) -> &'static str {
                match msgtype {
                    $($name::MSGTYPE => stringify!($name),)*
                    _ => "Unknown",
                }
            }

            /// Decode a tagged message body into the matching variant.
            pub fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name(<$name as BackendProtocol>::decode(body)?),)*
                    _ => return Err(ProtocolError::malformed("unrecognized backend message tag")),
                };
                Ok(message)
            }

            /// The wire tag this message was (or would be) decoded from.
            pub const fn tag(&self) -> u8 {
                match self {
                    $(Self::$name(_) => $name::MSGTYPE,)*
                }
            }
        }

        impl std::fmt::Debug for BackendMessage {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self {
                    $(Self::$name(m) => std::fmt::Debug::fmt(m, f),)*
                }
            }
        }
    };
}

match_backend! {
    Authentication,
    BackendKeyData,
    BindComplete,
    CloseComplete,
    CommandComplete,
    DataRow,
    ErrorResponse,
    EmptyQueryResponse,
    NoData,
    NoticeResponse,
    ParameterDescription,
    ParameterStatus,
    ParseComplete,
    PortalSuspended,
    ReadyForQuery,
    RowDescription,
}

macro_rules! msgtype {
    ($me:ident, $ty:literal) => {
        impl $me {
            pub const MSGTYPE: u8 = $ty;
        }
    };
}

/// An authentication request or challenge.
#[derive(Debug)]
pub enum Authentication {
    Ok,
    KerberosV5,
    CleartextPassword,
    MD5Password { salt: [u8; 4] },
    GSS,
    GSSContinue { data: Bytes },
    SSPI,
    SASL { mechanisms: Bytes },
    SASLContinue { data: Bytes },
    SASLFinal { data: Bytes },
}

msgtype!(Authentication, b'R');

impl BackendProtocol for Authentication {
    const MSGTYPE: u8 = b'R';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let auth = match body.get_u32() {
            0 => Self::Ok,
            2 => Self::KerberosV5,
            3 => Self::CleartextPassword,
            5 => Self::MD5Password { salt: body.get_u32().to_be_bytes() },
            7 => Self::GSS,
            8 => Self::GSSContinue { data: body },
            9 => Self::SSPI,
            10 => Self::SASL { mechanisms: body },
            11 => Self::SASLContinue { data: body },
            12 => Self::SASLFinal { data: body },
            code => return Err(ProtocolError::UnsupportedAuth { code }),
        };
        Ok(auth)
    }
}

/// Cancellation key data the client must retain to issue a `CancelRequest`.
pub struct BackendKeyData {
    pub process_id: u32,
    pub secret_key: u32,
}

msgtype!(BackendKeyData, b'K');

impl BackendProtocol for BackendKeyData {
    const MSGTYPE: u8 = b'K';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { process_id: body.get_u32(), secret_key: body.get_u32() })
    }
}

impl std::fmt::Debug for BackendKeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendKeyData")
            .field("process_id", &self.process_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// A run-time parameter status report, sent at startup and whenever a
/// `SET` changes a parameter the server tracks (`server_version`, `TimeZone`,
/// `client_encoding`, ...).
#[derive(Debug)]
pub struct ParameterStatus {
    pub name: ByteStr,
    pub value: ByteStr,
}

msgtype!(ParameterStatus, b'S');

impl BackendProtocol for ParameterStatus {
    const MSGTYPE: u8 = b'S';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: body.get_nul_bytestr().map_err(|_| ProtocolError::malformed("ParameterStatus name was not valid utf8"))?,
            value: body.get_nul_bytestr().map_err(|_| ProtocolError::malformed("ParameterStatus value was not valid utf8"))?,
        })
    }
}

/// A notice emitted asynchronously by the server; never fatal.
///
/// The body is a sequence of (code byte, nul-terminated string) fields
/// terminated by a zero byte, parsed on demand through [`Self::fields`].
pub struct NoticeResponse {
    pub body: Bytes,
}

msgtype!(NoticeResponse, b'N');

impl BackendProtocol for NoticeResponse {
    const MSGTYPE: u8 = b'N';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl NoticeResponse {
    pub fn fields(&self) -> FieldIter {
        FieldIter { body: self.body.clone() }
    }
}

impl std::fmt::Debug for NoticeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeResponse").field("body", &"<fields>").finish()
    }
}

/// A fatal error reported by the server.
///
/// Like [`NoticeResponse`], the body is an unparsed field list; callers
/// needing the human-readable message or SQLSTATE go through
/// [`Self::fields`].
pub struct ErrorResponse {
    pub body: Bytes,
}

msgtype!(ErrorResponse, b'E');

impl BackendProtocol for ErrorResponse {
    const MSGTYPE: u8 = b'E';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl ErrorResponse {
    pub fn fields(&self) -> FieldIter {
        FieldIter { body: self.body.clone() }
    }

    /// The `M` (primary human-readable message) field, or a placeholder if
    /// the server omitted it.
    pub fn message(&self) -> String {
        self.fields()
            .find(|(code, _)| *code == b'M')
            .map(|(_, msg)| msg)
            .unwrap_or_else(|| "server reported an error with no message".to_string())
    }

    /// The `C` (SQLSTATE) field, or `"XX000"` if the server omitted it.
    pub fn code(&self) -> String {
        self.fields().find(|(code, _)| *code == b'C').map(|(_, msg)| msg).unwrap_or_else(|| "XX000".to_string())
    }
}

impl std::fmt::Debug for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorResponse").field("code", &self.code()).field("message", &self.message()).finish()
    }
}

/// Iterator over the `(field code, value)` pairs of a Notice/Error body.
///
/// <https://www.postgresql.org/docs/current/protocol-error-fields.html>
pub struct FieldIter {
    body: Bytes,
}

impl Iterator for FieldIter {
    type Item = (u8, String);

    fn next(&mut self) -> Option<Self::Item> {
        if self.body.is_empty() {
            return None;
        }
        let code = self.body.get_u8();
        if code == 0 {
            return None;
        }
        let value = self.body.get_nul_bytestr().ok()?;
        Some((code, value.as_str().to_string()))
    }
}

/// Describes the shape of the rows a query will return.
///
/// The body is kept raw; [`Self::fields`] parses it lazily into
/// [`RowFieldDescription`]s.
pub struct RowDescription {
    pub body: Bytes,
}

msgtype!(RowDescription, b'T');

impl BackendProtocol for RowDescription {
    const MSGTYPE: u8 = b'T';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl RowDescription {
    pub fn field_count(&self) -> u16 {
        let mut body = self.body.clone();
        body.get_u16()
    }

    pub fn fields(&self) -> RowFieldIter {
        let mut body = self.body.clone();
        let remaining = body.get_u16();
        RowFieldIter { body, remaining }
    }
}

impl std::fmt::Debug for RowDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowDescription").field("fields", &self.field_count()).finish()
    }
}

/// One column's metadata from a [`RowDescription`].
#[derive(Debug, Clone)]
pub struct RowFieldDescription {
    pub name: ByteStr,
    pub table_oid: Oid,
    pub column_attr: u16,
    pub type_oid: Oid,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: u16,
}

pub struct RowFieldIter {
    body: Bytes,
    remaining: u16,
}

impl Iterator for RowFieldIter {
    type Item = RowFieldDescription;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(RowFieldDescription {
            name: self.body.get_nul_bytestr().ok()?,
            table_oid: self.body.get_u32(),
            column_attr: self.body.get_u16(),
            type_oid: self.body.get_u32(),
            type_size: self.body.get_i16(),
            type_modifier: self.body.get_i32(),
            format: self.body.get_u16(),
        })
    }
}

/// A single row of data, one column value at a time (`None` for SQL NULL).
pub struct DataRow {
    pub body: Bytes,
}

msgtype!(DataRow, b'D');

impl BackendProtocol for DataRow {
    const MSGTYPE: u8 = b'D';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl DataRow {
    pub fn column_count(&self) -> u16 {
        let mut body = self.body.clone();
        body.get_u16()
    }

    pub fn columns(&self) -> ColumnIter {
        let mut body = self.body.clone();
        let remaining = body.get_u16();
        ColumnIter { body, remaining }
    }
}

impl std::fmt::Debug for DataRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRow").field("columns", &self.column_count()).finish()
    }
}

pub struct ColumnIter {
    body: Bytes,
    remaining: u16,
}

impl Iterator for ColumnIter {
    type Item = Option<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let len = self.body.get_i32();
        if len < 0 {
            return Some(None);
        }
        Some(Some(self.body.split_to(len as usize)))
    }
}

/// Reports which SQL command just completed and how many rows it affected.
#[derive(Debug)]
pub struct CommandComplete {
    pub tag: ByteStr,
}

msgtype!(CommandComplete, b'C');

impl BackendProtocol for CommandComplete {
    const MSGTYPE: u8 = b'C';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            tag: body.get_nul_bytestr().map_err(|_| ProtocolError::malformed("CommandComplete tag was not valid utf8"))?,
        })
    }
}

impl CommandComplete {
    /// The row count suffix of the tag, if the command reports one
    /// (`INSERT`/`UPDATE`/`DELETE`/`SELECT`/`MOVE`/`FETCH`/`COPY`/`MERGE`).
    pub fn rows_affected(&self) -> Option<u64> {
        self.tag.rsplit(' ').next()?.parse().ok()
    }
}

/// Describes the parameter types a prepared statement expects.
#[derive(Debug)]
pub struct ParameterDescription {
    pub oids: Bytes,
}

msgtype!(ParameterDescription, b't');

impl BackendProtocol for ParameterDescription {
    const MSGTYPE: u8 = b't';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_u16();
        let _ = count;
        Ok(Self { oids: body })
    }
}

impl ParameterDescription {
    pub fn oids(&self) -> impl Iterator<Item = Oid> + '_ {
        let mut body = self.oids.clone();
        std::iter::from_fn(move || if body.has_remaining() { Some(body.get_u32()) } else { None })
    }
}

/// Sent whenever the backend is ready for a new query cycle.
pub struct ReadyForQuery {
    pub tx_status: u8,
}

msgtype!(ReadyForQuery, b'Z');

impl BackendProtocol for ReadyForQuery {
    const MSGTYPE: u8 = b'Z';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { tx_status: body.get_u8() })
    }
}

impl std::fmt::Debug for ReadyForQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyForQuery")
            .field(
                "tx_status",
                &match self.tx_status {
                    b'I' => "Idle",
                    b'T' => "InTransaction",
                    b'E' => "FailedTransaction",
                    _ => "unknown",
                },
            )
            .finish()
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name;

        msgtype!($name, $ty);

        impl BackendProtocol for $name {
            const MSGTYPE: u8 = $ty;

            fn decode(_: Bytes) -> Result<Self, ProtocolError> {
                Ok(Self)
            }
        }
    )*};
}

unit_msg! {
    /// Acknowledges a Bind command.
    struct BindComplete, b'2';

    /// Acknowledges a Close command.
    struct CloseComplete, b'3';

    /// Sent instead of CommandComplete when the query string was empty.
    struct EmptyQueryResponse, b'I';

    /// Sent by Describe when the portal returns no rows.
    struct NoData, b'n';

    /// Acknowledges a Parse command.
    struct ParseComplete, b'1';

    /// Sent when Execute's row-count limit was reached before the portal ran dry.
    struct PortalSuspended, b's';
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn body(f: impl FnOnce(&mut BytesMut)) -> Bytes {
        let mut buf = BytesMut::new();
        f(&mut buf);
        buf.freeze()
    }

    #[test]
    fn decodes_authentication_ok() {
        let b = body(|buf| buf.extend_from_slice(&0u32.to_be_bytes()));
        let msg = BackendMessage::decode(b'R', b).unwrap();
        assert!(matches!(msg, BackendMessage::Authentication(Authentication::Ok)));
        assert_eq!(msg.tag(), b'R');
    }

    #[test]
    fn decodes_md5_password_challenge() {
        let salt = [1u8, 2, 3, 4];
        let b = body(|buf| {
            buf.extend_from_slice(&5u32.to_be_bytes());
            buf.extend_from_slice(&salt);
        });
        let msg = BackendMessage::decode(b'R', b).unwrap();
        match msg {
            BackendMessage::Authentication(Authentication::MD5Password { salt: got }) => assert_eq!(got, salt),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_auth_code_is_unsupported() {
        let b = body(|buf| buf.extend_from_slice(&99u32.to_be_bytes()));
        let err = BackendMessage::decode(b'R', b).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedAuth { code: 99 }));
    }

    #[test]
    fn unrecognized_tag_is_malformed() {
        let err = BackendMessage::decode(b'?', Bytes::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));
    }

    #[test]
    fn decodes_backend_key_data() {
        let b = body(|buf| {
            buf.extend_from_slice(&42u32.to_be_bytes());
            buf.extend_from_slice(&1234u32.to_be_bytes());
        });
        let msg = BackendMessage::decode(b'K', b).unwrap();
        match msg {
            BackendMessage::BackendKeyData(k) => {
                assert_eq!(k.process_id, 42);
                assert_eq!(k.secret_key, 1234);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn parses_row_description_fields() {
        let b = body(|buf| {
            buf.extend_from_slice(&1u16.to_be_bytes());
            buf.extend_from_slice(b"id\0");
            buf.extend_from_slice(&0u32.to_be_bytes());
            buf.extend_from_slice(&0u16.to_be_bytes());
            buf.extend_from_slice(&23u32.to_be_bytes());
            buf.extend_from_slice(&4i16.to_be_bytes());
            buf.extend_from_slice(&(-1i32).to_be_bytes());
            buf.extend_from_slice(&0u16.to_be_bytes());
        });
        let msg = BackendMessage::decode(b'T', b).unwrap();
        let BackendMessage::RowDescription(desc) = msg else { panic!("wrong variant") };
        let fields: Vec<_> = desc.fields().collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name.as_str(), "id");
        assert_eq!(fields[0].type_oid, 23);
    }

    #[test]
    fn data_row_yields_null_and_present_columns() {
        let b = body(|buf| {
            buf.extend_from_slice(&2u16.to_be_bytes());
            buf.extend_from_slice(&(-1i32).to_be_bytes());
            buf.extend_from_slice(&3i32.to_be_bytes());
            buf.extend_from_slice(b"abc");
        });
        let msg = BackendMessage::decode(b'D', b).unwrap();
        let BackendMessage::DataRow(row) = msg else { panic!("wrong variant") };
        let cols: Vec<_> = row.columns().collect();
        assert_eq!(cols, vec![None, Some(Bytes::from_static(b"abc"))]);
    }

    #[test]
    fn command_complete_parses_row_count() {
        let b = body(|buf| buf.extend_from_slice(b"INSERT 0 5\0"));
        let msg = BackendMessage::decode(b'C', b).unwrap();
        let BackendMessage::CommandComplete(cc) = msg else { panic!("wrong variant") };
        assert_eq!(cc.tag.as_str(), "INSERT 0 5");
        assert_eq!(cc.rows_affected(), Some(5));
    }

    #[test]
    fn error_response_exposes_code_and_message() {
        let b = body(|buf| {
            buf.extend_from_slice(b"C22012\0");
            buf.extend_from_slice(b"Mdivision by zero\0");
            buf.extend_from_slice(&[0]);
        });
        let msg = BackendMessage::decode(b'E', b).unwrap();
        let BackendMessage::ErrorResponse(err) = msg else { panic!("wrong variant") };
        assert_eq!(err.code(), "22012");
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn ready_for_query_reports_transaction_status() {
        let b = body(|buf| buf.extend_from_slice(b"I"));
        let msg = BackendMessage::decode(b'Z', b).unwrap();
        let BackendMessage::ReadyForQuery(r) = msg else { panic!("wrong variant") };
        assert_eq!(r.tx_status, b'I');
    }

    #[test]
    fn parameter_description_iterates_oids() {
        let b = body(|buf| {
            buf.extend_from_slice(&2u16.to_be_bytes());
            buf.extend_from_slice(&23u32.to_be_bytes());
            buf.extend_from_slice(&25u32.to_be_bytes());
        });
        let msg = BackendMessage::decode(b't', b).unwrap();
        let BackendMessage::ParameterDescription(pd) = msg else { panic!("wrong variant") };
        assert_eq!(pd.oids().collect::<Vec<_>>(), vec![23, 25]);
    }
}
