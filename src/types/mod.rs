//! Text-format decoding from wire bytes into [`Value`]s.
mod array;
mod enums;
mod point;

use std::collections::HashMap;

use crate::{
    common::ByteStr,
    protocol::Oid,
    value::Value,
};

pub use enums::EnumRegistry;

/// A decoding failure: either the bytes weren't valid for the claimed type,
/// or no decoder is registered for the column's OID.
pub struct DecodeError {
    reason: String,
}

impl DecodeError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl std::error::Error for DecodeError {}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to decode column: {}", self.reason)
    }
}

impl std::fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

// well-known scalar OIDs, https://www.postgresql.org/docs/current/catalog-pg-type.html
const OID_BOOL: Oid = 16;
const OID_BYTEA: Oid = 17;
const OID_NAME: Oid = 19;
const OID_INT8: Oid = 20;
const OID_INT2: Oid = 21;
const OID_INT4: Oid = 23;
const OID_TEXT: Oid = 25;
const OID_JSON: Oid = 114;
const OID_POINT: Oid = 600;
const OID_FLOAT4: Oid = 700;
const OID_FLOAT8: Oid = 701;
const OID_BPCHAR: Oid = 1042;
const OID_VARCHAR: Oid = 1043;
const OID_DATE: Oid = 1082;
const OID_TIME: Oid = 1083;
const OID_TIMESTAMP: Oid = 1114;
const OID_TIMESTAMPTZ: Oid = 1184;
const OID_INTERVAL: Oid = 1186;
const OID_TIMETZ: Oid = 1266;
const OID_NUMERIC: Oid = 1700;
const OID_UUID: Oid = 2950;
const OID_JSONB: Oid = 3802;

/// Maps a column's type OID to the [`Value`] it decodes to.
///
/// Bound to one session: [`Self::initialize_from`] reads `client_encoding`
/// and `TimeZone` out of the startup `ParameterStatus` stream, and
/// [`Self::enums_mut`] lets a caller (see `Client::load_enums`) augment the
/// OID table with whatever enum types that session's database defines.
#[derive(Debug)]
pub struct Converter {
    client_encoding: String,
    #[allow(dead_code)]
    timezone: String,
    enums: EnumRegistry,
}

impl Converter {
    pub fn new() -> Self {
        Self { client_encoding: "UTF8".to_string(), timezone: "UTC".to_string(), enums: EnumRegistry::new() }
    }

    /// Bind the encoder/decoder pair and timezone from the server's startup
    /// `ParameterStatus` reports. Must run before the first row is decoded.
    pub fn initialize_from(&mut self, parameters: &HashMap<ByteStr, ByteStr>) {
        if let Some(enc) = parameters.get("client_encoding") {
            self.client_encoding = enc.as_str().to_string();
        }
        if let Some(tz) = parameters.get("TimeZone") {
            self.timezone = tz.as_str().to_string();
        }
    }

    pub fn client_encoding(&self) -> &str {
        &self.client_encoding
    }

    pub fn enums_mut(&mut self) -> &mut EnumRegistry {
        &mut self.enums
    }

    /// Decode one column's bytes, given its OID. A `None` buf denotes SQL
    /// NULL and always yields `Value::Null` without reaching a decoder.
    pub fn decode(&self, oid: Oid, buf: Option<&[u8]>) -> Result<Value, DecodeError> {
        let Some(buf) = buf else {
            return Ok(Value::Null);
        };

        if let Some(element_oid) = array::element_oid(oid) {
            return self.decode_array(element_oid, buf);
        }

        if let Some(type_name) = self.enums.type_name(oid) {
            let label = self.text(buf)?;
            return Ok(Value::Enum { type_name: type_name.to_string(), label });
        }

        match oid {
            OID_BOOL => Ok(Value::Bool(self.text(buf)? == "t")),
            OID_BYTEA => decode_bytea(&self.text(buf)?),
            OID_INT2 => self.text(buf)?.parse().map(Value::Int2).map_err(|e| DecodeError::new(e.to_string())),
            OID_INT4 => self.text(buf)?.parse().map(Value::Int4).map_err(|e| DecodeError::new(e.to_string())),
            OID_INT8 => self.text(buf)?.parse().map(Value::Int8).map_err(|e| DecodeError::new(e.to_string())),
            OID_FLOAT4 => self.text(buf)?.parse().map(Value::Float4).map_err(|e| DecodeError::new(e.to_string())),
            OID_FLOAT8 => self.text(buf)?.parse().map(Value::Float8).map_err(|e| DecodeError::new(e.to_string())),
            OID_NUMERIC => Ok(Value::Numeric(self.text(buf)?)),
            OID_TEXT | OID_VARCHAR | OID_BPCHAR | OID_NAME => Ok(Value::Text(self.text(buf)?)),
            OID_DATE => Ok(Value::Date(self.text(buf)?)),
            OID_TIME | OID_TIMETZ => Ok(Value::Time(self.text(buf)?)),
            OID_TIMESTAMP => Ok(Value::Timestamp(self.text(buf)?)),
            OID_TIMESTAMPTZ => Ok(Value::TimestampTz(self.text(buf)?)),
            OID_INTERVAL => Ok(Value::Interval(self.text(buf)?)),
            OID_POINT => point::decode(&self.text(buf)?),
            #[cfg(feature = "uuid")]
            OID_UUID => uuid::Uuid::parse_str(self.text(buf)?.trim())
                .map(Value::Uuid)
                .map_err(|e| DecodeError::new(e.to_string())),
            #[cfg(not(feature = "uuid"))]
            OID_UUID => Ok(Value::Text(self.text(buf)?)),
            #[cfg(feature = "json")]
            OID_JSON | OID_JSONB => {
                serde_json::from_slice(buf).map(Value::Json).map_err(|e| DecodeError::new(e.to_string()))
            }
            #[cfg(not(feature = "json"))]
            OID_JSON | OID_JSONB => Ok(Value::Text(self.text(buf)?)),
            // Unknown OID: degrade gracefully to text rather than failing the
            // whole row, matching how most drivers handle exotic/extension types.
            _ => Ok(Value::Text(self.text(buf)?)),
        }
    }

    fn decode_array(&self, element_oid: Oid, buf: &[u8]) -> Result<Value, DecodeError> {
        let text = self.text(buf)?;
        let items = array::parse_text_array(&text).map_err(DecodeError::new)?;
        let values = items
            .into_iter()
            .map(|item| match item {
                None => Ok(Value::Null),
                Some(raw) => self.decode(element_oid, Some(raw.as_bytes())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(values))
    }

    fn text(&self, buf: &[u8]) -> Result<String, DecodeError> {
        // Only UTF-8 and its ASCII subset are decoded natively; anything
        // else is carried through as a lossy string rather than failing the
        // whole row, matching the client_encoding stub allowed by the spec.
        match self.client_encoding.as_str() {
            "UTF8" | "SQL_ASCII" | "LATIN1" => {
                std::str::from_utf8(buf).map(str::to_string).or_else(|_| Ok(String::from_utf8_lossy(buf).into_owned()))
            }
            _ => Ok(String::from_utf8_lossy(buf).into_owned()),
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_bytea(text: &str) -> Result<Value, DecodeError> {
    let hex = text.strip_prefix("\\x").ok_or_else(|| DecodeError::new("bytea value missing \\x prefix"))?;
    if hex.len() % 2 != 0 {
        return Err(DecodeError::new("bytea hex payload has odd length"));
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let byte = u8::from_str_radix(std::str::from_utf8(chunk).unwrap(), 16)
            .map_err(|e| DecodeError::new(e.to_string()))?;
        bytes.push(byte);
    }
    Ok(Value::Bytea(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bool_text() {
        let conv = Converter::new();
        assert_eq!(conv.decode(OID_BOOL, Some(b"t")).unwrap(), Value::Bool(true));
        assert_eq!(conv.decode(OID_BOOL, Some(b"f")).unwrap(), Value::Bool(false));
    }

    #[test]
    fn decodes_null_without_reaching_a_decoder() {
        let conv = Converter::new();
        assert_eq!(conv.decode(OID_INT4, None).unwrap(), Value::Null);
    }

    #[test]
    fn decodes_int_family() {
        let conv = Converter::new();
        assert_eq!(conv.decode(OID_INT4, Some(b"42")).unwrap(), Value::Int4(42));
        assert_eq!(conv.decode(OID_INT8, Some(b"-9000000000")).unwrap(), Value::Int8(-9_000_000_000));
    }

    #[test]
    fn decodes_bytea_hex() {
        let conv = Converter::new();
        assert_eq!(conv.decode(OID_BYTEA, Some(b"\\xdeadbeef")).unwrap(), Value::Bytea(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn decodes_text_array() {
        let conv = Converter::new();
        let array_oid = 1009; // _text
        let got = conv.decode(array_oid, Some(b"{a,b,NULL,c}")).unwrap();
        assert_eq!(got, Value::Array(vec![
            Value::Text("a".into()),
            Value::Text("b".into()),
            Value::Null,
            Value::Text("c".into()),
        ]));
    }

    #[test]
    fn unknown_oid_degrades_to_text() {
        let conv = Converter::new();
        assert_eq!(conv.decode(999_999, Some(b"whatever")).unwrap(), Value::Text("whatever".into()));
    }
}
