//! Query results: command tags, field descriptions, and decoded rows.
use crate::{
    common::{unit_error, ByteStr},
    protocol::RowFieldDescription,
    value::Value,
};

unit_error! {
    /// [`Client::query`][crate::Client::query] (or `fetch_one`) returned no row.
    pub struct RowNotFound("row not found");
}

/// Everything a simple-query or extended-query flow produced.
///
/// When a simple-query string contains multiple statements, `command_tags`
/// holds one entry per statement while `descriptions`/`rows` describe only
/// the last `RowDescription` seen, matching how most drivers surface a
/// multi-statement batch's final result set.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub command_tags: Vec<String>,
    pub descriptions: Vec<RowFieldDescription>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Total rows affected across all command tags that report a count.
    pub fn rows_affected(&self) -> u64 {
        self.command_tags.iter().filter_map(|tag| tag.rsplit(' ').next()?.parse::<u64>().ok()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// The only row, or [`RowNotFound`] if there was none; asserts (via
    /// `debug_assert`) there was at most one when debug assertions are on.
    pub fn one(self) -> Result<Row, RowNotFound> {
        self.optional()?.ok_or(RowNotFound)
    }

    pub fn optional(mut self) -> Result<Option<Row>, RowNotFound> {
        match self.rows.len() {
            0 => Ok(None),
            _ => Ok(Some(self.rows.remove(0))),
        }
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// One decoded row, columns in the order described by the result's
/// `descriptions`.
#[derive(Debug, Clone)]
pub struct Row {
    pub(crate) descriptions: std::sync::Arc<Vec<RowFieldDescription>>,
    pub(crate) values: Vec<Value>,
}

impl Row {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.descriptions.iter().map(|d| d.name.as_str())
    }

    /// Decode column `idx` (by position or by name) into `T`.
    pub fn try_get<I: Index, T: Decode>(&self, idx: I) -> Result<T, DecodeError> {
        let i = idx.position(self)?;
        T::decode(self.values[i].clone())
    }

    pub fn get<I: Index, T: Decode>(&self, idx: I) -> T
    where
        T: Default,
    {
        self.try_get(idx).unwrap_or_default()
    }

    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        D::from_row(self)
    }
}

/// A type that can locate a column within a [`Row`] by position or name.
pub trait Index: sealed::Sealed {
    fn position(&self, row: &Row) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(&self, row: &Row) -> Result<usize, DecodeError> {
        if *self < row.values.len() {
            Ok(*self)
        } else {
            Err(DecodeError::IndexOutOfBounds(*self))
        }
    }
}

impl Index for &str {
    fn position(&self, row: &Row) -> Result<usize, DecodeError> {
        row.descriptions
            .iter()
            .position(|d| d.name.as_str() == *self)
            .ok_or_else(|| DecodeError::ColumnNotFound((*self).to_string()))
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for usize {}
    impl Sealed for &str {}
}

/// A value could not be pulled out of a [`Row`].
pub enum DecodeError {
    ColumnNotFound(String),
    IndexOutOfBounds(usize),
    Null,
    TypeMismatch { expected: &'static str, found: &'static str },
    Parse(String),
    #[cfg(feature = "json")]
    Json(serde_json::Error),
}

impl std::error::Error for DecodeError {}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnNotFound(name) => write!(f, "column {name:?} not found"),
            Self::IndexOutOfBounds(i) => write!(f, "column index {i} out of bounds"),
            Self::Null => write!(f, "column was NULL"),
            Self::TypeMismatch { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::Parse(reason) => write!(f, "failed to parse column: {reason}"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "failed to decode json column: {e}"),
        }
    }
}

impl std::fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// A type that can be decoded from a single column's [`Value`].
pub trait Decode: Sized {
    fn decode(value: Value) -> Result<Self, DecodeError>;
}

impl Decode for Value {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            other => T::decode(other).map(Some),
        }
    }
}

macro_rules! decode_scalar {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl Decode for $ty {
            fn decode(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    Value::Null => Err(DecodeError::Null),
                    other => Err(DecodeError::TypeMismatch { expected: $name, found: other_name(&other) }),
                }
            }
        }
    };
}

decode_scalar!(bool, Bool, "bool");
decode_scalar!(i16, Int2, "int2");
decode_scalar!(i32, Int4, "int4");
decode_scalar!(i64, Int8, "int8");
decode_scalar!(f32, Float4, "float4");
decode_scalar!(f64, Float8, "float8");

impl Decode for String {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Text(s) | Value::Numeric(s) | Value::Date(s) | Value::Time(s) | Value::Timestamp(s)
            | Value::TimestampTz(s) | Value::Interval(s) => Ok(s),
            Value::Null => Err(DecodeError::Null),
            other => Ok(other.to_string()),
        }
    }
}

impl Decode for Vec<u8> {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bytea(b) => Ok(b),
            Value::Null => Err(DecodeError::Null),
            other => Err(DecodeError::TypeMismatch { expected: "bytea", found: other_name(&other) }),
        }
    }
}

#[cfg(feature = "uuid")]
impl Decode for uuid::Uuid {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Null => Err(DecodeError::Null),
            other => Err(DecodeError::TypeMismatch { expected: "uuid", found: other_name(&other) }),
        }
    }
}

fn other_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int2(_) => "int2",
        Value::Int4(_) => "int4",
        Value::Int8(_) => "int8",
        Value::Float4(_) => "float4",
        Value::Float8(_) => "float8",
        Value::Numeric(_) => "numeric",
        Value::Text(_) => "text",
        Value::Bytea(_) => "bytea",
        Value::Date(_) => "date",
        Value::Time(_) => "time",
        Value::Timestamp(_) => "timestamp",
        Value::TimestampTz(_) => "timestamptz",
        Value::Interval(_) => "interval",
        #[cfg(feature = "uuid")]
        Value::Uuid(_) => "uuid",
        #[cfg(feature = "json")]
        Value::Json(_) => "json",
        Value::Point { .. } => "point",
        Value::Enum { .. } => "enum",
        Value::Array(_) => "array",
    }
}

/// A type that can be constructed from a whole [`Row`].
pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self, DecodeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

macro_rules! from_row_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t: Decode),*> FromRow for ($($t,)*) {
            fn from_row(row: Row) -> Result<Self, DecodeError> {
                Ok(($(row.try_get::<usize, $t>($i)?,)*))
            }
        }
    };
}

from_row_tuple!(T0 0);
from_row_tuple!(T0 0, T1 1);
from_row_tuple!(T0 0, T1 1, T2 2);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn row(values: Vec<Value>, names: Vec<&str>) -> Row {
        let descriptions = names
            .into_iter()
            .map(|name| RowFieldDescription {
                name: ByteStr::copy_from_str(name),
                table_oid: 0,
                column_attr: 0,
                type_oid: 0,
                type_size: 0,
                type_modifier: 0,
                format: 0,
            })
            .collect();
        Row { descriptions: Arc::new(descriptions), values }
    }

    #[test]
    fn gets_by_position_and_name() {
        let r = row(vec![Value::Int4(42), Value::Text("hi".into())], vec!["n", "label"]);
        assert_eq!(r.try_get::<usize, i32>(0).unwrap(), 42);
        assert_eq!(r.try_get::<&str, String>("label").unwrap(), "hi");
    }

    #[test]
    fn missing_column_errors() {
        let r = row(vec![Value::Int4(1)], vec!["n"]);
        assert!(matches!(r.try_get::<&str, i32>("nope"), Err(DecodeError::ColumnNotFound(_))));
    }

    #[test]
    fn null_column_errors_for_non_option() {
        let r = row(vec![Value::Null], vec!["n"]);
        assert!(matches!(r.try_get::<usize, i32>(0), Err(DecodeError::Null)));
    }

    #[test]
    fn null_column_decodes_to_none() {
        let r = row(vec![Value::Null], vec!["n"]);
        assert_eq!(r.try_get::<usize, Option<i32>>(0).unwrap(), None);
    }

    #[test]
    fn tuple_decode() {
        let r = row(vec![Value::Int4(1), Value::Text("x".into())], vec!["a", "b"]);
        let (a, b): (i32, String) = r.decode().unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, "x");
    }
}
