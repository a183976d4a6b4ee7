//! The dynamic value produced by decoding a column.
use std::fmt;

/// A decoded column value.
///
/// `Null` is a first-class tagged variant rather than an `Option` wrapper
/// around every other variant, so printing and matching never need a second
/// dispatch just to special-case the absence of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    /// `numeric` is kept as its canonical text representation: it can exceed
    /// the precision of any native float.
    Numeric(String),
    Text(String),
    Bytea(Vec<u8>),
    Date(String),
    Time(String),
    Timestamp(String),
    TimestampTz(String),
    Interval(String),
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    #[cfg(feature = "json")]
    Json(serde_json::Value),
    Point { x: f64, y: f64 },
    /// A decoded `pg_enum` label, tagged with its type name for diagnostics.
    Enum { type_name: String, label: String },
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! from_scalar {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

from_scalar!(bool, Bool);
from_scalar!(i16, Int2);
from_scalar!(i32, Int4);
from_scalar!(i64, Int8);
from_scalar!(f32, Float4);
from_scalar!(f64, Float8);
from_scalar!(String, Text);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int2(n) => write!(f, "{n}"),
            Value::Int4(n) => write!(f, "{n}"),
            Value::Int8(n) => write!(f, "{n}"),
            Value::Float4(n) => write!(f, "{n}"),
            Value::Float8(n) => write!(f, "{n}"),
            Value::Numeric(s) => write!(f, "{s}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytea(b) => write!(f, "\\x{}", b.iter().map(|b| format!("{b:02x}")).collect::<String>()),
            Value::Date(s) | Value::Time(s) | Value::Timestamp(s) | Value::TimestampTz(s) | Value::Interval(s) => {
                write!(f, "{s}")
            }
            #[cfg(feature = "uuid")]
            Value::Uuid(u) => write!(f, "{u}"),
            #[cfg(feature = "json")]
            Value::Json(v) => write!(f, "{v}"),
            Value::Point { x, y } => write!(f, "({x},{y})"),
            Value::Enum { label, .. } => write!(f, "{label}"),
            Value::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
