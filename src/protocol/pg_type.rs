/// PostgreSQL object identifier.
///
/// The oid type is implemented as an unsigned four-byte integer.
///
/// <https://www.postgresql.org/docs/current/datatype-oid.html>
pub type Oid = u32;

/// A type that has a well-known corresponding PostgreSQL oid.
pub trait PgType {
    const OID: Oid;
}

macro_rules! oid {
    ($ty:ty, $oid:literal $(, $doc:literal)?) => {
        impl PgType for $ty {
            $(#[doc = $doc])?
            const OID: Oid = $oid;
        }
    };
}

oid!(bool, 16, "`bool`");
oid!(Vec<u8>, 17, "`bytea`");
oid!(i64, 20, "`int8`");
oid!(i16, 21, "`int2`");
oid!(i32, 23, "`int4`");
oid!(str, 25, "`text`");
oid!(String, 25, "`text`");
oid!(f32, 700, "`float4`");
oid!(f64, 701, "`float8`");

#[cfg(feature = "uuid")]
oid!(uuid::Uuid, 2950, "`uuid`");
