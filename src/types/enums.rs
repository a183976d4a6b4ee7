//! Dynamically-registered decoders for server-defined `enum` types.
use std::collections::HashMap;

use crate::protocol::Oid;

/// Type names for OIDs discovered by querying `pg_type`/`pg_enum`.
///
/// Enum OIDs are assigned when a `CREATE TYPE ... AS ENUM` runs, so they
/// can't be known at compile time; `Client::load_enums` queries `pg_type` and
/// populates this via [`Self::register`], and the converter consults it for
/// every column OID that doesn't match one of the built-in types.
#[derive(Default, Debug)]
pub struct EnumRegistry {
    names: HashMap<Oid, String>,
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_name(&self, oid: Oid) -> Option<&str> {
        self.names.get(&oid).map(String::as_str)
    }

    pub fn register(&mut self, oid: Oid, type_name: String) {
        self.names.insert(oid, type_name);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_looks_up() {
        let mut reg = EnumRegistry::new();
        reg.register(123_456, "mood".to_string());
        assert_eq!(reg.type_name(123_456), Some("mood"));
        assert_eq!(reg.type_name(1), None);
    }
}
