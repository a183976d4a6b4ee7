//! Prepared statement and portal identifiers.
use std::sync::atomic::{AtomicU32, Ordering};

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a digest of `sql`, used to derive a stable statement name.
///
/// Postgres identifiers are capped at `NAMEDATALEN` (63 bytes), so the raw
/// SQL text cannot be used as a prepared statement name; hashing gives a
/// fixed-width name that is the same across connections for the same SQL,
/// which is what makes statement reuse possible.
pub fn fnv1a_64(sql: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in sql.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The name of a prepared statement, either generated from a SQL text's
/// hash or the empty "unnamed" statement.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StatementName(String);

impl StatementName {
    pub fn unnamed() -> Self {
        Self(String::new())
    }

    /// Use `name` verbatim, as given by a caller who wants to manage their
    /// own statement identifiers.
    pub fn literal(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Derive a deterministic, `NAMEDATALEN`-safe name from `sql`.
    ///
    /// SQL text up to 63 bytes is used verbatim; longer text is truncated to
    /// a 46-byte prefix (on a char boundary) plus `_` and the 16 hex digits
    /// of its FNV-1a digest, keeping the result at or under 63 bytes while
    /// remaining collision-resistant.
    pub fn for_sql(sql: &str) -> Self {
        if sql.len() <= 63 {
            return Self(sql.to_string());
        }

        let mut cut = 46.min(sql.len());
        while !sql.is_char_boundary(cut) {
            cut -= 1;
        }
        Self(format!("{}_{:016x}", &sql[..cut], fnv1a_64(sql)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unnamed(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for StatementName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The name of a bound portal. Portals are always named uniquely per bind,
/// since (unlike statements) there is no benefit to reusing one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PortalName(String);

impl PortalName {
    pub fn unnamed() -> Self {
        Self(String::new())
    }

    pub fn next() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("p{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PortalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_sql_hashes_to_same_name() {
        assert_eq!(StatementName::for_sql("select 1"), StatementName::for_sql("select 1"));
    }

    #[test]
    fn different_sql_hashes_differ() {
        assert_ne!(StatementName::for_sql("select 1"), StatementName::for_sql("select 2"));
    }

    #[test]
    fn generated_name_fits_namedatalen() {
        let long_sql = "select * from a_very_long_table_name_that_goes_on ".repeat(10);
        assert!(StatementName::for_sql(&long_sql).as_str().len() < 64);
    }

    #[test]
    fn unnamed_statement_is_empty() {
        assert!(StatementName::unnamed().is_unnamed());
    }

    #[test]
    fn portal_names_are_unique() {
        assert_ne!(PortalName::next(), PortalName::next());
    }
}
