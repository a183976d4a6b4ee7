//! Client-side literal substitution for SQL templates.
//!
//! Unlike [`crate::Client::prepare`], a `FormattedStatement` never touches
//! the wire until `.to_sql()`'s output is sent as a plain query: the
//! placeholders are quoted and substituted locally. Useful for statements in
//! positions the extended-query protocol can't parameterize, such as
//! identifiers in DDL, at the cost of the usual literal-injection risk if a
//! bound value is untrusted.
use crate::value::Value;

pub struct FormattedStatement {
    template: String,
    params: Vec<Value>,
}

impl FormattedStatement {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into(), params: Vec::new() }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Replace every `$1`, `$2`, ... placeholder with its quoted literal.
    /// A `$n` with no matching bound value, or `$0`, is left untouched.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }

            let digits_start = i + 1;
            let mut digits_end = digits_start;
            while let Some(&(j, d)) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits_end = j + d.len_utf8();
                chars.next();
            }

            if digits_end == digits_start {
                out.push('$');
                continue;
            }

            match self.template[digits_start..digits_end].parse::<usize>() {
                Ok(n) if n >= 1 && n <= self.params.len() => out.push_str(&quote_literal(&self.params[n - 1])),
                _ => out.push_str(&self.template[i..digits_end]),
            }
        }

        out
    }
}

fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int2(n) => n.to_string(),
        Value::Int4(n) => n.to_string(),
        Value::Int8(n) => n.to_string(),
        Value::Float4(n) => n.to_string(),
        Value::Float8(n) => n.to_string(),
        Value::Numeric(s) => s.clone(),
        other => quote_string(&other.to_string()),
    }
}

fn quote_string(s: &str) -> String {
    let doubled = s.replace('\'', "''");
    if s.contains('\\') {
        format!("E'{}'", doubled.replace('\\', "\\\\"))
    } else {
        format!("'{doubled}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_positional_placeholders() {
        let sql = FormattedStatement::new("select * from t where id = $1 and name = $2")
            .bind(42_i32)
            .bind("o'brien")
            .to_sql();
        assert_eq!(sql, "select * from t where id = 42 and name = 'o''brien'");
    }

    #[test]
    fn null_renders_bare() {
        let sql = FormattedStatement::new("update t set v = $1").bind(Option::<i32>::None).to_sql();
        assert_eq!(sql, "update t set v = NULL");
    }

    #[test]
    fn numeric_literals_are_unquoted() {
        let sql = FormattedStatement::new("select $1").bind(3.5_f64).to_sql();
        assert_eq!(sql, "select 3.5");
    }

    #[test]
    fn backslash_forces_escape_string_syntax() {
        let sql = FormattedStatement::new("select $1").bind("a\\b").to_sql();
        assert_eq!(sql, "select E'a\\\\b'");
    }

    #[test]
    fn unbound_placeholder_is_left_alone() {
        let sql = FormattedStatement::new("select $1, $2").bind(1_i32).to_sql();
        assert_eq!(sql, "select 1, $2");
    }
}
