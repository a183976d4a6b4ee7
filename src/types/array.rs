//! PostgreSQL text-format array parsing and array-OID lookup.
use crate::protocol::Oid;

/// Element OID for the array OIDs this library knows about statically.
///
/// <https://www.postgresql.org/docs/current/catalog-pg-type.html> lists the
/// full set; this covers the scalar types the converter otherwise decodes.
pub fn element_oid(array_oid: Oid) -> Option<Oid> {
    Some(match array_oid {
        1000 => 16,   // _bool
        1001 => 17,   // _bytea
        1005 => 21,   // _int2
        1007 => 23,   // _int4
        1009 => 25,   // _text
        1015 => 1043, // _varchar
        1016 => 20,   // _int8
        1017 => 600,  // _point
        1021 => 700,  // _float4
        1022 => 701,  // _float8
        1115 => 1114, // _timestamp
        1182 => 1082, // _date
        1183 => 1083, // _time
        1185 => 1184, // _timestamptz
        1187 => 1186, // _interval
        1231 => 1700, // _numeric
        199 => 114,   // _json
        2951 => 2950, // _uuid
        3807 => 3802, // _jsonb
        _ => return None,
    })
}

/// Parse a one-dimensional PostgreSQL array literal like `{a,b,NULL,"c,d"}`
/// into its element strings (`None` for the unquoted literal `NULL`).
///
/// Multi-dimensional arrays are flattened: nested `{...}` groups are parsed
/// recursively and their elements appended in order.
pub fn parse_text_array(text: &str) -> Result<Vec<Option<String>>, String> {
    let text = text.trim();
    let inner = text.strip_prefix('{').and_then(|s| s.strip_suffix('}')).ok_or("array literal missing braces")?;

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut chars = inner.chars().peekable();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut depth = 0u32;

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => in_quotes = true,
            '"' if in_quotes => in_quotes = false,
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '{' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            '}' if !in_quotes => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if !in_quotes && depth == 0 => {
                elements.push(take_element(&mut current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    elements.push(take_element(&mut current));

    // flatten one level of nested braces (multi-dimensional arrays)
    let mut flat = Vec::new();
    for el in elements {
        match el {
            Some(s) if s.starts_with('{') && s.ends_with('}') => {
                flat.extend(parse_text_array(&s)?);
            }
            other => flat.push(other),
        }
    }

    Ok(flat)
}

fn take_element(raw: &mut str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("NULL") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_array() {
        assert_eq!(
            parse_text_array("{1,2,3}").unwrap(),
            vec![Some("1".into()), Some("2".into()), Some("3".into())]
        );
    }

    #[test]
    fn parses_null_elements() {
        assert_eq!(parse_text_array("{a,NULL,c}").unwrap(), vec![Some("a".into()), None, Some("c".into())]);
    }

    #[test]
    fn parses_quoted_elements_with_commas() {
        assert_eq!(parse_text_array(r#"{"a,b",c}"#).unwrap(), vec![Some("a,b".into()), Some("c".into())]);
    }

    #[test]
    fn rejects_missing_braces() {
        assert!(parse_text_array("1,2,3").is_err());
    }

    #[test]
    fn known_array_oid_maps_to_element() {
        assert_eq!(element_oid(1007), Some(23));
        assert_eq!(element_oid(123_456), None);
    }
}
