//! Decoding for the `point` geometric type, text format `(x,y)`.
use super::DecodeError;
use crate::value::Value;

pub fn decode(text: &str) -> Result<Value, DecodeError> {
    let inner = text
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| DecodeError::new("point value missing parentheses"))?;

    let (x, y) = inner.split_once(',').ok_or_else(|| DecodeError::new("point value missing comma"))?;

    let x: f64 = x.trim().parse().map_err(|_| DecodeError::new("point x was not a number"))?;
    let y: f64 = y.trim().parse().map_err(|_| DecodeError::new("point y was not a number"))?;

    Ok(Value::Point { x, y })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_point() {
        assert_eq!(decode("(1.5,-2.25)").unwrap(), Value::Point { x: 1.5, y: -2.25 });
    }

    #[test]
    fn rejects_malformed_point() {
        assert!(decode("1.5,-2.25").is_err());
    }
}
