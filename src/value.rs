//! The owned, tagged-sum value type accepted by `Set`.
//!
//! Query results ([`crate::Value`]) borrow from the source buffer and are
//! never meant to be constructed by callers; this type is the other
//! direction of the boundary — a plain, ownable JSON value a caller builds
//! up to hand to [`crate::mutation::set`]. Per the Design Notes, the source's
//! untyped Set input is re-architected here as a real sum type rather than
//! left as an opaque string.

use crate::error::Error;
use crate::util::extend_json_string;
use indexmap::IndexMap;

/// A JSON value to inject via `Set`. Objects preserve insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Number(v as f64)
            }
        })*
    };
}
impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, usize);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Encodes `value` to canonical compact JSON: integral numbers without a
/// trailing `.0`, strings minimally escaped (`"`, `\`, control characters),
/// object keys in insertion order, `NaN`/`Inf` rejected as `InvalidValue`.
pub fn encode(value: &Value) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    encode_into(value, &mut out)?;
    Ok(out)
}

fn encode_into(value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => encode_number(*n, out)?,
        Value::String(s) => extend_json_string(out, s.as_bytes()),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                encode_into(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                extend_json_string(out, k.as_bytes());
                out.push(b':');
                encode_into(v, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn encode_number(n: f64, out: &mut Vec<u8>) -> Result<(), Error> {
    if n.is_nan() || n.is_infinite() {
        return Err(Error::InvalidValue {
            reason: format!("non-finite number: {n}"),
        });
    }
    if n.fract() == 0.0 && n.abs() < 1e18 {
        out.extend_from_slice(format!("{}", n as i64).as_bytes());
    } else {
        out.extend_from_slice(format!("{n}").as_bytes());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encodes_integral_numbers_without_fraction() {
        assert_eq!(encode(&Value::Number(30.0)).unwrap(), b"30");
        assert_eq!(encode(&Value::Number(2.5)).unwrap(), b"2.5");
    }

    #[test]
    fn rejects_non_finite() {
        assert!(encode(&Value::Number(f64::NAN)).is_err());
        assert!(encode(&Value::Number(f64::INFINITY)).is_err());
    }

    #[test]
    fn object_preserves_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), Value::Number(1.0));
        map.insert("a".to_string(), Value::Number(2.0));
        let out = encode(&Value::Object(map)).unwrap();
        assert_eq!(out, br#"{"b":1,"a":2}"#);
    }

    #[test]
    fn escapes_strings() {
        let out = encode(&Value::String("a\"b\\c\n".to_string())).unwrap();
        assert_eq!(out, br#""a\"b\\c\n""#);
    }
}
