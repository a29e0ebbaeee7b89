//! Numeric coercion for loosely-typed miner output fields.
//!
//! The miner CLI prints everything as text. Fields that look numeric are
//! promoted to integers or floats; everything else is passed through as a
//! raw string and the caller decides whether it is publishable.

/// A field value coerced from raw miner output.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Returns the value as f64 if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) => None,
        }
    }

    /// Returns the value as i64 if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Coerces a raw string field into a typed value.
///
/// Promotion rules: a signed run of digits becomes `Int`, a signed
/// `digits.digits` form becomes `Float`, anything else stays a string.
/// Deliberately stricter than `f64::from_str` so tokens like `"true"`,
/// `"inf"` or `"nan"` are never silently turned into numbers.
pub fn coerce(raw: &str) -> Value {
    let s = raw.trim();
    if is_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Int(i);
        }
    }
    if is_decimal(s) {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::Str(s.to_string())
}

/// Splits a `"numerator/denominator"` ratio field.
///
/// Both sides must be unsigned integers; anything else yields `None`.
pub fn parse_ratio(raw: &str) -> Option<(u64, u64)> {
    let (num, den) = raw.trim().split_once('/')?;
    let num = num.trim().parse::<u64>().ok()?;
    let den = den.trim().parse::<u64>().ok()?;
    Some((num, den))
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(s: &str) -> bool {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let Some((int_part, frac_part)) = body.split_once('.') else {
        return false;
    };
    !int_part.is_empty()
        && !frac_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}
