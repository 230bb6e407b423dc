//! Abstract operations: type conversion and comparison

use std::cmp::Ordering;
use std::sync::Arc;

use crate::context::NativeContext;
use crate::error::{VmError, VmResult};
use crate::object::PropertyKey;
use crate::value::Value;

/// ToPrimitive hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    /// Try `toString` first
    String,
    /// Try `valueOf` first
    Number,
}

/// ToPrimitive
pub fn to_primitive(ncx: &mut NativeContext, value: &Value, hint: PreferredType) -> VmResult<Value> {
    let Some(obj) = value.as_object() else {
        return Ok(value.clone());
    };
    let order = match hint {
        PreferredType::String => ["toString", "valueOf"],
        PreferredType::Number => ["valueOf", "toString"],
    };
    for name in order {
        let method = obj.get(ncx, &PropertyKey::string(name))?;
        if method.is_callable() {
            let result = ncx.call_function(&method, value, &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    Err(VmError::type_error("Cannot convert object to primitive value"))
}

/// ToNumber
pub fn to_number(ncx: &mut NativeContext, value: &Value) -> VmResult<f64> {
    Ok(match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Object(_) => {
            let primitive = to_primitive(ncx, value, PreferredType::Number)?;
            return to_number(ncx, &primitive);
        }
    })
}

/// StringToNumber
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            return digits.chars().try_fold(0.0_f64, |acc, c| {
                c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
            })
            .unwrap_or(f64::NAN);
        }
    }
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// ToIntegerOrInfinity
pub fn to_integer(ncx: &mut NativeContext, value: &Value) -> VmResult<f64> {
    let n = to_number(ncx, value)?;
    Ok(if n.is_nan() { 0.0 } else { n.trunc() + 0.0 })
}

/// ToUint32 on an already converted number
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4294967296.0);
    modulo as u32
}

/// Convert a `length` value, failing with `InvalidLength` for anything
/// that is not exactly a uint32
pub fn to_array_length(ncx: &mut NativeContext, value: &Value) -> VmResult<u32> {
    let n = to_number(ncx, value)?;
    let len = to_uint32(n);
    if len as f64 != n {
        return Err(VmError::InvalidLength);
    }
    Ok(len)
}

/// Resolve a relative index argument against `len` (negative counts from
/// the end), clamped to `[0, len]`
pub fn relative_index(relative: f64, len: u32) -> u32 {
    let len = len as f64;
    let index = if relative < 0.0 {
        (len + relative).max(0.0)
    } else {
        relative.min(len)
    };
    index as u32
}

/// ToString
pub fn to_string(ncx: &mut NativeContext, value: &Value) -> VmResult<Arc<str>> {
    Ok(match value {
        Value::Undefined => Arc::from("undefined"),
        Value::Null => Arc::from("null"),
        Value::Boolean(true) => Arc::from("true"),
        Value::Boolean(false) => Arc::from("false"),
        Value::Number(n) => Arc::from(number_to_string(*n)),
        Value::String(s) => Arc::clone(s),
        Value::Object(_) => {
            let primitive = to_primitive(ncx, value, PreferredType::String)?;
            return to_string(ncx, &primitive);
        }
    })
}

/// Number::toString(10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return itoa::Buffer::new().format(n as i64).to_string();
    }

    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }
    let mut buffer = ryu::Buffer::new();
    let (digits, point) = decimal_digits(buffer.format_finite(n.abs()));
    let k = digits.len() as i32;

    if k <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (point - k) as usize));
    } else if 0 < point && point <= 21 {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-point) as usize));
        out.push_str(&digits);
    } else {
        let exponent = point - 1;
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(itoa::Buffer::new().format(exponent.abs()));
    }
    out
}

/// Split shortest round-trip output into significant digits and the
/// position of the decimal point relative to them
fn decimal_digits(repr: &str) -> (String, i32) {
    let (mantissa, exponent) = match repr.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (repr, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut point = int_part.len() as i32 + exponent;

    let all: String = int_part.chars().chain(frac_part.chars()).collect();
    let trimmed_leading = all.trim_start_matches('0');
    point -= (all.len() - trimmed_leading.len()) as i32;
    let digits = trimmed_leading.trim_end_matches('0').to_string();
    (digits, point)
}

/// IsStrictlyEqual
pub fn strict_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        _ => a == b,
    }
}

/// Compare strings by UTF-16 code units
pub fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
