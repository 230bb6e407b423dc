//! String conversions: join, toString, toLocaleString, toSource
//!
//! Each conversion marks its receiver busy for the duration of the call,
//! so an array that contains itself (directly or through other arrays)
//! renders the inner occurrence as empty instead of recursing forever.

use std::sync::Arc;

use crate::array::elements::{get_element, length_of};
use crate::array::this_object;
use crate::builtins::is_array;
use crate::context::NativeContext;
use crate::convert::{number_to_string, to_string as value_to_string};
use crate::error::VmResult;
use crate::gc::GcRef;
use crate::object::{JsObject, PropertyKey};
use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Rendering {
    Plain,
    Locale,
}

/// Run `f` with `obj` marked busy; `on_cycle` if it already was
fn guarded(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    on_cycle: &str,
    f: impl FnOnce(&mut NativeContext) -> VmResult<String>,
) -> VmResult<Value> {
    if !ncx.enter_busy(obj) {
        return Ok(Value::string(on_cycle));
    }
    let result = f(ncx);
    ncx.leave_busy(obj);
    result.map(Value::string)
}

fn join_elements(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    len: u32,
    separator: &str,
    rendering: Rendering,
) -> VmResult<String> {
    let mut out = String::new();
    for k in 0..len {
        ncx.check_interrupt()?;
        if k > 0 {
            out.push_str(separator);
        }
        let Some(value) = get_element(ncx, obj, k)? else {
            continue;
        };
        if value.is_nullish() {
            continue;
        }
        let text = match rendering {
            Rendering::Locale if value.is_object() => {
                let localized = ncx.call_method(&value, "toLocaleString", &[])?;
                value_to_string(ncx, &localized)?
            }
            _ => value_to_string(ncx, &value)?,
        };
        out.push_str(&text);
    }
    Ok(out)
}

/// `Array.prototype.join(separator)`
pub fn join(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "join")?;
    let len = length_of(ncx, &obj)?;
    let separator: Arc<str> = match args.first() {
        None | Some(Value::Undefined) => Arc::from(","),
        Some(value) => value_to_string(ncx, value)?,
    };
    guarded(ncx, &obj, "", |ncx| {
        join_elements(ncx, &obj, len, &separator, Rendering::Plain)
    })
}

/// `Array.prototype.toString()`: calls `this.join()` when callable
pub fn to_string(ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "toString")?;
    let join = obj.get(ncx, &PropertyKey::string("join"))?;
    if join.is_callable() {
        return ncx.call_function(&join, this, &[]);
    }
    let tag = if is_array(this) { "Array" } else { "Object" };
    Ok(Value::string(format!("[object {tag}]")))
}

/// `Array.prototype.toLocaleString()`
///
/// Object elements are rendered through their own `toLocaleString`;
/// primitives carry no locale-specific form here and use ToString.
pub fn to_locale_string(ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "toLocaleString")?;
    let len = length_of(ncx, &obj)?;
    guarded(ncx, &obj, "", |ncx| {
        join_elements(ncx, &obj, len, ",", Rendering::Locale)
    })
}

/// `Array.prototype.toSource()`
///
/// Renders an array literal: holes as empty entries (a trailing hole adds
/// an extra comma), strings quoted, `undefined` as `(void 0)`. A cycle
/// renders as `[]`.
pub fn to_source(ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "toSource")?;
    guarded(ncx, &obj, "[]", |ncx| {
        let len = length_of(ncx, &obj)?;
        let mut out = String::from("[");
        let mut trailing_hole = false;
        for k in 0..len {
            ncx.check_interrupt()?;
            if k > 0 {
                out.push_str(", ");
            }
            match get_element(ncx, &obj, k)? {
                Some(value) => {
                    out.push_str(&value_source(ncx, &value)?);
                    trailing_hole = false;
                }
                None => trailing_hole = true,
            }
        }
        if trailing_hole {
            out.push(',');
        }
        out.push(']');
        Ok(out)
    })
}

fn value_source(ncx: &mut NativeContext, value: &Value) -> VmResult<String> {
    Ok(match value {
        Value::Undefined => "(void 0)".to_string(),
        Value::String(s) => quote(s),
        Value::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::Object(obj) => {
            let method = obj.get(ncx, &PropertyKey::string("toSource"))?;
            let rendered = if method.is_callable() {
                ncx.call_function(&method, value, &[])?
            } else {
                value.clone()
            };
            value_to_string(ncx, &rendered)?.to_string()
        }
        Value::Null | Value::Boolean(_) => value_to_string(ncx, value)?.to_string(),
    })
}

/// Double-quote `s`, escaping quotes, backslashes, control characters and
/// everything outside printable ASCII
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for unit in s.encode_utf16() {
        match unit {
            0x22 => out.push_str("\\\""),
            0x5C => out.push_str("\\\\"),
            0x08 => out.push_str("\\b"),
            0x0C => out.push_str("\\f"),
            0x0A => out.push_str("\\n"),
            0x0D => out.push_str("\\r"),
            0x09 => out.push_str("\\t"),
            0x0B => out.push_str("\\v"),
            0x20..=0x7E => out.push(unit as u8 as char),
            0x00..=0xFF => out.push_str(&format!("\\x{unit:02X}")),
            _ => out.push_str(&format!("\\u{unit:04X}")),
        }
    }
    out.push('"');
    out
}
