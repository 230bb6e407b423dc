//! indexOf / lastIndexOf

use crate::array::elements::{dense_fast_path, get_element, length_of};
use crate::array::this_object;
use crate::context::NativeContext;
use crate::convert::{strict_equal, to_integer};
use crate::error::VmResult;
use crate::gc::GcRef;
use crate::object::JsObject;
use crate::value::Value;

const NOT_FOUND: f64 = -1.0;

/// Scan `[lo, hi)` for `target`, forwards or backwards, reading dense
/// storage directly when possible
fn find(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    target: &Value,
    lo: u32,
    hi: u32,
    backwards: bool,
) -> VmResult<Option<u32>> {
    if let Some(lock) = dense_fast_path(obj) {
        let elements = lock.read();
        if let Some(dense) = elements.dense() {
            // Nothing is present past the initialized length
            let hi = hi.min(dense.initialized_length()).max(lo);
            let matches = |k: &u32| dense.get(*k).is_some_and(|value| strict_equal(value, target));
            return Ok(if backwards {
                (lo..hi).rev().find(matches)
            } else {
                (lo..hi).find(matches)
            });
        }
    }
    let indices: Box<dyn Iterator<Item = u32>> = if backwards {
        Box::new((lo..hi).rev())
    } else {
        Box::new(lo..hi)
    };
    for k in indices {
        ncx.check_interrupt()?;
        if let Some(value) = get_element(ncx, obj, k)? {
            if strict_equal(&value, target) {
                return Ok(Some(k));
            }
        }
    }
    Ok(None)
}

fn position(found: Option<u32>) -> Value {
    Value::number(found.map_or(NOT_FOUND, |k| k as f64))
}

/// `Array.prototype.indexOf(searchElement, fromIndex)`
pub fn index_of(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "indexOf")?;
    let len = length_of(ncx, &obj)?;
    if len == 0 {
        return Ok(Value::number(NOT_FOUND));
    }
    let from = match args.get(1) {
        Some(value) => to_integer(ncx, value)?,
        None => 0.0,
    };
    if from >= len as f64 {
        return Ok(Value::number(NOT_FOUND));
    }
    let start = if from >= 0.0 {
        from as u32
    } else {
        (len as f64 + from).max(0.0) as u32
    };
    let target = args.first().cloned().unwrap_or_default();
    let found = find(ncx, &obj, &target, start, len, false)?;
    Ok(position(found))
}

/// `Array.prototype.lastIndexOf(searchElement, fromIndex)`
///
/// A start at or past the end begins at `length - 1`; a negative start
/// that stays negative after adding `length` finds nothing.
pub fn last_index_of(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "lastIndexOf")?;
    let len = length_of(ncx, &obj)?;
    if len == 0 {
        return Ok(Value::number(NOT_FOUND));
    }
    let from = match args.get(1) {
        Some(value) => to_integer(ncx, value)?,
        None => (len - 1) as f64,
    };
    let start = if from >= 0.0 {
        from.min((len - 1) as f64)
    } else {
        len as f64 + from
    };
    if start < 0.0 {
        return Ok(Value::number(NOT_FOUND));
    }
    let target = args.first().cloned().unwrap_or_default();
    let found = find(ncx, &obj, &target, 0, start as u32 + 1, true)?;
    Ok(position(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{new_array_from_values, new_array_with_length};

    fn array(ncx: &mut NativeContext, values: &[f64]) -> Value {
        Value::object(
            new_array_from_values(ncx, values.iter().copied().map(Value::number).collect()).unwrap(),
        )
    }

    #[test]
    fn test_index_of() {
        let mut ncx = NativeContext::new();
        let a = array(&mut ncx, &[1.0, 2.0, 3.0, 2.0]);
        let two = Value::number(2.0);
        assert_eq!(index_of(&mut ncx, &a, &[two.clone()]).unwrap(), Value::number(1.0));
        assert_eq!(
            index_of(&mut ncx, &a, &[two.clone(), Value::number(2.0)]).unwrap(),
            Value::number(3.0)
        );
        assert_eq!(
            index_of(&mut ncx, &a, &[two.clone(), Value::number(-1.0)]).unwrap(),
            Value::number(3.0)
        );
        assert_eq!(
            index_of(&mut ncx, &a, &[two, Value::number(9.0)]).unwrap(),
            Value::number(-1.0)
        );
        assert_eq!(
            index_of(&mut ncx, &a, &[Value::string("2")]).unwrap(),
            Value::number(-1.0)
        );
    }

    #[test]
    fn test_last_index_of_clamps() {
        let mut ncx = NativeContext::new();
        let a = array(&mut ncx, &[2.0, 1.0, 2.0]);
        let two = Value::number(2.0);
        assert_eq!(last_index_of(&mut ncx, &a, &[two.clone()]).unwrap(), Value::number(2.0));
        assert_eq!(
            last_index_of(&mut ncx, &a, &[two.clone(), Value::number(10.0)]).unwrap(),
            Value::number(2.0)
        );
        assert_eq!(
            last_index_of(&mut ncx, &a, &[two.clone(), Value::number(-2.0)]).unwrap(),
            Value::number(0.0)
        );
        assert_eq!(
            last_index_of(&mut ncx, &a, &[two, Value::number(-4.0)]).unwrap(),
            Value::number(-1.0)
        );
    }

    #[test]
    fn test_holes_never_match_undefined() {
        let mut ncx = NativeContext::new();
        let holes = Value::object(new_array_with_length(&ncx, 3));
        assert_eq!(
            index_of(&mut ncx, &holes, &[Value::undefined()]).unwrap(),
            Value::number(-1.0)
        );
        assert_eq!(
            last_index_of(&mut ncx, &holes, &[Value::undefined()]).unwrap(),
            Value::number(-1.0)
        );
    }

    #[test]
    fn test_nan_is_never_found() {
        let mut ncx = NativeContext::new();
        let a = array(&mut ncx, &[f64::NAN]);
        assert_eq!(
            index_of(&mut ncx, &a, &[Value::number(f64::NAN)]).unwrap(),
            Value::number(-1.0)
        );
    }
}
