//! Iteration dispatcher: forEach, map, filter, some, every, reduce,
//! reduceRight
//!
//! `length` is read once. Each element is fetched through the element
//! accessor right before its callback runs, so callbacks that mutate the
//! array are observed; absent elements are skipped without a call.

use smallvec::{SmallVec, smallvec};

use crate::array::elements::{create_element, get_element, length_of};
use crate::array::this_object;
use crate::builtins::{new_array, new_array_with_length};
use crate::context::NativeContext;
use crate::error::{VmError, VmResult};
use crate::gc::GcRef;
use crate::object::JsObject;
use crate::value::Value;

/// Callback arguments; never more than four
type CallArgs = SmallVec<[Value; 4]>;

/// Which iteration method is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationMode {
    /// `forEach`
    ForEach,
    /// `map`
    Map,
    /// `filter`
    Filter,
    /// `some`
    Some,
    /// `every`
    Every,
    /// `reduce`
    Reduce,
    /// `reduceRight`
    ReduceRight,
}

impl IterationMode {
    /// Method name
    pub fn name(self) -> &'static str {
        match self {
            Self::ForEach => "forEach",
            Self::Map => "map",
            Self::Filter => "filter",
            Self::Some => "some",
            Self::Every => "every",
            Self::Reduce => "reduce",
            Self::ReduceRight => "reduceRight",
        }
    }
}

/// Run an iteration method over `this`
pub fn array_extra(
    ncx: &mut NativeContext,
    mode: IterationMode,
    this: &Value,
    args: &[Value],
) -> VmResult<Value> {
    let obj = this_object(this, mode.name())?;
    let len = length_of(ncx, &obj)?;
    let callback = args.first().cloned().unwrap_or_default();
    if !callback.is_callable() {
        return Err(VmError::type_error(format!(
            "Array.prototype.{}: {:?} is not a function",
            mode.name(),
            callback
        )));
    }

    match mode {
        IterationMode::Reduce => reduce_impl(ncx, &obj, len, &callback, args.get(1), false),
        IterationMode::ReduceRight => reduce_impl(ncx, &obj, len, &callback, args.get(1), true),
        _ => {
            let this_arg = args.get(1).cloned().unwrap_or_default();
            visit(ncx, mode, &obj, len, &callback, &this_arg)
        }
    }
}

fn visit(
    ncx: &mut NativeContext,
    mode: IterationMode,
    obj: &GcRef<JsObject>,
    len: u32,
    callback: &Value,
    this_arg: &Value,
) -> VmResult<Value> {
    let scope = ncx.root_scope();
    let result = match mode {
        IterationMode::Map => Some(new_array_with_length(ncx, len)),
        IterationMode::Filter => Some(new_array(ncx)),
        _ => None,
    };
    let _result_root = result
        .as_ref()
        .map(|array| scope.root(Value::object(array.clone())));

    let receiver = Value::object(obj.clone());
    let mut kept = 0u32;
    for k in 0..len {
        ncx.check_interrupt()?;
        let Some(value) = get_element(ncx, obj, k)? else {
            continue;
        };
        let call_args: CallArgs = smallvec![value.clone(), Value::number(k as f64), receiver.clone()];
        let produced = ncx.call_function(callback, this_arg, &call_args)?;

        match (mode, &result) {
            (IterationMode::Map, Some(array)) => {
                ncx.note_element(&produced);
                create_element(ncx, array, k, produced)?;
            }
            (IterationMode::Filter, Some(array)) => {
                if produced.to_boolean() {
                    ncx.note_element(&value);
                    create_element(ncx, array, kept, value)?;
                    kept += 1;
                }
            }
            (IterationMode::Some, _) if produced.to_boolean() => return Ok(Value::boolean(true)),
            (IterationMode::Every, _) if !produced.to_boolean() => return Ok(Value::boolean(false)),
            _ => {}
        }
    }

    Ok(match (mode, result) {
        (IterationMode::Some, _) => Value::boolean(false),
        (IterationMode::Every, _) => Value::boolean(true),
        (_, Some(array)) => Value::object(array),
        _ => Value::undefined(),
    })
}

fn reduce_impl(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    len: u32,
    callback: &Value,
    initial: Option<&Value>,
    right: bool,
) -> VmResult<Value> {
    let mut indices: Box<dyn Iterator<Item = u32>> = if right {
        Box::new((0..len).rev())
    } else {
        Box::new(0..len)
    };

    let mut accumulator = match initial {
        Some(value) => value.clone(),
        None => loop {
            let Some(k) = indices.next() else {
                return Err(VmError::type_error("Reduce of empty array with no initial value"));
            };
            ncx.check_interrupt()?;
            if let Some(value) = get_element(ncx, obj, k)? {
                break value;
            }
        },
    };

    let receiver = Value::object(obj.clone());
    for k in indices {
        ncx.check_interrupt()?;
        let Some(value) = get_element(ncx, obj, k)? else {
            continue;
        };
        let call_args: CallArgs = smallvec![accumulator, value, Value::number(k as f64), receiver.clone()];
        accumulator = ncx.call_function(callback, &Value::undefined(), &call_args)?;
    }
    Ok(accumulator)
}

/// `Array.prototype.forEach(callback, thisArg)`
pub fn for_each(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    array_extra(ncx, IterationMode::ForEach, this, args)
}

/// `Array.prototype.map(callback, thisArg)`
pub fn map(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    array_extra(ncx, IterationMode::Map, this, args)
}

/// `Array.prototype.filter(callback, thisArg)`
pub fn filter(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    array_extra(ncx, IterationMode::Filter, this, args)
}

/// `Array.prototype.some(callback, thisArg)`
pub fn some(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    array_extra(ncx, IterationMode::Some, this, args)
}

/// `Array.prototype.every(callback, thisArg)`
pub fn every(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    array_extra(ncx, IterationMode::Every, this, args)
}

/// `Array.prototype.reduce(callback, initialValue)`
pub fn reduce(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    array_extra(ncx, IterationMode::Reduce, this, args)
}

/// `Array.prototype.reduceRight(callback, initialValue)`
pub fn reduce_right(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    array_extra(ncx, IterationMode::ReduceRight, this, args)
}
