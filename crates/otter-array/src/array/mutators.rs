//! Bulk mutators: push, pop, shift, unshift, splice, concat, slice, reverse
//!
//! Each operation tries a dense fast path first. The fast path requires a
//! dense array whose prototype chain holds no indexed properties; anything
//! else goes through the generic element accessor, which works on any
//! object with a `length`.

use crate::array::elements::{
    self, create_element, delete_element, dense_fast_path, get_element, length_of, set_element,
    set_length_property,
};
use crate::array::mode::{self, Growth};
use crate::array::{Slot, this_object};
use crate::builtins::new_array;
use crate::context::NativeContext;
use crate::convert::{relative_index, to_integer};
use crate::error::{VmError, VmResult};
use crate::gc::GcRef;
use crate::object::JsObject;
use crate::value::Value;

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn count_of(values: &[Value]) -> VmResult<u32> {
    u32::try_from(values.len()).map_err(|_| VmError::InvalidLength)
}

fn grown_length(len: u32, extra: u32) -> VmResult<u32> {
    len.checked_add(extra).ok_or(VmError::InvalidLength)
}

/// Move the element at `from` to `to`, deleting `to` when `from` is absent
fn move_element(ncx: &mut NativeContext, obj: &GcRef<JsObject>, from: u32, to: u32) -> VmResult<()> {
    match get_element(ncx, obj, from)? {
        Some(value) => set_element(ncx, obj, to, value),
        None => delete_element(ncx, obj, to, true).map(|_| ()),
    }
}

// ============================================================================
// Dense helpers
// ============================================================================

/// Copy of slots `[start, end)` when they all lie in the initialized range
/// of a fast-path array
fn dense_window(obj: &JsObject, start: u32, end: u32) -> Option<Vec<Slot>> {
    let lock = dense_fast_path(obj)?;
    let elements = lock.read();
    let dense = elements.dense()?;
    if start > end || end > dense.initialized_length() {
        return None;
    }
    Some(dense.slots().as_slice()[start as usize..end as usize].to_vec())
}

/// Store `slots` into dense array `result` starting at `at`. Returns false,
/// with nothing written, when the result cannot stay dense.
fn append_slots(
    ncx: &mut NativeContext,
    result: &GcRef<JsObject>,
    at: u32,
    slots: &[Slot],
) -> VmResult<bool> {
    let Some(lock) = result.array_elements() else {
        return Ok(false);
    };
    let count = u32::try_from(slots.len()).map_err(|_| VmError::InvalidLength)?;
    let end = grown_length(at, count)?;

    let mut elements = lock.write();
    match mode::ensure_dense_elements(&mut elements, at, count, ncx.config()) {
        Growth::Ok => {}
        Growth::Failed => return Err(VmError::OutOfMemory),
        Growth::WouldBeSparse => return Ok(false),
    }
    if let Some(dense) = elements.dense_mut() {
        let mut holes = false;
        for (offset, slot) in slots.iter().enumerate() {
            match slot {
                Slot::Value(value) => ncx.note_element(value),
                Slot::Hole => holes = true,
            }
            dense.slots_mut().set(at + offset as u32, slot.clone());
        }
        if holes {
            dense.clear_packed();
        }
    }
    if end > elements.length() {
        elements.set_length_raw(end);
    }
    Ok(true)
}

/// New array holding elements `[start, end)` of `obj`, holes preserved
fn copy_range(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    start: u32,
    end: u32,
) -> VmResult<GcRef<JsObject>> {
    let result = new_array(ncx);
    if let Some(window) = dense_window(obj, start, end) {
        if append_slots(ncx, &result, 0, &window)? {
            return Ok(result);
        }
    }
    for k in start..end {
        ncx.check_interrupt()?;
        if let Some(value) = get_element(ncx, obj, k)? {
            create_element(ncx, &result, k - start, value)?;
        }
    }
    elements::set_length(ncx, &result, end - start, true)?;
    Ok(result)
}

// ============================================================================
// push / pop
// ============================================================================

/// `Array.prototype.push(...items)`
pub fn push(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "push")?;
    for value in args {
        ncx.note_element(value);
    }
    if let Some(new_len) = push_dense(ncx, &obj, args)? {
        return Ok(Value::number(new_len as f64));
    }

    let len = length_of(ncx, &obj)?;
    let new_len = grown_length(len, count_of(args)?)?;
    for (offset, value) in args.iter().enumerate() {
        ncx.check_interrupt()?;
        set_element(ncx, &obj, len + offset as u32, value.clone())?;
    }
    set_length_property(ncx, &obj, new_len as f64)?;
    Ok(Value::number(new_len as f64))
}

fn push_dense(ncx: &mut NativeContext, obj: &GcRef<JsObject>, args: &[Value]) -> VmResult<Option<u32>> {
    let Some(lock) = dense_fast_path(obj) else {
        return Ok(None);
    };
    if !obj.is_extensible() {
        return Ok(None);
    }
    let count = count_of(args)?;
    let mut elements = lock.write();
    let len = elements.length();
    let new_len = grown_length(len, count)?;
    match mode::ensure_dense_elements(&mut elements, len, count, ncx.config()) {
        Growth::Ok => {}
        Growth::Failed => return Err(VmError::OutOfMemory),
        Growth::WouldBeSparse => return Ok(None),
    }
    for (offset, value) in args.iter().enumerate() {
        elements.write_dense(len + offset as u32, value.clone());
    }
    Ok(Some(new_len))
}

/// `Array.prototype.pop()`
pub fn pop(ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "pop")?;

    if let Some(lock) = dense_fast_path(&obj) {
        let mut elements = lock.write();
        let len = elements.length();
        if len == 0 {
            return Ok(Value::undefined());
        }
        let index = len - 1;
        let mut value = None;
        if let Some(dense) = elements.dense_mut() {
            if index + 1 == dense.initialized_length() {
                value = dense.slots_mut().set(index, Slot::Hole).as_value().cloned();
                dense.slots_mut().truncate(index);
            }
        }
        elements.set_length_raw(index);
        drop(elements);
        ncx.suppress_deleted_indices(&obj, index, len);
        return Ok(value.unwrap_or_default());
    }

    let len = length_of(ncx, &obj)?;
    if len == 0 {
        set_length_property(ncx, &obj, 0.0)?;
        return Ok(Value::undefined());
    }
    let index = len - 1;
    let value = get_element(ncx, &obj, index)?.unwrap_or_default();
    delete_element(ncx, &obj, index, true)?;
    set_length_property(ncx, &obj, index as f64)?;
    Ok(value)
}

// ============================================================================
// shift / unshift
// ============================================================================

/// `Array.prototype.shift()`
pub fn shift(ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "shift")?;

    // Shifting into a hole creates an element
    if let Some(lock) = dense_fast_path(&obj).filter(|_| obj.is_extensible()) {
        let mut elements = lock.write();
        let len = elements.length();
        if len == 0 {
            return Ok(Value::undefined());
        }
        let mut first = None;
        if let Some(dense) = elements.dense_mut() {
            if dense.initialized_length() > 0 {
                first = dense.get(0).cloned();
                dense.slots_mut().remove_front(1);
            }
        }
        elements.set_length_raw(len - 1);
        drop(elements);
        ncx.suppress_deleted_indices(&obj, len - 1, len);
        return Ok(first.unwrap_or_default());
    }

    let len = length_of(ncx, &obj)?;
    if len == 0 {
        set_length_property(ncx, &obj, 0.0)?;
        return Ok(Value::undefined());
    }
    let first = get_element(ncx, &obj, 0)?.unwrap_or_default();
    for k in 1..len {
        ncx.check_interrupt()?;
        move_element(ncx, &obj, k, k - 1)?;
    }
    delete_element(ncx, &obj, len - 1, true)?;
    set_length_property(ncx, &obj, (len - 1) as f64)?;
    Ok(first)
}

/// `Array.prototype.unshift(...items)`
pub fn unshift(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "unshift")?;
    for value in args {
        ncx.note_element(value);
    }
    if !args.is_empty() {
        if let Some(new_len) = unshift_dense(ncx, &obj, args)? {
            return Ok(Value::number(new_len as f64));
        }
    }

    let len = length_of(ncx, &obj)?;
    let count = count_of(args)?;
    let new_len = grown_length(len, count)?;
    if count > 0 {
        for k in (0..len).rev() {
            ncx.check_interrupt()?;
            move_element(ncx, &obj, k, k + count)?;
        }
        for (offset, value) in args.iter().enumerate() {
            set_element(ncx, &obj, offset as u32, value.clone())?;
        }
    }
    set_length_property(ncx, &obj, new_len as f64)?;
    Ok(Value::number(new_len as f64))
}

fn unshift_dense(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    args: &[Value],
) -> VmResult<Option<u32>> {
    let Some(lock) = dense_fast_path(obj) else {
        return Ok(None);
    };
    if !obj.is_extensible() {
        return Ok(None);
    }
    let count = count_of(args)?;
    let mut elements = lock.write();
    let len = elements.length();
    let new_len = grown_length(len, count)?;
    let initialized = elements.initialized_length();
    match mode::ensure_dense_elements(&mut elements, initialized, count, ncx.config()) {
        Growth::Ok => {}
        Growth::Failed => return Err(VmError::OutOfMemory),
        Growth::WouldBeSparse => return Ok(None),
    }
    if let Some(dense) = elements.dense_mut() {
        dense.slots_mut().move_range(count, 0, initialized);
        for (offset, value) in args.iter().enumerate() {
            dense.slots_mut().set(offset as u32, Slot::Value(value.clone()));
        }
    }
    elements.set_length_raw(new_len);
    Ok(Some(new_len))
}

// ============================================================================
// splice
// ============================================================================

/// `Array.prototype.splice(start, deleteCount, ...items)`
pub fn splice(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "splice")?;
    let len = length_of(ncx, &obj)?;
    let start = relative_index(to_integer(ncx, &arg(args, 0))?, len);
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => to_integer(ncx, &args[1])?.clamp(0.0, (len - start) as f64) as u32,
    };
    let items = args.get(2..).unwrap_or(&[]);
    let item_count = count_of(items)?;
    let new_len = grown_length(len - delete_count, item_count)?;
    for value in items {
        ncx.note_element(value);
    }

    let scope = ncx.root_scope();
    let removed = copy_range(ncx, &obj, start, start + delete_count)?;
    let _removed_root = scope.root(Value::object(removed.clone()));

    let spliced_dense = splice_dense(ncx, &obj, len, start, delete_count, items)?;
    if !spliced_dense {
        if item_count < delete_count {
            for k in start..(len - delete_count) {
                ncx.check_interrupt()?;
                move_element(ncx, &obj, k + delete_count, k + item_count)?;
            }
            for k in (new_len..len).rev() {
                ncx.check_interrupt()?;
                delete_element(ncx, &obj, k, true)?;
            }
        } else if item_count > delete_count {
            for k in (start..(len - delete_count)).rev() {
                ncx.check_interrupt()?;
                move_element(ncx, &obj, k + delete_count, k + item_count)?;
            }
        }
        for (offset, value) in items.iter().enumerate() {
            set_element(ncx, &obj, start + offset as u32, value.clone())?;
        }
        set_length_property(ncx, &obj, new_len as f64)?;
    }
    Ok(Value::object(removed))
}

/// Dense splice: slide the physical tail and write the items in place.
/// Returns false, with nothing changed, when the generic path must run.
fn splice_dense(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    len: u32,
    start: u32,
    delete_count: u32,
    items: &[Value],
) -> VmResult<bool> {
    let Some(lock) = dense_fast_path(obj) else {
        return Ok(false);
    };
    // Items or the slid tail may land on holes
    if !obj.is_extensible() {
        return Ok(false);
    }
    let item_count = count_of(items)?;

    let mut elements = lock.write();
    // A conversion callback may have resized the array since `len` was read
    if elements.length() != len {
        return Ok(false);
    }
    let initialized = elements.initialized_length();
    let tail_start = start + delete_count;
    let tail_count = initialized.saturating_sub(tail_start);
    let new_tail_start = start + item_count;
    let new_initialized = if tail_count > 0 {
        new_tail_start + tail_count
    } else if item_count > 0 {
        new_tail_start
    } else {
        start.min(initialized)
    };

    if new_initialized > initialized {
        match mode::ensure_dense_elements(
            &mut elements,
            initialized,
            new_initialized - initialized,
            ncx.config(),
        ) {
            Growth::Ok => {}
            Growth::Failed => return Err(VmError::OutOfMemory),
            Growth::WouldBeSparse => return Ok(false),
        }
    }
    let new_len = len - delete_count + item_count;
    if let Some(dense) = elements.dense_mut() {
        if start > initialized {
            dense.clear_packed();
        }
        if tail_count > 0 {
            dense.slots_mut().move_range(new_tail_start, tail_start, tail_count);
        }
        for (offset, value) in items.iter().enumerate() {
            dense.slots_mut().set(start + offset as u32, Slot::Value(value.clone()));
        }
        if new_initialized < dense.initialized_length() {
            dense.slots_mut().truncate(new_initialized);
        }
    }
    elements.set_length_raw(new_len);
    drop(elements);

    if new_len < len {
        ncx.suppress_deleted_indices(obj, new_len, len);
    }
    Ok(true)
}

// ============================================================================
// concat / slice
// ============================================================================

/// `Array.prototype.concat(...items)`
///
/// Arrays, including arrays behind a wrapper, are flattened one level with
/// holes preserved; every other value is appended as a single element.
pub fn concat(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "concat")?;
    let scope = ncx.root_scope();
    let result = new_array(ncx);
    let _result_root = scope.root(Value::object(result.clone()));

    let mut length = 0u32;
    let items = std::iter::once(Value::object(obj)).chain(args.iter().cloned());
    for item in items {
        ncx.check_interrupt()?;
        let spread = item
            .as_object_ref()
            .map(JsObject::unwrap)
            .filter(|source| source.is_array())
            .cloned();
        match spread {
            Some(source) => length = concat_spread(ncx, &result, length, &source)?,
            None => {
                ncx.note_element(&item);
                create_element(ncx, &result, length, item)?;
                length = grown_length(length, 1)?;
            }
        }
    }
    elements::set_length(ncx, &result, length, true)?;
    Ok(Value::object(result))
}

fn concat_spread(
    ncx: &mut NativeContext,
    result: &GcRef<JsObject>,
    at: u32,
    source: &GcRef<JsObject>,
) -> VmResult<u32> {
    let len = length_of(ncx, source)?;
    let end = grown_length(at, len)?;
    if let Some(window) = dense_window(source, 0, len) {
        if append_slots(ncx, result, at, &window)? {
            return Ok(end);
        }
    }
    for k in 0..len {
        ncx.check_interrupt()?;
        if let Some(value) = get_element(ncx, source, k)? {
            ncx.note_element(&value);
            create_element(ncx, result, at + k, value)?;
        }
    }
    Ok(end)
}

/// `Array.prototype.slice(start, end)`
pub fn slice(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "slice")?;
    let len = length_of(ncx, &obj)?;
    let start = relative_index(to_integer(ncx, &arg(args, 0))?, len);
    let end = match args.get(1) {
        None | Some(Value::Undefined) => len,
        Some(value) => relative_index(to_integer(ncx, value)?, len),
    };
    let result = copy_range(ncx, &obj, start, end.max(start))?;
    Ok(Value::object(result))
}

// ============================================================================
// reverse
// ============================================================================

/// `Array.prototype.reverse()`
pub fn reverse(ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_object(this, "reverse")?;
    if reverse_dense(ncx, &obj)? {
        return Ok(Value::object(obj));
    }

    let len = length_of(ncx, &obj)?;
    let middle = len / 2;
    for lower in 0..middle {
        ncx.check_interrupt()?;
        let upper = len - lower - 1;
        let lower_value = get_element(ncx, &obj, lower)?;
        let upper_value = get_element(ncx, &obj, upper)?;
        match (lower_value, upper_value) {
            (Some(l), Some(u)) => {
                set_element(ncx, &obj, lower, u)?;
                set_element(ncx, &obj, upper, l)?;
            }
            (None, Some(u)) => {
                set_element(ncx, &obj, lower, u)?;
                delete_element(ncx, &obj, upper, true)?;
            }
            (Some(l), None) => {
                delete_element(ncx, &obj, lower, true)?;
                set_element(ncx, &obj, upper, l)?;
            }
            (None, None) => {}
        }
    }
    Ok(Value::object(obj))
}

fn reverse_dense(ncx: &mut NativeContext, obj: &GcRef<JsObject>) -> VmResult<bool> {
    let Some(lock) = dense_fast_path(obj) else {
        return Ok(false);
    };
    if !obj.is_extensible() {
        return Ok(false);
    }
    let mut elements = lock.write();
    let len = elements.length();
    let initialized = elements.initialized_length();
    if initialized < len {
        match mode::ensure_dense_elements(&mut elements, initialized, len - initialized, ncx.config()) {
            Growth::Ok => {}
            Growth::Failed => return Err(VmError::OutOfMemory),
            Growth::WouldBeSparse => return Ok(false),
        }
    }
    let mut holes = Vec::new();
    if let Some(dense) = elements.dense_mut() {
        if initialized < len {
            dense.clear_packed();
        }
        dense.slots_mut().reverse_prefix(len);
        if !dense.is_packed() {
            holes.extend(
                dense
                    .slots()
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.is_hole())
                    .map(|(i, _)| i as u32),
            );
        }
    }
    drop(elements);

    for index in holes {
        ncx.suppress_deleted_indices(obj, index, index + 1);
    }
    Ok(true)
}
