//! Sort engine
//!
//! A stable bottom-up merge sort: insertion sort over short runs, then
//! pairwise merges of doubling width through one scratch buffer. Both
//! buffers stay rooted for the whole sort, and are only locked briefly so
//! the comparator can run (and re-enter the engine) with no lock held.

use std::cmp::Ordering;

use otter_roots::Rooted;

use crate::array::elements::{
    delete_element, get_element, length_of, prototype_has_indexed_properties, set_element,
};
use crate::array::{ElementsMode, this_object};
use crate::context::NativeContext;
use crate::convert::{compare_utf16, to_number, to_string};
use crate::error::{VmError, VmResult};
use crate::gc::GcRef;
use crate::object::JsObject;
use crate::value::Value;

/// Length of the runs sorted by insertion before merging starts
pub const INSERTION_RUN: usize = 4;

/// Sort `buffer` in place with the "less than or equal" predicate `le`.
///
/// `scratch` is overwritten. On error the buffers hold some permutation of
/// the input.
pub fn merge_sort<T, F>(
    ncx: &mut NativeContext,
    buffer: &Rooted<Vec<T>>,
    scratch: &Rooted<Vec<T>>,
    mut le: F,
) -> VmResult<()>
where
    T: Clone,
    F: FnMut(&mut NativeContext, &T, &T) -> VmResult<bool>,
{
    let n = buffer.lock().len();
    if n < 2 {
        return Ok(());
    }

    for run_start in (0..n).step_by(INSERTION_RUN) {
        let run_end = (run_start + INSERTION_RUN).min(n);
        for i in run_start + 1..run_end {
            let mut j = i;
            while j > run_start {
                ncx.check_interrupt()?;
                let (a, b) = {
                    let items = buffer.lock();
                    (items[j - 1].clone(), items[j].clone())
                };
                if le(ncx, &a, &b)? {
                    break;
                }
                buffer.lock().swap(j - 1, j);
                j -= 1;
            }
        }
    }
    if n <= INSERTION_RUN {
        return Ok(());
    }

    let copy = buffer.snapshot();
    *scratch.lock() = copy;

    let mut width = INSERTION_RUN;
    let mut sorted_in_buffer = true;
    while width < n {
        let (src, dst) = if sorted_in_buffer {
            (buffer, scratch)
        } else {
            (scratch, buffer)
        };
        let mut lo = 0;
        while lo < n {
            let mid = (lo + width).min(n);
            let hi = (lo + 2 * width).min(n);
            merge_runs(ncx, src, dst, lo, mid, hi, &mut le)?;
            lo = hi;
        }
        sorted_in_buffer = !sorted_in_buffer;
        width *= 2;
    }

    if !sorted_in_buffer {
        let sorted = scratch.snapshot();
        *buffer.lock() = sorted;
    }
    Ok(())
}

fn copy_run<T: Clone>(src: &Rooted<Vec<T>>, dst: &Rooted<Vec<T>>, from: usize, to: usize, at: usize) {
    if from >= to {
        return;
    }
    let run: Vec<T> = src.lock()[from..to].to_vec();
    dst.lock()[at..at + run.len()].clone_from_slice(&run);
}

/// Merge `src[lo..mid]` and `src[mid..hi]` into `dst[lo..hi]`; ties take
/// from the left run
fn merge_runs<T, F>(
    ncx: &mut NativeContext,
    src: &Rooted<Vec<T>>,
    dst: &Rooted<Vec<T>>,
    lo: usize,
    mid: usize,
    hi: usize,
    le: &mut F,
) -> VmResult<()>
where
    T: Clone,
    F: FnMut(&mut NativeContext, &T, &T) -> VmResult<bool>,
{
    if mid >= hi {
        copy_run(src, dst, lo, hi, lo);
        return Ok(());
    }

    // Already in order: copy both runs as they are
    let (last_left, first_right) = {
        let items = src.lock();
        (items[mid - 1].clone(), items[mid].clone())
    };
    if le(ncx, &last_left, &first_right)? {
        copy_run(src, dst, lo, hi, lo);
        return Ok(());
    }

    let (mut i, mut j, mut k) = (lo, mid, lo);
    while i < mid && j < hi {
        ncx.check_interrupt()?;
        let (a, b) = {
            let items = src.lock();
            (items[i].clone(), items[j].clone())
        };
        if le(ncx, &a, &b)? {
            dst.lock()[k] = a;
            i += 1;
        } else {
            dst.lock()[k] = b;
            j += 1;
        }
        k += 1;
    }
    copy_run(src, dst, i, mid, k);
    copy_run(src, dst, j, hi, k + (mid - i));
    Ok(())
}

/// Present indices of `obj` in `[start, end)` when they can be listed
/// without touching the prototype chain
fn own_present_indices(obj: &GcRef<JsObject>, start: u32, end: u32) -> Option<Vec<u32>> {
    let target = JsObject::unwrap(obj);
    let lock = target.array_elements()?;
    if prototype_has_indexed_properties(target) {
        return None;
    }
    let elements = lock.read();
    match elements.mode() {
        ElementsMode::Dense(dense) => {
            let end = end.min(dense.initialized_length());
            Some(
                (start..end)
                    .filter(|&i| dense.get(i).is_some())
                    .collect(),
            )
        }
        ElementsMode::Slow => {
            drop(elements);
            Some(target.own_index_keys_in(start, end))
        }
    }
}

fn sort_key(pair: &(Value, Value)) -> &str {
    pair.0.as_string().map_or("", |s| &**s)
}

/// `Array.prototype.sort(comparator)`
///
/// Undefined values sort after every other value and holes after those;
/// `length` never changes.
pub fn sort(ncx: &mut NativeContext, this: &Value, args: &[Value]) -> VmResult<Value> {
    let comparator = args.first().cloned().unwrap_or_default();
    if !comparator.is_undefined() && !comparator.is_callable() {
        return Err(VmError::type_error(
            "The comparison function must be either a function or undefined",
        ));
    }
    let obj = this_object(this, "sort")?;
    let len = length_of(ncx, &obj)?;

    let scope = ncx.root_scope();
    let values = scope.root(Vec::<Value>::new());
    let mut undefined_count = 0u32;

    let indices: Box<dyn Iterator<Item = u32>> = match own_present_indices(&obj, 0, len) {
        Some(indices) => Box::new(indices.into_iter()),
        None => Box::new(0..len),
    };
    for k in indices {
        ncx.check_interrupt()?;
        match get_element(ncx, &obj, k)? {
            None => {}
            Some(Value::Undefined) => undefined_count += 1,
            Some(value) => values.lock().push(value),
        }
    }

    let count = values.lock().len();
    if comparator.is_undefined() {
        let mut keyed = Vec::with_capacity(count);
        for value in values.snapshot() {
            ncx.check_interrupt()?;
            let key = to_string(ncx, &value)?;
            keyed.push((Value::String(key), value));
        }
        let pairs = scope.root(keyed);
        let scratch = scope.root(Vec::<(Value, Value)>::new());
        merge_sort(ncx, &pairs, &scratch, |_, a, b| {
            Ok(compare_utf16(sort_key(a), sort_key(b)) != Ordering::Greater)
        })?;
        let sorted: Vec<Value> = pairs.lock().drain(..).map(|(_, value)| value).collect();
        *values.lock() = sorted;
    } else {
        let scratch = scope.root(Vec::<Value>::new());
        merge_sort(ncx, &values, &scratch, |ncx, a, b| {
            let result = ncx.call_function(&comparator, &Value::undefined(), &[a.clone(), b.clone()])?;
            let n = to_number(ncx, &result)?;
            Ok(n <= 0.0 || n.is_nan())
        })?;
    }

    let mut k = 0u32;
    for value in values.snapshot() {
        ncx.check_interrupt()?;
        set_element(ncx, &obj, k, value)?;
        k += 1;
    }
    for _ in 0..undefined_count {
        ncx.check_interrupt()?;
        set_element(ncx, &obj, k, Value::undefined())?;
        k += 1;
    }

    let tail: Box<dyn Iterator<Item = u32>> = match own_present_indices(&obj, k, len) {
        Some(indices) => Box::new(indices.into_iter().rev()),
        None => Box::new((k..len).rev()),
    };
    let mut deleted = 0u32;
    for index in tail {
        ncx.check_interrupt()?;
        delete_element(ncx, &obj, index, true)?;
        deleted += 1;
    }

    tracing::trace!(
        target: "otter::array",
        len,
        values = count,
        undefineds = undefined_count,
        deleted,
        custom = comparator.is_callable(),
        "sorted array"
    );
    Ok(Value::object(obj))
}
