//! Sort engine tests
//!
//! Ordering of undefined values and holes, stability, comparator re-entry
//! and rooting of the sort buffers.

mod common;

use common::*;
use otter_array::array::{elements, mode, sort};
use otter_array::{ErrorKind, GcRef, JsObject, NativeContext, Value, VmError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn numeric_comparator(ncx: &NativeContext) -> Value {
    ncx.create_function("compare", 2, |_ncx, _this, args| {
        let x = args[0].as_number().unwrap_or(f64::NAN);
        let y = args[1].as_number().unwrap_or(f64::NAN);
        Ok(Value::number(x - y))
    })
}

fn strings(ncx: &mut NativeContext, items: &[&str]) -> GcRef<JsObject> {
    otter_array::new_array_from_values(ncx, items.iter().map(|s| Value::string(*s)).collect())
        .expect("array")
}

fn string_contents(ncx: &mut NativeContext, array: &GcRef<JsObject>) -> Vec<String> {
    values(ncx, array)
        .into_iter()
        .map(|v| v.and_then(|v| v.as_string().map(|s| s.to_string())).unwrap_or_default())
        .collect()
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_default_sort_compares_strings() {
    let mut ncx = context();
    let array = numbers(&mut ncx, &[10.0, 9.0, 1.0, 100.0]);
    sort::sort(&mut ncx, &Value::object(array.clone()), &[]).unwrap();
    assert_eq!(
        contents(&mut ncx, &array),
        vec![Some(1.0), Some(10.0), Some(100.0), Some(9.0)]
    );
}

#[test]
fn test_undefined_then_holes_last() {
    let mut ncx = context();
    let array = otter_array::new_array_from_values(
        &mut ncx,
        vec![
            Value::number(1.0),
            Value::undefined(),
            Value::number(0.0),
            Value::number(2.0),
        ],
    )
    .unwrap();
    elements::delete_element(&mut ncx, &array, 2, true).unwrap();

    sort::sort(&mut ncx, &Value::object(array.clone()), &[]).unwrap();
    assert_eq!(
        values(&mut ncx, &array),
        vec![
            Some(Value::number(1.0)),
            Some(Value::number(2.0)),
            Some(Value::undefined()),
            None
        ]
    );
    assert_eq!(elements::length_of(&mut ncx, &array).unwrap(), 4);
    assert_invariants(&array);
}

#[test]
fn test_slow_array_sort_matches_dense() {
    let mut ncx = context();
    let input = [Some(5.0), None, Some(3.0), Some(9.0), None, Some(1.0)];
    let dense = with_holes(&mut ncx, &input);
    let slow = with_holes(&mut ncx, &input);
    mode::make_slow(&slow).unwrap();

    let compare = numeric_comparator(&ncx);
    for array in [&dense, &slow] {
        sort::sort(&mut ncx, &Value::object(array.clone()), &[compare.clone()]).unwrap();
    }
    let expected = vec![Some(1.0), Some(3.0), Some(5.0), Some(9.0), None, None];
    assert_eq!(contents(&mut ncx, &dense), expected);
    assert_eq!(contents(&mut ncx, &slow), expected);
}

#[test]
fn test_sort_is_stable_and_idempotent() {
    let mut ncx = context();
    let items = ["b1", "a1", "c1", "b2", "a2", "c2", "b3", "a3", "c3", "a4"];
    let array = strings(&mut ncx, &items);
    let by_letter = ncx.create_function("byLetter", 2, |_ncx, _this, args| {
        let x = args[0].as_string().map(|s| s.as_bytes()[0]).unwrap_or(0);
        let y = args[1].as_string().map(|s| s.as_bytes()[0]).unwrap_or(0);
        Ok(Value::number(f64::from(x) - f64::from(y)))
    });

    let this = Value::object(array.clone());
    sort::sort(&mut ncx, &this, &[by_letter.clone()]).unwrap();
    let once = string_contents(&mut ncx, &array);
    assert_eq!(
        once,
        vec!["a1", "a2", "a3", "a4", "b1", "b2", "b3", "c1", "c2", "c3"]
    );

    sort::sort(&mut ncx, &this, &[by_letter]).unwrap();
    assert_eq!(string_contents(&mut ncx, &array), once);
}

#[test]
fn test_inconsistent_comparator_keeps_elements() {
    let mut ncx = context();
    let array = numbers(&mut ncx, &(0..37).map(f64::from).collect::<Vec<_>>());
    let flips = Arc::new(AtomicUsize::new(0));
    let seen = flips.clone();
    let random = ncx.create_function("random", 2, move |_ncx, _this, _args| {
        let n = seen.fetch_add(1, Ordering::Relaxed);
        Ok(Value::number(if n % 3 == 0 { 1.0 } else { -1.0 }))
    });
    sort::sort(&mut ncx, &Value::object(array.clone()), &[random]).unwrap();

    let mut sorted: Vec<f64> = contents(&mut ncx, &array).into_iter().flatten().collect();
    sorted.sort_by(f64::total_cmp);
    assert_eq!(sorted, (0..37).map(f64::from).collect::<Vec<_>>());
}

#[test]
fn test_non_callable_comparator_rejected() {
    let mut ncx = context();
    let array = numbers(&mut ncx, &[2.0, 1.0]);
    let err = sort::sort(&mut ncx, &Value::object(array.clone()), &[Value::number(1.0)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeError);
    assert_eq!(contents(&mut ncx, &array), vec![Some(2.0), Some(1.0)]);
}

// ============================================================================
// Re-entry and rooting
// ============================================================================

#[test]
fn test_comparator_push_survives() {
    let mut ncx = context();
    let array = numbers(&mut ncx, &[3.0, 1.0, 2.0]);
    let target = array.clone();
    let pushed = AtomicBool::new(false);
    let compare = ncx.create_function("compare", 2, move |ncx, _this, args| {
        if !pushed.swap(true, Ordering::Relaxed) {
            ncx.call_method(&Value::object(target.clone()), "push", &[Value::number(99.0)])?;
        }
        let x = args[0].as_number().unwrap_or(0.0);
        let y = args[1].as_number().unwrap_or(0.0);
        Ok(Value::number(x - y))
    });

    sort::sort(&mut ncx, &Value::object(array.clone()), &[compare]).unwrap();
    assert_eq!(
        contents(&mut ncx, &array),
        vec![Some(1.0), Some(2.0), Some(3.0), Some(99.0)]
    );
    assert_invariants(&array);
}

#[test]
fn test_buffers_rooted_during_comparator() {
    let mut ncx = context();
    let array = numbers(&mut ncx, &[4.0, 3.0, 2.0, 1.0, 0.0]);
    let max_traced = Arc::new(AtomicUsize::new(0));
    let seen = max_traced.clone();
    let compare = ncx.create_function("compare", 2, move |ncx, _this, args| {
        let mut traced = 0;
        ncx.roots().trace_roots(&mut |_| traced += 1);
        seen.fetch_max(traced, Ordering::Relaxed);
        let x = args[0].as_number().unwrap_or(0.0);
        let y = args[1].as_number().unwrap_or(0.0);
        Ok(Value::number(x - y))
    });

    sort::sort(&mut ncx, &Value::object(array), &[compare]).unwrap();
    assert!(max_traced.load(Ordering::Relaxed) >= 5);
    assert_eq!(ncx.roots().depth(), 0);
}

#[test]
fn test_throwing_comparator_propagates() {
    let mut ncx = context();
    let array = numbers(&mut ncx, &[3.0, 1.0, 2.0]);
    let compare = ncx.create_function("compare", 2, |_ncx, _this, _args| {
        Err(VmError::exception(Value::string("boom")))
    });

    let err = sort::sort(&mut ncx, &Value::object(array.clone()), &[compare]).unwrap_err();
    assert_eq!(err.thrown_value(), Some(&Value::string("boom")));
    assert_eq!(err.kind(), ErrorKind::CallbackFailure);
    assert_eq!(ncx.roots().depth(), 0);
    assert_eq!(ncx.call_depth(), 0);
    assert_eq!(contents(&mut ncx, &array), vec![Some(3.0), Some(1.0), Some(2.0)]);
}

#[test]
fn test_interrupt_stops_sort() {
    let mut ncx = context();
    let array = numbers(&mut ncx, &(0..200).rev().map(f64::from).collect::<Vec<_>>());
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = polls.clone();
    ncx.set_interrupt_hook(move || seen.fetch_add(1, Ordering::Relaxed) >= 300);

    let compare = numeric_comparator(&ncx);
    let err = sort::sort(&mut ncx, &Value::object(array.clone()), &[compare]).unwrap_err();
    assert!(matches!(err, VmError::Interrupted));
    ncx.clear_interrupt_hook();

    assert_eq!(ncx.roots().depth(), 0);
    assert_eq!(elements::length_of(&mut ncx, &array).unwrap(), 200);
}
