//! Shared helpers for the array integration tests

#![allow(dead_code)]

use otter_array::array::elements;
use otter_array::{GcRef, JsObject, NativeContext, Value, new_array_from_values};

/// Route engine logs to the test output (`RUST_LOG=otter::array=debug`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh context with logging enabled
pub fn context() -> NativeContext {
    init_tracing();
    NativeContext::new()
}

/// Dense array of numbers
pub fn numbers(ncx: &mut NativeContext, values: &[f64]) -> GcRef<JsObject> {
    new_array_from_values(ncx, values.iter().copied().map(Value::number).collect())
        .expect("array creation")
}

/// Array built from `Some(n)` for present elements and `None` for holes
pub fn with_holes(ncx: &mut NativeContext, values: &[Option<f64>]) -> GcRef<JsObject> {
    let array = numbers(ncx, &[]);
    for (index, value) in values.iter().enumerate() {
        if let Some(n) = value {
            elements::set_element(ncx, &array, index as u32, Value::number(*n)).expect("store");
        }
    }
    elements::set_length(ncx, &array, values.len() as u32, true).expect("length");
    array
}

/// Elements as numbers, `None` for absent ones
pub fn contents(ncx: &mut NativeContext, array: &GcRef<JsObject>) -> Vec<Option<f64>> {
    let len = elements::length_of(ncx, array).expect("length");
    (0..len)
        .map(|i| {
            elements::get_element(ncx, array, i)
                .expect("get")
                .and_then(|v| v.as_number())
        })
        .collect()
}

/// Elements as raw values, `None` for absent ones
pub fn values(ncx: &mut NativeContext, array: &GcRef<JsObject>) -> Vec<Option<Value>> {
    let len = elements::length_of(ncx, array).expect("length");
    (0..len)
        .map(|i| elements::get_element(ncx, array, i).expect("get"))
        .collect()
}

/// Representation invariants of an array's element storage
pub fn assert_invariants(array: &GcRef<JsObject>) {
    let elements = array.array_elements().expect("array").read();
    assert!(elements.invariants_hold(), "invariants broken: {:?}", elements);
    if let Some(dense) = elements.dense() {
        assert!(dense.initialized_length() <= elements.length());
        if dense.is_packed() {
            assert!(!dense.slots().has_holes());
        }
    }
}

/// Whether the array is in dense mode
pub fn is_dense(array: &GcRef<JsObject>) -> bool {
    array.array_elements().expect("array").read().is_dense()
}

/// Unwrap an object result
pub fn object(value: Value) -> GcRef<JsObject> {
    value.as_object().expect("object result")
}
