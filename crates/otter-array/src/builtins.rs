//! Intrinsics: `Object.prototype`, `Function.prototype`, `Array` and
//! `Array.prototype`
//!
//! ## Constructor:
//! - `Array(...)`, `Array.isArray()`
//!
//! ## Prototype methods:
//! - toString, toLocaleString, toSource, join, reverse, sort, push, pop,
//!   shift, unshift, splice, concat, slice, indexOf, lastIndexOf, forEach,
//!   map, reduce, reduceRight, filter, some, every

use std::sync::Arc;

use crate::array::{ArrayElements, elements, iteration, mutators, search, sort, text};
use crate::context::NativeContext;
use crate::error::{VmError, VmResult};
use crate::gc::GcRef;
use crate::object::{JsObject, NativeFunction, ObjectKind, PropertyAttributes, PropertyDescriptor, PropertyKey};
use crate::value::Value;

/// Built-in method signature
pub type BuiltinMethod = fn(&mut NativeContext, &Value, &[Value]) -> VmResult<Value>;

const ARRAY_PROTOTYPE_METHODS: &[(&str, u32, BuiltinMethod)] = &[
    ("toString", 0, text::to_string),
    ("toLocaleString", 0, text::to_locale_string),
    ("toSource", 0, text::to_source),
    ("join", 1, text::join),
    ("reverse", 0, mutators::reverse),
    ("sort", 1, sort::sort),
    ("push", 1, mutators::push),
    ("pop", 0, mutators::pop),
    ("shift", 0, mutators::shift),
    ("unshift", 1, mutators::unshift),
    ("splice", 2, mutators::splice),
    ("concat", 1, mutators::concat),
    ("slice", 2, mutators::slice),
    ("indexOf", 1, search::index_of),
    ("lastIndexOf", 1, search::last_index_of),
    ("forEach", 1, iteration::for_each),
    ("map", 1, iteration::map),
    ("reduce", 1, iteration::reduce),
    ("reduceRight", 1, iteration::reduce_right),
    ("filter", 1, iteration::filter),
    ("some", 1, iteration::some),
    ("every", 1, iteration::every),
];

/// Intrinsic objects of a context
pub struct Intrinsics {
    /// `Object.prototype`
    pub object_prototype: GcRef<JsObject>,
    /// `Function.prototype`
    pub function_prototype: GcRef<JsObject>,
    /// `Array.prototype` (an ordinary object)
    pub array_prototype: GcRef<JsObject>,
    /// `Array`
    pub array_constructor: GcRef<JsObject>,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self::new()
    }
}

impl Intrinsics {
    /// Build and wire the intrinsic objects
    pub fn new() -> Self {
        let object_prototype = GcRef::new(JsObject::ordinary(None));
        let function_prototype = GcRef::new(JsObject::ordinary(Some(object_prototype.clone())));
        let array_prototype = GcRef::new(JsObject::ordinary(Some(object_prototype.clone())));

        let method = |name: &str, length: u32, f: BuiltinMethod| {
            Value::object(native_function(Some(function_prototype.clone()), name, length, f))
        };

        object_prototype.define_builtin("toString", method("toString", 0, object_to_string));
        object_prototype.define_builtin(
            "toLocaleString",
            method("toLocaleString", 0, object_to_locale_string),
        );
        object_prototype.define_builtin("valueOf", method("valueOf", 0, object_value_of));

        for (name, length, f) in ARRAY_PROTOTYPE_METHODS {
            array_prototype.define_builtin(name, method(*name, *length, *f));
        }

        let array_constructor = native_function(
            Some(function_prototype.clone()),
            "Array",
            1,
            array_constructor_call as BuiltinMethod,
        );
        array_constructor.define_builtin("isArray", method("isArray", 1, array_is_array));
        array_constructor.insert_property(
            PropertyKey::string("prototype"),
            PropertyDescriptor::data_with_attrs(
                Value::object(array_prototype.clone()),
                PropertyAttributes::frozen(),
            ),
        );
        array_prototype.define_builtin("constructor", Value::object(array_constructor.clone()));

        Self {
            object_prototype,
            function_prototype,
            array_prototype,
            array_constructor,
        }
    }
}

/// Create a native function object
pub fn native_function(
    prototype: Option<GcRef<JsObject>>,
    name: &str,
    length: u32,
    f: impl Fn(&mut NativeContext, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
) -> GcRef<JsObject> {
    GcRef::new(JsObject::function(
        prototype,
        NativeFunction {
            name: Arc::from(name),
            length,
            call: Arc::new(f),
        },
    ))
}

// ============================================================================
// Array creation
// ============================================================================

/// Empty dense array
pub fn new_array(ncx: &NativeContext) -> GcRef<JsObject> {
    new_array_from_elements(ncx, ArrayElements::new())
}

/// Array with `length` set and no storage
pub fn new_array_with_length(ncx: &NativeContext, length: u32) -> GcRef<JsObject> {
    new_array_from_elements(ncx, ArrayElements::with_length(length))
}

/// Dense array holding `values`
pub fn new_array_from_values(ncx: &mut NativeContext, values: Vec<Value>) -> VmResult<GcRef<JsObject>> {
    for value in &values {
        ncx.note_element(value);
    }
    if values.len() < ncx.config().slot_limit as usize {
        return Ok(new_array_from_elements(ncx, ArrayElements::from_values(values)?));
    }

    // Too large for dense storage: let the mode controller place each element
    if values.len() > u32::MAX as usize {
        return Err(VmError::InvalidLength);
    }
    let array = new_array(ncx);
    for (index, value) in values.into_iter().enumerate() {
        ncx.check_interrupt()?;
        elements::define_element(ncx, &array, index as u32, PropertyDescriptor::data(value))?;
    }
    Ok(array)
}

fn new_array_from_elements(ncx: &NativeContext, elements: ArrayElements) -> GcRef<JsObject> {
    GcRef::new(JsObject::array(
        Some(ncx.intrinsics().array_prototype.clone()),
        elements,
    ))
}

/// `Array(...)` / `new Array(...)`
///
/// One numeric argument sets `length` without storage; any other argument
/// list becomes the elements.
pub fn construct_array(ncx: &mut NativeContext, args: &[Value]) -> VmResult<GcRef<JsObject>> {
    match args {
        [] => Ok(new_array(ncx)),
        [Value::Number(n)] => {
            let length = *n as u32;
            if length as f64 != *n {
                return Err(VmError::InvalidLength);
            }
            Ok(new_array_with_length(ncx, length))
        }
        _ => new_array_from_values(ncx, args.to_vec()),
    }
}

/// IsArray: arrays and wrappers around arrays
pub fn is_array(value: &Value) -> bool {
    value
        .as_object_ref()
        .is_some_and(|obj| JsObject::unwrap(obj).is_array())
}

fn array_constructor_call(ncx: &mut NativeContext, _this: &Value, args: &[Value]) -> VmResult<Value> {
    construct_array(ncx, args).map(Value::object)
}

fn array_is_array(_ncx: &mut NativeContext, _this: &Value, args: &[Value]) -> VmResult<Value> {
    Ok(Value::boolean(args.first().is_some_and(is_array)))
}

// ============================================================================
// Object.prototype
// ============================================================================

fn object_to_string(_ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let tag = match this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        Value::Object(obj) => match JsObject::unwrap(obj).kind() {
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            _ => "Object",
        },
        Value::Boolean(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
    };
    Ok(Value::string(format!("[object {tag}]")))
}

fn object_to_locale_string(ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    ncx.call_method(this, "toString", &[])
}

fn object_value_of(_ncx: &mut NativeContext, this: &Value, _args: &[Value]) -> VmResult<Value> {
    Ok(this.clone())
}
