//! Element accessor: get/set/define/delete over both representations and
//! the `length` setter

use parking_lot::RwLock;

use crate::array::mode::{self, Growth};
use crate::array::{ArrayElements, Slot};
use crate::context::NativeContext;
use crate::convert;
use crate::error::{VmError, VmResult};
use crate::gc::GcRef;
use crate::object::{JsObject, ObjectKind, PropertyAttributes, PropertyDescriptor, PropertyKey};
use crate::value::Value;

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed, or was absent
    Deleted,
    /// A non-configurable property refused
    NotConfigurable,
}

/// True if any prototype is an array, a wrapper, or an object whose
/// property table has ever held an index key. A setter or element found
/// there could be shadowed by a dense fast path.
pub fn prototype_has_indexed_properties(obj: &JsObject) -> bool {
    let mut current = obj.prototype();
    while let Some(proto) = current {
        if matches!(proto.kind(), ObjectKind::Array(_) | ObjectKind::Wrapper(_))
            || proto.has_indexed_properties()
        {
            return true;
        }
        current = proto.prototype();
    }
    false
}

/// Element storage of `obj` when it is a dense array whose prototype chain
/// has no indexed properties: the precondition of every dense fast path
pub(crate) fn dense_fast_path(obj: &JsObject) -> Option<&RwLock<ArrayElements>> {
    let lock = obj.array_elements()?;
    if !lock.read().is_dense() || prototype_has_indexed_properties(obj) {
        return None;
    }
    Some(lock)
}

/// Read element `index`; `None` when no object on the chain has it.
pub fn get_element(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    index: u32,
) -> VmResult<Option<Value>> {
    if let Some(lock) = JsObject::unwrap(obj).array_elements() {
        if let Some(value) = lock.read().dense().and_then(|dense| dense.get(index)) {
            return Ok(Some(value.clone()));
        }
    }
    obj.get_property(ncx, &PropertyKey::index(index))
}

/// Write element `index`, failing with a `TypeError` if the assignment is
/// refused
pub fn set_element(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    index: u32,
    value: Value,
) -> VmResult<()> {
    if obj.set(ncx, PropertyKey::index(index), value)? {
        Ok(())
    } else {
        Err(VmError::type_error(format!(
            "Cannot assign to read only property '{index}'"
        )))
    }
}

/// CreateDataPropertyOrThrow for an index
pub fn create_element(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    index: u32,
    value: Value,
) -> VmResult<()> {
    if obj.define_own_property(ncx, PropertyKey::index(index), PropertyDescriptor::data(value))? {
        Ok(())
    } else {
        Err(VmError::type_error(format!("Cannot define property '{index}'")))
    }
}

/// [[Set]] of an index on an array: dense fast path, else generic
pub(crate) fn set_element_internal(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    index: u32,
    value: Value,
) -> VmResult<bool> {
    if let Some(lock) = dense_fast_path(obj) {
        let mut elements = lock.write();
        let present = elements.dense().is_some_and(|dense| dense.get(index).is_some());
        if present || obj.is_extensible() {
            match mode::ensure_dense_elements(&mut elements, index, 1, ncx.config()) {
                Growth::Ok => {
                    elements.write_dense(index, value);
                    return Ok(true);
                }
                Growth::Failed => return Err(VmError::OutOfMemory),
                Growth::WouldBeSparse => {
                    drop(elements);
                    mode::make_slow(obj)?;
                }
            }
        }
    }
    obj.ordinary_set(ncx, PropertyKey::index(index), value)
}

/// Define element `index`. Default-attribute data definitions stay dense;
/// anything else converts the array to slow mode first.
pub fn define_element(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    index: u32,
    desc: PropertyDescriptor,
) -> VmResult<bool> {
    let obj = JsObject::unwrap(obj);
    let Some(lock) = obj.array_elements() else {
        return Ok(obj.ordinary_define(PropertyKey::index(index), desc));
    };

    if let Some(value) = desc.value().filter(|_| desc.is_default_data()) {
        let mut elements = lock.write();
        if elements.is_dense() {
            let present = elements.dense().is_some_and(|dense| dense.get(index).is_some());
            if !present && !obj.is_extensible() {
                return Ok(false);
            }
            match mode::ensure_dense_elements(&mut elements, index, 1, ncx.config()) {
                Growth::Ok => {
                    elements.write_dense(index, value.clone());
                    return Ok(true);
                }
                Growth::Failed => return Err(VmError::OutOfMemory),
                Growth::WouldBeSparse => {}
            }
        }
    }

    mode::make_slow(obj)?;
    let key = PropertyKey::index(index);
    if key.as_index().is_none() {
        return Ok(obj.ordinary_define(key, desc));
    }
    let length = lock.read().length();
    if !obj.ordinary_define(key, desc) {
        return Ok(false);
    }
    if index >= length {
        lock.write().set_length_raw(index + 1);
    }
    Ok(true)
}

/// [[DefineOwnProperty]] of `length` on an array
pub(crate) fn define_length(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    desc: PropertyDescriptor,
) -> VmResult<bool> {
    let PropertyDescriptor::Data { value, attributes } = desc else {
        return Err(VmError::type_error("Cannot redefine array length as an accessor"));
    };
    if attributes != PropertyAttributes::array_length() {
        return Err(VmError::type_error("Cannot redefine array length attributes"));
    }
    let new_len = convert::to_array_length(ncx, &value)?;
    set_length(ncx, obj, new_len, false)
}

/// Delete element `index`.
///
/// Dense arrays turn the slot into a hole; nothing shifts and `length` is
/// unchanged. Elsewhere the property is removed unless non-configurable,
/// which surfaces as `NotConfigurable` in strict mode.
pub fn delete_element(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    index: u32,
    strict: bool,
) -> VmResult<DeleteOutcome> {
    let obj = JsObject::unwrap(obj);
    let key = PropertyKey::index(index);

    let handled_dense = match obj.array_elements() {
        Some(lock) => {
            let mut elements = lock.write();
            match elements.dense_mut() {
                Some(dense) => {
                    if index < dense.initialized_length() {
                        if !dense.slots().get(index).is_some_and(Slot::is_hole) {
                            dense.clear_packed();
                        }
                        dense.slots_mut().set(index, Slot::Hole);
                    }
                    true
                }
                None => false,
            }
        }
        None => false,
    };

    let outcome = if handled_dense || obj.delete_own(&key) {
        DeleteOutcome::Deleted
    } else {
        DeleteOutcome::NotConfigurable
    };

    match outcome {
        DeleteOutcome::Deleted => {
            if key.as_index().is_some() {
                ncx.suppress_deleted_indices(obj, index, index + 1);
            }
            Ok(outcome)
        }
        DeleteOutcome::NotConfigurable if strict => Err(VmError::not_configurable(key)),
        DeleteOutcome::NotConfigurable => Ok(outcome),
    }
}

/// Set an array's `length`.
///
/// Growing is a numeric update. Shrinking a dense array truncates storage
/// directly. Shrinking a slow array deletes every index in
/// `[new_len, old_len)` from the top down; a refusal or interrupt stops
/// the walk and leaves `length` one past the highest index still present.
/// Non-strict refusals return `Ok(false)`.
pub fn set_length(
    ncx: &mut NativeContext,
    obj: &GcRef<JsObject>,
    new_len: u32,
    strict: bool,
) -> VmResult<bool> {
    let obj = JsObject::unwrap(obj);
    let Some(lock) = obj.array_elements() else {
        return Err(VmError::internal("set_length on a non-array"));
    };

    let old_len = {
        let mut elements = lock.write();
        let old_len = elements.length();
        if new_len >= old_len {
            elements.set_length_raw(new_len);
            return Ok(true);
        }
        if let Some(dense) = elements.dense_mut() {
            dense.slots_mut().truncate(new_len);
            dense.slots_mut().shrink_capacity();
            elements.set_length_raw(new_len);
            drop(elements);
            ncx.suppress_deleted_indices(obj, new_len, old_len);
            return Ok(true);
        }
        old_len
    };

    let gap = old_len - new_len;
    let enumerate = gap >= ncx.config().shrink_enumeration_gap;
    tracing::debug!(
        target: "otter::array",
        old_len,
        new_len,
        strategy = if enumerate { "enumerate" } else { "walk" },
        "shrinking slow array"
    );

    let (floor, result) = if enumerate {
        shrink_by_enumeration(ncx, obj, new_len, old_len, strict)
    } else {
        shrink_by_walking(ncx, obj, new_len, old_len, strict)
    };
    lock.write().set_length_raw(floor);
    ncx.suppress_deleted_indices(obj, floor, old_len);
    result
}

fn refusal(index: u32, strict: bool) -> VmResult<bool> {
    if strict {
        Err(VmError::not_configurable(PropertyKey::Index(index)))
    } else {
        Ok(false)
    }
}

/// Walk `old_len - 1` down to `new_len`
fn shrink_by_walking(
    ncx: &mut NativeContext,
    obj: &JsObject,
    new_len: u32,
    old_len: u32,
    strict: bool,
) -> (u32, VmResult<bool>) {
    let mut floor = old_len;
    while floor > new_len {
        if let Err(err) = ncx.check_interrupt() {
            return (floor, Err(err));
        }
        let index = floor - 1;
        if !obj.delete_own(&PropertyKey::Index(index)) {
            return (floor, refusal(index, strict));
        }
        floor = index;
    }
    (floor, Ok(true))
}

/// Enumerate the present indices in `[new_len, old_len)` once and delete
/// them from the highest down
fn shrink_by_enumeration(
    ncx: &mut NativeContext,
    obj: &JsObject,
    new_len: u32,
    old_len: u32,
    strict: bool,
) -> (u32, VmResult<bool>) {
    for index in obj.own_index_keys_in(new_len, old_len).into_iter().rev() {
        if let Err(err) = ncx.check_interrupt() {
            return (index + 1, Err(err));
        }
        if !obj.delete_own(&PropertyKey::Index(index)) {
            return (index + 1, refusal(index, strict));
        }
    }
    (new_len, Ok(true))
}

/// `length` of any object, as uint32
pub fn length_of(ncx: &mut NativeContext, obj: &GcRef<JsObject>) -> VmResult<u32> {
    if let Some(lock) = JsObject::unwrap(obj).array_elements() {
        return Ok(lock.read().length());
    }
    let value = obj.get(ncx, &PropertyKey::length())?;
    Ok(convert::to_uint32(convert::to_number(ncx, &value)?))
}

/// Assign `length` on any object, failing with a `TypeError` if refused
pub fn set_length_property(ncx: &mut NativeContext, obj: &GcRef<JsObject>, len: f64) -> VmResult<()> {
    if obj.set(ncx, PropertyKey::length(), Value::number(len))? {
        Ok(())
    } else {
        Err(VmError::type_error("Cannot assign to read only property 'length'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{new_array, new_array_from_values};

    fn numbers(ncx: &mut NativeContext, values: &[f64]) -> GcRef<JsObject> {
        new_array_from_values(ncx, values.iter().copied().map(Value::number).collect()).unwrap()
    }

    fn element(ncx: &mut NativeContext, obj: &GcRef<JsObject>, index: u32) -> Option<f64> {
        get_element(ncx, obj, index).unwrap().and_then(|v| v.as_number())
    }

    #[test]
    fn test_set_extends_length() {
        let mut ncx = NativeContext::new();
        let array = new_array(&ncx);
        set_element(&mut ncx, &array, 0, Value::number(1.0)).unwrap();
        set_element(&mut ncx, &array, 3, Value::number(4.0)).unwrap();

        let elements = array.array_elements().unwrap().read();
        assert_eq!(elements.length(), 4);
        assert!(elements.is_dense());
        assert!(!elements.is_packed());
        assert!(elements.invariants_hold());
        drop(elements);
        assert_eq!(element(&mut ncx, &array, 2), None);
        assert_eq!(element(&mut ncx, &array, 3), Some(4.0));
    }

    #[test]
    fn test_far_write_converts_to_slow() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0, 2.0]);
        set_element(&mut ncx, &array, 100_000, Value::number(9.0)).unwrap();

        let elements = array.array_elements().unwrap().read();
        assert!(!elements.is_dense());
        assert_eq!(elements.length(), 100_001);
        drop(elements);
        assert_eq!(element(&mut ncx, &array, 0), Some(1.0));
        assert_eq!(element(&mut ncx, &array, 100_000), Some(9.0));
        assert_eq!(element(&mut ncx, &array, 50), None);
    }

    #[test]
    fn test_named_property_converts_to_slow() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0, 2.0]);
        array.set(&mut ncx, "tag".into(), Value::boolean(true)).unwrap();

        assert!(!array.array_elements().unwrap().read().is_dense());
        assert_eq!(element(&mut ncx, &array, 1), Some(2.0));
        assert_eq!(length_of(&mut ncx, &array).unwrap(), 2);
    }

    #[test]
    fn test_non_default_attributes_convert() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0]);
        let readonly = PropertyAttributes {
            writable: false,
            ..PropertyAttributes::data()
        };
        assert!(define_element(
            &mut ncx,
            &array,
            3,
            PropertyDescriptor::data_with_attrs(Value::number(4.0), readonly)
        )
        .unwrap());

        assert!(!array.array_elements().unwrap().read().is_dense());
        assert_eq!(length_of(&mut ncx, &array).unwrap(), 4);
        assert!(set_element(&mut ncx, &array, 3, Value::number(5.0)).is_err());
    }

    #[test]
    fn test_delete_makes_hole() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0, 2.0, 3.0]);
        assert_eq!(
            delete_element(&mut ncx, &array, 1, true).unwrap(),
            DeleteOutcome::Deleted
        );

        let elements = array.array_elements().unwrap().read();
        assert_eq!(elements.length(), 3);
        assert!(elements.is_dense());
        assert!(!elements.is_packed());
        drop(elements);
        assert_eq!(element(&mut ncx, &array, 1), None);
    }

    #[test]
    fn test_delete_non_configurable() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0]);
        define_element(
            &mut ncx,
            &array,
            0,
            PropertyDescriptor::data_with_attrs(Value::number(1.0), PropertyAttributes::frozen()),
        )
        .unwrap();

        assert_eq!(
            delete_element(&mut ncx, &array, 0, false).unwrap(),
            DeleteOutcome::NotConfigurable
        );
        assert!(matches!(
            delete_element(&mut ncx, &array, 0, true),
            Err(VmError::NotConfigurable { .. })
        ));
    }

    #[test]
    fn test_dense_shrink_truncates() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0, 2.0, 3.0, 4.0]);
        assert!(set_length(&mut ncx, &array, 1, true).unwrap());

        let elements = array.array_elements().unwrap().read();
        assert_eq!(elements.length(), 1);
        assert_eq!(elements.initialized_length(), 1);
        assert_eq!(elements.capacity(), 4);
        drop(elements);

        set_length(&mut ncx, &array, 3, true).unwrap();
        assert_eq!(element(&mut ncx, &array, 1), None);
    }

    #[test]
    fn test_slow_shrink_stops_at_non_configurable() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        define_element(
            &mut ncx,
            &array,
            2,
            PropertyDescriptor::data_with_attrs(Value::number(2.0), PropertyAttributes::frozen()),
        )
        .unwrap();

        assert!(!set_length(&mut ncx, &array, 0, false).unwrap());
        assert_eq!(length_of(&mut ncx, &array).unwrap(), 3);
        assert_eq!(element(&mut ncx, &array, 3), None);
        assert_eq!(element(&mut ncx, &array, 1), Some(1.0));

        assert!(matches!(
            set_length(&mut ncx, &array, 0, true),
            Err(VmError::NotConfigurable { .. })
        ));
    }

    #[test]
    fn test_large_gap_shrink_enumerates() {
        let mut ncx = NativeContext::with_config(crate::config::EngineConfig {
            shrink_enumeration_gap: 4,
            ..Default::default()
        });
        let array = new_array(&ncx);
        for index in [0, 10, 500, 9_000] {
            set_element(&mut ncx, &array, index, Value::number(index as f64)).unwrap();
        }
        assert!(!array.array_elements().unwrap().read().is_dense());

        assert!(set_length(&mut ncx, &array, 11, true).unwrap());
        assert_eq!(length_of(&mut ncx, &array).unwrap(), 11);
        assert_eq!(element(&mut ncx, &array, 10), Some(10.0));
        assert!(!array.has_own_property(&PropertyKey::Index(500)));
        assert!(!array.has_own_property(&PropertyKey::Index(9_000)));
    }

    #[test]
    fn test_length_assignment_validates() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0]);
        let err = array
            .set(&mut ncx, PropertyKey::length(), Value::number(-1.0))
            .unwrap_err();
        assert!(matches!(err, VmError::InvalidLength));
        assert!(array.set(&mut ncx, PropertyKey::length(), Value::number(0.0)).unwrap());
        assert_eq!(length_of(&mut ncx, &array).unwrap(), 0);
    }

    #[test]
    fn test_inherited_indexed_setter_blocks_fast_path() {
        let mut ncx = NativeContext::new();
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = hits.clone();
        let setter = ncx.create_function("set0", 1, move |_ncx, _this, _args| {
            seen.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            Ok(Value::undefined())
        });
        let proto = GcRef::new(JsObject::ordinary(None));
        proto
            .define_own_property(
                &mut ncx,
                PropertyKey::Index(0),
                PropertyDescriptor::accessor(None, Some(setter), PropertyAttributes::data()),
            )
            .unwrap();
        let array = new_array(&ncx);
        array.set_prototype(Some(proto));

        assert!(prototype_has_indexed_properties(&array));
        set_element(&mut ncx, &array, 0, Value::number(1.0)).unwrap();
        assert_eq!(hits.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert!(!array.has_own_property(&PropertyKey::Index(0)));
    }

    #[test]
    fn test_length_inherited_from_array_prototype() {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, &[1.0, 2.0]);
        let child = GcRef::new(JsObject::ordinary(Some(array.clone())));
        assert_eq!(length_of(&mut ncx, &child).unwrap(), 2);

        child.set(&mut ncx, PropertyKey::length(), Value::number(7.0)).unwrap();
        assert_eq!(length_of(&mut ncx, &child).unwrap(), 7);
        assert_eq!(length_of(&mut ncx, &array).unwrap(), 2);
    }
}
