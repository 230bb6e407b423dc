//! Mode controller: dense growth and one-way conversion to slow mode

use crate::array::{ArrayElements, DenseElements, ElementsMode, Slot};
use crate::config::EngineConfig;
use crate::error::{VmError, VmResult};
use crate::object::{JsObject, PropertyDescriptor, PropertyKey, PropertyMap};

/// Outcome of a dense growth request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// Capacity covers the request and the initialized length was extended
    Ok,
    /// The array should convert to slow mode instead
    WouldBeSparse,
    /// Allocation failed; nothing changed
    Failed,
}

/// Would growing to `required` slots leave fewer than a quarter of them
/// occupied, counting `new_elements_hint` elements about to be written?
pub fn will_be_sparse(
    dense: &DenseElements,
    required: u32,
    new_elements_hint: u32,
    config: &EngineConfig,
) -> bool {
    if required <= config.min_sparse_index {
        return false;
    }
    let minimal = required / 4;
    if new_elements_hint >= minimal {
        return false;
    }
    let minimal = minimal - new_elements_hint;
    if minimal > dense.initialized_length() {
        return true;
    }
    dense.slots().count_values(minimal) < minimal
}

/// Make slots `[index, index + extra)` available in dense storage.
///
/// On [`Growth::Ok`] the initialized length covers `index + extra`; newly
/// exposed slots are holes the caller is expected to fill. If a gap was
/// exposed before `index`, the packed bit is cleared.
pub fn ensure_dense_elements(
    elements: &mut ArrayElements,
    index: u32,
    extra: u32,
    config: &EngineConfig,
) -> Growth {
    let Some(dense) = elements.dense_mut() else {
        return Growth::WouldBeSparse;
    };
    let Some(required) = index.checked_add(extra) else {
        return Growth::WouldBeSparse;
    };

    let initialized = dense.initialized_length();
    if required <= initialized {
        return Growth::Ok;
    }

    if required > dense.capacity() {
        if required >= config.slot_limit {
            return Growth::WouldBeSparse;
        }
        if will_be_sparse(dense, required, extra, config) {
            return Growth::WouldBeSparse;
        }
        if dense.slots_mut().grow_capacity(required, config.slot_limit).is_err() {
            tracing::debug!(target: "otter::array", required, "dense growth failed");
            return Growth::Failed;
        }
    }

    if index > initialized {
        dense.clear_packed();
    }
    dense.slots_mut().extend_initialized(required);
    Growth::Ok
}

/// Convert an array to slow mode.
///
/// The new property table is built off to the side (present elements in
/// ascending index order, then existing named properties) and committed in
/// one step. On allocation failure the array is left untouched. Calling
/// this on a slow array or a non-array is a no-op.
pub fn make_slow(obj: &JsObject) -> VmResult<()> {
    let Some(lock) = obj.array_elements() else {
        return Ok(());
    };
    let mut elements = lock.write();
    let (table, present, capacity) = {
        let ElementsMode::Dense(dense) = elements.mode() else {
            return Ok(());
        };
        let properties = obj.properties().read();
        let present = dense.slots().count_values(u32::MAX);

        let mut table = PropertyMap::default();
        table
            .try_reserve(present as usize + properties.len())
            .map_err(|_| VmError::OutOfMemory)?;
        for (index, slot) in dense.slots().iter().enumerate() {
            if let Slot::Value(value) = slot {
                table.insert(
                    PropertyKey::Index(index as u32),
                    PropertyDescriptor::data(value.clone()),
                );
            }
        }
        for (key, desc) in properties.iter() {
            table.insert(key.clone(), desc.clone());
        }
        (table, present, dense.capacity())
    };

    *obj.properties().write() = table;
    *elements.mode_mut() = ElementsMode::Slow;
    if present > 0 {
        obj.mark_indexed();
    }
    let length = elements.length();
    drop(elements);

    tracing::debug!(
        target: "otter::array",
        length,
        capacity,
        elements = present,
        "converted array to slow mode"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::GcRef;
    use crate::value::Value;

    fn dense_with(values: usize) -> ArrayElements {
        ArrayElements::from_values((0..values).map(|i| Value::number(i as f64)).collect()).unwrap()
    }

    #[test]
    fn test_ensure_within_initialized() {
        let mut elements = dense_with(4);
        assert_eq!(ensure_dense_elements(&mut elements, 2, 1, &EngineConfig::default()), Growth::Ok);
        assert_eq!(elements.initialized_length(), 4);
        assert!(elements.is_packed());
    }

    #[test]
    fn test_ensure_gap_clears_packed() {
        let mut elements = dense_with(2);
        let config = EngineConfig::default();
        assert_eq!(ensure_dense_elements(&mut elements, 10, 1, &config), Growth::Ok);
        assert_eq!(elements.initialized_length(), 11);
        assert!(!elements.dense().unwrap().is_packed());
    }

    #[test]
    fn test_far_write_would_be_sparse() {
        let mut elements = dense_with(1);
        let config = EngineConfig::default();
        assert_eq!(
            ensure_dense_elements(&mut elements, 10_000, 1, &config),
            Growth::WouldBeSparse
        );
        assert_eq!(elements.initialized_length(), 1);
    }

    #[test]
    fn test_slot_limit_and_overflow() {
        let config = EngineConfig {
            slot_limit: 64,
            ..EngineConfig::default()
        };
        let mut elements = dense_with(63);
        assert_eq!(ensure_dense_elements(&mut elements, 63, 1, &config), Growth::WouldBeSparse);
        assert_eq!(
            ensure_dense_elements(&mut elements, u32::MAX, 1, &config),
            Growth::WouldBeSparse
        );
    }

    #[test]
    fn test_will_be_sparse_counts_live_slots() {
        let config = EngineConfig::default();
        let full = DenseElements::from_values((0..300).map(|_| Value::null()).collect());
        assert!(!will_be_sparse(&full, 1000, 1, &config));
        let small = DenseElements::from_values(vec![Value::null(); 10]);
        assert!(will_be_sparse(&small, 1000, 1, &config));
        assert!(!will_be_sparse(&small, 200, 1, &config));
    }

    #[test]
    fn test_make_slow_preserves_elements() {
        let obj = GcRef::new(JsObject::array(None, dense_with(3)));
        {
            let mut elements = obj.array_elements().unwrap().write();
            if let Some(dense) = elements.dense_mut() {
                dense.slots_mut().set(1, Slot::Hole);
                dense.clear_packed();
            }
        }
        make_slow(&obj).unwrap();

        let elements = obj.array_elements().unwrap().read();
        assert!(!elements.is_dense());
        assert_eq!(elements.length(), 3);
        drop(elements);
        assert!(obj.has_own_property(&PropertyKey::Index(0)));
        assert!(!obj.has_own_property(&PropertyKey::Index(1)));
        assert!(obj.has_own_property(&PropertyKey::Index(2)));
        assert!(obj.has_indexed_properties());
    }
}
