//! Array value engine
//!
//! An array keeps its elements in one of two representations:
//!
//! - **Dense**: a [`SlotStore`] of tagged slots with a capacity, an
//!   initialized length and a `packed` bit
//! - **Slow**: every element is an ordinary own property keyed by its index
//!
//! Conversion is one way (dense to slow) and happens lazily, only when a
//! mutation demands it (see [`mode`]). `length` is tracked separately from
//! either representation.

pub mod elements;
pub mod iteration;
pub mod mode;
pub mod mutators;
pub mod search;
pub mod slots;
pub mod sort;
pub mod text;

pub use slots::{Slot, SlotStore};

use crate::error::{VmError, VmResult};
use crate::gc::GcRef;
use crate::object::JsObject;
use crate::value::Value;

/// Element representation
#[derive(Debug)]
pub enum ElementsMode {
    /// Contiguous slot storage
    Dense(DenseElements),
    /// Elements live in the object's property table
    Slow,
}

/// Dense storage plus its packedness bit
#[derive(Debug, Default)]
pub struct DenseElements {
    slots: SlotStore,
    /// No hole in `[0, initialized_length)`. Cleared when a hole may have
    /// been introduced; only set again by [`DenseElements::recompute_packed`].
    packed: bool,
}

impl DenseElements {
    /// Empty storage
    pub fn new() -> Self {
        Self {
            slots: SlotStore::new(),
            packed: true,
        }
    }

    /// Fully initialized storage
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            slots: SlotStore::from_values(values),
            packed: true,
        }
    }

    /// Slot storage
    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut SlotStore {
        &mut self.slots
    }

    /// Element at `index`, `None` for holes
    #[inline]
    pub fn get(&self, index: u32) -> Option<&Value> {
        self.slots.value(index)
    }

    /// Leading slots written at least once
    #[inline]
    pub fn initialized_length(&self) -> u32 {
        self.slots.initialized_length()
    }

    /// Allocated slots
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.slots.capacity()
    }

    /// The packed bit
    #[inline]
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub(crate) fn clear_packed(&mut self) {
        self.packed = false;
    }

    /// Rescan the initialized range and set the packed bit accordingly
    pub fn recompute_packed(&mut self) -> bool {
        self.packed = !self.slots.has_holes();
        self.packed
    }
}

/// Array element state: `length` plus the current representation
#[derive(Debug)]
pub struct ArrayElements {
    length: u32,
    mode: ElementsMode,
}

impl Default for ArrayElements {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayElements {
    /// Empty dense array
    pub fn new() -> Self {
        Self {
            length: 0,
            mode: ElementsMode::Dense(DenseElements::new()),
        }
    }

    /// Dense array with `length` set and no storage
    pub fn with_length(length: u32) -> Self {
        Self {
            length,
            mode: ElementsMode::Dense(DenseElements::new()),
        }
    }

    /// Dense, fully initialized array
    pub fn from_values(values: Vec<Value>) -> VmResult<Self> {
        let length = u32::try_from(values.len()).map_err(|_| VmError::InvalidLength)?;
        Ok(Self {
            length,
            mode: ElementsMode::Dense(DenseElements::from_values(values)),
        })
    }

    /// ECMA `length`
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    pub(crate) fn set_length_raw(&mut self, length: u32) {
        self.length = length;
    }

    /// Current representation
    pub fn mode(&self) -> &ElementsMode {
        &self.mode
    }

    pub(crate) fn mode_mut(&mut self) -> &mut ElementsMode {
        &mut self.mode
    }

    /// Dense storage, if dense
    pub fn dense(&self) -> Option<&DenseElements> {
        match &self.mode {
            ElementsMode::Dense(dense) => Some(dense),
            ElementsMode::Slow => None,
        }
    }

    pub(crate) fn dense_mut(&mut self) -> Option<&mut DenseElements> {
        match &mut self.mode {
            ElementsMode::Dense(dense) => Some(dense),
            ElementsMode::Slow => None,
        }
    }

    /// Is the array in dense mode
    pub fn is_dense(&self) -> bool {
        matches!(self.mode, ElementsMode::Dense(_))
    }

    /// Dense, packed, and fully initialized up to `length`: no hole anywhere
    pub fn is_packed(&self) -> bool {
        self.dense()
            .is_some_and(|dense| dense.is_packed() && dense.initialized_length() == self.length)
    }

    /// Allocated slots (0 when slow)
    pub fn capacity(&self) -> u32 {
        self.dense().map_or(0, DenseElements::capacity)
    }

    /// Initialized slots (0 when slow)
    pub fn initialized_length(&self) -> u32 {
        self.dense().map_or(0, DenseElements::initialized_length)
    }

    /// Store a value into a dense slot made available by
    /// [`mode::ensure_dense_elements`], bumping `length` past it
    pub(crate) fn write_dense(&mut self, index: u32, value: Value) {
        if let ElementsMode::Dense(dense) = &mut self.mode {
            dense.slots.set(index, Slot::Value(value));
        }
        if index >= self.length {
            self.length = index + 1;
        }
    }

    /// Structural invariants of the representation
    pub fn invariants_hold(&self) -> bool {
        match &self.mode {
            ElementsMode::Dense(dense) => {
                let init = dense.initialized_length();
                init <= dense.capacity()
                    && init <= self.length
                    && (!dense.is_packed() || !dense.slots.has_holes())
            }
            ElementsMode::Slow => true,
        }
    }
}

/// Coerce `this` to an object, failing for primitives
pub(crate) fn this_object(this: &Value, method: &str) -> VmResult<GcRef<JsObject>> {
    this.as_object().ok_or_else(|| {
        VmError::type_error(format!("Array.prototype.{method} called on non-object"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_only_array() {
        let elements = ArrayElements::with_length(5);
        assert_eq!(elements.length(), 5);
        assert_eq!(elements.initialized_length(), 0);
        assert_eq!(elements.capacity(), 0);
        assert!(!elements.is_packed());
        assert!(elements.invariants_hold());
    }

    #[test]
    fn test_from_values_is_packed() {
        let elements =
            ArrayElements::from_values(vec![Value::number(1.0), Value::number(2.0)]).unwrap();
        assert!(elements.is_packed());
        assert_eq!(elements.initialized_length(), 2);
        assert!(elements.invariants_hold());
    }

    #[test]
    fn test_recompute_packed() {
        let mut dense = DenseElements::from_values(vec![Value::null()]);
        dense.slots_mut().set(0, Slot::Hole);
        dense.clear_packed();
        dense.slots_mut().set(0, Slot::Value(Value::null()));
        assert!(!dense.is_packed());
        assert!(dense.recompute_packed());
    }
}
