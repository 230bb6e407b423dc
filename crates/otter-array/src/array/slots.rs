//! Slot store: contiguous element storage for dense arrays
//!
//! The store tracks two sizes. `capacity` is the number of slots the array
//! may use without asking the mode controller for growth; the initialized
//! length is the number of leading slots that have been written at least
//! once (holes included). Positions past the initialized length are holes
//! by definition and are never stored.

use otter_roots::Trace;

use crate::error::{VmError, VmResult};
use crate::value::Value;

/// Smallest capacity allocated on first growth
const MIN_CAPACITY: u32 = 8;

/// A storage slot
#[derive(Clone, Debug, Default)]
pub enum Slot {
    /// Never written, or deleted
    #[default]
    Hole,
    /// Present element
    Value(Value),
}

impl Slot {
    /// Check for the hole sentinel
    #[inline]
    pub fn is_hole(&self) -> bool {
        matches!(self, Self::Hole)
    }

    /// Borrow the element, if present
    #[inline]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Hole => None,
        }
    }
}

impl Trace<Value> for Slot {
    fn trace(&self, visit: &mut dyn FnMut(&Value)) {
        if let Self::Value(v) = self {
            visit(v);
        }
    }
}

/// Growable slot vector with a separately tracked capacity
#[derive(Debug, Default)]
pub struct SlotStore {
    slots: Vec<Slot>,
    capacity: u32,
}

impl SlotStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fully initialized store holding `values`
    pub fn from_values(values: Vec<Value>) -> Self {
        let slots: Vec<Slot> = values.into_iter().map(Slot::Value).collect();
        let capacity = slots.len() as u32;
        Self { slots, capacity }
    }

    /// Leading slots written at least once
    #[inline]
    pub fn initialized_length(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Allocated slots
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Slot at `index`, if initialized
    #[inline]
    pub fn get(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)
    }

    /// Element at `index`; `None` for holes and uninitialized positions
    #[inline]
    pub fn value(&self, index: u32) -> Option<&Value> {
        self.get(index).and_then(Slot::as_value)
    }

    /// Initialized slots
    pub fn as_slice(&self) -> &[Slot] {
        &self.slots
    }

    /// Iterate initialized slots
    pub fn iter(&self) -> std::slice::Iter<'_, Slot> {
        self.slots.iter()
    }

    /// Whether any initialized slot is a hole
    pub fn has_holes(&self) -> bool {
        self.slots.iter().any(Slot::is_hole)
    }

    /// Count present elements, stopping once `stop_at` is reached
    pub fn count_values(&self, stop_at: u32) -> u32 {
        let mut count = 0;
        for slot in &self.slots {
            if !slot.is_hole() {
                count += 1;
                if count >= stop_at {
                    break;
                }
            }
        }
        count
    }

    /// Replace an initialized slot, returning the previous content
    pub(crate) fn set(&mut self, index: u32, slot: Slot) -> Slot {
        std::mem::replace(&mut self.slots[index as usize], slot)
    }

    /// Grow capacity to at least `required` (doubling, minimum 8, clamped
    /// to `limit`). Fails without side effects when allocation fails.
    pub(crate) fn grow_capacity(&mut self, required: u32, limit: u32) -> VmResult<()> {
        if required <= self.capacity {
            return Ok(());
        }
        let doubled = if self.capacity < MIN_CAPACITY {
            MIN_CAPACITY
        } else {
            self.capacity.saturating_mul(2)
        };
        let new_capacity = doubled.min(limit).max(required);
        let additional = new_capacity as usize - self.slots.len();
        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| VmError::OutOfMemory)?;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Extend the initialized length to `new_len` with holes
    pub(crate) fn extend_initialized(&mut self, new_len: u32) {
        debug_assert!(new_len <= self.capacity);
        let new_len = new_len as usize;
        if new_len > self.slots.len() {
            self.slots.resize_with(new_len, Slot::default);
        }
    }

    /// Drop initialized slots at and beyond `new_len`
    pub(crate) fn truncate(&mut self, new_len: u32) {
        self.slots.truncate(new_len as usize);
    }

    /// Release spare capacity once less than a quarter of it is initialized,
    /// keeping room for twice the initialized length
    pub(crate) fn shrink_capacity(&mut self) {
        let used = self.initialized_length();
        if self.capacity <= MIN_CAPACITY || used >= self.capacity / 4 {
            return;
        }
        let new_capacity = used.saturating_mul(2).max(MIN_CAPACITY);
        self.capacity = new_capacity;
        self.slots.shrink_to(new_capacity as usize);
    }

    /// Move `count` slots from `src` to `dst` within the initialized range.
    /// Overlapping ranges are handled; vacated source slots become holes.
    pub(crate) fn move_range(&mut self, dst: u32, src: u32, count: u32) {
        let (dst, src, count) = (dst as usize, src as usize, count as usize);
        if dst == src || count == 0 {
            return;
        }
        if dst < src {
            for i in 0..count {
                let slot = std::mem::take(&mut self.slots[src + i]);
                self.slots[dst + i] = slot;
            }
        } else {
            for i in (0..count).rev() {
                let slot = std::mem::take(&mut self.slots[src + i]);
                self.slots[dst + i] = slot;
            }
        }
    }

    /// Remove the first `count` initialized slots, shifting the rest down
    pub(crate) fn remove_front(&mut self, count: u32) {
        let count = (count as usize).min(self.slots.len());
        self.slots.drain(..count);
    }

    /// Reverse the first `len` initialized slots in place
    pub(crate) fn reverse_prefix(&mut self, len: u32) {
        let len = (len as usize).min(self.slots.len());
        self.slots[..len].reverse();
    }
}
