//! GC integration
//!
//! Heap objects are reference counted; native temporaries that must stay
//! visible to a collector while callbacks run are registered on the
//! context's [`otter_roots::RootStack`].

use otter_roots::Trace;
use std::sync::Arc;

use crate::value::Value;

/// Heap reference
pub type GcRef<T> = Arc<T>;

impl Trace<Value> for Value {
    fn trace(&self, visit: &mut dyn FnMut(&Value)) {
        visit(self);
    }
}
