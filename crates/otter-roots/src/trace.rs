//! Tracing interface used when walking roots

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Trait for types that hold values of type `V` the collector must see.
///
/// `V` is the engine's value type; the root crate never inspects it.
pub trait Trace<V> {
    /// Report every reachable `V` to `visit`
    fn trace(&self, visit: &mut dyn FnMut(&V));
}

impl<V, T: Trace<V>> Trace<V> for Vec<T> {
    fn trace(&self, visit: &mut dyn FnMut(&V)) {
        for item in self {
            item.trace(visit);
        }
    }
}

impl<V, T: Trace<V>> Trace<V> for VecDeque<T> {
    fn trace(&self, visit: &mut dyn FnMut(&V)) {
        for item in self {
            item.trace(visit);
        }
    }
}

impl<V, T: Trace<V>> Trace<V> for Option<T> {
    fn trace(&self, visit: &mut dyn FnMut(&V)) {
        if let Some(item) = self {
            item.trace(visit);
        }
    }
}

impl<V, A: Trace<V>, B: Trace<V>> Trace<V> for (A, B) {
    fn trace(&self, visit: &mut dyn FnMut(&V)) {
        self.0.trace(visit);
        self.1.trace(visit);
    }
}

impl<V, T: Trace<V>> Trace<V> for Mutex<T> {
    fn trace(&self, visit: &mut dyn FnMut(&V)) {
        self.lock().trace(visit);
    }
}

impl<V, T: Trace<V>> Trace<V> for Arc<T> {
    fn trace(&self, visit: &mut dyn FnMut(&V)) {
        self.as_ref().trace(visit);
    }
}
