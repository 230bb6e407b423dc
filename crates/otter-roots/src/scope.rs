//! Root stack and RAII root scopes

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::trace::Trace;

type RootEntry<V> = Arc<dyn Trace<V> + Send + Sync>;

/// Root stack statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootStats {
    /// Scopes opened since creation
    pub scopes_opened: usize,
    /// Entries rooted since creation
    pub entries_rooted: usize,
    /// Deepest the stack has been
    pub peak_depth: usize,
}

struct StackInner<V> {
    entries: Vec<RootEntry<V>>,
    stats: RootStats,
}

/// LIFO registry of rooted temporaries.
///
/// Cloning yields another handle to the same stack.
pub struct RootStack<V> {
    inner: Arc<Mutex<StackInner<V>>>,
}

impl<V> Clone for RootStack<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for RootStack<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RootStack<V> {
    /// Create an empty root stack
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StackInner {
                entries: Vec::new(),
                stats: RootStats::default(),
            })),
        }
    }

    /// Open a new scope; everything rooted through it is released on drop
    pub fn scope(&self) -> RootScope<V> {
        let mut inner = self.inner.lock();
        inner.stats.scopes_opened += 1;
        let base = inner.entries.len();

        #[cfg(feature = "root_logging")]
        tracing::trace!(target: "otter::roots", base, "root scope opened");

        RootScope {
            stack: self.clone(),
            base,
        }
    }

    /// Number of live entries
    pub fn depth(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> RootStats {
        self.inner.lock().stats
    }

    /// Visit every value reachable from a live root.
    ///
    /// The stack lock is released before entries are traced, so tracing may
    /// run while native code holds other engine locks.
    pub fn trace_roots(&self, visit: &mut dyn FnMut(&V)) {
        let entries: Vec<RootEntry<V>> = self.inner.lock().entries.clone();
        for entry in &entries {
            entry.trace(visit);
        }
    }

    fn push(&self, entry: RootEntry<V>) {
        let mut inner = self.inner.lock();
        inner.entries.push(entry);
        inner.stats.entries_rooted += 1;
        inner.stats.peak_depth = inner.stats.peak_depth.max(inner.entries.len());
    }

    fn truncate(&self, base: usize) {
        let released = {
            let mut inner = self.inner.lock();
            debug_assert!(
                inner.entries.len() >= base,
                "root scopes must be released in LIFO order"
            );
            let len = inner.entries.len();
            inner.entries.split_off(base.min(len))
        };

        #[cfg(feature = "root_logging")]
        tracing::trace!(
            target: "otter::roots",
            base,
            released = released.len(),
            "root scope closed"
        );

        // Entries are dropped after the stack lock is released
        drop(released);
    }
}

/// RAII scope over a [`RootStack`]
pub struct RootScope<V> {
    stack: RootStack<V>,
    base: usize,
}

impl<V> RootScope<V> {
    /// Move `value` into a rooted cell and register it for the scope's lifetime
    pub fn root<T>(&self, value: T) -> Rooted<T>
    where
        T: Trace<V> + Send + 'static,
        V: 'static,
    {
        let rooted = Rooted::new(value);
        self.stack.push(rooted.cell.clone());
        rooted
    }

    /// Number of entries this scope has registered so far
    pub fn len(&self) -> usize {
        self.stack.depth().saturating_sub(self.base)
    }

    /// Whether this scope has registered nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Drop for RootScope<V> {
    fn drop(&mut self) {
        self.stack.truncate(self.base);
    }
}

/// A rooted value.
///
/// Access goes through short-lived locks so a collector walking the root
/// stack during a callback always observes a consistent buffer.
pub struct Rooted<T> {
    cell: Arc<Mutex<T>>,
}

impl<T> Rooted<T> {
    /// Wrap a value without registering it anywhere
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(value)),
        }
    }

    /// Lock the value. Never hold the guard across a callback.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.cell.lock()
    }

    /// Run `f` with exclusive access to the value
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.lock())
    }
}

impl<T: Clone> Rooted<T> {
    /// Clone the current value out of the cell
    pub fn snapshot(&self) -> T {
        self.cell.lock().clone()
    }
}
