//! Native execution context
//!
//! Everything array code needs from the surrounding runtime: configuration,
//! intrinsics, function calls, interrupt checkpoints, rooting of native
//! temporaries, the cycle-detection busy set, and the registry of live key
//! enumerations whose pending keys must drop deleted indices.

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use otter_roots::{RootScope, RootStack};

use crate::builtins::{Intrinsics, native_function};
use crate::config::EngineConfig;
use crate::error::{VmError, VmResult};
use crate::gc::GcRef;
use crate::object::{JsObject, PropertyKey};
use crate::value::Value;

/// Receives values stored into arrays (type-feedback hook)
pub trait ElementObserver: Send + Sync {
    /// A value was added to an array
    fn element_added(&self, value: &Value);
}

struct EnumerationState {
    object: Weak<JsObject>,
    keys: VecDeque<PropertyKey>,
}

/// A live enumeration of an object's own enumerable keys.
///
/// Keys are snapshotted when the enumeration starts; indices deleted
/// afterwards by array operations are removed before they are produced.
pub struct KeyEnumerator {
    state: Arc<Mutex<EnumerationState>>,
}

impl KeyEnumerator {
    /// Next pending key
    pub fn next_key(&self) -> Option<PropertyKey> {
        self.state.lock().keys.pop_front()
    }

    /// Keys not yet produced
    pub fn remaining(&self) -> usize {
        self.state.lock().keys.len()
    }
}

impl Iterator for KeyEnumerator {
    type Item = PropertyKey;

    fn next(&mut self) -> Option<PropertyKey> {
        self.next_key()
    }
}

type InterruptHook = Box<dyn FnMut() -> bool + Send>;

/// Native execution context
pub struct NativeContext {
    config: EngineConfig,
    intrinsics: Intrinsics,
    roots: RootStack<Value>,
    /// Interrupt flag for timeout/cancellation support
    interrupt_flag: Arc<AtomicBool>,
    /// Polled at every checkpoint; returning true interrupts
    interrupt_hook: Option<InterruptHook>,
    observer: Option<Arc<dyn ElementObserver>>,
    call_depth: usize,
    /// Objects currently being joined or serialized
    busy: FxHashSet<usize>,
    enumerations: Vec<Weak<Mutex<EnumerationState>>>,
}

impl Default for NativeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContext {
    /// Create a context with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a context with a specific configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            intrinsics: Intrinsics::new(),
            roots: RootStack::new(),
            interrupt_flag: Arc::new(AtomicBool::new(false)),
            interrupt_hook: None,
            observer: None,
            call_depth: 0,
            busy: FxHashSet::default(),
            enumerations: Vec::new(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Intrinsic objects
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    // ========================================================================
    // Rooting
    // ========================================================================

    /// Root stack for native temporaries
    pub fn roots(&self) -> &RootStack<Value> {
        &self.roots
    }

    /// Open a root scope; everything rooted through it is released on drop
    pub fn root_scope(&self) -> RootScope<Value> {
        self.roots.scope()
    }

    // ========================================================================
    // Interrupts
    // ========================================================================

    /// Get the interrupt flag (for sharing with a watchdog thread)
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt_flag)
    }

    /// Request interruption at the next checkpoint
    pub fn interrupt(&self) {
        self.interrupt_flag.store(true, Ordering::Release);
    }

    /// Check if interrupted
    pub fn is_interrupted(&self) -> bool {
        self.interrupt_flag.load(Ordering::Acquire)
    }

    /// Clear the interrupt flag
    pub fn clear_interrupt(&self) {
        self.interrupt_flag.store(false, Ordering::Release);
    }

    /// Install a hook polled at every checkpoint
    pub fn set_interrupt_hook(&mut self, hook: impl FnMut() -> bool + Send + 'static) {
        self.interrupt_hook = Some(Box::new(hook));
    }

    /// Remove the checkpoint hook
    pub fn clear_interrupt_hook(&mut self) {
        self.interrupt_hook = None;
    }

    /// Checkpoint for unbounded loops
    #[inline]
    pub fn check_interrupt(&mut self) -> VmResult<()> {
        let hooked = match self.interrupt_hook.as_mut() {
            Some(hook) => hook(),
            None => false,
        };
        if hooked || self.is_interrupted() {
            tracing::debug!(target: "otter::array", hooked, "interrupt checkpoint tripped");
            return Err(VmError::interrupted());
        }
        Ok(())
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a function value
    pub fn call_function(&mut self, func: &Value, this: &Value, args: &[Value]) -> VmResult<Value> {
        let call = match func {
            Value::Object(obj) => JsObject::unwrap(obj)
                .native_function()
                .map(|function| Arc::clone(&function.call)),
            _ => None,
        };
        let Some(call) = call else {
            return Err(VmError::type_error(format!("{:?} is not a function", func)));
        };
        if self.call_depth >= self.config.max_call_depth {
            return Err(VmError::StackOverflow);
        }
        self.call_depth += 1;
        let result = call(self, this, args);
        self.call_depth -= 1;
        result
    }

    /// Look up `name` on `receiver` and call it
    pub fn call_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> VmResult<Value> {
        let obj = receiver
            .as_object()
            .ok_or_else(|| VmError::type_error(format!("cannot read '{name}' of {:?}", receiver)))?;
        let method = obj.get(self, &PropertyKey::string(name))?;
        if !method.is_callable() {
            return Err(VmError::type_error(format!("{name} is not a function")));
        }
        self.call_function(&method, receiver, args)
    }

    /// Current native call nesting
    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// Create a native function object with `Function.prototype`
    pub fn create_function(
        &self,
        name: &str,
        length: u32,
        f: impl Fn(&mut NativeContext, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Value {
        Value::object(native_function(
            Some(self.intrinsics.function_prototype.clone()),
            name,
            length,
            f,
        ))
    }

    // ========================================================================
    // Element observer
    // ========================================================================

    /// Install an element observer
    pub fn set_element_observer(&mut self, observer: Arc<dyn ElementObserver>) {
        self.observer = Some(observer);
    }

    /// Report a value stored into an array
    #[inline]
    pub fn note_element(&self, value: &Value) {
        if let Some(observer) = &self.observer {
            observer.element_added(value);
        }
    }

    // ========================================================================
    // Cycle detection
    // ========================================================================

    /// Mark `obj` busy; false if it already was
    pub fn enter_busy(&mut self, obj: &GcRef<JsObject>) -> bool {
        self.busy.insert(object_id(JsObject::unwrap(obj)))
    }

    /// Release a busy mark
    pub fn leave_busy(&mut self, obj: &GcRef<JsObject>) {
        self.busy.remove(&object_id(JsObject::unwrap(obj)));
    }

    // ========================================================================
    // Key enumeration
    // ========================================================================

    /// Start enumerating the own enumerable keys of `obj`
    pub fn enumerate_own_keys(&mut self, obj: &GcRef<JsObject>) -> KeyEnumerator {
        let target = JsObject::unwrap(obj);
        let keys: VecDeque<PropertyKey> = target
            .own_keys()
            .into_iter()
            .filter(|key| {
                target
                    .get_own_property(key)
                    .is_some_and(|desc| desc.attributes().enumerable)
            })
            .collect();
        let state = Arc::new(Mutex::new(EnumerationState {
            object: Arc::downgrade(target),
            keys,
        }));
        self.enumerations.retain(|weak| weak.strong_count() > 0);
        self.enumerations.push(Arc::downgrade(&state));
        KeyEnumerator { state }
    }

    /// Drop indices in `[start, end)` from every live enumeration of `obj`
    pub fn suppress_deleted_indices(&mut self, obj: &JsObject, start: u32, end: u32) {
        if start >= end || self.enumerations.is_empty() {
            return;
        }
        self.enumerations.retain(|weak| weak.strong_count() > 0);
        for weak in &self.enumerations {
            let Some(state) = weak.upgrade() else {
                continue;
            };
            let mut state = state.lock();
            if std::ptr::eq(state.object.as_ptr(), obj) {
                state
                    .keys
                    .retain(|key| !key.as_index().is_some_and(|i| i >= start && i < end));
            }
        }
    }
}

fn object_id(obj: &JsObject) -> usize {
    obj as *const JsObject as usize
}
