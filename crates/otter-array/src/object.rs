//! Objects, property keys and descriptors
//!
//! A minimal ordinary-object model: an insertion-ordered property table, a
//! mutable prototype link, data and native accessor properties, and
//! transparent wrappers that forward every operation to their target.
//! Array objects keep their elements in [`ArrayElements`]; index keys and
//! `length` on an array are routed to the element accessor.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::array::{ArrayElements, ElementsMode, elements, mode};
use crate::context::NativeContext;
use crate::error::VmResult;
use crate::gc::GcRef;
use crate::value::{NativeFn, Value};

/// Property table, kept in insertion order
pub type PropertyMap = IndexMap<PropertyKey, PropertyDescriptor, FxBuildHasher>;

/// Property key
///
/// Strings that are canonical array indices (`"0"`..=`"4294967294"`) are
/// always normalised to [`PropertyKey::Index`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(Arc<str>),
    /// Integer index (for arrays)
    Index(u32),
}

impl PropertyKey {
    /// Create a string property key, canonicalising array indices
    pub fn string(s: &str) -> Self {
        match parse_array_index(s) {
            Some(index) => Self::Index(index),
            None => Self::String(Arc::from(s)),
        }
    }

    /// Create an index property key
    ///
    /// `u32::MAX` is not an array index and becomes a string key.
    pub fn index(i: u32) -> Self {
        if i == u32::MAX {
            Self::String(Arc::from(itoa::Buffer::new().format(i)))
        } else {
            Self::Index(i)
        }
    }

    /// The `length` key
    pub fn length() -> Self {
        Self::String(Arc::from("length"))
    }

    /// Array index, if this is one
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            Self::String(_) => None,
        }
    }

    /// Is this the `length` key
    pub fn is_length(&self) -> bool {
        matches!(self, Self::String(s) if &**s == "length")
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Index(i) => f.write_str(itoa::Buffer::new().format(*i)),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::index(i)
    }
}

fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let value: u64 = s.parse().ok()?;
    if value < u32::MAX as u64 {
        Some(value as u32)
    } else {
        None
    }
}

/// Property attributes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropertyAttributes {
    /// Property is writable
    pub writable: bool,
    /// Property is enumerable
    pub enumerable: bool,
    /// Property is configurable
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default data property attributes
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Built-in method attributes (non-enumerable)
    pub const fn builtin_method() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// Attributes of an array's `length`
    pub const fn array_length() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: false,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }
}

/// Property descriptor
#[derive(Clone, Debug)]
pub enum PropertyDescriptor {
    /// Data property
    Data {
        /// The value
        value: Value,
        /// Attributes
        attributes: PropertyAttributes,
    },
    /// Accessor property
    Accessor {
        /// Getter function
        get: Option<Value>,
        /// Setter function
        set: Option<Value>,
        /// Attributes
        attributes: PropertyAttributes,
    },
}

impl PropertyDescriptor {
    /// Create a data property
    pub fn data(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::data(),
        }
    }

    /// Create a data property with specific attributes
    pub fn data_with_attrs(value: Value, attributes: PropertyAttributes) -> Self {
        Self::Data { value, attributes }
    }

    /// Create an accessor property
    pub fn accessor(get: Option<Value>, set: Option<Value>, attributes: PropertyAttributes) -> Self {
        Self::Accessor {
            get,
            set,
            attributes,
        }
    }

    /// Create a built-in method property
    pub fn builtin_method(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::builtin_method(),
        }
    }

    /// Get the value (for data properties)
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    /// Attributes of either kind
    pub fn attributes(&self) -> PropertyAttributes {
        match self {
            Self::Data { attributes, .. } | Self::Accessor { attributes, .. } => *attributes,
        }
    }

    /// A data property with the default writable/enumerable/configurable set
    pub fn is_default_data(&self) -> bool {
        matches!(self, Self::Data { attributes, .. } if *attributes == PropertyAttributes::data())
    }
}

/// A native function
pub struct NativeFunction {
    /// Function name
    pub name: Arc<str>,
    /// Declared argument count
    pub length: u32,
    /// Implementation
    pub call: NativeFn,
}

/// What an object is, beyond its property table
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array exotic object
    Array(RwLock<ArrayElements>),
    /// Callable native function
    Function(NativeFunction),
    /// Transparent wrapper around another object
    Wrapper(GcRef<JsObject>),
}

/// Object flags
#[derive(Debug)]
pub struct ObjectFlags {
    /// Is extensible
    extensible: AtomicBool,
    /// Has ever held an index-keyed property in its table
    has_indexed: AtomicBool,
}

/// A JavaScript object
///
/// Thread-safe with interior mutability. When both are needed, the element
/// lock is always taken before the property lock.
pub struct JsObject {
    /// Properties storage
    properties: RwLock<PropertyMap>,
    /// Prototype (None for Object.prototype)
    prototype: RwLock<Option<GcRef<JsObject>>>,
    /// Object kind
    kind: ObjectKind,
    /// Object flags
    flags: ObjectFlags,
}

impl JsObject {
    fn with_kind(prototype: Option<GcRef<JsObject>>, kind: ObjectKind) -> Self {
        Self {
            properties: RwLock::new(PropertyMap::default()),
            prototype: RwLock::new(prototype),
            kind,
            flags: ObjectFlags {
                extensible: AtomicBool::new(true),
                has_indexed: AtomicBool::new(false),
            },
        }
    }

    /// Create a new empty object
    pub fn ordinary(prototype: Option<GcRef<JsObject>>) -> Self {
        Self::with_kind(prototype, ObjectKind::Ordinary)
    }

    /// Create a new array object
    pub fn array(prototype: Option<GcRef<JsObject>>, elements: ArrayElements) -> Self {
        Self::with_kind(prototype, ObjectKind::Array(RwLock::new(elements)))
    }

    /// Create a native function object
    pub fn function(prototype: Option<GcRef<JsObject>>, function: NativeFunction) -> Self {
        Self::with_kind(prototype, ObjectKind::Function(function))
    }

    /// Create a wrapper forwarding to `target`
    pub fn wrapper(target: GcRef<JsObject>) -> Self {
        Self::with_kind(None, ObjectKind::Wrapper(target))
    }

    /// Follow wrappers to the innermost target
    pub fn unwrap(obj: &GcRef<JsObject>) -> &GcRef<JsObject> {
        let mut current = obj;
        while let ObjectKind::Wrapper(target) = &current.kind {
            current = target;
        }
        current
    }

    /// Object kind
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Is this (not a wrapper of) an array
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    /// Array element storage
    pub fn array_elements(&self) -> Option<&RwLock<ArrayElements>> {
        match &self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    /// Native function payload
    pub fn native_function(&self) -> Option<&NativeFunction> {
        match &self.kind {
            ObjectKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Prototype link
    pub fn prototype(&self) -> Option<GcRef<JsObject>> {
        match &self.kind {
            ObjectKind::Wrapper(target) => target.prototype(),
            _ => self.prototype.read().clone(),
        }
    }

    /// Replace the prototype link
    pub fn set_prototype(&self, prototype: Option<GcRef<JsObject>>) {
        match &self.kind {
            ObjectKind::Wrapper(target) => target.set_prototype(prototype),
            _ => *self.prototype.write() = prototype,
        }
    }

    /// Check extensibility
    pub fn is_extensible(&self) -> bool {
        match &self.kind {
            ObjectKind::Wrapper(target) => target.is_extensible(),
            _ => self.flags.extensible.load(Ordering::Acquire),
        }
    }

    /// Disallow new properties
    pub fn prevent_extensions(&self) {
        match &self.kind {
            ObjectKind::Wrapper(target) => target.prevent_extensions(),
            _ => self.flags.extensible.store(false, Ordering::Release),
        }
    }

    /// Whether the property table has ever held an index key
    pub fn has_indexed_properties(&self) -> bool {
        self.flags.has_indexed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_indexed(&self) {
        self.flags.has_indexed.store(true, Ordering::Release);
    }

    pub(crate) fn properties(&self) -> &RwLock<PropertyMap> {
        &self.properties
    }

    /// Insert a property without validation (intrinsics setup)
    pub(crate) fn insert_property(&self, key: PropertyKey, desc: PropertyDescriptor) {
        if key.as_index().is_some() {
            self.mark_indexed();
        }
        self.properties.write().insert(key, desc);
    }

    /// Install a non-enumerable built-in method
    pub(crate) fn define_builtin(&self, name: &str, value: Value) {
        self.insert_property(PropertyKey::string(name), PropertyDescriptor::builtin_method(value));
    }

    // ========================================================================
    // Own-property queries
    // ========================================================================

    /// [[GetOwnProperty]]
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        match &self.kind {
            ObjectKind::Wrapper(target) => return target.get_own_property(key),
            ObjectKind::Array(elements) => {
                let elements = elements.read();
                if key.is_length() {
                    return Some(PropertyDescriptor::data_with_attrs(
                        Value::number(elements.length() as f64),
                        PropertyAttributes::array_length(),
                    ));
                }
                if let (Some(index), ElementsMode::Dense(dense)) = (key.as_index(), elements.mode())
                {
                    return dense.get(index).cloned().map(PropertyDescriptor::data);
                }
            }
            _ => {}
        }
        self.properties.read().get(key).cloned()
    }

    /// Check own property
    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Own keys: indices ascending, then `length` for arrays, then string
    /// keys in insertion order
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        if let ObjectKind::Wrapper(target) = &self.kind {
            return target.own_keys();
        }

        let mut indices = Vec::new();
        let mut is_array = false;
        if let Some(elements) = self.array_elements() {
            is_array = true;
            if let ElementsMode::Dense(dense) = elements.read().mode() {
                indices.extend(
                    dense
                        .slots()
                        .iter()
                        .enumerate()
                        .filter(|(_, slot)| !slot.is_hole())
                        .map(|(i, _)| i as u32),
                );
            }
        }

        let mut strings = Vec::new();
        for key in self.properties.read().keys() {
            match key {
                PropertyKey::Index(i) => indices.push(*i),
                PropertyKey::String(_) => strings.push(key.clone()),
            }
        }
        indices.sort_unstable();

        let mut keys = Vec::with_capacity(indices.len() + strings.len() + 1);
        keys.extend(indices.into_iter().map(PropertyKey::Index));
        if is_array {
            keys.push(PropertyKey::length());
        }
        keys.extend(strings);
        keys
    }

    /// Index keys held in the property table within `[start, end)`, ascending
    pub(crate) fn own_index_keys_in(&self, start: u32, end: u32) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .properties
            .read()
            .keys()
            .filter_map(PropertyKey::as_index)
            .filter(|i| *i >= start && *i < end)
            .collect();
        indices.sort_unstable();
        indices
    }

    // ========================================================================
    // [[Get]] / [[Set]] / [[DefineOwnProperty]] / [[Delete]]
    // ========================================================================

    /// [[Get]], `undefined` when absent
    pub fn get(self: &GcRef<Self>, ncx: &mut NativeContext, key: &PropertyKey) -> VmResult<Value> {
        Ok(self.get_property(ncx, key)?.unwrap_or_default())
    }

    /// [[Get]], `None` when no object on the chain has the property.
    /// Accessor getters are invoked with this object as receiver.
    pub fn get_property(
        self: &GcRef<Self>,
        ncx: &mut NativeContext,
        key: &PropertyKey,
    ) -> VmResult<Option<Value>> {
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            if let Some(desc) = obj.get_own_property(key) {
                return match desc {
                    PropertyDescriptor::Data { value, .. } => Ok(Some(value)),
                    PropertyDescriptor::Accessor { get, .. } => match get {
                        Some(getter) if getter.is_callable() => ncx
                            .call_function(&getter, &Value::object(self.clone()), &[])
                            .map(Some),
                        _ => Ok(Some(Value::undefined())),
                    },
                };
            }
            current = obj.prototype();
        }
        Ok(None)
    }

    /// [[Set]]; `Ok(false)` when the assignment is refused
    pub fn set(
        self: &GcRef<Self>,
        ncx: &mut NativeContext,
        key: PropertyKey,
        value: Value,
    ) -> VmResult<bool> {
        match &self.kind {
            ObjectKind::Wrapper(target) => target.set(ncx, key, value),
            ObjectKind::Array(_) => match key.as_index() {
                Some(index) => elements::set_element_internal(ncx, self, index, value),
                None => self.ordinary_set(ncx, key, value),
            },
            _ => self.ordinary_set(ncx, key, value),
        }
    }

    /// OrdinarySet with this object as receiver
    pub(crate) fn ordinary_set(
        self: &GcRef<Self>,
        ncx: &mut NativeContext,
        key: PropertyKey,
        value: Value,
    ) -> VmResult<bool> {
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            match obj.get_own_property(&key) {
                Some(PropertyDescriptor::Data { attributes, .. }) => {
                    if !attributes.writable {
                        return Ok(false);
                    }
                    break;
                }
                Some(PropertyDescriptor::Accessor { set, .. }) => {
                    return match set {
                        Some(setter) if setter.is_callable() => {
                            ncx.call_function(&setter, &Value::object(self.clone()), &[value])?;
                            Ok(true)
                        }
                        _ => Ok(false),
                    };
                }
                None => current = obj.prototype(),
            }
        }

        match self.get_own_property(&key) {
            Some(PropertyDescriptor::Data { attributes, .. }) if attributes.writable => {
                self.define_own_property(ncx, key, PropertyDescriptor::data_with_attrs(value, attributes))
            }
            Some(_) => Ok(false),
            None if !self.is_extensible() => Ok(false),
            None => self.define_own_property(ncx, key, PropertyDescriptor::data(value)),
        }
    }

    /// [[DefineOwnProperty]]
    pub fn define_own_property(
        self: &GcRef<Self>,
        ncx: &mut NativeContext,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> VmResult<bool> {
        match &self.kind {
            ObjectKind::Wrapper(target) => target.define_own_property(ncx, key, desc),
            ObjectKind::Array(_) => {
                if let Some(index) = key.as_index() {
                    return elements::define_element(ncx, self, index, desc);
                }
                if key.is_length() {
                    return elements::define_length(ncx, self, desc);
                }
                mode::make_slow(self)?;
                Ok(self.ordinary_define(key, desc))
            }
            _ => Ok(self.ordinary_define(key, desc)),
        }
    }

    /// ValidateAndApplyPropertyDescriptor against the property table
    pub(crate) fn ordinary_define(&self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        let mut properties = self.properties.write();
        match properties.get(&key) {
            Some(existing) if !existing.attributes().configurable => {
                let allowed = match (existing, &desc) {
                    (
                        PropertyDescriptor::Data { attributes: old, .. },
                        PropertyDescriptor::Data { attributes: new, .. },
                    ) => old.writable && new.enumerable == old.enumerable && !new.configurable,
                    _ => false,
                };
                if !allowed {
                    return false;
                }
            }
            Some(_) => {}
            None if !self.is_extensible() => return false,
            None => {}
        }
        if key.as_index().is_some() {
            self.mark_indexed();
        }
        properties.insert(key, desc);
        true
    }

    /// [[Delete]]; `Ok(false)` when refused
    pub fn delete(self: &GcRef<Self>, ncx: &mut NativeContext, key: &PropertyKey) -> VmResult<bool> {
        if let Some(index) = key.as_index() {
            let outcome = elements::delete_element(ncx, self, index, false)?;
            return Ok(outcome == elements::DeleteOutcome::Deleted);
        }
        match &self.kind {
            ObjectKind::Wrapper(target) => target.delete(ncx, key),
            ObjectKind::Array(_) if key.is_length() => Ok(false),
            _ => Ok(self.delete_own(key)),
        }
    }

    /// Remove from the property table; false if non-configurable
    pub(crate) fn delete_own(&self, key: &PropertyKey) -> bool {
        let mut properties = self.properties.write();
        match properties.get(key) {
            None => true,
            Some(desc) if !desc.attributes().configurable => false,
            Some(_) => {
                properties.shift_remove(key);
                true
            }
        }
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ObjectKind::Ordinary => write!(f, "JsObject"),
            ObjectKind::Array(elements) => write!(f, "JsArray(length={})", elements.read().length()),
            ObjectKind::Function(function) => write!(f, "JsFunction({})", function.name),
            ObjectKind::Wrapper(target) => write!(f, "Wrapper({:?})", target),
        }
    }
}
