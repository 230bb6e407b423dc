//! # Otter Array
//!
//! Array value engine for the Otter JavaScript runtime.
//!
//! ## Design Principles
//!
//! - **Two representations**: dense slot storage with holes, or ordinary
//!   properties keyed by index; conversion is one way and lazy
//! - **Generic methods**: every `Array.prototype` method works on any object
//!   with a `length`, with dense fast paths where the prototype chain allows
//! - **Re-entrancy**: no lock is held across a user callback, and buffers
//!   live across callbacks only inside a root scope
//! - **Interruptible**: every unbounded loop passes an interrupt checkpoint

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod array;
pub mod builtins;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod gc;
pub mod object;
pub mod value;

pub use array::{ArrayElements, DenseElements, ElementsMode, Slot, SlotStore};
pub use builtins::{Intrinsics, construct_array, is_array, new_array, new_array_from_values};
pub use config::EngineConfig;
pub use context::{ElementObserver, KeyEnumerator, NativeContext};
pub use error::{ErrorKind, VmError, VmResult};
pub use gc::GcRef;
pub use object::{JsObject, PropertyAttributes, PropertyDescriptor, PropertyKey};
pub use value::Value;
