//! # Otter Roots
//!
//! Scoped rooting for values held by native code.
//!
//! ## Design
//!
//! - **Root stack**: a LIFO registry of every temporary that must stay visible
//!   to the collector while native code runs (sort buffers, staging vectors)
//! - **Scopes**: RAII guards that unregister everything they rooted on drop,
//!   on success and error paths alike
//! - **Tracing**: the host walks the stack at safe points through [`Trace`]

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod scope;
pub mod trace;

pub use scope::{RootScope, RootStack, RootStats, Rooted};
pub use trace::Trace;
