//! # Hostbridge Core
//!
//! Host object model and error handling for the hostbridge injection layer.
//!
//! This crate provides the host side of the bridge:
//! - Class descriptors ([`HostClass`], [`ClassBuilder`])
//! - Live instances ([`HostObject`]) and values ([`HostValue`])
//! - The built-in [`HostList`] sequence
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod class;
pub mod error;
pub mod list;
pub mod object;
pub mod value;

pub use class::{
    ClassBuilder, ClassId, Constructor, Field, HostClass, Invocation, Method, StaticMethod,
};
pub use error::{Error, Result};
pub use list::HostList;
pub use object::{HostObject, WeakHostObject};
pub use value::{HostValue, PrimitiveArray};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::class::{ClassBuilder, ClassId, HostClass, Invocation};
    pub use crate::error::{Error, Result};
    pub use crate::list::HostList;
    pub use crate::object::HostObject;
    pub use crate::value::{HostValue, PrimitiveArray};
}
