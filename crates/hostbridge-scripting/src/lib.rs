//! # Hostbridge Scripting
//!
//! Injection of host classes and instances into embedded Rhai runtimes.
//!
//! ## Features
//!
//! - Host classes become script constructors with static members
//! - Host instances become script values with fields and methods
//! - One proxy per class and runtime, cached until the runtime is dropped
//! - Per-class interceptors customizing or replacing injected values
//! - Host arrays injected as copied lists
//!
//! ## Example
//!
//! ```
//! use hostbridge_core::{HostClass, HostValue};
//! use hostbridge_scripting::{HostAdapter, ScriptRuntime};
//!
//! struct Point { x: i64, y: i64 }
//!
//! let point = HostClass::builder::<Point>()
//!     .name("geometry::Point")
//!     .constructor(2, |call| Ok(Point { x: call.int(0)?, y: call.int(1)? }))
//!     .field("x", |p: &Point| HostValue::Int(p.x))
//!     .field("y", |p: &Point| HostValue::Int(p.y))
//!     .build();
//!
//! let adapter = HostAdapter::new();
//! let mut runtime = ScriptRuntime::new();
//! adapter.inject_class(&mut runtime, &point).unwrap();
//!
//! let x: i64 = runtime.eval("Point(3, 4).x").unwrap();
//! assert_eq!(x, 3);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod adapter;
pub mod cache;
pub mod error;
pub mod interceptor;
pub mod proxy;
pub mod runtime;
pub mod script_object;
pub mod translate;

pub use adapter::HostAdapter;
pub use cache::{CacheRegistry, InstanceId, RuntimeCache};
pub use error::{Result, RhaiResultOf, ScriptError};
pub use interceptor::{ClassInterceptor, ConstructorBody, InjectionOverride, OverrideInterceptor};
pub use proxy::{ClassProxy, StaticMethodProxy};
pub use runtime::{NativeFn, ReceiverFn, RuntimeId, ScriptRuntime, ScriptValue};
pub use script_object::{ConstructorRef, HostRef};

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::adapter::HostAdapter;
    pub use crate::error::{Result, ScriptError};
    pub use crate::interceptor::{
        ClassInterceptor, ConstructorBody, InjectionOverride, OverrideInterceptor,
    };
    pub use crate::runtime::{ScriptRuntime, ScriptValue};
    pub use crate::script_object::HostRef;
}
