//! Live host instances

use crate::class::HostClass;
use crate::error::{Error, Result};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

type Instance = dyn Any + Send + Sync;

/// A live host instance together with the class that describes it.
///
/// Cloning is cheap and shares the instance. Two handles are the same object
/// when [`HostObject::ptr_eq`] holds.
#[derive(Clone)]
pub struct HostObject {
    class: Arc<HostClass>,
    inner: Arc<Instance>,
}

impl HostObject {
    /// Wrap a value as an instance of `class`
    pub fn new<T: Any + Send + Sync>(class: Arc<HostClass>, value: T) -> Self {
        Self {
            class,
            inner: Arc::new(value),
        }
    }

    /// Class descriptor of this instance
    pub fn class(&self) -> &Arc<HostClass> {
        &self.class
    }

    /// Borrow the instance as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Borrow the instance as `T`, failing with a type mismatch
    pub fn expect_ref<T: Any>(&self) -> Result<&T> {
        self.downcast_ref::<T>().ok_or_else(|| {
            Error::type_mismatch(std::any::type_name::<T>(), self.class.name().to_string())
        })
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of strong handles to the instance
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Create a non-owning handle
    pub fn downgrade(&self) -> WeakHostObject {
        WeakHostObject {
            class: Arc::clone(&self.class),
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("class", &self.class.name())
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// Non-owning handle to a [`HostObject`]
#[derive(Clone)]
pub struct WeakHostObject {
    class: Arc<HostClass>,
    inner: Weak<Instance>,
}

impl WeakHostObject {
    /// Recover the instance if it is still alive
    pub fn upgrade(&self) -> Option<HostObject> {
        self.inner.upgrade().map(|inner| HostObject {
            class: Arc::clone(&self.class),
            inner,
        })
    }

    /// Whether the instance has been dropped
    pub fn is_dead(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl fmt::Debug for WeakHostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHostObject")
            .field("class", &self.class.name())
            .field("alive", &!self.is_dead())
            .finish()
    }
}
