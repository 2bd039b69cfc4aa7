//! Built-in ordered dynamic sequence
//!
//! Host arrays handed to the injection layer are copied into a [`HostList`];
//! the copy is what scripts see, so mutations made by scripts never reach the
//! original array.

use crate::class::{HostClass, Invocation};
use crate::error::{Error, Result};
use crate::object::HostObject;
use crate::value::HostValue;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

static LIST_CLASS: Lazy<Arc<HostClass>> = Lazy::new(|| {
    HostClass::builder::<HostList>()
        .name("hostbridge::List")
        .constructor(0, |_| Ok(HostList::default()))
        .method("size", 0, |list: &HostList, _| Ok(HostValue::Int(list.len() as i64)))
        .method("is_empty", 0, |list: &HostList, _| Ok(HostValue::Bool(list.is_empty())))
        .method("get", 1, |list: &HostList, call| list.get(call.int(0)?))
        .method("set", 2, |list: &HostList, call| {
            list.set(call.int(0)?, call.arg(1)?.clone())
        })
        .method("add", 1, |list: &HostList, call| {
            list.push(call.arg(0)?.clone());
            Ok(HostValue::Bool(true))
        })
        .method("remove", 1, |list: &HostList, call| list.remove(call.int(0)?))
        .method("clear", 0, |list: &HostList, _: &Invocation<'_>| {
            list.items.write().clear();
            Ok(HostValue::Unit)
        })
        .build()
});

/// Growable list of host values with interior mutability
#[derive(Debug, Default)]
pub struct HostList {
    items: RwLock<Vec<HostValue>>,
}

impl HostList {
    /// Class descriptor shared by every list
    pub fn class() -> &'static Arc<HostClass> {
        &LIST_CLASS
    }

    /// Create a list holding `items`
    pub fn new(items: Vec<HostValue>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Create a list instance holding `items`
    pub fn object(items: Vec<HostValue>) -> HostObject {
        HostObject::new(Arc::clone(Self::class()), Self::new(items))
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Copy of the current elements
    pub fn snapshot(&self) -> Vec<HostValue> {
        self.items.read().clone()
    }

    /// Append an element
    pub fn push(&self, value: HostValue) {
        self.items.write().push(value);
    }

    /// Element at `index`
    pub fn get(&self, index: i64) -> Result<HostValue> {
        let items = self.items.read();
        let slot = checked_index(index, items.len())?;
        Ok(items[slot].clone())
    }

    /// Replace the element at `index`, returning the previous one
    pub fn set(&self, index: i64, value: HostValue) -> Result<HostValue> {
        let mut items = self.items.write();
        let slot = checked_index(index, items.len())?;
        Ok(std::mem::replace(&mut items[slot], value))
    }

    /// Remove and return the element at `index`
    pub fn remove(&self, index: i64) -> Result<HostValue> {
        let mut items = self.items.write();
        let slot = checked_index(index, items.len())?;
        Ok(items.remove(slot))
    }
}

fn checked_index(index: i64, len: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(Error::IndexOutOfBounds { index, len })
}
