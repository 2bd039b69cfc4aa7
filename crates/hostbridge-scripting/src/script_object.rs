//! Script-side values for host instances and constructors

use crate::cache::InstanceId;
use crate::error::{RhaiResultOf, ScriptError};
use crate::proxy::{ClassProxy, StaticMethodProxy};
use hostbridge_core::{Error, HostObject};
use parking_lot::RwLock;
use rhai::{Dynamic, Engine, ImmutableString, Map};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A live host instance as seen by scripts.
///
/// Member lookup goes to the host class first, then to the properties set by
/// the constructor body or by later assignments. Clones share the properties.
#[derive(Clone)]
pub struct HostRef {
    id: InstanceId,
    object: HostObject,
    proxy: Arc<ClassProxy>,
    properties: Arc<RwLock<Map>>,
}

impl HostRef {
    pub(crate) fn new(
        id: InstanceId,
        object: HostObject,
        proxy: Arc<ClassProxy>,
        properties: Map,
    ) -> Self {
        Self {
            id,
            object,
            proxy,
            properties: Arc::new(RwLock::new(properties)),
        }
    }

    /// Identity entry in the runtime cache
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The attached host instance
    pub fn object(&self) -> &HostObject {
        &self.object
    }

    /// Proxy of the instance's class
    pub fn proxy(&self) -> &Arc<ClassProxy> {
        &self.proxy
    }

    /// Script property `name`, if set
    pub fn property(&self, name: &str) -> Option<Dynamic> {
        self.properties.read().get(name).cloned()
    }

    /// Snapshot of all script properties
    pub fn properties(&self) -> Map {
        self.properties.read().clone()
    }

    /// Whether both values are attached to the same host instance
    pub fn same_instance(&self, other: &HostRef) -> bool {
        self.object.ptr_eq(&other.object)
    }

    /// Read host field or script property `name`; `()` when neither exists
    pub fn read_member(&self, name: &str) -> RhaiResultOf<Dynamic> {
        if self.object.class().field(name).is_some() {
            return self
                .proxy
                .get_field(&self.object, name)
                .map_err(ScriptError::into_rhai);
        }
        Ok(self.property(name).unwrap_or(Dynamic::UNIT))
    }

    /// Assign host field `name`, or set a script property when the class has
    /// no such field
    pub fn write_member(&self, name: &str, value: Dynamic) -> RhaiResultOf<()> {
        if self.object.class().field(name).is_some() {
            return self
                .proxy
                .set_field(&self.object, name, value)
                .map_err(ScriptError::into_rhai);
        }
        self.properties.write().insert(name.into(), value);
        Ok(())
    }

    pub(crate) fn invoke(&self, name: &str, args: Vec<Dynamic>) -> RhaiResultOf<Dynamic> {
        self.proxy
            .invoke_method(&self.object, name, args)
            .map_err(ScriptError::into_rhai)
    }
}

impl fmt::Display for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.object.class().simple_name(), self.id)
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRef")
            .field("id", &self.id)
            .field("class", &self.object.class().name())
            .field(
                "properties",
                &self
                    .properties
                    .read()
                    .keys()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Constructor value bound under the injected class name.
///
/// Carries the static members wired onto it; `Name.member(...)` only
/// resolves members present here.
#[derive(Clone)]
pub struct ConstructorRef {
    proxy: Arc<ClassProxy>,
    members: BTreeMap<String, Vec<StaticMethodProxy>>,
}

impl ConstructorRef {
    pub(crate) fn new(proxy: Arc<ClassProxy>) -> Self {
        Self {
            proxy,
            members: BTreeMap::new(),
        }
    }

    /// Proxy this constructor builds instances with
    pub fn proxy(&self) -> &Arc<ClassProxy> {
        &self.proxy
    }

    /// Wired static members
    pub fn static_members(&self) -> impl Iterator<Item = &StaticMethodProxy> {
        self.members.values().flatten()
    }

    /// Number of wired static overloads
    pub fn member_count(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    /// Wire `member`; returns `false` if that name and arity is already wired
    pub(crate) fn add_static(&mut self, member: StaticMethodProxy) -> bool {
        let overloads = self.members.entry(member.name().to_string()).or_default();
        if overloads.iter().any(|m| m.arity() == member.arity()) {
            return false;
        }
        overloads.push(member);
        true
    }

    pub(crate) fn invoke(&self, name: &str, args: Vec<Dynamic>) -> RhaiResultOf<Dynamic> {
        let class = self.proxy.class();
        let overloads = self.members.get(name).ok_or_else(|| {
            ScriptError::from(Error::member_not_found(class.name(), name)).into_rhai()
        })?;
        if !overloads.iter().any(|m| m.arity() == args.len()) {
            let expected = overloads.first().map(|m| m.arity()).unwrap_or_default();
            return Err(ScriptError::from(Error::ArityMismatch {
                member: format!("{}.{}", class.simple_name(), name),
                expected,
                actual: args.len(),
            })
            .into_rhai());
        }
        self.proxy
            .invoke_static(name, args)
            .map_err(ScriptError::into_rhai)
    }
}

impl fmt::Display for ConstructorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.proxy.class().simple_name())
    }
}

impl fmt::Debug for ConstructorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorRef")
            .field("class", &self.proxy.class().name())
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Register the script types every runtime starts with
pub(crate) fn register_builtins(engine: &mut Engine) {
    engine
        .register_type_with_name::<HostRef>("HostObject")
        .register_type_with_name::<ConstructorRef>("HostConstructor")
        .register_fn("to_string", |r: &mut HostRef| r.to_string())
        .register_fn("to_debug", |r: &mut HostRef| format!("{r:?}"))
        .register_fn("to_string", |c: &mut ConstructorRef| c.to_string())
        .register_fn("to_debug", |c: &mut ConstructorRef| format!("{c:?}"))
        .register_fn("==", |a: HostRef, b: HostRef| a.same_instance(&b))
        .register_fn("!=", |a: HostRef, b: HostRef| !a.same_instance(&b))
        .register_indexer_get(|r: &mut HostRef, key: ImmutableString| {
            r.read_member(key.as_str())
        })
        .register_indexer_set(|r: &mut HostRef, key: ImmutableString, value: Dynamic| {
            r.write_member(key.as_str(), value)
        });
}
