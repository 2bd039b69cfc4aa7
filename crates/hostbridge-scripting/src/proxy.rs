//! Class proxies
//!
//! A [`ClassProxy`] stands for one host class inside one runtime. It turns
//! script calls into host calls (translating arguments and results), installs
//! the dispatchers that make instance members reachable from scripts, and
//! registers the class constructor in the runtime's global container.
//!
//! Instance dispatchers are shared by name and arity across classes: a
//! dispatcher routes through the proxy carried by the receiving [`HostRef`].

use crate::cache::RuntimeCache;
use crate::error::{Result, RhaiResultOf, ScriptError};
use crate::interceptor::ClassInterceptor;
use crate::runtime::{NativeFn, ReceiverFn, ScriptRuntime, ScriptValue};
use crate::script_object::{ConstructorRef, HostRef};
use crate::translate;
use hostbridge_core::{HostClass, HostObject};
use rhai::{Dynamic, Map};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Static member wired onto a constructor value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMethodProxy {
    name: String,
    arity: usize,
}

impl StaticMethodProxy {
    /// Script-facing member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument count
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// One host class within one runtime
pub struct ClassProxy {
    class: Arc<HostClass>,
    interceptor: Option<Arc<dyn ClassInterceptor>>,
    static_methods: Vec<StaticMethodProxy>,
    cache: Weak<RuntimeCache>,
}

impl ClassProxy {
    pub(crate) fn new(
        class: Arc<HostClass>,
        interceptor: Option<Arc<dyn ClassInterceptor>>,
        cache: Weak<RuntimeCache>,
    ) -> Self {
        let static_methods = class
            .static_methods()
            .iter()
            .map(|m| StaticMethodProxy {
                name: m.name().to_string(),
                arity: m.arity(),
            })
            .collect();

        Self {
            class,
            interceptor,
            static_methods,
            cache,
        }
    }

    /// Proxied class
    pub fn class(&self) -> &Arc<HostClass> {
        &self.class
    }

    /// Interceptor attached when the proxy was created
    pub fn interceptor(&self) -> Option<&Arc<dyn ClassInterceptor>> {
        self.interceptor.as_ref()
    }

    /// Static members of the class
    pub fn static_methods(&self) -> &[StaticMethodProxy] {
        &self.static_methods
    }

    pub(crate) fn uses_interceptor(&self, other: &Arc<dyn ClassInterceptor>) -> bool {
        self.interceptor.as_ref().is_some_and(|current| {
            Arc::as_ptr(current).cast::<()>() == Arc::as_ptr(other).cast::<()>()
        })
    }

    fn cache(&self) -> Result<Arc<RuntimeCache>> {
        self.cache.upgrade().ok_or(ScriptError::CacheReleased)
    }

    /// Build a new instance from script arguments
    pub fn construct(self: &Arc<Self>, args: Vec<Dynamic>) -> Result<Dynamic> {
        let args = translate::args_to_host(args)?;
        let object = self.class.construct(&args)?;
        Ok(Dynamic::from(self.wrap(object)?))
    }

    /// Call instance method `name` on `object`
    pub fn invoke_method(
        &self,
        object: &HostObject,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic> {
        let args = translate::args_to_host(args)?;
        let result = self.class.invoke_method(object, name, &args)?;
        translate::to_script(result, &self.cache()?)
    }

    /// Call static method `name`
    pub fn invoke_static(&self, name: &str, args: Vec<Dynamic>) -> Result<Dynamic> {
        let args = translate::args_to_host(args)?;
        let result = self.class.invoke_static(name, &args)?;
        translate::to_script(result, &self.cache()?)
    }

    /// Read field `name` of `object`
    pub fn get_field(&self, object: &HostObject, name: &str) -> Result<Dynamic> {
        let value = self.class.get_field(object, name)?;
        translate::to_script(value, &self.cache()?)
    }

    /// Assign field `name` of `object`
    pub fn set_field(&self, object: &HostObject, name: &str, value: Dynamic) -> Result<()> {
        let value = translate::to_host(value)?;
        self.class.set_field(object, name, value)?;
        Ok(())
    }

    /// Wrap `object` as a script value with no properties
    pub fn wrap(self: &Arc<Self>, object: HostObject) -> Result<HostRef> {
        self.wrap_with(object, Map::new())
    }

    fn wrap_with(self: &Arc<Self>, object: HostObject, properties: Map) -> Result<HostRef> {
        if object.class().id() != self.class.id() {
            return Err(ScriptError::type_error(format!(
                "cannot wrap {} as {}",
                object.class().name(),
                self.class.name()
            )));
        }
        let id = self.cache()?.register_instance(&object);
        Ok(HostRef::new(id, object, Arc::clone(self), properties))
    }

    /// Make fields and instance methods of the class reachable on instances.
    ///
    /// Idempotent; returns how many dispatchers were added.
    pub fn install(&self, runtime: &mut ScriptRuntime) -> usize {
        let mut added = 0;

        for field in self.class.fields() {
            added += usize::from(expose_member(runtime, field.name()));
        }

        for method in self.class.methods() {
            let name = method.name().to_string();
            let dispatch: ReceiverFn<HostRef> = Arc::new(
                move |receiver: HostRef, args: Vec<Dynamic>| -> RhaiResultOf<Dynamic> {
                    receiver.invoke(&name, args)
                },
            );
            added += usize::from(runtime.register_method(method.name(), method.arity(), dispatch));
        }

        if added > 0 {
            trace!(
                runtime = %runtime.id(),
                class = self.class.name(),
                added,
                "Instance dispatchers installed"
            );
        }
        added
    }

    /// Register the constructor as callable `name(...)` and bind `name` to
    /// the constructor value
    pub fn register_constructor(self: &Arc<Self>, runtime: &mut ScriptRuntime, name: &str) {
        for arity in self.class.constructor_arities() {
            let proxy = Arc::clone(self);
            let construct: NativeFn =
                Arc::new(move |args: Vec<Dynamic>| -> RhaiResultOf<Dynamic> {
                    proxy.construct(args).map_err(ScriptError::into_rhai)
                });
            runtime.register_function(name, arity, construct);
        }

        runtime.add(name, Dynamic::from(ConstructorRef::new(Arc::clone(self))));
        debug!(
            runtime = %runtime.id(),
            class = self.class.name(),
            name,
            "Constructor registered"
        );
    }

    /// Wire every static member onto the constructor bound at `name`.
    ///
    /// Returns how many members were newly wired.
    pub fn wire_static_methods(&self, runtime: &mut ScriptRuntime, name: &str) -> Result<usize> {
        let Some(handle) = runtime.get(name) else {
            return Ok(0);
        };
        let mut constructor = handle.cast::<ConstructorRef>().ok_or_else(|| {
            ScriptError::type_error(format!(
                "global '{}' is {}, not a host constructor",
                name,
                handle.value().type_name()
            ))
        })?;

        let mut wired = 0;
        for member in &self.static_methods {
            if !constructor.add_static(member.clone()) {
                continue;
            }
            let method = member.name().to_string();
            let dispatch: ReceiverFn<ConstructorRef> = Arc::new(
                move |receiver: ConstructorRef, args: Vec<Dynamic>| -> RhaiResultOf<Dynamic> {
                    receiver.invoke(&method, args)
                },
            );
            runtime.register_method(member.name(), member.arity(), dispatch);
            wired += 1;
        }

        runtime.add(name, Dynamic::from(constructor));
        handle.release();

        trace!(runtime = %runtime.id(), class = self.class.name(), wired, "Static members wired");
        Ok(wired)
    }

    /// Attach `instance` to the value produced by its constructor script and
    /// bind it as global `binding`.
    ///
    /// Properties the constructor body set on the script object stay visible
    /// on the bound instance. Returns the binding name.
    pub fn attach_instance(
        self: &Arc<Self>,
        runtime: &mut ScriptRuntime,
        instance: &HostObject,
        binding: &str,
        script_object: &ScriptValue,
    ) -> Result<String> {
        let properties = script_object.cast::<Map>().ok_or_else(|| {
            ScriptError::type_error(format!(
                "constructor script for '{}' produced {}, expected an object map",
                binding,
                script_object.value().type_name()
            ))
        })?;

        self.install(runtime);
        for key in properties.keys() {
            if expose_member(runtime, key) {
                trace!(runtime = %runtime.id(), property = key.as_str(), "Script property exposed");
            }
        }
        let host_ref = self.wrap_with(instance.clone(), properties)?;
        let id = host_ref.id();
        runtime.add(binding, Dynamic::from(host_ref));

        debug!(
            runtime = %runtime.id(),
            class = self.class.name(),
            instance = %id,
            binding,
            "Instance attached"
        );
        Ok(binding.to_string())
    }
}

/// Route `receiver.name` on host instances to the host field or script
/// property `name`. Registered getters win over the engine's built-in
/// properties, which the indexer fallback does not.
fn expose_member(runtime: &mut ScriptRuntime, name: &str) -> bool {
    let getter_name = name.to_string();
    let setter_name = name.to_string();
    runtime.register_property::<HostRef, _, _>(
        name,
        move |receiver: &mut HostRef| receiver.read_member(&getter_name),
        move |receiver: &mut HostRef, value: Dynamic| receiver.write_member(&setter_name, value),
    )
}

impl fmt::Debug for ClassProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassProxy")
            .field("class", &self.class.name())
            .field("intercepted", &self.interceptor.is_some())
            .field("static_methods", &self.static_methods)
            .finish()
    }
}
