//! Class and object injection
//!
//! [`HostAdapter`] is the entry point of the bridge. It injects host classes
//! as script constructors and host instances as script values, keeping one
//! [`RuntimeCache`] per runtime in its [`CacheRegistry`].
//!
//! Object injection runs a generated snippet of the form
//!
//! ```text
//! let NAME = {
//!     let object = #{};
//!     BODY
//!     RESULT
//! };
//! NAME
//! ```
//!
//! where `BODY` comes from the class interceptor (if any) and `RESULT` is the
//! script object the host instance gets attached to.

use crate::cache::{CacheRegistry, RuntimeCache};
use crate::error::{Result, ScriptError};
use crate::interceptor::{ClassInterceptor, InjectionOverride};
use crate::proxy::ClassProxy;
use crate::runtime::ScriptRuntime;
use crate::translate;
use hostbridge_config::InjectionConfig;
use hostbridge_core::{HostClass, HostList, HostObject, HostValue};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

const OBJECT_BINDING: &str = "object";
const INJECTED_BINDING: &str = "injected";

/// Injects host classes and instances into script runtimes
#[derive(Debug, Clone, Default)]
pub struct HostAdapter {
    registry: CacheRegistry,
    injection: InjectionConfig,
}

impl HostAdapter {
    /// Create an adapter with default naming
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter with the given naming configuration
    pub fn with_config(injection: &InjectionConfig) -> Self {
        Self {
            registry: CacheRegistry::new(),
            injection: injection.clone(),
        }
    }

    /// Registry holding the per-runtime caches
    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    /// Cache of `runtime`, created on first access
    pub fn cache_for(&self, runtime: &ScriptRuntime) -> Arc<RuntimeCache> {
        self.registry.get_or_create(runtime)
    }

    /// Inject `class` under its simple name
    pub fn inject_class(&self, runtime: &mut ScriptRuntime, class: &Arc<HostClass>) -> Result<()> {
        self.inject_class_with(runtime, class.simple_name(), class, None)
    }

    /// Inject `class` under `name`
    pub fn inject_class_named(
        &self,
        runtime: &mut ScriptRuntime,
        name: &str,
        class: &Arc<HostClass>,
    ) -> Result<()> {
        self.inject_class_with(runtime, name, class, None)
    }

    /// Inject `class` under its simple name with an interceptor
    pub fn inject_class_intercepted(
        &self,
        runtime: &mut ScriptRuntime,
        class: &Arc<HostClass>,
        interceptor: Arc<dyn ClassInterceptor>,
    ) -> Result<()> {
        self.inject_class_with(runtime, class.simple_name(), class, Some(interceptor))
    }

    /// Inject `class` as the script constructor `name`.
    ///
    /// Does nothing if `name` is already bound in the runtime. The
    /// interceptor only applies if this is the first injection of `class`
    /// into `runtime`; static members are wired only for classes without one.
    pub fn inject_class_with(
        &self,
        runtime: &mut ScriptRuntime,
        name: &str,
        class: &Arc<HostClass>,
        interceptor: Option<Arc<dyn ClassInterceptor>>,
    ) -> Result<()> {
        let proxy = self.cache_for(runtime).proxy_for(class, interceptor);
        proxy.install(runtime);

        if runtime.contains_key(name) {
            trace!(runtime = %runtime.id(), class = class.name(), name, "Name already bound");
            return Ok(());
        }

        proxy.register_constructor(runtime, name);
        if proxy.interceptor().is_none() {
            proxy.wire_static_methods(runtime, name)?;
        }

        debug!(runtime = %runtime.id(), class = class.name(), name, "Class injected");
        Ok(())
    }

    /// Inject a host value and return the global name it is bound to.
    ///
    /// Objects are attached to a freshly built script object. Arrays are
    /// copied into a [`HostList`] first, so script mutations never reach the
    /// original. Nested and primitive arrays are not supported. When `name`
    /// is `None` a unique name is generated.
    pub fn inject_object(
        &self,
        runtime: &mut ScriptRuntime,
        name: Option<&str>,
        instance: HostValue,
    ) -> Result<String> {
        match instance {
            HostValue::Object(object) => self.inject_instance(runtime, name, object),
            HostValue::Array(items) => {
                let nested = items.iter().find(|item| {
                    matches!(item, HostValue::Array(_) | HostValue::PrimitiveArray(_))
                });
                if let Some(nested) = nested {
                    return Err(ScriptError::unsupported_array(format!(
                        "multi-dimensional arrays cannot be injected (found nested {})",
                        nested.type_name()
                    )));
                }
                trace!(len = items.len(), "Copying host array into a list");
                let list = HostList::object(items);
                self.inject_object(runtime, name, HostValue::Object(list))
            }
            HostValue::PrimitiveArray(array) => Err(ScriptError::unsupported_array(format!(
                "primitive arrays cannot be injected (found {} elements)",
                array.len()
            ))),
            other => Err(ScriptError::type_error(format!(
                "only objects and arrays can be injected, found {}",
                other.type_name()
            ))),
        }
    }

    fn inject_instance(
        &self,
        runtime: &mut ScriptRuntime,
        name: Option<&str>,
        object: HostObject,
    ) -> Result<String> {
        let class = Arc::clone(object.class());
        self.inject_class_with(runtime, &class.script_safe_name(), &class, None)?;

        let cache = self.cache_for(runtime);
        let proxy = cache.proxy_for(&class, None);
        let name = name.map_or_else(|| self.generated_name(), str::to_string);

        let Some(interceptor) = proxy.interceptor() else {
            return self.attach(runtime, &proxy, &object, &name, "");
        };
        match interceptor.object_injector_override(&object) {
            None => {
                let body = interceptor.constructor_script_body();
                self.attach(runtime, &proxy, &object, &name, &body)
            }
            Some(replacement) => self.inject_override(runtime, &cache, &name, replacement),
        }
    }

    fn attach(
        &self,
        runtime: &mut ScriptRuntime,
        proxy: &Arc<ClassProxy>,
        object: &HostObject,
        name: &str,
        body: &str,
    ) -> Result<String> {
        let script = object_script(name, body, OBJECT_BINDING);
        let handle = runtime.execute_object_script(&script)?;
        let attached = proxy.attach_instance(runtime, object, name, &handle);
        handle.release();

        if attached.is_err() {
            runtime.remove(name);
        }
        attached
    }

    fn inject_override(
        &self,
        runtime: &mut ScriptRuntime,
        cache: &Arc<RuntimeCache>,
        name: &str,
        replacement: InjectionOverride,
    ) -> Result<String> {
        let value = match replacement {
            InjectionOverride::Script(value) => value,
            InjectionOverride::Host(value) => translate::to_script(value, cache)?,
        };

        let temp = format!("{}{}", name, self.injection.override_suffix);
        let body = if value.is_unit() {
            format!("let {INJECTED_BINDING} = ();")
        } else {
            runtime.add(temp.as_str(), value);
            format!("let {INJECTED_BINDING} = {temp};\n    {temp} = ();")
        };
        let script = object_script(name, &body, INJECTED_BINDING);
        match runtime.execute_object_script(&script) {
            Ok(handle) => {
                handle.release();
                debug!(runtime = %runtime.id(), name, "Injected override value");
                Ok(name.to_string())
            }
            Err(err) => {
                runtime.remove(&temp);
                Err(err)
            }
        }
    }

    fn generated_name(&self) -> String {
        format!(
            "{}{}",
            self.injection.generated_name_prefix,
            Uuid::new_v4().simple()
        )
    }
}

fn object_script(name: &str, body: &str, result: &str) -> String {
    format!(
        "let {name} = {{\n    let {OBJECT_BINDING} = #{{}};\n    {body}\n    {result}\n}};\n{name}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::MockClassInterceptor;
    use crate::script_object::HostRef;
    use rhai::{Dynamic, INT};

    struct Gauge {
        level: i64,
    }

    fn gauge_class() -> Arc<HostClass> {
        HostClass::builder::<Gauge>()
            .name("test::Gauge")
            .constructor(1, |call| Ok(Gauge { level: call.int(0)? }))
            .field("level", |g: &Gauge| HostValue::Int(g.level))
            .build()
    }

    fn gauge(level: i64) -> HostValue {
        HostValue::Object(HostObject::new(gauge_class(), Gauge { level }))
    }

    #[test]
    fn test_object_script_shape() {
        let script = object_script("TEMPabc", "object.a = 1;", "object");
        assert_eq!(
            script,
            "let TEMPabc = {\n    let object = #{};\n    object.a = 1;\n    object\n};\nTEMPabc"
        );
    }

    #[test]
    fn test_generated_names_use_prefix() {
        let adapter = HostAdapter::with_config(&InjectionConfig {
            generated_name_prefix: "OBJ".to_string(),
            ..InjectionConfig::default()
        });
        let name = adapter.generated_name();
        assert!(name.starts_with("OBJ"));
        assert_eq!(name.len(), 3 + 32);
        assert_ne!(name, adapter.generated_name());
    }

    #[test]
    fn test_interceptor_body_runs_once_without_override() {
        let mut hook = MockClassInterceptor::new();
        hook.expect_object_injector_override()
            .times(1)
            .returning(|_| None);
        hook.expect_constructor_script_body()
            .times(1)
            .returning(|| "object.tag = \"mocked\";".to_string());

        let adapter = HostAdapter::new();
        let mut runtime = ScriptRuntime::new();
        let class = gauge_class();
        adapter
            .inject_class_intercepted(&mut runtime, &class, Arc::new(hook))
            .unwrap();

        let id = adapter.inject_object(&mut runtime, None, gauge(3)).unwrap();
        let tag: String = runtime.eval(&format!("{id}.tag")).unwrap();
        assert_eq!(tag, "mocked");
        let level: INT = runtime.eval(&format!("{id}.level")).unwrap();
        assert_eq!(level, 3);
    }

    #[test]
    fn test_override_skips_body() {
        let mut hook = MockClassInterceptor::new();
        hook.expect_object_injector_override()
            .returning(|_| Some(InjectionOverride::Host(HostValue::from("replaced"))));
        hook.expect_constructor_script_body().never();

        let adapter = HostAdapter::new();
        let mut runtime = ScriptRuntime::new();
        adapter
            .inject_class_intercepted(&mut runtime, &gauge_class(), Arc::new(hook))
            .unwrap();

        let id = adapter
            .inject_object(&mut runtime, Some("custom"), gauge(1))
            .unwrap();
        assert_eq!(id, "custom");
        assert_eq!(runtime.eval::<String>("custom").unwrap(), "replaced");
        assert!(!runtime.contains_key("customhost"));
        assert_eq!(runtime.live_handles(), 0);
    }

    #[test]
    fn test_unit_override_needs_no_temporary() {
        let overrides = [
            InjectionOverride::Script(Dynamic::UNIT),
            InjectionOverride::Host(HostValue::Unit),
        ];
        for replacement in overrides {
            let mut hook = MockClassInterceptor::new();
            hook.expect_object_injector_override()
                .return_once(move |_| Some(replacement));
            hook.expect_constructor_script_body().never();

            let adapter = HostAdapter::new();
            let mut runtime = ScriptRuntime::new();
            adapter
                .inject_class_intercepted(&mut runtime, &gauge_class(), Arc::new(hook))
                .unwrap();

            let id = adapter
                .inject_object(&mut runtime, Some("nothing"), gauge(1))
                .unwrap();
            assert_eq!(id, "nothing");
            assert!(!runtime.contains_key("nothinghost"));
            // A unit global reads as unset
            assert!(!runtime.contains_key("nothing"));
            assert_eq!(runtime.live_handles(), 0);
        }
    }

    #[test]
    fn test_body_must_leave_object_map() {
        let mut hook = MockClassInterceptor::new();
        hook.expect_object_injector_override().returning(|_| None);
        hook.expect_constructor_script_body()
            .returning(|| "object = 5;".to_string());

        let adapter = HostAdapter::new();
        let mut runtime = ScriptRuntime::new();
        adapter
            .inject_class_intercepted(&mut runtime, &gauge_class(), Arc::new(hook))
            .unwrap();

        let err = adapter.inject_object(&mut runtime, Some("broken"), gauge(1)).unwrap_err();
        assert!(matches!(err, ScriptError::TypeError { .. }));
        assert_eq!(runtime.live_handles(), 0);
        assert!(!runtime.contains_key("broken"));
    }

    #[test]
    fn test_non_object_values_rejected() {
        let adapter = HostAdapter::new();
        let mut runtime = ScriptRuntime::new();

        let err = adapter
            .inject_object(&mut runtime, None, HostValue::Int(1))
            .unwrap_err();
        assert!(matches!(err, ScriptError::TypeError { .. }));
        assert_eq!(runtime.executions(), 0);
    }

    #[test]
    fn test_injected_instance_is_registered() {
        let adapter = HostAdapter::new();
        let mut runtime = ScriptRuntime::new();
        let value = gauge(9);
        let object = value.as_object().unwrap().clone();

        let id = adapter.inject_object(&mut runtime, None, value).unwrap();
        let host_ref = runtime
            .get(&id)
            .and_then(|handle| handle.cast::<HostRef>())
            .unwrap();

        let cache = adapter.cache_for(&runtime);
        assert!(cache
            .instance(host_ref.id())
            .is_some_and(|o| o.ptr_eq(&object)));
    }
}
