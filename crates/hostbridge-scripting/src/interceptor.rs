//! Per-class interception hooks
//!
//! A [`ClassInterceptor`] is attached to a class the first time it is
//! injected into a runtime. It contributes script text that runs while an
//! injected instance is built, and may replace the injected value entirely.

use hostbridge_core::{HostObject, HostValue};
use rhai::Dynamic;
use std::fmt;
use std::sync::Arc;

/// Replacement for the default wrapping of an injected instance
#[derive(Debug, Clone)]
pub enum InjectionOverride {
    /// Already a script value, bound as is
    Script(Dynamic),
    /// Host value, translated before binding
    Host(HostValue),
}

/// Customizes how instances of one class are injected
#[cfg_attr(test, mockall::automock)]
pub trait ClassInterceptor: Send + Sync {
    /// Script statements run while the injected value is built.
    ///
    /// The fresh value is bound to `object`; properties assigned on it stay
    /// visible on the injected instance.
    fn constructor_script_body(&self) -> String;

    /// Value to inject instead of `instance`, or `None` for the default path
    fn object_injector_override(&self, _instance: &HostObject) -> Option<InjectionOverride> {
        None
    }
}

/// Interceptor contributing only constructor body text
#[derive(Debug, Clone)]
pub struct ConstructorBody {
    body: String,
}

impl ConstructorBody {
    /// Create an interceptor running `body`
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl ClassInterceptor for ConstructorBody {
    fn constructor_script_body(&self) -> String {
        self.body.clone()
    }
}

type InjectorFn = dyn Fn(&HostObject) -> Option<InjectionOverride> + Send + Sync;

/// Interceptor that can override the injected value per instance
#[derive(Clone)]
pub struct OverrideInterceptor {
    body: String,
    injector: Arc<InjectorFn>,
}

impl OverrideInterceptor {
    /// Create an interceptor with constructor `body` and override `injector`
    pub fn new<F>(body: impl Into<String>, injector: F) -> Self
    where
        F: Fn(&HostObject) -> Option<InjectionOverride> + Send + Sync + 'static,
    {
        Self {
            body: body.into(),
            injector: Arc::new(injector),
        }
    }
}

impl ClassInterceptor for OverrideInterceptor {
    fn constructor_script_body(&self) -> String {
        self.body.clone()
    }

    fn object_injector_override(&self, instance: &HostObject) -> Option<InjectionOverride> {
        (self.injector)(instance)
    }
}

impl fmt::Debug for OverrideInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideInterceptor")
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_core::HostClass;

    struct Badge(&'static str);

    fn badge() -> HostObject {
        let class = HostClass::builder::<Badge>().name("test::Badge").build();
        HostObject::new(class, Badge("staff"))
    }

    #[test]
    fn test_constructor_body_never_overrides() {
        let hook = ConstructorBody::new("object.kind = \"badge\";");
        assert_eq!(hook.constructor_script_body(), "object.kind = \"badge\";");
        assert!(hook.object_injector_override(&badge()).is_none());
    }

    #[test]
    fn test_override_closure_sees_instance() {
        let hook = OverrideInterceptor::new("", |object: &HostObject| {
            let badge = object.downcast_ref::<Badge>()?;
            Some(InjectionOverride::Host(HostValue::from(badge.0)))
        });

        match hook.object_injector_override(&badge()) {
            Some(InjectionOverride::Host(value)) => assert_eq!(value, HostValue::from("staff")),
            other => panic!("unexpected override: {other:?}"),
        }
    }
}
