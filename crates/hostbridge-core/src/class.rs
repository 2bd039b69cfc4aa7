//! Class descriptors
//!
//! A [`HostClass`] describes a Rust type to the bridge: how to construct it,
//! which fields and instance methods it exposes, and which static methods live
//! on its constructor. Descriptors are built once with [`ClassBuilder`] and
//! shared behind an [`Arc`].
//!
//! ```
//! use hostbridge_core::{HostClass, HostValue};
//!
//! struct Point { x: i64, y: i64 }
//!
//! let class = HostClass::builder::<Point>()
//!     .name("geometry::Point")
//!     .constructor(2, |call| Ok(Point { x: call.int(0)?, y: call.int(1)? }))
//!     .field("x", |p: &Point| HostValue::Int(p.x))
//!     .field("y", |p: &Point| HostValue::Int(p.y))
//!     .static_method("origin", 0, |call| Ok(call.instance(Point { x: 0, y: 0 })))
//!     .build();
//!
//! assert_eq!(class.simple_name(), "Point");
//! ```

use crate::error::{Error, Result};
use crate::object::HostObject;
use crate::value::HostValue;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type ConstructorFn = dyn Fn(&Invocation<'_>) -> Result<HostObject> + Send + Sync;
type GetterFn = dyn Fn(&HostObject) -> Result<HostValue> + Send + Sync;
type SetterFn = dyn Fn(&HostObject, HostValue) -> Result<()> + Send + Sync;
type MethodFn = dyn Fn(&HostObject, &Invocation<'_>) -> Result<HostValue> + Send + Sync;
type StaticFn = dyn Fn(&Invocation<'_>) -> Result<HostValue> + Send + Sync;

/// Identity of a host class (the [`TypeId`] of the described Rust type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(TypeId);

impl ClassId {
    /// Class identity of `T`
    pub fn of<T: Any>() -> Self {
        Self(TypeId::of::<T>())
    }
}

/// Arguments of a host call plus the class the call is dispatched on
#[derive(Debug)]
pub struct Invocation<'a> {
    class: &'a Arc<HostClass>,
    args: &'a [HostValue],
}

impl<'a> Invocation<'a> {
    /// Create an invocation
    pub fn new(class: &'a Arc<HostClass>, args: &'a [HostValue]) -> Self {
        Self { class, args }
    }

    /// Class the call is dispatched on
    pub fn class(&self) -> &Arc<HostClass> {
        self.class
    }

    /// All arguments
    pub fn args(&self) -> &[HostValue] {
        self.args
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> Result<&HostValue> {
        self.args.get(index).ok_or(Error::IndexOutOfBounds {
            index: index as i64,
            len: self.args.len(),
        })
    }

    /// Integer argument at `index`
    pub fn int(&self, index: usize) -> Result<i64> {
        self.arg(index)?.as_int()
    }

    /// Float argument at `index` (integers widen)
    pub fn float(&self, index: usize) -> Result<f64> {
        self.arg(index)?.as_float()
    }

    /// Boolean argument at `index`
    pub fn bool(&self, index: usize) -> Result<bool> {
        self.arg(index)?.as_bool()
    }

    /// String argument at `index`
    pub fn str(&self, index: usize) -> Result<&str> {
        self.arg(index)?.as_str()
    }

    /// Object argument at `index`, borrowed as `T`
    pub fn object<T: Any>(&self, index: usize) -> Result<&T> {
        self.arg(index)?.downcast_ref::<T>()
    }

    /// Wrap `value` as a new instance of the dispatching class
    pub fn instance<T: Any + Send + Sync>(&self, value: T) -> HostValue {
        HostValue::Object(HostObject::new(Arc::clone(self.class), value))
    }
}

/// Constructor overload
pub struct Constructor {
    arity: usize,
    func: Arc<ConstructorFn>,
}

impl Constructor {
    /// Declared argument count
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Readable (and optionally writable) field
pub struct Field {
    name: String,
    getter: Arc<GetterFn>,
    setter: Option<Arc<SetterFn>>,
}

impl Field {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field can be assigned
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Read the field from `object`
    pub fn get(&self, object: &HostObject) -> Result<HostValue> {
        (self.getter)(object)
    }
}

/// Instance method overload
pub struct Method {
    name: String,
    arity: usize,
    func: Arc<MethodFn>,
}

impl Method {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument count (receiver excluded)
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Static method overload
pub struct StaticMethod {
    name: String,
    arity: usize,
    func: Arc<StaticFn>,
}

impl StaticMethod {
    /// Method name as seen by scripts
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument count
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Descriptor of a host class
pub struct HostClass {
    id: ClassId,
    name: String,
    constructors: Vec<Constructor>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    static_methods: Vec<StaticMethod>,
}

impl HostClass {
    /// Start describing `T`
    pub fn builder<T: Any + Send + Sync>() -> ClassBuilder<T> {
        ClassBuilder::new()
    }

    /// Class identity
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Fully-qualified name (`::`-separated)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment of the name, without generic arguments
    pub fn simple_name(&self) -> &str {
        let base = self.name.split('<').next().unwrap_or_default();
        base.rsplit("::").next().unwrap_or_default()
    }

    /// Name usable as a script identifier.
    ///
    /// The simple name when it is a valid identifier, otherwise the full name
    /// with `::` separators and other invalid characters replaced by `_`.
    pub fn script_safe_name(&self) -> String {
        let simple = self.simple_name();
        if is_identifier(simple) {
            return simple.to_string();
        }
        self.name
            .split("::")
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }

    /// Constructor overloads
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Declared fields
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Instance method overloads
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Static method overloads
    pub fn static_methods(&self) -> &[StaticMethod] {
        &self.static_methods
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Distinct constructor arities, ascending
    pub fn constructor_arities(&self) -> Vec<usize> {
        let mut arities: Vec<usize> = self.constructors.iter().map(|c| c.arity).collect();
        arities.sort_unstable();
        arities.dedup();
        arities
    }

    /// Build an instance with the constructor matching `args.len()`
    pub fn construct(self: &Arc<Self>, args: &[HostValue]) -> Result<HostObject> {
        let constructor = self
            .constructors
            .iter()
            .find(|c| c.arity == args.len())
            .ok_or_else(|| Error::NoConstructor {
                class: self.name.clone(),
                arity: args.len(),
            })?;
        (constructor.func)(&Invocation::new(self, args))
    }

    /// Read field `name` of `object`
    pub fn get_field(&self, object: &HostObject, name: &str) -> Result<HostValue> {
        self.field(name)
            .ok_or_else(|| Error::member_not_found(&self.name, name))?
            .get(object)
    }

    /// Assign field `name` of `object`
    pub fn set_field(&self, object: &HostObject, name: &str, value: HostValue) -> Result<()> {
        let field = self
            .field(name)
            .ok_or_else(|| Error::member_not_found(&self.name, name))?;
        let setter = field.setter.as_ref().ok_or_else(|| Error::ReadOnlyField {
            class: self.name.clone(),
            field: name.to_string(),
        })?;
        setter(object, value)
    }

    /// Call instance method `name` on `object`, picking the overload by arity
    pub fn invoke_method(
        self: &Arc<Self>,
        object: &HostObject,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue> {
        let method = self.resolve(&self.methods, name, args.len(), |m| (&m.name, m.arity))?;
        (method.func)(object, &Invocation::new(self, args))
    }

    /// Call static method `name`, picking the overload by arity
    pub fn invoke_static(self: &Arc<Self>, name: &str, args: &[HostValue]) -> Result<HostValue> {
        let method = self.resolve(&self.static_methods, name, args.len(), |m| {
            (&m.name, m.arity)
        })?;
        (method.func)(&Invocation::new(self, args))
    }

    fn resolve<'m, M>(
        &self,
        members: &'m [M],
        name: &str,
        arity: usize,
        key: impl Fn(&M) -> (&String, usize),
    ) -> Result<&'m M> {
        let mut named = members.iter().filter(|m| key(m).0 == name).peekable();
        let Some(first) = named.peek() else {
            return Err(Error::member_not_found(&self.name, name));
        };
        let expected = key(first).1;
        named
            .find(|m| key(m).1 == arity)
            .ok_or_else(|| Error::ArityMismatch {
                member: format!("{}.{}", self.simple_name(), name),
                expected,
                actual: arity,
            })
    }
}

impl fmt::Debug for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClass")
            .field("name", &self.name)
            .field("constructors", &self.constructor_arities())
            .field(
                "fields",
                &self.fields.iter().map(|x| x.name.as_str()).collect::<Vec<_>>(),
            )
            .field(
                "methods",
                &self.methods.iter().map(|x| x.name.as_str()).collect::<Vec<_>>(),
            )
            .field(
                "static_methods",
                &self
                    .static_methods
                    .iter()
                    .map(|x| x.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").field("arity", &self.arity).finish()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("writable", &self.is_writable())
            .finish()
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl fmt::Debug for StaticMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticMethod")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Builder for [`HostClass`] descriptors of type `T`
pub struct ClassBuilder<T> {
    name: String,
    constructors: Vec<Constructor>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    static_methods: Vec<StaticMethod>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// Create a builder named after the Rust type
    pub fn new() -> Self {
        Self {
            name: std::any::type_name::<T>().to_string(),
            constructors: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            static_methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Override the fully-qualified class name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a constructor taking `arity` arguments
    pub fn constructor<F>(mut self, arity: usize, func: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            arity,
            func: Arc::new(move |call: &Invocation<'_>| -> Result<HostObject> {
                let value = func(call)?;
                Ok(HostObject::new(Arc::clone(call.class()), value))
            }),
        });
        self
    }

    /// Add a read-only field
    pub fn field<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> HostValue + Send + Sync + 'static,
    {
        self.fields.push(Field {
            name: name.into(),
            getter: Arc::new(move |object: &HostObject| -> Result<HostValue> {
                Ok(getter(object.expect_ref::<T>()?))
            }),
            setter: None,
        });
        self
    }

    /// Add a writable field; `T` is responsible for its own interior mutability
    pub fn field_mut<G, S>(mut self, name: impl Into<String>, getter: G, setter: S) -> Self
    where
        G: Fn(&T) -> HostValue + Send + Sync + 'static,
        S: Fn(&T, HostValue) -> Result<()> + Send + Sync + 'static,
    {
        self.fields.push(Field {
            name: name.into(),
            getter: Arc::new(move |object: &HostObject| -> Result<HostValue> {
                Ok(getter(object.expect_ref::<T>()?))
            }),
            setter: Some(Arc::new(move |object: &HostObject, value: HostValue| -> Result<()> {
                setter(object.expect_ref::<T>()?, value)
            })),
        });
        self
    }

    /// Add an instance method taking `arity` arguments
    pub fn method<F>(mut self, name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(&T, &Invocation<'_>) -> Result<HostValue> + Send + Sync + 'static,
    {
        self.methods.push(Method {
            name: name.into(),
            arity,
            func: Arc::new(move |object: &HostObject, call: &Invocation<'_>| -> Result<HostValue> {
                func(object.expect_ref::<T>()?, call)
            }),
        });
        self
    }

    /// Add a static method taking `arity` arguments
    pub fn static_method<F>(mut self, name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<HostValue> + Send + Sync + 'static,
    {
        self.static_methods.push(StaticMethod {
            name: name.into(),
            arity,
            func: Arc::new(func),
        });
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> Arc<HostClass> {
        Arc::new(HostClass {
            id: ClassId::of::<T>(),
            name: self.name,
            constructors: self.constructors,
            fields: self.fields,
            methods: self.methods,
            static_methods: self.static_methods,
        })
    }
}

impl<T: Any + Send + Sync> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ClassBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct Point {
        x: i64,
        y: i64,
    }

    struct Counter(AtomicI64);

    fn point_class() -> Arc<HostClass> {
        HostClass::builder::<Point>()
            .name("geometry::Point")
            .constructor(0, |_| Ok(Point { x: 0, y: 0 }))
            .constructor(2, |call| {
                Ok(Point {
                    x: call.int(0)?,
                    y: call.int(1)?,
                })
            })
            .field("x", |p: &Point| HostValue::Int(p.x))
            .field("y", |p: &Point| HostValue::Int(p.y))
            .method("shifted", 2, |p: &Point, call| {
                Ok(call.instance(Point {
                    x: p.x + call.int(0)?,
                    y: p.y + call.int(1)?,
                }))
            })
            .static_method("origin", 0, |call| Ok(call.instance(Point { x: 0, y: 0 })))
            .build()
    }

    #[test]
    fn test_names() {
        let class = point_class();
        assert_eq!(class.name(), "geometry::Point");
        assert_eq!(class.simple_name(), "Point");
        assert_eq!(class.script_safe_name(), "Point");
    }

    #[test]
    fn test_default_name_is_type_name() {
        let class = HostClass::builder::<Point>().build();
        assert_eq!(class.name(), std::any::type_name::<Point>());
        assert_eq!(class.simple_name(), "Point");
    }

    #[test]
    fn test_script_safe_name_for_anonymous_class() {
        let class = HostClass::builder::<Point>()
            .name("geo::shapes::{{closure}}")
            .build();
        assert_eq!(class.simple_name(), "{{closure}}");
        assert_eq!(class.script_safe_name(), "geo_shapes___closure__");

        let empty = HostClass::builder::<Counter>().name("geo::shapes::").build();
        assert_eq!(empty.simple_name(), "");
        assert_eq!(empty.script_safe_name(), "geo_shapes");
    }

    #[test]
    fn test_generic_simple_name() {
        let class = HostClass::builder::<Point>()
            .name("geo::Wrapper<geo::Point>")
            .build();
        assert_eq!(class.simple_name(), "Wrapper");
    }

    #[test]
    fn test_construct_by_arity() {
        let class = point_class();
        let object = class
            .construct(&[HostValue::Int(3), HostValue::Int(4)])
            .unwrap();
        assert_eq!(class.get_field(&object, "x").unwrap(), HostValue::Int(3));

        let origin = class.construct(&[]).unwrap();
        assert_eq!(class.get_field(&origin, "y").unwrap(), HostValue::Int(0));

        let err = class.construct(&[HostValue::Int(1)]).unwrap_err();
        assert!(matches!(err, Error::NoConstructor { arity: 1, .. }));
        assert_eq!(class.constructor_arities(), vec![0, 2]);
    }

    #[test]
    fn test_invoke_method_and_static() {
        let class = point_class();
        let object = class
            .construct(&[HostValue::Int(1), HostValue::Int(1)])
            .unwrap();

        let shifted = class
            .invoke_method(&object, "shifted", &[HostValue::Int(2), HostValue::Int(3)])
            .unwrap();
        assert_eq!(shifted.downcast_ref::<Point>().unwrap().x, 3);

        let origin = class.invoke_static("origin", &[]).unwrap();
        assert_eq!(origin.downcast_ref::<Point>().unwrap().y, 0);
    }

    #[test]
    fn test_resolution_errors() {
        let class = point_class();
        let object = class.construct(&[]).unwrap();

        let missing = class.invoke_method(&object, "scale", &[]).unwrap_err();
        assert!(matches!(missing, Error::MemberNotFound { .. }));

        let arity = class
            .invoke_method(&object, "shifted", &[HostValue::Int(1)])
            .unwrap_err();
        assert!(matches!(
            arity,
            Error::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_writable_field() {
        let class = HostClass::builder::<Counter>()
            .name("Counter")
            .constructor(0, |_| Ok(Counter(AtomicI64::new(0))))
            .field_mut(
                "value",
                |c: &Counter| HostValue::Int(c.0.load(Ordering::SeqCst)),
                |c: &Counter, v| {
                    c.0.store(v.as_int()?, Ordering::SeqCst);
                    Ok(())
                },
            )
            .field("label", |_: &Counter| HostValue::from("counter"))
            .build();

        let object = class.construct(&[]).unwrap();
        class.set_field(&object, "value", HostValue::Int(9)).unwrap();
        assert_eq!(class.get_field(&object, "value").unwrap(), HostValue::Int(9));

        let err = class
            .set_field(&object, "label", HostValue::from("x"))
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnlyField { .. }));
    }
}
