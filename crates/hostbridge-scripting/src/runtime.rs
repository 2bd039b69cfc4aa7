//! Rhai runtime with a persistent global container
//!
//! A [`ScriptRuntime`] owns one Rhai [`Engine`] plus the runtime's global
//! object: a name to value map that is pushed into a fresh [`Scope`] for every
//! evaluation and written back afterwards. A global holding `()` counts as
//! unset and is dropped on write-back.

use crate::error::{Result, RhaiResultOf, ScriptError};
use crate::script_object;
use hostbridge_config::RuntimeConfig;
use parking_lot::Mutex;
use rhai::{Dynamic, Engine, Scope};
use std::any::TypeId;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Native callable taking script arguments
pub type NativeFn = Arc<dyn Fn(Vec<Dynamic>) -> RhaiResultOf<Dynamic> + Send + Sync>;

/// Native callable invoked on a receiver of type `T`
pub type ReceiverFn<T> = Arc<dyn Fn(T, Vec<Dynamic>) -> RhaiResultOf<Dynamic> + Send + Sync>;

type TeardownFn = Box<dyn FnOnce(RuntimeId) + Send>;

type DeferredFn = Box<dyn FnOnce(&mut ScriptRuntime) + Send>;

/// Work queued from inside native calls, run before the next evaluation.
///
/// The engine cannot take new registrations while a script is running, so
/// proxies created mid-script install their dispatchers through this queue.
#[derive(Clone, Default)]
pub(crate) struct DeferredQueue(Arc<Mutex<Vec<DeferredFn>>>);

impl DeferredQueue {
    pub(crate) fn push<F>(&self, work: F)
    where
        F: FnOnce(&mut ScriptRuntime) + Send + 'static,
    {
        self.0.lock().push(Box::new(work));
    }

    fn take(&self) -> Vec<DeferredFn> {
        std::mem::take(&mut *self.0.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.0.lock().len()
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeferredQueue({})", self.len())
    }
}

/// Unique identity of a [`ScriptRuntime`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId(u64);

impl RuntimeId {
    fn next() -> Self {
        Self(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DispatchKey {
    receiver: TypeId,
    name: String,
    arity: usize,
}

/// One embedded Rhai runtime
pub struct ScriptRuntime {
    id: RuntimeId,
    engine: Engine,
    globals: BTreeMap<String, Dynamic>,
    dispatchers: HashSet<DispatchKey>,
    live_handles: Arc<AtomicUsize>,
    executions: u64,
    deferred: DeferredQueue,
    teardown: Mutex<Vec<TeardownFn>>,
}

impl ScriptRuntime {
    /// Create a runtime with default engine limits
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::default())
    }

    /// Create a runtime with the given engine limits
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let mut engine = Engine::new();

        engine.set_max_operations(config.max_operations);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_function_expr_depth);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);

        engine.on_print(|text| info!(target: "hostbridge::script", "{}", text));
        engine.on_debug(|text, source, pos| {
            debug!(
                target: "hostbridge::script",
                source = source.unwrap_or_default(),
                line = pos.line().unwrap_or_default(),
                "{}",
                text
            );
        });

        script_object::register_builtins(&mut engine);

        let id = RuntimeId::next();
        debug!(runtime = %id, "Script runtime created");

        Self {
            id,
            engine,
            globals: BTreeMap::new(),
            dispatchers: HashSet::new(),
            live_handles: Arc::new(AtomicUsize::new(0)),
            executions: 0,
            deferred: DeferredQueue::default(),
            teardown: Mutex::new(Vec::new()),
        }
    }

    /// Runtime identity
    pub fn id(&self) -> RuntimeId {
        self.id
    }

    /// Evaluate `script` against the global container.
    ///
    /// Top-level bindings made by the script become globals. The container is
    /// written back even when evaluation fails part-way.
    pub fn execute(&mut self, script: &str) -> Result<Dynamic> {
        self.run_deferred();
        self.executions += 1;

        let mut scope = Scope::new();
        for (name, value) in &self.globals {
            scope.push_dynamic(name.clone(), value.clone());
        }

        let result = self.engine.eval_with_scope::<Dynamic>(&mut scope, script);

        let mut globals = BTreeMap::new();
        for (name, _, value) in scope.iter() {
            globals.insert(name.to_string(), value);
        }
        globals.retain(|_, value: &mut Dynamic| !value.is_unit());
        self.globals = globals;

        match result {
            Ok(value) => {
                trace!(runtime = %self.id, result = %value.type_name(), "Script executed");
                Ok(value)
            }
            Err(err) => {
                debug!(runtime = %self.id, error = %err, "Script failed");
                Err(err.into())
            }
        }
    }

    /// Evaluate `script` and hold the result as a [`ScriptValue`] handle
    pub fn execute_object_script(&mut self, script: &str) -> Result<ScriptValue> {
        let value = self.execute(script)?;
        Ok(self.handle(value))
    }

    /// Evaluate `script` and cast the result to `T`
    pub fn eval<T: Clone + Send + Sync + 'static>(&mut self, script: &str) -> Result<T> {
        let value = self.execute(script)?;
        let found = value.type_name().to_string();
        value.try_cast::<T>().ok_or_else(|| {
            ScriptError::type_error(format!(
                "expected {}, found {}",
                std::any::type_name::<T>(),
                found
            ))
        })
    }

    /// Bind `name` in the global container
    pub fn add(&mut self, name: impl Into<String>, value: Dynamic) {
        let name = name.into();
        if value.is_unit() {
            self.globals.remove(&name);
        } else {
            self.globals.insert(name, value);
        }
    }

    /// Acquire a handle to global `name`
    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.globals
            .get(name)
            .map(|value| self.handle(value.clone()))
    }

    /// Unbind global `name`
    pub fn remove(&mut self, name: &str) -> Option<Dynamic> {
        self.globals.remove(name)
    }

    /// Names of all globals, sorted
    pub fn keys(&self) -> Vec<String> {
        self.globals.keys().cloned().collect()
    }

    /// Whether global `name` is bound
    pub fn contains_key(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// Register a free native function taking `arity` arguments of any type
    pub fn register_function(&mut self, name: &str, arity: usize, func: NativeFn) {
        let arg_types = vec![TypeId::of::<Dynamic>(); arity];

        #[allow(deprecated)]
        self.engine.register_raw_fn(name, arg_types, move |_ctx, args| {
            let args = args.iter_mut().map(|arg| std::mem::take(*arg)).collect();
            func(args)
        });
        trace!(runtime = %self.id, function = name, arity, "Native function registered");
    }

    /// Register a method callable as `receiver.name(...)` on values of type `T`.
    ///
    /// Returns `false` when a method with the same receiver, name and arity
    /// is already registered; the existing one is kept.
    pub fn register_method<T: Clone + Send + Sync + 'static>(
        &mut self,
        name: &str,
        arity: usize,
        func: ReceiverFn<T>,
    ) -> bool {
        let key = DispatchKey {
            receiver: TypeId::of::<T>(),
            name: name.to_string(),
            arity,
        };
        if !self.dispatchers.insert(key) {
            return false;
        }

        let mut arg_types = Vec::with_capacity(arity + 1);
        arg_types.push(TypeId::of::<T>());
        arg_types.extend(std::iter::repeat(TypeId::of::<Dynamic>()).take(arity));

        let method = name.to_string();
        #[allow(deprecated)]
        self.engine.register_raw_fn(name, arg_types, move |_ctx, args| {
            let Some((receiver, rest)) = args.split_first_mut() else {
                return Err(ScriptError::runtime(format!("{method}: missing receiver")).into_rhai());
            };
            let receiver = receiver.clone().try_cast::<T>().ok_or_else(|| {
                ScriptError::type_error(format!(
                    "{method}: receiver is {}, expected {}",
                    receiver.type_name(),
                    std::any::type_name::<T>()
                ))
                .into_rhai()
            })?;
            let rest = rest.iter_mut().map(|arg| std::mem::take(*arg)).collect();
            func(receiver, rest)
        });
        trace!(runtime = %self.id, method = name, arity, "Native method registered");
        true
    }

    /// Register `receiver.name` property access on values of type `T`.
    ///
    /// Returns `false` when the property is already registered for `T`.
    pub fn register_property<T, G, S>(&mut self, name: &str, getter: G, setter: S) -> bool
    where
        T: Clone + Send + Sync + 'static,
        G: Fn(&mut T) -> RhaiResultOf<Dynamic> + Send + Sync + 'static,
        S: Fn(&mut T, Dynamic) -> RhaiResultOf<()> + Send + Sync + 'static,
    {
        let key = DispatchKey {
            receiver: TypeId::of::<T>(),
            name: format!("property${name}"),
            arity: 0,
        };
        if !self.dispatchers.insert(key) {
            return false;
        }

        self.engine.register_get(name, getter);
        self.engine.register_set(name, setter);
        true
    }

    /// Number of [`ScriptValue`] handles not yet released
    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }

    /// Number of scripts executed so far
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Run `callback` when this runtime is dropped
    pub fn on_destroy<F>(&self, callback: F)
    where
        F: FnOnce(RuntimeId) + Send + 'static,
    {
        self.teardown.lock().push(Box::new(callback));
    }

    pub(crate) fn deferred(&self) -> DeferredQueue {
        self.deferred.clone()
    }

    /// Run work queued by native calls since the last evaluation
    pub(crate) fn run_deferred(&mut self) {
        loop {
            let pending = self.deferred.take();
            if pending.is_empty() {
                break;
            }
            trace!(runtime = %self.id, pending = pending.len(), "Running deferred work");
            for work in pending {
                work(self);
            }
        }
    }

    fn handle(&self, value: Dynamic) -> ScriptValue {
        self.live_handles.fetch_add(1, Ordering::SeqCst);
        ScriptValue {
            value,
            live: Arc::clone(&self.live_handles),
        }
    }
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScriptRuntime {
    fn drop(&mut self) {
        let callbacks = std::mem::take(&mut *self.teardown.lock());
        debug!(runtime = %self.id, callbacks = callbacks.len(), "Script runtime destroyed");
        for callback in callbacks {
            callback(self.id);
        }
    }
}

impl fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("id", &self.id)
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("dispatchers", &self.dispatchers.len())
            .field("live_handles", &self.live_handles())
            .field("executions", &self.executions)
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

/// Counted handle to a script value.
///
/// Live until dropped or [`released`](ScriptValue::release); the owning
/// runtime reports outstanding handles through
/// [`ScriptRuntime::live_handles`].
pub struct ScriptValue {
    value: Dynamic,
    live: Arc<AtomicUsize>,
}

impl ScriptValue {
    /// Held value
    pub fn value(&self) -> &Dynamic {
        &self.value
    }

    /// Copy of the held value cast to `T`
    pub fn cast<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.value.clone().try_cast::<T>()
    }

    /// Release the handle
    pub fn release(self) {}
}

impl Drop for ScriptValue {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScriptValue").field(&self.value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::INT;

    #[test]
    fn test_runtime_ids_are_unique() {
        let a = ScriptRuntime::new();
        let b = ScriptRuntime::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_top_level_bindings_become_globals() {
        let mut runtime = ScriptRuntime::new();
        runtime.execute("let answer = 40 + 2;").unwrap();

        assert!(runtime.contains_key("answer"));
        assert_eq!(runtime.eval::<INT>("answer").unwrap(), 42);
        assert_eq!(runtime.executions(), 2);
    }

    #[test]
    fn test_unit_global_is_unset() {
        let mut runtime = ScriptRuntime::new();
        runtime.add("temp", Dynamic::from(1 as INT));
        runtime.execute("temp = ();").unwrap();

        assert!(!runtime.contains_key("temp"));
    }

    #[test]
    fn test_globals_written_back_on_failure() {
        let mut runtime = ScriptRuntime::new();
        let err = runtime.execute("let kept = 1; throw \"boom\";").unwrap_err();

        assert!(matches!(err, ScriptError::RuntimeError { .. }));
        assert!(runtime.contains_key("kept"));
    }

    #[test]
    fn test_eval_type_mismatch() {
        let mut runtime = ScriptRuntime::new();
        let err = runtime.eval::<bool>("1 + 1").unwrap_err();
        assert!(matches!(err, ScriptError::TypeError { .. }));
    }

    #[test]
    fn test_handles_are_counted() {
        let mut runtime = ScriptRuntime::new();
        runtime.add("value", Dynamic::from(5 as INT));

        let first = runtime.get("value").unwrap();
        let second = runtime.execute_object_script("value * 2").unwrap();
        assert_eq!(runtime.live_handles(), 2);
        assert_eq!(second.cast::<INT>(), Some(10));

        first.release();
        drop(second);
        assert_eq!(runtime.live_handles(), 0);
        assert!(runtime.get("missing").is_none());
    }

    #[test]
    fn test_deferred_work_runs_before_next_script() {
        let mut runtime = ScriptRuntime::new();
        let queue = runtime.deferred();
        queue.push(|rt: &mut ScriptRuntime| rt.add("late", Dynamic::from(9 as INT)));
        assert!(!runtime.contains_key("late"));

        assert_eq!(runtime.eval::<INT>("late + 1").unwrap(), 10);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_register_function() {
        let mut runtime = ScriptRuntime::new();
        runtime.register_function(
            "add_all",
            3,
            Arc::new(|args: Vec<Dynamic>| -> RhaiResultOf<Dynamic> {
                Ok(Dynamic::from(args.iter().filter_map(|a| a.as_int().ok()).sum::<INT>()))
            }),
        );

        assert_eq!(runtime.eval::<INT>("add_all(1, 2, 3)").unwrap(), 6);
    }

    #[test]
    fn test_register_method_is_deduplicated() {
        let mut runtime = ScriptRuntime::new();
        let first: ReceiverFn<INT> =
            Arc::new(|n: INT, _: Vec<Dynamic>| -> RhaiResultOf<Dynamic> {
                Ok(Dynamic::from(n * 2))
            });
        let second: ReceiverFn<INT> =
            Arc::new(|n: INT, _: Vec<Dynamic>| -> RhaiResultOf<Dynamic> {
                Ok(Dynamic::from(n * 3))
            });

        assert!(runtime.register_method("scaled", 0, first));
        assert!(!runtime.register_method("scaled", 0, second));
        assert_eq!(runtime.eval::<INT>("let n = 7; n.scaled()").unwrap(), 14);
    }

    #[test]
    fn test_on_destroy_runs_once_with_id() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let runtime = ScriptRuntime::new();
        let id = runtime.id();

        let sink = Arc::clone(&seen);
        runtime.on_destroy(move |id| sink.lock().push(id));
        drop(runtime);

        assert_eq!(*seen.lock(), vec![id]);
    }

    #[test]
    fn test_operation_limit_from_config() {
        let config = RuntimeConfig {
            max_operations: 50,
            ..RuntimeConfig::default()
        };
        let mut runtime = ScriptRuntime::with_config(&config);

        let err = runtime.execute("let x = 0; loop { x += 1; }").unwrap_err();
        assert!(matches!(err, ScriptError::RuntimeError { .. }));
    }
}
