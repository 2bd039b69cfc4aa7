//! Per-runtime proxy caches and the registry that owns them

use crate::interceptor::ClassInterceptor;
use crate::proxy::ClassProxy;
use crate::runtime::{DeferredQueue, RuntimeId, ScriptRuntime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hostbridge_core::{ClassId, HostClass, HostObject, WeakHostObject};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Identity table size that triggers pruning of dead entries
const PRUNE_THRESHOLD: usize = 64;

/// Identity of a host instance attached to a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Raw numeric id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Class proxies and attached instances of one runtime
#[derive(Debug)]
pub struct RuntimeCache {
    runtime: RuntimeId,
    classes: DashMap<ClassId, Arc<ClassProxy>>,
    instances: DashMap<InstanceId, WeakHostObject>,
    next_instance: AtomicU64,
    prune_at: AtomicUsize,
    proxies_created: AtomicU64,
    installs: DeferredQueue,
}

impl RuntimeCache {
    /// Create an empty cache for `runtime`.
    ///
    /// Proxies created later install their instance dispatchers into
    /// `runtime` before its next evaluation.
    pub fn new(runtime: &ScriptRuntime) -> Self {
        Self {
            runtime: runtime.id(),
            classes: DashMap::new(),
            instances: DashMap::new(),
            next_instance: AtomicU64::new(1),
            prune_at: AtomicUsize::new(PRUNE_THRESHOLD),
            proxies_created: AtomicU64::new(0),
            installs: runtime.deferred(),
        }
    }

    /// Runtime this cache belongs to
    pub fn runtime(&self) -> RuntimeId {
        self.runtime
    }

    /// Proxy for `class`, created on first request.
    ///
    /// The interceptor only takes effect when the proxy is created; one
    /// passed for an already cached class is ignored.
    pub fn proxy_for(
        self: &Arc<Self>,
        class: &Arc<HostClass>,
        interceptor: Option<Arc<dyn ClassInterceptor>>,
    ) -> Arc<ClassProxy> {
        match self.classes.entry(class.id()) {
            Entry::Occupied(entry) => {
                let proxy = Arc::clone(entry.get());
                if let Some(requested) = &interceptor {
                    if !proxy.uses_interceptor(requested) {
                        debug!(
                            runtime = %self.runtime,
                            class = class.name(),
                            "Class already proxied, ignoring new interceptor"
                        );
                    }
                }
                proxy
            }
            Entry::Vacant(entry) => {
                let proxy = Arc::new(ClassProxy::new(
                    Arc::clone(class),
                    interceptor,
                    Arc::downgrade(self),
                ));
                entry.insert(Arc::clone(&proxy));
                self.proxies_created.fetch_add(1, Ordering::Relaxed);

                let pending = Arc::clone(&proxy);
                self.installs.push(move |runtime: &mut ScriptRuntime| {
                    pending.install(runtime);
                });
                debug!(
                    runtime = %self.runtime,
                    class = class.name(),
                    intercepted = proxy.interceptor().is_some(),
                    "Class proxy created"
                );
                proxy
            }
        }
    }

    /// Cached proxy for `class`, if any
    pub fn cached_proxy(&self, class: ClassId) -> Option<Arc<ClassProxy>> {
        self.classes.get(&class).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of proxied classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of proxies ever created by this cache
    pub fn proxies_created(&self) -> u64 {
        self.proxies_created.load(Ordering::Relaxed)
    }

    /// Record `object` as attached and return its identity.
    ///
    /// Dead entries are pruned whenever the table reaches twice its size
    /// after the previous prune.
    pub fn register_instance(&self, object: &HostObject) -> InstanceId {
        let id = InstanceId(self.next_instance.fetch_add(1, Ordering::Relaxed));
        self.instances.insert(id, object.downgrade());
        trace!(
            runtime = %self.runtime,
            instance = %id,
            class = object.class().name(),
            "Instance registered"
        );

        if self.instances.len() >= self.prune_at.load(Ordering::Relaxed) {
            self.prune_instances();
            let next = (self.instances.len() * 2).max(PRUNE_THRESHOLD);
            self.prune_at.store(next, Ordering::Relaxed);
        }
        id
    }

    /// Attached instance `id`, if still alive
    pub fn instance(&self, id: InstanceId) -> Option<HostObject> {
        self.instances.get(&id).and_then(|weak| weak.upgrade())
    }

    /// Number of identity entries, dead ones included
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Drop entries whose instance is gone; returns how many were removed
    pub fn prune_instances(&self) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, weak| !weak.is_dead());
        let removed = before.saturating_sub(self.instances.len());
        if removed > 0 {
            debug!(runtime = %self.runtime, removed, "Pruned dead instances");
        }
        removed
    }
}

/// Owner of every [`RuntimeCache`], keyed by runtime identity.
///
/// Entries are removed when their runtime is dropped. The registry never
/// keeps a runtime alive.
#[derive(Debug, Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<DashMap<RuntimeId, Arc<RuntimeCache>>>,
}

impl CacheRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache of `runtime`, created on first access
    pub fn get_or_create(&self, runtime: &ScriptRuntime) -> Arc<RuntimeCache> {
        let id = runtime.id();
        match self.caches.entry(id) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let cache = Arc::new(RuntimeCache::new(runtime));
                entry.insert(Arc::clone(&cache));

                let caches = Arc::downgrade(&self.caches);
                runtime.on_destroy(move |id| {
                    if let Some(caches) = caches.upgrade() {
                        if caches.remove(&id).is_some() {
                            debug!(runtime = %id, "Runtime cache released");
                        }
                    }
                });

                debug!(runtime = %id, "Runtime cache created");
                cache
            }
        }
    }

    /// Cache of runtime `id`, if present
    pub fn get(&self, id: RuntimeId) -> Option<Arc<RuntimeCache>> {
        self.caches.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Forget the cache of runtime `id`; returns whether one existed
    pub fn runtime_destroyed(&self, id: RuntimeId) -> bool {
        let removed = self.caches.remove(&id).is_some();
        if removed {
            debug!(runtime = %id, "Runtime cache released");
        }
        removed
    }

    /// Number of live caches
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Whether no cache is held
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}
