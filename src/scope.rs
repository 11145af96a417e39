use parking_lot::RwLock;
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};
use tracing::debug;

use crate::{
    any::RcAny,
    cache::Cache,
    descriptor::ServiceDescriptor,
    errors::ResolveErrorKind,
    instantiator::{activate, activate_async},
    lock::ActivationLocks,
    provider::Provider,
    resolver::{logged, Chain, Resolver},
};

struct ScopeInner {
    provider: Provider,
    cache: RwLock<Cache>,
    locks: ActivationLocks,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.cache.get_mut().take().finalize();
        debug!("Scope disposed on drop");
    }
}

/// Resolution context for one unit of work.
///
/// Scoped services are built once per scope, singletons come from the [`Provider`] and transients
/// are built on every resolve. Clones share the same scoped instances.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub(crate) fn new(provider: Provider) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                provider,
                cache: RwLock::new(Cache::new()),
                locks: ActivationLocks::new(),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.inner.provider
    }

    /// # Errors
    /// See [`Resolver::resolve`], including when errors come wrapped.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolver(Chain::default()).resolve()
    }

    /// # Errors
    /// See [`Resolver::resolve`].
    pub async fn resolve_async<T>(&self) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolver(Chain::default()).resolve_async().await
    }

    /// Number of scoped instances currently cached.
    #[inline]
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.inner.cache.read().len()
    }

    /// Empties the scoped cache and runs finalizers of the removed instances, most recent first.
    ///
    /// Finalizer failures are logged, never returned. Disposing again is a no-op, and the scope
    /// stays usable: later resolves build fresh scoped instances.
    pub fn dispose(&self) {
        let resolved = self.inner.cache.write().take();
        resolved.finalize();
        debug!("Scope disposed");
    }

    /// Async version of [`Scope::dispose`], awaiting async finalizers.
    pub async fn dispose_async(&self) {
        let resolved = self.inner.cache.write().take();
        resolved.finalize_async().await;
        debug!("Scope disposed");
    }

    fn resolver(&self, chain: Chain) -> Resolver {
        Resolver::new(self.inner.provider.clone(), Some(self.clone()), chain)
    }

    pub(crate) fn get_scoped(&self, descriptor: &ServiceDescriptor, chain: &Chain) -> Result<RcAny, ResolveErrorKind> {
        let identity = descriptor.abstract_identity();

        let cached = self.inner.cache.read().get(&identity);
        if let Some(value) = cached {
            debug!("Found in cache");
            return Ok(value);
        }

        let resolver = self.resolver(chain.clone()).enter(descriptor)?;
        let lock = self.inner.locks.get(identity);
        let _guard = lock.lock_blocking();

        let cached = self.inner.cache.read().get(&identity);
        if let Some(value) = cached {
            debug!("Built by a concurrent resolve");
            return Ok(value);
        }

        let value = logged(activate(descriptor, &resolver))?;
        self.store(descriptor, &value);
        Ok(value)
    }

    pub(crate) async fn get_scoped_async(&self, descriptor: &ServiceDescriptor, chain: &Chain) -> Result<RcAny, ResolveErrorKind> {
        let identity = descriptor.abstract_identity();

        let cached = self.inner.cache.read().get(&identity);
        if let Some(value) = cached {
            debug!("Found in cache");
            return Ok(value);
        }

        let resolver = self.resolver(chain.clone()).enter(descriptor)?;
        let lock = self.inner.locks.get(identity);
        let _guard = lock.lock().await;

        let cached = self.inner.cache.read().get(&identity);
        if let Some(value) = cached {
            debug!("Built by a concurrent resolve");
            return Ok(value);
        }

        let value = logged(activate_async(descriptor, &resolver).await)?;
        self.store(descriptor, &value);
        Ok(value)
    }

    fn store(&self, descriptor: &ServiceDescriptor, value: &RcAny) {
        let mut cache = self.inner.cache.write();
        cache.insert(descriptor.abstract_identity(), value.clone());
        debug!("Cached");

        if let Some(resolved) = descriptor.resolved(value) {
            cache.push_resolved(resolved);
            debug!("Pushed to resolved set");
        }
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("cached", &self.cached_count()).finish()
    }
}
