use parking_lot::RwLock;
use std::{
    collections::BTreeSet,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};
use tracing::{debug, info, info_span, Instrument as _};

use crate::{
    any::{RcAny, TypeInfo},
    cache::Cache,
    descriptor::{Activation, ServiceDescriptor},
    errors::ResolveErrorKind,
    graph::GraphValidator,
    instantiator::{activate, activate_async},
    lifetime::Lifetime,
    lock::ActivationLocks,
    registry::Registry,
    resolver::{logged, Chain, Resolver},
    scope::Scope,
};

struct ProviderInner {
    registry: Registry,
    cache: RwLock<Cache>,
    locks: ActivationLocks,
    validated: RwLock<BTreeSet<TypeInfo>>,
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        self.cache.get_mut().take().finalize();
        debug!("Provider closed on drop");
    }
}

/// Root resolution authority. Owns the registry and the singleton cache.
///
/// Cloning is cheap and every clone shares the same singletons. Singleton finalizers run on
/// [`Provider::close`] or when the last clone (including any [`Scope`] created from it) is dropped.
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

impl Provider {
    /// Provider that builds singletons lazily, on first resolve. Pre-built singleton instances
    /// are cached right away, so their finalizers run on close even if nothing resolved them.
    #[must_use]
    pub(crate) fn new(registry: Registry) -> Self {
        let provider = Self {
            inner: Arc::new(ProviderInner {
                registry,
                cache: RwLock::new(Cache::new()),
                locks: ActivationLocks::new(),
                validated: RwLock::new(BTreeSet::new()),
            }),
        };

        for descriptor in provider.inner.registry.descriptors() {
            if let (Lifetime::Singleton, Activation::Instance(value)) = (descriptor.lifetime(), descriptor.activation()) {
                provider.store(descriptor, value);
            }
        }
        provider
    }

    pub(crate) fn build(registry: Registry) -> Result<Self, ResolveErrorKind> {
        let span = info_span!("build");
        let _guard = span.enter();

        let order = GraphValidator::new(&registry).build_order()?;
        let provider = Self::new(registry);
        provider.inner.validated.write().extend(order.iter().copied());

        for identity in &order {
            let Some(descriptor) = provider.eager(identity) else {
                continue;
            };
            if let Err(err) = provider.get_singleton(descriptor, &Chain::default()) {
                provider.abandon();
                return Err(err);
            }
        }

        info!(singletons = provider.inner.cache.read().len(), "Provider built");
        Ok(provider)
    }

    pub(crate) async fn build_async(registry: Registry) -> Result<Self, ResolveErrorKind> {
        let span = info_span!("build");

        async move {
            let order = GraphValidator::new(&registry).build_order()?;
            let provider = Self::new(registry);
            provider.inner.validated.write().extend(order.iter().copied());

            for identity in &order {
                let Some(descriptor) = provider.eager(identity) else {
                    continue;
                };
                if let Err(err) = provider.get_singleton_async(descriptor, &Chain::default()).await {
                    provider.abandon();
                    return Err(err);
                }
            }

            info!(singletons = provider.inner.cache.read().len(), "Provider built");
            Ok(provider)
        }
        .instrument(span)
        .await
    }

    /// Singleton descriptor for `identity`, if it still has to be built.
    fn eager(&self, identity: &TypeInfo) -> Option<&ServiceDescriptor> {
        self.inner
            .registry
            .get(identity)
            .filter(|descriptor| descriptor.lifetime() == Lifetime::Singleton && !descriptor.has_instance())
    }

    /// Drops what a failed build produced without running finalizers.
    fn abandon(&self) {
        self.inner.cache.write().forget_resolved();
    }

    /// # Errors
    /// See [`Resolver::resolve`], including when errors come wrapped. Scoped services fail with
    /// [`ResolveErrorKind::ScopeRequired`].
    pub fn resolve<T>(&self) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Resolver::new(self.clone(), None, Chain::default()).resolve()
    }

    /// # Errors
    /// See [`Provider::resolve`].
    pub async fn resolve_async<T>(&self) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Resolver::new(self.clone(), None, Chain::default()).resolve_async().await
    }

    #[must_use]
    pub fn create_scope(&self) -> Scope {
        debug!("Scope created");
        Scope::new(self.clone())
    }

    #[inline]
    #[must_use]
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.inner.registry.contains(&TypeInfo::of::<T>())
    }

    #[inline]
    pub fn descriptors(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.inner.registry.descriptors()
    }

    /// Runs singleton finalizers in reverse activation order.
    ///
    /// Singletons stay cached, so they are never built twice. Calling it again finalizes nothing.
    pub fn close(&self) {
        let resolved = self.inner.cache.write().take_resolved();
        resolved.finalize();
        debug!("Provider closed");
    }

    /// Async version of [`Provider::close`], awaiting async finalizers.
    pub async fn close_async(&self) {
        let resolved = self.inner.cache.write().take_resolved();
        resolved.finalize_async().await;
        debug!("Provider closed");
    }

    #[inline]
    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Validates the declared graph below `descriptor` the first time it is resolved.
    ///
    /// Runs before any activation lock is taken, so a declared cycle between lazily built
    /// services fails on every thread instead of leaving two threads waiting on each other.
    pub(crate) fn validate(&self, descriptor: &ServiceDescriptor) -> Result<(), ResolveErrorKind> {
        let identity = descriptor.abstract_identity();
        if self.inner.validated.read().contains(&identity) {
            return Ok(());
        }

        let visited = GraphValidator::new(&self.inner.registry).validate_from(identity)?;
        self.inner.validated.write().extend(visited);
        debug!("Dependency graph validated");
        Ok(())
    }

    pub(crate) fn get_singleton(&self, descriptor: &ServiceDescriptor, chain: &Chain) -> Result<RcAny, ResolveErrorKind> {
        let identity = descriptor.abstract_identity();

        let cached = self.inner.cache.read().get(&identity);
        if let Some(value) = cached {
            debug!("Found in cache");
            return Ok(value);
        }

        let resolver = Resolver::new(self.clone(), None, chain.clone()).enter(descriptor)?;
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

    pub(crate) async fn get_singleton_async(&self, descriptor: &ServiceDescriptor, chain: &Chain) -> Result<RcAny, ResolveErrorKind> {
        let identity = descriptor.abstract_identity();

        let cached = self.inner.cache.read().get(&identity);
        if let Some(value) = cached {
            debug!("Found in cache");
            return Ok(value);
        }

        let resolver = Resolver::new(self.clone(), None, chain.clone()).enter(descriptor)?;
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

    #[cfg(test)]
    pub(crate) fn cached_count(&self) -> usize {
        self.inner.cache.read().len()
    }
}

impl Debug for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("registered", &self.inner.registry.len())
            .field("singletons", &self.inner.cache.read().len())
            .finish()
    }
}
