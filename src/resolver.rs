use std::{any::Any, sync::Arc};
use tracing::{debug, error, info_span, Instrument as _};

use crate::{
    any::{downcast, RcAny, TypeInfo},
    descriptor::ServiceDescriptor,
    errors::ResolveErrorKind,
    instantiator::{activate, activate_async},
    lifetime::Lifetime,
    provider::Provider,
    scope::Scope,
    utils::future::BoxFuture,
};

struct Link {
    identity: TypeInfo,
    parent: Chain,
}

/// Identities currently being activated on this call path, innermost last.
#[derive(Clone, Default)]
pub(crate) struct Chain(Option<Arc<Link>>);

impl Chain {
    #[must_use]
    pub(crate) fn push(&self, identity: TypeInfo) -> Self {
        Self(Some(Arc::new(Link {
            identity,
            parent: self.clone(),
        })))
    }

    #[must_use]
    pub(crate) fn current(&self) -> Option<TypeInfo> {
        self.0.as_ref().map(|link| link.identity)
    }

    #[must_use]
    pub(crate) fn contains(&self, identity: &TypeInfo) -> bool {
        let mut node = &self.0;
        while let Some(link) = node {
            if link.identity == *identity {
                return true;
            }
            node = &link.parent.0;
        }
        false
    }

    /// Outermost first.
    #[must_use]
    pub(crate) fn path(&self) -> Vec<TypeInfo> {
        let mut path = Vec::new();
        let mut node = &self.0;
        while let Some(link) = node {
            path.push(link.identity);
            node = &link.parent.0;
        }
        path.reverse();
        path
    }
}

/// Handle passed to factories for resolving their own dependencies.
///
/// A resolver obtained from a [`Scope`] can resolve scoped services, one obtained from a
/// [`Provider`] cannot. Resolving a service that is already being activated on the same call path
/// fails with [`ResolveErrorKind::CyclicDependency`] instead of deadlocking.
#[derive(Clone)]
pub struct Resolver {
    provider: Provider,
    scope: Option<Scope>,
    chain: Chain,
}

impl Resolver {
    #[inline]
    #[must_use]
    pub(crate) const fn new(provider: Provider, scope: Option<Scope>, chain: Chain) -> Self {
        Self { provider, scope, chain }
    }

    #[inline]
    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// The declared graph below `T` is validated on its first resolve, so a missing or cyclic
    /// declared dependency is returned as is. Failures found while activating a dependency
    /// (a scope required deeper in the graph, a factory resolving an undeclared service) come
    /// wrapped in [`ResolveErrorKind::Instantiator`], use [`ResolveErrorKind::root_cause`] to match them.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::UnregisteredDependency`] if `T` or one of its dependencies isn't registered
    /// - [`ResolveErrorKind::ScopeRequired`] if a scoped service is reached without a scope
    /// - [`ResolveErrorKind::CyclicDependency`] if the declared graph below `T` has a cycle, or `T`
    ///   is already being activated on this call path
    /// - [`ResolveErrorKind::Instantiator`] if a factory or constructor fails
    pub fn resolve<T>(&self) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let identity = TypeInfo::of::<T>();
        let span = info_span!("resolve", dependency = identity.short_name());
        let _guard = span.enter();

        let value = self.resolve_erased(identity, self.chain.current())?;
        cast::<T>(&value)
    }

    /// Async version of [`Resolver::resolve`]. Async factories are awaited instead of blocked on.
    ///
    /// # Errors
    /// Same as [`Resolver::resolve`].
    pub async fn resolve_async<T>(&self) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let identity = TypeInfo::of::<T>();
        let span = info_span!("resolve", dependency = identity.short_name());

        let value = self
            .resolve_erased_async(identity, self.chain.current())
            .instrument(span)
            .await?;
        cast::<T>(&value)
    }

    pub(crate) fn resolve_erased(&self, identity: TypeInfo, requester: Option<TypeInfo>) -> Result<RcAny, ResolveErrorKind> {
        let descriptor = self.descriptor(identity, requester)?;
        self.provider.validate(descriptor)?;

        match descriptor.lifetime() {
            Lifetime::Singleton => self.provider.get_singleton(descriptor, &self.chain),
            Lifetime::Transient => {
                let resolver = self.enter(descriptor)?;
                logged(activate(descriptor, &resolver))
            }
            Lifetime::Scoped => match &self.scope {
                Some(scope) => scope.get_scoped(descriptor, &self.chain),
                None => Err(scope_required(descriptor)),
            },
        }
    }

    pub(crate) fn resolve_erased_async(
        &self,
        identity: TypeInfo,
        requester: Option<TypeInfo>,
    ) -> BoxFuture<'_, Result<RcAny, ResolveErrorKind>> {
        Box::pin(async move {
            let descriptor = self.descriptor(identity, requester)?;
            self.provider.validate(descriptor)?;

            match descriptor.lifetime() {
                Lifetime::Singleton => self.provider.get_singleton_async(descriptor, &self.chain).await,
                Lifetime::Transient => {
                    let resolver = self.enter(descriptor)?;
                    logged(activate_async(descriptor, &resolver).await)
                }
                Lifetime::Scoped => match &self.scope {
                    Some(scope) => scope.get_scoped_async(descriptor, &self.chain).await,
                    None => Err(scope_required(descriptor)),
                },
            }
        })
    }

    /// Resolver for activating `descriptor`, one level deeper on the call path.
    pub(crate) fn enter(&self, descriptor: &ServiceDescriptor) -> Result<Self, ResolveErrorKind> {
        let identity = descriptor.abstract_identity();
        if self.chain.contains(&identity) {
            let mut path = self.chain.path();
            path.push(identity);

            let err = ResolveErrorKind::CyclicDependency {
                identity: descriptor.concrete_identity(),
                path,
            };
            error!("{}", err);
            return Err(err);
        }

        Ok(Self {
            provider: self.provider.clone(),
            scope: self.scope.clone(),
            chain: self.chain.push(identity),
        })
    }

    fn descriptor(&self, identity: TypeInfo, requester: Option<TypeInfo>) -> Result<&ServiceDescriptor, ResolveErrorKind> {
        match self.provider.registry().get(&identity) {
            Some(descriptor) => Ok(descriptor),
            None => {
                let err = ResolveErrorKind::UnregisteredDependency { identity, requester };
                error!("{}", err);
                Err(err)
            }
        }
    }
}

pub(crate) fn logged<T>(result: Result<T, ResolveErrorKind>) -> Result<T, ResolveErrorKind> {
    if let Err(err) = &result {
        error!("{}", err);
    }
    result
}

fn scope_required(descriptor: &ServiceDescriptor) -> ResolveErrorKind {
    let err = ResolveErrorKind::ScopeRequired {
        identity: descriptor.abstract_identity(),
    };
    error!("{}", err);
    err
}

fn cast<T: ?Sized + Send + Sync + 'static>(value: &RcAny) -> Result<Arc<T>, ResolveErrorKind> {
    match downcast::<T>(value) {
        Some(value) => {
            debug!("Resolved");
            Ok(value)
        }
        None => {
            let err = ResolveErrorKind::IncorrectType {
                expected: TypeInfo::of::<T>(),
                actual: (**value).type_id(),
            };
            error!("{}", err);
            Err(err)
        }
    }
}
