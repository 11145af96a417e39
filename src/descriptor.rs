use std::{
    fmt::{self, Debug, Formatter},
    future::Future,
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    any::{RcAny, TypeInfo},
    cache::Resolved,
    errors::RegistrationErrorKind,
    finalizer::{boxed_async_finalizer_factory, boxed_finalizer_factory, BoxedCloneAsyncFinalizer, BoxedCloneFinalizer, Dispose},
    inject::{Injectable, Parameter},
    instantiator::{constructor, BoxedCloneAsyncFactory, BoxedCloneConstructor, BoxedCloneFactory},
    lifetime::Lifetime,
};

pub(crate) enum Activation {
    Instance(RcAny),
    Factory(BoxedCloneFactory),
    AsyncFactory(BoxedCloneAsyncFactory),
    Constructor(BoxedCloneConstructor),
}

impl Activation {
    const fn kind(&self) -> &'static str {
        match self {
            Activation::Instance(_) => "instance",
            Activation::Factory(_) => "factory",
            Activation::AsyncFactory(_) => "async factory",
            Activation::Constructor(_) => "constructor",
        }
    }
}

/// An erased, not yet registered service. Built from a [`Service`].
pub struct ServiceDefinition {
    identity: TypeInfo,
    concrete: TypeInfo,
    activation: Activation,
    parameters: Vec<Parameter>,
    depends_on: Vec<TypeInfo>,
    finalizer: Option<BoxedCloneFinalizer>,
    async_finalizer: Option<BoxedCloneAsyncFinalizer>,
}

impl ServiceDefinition {
    /// Definition of `T` built by its constructor, used for bulk registration.
    #[inline]
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        constructor::<T>().into()
    }

    #[inline]
    #[must_use]
    pub const fn identity(&self) -> TypeInfo {
        self.identity
    }
}

/// How to produce instances of the capability `I`.
///
/// Created by [`crate::constructor`], [`crate::bind`], [`crate::instance`], [`crate::factory`] and
/// their shared and async variants.
pub struct Service<I: ?Sized> {
    definition: ServiceDefinition,
    _provides: PhantomData<fn() -> Arc<I>>,
}

impl<I: ?Sized + Send + Sync + 'static> Service<I> {
    pub(crate) fn new(concrete: TypeInfo, activation: Activation, parameters: Vec<Parameter>) -> Self {
        Self {
            definition: ServiceDefinition {
                identity: TypeInfo::of::<I>(),
                concrete,
                activation,
                parameters,
                depends_on: Vec::new(),
                finalizer: None,
                async_finalizer: None,
            },
            _provides: PhantomData,
        }
    }

    /// Declares a dependency that a factory resolves, so graph validation and eager build see the edge.
    #[must_use]
    pub fn depends_on<D: ?Sized + 'static>(mut self) -> Self {
        let identity = TypeInfo::of::<D>();
        if !self.definition.depends_on.contains(&identity) {
            self.definition.depends_on.push(identity);
        }
        self
    }

    /// Runs `finalizer` on the instance when its owning cache is closed.
    #[must_use]
    pub fn finalizer<F>(mut self, finalizer: F) -> Self
    where
        F: FnMut(Arc<I>) -> Result<(), anyhow::Error> + Clone + Send + Sync + 'static,
    {
        self.definition.finalizer = Some(boxed_finalizer_factory::<I, _>(finalizer));
        self
    }

    /// Like [`Service::finalizer`], awaited by [`crate::Scope::dispose_async`].
    /// Sync disposal drives the future on the calling thread.
    #[must_use]
    pub fn async_finalizer<F, Fut>(mut self, finalizer: F) -> Self
    where
        F: FnMut(Arc<I>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.definition.async_finalizer = Some(boxed_async_finalizer_factory::<I, _>(finalizer));
        self
    }
}

impl<I: ?Sized + Dispose + Send + Sync + 'static> Service<I> {
    /// Calls [`Dispose::dispose`] when the owning cache is closed.
    #[must_use]
    pub fn disposable(self) -> Self {
        self.finalizer(|instance: Arc<I>| instance.dispose())
    }
}

impl<I: ?Sized> From<Service<I>> for ServiceDefinition {
    #[inline]
    fn from(service: Service<I>) -> Self {
        service.definition
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructorParam {
    pub name: &'static str,
    pub identity: TypeInfo,
}

/// Registered metadata for one capability. Immutable once registered.
pub struct ServiceDescriptor {
    identity: TypeInfo,
    concrete: TypeInfo,
    lifetime: Lifetime,
    activation: Activation,
    constructor_params: Vec<ConstructorParam>,
    depends_on: Vec<TypeInfo>,
    finalizer: Option<BoxedCloneFinalizer>,
    async_finalizer: Option<BoxedCloneAsyncFinalizer>,
}

impl ServiceDescriptor {
    /// # Errors
    /// Returns [`RegistrationErrorKind::MissingDependencyAnnotation`] for the first constructor
    /// parameter without an identity.
    pub(crate) fn new(lifetime: Lifetime, definition: ServiceDefinition) -> Result<Self, RegistrationErrorKind> {
        let ServiceDefinition {
            identity,
            concrete,
            activation,
            parameters,
            depends_on,
            finalizer,
            async_finalizer,
        } = definition;

        let constructor_params = parameters
            .into_iter()
            .map(|Parameter { name, identity }| match identity {
                Some(identity) => Ok(ConstructorParam { name, identity }),
                None => Err(RegistrationErrorKind::MissingDependencyAnnotation {
                    parameter: name,
                    service: concrete,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            identity,
            concrete,
            lifetime,
            activation,
            constructor_params,
            depends_on,
            finalizer,
            async_finalizer,
        })
    }

    #[inline]
    #[must_use]
    pub const fn abstract_identity(&self) -> TypeInfo {
        self.identity
    }

    #[inline]
    #[must_use]
    pub const fn concrete_identity(&self) -> TypeInfo {
        self.concrete
    }

    #[inline]
    #[must_use]
    pub const fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    #[must_use]
    pub fn constructor_params(&self) -> &[ConstructorParam] {
        &self.constructor_params
    }

    #[inline]
    #[must_use]
    pub const fn has_instance(&self) -> bool {
        matches!(self.activation, Activation::Instance(_))
    }

    #[inline]
    #[must_use]
    pub const fn has_factory(&self) -> bool {
        matches!(self.activation, Activation::Factory(_) | Activation::AsyncFactory(_))
    }

    #[inline]
    #[must_use]
    pub const fn has_finalizer(&self) -> bool {
        self.finalizer.is_some() || self.async_finalizer.is_some()
    }

    /// Constructor parameter identities followed by declared factory dependencies, without duplicates.
    #[must_use]
    pub fn dependencies(&self) -> Vec<TypeInfo> {
        let mut dependencies = Vec::with_capacity(self.constructor_params.len() + self.depends_on.len());
        for identity in self.constructor_params.iter().map(|param| param.identity).chain(self.depends_on.iter().copied()) {
            if !dependencies.contains(&identity) {
                dependencies.push(identity);
            }
        }
        dependencies
    }

    #[inline]
    pub(crate) const fn activation(&self) -> &Activation {
        &self.activation
    }

    /// Finalization entry for an activated `value`, if this service has a finalizer.
    #[must_use]
    pub(crate) fn resolved(&self, value: &RcAny) -> Option<Resolved> {
        if !self.has_finalizer() {
            return None;
        }
        Some(Resolved {
            identity: self.identity,
            dependency: value.clone(),
            finalizer: self.finalizer.clone(),
            async_finalizer: self.async_finalizer.clone(),
        })
    }
}

impl Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("identity", &self.identity.name)
            .field("concrete", &self.concrete.name)
            .field("lifetime", &self.lifetime)
            .field("activation", &self.activation.kind())
            .field("constructor_params", &self.constructor_params)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}
