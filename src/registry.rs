use std::collections::BTreeMap;
use tracing::debug;

use crate::{
    any::TypeInfo,
    descriptor::{ServiceDefinition, ServiceDescriptor},
    errors::{RegistrationErrorKind, ResolveErrorKind},
    inject::Injectable,
    instantiator::instance,
    lifetime::Lifetime,
    provider::Provider,
};

/// Insertion-ordered set of service descriptors, keyed by abstract identity.
///
/// Registering an identity again replaces its descriptor in place, the last registration wins.
#[derive(Default)]
pub struct Registry {
    descriptors: Vec<ServiceDescriptor>,
    index: BTreeMap<TypeInfo, usize>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// # Errors
    /// Returns [`RegistrationErrorKind::MissingDependencyAnnotation`] if a constructor parameter has no identity.
    pub fn register(mut self, lifetime: Lifetime, service: impl Into<ServiceDefinition>) -> Result<Self, RegistrationErrorKind> {
        let descriptor = ServiceDescriptor::new(lifetime, service.into())?;
        self.insert(descriptor);
        Ok(self)
    }

    /// Same lifetime for every definition. Stops at the first rejected one.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn register_many(
        mut self,
        lifetime: Lifetime,
        services: impl IntoIterator<Item = ServiceDefinition>,
    ) -> Result<Self, RegistrationErrorKind> {
        for service in services {
            self = self.register(lifetime, service)?;
        }
        Ok(self)
    }

    /// Registers `T` with the default lifetime, [`Lifetime::Transient`].
    ///
    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_default<T: Injectable>(self) -> Result<Self, RegistrationErrorKind> {
        self.register_transient::<T>()
    }

    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_singleton<T: Injectable>(self) -> Result<Self, RegistrationErrorKind> {
        self.register(Lifetime::Singleton, ServiceDefinition::of::<T>())
    }

    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_transient<T: Injectable>(self) -> Result<Self, RegistrationErrorKind> {
        self.register(Lifetime::Transient, ServiceDefinition::of::<T>())
    }

    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_scoped<T: Injectable>(self) -> Result<Self, RegistrationErrorKind> {
        self.register(Lifetime::Scoped, ServiceDefinition::of::<T>())
    }

    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_singleton_with(self, service: impl Into<ServiceDefinition>) -> Result<Self, RegistrationErrorKind> {
        self.register(Lifetime::Singleton, service)
    }

    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_transient_with(self, service: impl Into<ServiceDefinition>) -> Result<Self, RegistrationErrorKind> {
        self.register(Lifetime::Transient, service)
    }

    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_scoped_with(self, service: impl Into<ServiceDefinition>) -> Result<Self, RegistrationErrorKind> {
        self.register(Lifetime::Scoped, service)
    }

    /// Registers an already built singleton.
    ///
    /// # Errors
    /// See [`Registry::register`].
    #[inline]
    pub fn register_singleton_instance<T: Send + Sync + 'static>(self, value: T) -> Result<Self, RegistrationErrorKind> {
        self.register(Lifetime::Singleton, instance(value))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, identity: &TypeInfo) -> bool {
        self.index.contains_key(identity)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, identity: &TypeInfo) -> Option<&ServiceDescriptor> {
        self.index.get(identity).map(|position| &self.descriptors[*position])
    }

    /// Descriptors in registration order.
    #[inline]
    pub fn descriptors(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Validates the singleton graph and builds every singleton in dependency order.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::CyclicDependency`] or [`ResolveErrorKind::UnregisteredDependency`] from graph validation
    /// - any error raised while building a singleton. Nothing built so far is finalized.
    pub fn build(self) -> Result<Provider, ResolveErrorKind> {
        Provider::build(self)
    }

    /// Like [`Registry::build`], awaiting async factories instead of blocking on them.
    ///
    /// # Errors
    /// See [`Registry::build`].
    pub async fn build_async(self) -> Result<Provider, ResolveErrorKind> {
        Provider::build_async(self).await
    }
}

impl Registry {
    fn insert(&mut self, descriptor: ServiceDescriptor) {
        let identity = descriptor.abstract_identity();
        match self.index.get(&identity) {
            Some(position) => {
                debug!(
                    identity = identity.short_name(),
                    lifetime = %descriptor.lifetime(),
                    "Registration replaced"
                );
                self.descriptors[*position] = descriptor;
            }
            None => {
                debug!(
                    identity = identity.short_name(),
                    lifetime = %descriptor.lifetime(),
                    "Registered"
                );
                self.index.insert(identity, self.descriptors.len());
                self.descriptors.push(descriptor);
            }
        }
    }
}
