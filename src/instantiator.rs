use std::{future::Future, sync::Arc};
use tracing::debug;

use crate::{
    any::{erase, RcAny, TypeInfo},
    descriptor::{Activation, Service, ServiceDescriptor},
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    inject::{Arguments, Injectable},
    resolver::Resolver,
    service::{BoxCloneAsyncService, BoxCloneService, FnServiceAsync, FnServiceSync, Service as _},
};

pub(crate) type BoxedCloneFactory = BoxCloneService<Resolver, RcAny, InstantiateErrorKind>;
pub(crate) type BoxedCloneAsyncFactory = BoxCloneAsyncService<Resolver, RcAny, InstantiateErrorKind>;
pub(crate) type BoxedCloneConstructor = BoxCloneService<Arguments, RcAny, InstantiateErrorKind>;

/// Builds `T` from its declared constructor parameters.
#[must_use]
pub fn constructor<T: Injectable>() -> Service<T> {
    Service::new(
        TypeInfo::of::<T>(),
        Activation::Constructor(BoxCloneService::new(FnServiceSync(|arguments: Arguments| {
            T::construct(arguments).map(|value| erase(Arc::new(value)))
        }))),
        T::parameters(),
    )
}

/// Builds `C` from its constructor parameters and exposes it as `I`.
///
/// ```
/// use std::sync::Arc;
///
/// trait Repo: Send + Sync {}
/// struct InMemoryRepo;
/// impl Repo for InMemoryRepo {}
/// depi::injectable!(InMemoryRepo {});
///
/// let service = depi::bind::<dyn Repo, InMemoryRepo>(|repo| repo as Arc<dyn Repo>);
/// ```
#[must_use]
pub fn bind<I, C>(upcast: impl Fn(Arc<C>) -> Arc<I> + Clone + Send + Sync + 'static) -> Service<I>
where
    I: ?Sized + Send + Sync + 'static,
    C: Injectable,
{
    Service::new(
        TypeInfo::of::<C>(),
        Activation::Constructor(BoxCloneService::new(FnServiceSync(move |arguments: Arguments| {
            C::construct(arguments).map(|value| erase(upcast(Arc::new(value))))
        }))),
        C::parameters(),
    )
}

#[must_use]
pub fn instance<T: Send + Sync + 'static>(value: T) -> Service<T> {
    shared_instance(Arc::new(value))
}

#[must_use]
pub fn shared_instance<I: ?Sized + Send + Sync + 'static>(value: Arc<I>) -> Service<I> {
    Service::new(TypeInfo::of::<I>(), Activation::Instance(erase(value)), Vec::new())
}

/// Produces `T` by calling `factory` with a resolver for its dependencies.
#[must_use]
pub fn factory<T, F>(mut factory: F) -> Service<T>
where
    T: Send + Sync + 'static,
    F: FnMut(&Resolver) -> Result<T, InstantiateErrorKind> + Clone + Send + Sync + 'static,
{
    Service::new(
        TypeInfo::of::<T>(),
        Activation::Factory(BoxCloneService::new(FnServiceSync(move |resolver: Resolver| {
            factory(&resolver).map(|value| erase(Arc::new(value)))
        }))),
        Vec::new(),
    )
}

#[must_use]
pub fn shared_factory<I, F>(mut factory: F) -> Service<I>
where
    I: ?Sized + Send + Sync + 'static,
    F: FnMut(&Resolver) -> Result<Arc<I>, InstantiateErrorKind> + Clone + Send + Sync + 'static,
{
    Service::new(
        TypeInfo::of::<I>(),
        Activation::Factory(BoxCloneService::new(FnServiceSync(move |resolver: Resolver| {
            factory(&resolver).map(erase)
        }))),
        Vec::new(),
    )
}

/// Produces `T` from a future. Sync resolve paths drive the future to completion on the calling thread.
#[must_use]
pub fn async_factory<T, F, Fut>(mut factory: F) -> Service<T>
where
    T: Send + Sync + 'static,
    F: FnMut(Resolver) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, InstantiateErrorKind>> + Send + 'static,
{
    Service::new(
        TypeInfo::of::<T>(),
        Activation::AsyncFactory(BoxCloneAsyncService::new(FnServiceAsync(move |resolver: Resolver| {
            let future = factory(resolver);
            async move { future.await.map(|value| erase(Arc::new(value))) }
        }))),
        Vec::new(),
    )
}

#[must_use]
pub fn shared_async_factory<I, F, Fut>(mut factory: F) -> Service<I>
where
    I: ?Sized + Send + Sync + 'static,
    F: FnMut(Resolver) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<I>, InstantiateErrorKind>> + Send + 'static,
{
    Service::new(
        TypeInfo::of::<I>(),
        Activation::AsyncFactory(BoxCloneAsyncService::new(FnServiceAsync(move |resolver: Resolver| {
            let future = factory(resolver);
            async move { future.await.map(erase) }
        }))),
        Vec::new(),
    )
}

#[inline]
fn factory_error(err: InstantiateErrorKind) -> ResolveErrorKind {
    ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err))
}

#[inline]
fn deps_error(err: ResolveErrorKind) -> ResolveErrorKind {
    ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(err)))
}

/// Produces a new instance for `descriptor`. `resolver` must already have entered it.
pub(crate) fn activate(descriptor: &ServiceDescriptor, resolver: &Resolver) -> Result<RcAny, ResolveErrorKind> {
    let value = match descriptor.activation() {
        Activation::Instance(value) => return Ok(value.clone()),
        Activation::Factory(factory) => factory.clone().call(resolver.clone()).map_err(factory_error)?,
        Activation::AsyncFactory(factory) => {
            futures_executor::block_on(factory.clone().call(resolver.clone())).map_err(factory_error)?
        }
        Activation::Constructor(constructor) => {
            let requester = Some(descriptor.concrete_identity());
            let mut values = Vec::with_capacity(descriptor.constructor_params().len());
            for param in descriptor.constructor_params() {
                let value = resolver.resolve_erased(param.identity, requester).map_err(deps_error)?;
                values.push((param.name, value));
            }
            constructor.clone().call(Arguments::new(values)).map_err(factory_error)?
        }
    };

    debug!("Activated");
    Ok(value)
}

pub(crate) async fn activate_async(descriptor: &ServiceDescriptor, resolver: &Resolver) -> Result<RcAny, ResolveErrorKind> {
    let value = match descriptor.activation() {
        Activation::Instance(value) => return Ok(value.clone()),
        Activation::Factory(factory) => factory.clone().call(resolver.clone()).map_err(factory_error)?,
        Activation::AsyncFactory(factory) => factory.clone().call(resolver.clone()).await.map_err(factory_error)?,
        Activation::Constructor(constructor) => {
            let requester = Some(descriptor.concrete_identity());
            let mut values = Vec::with_capacity(descriptor.constructor_params().len());
            for param in descriptor.constructor_params() {
                let value = resolver
                    .resolve_erased_async(param.identity, requester)
                    .await
                    .map_err(deps_error)?;
                values.push((param.name, value));
            }
            constructor.clone().call(Arguments::new(values)).map_err(factory_error)?
        }
    };

    debug!("Activated");
    Ok(value)
}
