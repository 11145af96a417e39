use std::{future::Future, sync::Arc};

use crate::{
    any::{downcast, RcAny, TypeInfo},
    service::{BoxCloneAsyncService, BoxCloneService, FnServiceAsync, FnServiceSync},
};

/// Cleanup hook for instances that own resources.
///
/// Services registered with [`crate::Service::disposable`] are disposed when the cache owning them
/// (a [`crate::Scope`] or a [`crate::Provider`]) is closed.
pub trait Dispose {
    fn dispose(&self) -> Result<(), anyhow::Error>;
}

pub(crate) trait Finalizer<Dep: ?Sized>: Clone + Send + Sync + 'static {
    fn finalize(&mut self, dependency: Arc<Dep>) -> Result<(), anyhow::Error>;
}

impl<F, Dep> Finalizer<Dep> for F
where
    Dep: ?Sized,
    F: FnMut(Arc<Dep>) -> Result<(), anyhow::Error> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) -> Result<(), anyhow::Error> {
        self(dependency)
    }
}

pub(crate) trait AsyncFinalizer<Dep: ?Sized>: Clone + Send + Sync + 'static {
    type Future: Future<Output = Result<(), anyhow::Error>> + Send + 'static;

    fn finalize(&mut self, dependency: Arc<Dep>) -> Self::Future;
}

impl<F, Fut, Dep> AsyncFinalizer<Dep> for F
where
    Dep: ?Sized,
    F: FnMut(Arc<Dep>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
{
    type Future = Fut;

    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) -> Self::Future {
        self(dependency)
    }
}

pub(crate) type BoxedCloneFinalizer = BoxCloneService<RcAny, (), anyhow::Error>;
pub(crate) type BoxedCloneAsyncFinalizer = BoxCloneAsyncService<RcAny, (), anyhow::Error>;

fn mismatch<Dep: ?Sized + 'static>() -> anyhow::Error {
    anyhow::anyhow!("Finalizer received a value that is not {}", TypeInfo::of::<Dep>())
}

#[must_use]
pub(crate) fn boxed_finalizer_factory<Dep, Fin>(mut finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: ?Sized + Send + Sync + 'static,
    Fin: Finalizer<Dep>,
{
    BoxCloneService::new(FnServiceSync(move |value: RcAny| match downcast::<Dep>(&value) {
        Some(dependency) => finalizer.finalize(dependency),
        None => Err(mismatch::<Dep>()),
    }))
}

#[must_use]
pub(crate) fn boxed_async_finalizer_factory<Dep, Fin>(finalizer: Fin) -> BoxedCloneAsyncFinalizer
where
    Dep: ?Sized + Send + Sync + 'static,
    Fin: AsyncFinalizer<Dep>,
{
    BoxCloneAsyncService::new(FnServiceAsync(move |value: RcAny| {
        let dependency = downcast::<Dep>(&value);
        let mut finalizer = finalizer.clone();
        async move {
            match dependency {
                Some(dependency) => finalizer.finalize(dependency).await,
                None => Err(mismatch::<Dep>()),
            }
        }
    }))
}
