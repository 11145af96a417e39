use super::base::Service;
use crate::utils::future::BoxFuture;

type DynCloneService<Request, Response, Error, Output> =
    dyn CloneService<Request, Response = Response, Error = Error, Output = Output> + Send + Sync;

pub(crate) trait CloneService<Request>: Service<Request> {
    #[must_use]
    fn clone_box(&self) -> Box<DynCloneService<Request, Self::Response, Self::Error, Self::Output>>;
}

impl<Request, T> CloneService<Request> for T
where
    T: Service<Request> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn clone_box(&self) -> Box<DynCloneService<Request, T::Response, T::Error, T::Output>> {
        Box::new(self.clone())
    }
}

/// Type-erased sync service that can be cloned and shared between threads.
pub(crate) struct BoxCloneService<Request, Response, Error>(
    pub(crate) Box<DynCloneService<Request, Response, Error, Result<Response, Error>>>,
);

impl<Request, Response, Error> BoxCloneService<Request, Response, Error> {
    #[inline]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error, Output = Result<Response, Error>>
            + Clone
            + Send
            + Sync
            + 'static,
    {
        Self(Box::new(service))
    }
}

impl<Request, Response, Error> Clone for BoxCloneService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<Request, Response, Error> Service<Request> for BoxCloneService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;
    type Output = Result<Response, Error>;

    #[inline]
    fn call(&mut self, request: Request) -> Self::Output {
        self.0.call(request)
    }
}

/// Async counterpart of [`BoxCloneService`], producing `'static` boxed futures.
pub(crate) struct BoxCloneAsyncService<Request, Response, Error>(
    pub(crate) Box<DynCloneService<Request, Response, Error, BoxFuture<'static, Result<Response, Error>>>>,
);

impl<Request, Response, Error> BoxCloneAsyncService<Request, Response, Error> {
    #[inline]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error, Output = BoxFuture<'static, Result<Response, Error>>>
            + Clone
            + Send
            + Sync
            + 'static,
    {
        Self(Box::new(service))
    }
}

impl<Request, Response, Error> Clone for BoxCloneAsyncService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<Request, Response, Error> Service<Request> for BoxCloneAsyncService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;
    type Output = BoxFuture<'static, Result<Response, Error>>;

    #[inline]
    fn call(&mut self, request: Request) -> Self::Output {
        self.0.call(request)
    }
}
