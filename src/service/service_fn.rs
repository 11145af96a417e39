use std::future::Future;

use super::base::Service;
use crate::utils::future::BoxFuture;

#[derive(Clone)]
pub(crate) struct FnServiceSync<F>(pub(crate) F);

#[derive(Clone)]
pub(crate) struct FnServiceAsync<F>(pub(crate) F);

impl<F, Request, Response, Error> Service<Request> for FnServiceSync<F>
where
    F: FnMut(Request) -> Result<Response, Error>,
{
    type Response = Response;
    type Error = Error;
    type Output = Result<Self::Response, Self::Error>;

    #[inline]
    fn call(&mut self, request: Request) -> Self::Output {
        self.0(request)
    }
}

impl<F, Request, Response, Error, Fut> Service<Request> for FnServiceAsync<F>
where
    F: FnMut(Request) -> Fut,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    type Response = Response;
    type Error = Error;
    type Output = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    #[inline]
    fn call(&mut self, request: Request) -> Self::Output {
        Box::pin(self.0(request))
    }
}
