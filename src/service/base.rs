pub(crate) trait Service<Request> {
    type Response;
    type Error;

    // `Result<Response, Error>` for sync services, a boxed future of it for async ones.
    type Output;

    fn call(&mut self, request: Request) -> Self::Output;
}
