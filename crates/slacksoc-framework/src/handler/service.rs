//! Core handler service.
//!
//! [`HandlerService<H>`] wraps a single handler and implements
//! `tower::Service<Req>`. Filtering is expressed as ordinary tower layers
//! stacked *on top*.

use std::future::Future;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::{BoxError, Service};

/// Values a handler may return.
///
/// `()` means success; `Result<(), E>` reports `E` as a handler failure.
pub trait IntoHandlerResult: Send + 'static {
    fn into_handler_result(self) -> Result<(), BoxError>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError> + Send + 'static,
{
    fn into_handler_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// An async function from a request (`Arc<EventContext>`, `MessageContext`
/// or `CommandContext`) to something that converts into a handler result.
///
/// Implemented for every `Fn(Req) -> impl Future` closure or function with the
/// right bounds, so handlers are usually written inline:
///
/// ```rust,ignore
/// dispatcher.on_addressed(|msg: MessageContext| async move {
///     msg.reply("you called?").await
/// });
/// ```
pub trait Handler<Req>: Clone + Send + Sync + 'static {
    type Output: IntoHandlerResult;
    type Future: Future<Output = Self::Output> + Send + 'static;

    fn call(&self, req: Req) -> Self::Future;
}

impl<F, Fut, Req> Handler<Req> for F
where
    F: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoHandlerResult,
{
    type Output = Fut::Output;
    type Future = Fut;

    fn call(&self, req: Req) -> Self::Future {
        self(req)
    }
}

/// A tower [`Service`] that calls a single handler.
#[derive(Clone)]
pub struct HandlerService<H> {
    handler: H,
}

impl<H> HandlerService<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H, Req> Service<Req> for HandlerService<H>
where
    H: Handler<Req>,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.handler
            .call(req)
            .map(IntoHandlerResult::into_handler_result)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[tokio::test]
    async fn test_unit_handler_succeeds() {
        let svc = HandlerService::new(|n: u32| async move {
            assert_eq!(n, 7);
        });
        svc.oneshot(7).await.unwrap();
    }

    #[tokio::test]
    async fn test_result_handler_reports_error() {
        let svc = HandlerService::new(|_: u32| async move { Err::<(), _>(Boom) });
        let err = svc.oneshot(1).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_service_is_reusable() {
        let svc = HandlerService::new(|n: u32| async move {
            if n == 0 { Err(Boom) } else { Ok(()) }
        });
        tokio_test::block_on(svc.clone().oneshot(1)).unwrap();
        assert!(tokio_test::block_on(svc.oneshot(0)).is_err());
    }
}
