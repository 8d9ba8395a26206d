use crate::{Request, RpcError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Executes a [`Request`] on behalf of a client.
///
/// Supplied once when a client is built and shared by every call site derived
/// from it. Cancellation and timeouts are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Option<Value>, RpcError>;
}

/// Adapts an async function or closure into a [`Transport`].
pub struct FnTransport<F> {
    f: F,
}

impl<F> FnTransport<F> {
    pub fn new(f: F) -> Self {
        FnTransport { f }
    }
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransport")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, RpcError>> + Send + 'static,
{
    async fn send(&self, request: Request) -> Result<Option<Value>, RpcError> {
        (self.f)(request).await
    }
}

pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, RpcError>> + Send + 'static,
{
    FnTransport::new(f)
}
