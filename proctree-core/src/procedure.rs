use crate::RpcError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// A single asynchronous unit of work, addressed by its position in a
/// [`ProcedureTree`](crate::ProcedureTree).
///
/// Argument validation is the procedure's own business; the router passes
/// `variables` through untouched.
#[async_trait]
pub trait Procedure: Send + Sync {
    async fn call(&self, variables: Value) -> Result<Value, RpcError>;
}

/// Adapts an async function or closure into a [`Procedure`].
pub struct FnProcedure<F> {
    f: F,
}

impl<F> FnProcedure<F> {
    pub fn new(f: F) -> Self {
        FnProcedure { f }
    }
}

impl<F> fmt::Debug for FnProcedure<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcedure")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Procedure for FnProcedure<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    async fn call(&self, variables: Value) -> Result<Value, RpcError> {
        (self.f)(variables).await
    }
}

pub fn procedure_fn<F, Fut>(f: F) -> FnProcedure<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    FnProcedure::new(f)
}
