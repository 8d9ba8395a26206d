use async_trait::async_trait;
use proctree_core::{
    DottedPath, Node, Outcome, Procedure, ProcedureTree, Request, RpcError, Transport,
};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Single entry point resolving a dotted path against a procedure tree.
///
/// Stateless beyond the tree it closes over; clones share that tree.
#[derive(Clone, Default)]
pub struct Router {
    tree: Option<Arc<ProcedureTree>>,
}

pub fn build_router(tree: Option<ProcedureTree>) -> Router {
    Router::new(tree)
}

impl Router {
    pub fn new(tree: Option<ProcedureTree>) -> Self {
        Router {
            tree: tree.map(Arc::new),
        }
    }

    pub fn tree(&self) -> Option<&ProcedureTree> {
        self.tree.as_deref()
    }

    /// Procedure stored at `path`, if that position holds one.
    pub fn resolve(&self, path: &str) -> Option<Arc<dyn Procedure>> {
        match self.tree.as_ref()?.resolve(path)? {
            Node::Procedure(procedure) => Some(Arc::clone(procedure)),
            Node::Namespace(_) => None,
        }
    }

    pub fn paths(&self) -> Vec<DottedPath> {
        self.tree().map(ProcedureTree::paths).unwrap_or_default()
    }

    /// Runs the procedure named by `request.procedure`.
    ///
    /// Returns `Ok(None)` when nothing invocable lives at that path or when
    /// the procedure answers `null`. Missing `variables` become `{}`.
    /// Procedure failures are returned as-is.
    pub async fn handle(&self, request: Request) -> Result<Option<Value>, RpcError> {
        let Some(procedure) = self.resolve(&request.procedure) else {
            warn!(procedure = %request.procedure, "no procedure at path");
            return Ok(None);
        };

        let variables = request
            .variables
            .unwrap_or_else(|| Value::Object(Map::new()));
        debug!(procedure = %request.procedure, "invoking procedure");
        trace!(procedure = %request.procedure, %variables, "procedure variables");

        match procedure.call(variables).await? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    /// Like [`handle`](Router::handle), but reports an unknown path as a
    /// `not_found` error, for transports that must answer every request.
    pub async fn respond(&self, request: Request) -> Outcome {
        if self.resolve(&request.procedure).is_none() {
            let error = RpcError::not_found(format!("no procedure at '{}'", request.procedure));
            return Outcome::Error { error };
        }

        match self.handle(request).await {
            Ok(value) => Outcome::Success {
                value: value.unwrap_or(Value::Null),
            },
            Err(error) => Outcome::Error { error },
        }
    }
}

#[async_trait]
impl Transport for Router {
    async fn send(&self, request: Request) -> Result<Option<Value>, RpcError> {
        self.handle(request).await
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("paths", &self.paths()).finish()
    }
}
