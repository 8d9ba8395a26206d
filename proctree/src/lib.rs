//! # proctree
//!
//! Turns one [`ProcedureTree`] into the two structures that talk across a
//! procedure-call boundary:
//!
//! - a [`ClientTree`] whose leaves dispatch `{ procedure, variables }` through a
//!   [`Transport`] and expose query / mutation wrappers over a [`QueryCache`];
//! - a [`Router`] that resolves the dotted path of such a request and runs the
//!   procedure stored there.
//!
//! Both are derived from the same tree, so every path the client produces
//! resolves on the router.
//!
//! ```rust,no_run
//! use proctree::{create_local_rpc, ProcedureTree, RpcError, Value};
//! use serde_json::json;
//!
//! async fn add_one(variables: Value) -> Result<Value, RpcError> {
//!     Ok(json!(variables["x"].as_i64().unwrap_or(0) + 1))
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = ProcedureTree::builder()
//!     .namespace("user", ProcedureTree::builder().function("get", add_one))
//!     .build()?;
//!
//! let rpc = create_local_rpc(Some(tree));
//! let get = rpc.client.leaf_at("user.get").expect("registered above");
//! assert_eq!(get.call(json!({"x": 5})).await?, Some(json!(6)));
//! # Ok(())
//! # }
//! ```

pub use proctree_client::{
    build_client, ClientLeaf, ClientOptions, ClientTree, MemoryQueryCache, MutationHandle,
    MutationOptions, QueryCache, QueryKey, QueryOptions, QueryState, QueryStatus, PathMode,
    Subscription,
};
pub use proctree_core::{
    procedure_fn, transport_fn, DottedPath, ErrorCode, Mirror, MirrorTree, Node, Outcome,
    Procedure, ProcedureTree, ProcedureTreeBuilder, Request, RpcError, Transport, TreeError, Value,
};
pub use proctree_router::{build_router, init_logging, init_test_logging, Router};

use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Client options for [`create_rpc`]; the top-level client has no parent path.
#[derive(Clone, Default)]
pub struct RpcOptions {
    pub transport: Option<Arc<dyn Transport>>,
    pub cache: Option<Arc<dyn QueryCache>>,
    pub path_mode: PathMode,
}

impl RpcOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_path_mode(mut self, path_mode: PathMode) -> Self {
        self.path_mode = path_mode;
        self
    }
}

impl From<RpcOptions> for ClientOptions {
    fn from(options: RpcOptions) -> Self {
        ClientOptions {
            parent_path: None,
            transport: options.transport,
            cache: options.cache,
            path_mode: options.path_mode,
        }
    }
}

impl fmt::Debug for RpcOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcOptions")
            .field("transport", &self.transport.is_some())
            .field("cache", &self.cache.is_some())
            .field("path_mode", &self.path_mode)
            .finish()
    }
}

/// Client and router derived from the same procedure tree.
#[derive(Debug)]
pub struct Rpc {
    pub client: ClientTree,
    pub router: Router,
}

pub fn create_rpc(tree: Option<ProcedureTree>, options: RpcOptions) -> Rpc {
    let client = build_client(tree.as_ref(), options.into());
    let router = build_router(tree);
    debug!(procedures = router.paths().len(), "rpc created");
    Rpc { client, router }
}

/// [`create_rpc`] with the client's transport wired straight to the router.
pub fn create_local_rpc(tree: Option<ProcedureTree>) -> Rpc {
    let router = build_router(tree);
    let options = ClientOptions::new().with_transport(router.clone());
    let client = build_client(router.tree(), options);
    Rpc { client, router }
}
