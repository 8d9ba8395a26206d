// proctree client
// Mirrors a procedure tree into a tree of call sites. Every leaf can:
// - dispatch `{ procedure, variables }` through the configured transport
// - subscribe to a cached query of that call
// - hand out a mutation handle bound to that call

use crate::cache::{
    FetchFn, InvokeFn, MutationHandle, MutationOptions, MutationRequest, QueryCache, QueryKey,
    QueryOptions, QueryRequest, Subscription,
};
use crate::memory::MemoryQueryCache;
use futures::FutureExt;
use proctree_core::{
    walk, DottedPath, MirrorTree, Procedure, ProcedureTree, Request, RpcError, Transport,
    TreeVisitor,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// How namespace keys are folded into the dotted path of their leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMode {
    /// Every enclosing key is kept: `a.b.c`.
    #[default]
    FullPrefix,
    /// Only the innermost enclosing key is kept: `b.c`.
    InnermostParent,
}

/// Client configuration
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Prefix joined in front of every top-level key
    pub parent_path: Option<DottedPath>,
    /// Executes calls; without one every call yields no result
    pub transport: Option<Arc<dyn Transport>>,
    /// Backs `use_query` / `use_mutation`; defaults to a fresh [`MemoryQueryCache`]
    pub cache: Option<Arc<dyn QueryCache>>,
    pub path_mode: PathMode,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_parent_path(mut self, parent_path: impl Into<DottedPath>) -> Self {
        self.parent_path = Some(parent_path.into());
        self
    }

    pub fn with_path_mode(mut self, path_mode: PathMode) -> Self {
        self.path_mode = path_mode;
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("parent_path", &self.parent_path)
            .field("transport", &self.transport.is_some())
            .field("cache", &self.cache.is_some())
            .field("path_mode", &self.path_mode)
            .finish()
    }
}

pub type ClientTree = MirrorTree<ClientLeaf>;

/// Builds the client mirror of `tree`. An absent tree gives an empty client.
pub fn build_client(tree: Option<&ProcedureTree>, options: ClientOptions) -> ClientTree {
    let cache = options
        .cache
        .unwrap_or_else(|| Arc::new(MemoryQueryCache::new()) as Arc<dyn QueryCache>);

    let builder = ClientBuilder {
        parent: options.parent_path,
        transport: options.transport,
        cache,
        path_mode: options.path_mode,
    };
    walk(tree, &builder)
}

struct ClientBuilder {
    parent: Option<DottedPath>,
    transport: Option<Arc<dyn Transport>>,
    cache: Arc<dyn QueryCache>,
    path_mode: PathMode,
}

impl TreeVisitor for ClientBuilder {
    type Leaf = ClientLeaf;

    fn visit_procedure(&self, key: &str, _procedure: &Arc<dyn Procedure>) -> ClientLeaf {
        let path = DottedPath::join(self.parent.as_ref(), key);
        trace!(%path, "client leaf");
        ClientLeaf {
            key: key.to_string(),
            dispatcher: Arc::new(Dispatcher {
                path,
                transport: self.transport.clone(),
            }),
            cache: Arc::clone(&self.cache),
        }
    }

    fn enter_namespace(&self, key: &str) -> Self {
        let parent = match self.path_mode {
            PathMode::FullPrefix => DottedPath::join(self.parent.as_ref(), key),
            PathMode::InnermostParent => DottedPath::new(key),
        };
        ClientBuilder {
            parent: Some(parent),
            transport: self.transport.clone(),
            cache: Arc::clone(&self.cache),
            path_mode: self.path_mode,
        }
    }
}

struct Dispatcher {
    path: DottedPath,
    transport: Option<Arc<dyn Transport>>,
}

impl Dispatcher {
    async fn dispatch(&self, variables: Option<Value>) -> Result<Option<Value>, RpcError> {
        let Some(transport) = &self.transport else {
            trace!(procedure = %self.path, "no transport configured, call yields no result");
            return Ok(None);
        };

        debug!(procedure = %self.path, "dispatching call");
        transport
            .send(Request::for_path(&self.path, variables))
            .await
    }
}

/// Call site for a single procedure.
#[derive(Clone)]
pub struct ClientLeaf {
    key: String,
    dispatcher: Arc<Dispatcher>,
    cache: Arc<dyn QueryCache>,
}

impl ClientLeaf {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &DottedPath {
        &self.dispatcher.path
    }

    /// Sends `variables` to this procedure through the transport.
    pub async fn call(&self, variables: Value) -> Result<Option<Value>, RpcError> {
        self.dispatcher.dispatch(Some(variables)).await
    }

    /// Query keyed by `[key, variables]` whose fetch is this call.
    pub fn use_query(&self, variables: Option<Value>, options: QueryOptions) -> Subscription {
        let key = QueryKey::new(self.key.as_str(), variables.clone());
        let dispatcher = Arc::clone(&self.dispatcher);
        let fetch: FetchFn = Arc::new(move || {
            let dispatcher = Arc::clone(&dispatcher);
            let variables = variables.clone();
            async move { dispatcher.dispatch(variables).await }.boxed()
        });
        self.cache.subscribe(QueryRequest::new(key, fetch, options))
    }

    /// Mutation whose trigger is this call.
    pub fn use_mutation(&self, options: MutationOptions) -> MutationHandle {
        let dispatcher = Arc::clone(&self.dispatcher);
        let invoke: InvokeFn = Arc::new(move |variables: Value| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.dispatch(Some(variables)).await }.boxed()
        });
        self.cache.mutate(MutationRequest::new(invoke, options))
    }
}

impl fmt::Debug for ClientLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientLeaf")
            .field("key", &self.key)
            .field("path", &self.dispatcher.path)
            .field("transport", &self.dispatcher.transport.is_some())
            .finish()
    }
}
