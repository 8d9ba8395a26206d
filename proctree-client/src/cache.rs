//! Cache-and-fetch collaborator seam.
//!
//! The client never decides staleness, retries or invalidation itself. Every
//! `use_query` / `use_mutation` call is turned into a [`QueryRequest`] or
//! [`MutationRequest`] and handed to the injected [`QueryCache`]. The key and
//! the fetch/invoke action inside those requests are fixed by the client; the
//! options next to them are forwarded untouched.

use futures::future::BoxFuture;
use proctree_core::RpcError;
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

pub type FetchFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Option<Value>, RpcError>> + Send + Sync>;
pub type InvokeFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Option<Value>, RpcError>> + Send + Sync>;
pub type RefetchFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub trait QueryCache: Send + Sync {
    fn subscribe(&self, request: QueryRequest) -> Subscription;

    fn mutate(&self, request: MutationRequest) -> MutationHandle;
}

/// `[key, variables]`, compared by its JSON encoding.
#[derive(Debug, Clone)]
pub struct QueryKey {
    key: String,
    variables: Option<Value>,
    encoded: String,
}

impl QueryKey {
    pub fn new(key: impl Into<String>, variables: Option<Value>) -> Self {
        let key = key.into();
        let encoded = json!([key, variables]).to_string();
        QueryKey {
            key,
            variables,
            encoded,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn variables(&self) -> Option<&Value> {
        self.variables.as_ref()
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encoded.hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Query options forwarded to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Fetch as soon as the subscription is created
    pub enabled: bool,
    /// How long a settled result counts as fresh; `None` means never
    pub stale_time: Option<Duration>,
    /// Extra attempts after a failed fetch
    pub retry: u32,
    /// Opaque data for the cache implementation
    pub meta: Option<Value>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: None,
            retry: 0,
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationOptions {
    pub retry: u32,
    pub meta: Option<Value>,
}

pub struct QueryRequest {
    key: QueryKey,
    fetch: FetchFn,
    options: QueryOptions,
}

impl QueryRequest {
    pub(crate) fn new(key: QueryKey, fetch: FetchFn, options: QueryOptions) -> Self {
        QueryRequest {
            key,
            fetch,
            options,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn fetch_fn(&self) -> FetchFn {
        Arc::clone(&self.fetch)
    }

    pub fn fetch(&self) -> BoxFuture<'static, Result<Option<Value>, RpcError>> {
        (self.fetch)()
    }
}

impl fmt::Debug for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

pub struct MutationRequest {
    invoke: InvokeFn,
    options: MutationOptions,
}

impl MutationRequest {
    pub(crate) fn new(invoke: InvokeFn, options: MutationOptions) -> Self {
        MutationRequest { invoke, options }
    }

    pub fn options(&self) -> &MutationOptions {
        &self.options
    }

    pub fn invoke_fn(&self) -> InvokeFn {
        Arc::clone(&self.invoke)
    }
}

impl fmt::Debug for MutationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationRequest")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<RpcError>,
    pub updated_at: Option<Instant>,
}

impl QueryState {
    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Success | QueryStatus::Error)
    }

    pub fn is_stale(&self, stale_time: Option<Duration>) -> bool {
        match (self.updated_at, stale_time) {
            (Some(updated_at), Some(stale_time)) => updated_at.elapsed() >= stale_time,
            _ => true,
        }
    }

    /// Marks a fetch as in flight. Previous data stays visible.
    pub fn begin(&mut self) {
        self.status = QueryStatus::Pending;
    }

    pub fn settle(&mut self, result: &Result<Option<Value>, RpcError>) {
        match result {
            Ok(data) => {
                self.status = QueryStatus::Success;
                self.data = data.clone();
                self.error = None;
            }
            Err(err) => {
                self.status = QueryStatus::Error;
                self.error = Some(err.clone());
            }
        }
        self.updated_at = Some(Instant::now());
    }
}

/// Runs `attempt`, retrying failures up to `retry` more times.
pub(crate) async fn run_with_retry<F, Fut>(retry: u32, mut attempt: F) -> Result<Option<Value>, RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<Value>, RpcError>>,
{
    let mut remaining = retry;
    loop {
        match attempt().await {
            Err(err) if remaining > 0 => {
                remaining -= 1;
                debug!(error = %err, remaining, "attempt failed, retrying");
            }
            result => return result,
        }
    }
}

/// Managed query subscription returned by `use_query`.
pub struct Subscription {
    key: QueryKey,
    state: watch::Receiver<QueryState>,
    refetch: RefetchFn,
}

impl Subscription {
    pub fn new(key: QueryKey, state: watch::Receiver<QueryState>, refetch: RefetchFn) -> Self {
        Subscription {
            key,
            state,
            refetch,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> QueryStatus {
        self.state.borrow().status
    }

    pub fn data(&self) -> Option<Value> {
        self.state.borrow().data.clone()
    }

    pub fn error(&self) -> Option<RpcError> {
        self.state.borrow().error.clone()
    }

    pub async fn refetch(&self) -> QueryState {
        (self.refetch)().await;
        self.state()
    }

    /// Waits until no fetch is in flight.
    ///
    /// An idle query (disabled, or subscribed outside a runtime) is returned
    /// as-is; call [`refetch`](Subscription::refetch) to load it.
    pub async fn settled(&self) -> QueryState {
        let mut rx = self.state.clone();
        let settled = rx
            .wait_for(|state| state.status != QueryStatus::Pending)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Receiver that observes every state change of this query.
    pub fn watch(&self) -> watch::Receiver<QueryState> {
        self.state.clone()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Managed mutation returned by `use_mutation`.
pub struct MutationHandle {
    invoke: InvokeFn,
    options: MutationOptions,
    state: watch::Sender<QueryState>,
}

impl MutationHandle {
    pub fn new(request: MutationRequest) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        MutationHandle {
            invoke: request.invoke,
            options: request.options,
            state,
        }
    }

    /// Triggers the mutation and records its outcome.
    pub async fn mutate(&self, variables: Value) -> Result<Option<Value>, RpcError> {
        self.state.send_modify(QueryState::begin);
        let result = run_with_retry(self.options.retry, || (self.invoke)(variables.clone())).await;
        self.state.send_modify(|state| state.settle(&result));
        result
    }

    pub fn reset(&self) {
        self.state.send_replace(QueryState::default());
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> QueryStatus {
        self.state.borrow().status
    }

    pub fn data(&self) -> Option<Value> {
        self.state.borrow().data.clone()
    }

    pub fn error(&self) -> Option<RpcError> {
        self.state.borrow().error.clone()
    }

    pub fn options(&self) -> &MutationOptions {
        &self.options
    }

    pub fn watch(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }
}

impl fmt::Debug for MutationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHandle")
            .field("options", &self.options)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
