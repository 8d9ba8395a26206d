use crate::cache::{
    run_with_retry, FetchFn, MutationHandle, MutationRequest, QueryCache, QueryKey, QueryRequest,
    QueryState, QueryStatus, RefetchFn, Subscription,
};
use dashmap::DashMap;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace};

/// In-process [`QueryCache`] keeping one shared entry per [`QueryKey`].
///
/// Subscribing with `enabled` to an idle or stale entry starts a fetch on the
/// current tokio runtime. Outside a runtime the entry stays idle until
/// [`Subscription::refetch`] is awaited. A fetch already in flight is never
/// started twice. Each fetch retries as often as the subscriber that started
/// it asked for.
#[derive(Clone, Default)]
pub struct MemoryQueryCache {
    entries: Arc<DashMap<QueryKey, Arc<QueryEntry>>>,
}

struct QueryEntry {
    key: QueryKey,
    fetch: FetchFn,
    state: watch::Sender<QueryState>,
}

impl QueryEntry {
    fn new(request: &QueryRequest) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        QueryEntry {
            key: request.key().clone(),
            fetch: request.fetch_fn(),
            state,
        }
    }

    fn snapshot(&self) -> QueryState {
        self.state.borrow().clone()
    }

    fn needs_fetch(&self, stale_time: Option<Duration>) -> bool {
        let state = self.state.borrow();
        match state.status {
            QueryStatus::Idle => true,
            QueryStatus::Pending => false,
            QueryStatus::Success | QueryStatus::Error => state.is_stale(stale_time),
        }
    }

    /// Moves the entry to `Pending`; false when a fetch is already running.
    fn begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.status == QueryStatus::Pending {
                return false;
            }
            state.begin();
            true
        })
    }

    async fn execute(self: Arc<Self>, retry: u32) {
        trace!(key = %self.key, retry, "fetching query");
        let result = run_with_retry(retry, || (self.fetch)()).await;
        if let Err(err) = &result {
            debug!(key = %self.key, error = %err, "query failed");
        }
        self.state.send_modify(|state| state.settle(&result));
    }

    async fn refetch(self: Arc<Self>, retry: u32) {
        if self.begin() {
            self.execute(retry).await;
        } else {
            let mut rx = self.state.subscribe();
            // Sender lives in `self`, so this only returns once settled.
            let _ = rx.wait_for(QueryState::is_settled).await;
        }
    }
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: &QueryKey) -> Option<QueryState> {
        self.entries.get(key).map(|entry| entry.snapshot())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn entry(&self, request: &QueryRequest) -> Arc<QueryEntry> {
        let slot = self
            .entries
            .entry(request.key().clone())
            .or_insert_with(|| Arc::new(QueryEntry::new(request)));
        Arc::clone(slot.value())
    }
}

impl QueryCache for MemoryQueryCache {
    fn subscribe(&self, request: QueryRequest) -> Subscription {
        let entry = self.entry(&request);
        let options = request.options();
        let retry = options.retry;

        if options.enabled && entry.needs_fetch(options.stale_time) {
            match Handle::try_current() {
                Ok(handle) => {
                    if entry.begin() {
                        handle.spawn(Arc::clone(&entry).execute(retry));
                    }
                }
                Err(_) => debug!(key = %entry.key, "no tokio runtime, query left idle"),
            }
        }

        let refetch_entry = Arc::clone(&entry);
        let refetch: RefetchFn = Arc::new(move || Arc::clone(&refetch_entry).refetch(retry).boxed());
        Subscription::new(request.key().clone(), entry.state.subscribe(), refetch)
    }

    fn mutate(&self, request: MutationRequest) -> MutationHandle {
        MutationHandle::new(request)
    }
}

impl std::fmt::Debug for MemoryQueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryQueryCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
