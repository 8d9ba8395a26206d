pub mod cache;
pub mod client;
pub mod memory;

pub use cache::{
    MutationHandle, MutationOptions, MutationRequest, QueryCache, QueryKey, QueryOptions,
    QueryRequest, QueryState, QueryStatus, Subscription,
};
pub use client::{build_client, ClientLeaf, ClientOptions, ClientTree, PathMode};
pub use memory::MemoryQueryCache;
