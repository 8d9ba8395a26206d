use async_trait::async_trait;
use proctree_core::{Procedure, ProcedureTree, Request, RpcError, Transport};
use proctree_router::{build_router, init_test_logging, Router};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts its invocations and answers with its own name.
#[derive(Debug, Default)]
struct Named {
    name: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl Procedure for Named {
    async fn call(&self, _variables: Value) -> Result<Value, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!(self.name))
    }
}

async fn add_one(variables: Value) -> Result<Value, RpcError> {
    let x = variables["x"]
        .as_i64()
        .ok_or_else(|| RpcError::bad_request("x must be an integer"))?;
    Ok(json!(x + 1))
}

async fn greet(variables: Value) -> Result<Value, RpcError> {
    let name = variables.get("name").and_then(Value::as_str).unwrap_or("world");
    Ok(json!(format!("hello {}", name)))
}

struct Fixture {
    router: Router,
    get: Arc<Named>,
    list: Arc<Named>,
    ping: Arc<Named>,
}

fn fixture() -> Fixture {
    let get = Arc::new(Named { name: "proc1", ..Default::default() });
    let list = Arc::new(Named { name: "proc2", ..Default::default() });
    let ping = Arc::new(Named { name: "proc3", ..Default::default() });

    let mut user = ProcedureTree::new();
    user.insert_procedure("get", get.clone()).unwrap();
    user.insert_procedure("list", list.clone()).unwrap();

    let mut tree = ProcedureTree::new();
    tree.insert_namespace("user", user).unwrap();
    tree.insert_procedure("ping", ping.clone()).unwrap();

    Fixture {
        router: build_router(Some(tree)),
        get,
        list,
        ping,
    }
}

#[tokio::test]
async fn test_distinct_paths_reach_distinct_procedures() {
    init_test_logging();
    let f = fixture();

    for (path, expected) in [("user.get", "proc1"), ("user.list", "proc2"), ("ping", "proc3")] {
        let answer = f.router.handle(Request::new(path, None)).await.unwrap();
        assert_eq!(answer, Some(json!(expected)), "path {}", path);
    }

    assert_eq!(f.get.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.list.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.ping.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_path_returns_none() {
    let f = fixture();
    let answer = f
        .router
        .handle(Request::new("nonexistent.path", None))
        .await
        .unwrap();
    assert_eq!(answer, None);
}

#[tokio::test]
async fn test_namespace_path_returns_none() {
    let f = fixture();
    assert_eq!(f.router.handle(Request::new("user", None)).await.unwrap(), None);
    assert_eq!(f.get.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.list.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_arguments_are_forwarded() {
    let router = build_router(Some(
        ProcedureTree::builder()
            .namespace("user", ProcedureTree::builder().function("get", add_one))
            .build()
            .unwrap(),
    ));

    let request = Request::new("user.get", Some(json!({"x": 5})));
    assert_eq!(router.handle(request).await.unwrap(), Some(json!(6)));

    let err = router
        .handle(Request::new("user.get", Some(json!({"x": "five"}))))
        .await
        .unwrap_err();
    assert_eq!(err, RpcError::bad_request("x must be an integer"));
}

#[tokio::test]
async fn test_absent_variables_match_empty_object() {
    let router = build_router(Some(
        ProcedureTree::builder().function("greet", greet).build().unwrap(),
    ));

    let without = router.handle(Request::new("greet", None)).await.unwrap();
    let with_empty = router
        .handle(Request::new("greet", Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(without, with_empty);
    assert_eq!(without, Some(json!("hello world")));
}

#[tokio::test]
async fn test_router_as_transport() {
    let f = fixture();
    let transport: Arc<dyn Transport> = Arc::new(f.router.clone());
    let answer = transport.send(Request::new("ping", None)).await.unwrap();
    assert_eq!(answer, Some(json!("proc3")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_are_independent() {
    let f = fixture();
    let mut handles = Vec::new();
    for i in 0..32 {
        let router = f.router.clone();
        let path = if i % 2 == 0 { "user.get" } else { "ping" };
        handles.push(tokio::spawn(async move {
            router.handle(Request::new(path, None)).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }
    assert_eq!(f.get.calls.load(Ordering::SeqCst), 16);
    assert_eq!(f.ping.calls.load(Ordering::SeqCst), 16);
}

proptest! {
    #[test]
    fn test_unregistered_paths_never_fail(path in "[a-z.]{0,16}") {
        let f = fixture();
        prop_assume!(!f.router.paths().iter().any(|known| known.as_str() == path));

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let answer = runtime.block_on(f.router.handle(Request::new(path.clone(), None)));
        prop_assert_eq!(answer, Ok(None));
    }
}
