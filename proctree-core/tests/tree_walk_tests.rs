// Procedure tree shape and path tests
// Random trees are generated, then every dotted path is checked to resolve to
// the procedure stored at that position.

use async_trait::async_trait;
use proctree_core::{
    walk, DottedPath, Mirror, MirrorTree, Node, Procedure, ProcedureTree, RpcError, TreeVisitor,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Procedure that answers with the path it was registered under.
#[derive(Debug)]
struct Tagged(String);

#[async_trait]
impl Procedure for Tagged {
    async fn call(&self, _variables: Value) -> Result<Value, RpcError> {
        Ok(json!(self.0))
    }
}

#[derive(Debug, Clone)]
enum Shape {
    Leaf,
    Namespace(BTreeMap<String, Shape>),
}

fn shape_strategy() -> impl Strategy<Value = BTreeMap<String, Shape>> {
    let leaf = Just(Shape::Leaf);
    let shape = leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::btree_map("[a-z]{1,4}", inner, 1..4).prop_map(Shape::Namespace)
    });
    prop::collection::btree_map("[a-z]{1,4}", shape, 0..5)
}

fn build(shape: &BTreeMap<String, Shape>, parent: Option<&DottedPath>) -> ProcedureTree {
    let mut tree = ProcedureTree::new();
    for (key, node) in shape {
        let path = DottedPath::join(parent, key);
        match node {
            Shape::Leaf => tree
                .insert_procedure(key.clone(), Arc::new(Tagged(path.into_string())))
                .unwrap(),
            Shape::Namespace(children) => tree
                .insert_namespace(key.clone(), build(children, Some(&path)))
                .unwrap(),
        }
    }
    tree
}

struct KeyEcho;

impl TreeVisitor for KeyEcho {
    type Leaf = String;

    fn visit_procedure(&self, key: &str, _procedure: &Arc<dyn Procedure>) -> String {
        key.to_string()
    }

    fn enter_namespace(&self, _key: &str) -> Self {
        KeyEcho
    }
}

fn assert_same_shape(tree: &ProcedureTree, mirror: &MirrorTree<String>) {
    assert_eq!(tree.keys().collect::<Vec<_>>(), mirror.keys().collect::<Vec<_>>());
    for (key, node) in tree.iter() {
        match (node, mirror.get(key).unwrap()) {
            (Node::Procedure(_), Mirror::Leaf(leaf)) => assert_eq!(leaf, key),
            (Node::Namespace(nested), Mirror::Namespace(mirrored)) => {
                assert_same_shape(nested, mirrored)
            }
            _ => panic!("shape mismatch at {key}"),
        }
    }
}

proptest! {
    #[test]
    fn test_walk_mirrors_shape(shape in shape_strategy()) {
        let tree = build(&shape, None);
        let mirror = walk(Some(&tree), &KeyEcho);
        assert_same_shape(&tree, &mirror);
    }

    #[test]
    fn test_paths_are_unique_and_resolve(shape in shape_strategy()) {
        let tree = build(&shape, None);
        let paths = tree.paths();

        let distinct: HashSet<_> = paths.iter().collect();
        prop_assert_eq!(distinct.len(), paths.len());

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        for path in &paths {
            let procedure = tree
                .resolve(path.as_str())
                .and_then(Node::as_procedure)
                .cloned()
                .unwrap();
            let answer = runtime.block_on(procedure.call(json!({}))).unwrap();
            prop_assert_eq!(answer, json!(path.as_str()));
        }
    }
}

#[test]
fn test_example_tree_paths() {
    let tree = build(
        &BTreeMap::from([
            (
                "user".to_string(),
                Shape::Namespace(BTreeMap::from([
                    ("get".to_string(), Shape::Leaf),
                    ("list".to_string(), Shape::Leaf),
                ])),
            ),
            ("ping".to_string(), Shape::Leaf),
        ]),
        None,
    );

    let paths: Vec<String> = tree.paths().into_iter().map(DottedPath::into_string).collect();
    assert_eq!(paths, vec!["ping", "user.get", "user.list"]);
    assert!(tree.resolve("user").and_then(Node::as_procedure).is_none());
}
