use crate::procedure::{procedure_fn, Procedure};
use crate::{DottedPath, RpcError, TreeError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A tree position: either a callable leaf or a nested namespace.
#[derive(Clone)]
pub enum Node {
    Procedure(Arc<dyn Procedure>),
    Namespace(ProcedureTree),
}

impl Node {
    pub fn as_procedure(&self) -> Option<&Arc<dyn Procedure>> {
        match self {
            Node::Procedure(procedure) => Some(procedure),
            Node::Namespace(_) => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&ProcedureTree> {
        match self {
            Node::Procedure(_) => None,
            Node::Namespace(tree) => Some(tree),
        }
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Node::Procedure(_))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Procedure(_) => f.write_str("Procedure"),
            Node::Namespace(tree) => f.debug_tuple("Namespace").field(tree).finish(),
        }
    }
}

/// Mapping from keys to procedures or nested trees.
///
/// Built once at setup time and read-only afterwards. Keys are unique per
/// level and never contain `.`, so every leaf has exactly one dotted path.
#[derive(Clone, Default)]
pub struct ProcedureTree {
    nodes: IndexMap<String, Node>,
}

impl ProcedureTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ProcedureTreeBuilder {
        ProcedureTreeBuilder::default()
    }

    pub fn insert_procedure(
        &mut self,
        key: impl Into<String>,
        procedure: Arc<dyn Procedure>,
    ) -> Result<(), TreeError> {
        self.insert(key.into(), Node::Procedure(procedure))
    }

    pub fn insert_namespace(
        &mut self,
        key: impl Into<String>,
        tree: ProcedureTree,
    ) -> Result<(), TreeError> {
        self.insert(key.into(), Node::Namespace(tree))
    }

    fn insert(&mut self, key: String, node: Node) -> Result<(), TreeError> {
        validate_key(&key)?;
        if self.nodes.contains_key(&key) {
            return Err(TreeError::DuplicateKey(key));
        }
        self.nodes.insert(key, node);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Looks up `path` one segment at a time, descending through namespaces.
    pub fn resolve(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split(crate::path::SEPARATOR);
        let mut node = self.nodes.get(segments.next()?)?;
        for segment in segments {
            node = node.as_namespace()?.nodes.get(segment)?;
        }
        Some(node)
    }

    /// Dotted paths of every procedure, in insertion order.
    pub fn paths(&self) -> Vec<DottedPath> {
        crate::walk::walk(Some(self), &PathCollector::default())
            .leaves()
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for ProcedureTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.nodes.iter()).finish()
    }
}

fn validate_key(key: &str) -> Result<(), TreeError> {
    if key.is_empty() {
        return Err(TreeError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty",
        });
    }
    if key.contains(crate::path::SEPARATOR) {
        return Err(TreeError::InvalidKey {
            key: key.to_string(),
            reason: "key must not contain '.'",
        });
    }
    Ok(())
}

#[derive(Default)]
struct PathCollector;

impl crate::walk::TreeVisitor for PathCollector {
    type Leaf = ();

    fn visit_procedure(&self, _key: &str, _procedure: &Arc<dyn Procedure>) {}

    fn enter_namespace(&self, _key: &str) -> Self {
        PathCollector
    }
}

/// Fluent construction of a [`ProcedureTree`].
///
/// The first failing insertion is remembered and reported by
/// [`build`](ProcedureTreeBuilder::build); later insertions are ignored.
#[derive(Default)]
pub struct ProcedureTreeBuilder {
    tree: ProcedureTree,
    error: Option<TreeError>,
}

impl ProcedureTreeBuilder {
    pub fn procedure(mut self, key: impl Into<String>, procedure: impl Procedure + 'static) -> Self {
        if self.error.is_none() {
            let procedure: Arc<dyn Procedure> = Arc::new(procedure);
            self.error = self.tree.insert_procedure(key, procedure).err();
        }
        self
    }

    pub fn function<F, Fut>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.procedure(key, procedure_fn(f))
    }

    pub fn namespace(mut self, key: impl Into<String>, builder: ProcedureTreeBuilder) -> Self {
        if self.error.is_none() {
            self.error = match builder.build() {
                Ok(tree) => self.tree.insert_namespace(key, tree).err(),
                Err(err) => Some(err),
            };
        }
        self
    }

    pub fn build(self) -> Result<ProcedureTree, TreeError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.tree),
        }
    }
}

impl fmt::Debug for ProcedureTreeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureTreeBuilder")
            .field("tree", &self.tree)
            .field("error", &self.error)
            .finish()
    }
}
