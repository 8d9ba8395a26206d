pub mod error;
pub mod msg;
pub mod path;
pub mod procedure;
pub mod transport;
pub mod tree;
pub mod walk;

pub use error::{ErrorCode, RpcError, TreeError};
pub use msg::{Outcome, Request};
pub use path::DottedPath;
pub use procedure::{procedure_fn, FnProcedure, Procedure};
pub use transport::{transport_fn, FnTransport, Transport};
pub use tree::{Node, ProcedureTree, ProcedureTreeBuilder};
pub use walk::{walk, Mirror, MirrorTree, TreeVisitor};

// Arguments and results travel as JSON values.
pub use serde_json::Value;
