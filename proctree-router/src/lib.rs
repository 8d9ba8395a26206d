pub mod logging;
pub mod router;

pub use logging::{init_logging, init_test_logging};
pub use router::{build_router, Router};
