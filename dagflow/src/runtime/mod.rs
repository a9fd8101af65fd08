pub mod coordinator;
pub mod logger;

pub use coordinator::{DagScheduler, VertexOutcome};
pub use logger::init_log;
