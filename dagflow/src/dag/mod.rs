//! DAG builder
//! vertex/edge/group -> job_dag -> plan

use std::convert::TryFrom;

use crate::api::DagError;

pub mod edge;
pub mod job_dag;
pub mod plan;
pub mod utils;
pub mod vertex;
pub mod vertex_group;

pub use edge::{DataMovementType, DataSourceType, Edge, EdgeProperty, SchedulingType};
pub use job_dag::JobDag;
pub use plan::DagPlan;
pub use vertex::Vertex;
pub use vertex_group::{GroupInfo, GroupInputEdge, VertexGroup};

/// Number of tasks of a vertex.
#[derive(Copy, Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub enum Parallelism {
    Fixed(u32),
    /// decided at runtime by a vertex manager or a root-input initializer
    Deferred,
}

impl Parallelism {
    pub fn fixed(&self) -> Option<u32> {
        match self {
            Parallelism::Fixed(n) => Some(*n),
            Parallelism::Deferred => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Parallelism::Deferred)
    }

    /// `-1` when deferred. Fails when a fixed parallelism does not fit in `i32`.
    pub fn as_i32(&self) -> Result<i32, DagError> {
        match self {
            Parallelism::Fixed(n) => i32::try_from(*n).map_err(|_| {
                DagError::invalid_argument(format!("Parallelism {} out of range", n))
            }),
            Parallelism::Deferred => Ok(-1),
        }
    }

    /// Whether a fixed parallelism equals `count`, e.g. the number of location hints.
    pub fn matches_count(&self, count: usize) -> bool {
        match (self.fixed(), u32::try_from(count)) {
            (Some(n), Ok(count)) => n == count,
            _ => false,
        }
    }
}

impl TryFrom<i32> for Parallelism {
    type Error = DagError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Parallelism::Deferred),
            n => u32::try_from(n).map(Parallelism::Fixed).map_err(|_| {
                DagError::invalid_argument(format!(
                    "Parallelism should be -1 if determined at runtime, otherwise should be >= 0, found {}",
                    n
                ))
            }),
        }
    }
}

impl std::fmt::Display for Parallelism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parallelism::Fixed(n) => write!(f, "{}", n),
            Parallelism::Deferred => write!(f, "-1"),
        }
    }
}

/// (source, destination) vertex pair, unique within a DAG
#[derive(Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EdgeId {
    source: String,
    destination: String,
}

impl EdgeId {
    pub fn new(source: &str, destination: &str) -> Self {
        EdgeId {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    pub fn destination(&self) -> &str {
        self.destination.as_str()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.source, self.destination)
    }
}
