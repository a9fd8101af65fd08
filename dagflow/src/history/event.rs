use crate::utils::date_time::{current_timestamp_millis, timestamp_str};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum HistoryEventType {
    DagSubmitted { vertex_count: usize },
    /// the vertex manager of the vertex is running
    VertexInitialized { vertex_name: String },
    /// a vertex manager decided at runtime
    VertexReconfigured { vertex_name: String, parallelism: u32 },
    /// final at submission, no vertex manager involved
    VertexFinalized { vertex_name: String, parallelism: u32 },
    DagAborted { reason: String },
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct HistoryEvent {
    pub dag_name: String,
    /// millis
    pub timestamp: u64,
    pub event_type: HistoryEventType,
}

impl HistoryEvent {
    pub fn new(dag_name: &str, event_type: HistoryEventType) -> Self {
        HistoryEvent {
            dag_name: dag_name.to_string(),
            timestamp: current_timestamp_millis(),
            event_type,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).map_err(|e| anyhow!("serialize history event error. {}", e))
    }
}

impl std::fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {:?}",
            timestamp_str(self.timestamp),
            self.dag_name,
            self.event_type
        )
    }
}
