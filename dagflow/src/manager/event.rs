use crate::manager::reconfiguration::VertexReconfiguration;

/// Runtime events delivered to a vertex manager.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum VertexManagerEvent {
    /// Split or shard description discovered by a root-input initializer. `index`
    /// counts the data information events of that input.
    RootInputDataInformation {
        input_name: String,
        index: u32,
        payload: Vec<u8>,
    },
    /// Parallelism directive of a root-input initializer, at most one per input
    RootInputSetParallelism { input_name: String, parallelism: u32 },
    /// The initializer of `input_name` completed, always its last event
    RootInputInitialized { input_name: String },
    RootInputFailed { input_name: String, message: String },
    /// An upstream vertex has a final parallelism
    SourceVertexConfigured { source_vertex: String, parallelism: u32 },
    /// An upstream task completed and produced `output_size` bytes
    SourceTaskCompleted {
        source_vertex: String,
        task_index: u32,
        output_size: u64,
    },
}

impl VertexManagerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            VertexManagerEvent::RootInputDataInformation { .. } => "RootInputDataInformation",
            VertexManagerEvent::RootInputSetParallelism { .. } => "RootInputSetParallelism",
            VertexManagerEvent::RootInputInitialized { .. } => "RootInputInitialized",
            VertexManagerEvent::RootInputFailed { .. } => "RootInputFailed",
            VertexManagerEvent::SourceVertexConfigured { .. } => "SourceVertexConfigured",
            VertexManagerEvent::SourceTaskCompleted { .. } => "SourceTaskCompleted",
        }
    }
}

/// Outcome of a vertex manager step.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// Keep waiting for events
    Pending,
    Finalize(VertexReconfiguration),
}

impl Decision {
    pub fn is_pending(&self) -> bool {
        matches!(self, Decision::Pending)
    }
}

/// Events a root-input initializer emits, in order.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum InitializerEvent {
    SetParallelism(u32),
    DataInformation(Vec<u8>),
}
