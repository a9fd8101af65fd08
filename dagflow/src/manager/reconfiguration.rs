use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::api::DagError;
use crate::dag::EdgeId;

#[atomic_enum]
#[derive(Serialize, Deserialize, PartialEq)]
pub enum ReconfigState {
    /// Submitted, vertex manager not initialized yet
    Uninitialized = 0,
    /// Not eligible for scheduling until the vertex manager decides
    AwaitingEvents = 1,
    /// The vertex manager is consuming an event
    Reconfiguring = 2,
    /// Parallelism and routing are final
    Finalized = 3,
    /// The job was aborted or the vertex manager failed before finalizing
    Aborted = 4,
}

impl Default for ReconfigState {
    fn default() -> Self {
        ReconfigState::Uninitialized
    }
}

impl ReconfigState {
    pub fn is_terminated(&self) -> bool {
        match self {
            ReconfigState::Finalized | ReconfigState::Aborted => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ReconfigState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconfigState::Uninitialized => write!(f, "Uninitialized"),
            ReconfigState::AwaitingEvents => write!(f, "AwaitingEvents"),
            ReconfigState::Reconfiguring => write!(f, "Reconfiguring"),
            ReconfigState::Finalized => write!(f, "Finalized"),
            ReconfigState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Destination task of every source partition (or root-input split), by index.
pub type RoutingTable = Vec<u32>;

/// The single final decision of a vertex manager.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct VertexReconfiguration {
    parallelism: u32,
    /// source vertex or root input name -> routing
    routing: BTreeMap<String, RoutingTable>,
    /// replacement output payload of the vertex's own edges
    #[serde(with = "edge_payload_entries")]
    edge_payloads: BTreeMap<EdgeId, Vec<u8>>,
}

/// `EdgeId` is not a string, so the map travels as a list of entries.
mod edge_payload_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::dag::EdgeId;

    pub fn serialize<S>(
        payloads: &BTreeMap<EdgeId, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(payloads.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<EdgeId, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(EdgeId, Vec<u8>)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl VertexReconfiguration {
    pub fn new(parallelism: u32) -> Self {
        VertexReconfiguration {
            parallelism,
            routing: BTreeMap::new(),
            edge_payloads: BTreeMap::new(),
        }
    }

    pub fn with_routing(mut self, source: &str, routing: RoutingTable) -> Self {
        self.routing.insert(source.to_string(), routing);
        self
    }

    pub fn with_edge_payload(mut self, edge_id: EdgeId, payload: Vec<u8>) -> Self {
        self.edge_payloads.insert(edge_id, payload);
        self
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn routing(&self) -> &BTreeMap<String, RoutingTable> {
        &self.routing
    }

    pub fn edge_payloads(&self) -> &BTreeMap<EdgeId, Vec<u8>> {
        &self.edge_payloads
    }
}

/// Per-vertex reconfiguration state machine.
///
/// Owned by the single task consuming the vertex's events; the state is mirrored in
/// an atomic so other tasks can read it without locking.
pub struct ReconfigurationState {
    vertex_name: String,
    state: Arc<AtomicReconfigState>,
    decision: Option<VertexReconfiguration>,
}

impl ReconfigurationState {
    pub fn new(vertex_name: &str) -> Self {
        ReconfigurationState {
            vertex_name: vertex_name.to_string(),
            state: Arc::new(AtomicReconfigState::new(ReconfigState::Uninitialized)),
            decision: None,
        }
    }

    pub fn vertex_name(&self) -> &str {
        self.vertex_name.as_str()
    }

    pub fn state(&self) -> ReconfigState {
        self.state.load(Ordering::SeqCst)
    }

    /// Shared read-only view of the state
    pub fn state_ref(&self) -> Arc<AtomicReconfigState> {
        self.state.clone()
    }

    pub fn decision(&self) -> Option<&VertexReconfiguration> {
        self.decision.as_ref()
    }

    /// `Uninitialized -> AwaitingEvents`
    pub fn await_events(&mut self) -> crate::api::Result<()> {
        match self.state() {
            ReconfigState::Uninitialized => {
                self.set_state(ReconfigState::AwaitingEvents);
                Ok(())
            }
            state => Err(self.illegal_transition(state, ReconfigState::AwaitingEvents)),
        }
    }

    /// Enter `Reconfiguring` to consume one event. Fails once finalized or aborted.
    pub fn begin_event(&mut self) -> crate::api::Result<()> {
        match self.state() {
            ReconfigState::AwaitingEvents | ReconfigState::Reconfiguring => {
                self.set_state(ReconfigState::Reconfiguring);
                Ok(())
            }
            state => Err(self.illegal_transition(state, ReconfigState::Reconfiguring)),
        }
    }

    /// The event was consumed without a decision.
    pub fn end_event(&mut self) {
        if self.state() == ReconfigState::Reconfiguring {
            self.set_state(ReconfigState::AwaitingEvents);
        }
    }

    /// Record the final decision. A second decision is rejected and the first one
    /// is kept.
    pub fn finalize(&mut self, decision: VertexReconfiguration) -> crate::api::Result<&VertexReconfiguration> {
        match self.state() {
            ReconfigState::Finalized | ReconfigState::Aborted => {
                Err(self.illegal_transition(self.state(), ReconfigState::Finalized))
            }
            _ => {
                self.set_state(ReconfigState::Finalized);
                Ok(self.decision.insert(decision))
            }
        }
    }

    /// Returns false if the vertex had already finalized.
    pub fn abort(&mut self) -> bool {
        if self.state() == ReconfigState::Finalized {
            return false;
        }
        self.set_state(ReconfigState::Aborted);
        true
    }

    fn set_state(&self, state: ReconfigState) {
        self.state.store(state, Ordering::SeqCst);
    }

    fn illegal_transition(&self, from: ReconfigState, to: ReconfigState) -> DagError {
        DagError::invalid_state(format!(
            "vertex `{}` can not move from {} to {}",
            self.vertex_name, from, to
        ))
    }
}
