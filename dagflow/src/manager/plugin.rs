use std::collections::HashMap;
use std::sync::Arc;

use crate::api::descriptor::VertexManagerPluginDescriptor;
use crate::api::{DagError, Result};
use crate::dag::edge::DataMovementType;
use crate::dag::plan::DagPlan;
use crate::dag::vertex::Vertex;
use crate::dag::{EdgeId, Parallelism};
use crate::manager::event::{Decision, VertexManagerEvent};
use crate::manager::immediate_start::ImmediateStartVertexManager;
use crate::manager::root_input::RootInputVertexManager;
use crate::manager::shuffle::ShuffleVertexManager;

pub const IMMEDIATE_START_VERTEX_MANAGER: &str = "dagflow.manager.ImmediateStartVertexManager";
pub const ROOT_INPUT_VERTEX_MANAGER: &str = "dagflow.manager.RootInputVertexManager";
pub const SHUFFLE_VERTEX_MANAGER: &str = "dagflow.manager.ShuffleVertexManager";

/// An edge feeding the managed vertex
#[derive(Clone, Debug, PartialEq)]
pub struct InputEdgeInfo {
    pub edge_id: EdgeId,
    pub source_vertex: String,
    pub data_movement: DataMovementType,
    /// class name of the source output
    pub output_class: String,
    /// payload of the source output, rewritten by managers that change routing
    pub output_payload: Option<Vec<u8>>,
}

/// What a vertex manager sees of its vertex.
#[derive(Clone, Debug)]
pub struct VertexManagerContext {
    vertex_name: String,
    parallelism: Parallelism,
    user_payload: Option<Vec<u8>>,
    input_edges: Vec<InputEdgeInfo>,
    /// root inputs with an initializer
    initialized_inputs: Vec<String>,
    /// upstream vertex -> final parallelism, as far as known
    source_parallelism: HashMap<String, u32>,
}

impl VertexManagerContext {
    pub fn new(vertex_name: &str, parallelism: Parallelism) -> Self {
        VertexManagerContext {
            vertex_name: vertex_name.to_string(),
            parallelism,
            user_payload: None,
            input_edges: Vec::new(),
            initialized_inputs: Vec::new(),
            source_parallelism: HashMap::new(),
        }
    }

    pub fn from_plan(plan: &DagPlan, vertex: &Vertex) -> Self {
        let mut context = VertexManagerContext::new(vertex.name(), vertex.parallelism());
        context.user_payload = vertex
            .vertex_manager_plugin()
            .and_then(|d| d.user_payload().map(|p| p.to_vec()));
        context.initialized_inputs = vertex
            .initialized_inputs()
            .map(|input| input.name().to_string())
            .collect();

        for edge_id in vertex.input_edges() {
            if let Some(edge) = plan.edge(edge_id) {
                context.input_edges.push(InputEdgeInfo {
                    edge_id: edge_id.clone(),
                    source_vertex: edge.source().to_string(),
                    data_movement: edge.property().data_movement(),
                    output_class: edge.property().edge_source().class_name().to_string(),
                    output_payload: edge
                        .property()
                        .edge_source()
                        .user_payload()
                        .map(|p| p.to_vec()),
                });

                // a source that may still be reconfigured is known once it finalizes
                if let Some(source) = plan.vertex(edge.source()) {
                    if let (false, Some(n)) =
                        (source.needs_reconfiguration(), source.parallelism().fixed())
                    {
                        context.set_source_parallelism(source.name(), n);
                    }
                }
            }
        }

        context
    }

    pub fn with_user_payload(mut self, user_payload: Vec<u8>) -> Self {
        self.user_payload = Some(user_payload);
        self
    }

    pub fn with_input_edge(mut self, input_edge: InputEdgeInfo) -> Self {
        self.input_edges.push(input_edge);
        self
    }

    pub fn with_initialized_input(mut self, input_name: &str) -> Self {
        self.initialized_inputs.push(input_name.to_string());
        self
    }

    pub fn vertex_name(&self) -> &str {
        self.vertex_name.as_str()
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    pub fn user_payload(&self) -> Option<&[u8]> {
        self.user_payload.as_deref()
    }

    pub fn input_edges(&self) -> &[InputEdgeInfo] {
        self.input_edges.as_slice()
    }

    pub fn initialized_inputs(&self) -> &[String] {
        self.initialized_inputs.as_slice()
    }

    pub fn source_parallelism(&self, source_vertex: &str) -> Option<u32> {
        self.source_parallelism.get(source_vertex).cloned()
    }

    pub(crate) fn set_source_parallelism(&mut self, source_vertex: &str, parallelism: u32) {
        self.source_parallelism
            .insert(source_vertex.to_string(), parallelism);
    }
}

/// Runtime hook deciding the final parallelism and routing of one vertex.
///
/// Calls for one vertex never overlap. A plugin returns [`Decision::Finalize`] at
/// most once; the vertex rejects every event after that.
pub trait VertexManagerPlugin: Send {
    fn initialize(&mut self, context: &VertexManagerContext) -> anyhow::Result<Decision>;

    fn on_event(
        &mut self,
        context: &VertexManagerContext,
        event: &VertexManagerEvent,
    ) -> anyhow::Result<Decision>;
}

pub type PluginFactory = Arc<dyn Fn() -> Box<dyn VertexManagerPlugin> + Send + Sync>;

/// Vertex manager plugins by class name
#[derive(Clone)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        PluginRegistry {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, class_name: &str, factory: F)
    where
        F: Fn() -> Box<dyn VertexManagerPlugin> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(class_name.to_string(), Arc::new(factory))
            .is_some()
        {
            warn!("vertex manager plugin `{}` replaced", class_name);
        }
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    pub fn create(
        &self,
        descriptor: &VertexManagerPluginDescriptor,
    ) -> Result<Box<dyn VertexManagerPlugin>> {
        self.create_by_name(descriptor.class_name())
    }

    pub fn create_by_name(&self, class_name: &str) -> Result<Box<dyn VertexManagerPlugin>> {
        self.factories
            .get(class_name)
            .map(|factory| factory())
            .ok_or_else(|| {
                DagError::invalid_argument(format!(
                    "vertex manager plugin `{}` not registered",
                    class_name
                ))
            })
    }

    /// The plugin driving `vertex`, `None` when the vertex is final at submission.
    pub fn plugin_for(&self, vertex: &Vertex) -> Result<Option<Box<dyn VertexManagerPlugin>>> {
        if let Some(descriptor) = vertex.vertex_manager_plugin() {
            return self.create(descriptor).map(Some);
        }
        if vertex.initialized_inputs().next().is_some() {
            return self.create_by_name(ROOT_INPUT_VERTEX_MANAGER).map(Some);
        }
        Ok(None)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        let mut registry = PluginRegistry::empty();
        registry.register(IMMEDIATE_START_VERTEX_MANAGER, || {
            Box::new(ImmediateStartVertexManager::default())
        });
        registry.register(ROOT_INPUT_VERTEX_MANAGER, || {
            Box::new(RootInputVertexManager::default())
        });
        registry.register(SHUFFLE_VERTEX_MANAGER, || {
            Box::new(ShuffleVertexManager::default())
        });
        registry
    }
}
