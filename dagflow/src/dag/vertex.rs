use std::collections::HashMap;

use crate::api::descriptor::{
    InputDescriptor, InputInitializerDescriptor, OutputCommitterDescriptor, OutputDescriptor,
    ProcessorDescriptor, VertexManagerPluginDescriptor,
};
use crate::api::resource::{LocalResource, Resource, TaskLocationHint, VertexLocationHint};
use crate::api::{DagError, Result};
use crate::dag::vertex_group::GroupInfo;
use crate::dag::{EdgeId, Parallelism};

/// A named input read from, or output written to, outside the DAG.
///
/// `controller` is the input initializer of a root input, or the committer of a leaf
/// output.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RootInputLeafOutput<D, C> {
    name: String,
    descriptor: D,
    controller: Option<C>,
}

impl<D, C> RootInputLeafOutput<D, C> {
    pub fn new(name: &str, descriptor: D, controller: Option<C>) -> Self {
        RootInputLeafOutput {
            name: name.to_string(),
            descriptor,
            controller,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    pub fn controller(&self) -> Option<&C> {
        self.controller.as_ref()
    }
}

pub type RootInput = RootInputLeafOutput<InputDescriptor, InputInitializerDescriptor>;
pub type LeafOutput = RootInputLeafOutput<OutputDescriptor, OutputCommitterDescriptor>;

/// A computation stage of the DAG.
///
/// Setters return the vertex for chaining. Edge and group bookkeeping is written only
/// by the enclosing [`crate::dag::JobDag`] and exposed here as read-only slices.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Vertex {
    name: String,
    processor_descriptor: ProcessorDescriptor,
    parallelism: Parallelism,
    task_resource: Resource,

    task_locations_hint: Option<VertexLocationHint>,
    task_local_files: HashMap<String, LocalResource>,
    task_environment: HashMap<String, String>,
    task_launch_cmd_opts: String,

    additional_inputs: Vec<RootInput>,
    additional_outputs: Vec<LeafOutput>,
    vertex_manager_plugin: Option<VertexManagerPluginDescriptor>,

    input_vertices: Vec<String>,
    output_vertices: Vec<String>,
    input_edges: Vec<EdgeId>,
    output_edges: Vec<EdgeId>,
    group_inputs: HashMap<String, GroupInfo>,
}

impl Vertex {
    /// `parallelism` is `-1` when a vertex manager or a root-input initializer decides
    /// it at runtime, otherwise `>= 0`.
    pub fn new(
        name: &str,
        processor_descriptor: ProcessorDescriptor,
        parallelism: i32,
        task_resource: Resource,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(DagError::invalid_argument("Vertex name cannot be empty"));
        }
        let parallelism = Parallelism::try_from(parallelism)?;

        Ok(Vertex {
            name: name.to_string(),
            processor_descriptor,
            parallelism,
            task_resource,
            task_locations_hint: None,
            task_local_files: HashMap::new(),
            task_environment: HashMap::new(),
            task_launch_cmd_opts: "".to_string(),
            additional_inputs: Vec::new(),
            additional_outputs: Vec::new(),
            vertex_manager_plugin: None,
            input_vertices: Vec::new(),
            output_vertices: Vec::new(),
            input_edges: Vec::new(),
            output_edges: Vec::new(),
            group_inputs: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn processor_descriptor(&self) -> &ProcessorDescriptor {
        &self.processor_descriptor
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Only the reconfiguration protocol changes parallelism after construction.
    pub(crate) fn set_parallelism(&mut self, parallelism: Parallelism) {
        if let Some(hint) = &self.task_locations_hint {
            if !parallelism.matches_count(hint.len()) {
                warn!(
                    "vertex `{}` parallelism changed from {} to {}, drop {} location hints",
                    self.name,
                    self.parallelism,
                    parallelism,
                    hint.len()
                );
                self.task_locations_hint = None;
            }
        }
        self.parallelism = parallelism;
    }

    pub fn task_resource(&self) -> &Resource {
        &self.task_resource
    }

    /// Hints must cover every task, so their count must equal the parallelism.
    /// `None` leaves the current hints untouched; a new list replaces the old one.
    pub fn set_task_locations_hint(
        &mut self,
        locations: Option<Vec<TaskLocationHint>>,
    ) -> Result<&mut Self> {
        let locations = match locations {
            Some(locations) => locations,
            None => return Ok(self),
        };

        if !self.parallelism.matches_count(locations.len()) {
            return Err(DagError::invalid_argument(format!(
                "Locations array length {} must match the parallelism {} set for the vertex `{}`",
                locations.len(),
                self.parallelism,
                self.name
            )));
        }

        self.task_locations_hint = Some(VertexLocationHint(locations));
        Ok(self)
    }

    pub fn task_locations_hint(&self) -> Option<&VertexLocationHint> {
        self.task_locations_hint.as_ref()
    }

    /// Replace the whole local resource map; `None` clears it.
    pub fn set_task_local_files(
        &mut self,
        local_files: Option<HashMap<String, LocalResource>>,
    ) -> &mut Self {
        self.task_local_files = local_files.unwrap_or_default();
        self
    }

    pub fn task_local_files(&self) -> &HashMap<String, LocalResource> {
        &self.task_local_files
    }

    /// Merge into the current environment, later values win.
    pub fn set_task_environment(&mut self, environment: HashMap<String, String>) -> &mut Self {
        self.task_environment.extend(environment);
        self
    }

    pub fn task_environment(&self) -> &HashMap<String, String> {
        &self.task_environment
    }

    pub fn set_task_launch_cmd_opts(&mut self, cmd_opts: &str) -> &mut Self {
        self.task_launch_cmd_opts = cmd_opts.to_string();
        self
    }

    pub fn task_launch_cmd_opts(&self) -> &str {
        self.task_launch_cmd_opts.as_str()
    }

    /// Add an input read directly from an external source. With an initializer, the
    /// initializer may decide the vertex parallelism at runtime.
    pub fn add_input(
        &mut self,
        input_name: &str,
        input_descriptor: InputDescriptor,
        input_initializer: Option<InputInitializerDescriptor>,
    ) -> Result<&mut Self> {
        if self.additional_inputs.iter().any(|i| i.name == input_name) {
            return Err(DagError::DuplicateKey(format!(
                "Vertex `{}` already has an input named `{}`",
                self.name, input_name
            )));
        }

        self.additional_inputs.push(RootInputLeafOutput::new(
            input_name,
            input_descriptor,
            input_initializer,
        ));
        Ok(self)
    }

    /// Add an output written directly to an external destination. Without a committer
    /// nothing is committed when the vertex succeeds.
    pub fn add_output(
        &mut self,
        output_name: &str,
        output_descriptor: OutputDescriptor,
        output_committer: Option<OutputCommitterDescriptor>,
    ) -> Result<&mut Self> {
        if self.additional_outputs.iter().any(|o| o.name == output_name) {
            return Err(DagError::DuplicateKey(format!(
                "Vertex `{}` already has an output named `{}`",
                self.name, output_name
            )));
        }

        self.additional_outputs.push(RootInputLeafOutput::new(
            output_name,
            output_descriptor,
            output_committer,
        ));
        Ok(self)
    }

    pub fn inputs(&self) -> &[RootInput] {
        self.additional_inputs.as_slice()
    }

    pub fn outputs(&self) -> &[LeafOutput] {
        self.additional_outputs.as_slice()
    }

    /// Root inputs that carry an initializer
    pub fn initialized_inputs(&self) -> impl Iterator<Item = &RootInput> {
        self.additional_inputs
            .iter()
            .filter(|input| input.controller.is_some())
    }

    /// The last call wins.
    pub fn set_vertex_manager_plugin(
        &mut self,
        vertex_manager_plugin: VertexManagerPluginDescriptor,
    ) -> &mut Self {
        self.vertex_manager_plugin = Some(vertex_manager_plugin);
        self
    }

    pub fn vertex_manager_plugin(&self) -> Option<&VertexManagerPluginDescriptor> {
        self.vertex_manager_plugin.as_ref()
    }

    pub fn input_vertices(&self) -> &[String] {
        self.input_vertices.as_slice()
    }

    pub fn output_vertices(&self) -> &[String] {
        self.output_vertices.as_slice()
    }

    pub fn input_edges(&self) -> &[EdgeId] {
        self.input_edges.as_slice()
    }

    pub fn output_edges(&self) -> &[EdgeId] {
        self.output_edges.as_slice()
    }

    pub fn group_inputs(&self) -> &HashMap<String, GroupInfo> {
        &self.group_inputs
    }

    pub(crate) fn add_group_input(&mut self, group_name: &str, group_info: GroupInfo) -> Result<()> {
        if self.group_inputs.contains_key(group_name) {
            return Err(DagError::DuplicateKey(format!(
                "Vertex `{}` already has group input with name `{}`",
                self.name, group_name
            )));
        }

        self.group_inputs.insert(group_name.to_string(), group_info);
        Ok(())
    }

    pub(crate) fn add_input_vertex(&mut self, input_vertex: &str, edge_id: EdgeId) {
        self.input_vertices.push(input_vertex.to_string());
        self.input_edges.push(edge_id);
    }

    pub(crate) fn add_output_vertex(&mut self, output_vertex: &str, edge_id: EdgeId) {
        self.output_vertices.push(output_vertex.to_string());
        self.output_edges.push(edge_id);
    }

    /// Whether edges or groups of some DAG are recorded on this vertex
    pub(crate) fn is_connected(&self) -> bool {
        !self.input_vertices.is_empty()
            || !self.output_vertices.is_empty()
            || !self.input_edges.is_empty()
            || !self.output_edges.is_empty()
            || !self.group_inputs.is_empty()
    }

    /// A vertex is finalized at submission when nothing can change its parallelism.
    pub fn needs_reconfiguration(&self) -> bool {
        self.parallelism.is_deferred()
            || self.vertex_manager_plugin.is_some()
            || self.initialized_inputs().next().is_some()
    }
}

impl std::fmt::Display for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} : {}]",
            self.name,
            self.processor_descriptor.class_name()
        )
    }
}
