use std::collections::{HashMap, HashSet};

use daggy::petgraph::algo::{has_path_connecting, toposort};
use daggy::{Dag, NodeIndex};

use crate::api::config::{DagConfig, NamespacePolicy};
use crate::api::{DagError, Result};
use crate::dag::edge::{DataMovementType, Edge};
use crate::dag::plan::DagPlan;
use crate::dag::vertex::Vertex;
use crate::dag::vertex_group::{GroupInputEdge, VertexGroup};
use crate::dag::EdgeId;

/// Client-side job description: vertices, edges and vertex groups.
///
/// Assembly is single threaded. Every mutation validates first and only then
/// records, so a failed call leaves the DAG untouched.
#[derive(Clone, Debug)]
pub struct JobDag {
    name: String,
    namespace_policy: NamespacePolicy,

    vertex_order: Vec<String>,
    vertices: HashMap<String, Vertex>,
    vertex_indies: HashMap<String, NodeIndex>,
    edges: Vec<Edge>,
    groups: Vec<VertexGroup>,
    group_edges: Vec<GroupInputEdge>,

    dag: Dag<String, EdgeId>,
}

impl JobDag {
    pub fn new(name: &str) -> Self {
        Self::with_namespace_policy(name, NamespacePolicy::default())
    }

    pub fn with_config(name: &str, config: &DagConfig) -> Self {
        Self::with_namespace_policy(name, config.namespace_policy)
    }

    pub fn with_namespace_policy(name: &str, namespace_policy: NamespacePolicy) -> Self {
        JobDag {
            name: name.to_string(),
            namespace_policy,
            vertex_order: Vec::new(),
            vertices: HashMap::new(),
            vertex_indies: HashMap::new(),
            edges: Vec::new(),
            groups: Vec::new(),
            group_edges: Vec::new(),
            dag: Dag::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn namespace_policy(&self) -> NamespacePolicy {
        self.namespace_policy
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<&mut Self> {
        let name = vertex.name().to_string();
        if self.vertices.contains_key(&name) {
            return Err(DagError::DuplicateKey(format!(
                "Vertex `{}` already defined in DAG `{}`",
                name, self.name
            )));
        }
        if self.namespace_policy == NamespacePolicy::Shared && self.group(&name).is_some() {
            return Err(DagError::DuplicateKey(format!(
                "Vertex `{}` collides with a vertex group of the same name",
                name
            )));
        }
        if vertex.is_connected() {
            return Err(DagError::invalid_argument(format!(
                "Vertex `{}` already carries edges or group inputs of another DAG",
                name
            )));
        }

        let node_index = self.dag.add_node(name.clone());
        self.vertex_indies.insert(name.clone(), node_index);
        self.vertex_order.push(name.clone());
        self.vertices.insert(name, vertex);

        Ok(self)
    }

    pub fn vertex(&self, name: &str) -> Option<&Vertex> {
        self.vertices.get(name)
    }

    pub fn vertex_mut(&mut self, name: &str) -> Option<&mut Vertex> {
        self.vertices.get_mut(name)
    }

    /// Vertices in insertion order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertex_order
            .iter()
            .filter_map(move |name| self.vertices.get(name))
    }

    pub fn edges(&self) -> &[Edge] {
        self.edges.as_slice()
    }

    pub fn edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id().eq(edge_id))
    }

    pub fn groups(&self) -> &[VertexGroup] {
        self.groups.as_slice()
    }

    pub fn group(&self, name: &str) -> Option<&VertexGroup> {
        self.groups.iter().find(|group| group.name() == name)
    }

    pub fn group_edges(&self) -> &[GroupInputEdge] {
        self.group_edges.as_slice()
    }

    /// Connect two vertices. Both endpoints are updated, or neither is.
    pub fn add_edge(&mut self, edge: Edge) -> Result<&mut Self> {
        self.check_edge(edge.source(), edge.destination(), &HashSet::new())?;
        self.insert_edge(edge)?;
        Ok(self)
    }

    fn check_edge(
        &self,
        source: &str,
        destination: &str,
        pending: &HashSet<EdgeId>,
    ) -> Result<(NodeIndex, NodeIndex)> {
        let source_index = *self
            .vertex_indies
            .get(source)
            .ok_or_else(|| DagError::VertexNotFound(source.to_string()))?;
        let destination_index = *self
            .vertex_indies
            .get(destination)
            .ok_or_else(|| DagError::VertexNotFound(destination.to_string()))?;

        let edge_id = EdgeId::new(source, destination);
        if pending.contains(&edge_id) || self.edge(&edge_id).is_some() {
            return Err(DagError::DuplicateKey(format!(
                "Edge `{}` already defined",
                edge_id
            )));
        }

        if source_index == destination_index
            || has_path_connecting(self.dag.graph(), destination_index, source_index, None)
        {
            return Err(DagError::WouldCycle {
                from: source.to_string(),
                to: destination.to_string(),
            });
        }

        Ok((source_index, destination_index))
    }

    fn insert_edge(&mut self, edge: Edge) -> Result<()> {
        let (source_index, destination_index) =
            self.check_edge(edge.source(), edge.destination(), &HashSet::new())?;

        self.dag
            .add_edge(source_index, destination_index, edge.id().clone())
            .map_err(|_| DagError::WouldCycle {
                from: edge.source().to_string(),
                to: edge.destination().to_string(),
            })?;

        if let Some(source) = self.vertices.get_mut(edge.source()) {
            source.add_output_vertex(edge.destination(), edge.id().clone());
        }
        if let Some(destination) = self.vertices.get_mut(edge.destination()) {
            destination.add_input_vertex(edge.source(), edge.id().clone());
        }

        debug!("add edge {}", edge);
        self.edges.push(edge);
        Ok(())
    }

    /// Group at least two distinct vertices under a name unique across the DAG.
    pub fn create_vertex_group(&mut self, name: &str, members: &[&str]) -> Result<&VertexGroup> {
        if name.is_empty() {
            return Err(DagError::invalid_argument("Vertex group name cannot be empty"));
        }
        if self.group(name).is_some() {
            return Err(DagError::DuplicateKey(format!(
                "Vertex group `{}` already defined in DAG `{}`",
                name, self.name
            )));
        }
        if self.namespace_policy == NamespacePolicy::Shared && self.vertices.contains_key(name) {
            return Err(DagError::DuplicateKey(format!(
                "Vertex group `{}` collides with a vertex of the same name",
                name
            )));
        }
        if members.len() < 2 {
            return Err(DagError::invalid_argument(format!(
                "Vertex group `{}` must have at least 2 members",
                name
            )));
        }

        let mut member_names = Vec::with_capacity(members.len());
        for member in members {
            if member_names.iter().any(|m: &String| m == member) {
                return Err(DagError::invalid_argument(format!(
                    "Vertex `{}` listed twice in group `{}`",
                    member, name
                )));
            }
            if !self.vertices.contains_key(*member) {
                return Err(DagError::VertexNotFound(member.to_string()));
            }
            member_names.push(member.to_string());
        }

        let group = VertexGroup::new(name, member_names);
        for member in group.members() {
            if let Some(vertex) = self.vertices.get_mut(member) {
                vertex.add_group_input(name, group.group_info())?;
            }
        }

        self.groups.push(group);
        Ok(&self.groups[self.groups.len() - 1])
    }

    /// Connect every member of a group to `destination`.
    ///
    /// All member edges are checked before any is recorded.
    pub fn add_group_edge(&mut self, group_edge: GroupInputEdge) -> Result<&mut Self> {
        let group_position = self
            .groups
            .iter()
            .position(|group| group.name() == group_edge.group())
            .ok_or_else(|| DagError::GroupNotFound(group_edge.group().to_string()))?;

        let members = self.groups[group_position].members().to_vec();
        let destination = group_edge.destination();
        if members.iter().any(|m| m == destination) {
            return Err(DagError::WouldCycle {
                from: group_edge.group().to_string(),
                to: destination.to_string(),
            });
        }

        let mut pending = HashSet::new();
        for member in &members {
            self.check_edge(member, destination, &pending)?;
            pending.insert(EdgeId::new(member, destination));
        }

        for member in &members {
            let edge = Edge::new(member, destination, group_edge.property().clone());
            self.insert_edge(edge)?;
        }

        self.groups[group_position]
            .add_output_vertex(destination, group_edge.merged_input().clone());
        self.group_edges.push(group_edge);

        Ok(self)
    }

    /// Vertex names, every vertex after all of its inputs
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let sorted = toposort(self.dag.graph(), None).map_err(|cycle| {
            let name = self.dag[cycle.node_id()].clone();
            DagError::WouldCycle {
                from: name.clone(),
                to: name,
            }
        })?;

        Ok(sorted
            .into_iter()
            .map(|node_index| self.dag[node_index].clone())
            .collect())
    }

    pub fn verify(&self) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(DagError::invalid_argument(format!(
                "Invalid DAG `{}` containing 0 vertices",
                self.name
            )));
        }

        for vertex in self.vertices() {
            self.verify_vertex(vertex)?;
        }

        for edge in &self.edges {
            if edge.property().data_movement() != DataMovementType::OneToOne {
                continue;
            }

            let source = self.vertices[edge.source()].parallelism();
            let destination = self.vertices[edge.destination()].parallelism();
            if let (Some(s), Some(d)) = (source.fixed(), destination.fixed()) {
                if s != d {
                    return Err(DagError::invalid_argument(format!(
                        "OneToOne edge `{}` connects vertices with parallelism {} and {}",
                        edge.id(),
                        s,
                        d
                    )));
                }
            }
        }

        Ok(())
    }

    fn verify_vertex(&self, vertex: &Vertex) -> Result<()> {
        let parallelism = vertex.parallelism();
        if parallelism.is_deferred()
            && vertex.vertex_manager_plugin().is_none()
            && vertex.initialized_inputs().next().is_none()
        {
            return Err(DagError::invalid_argument(format!(
                "Vertex `{}` has parallelism -1 but neither a vertex manager nor an input initializer",
                vertex.name()
            )));
        }

        if let Some(hint) = vertex.task_locations_hint() {
            if !parallelism.matches_count(hint.len()) {
                return Err(DagError::invalid_argument(format!(
                    "Vertex `{}` has {} location hints but parallelism {}",
                    vertex.name(),
                    hint.len(),
                    parallelism
                )));
            }
        }

        for input in vertex.inputs() {
            if vertex.input_vertices().iter().any(|v| v == input.name()) {
                return Err(DagError::invalid_argument(format!(
                    "Vertex `{}` root input `{}` has the same name as an input vertex",
                    vertex.name(),
                    input.name()
                )));
            }
        }
        for output in vertex.outputs() {
            if vertex.output_vertices().iter().any(|v| v == output.name()) {
                return Err(DagError::invalid_argument(format!(
                    "Vertex `{}` leaf output `{}` has the same name as an output vertex",
                    vertex.name(),
                    output.name()
                )));
            }
        }

        Ok(())
    }

    /// Verify and freeze into the plan handed to the scheduler.
    pub fn create_plan(&self) -> Result<DagPlan> {
        self.verify()?;

        let order = self.topological_order()?;
        let vertices = order
            .iter()
            .filter_map(|name| self.vertices.get(name).cloned())
            .collect();

        Ok(DagPlan::new(
            self.name.as_str(),
            vertices,
            self.edges.clone(),
            self.groups.clone(),
            &self.dag,
        ))
    }
}
