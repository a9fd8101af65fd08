use std::collections::BTreeMap;

use daggy::Dag;

use crate::api::{DagError, Result};
use crate::dag::edge::Edge;
use crate::dag::utils::JsonDag;
use crate::dag::vertex::Vertex;
use crate::dag::vertex_group::VertexGroup;
use crate::dag::EdgeId;
use crate::manager::reconfiguration::VertexReconfiguration;

const DAG_PLAN: &str = "DagPlan";

/// Verified, frozen job description handed to the scheduler.
///
/// Only the reconfiguration protocol changes a plan, once per vertex.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct DagPlan {
    name: String,
    /// topological order
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    groups: Vec<VertexGroup>,
    topology: JsonDag<String, EdgeId>,
    resolved: BTreeMap<String, VertexReconfiguration>,
}

impl DagPlan {
    pub(crate) fn new(
        name: &str,
        vertices: Vec<Vertex>,
        edges: Vec<Edge>,
        groups: Vec<VertexGroup>,
        dag: &Dag<String, EdgeId>,
    ) -> Self {
        DagPlan {
            name: name.to_string(),
            vertices,
            edges,
            groups,
            topology: JsonDag::from(dag),
            resolved: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.vertices.as_slice()
    }

    pub fn vertex(&self, name: &str) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.name() == name)
    }

    pub fn edges(&self) -> &[Edge] {
        self.edges.as_slice()
    }

    pub fn edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id().eq(edge_id))
    }

    pub fn groups(&self) -> &[VertexGroup] {
        self.groups.as_slice()
    }

    pub fn topology(&self) -> &JsonDag<String, EdgeId> {
        &self.topology
    }

    /// Vertices fed by `vertex_name`
    pub fn downstream(&self, vertex_name: &str) -> Vec<&str> {
        self.neighbours(vertex_name, false)
    }

    /// Vertices feeding `vertex_name`
    pub fn upstream(&self, vertex_name: &str) -> Vec<&str> {
        self.neighbours(vertex_name, true)
    }

    fn neighbours(&self, vertex_name: &str, parent: bool) -> Vec<&str> {
        let node = self
            .topology
            .nodes()
            .iter()
            .find(|node| node.detail().as_str() == vertex_name);

        match node {
            Some(node) => {
                let related = if parent {
                    self.topology.parents(node.id())
                } else {
                    self.topology.children(node.id())
                };
                related
                    .into_iter()
                    .map(|(node, _edge)| node.detail().as_str())
                    .collect()
            }
            None => vec![],
        }
    }

    pub fn resolved(&self, vertex_name: &str) -> Option<&VertexReconfiguration> {
        self.resolved.get(vertex_name)
    }

    /// Apply a vertex manager decision.
    ///
    /// Payload replacements may only target the vertex's own input or output edges,
    /// and are all checked before anything changes. A second decision for the same
    /// vertex fails with `InvalidState`.
    pub fn apply_reconfiguration(
        &mut self,
        vertex_name: &str,
        reconfiguration: &VertexReconfiguration,
    ) -> Result<()> {
        if self.resolved.contains_key(vertex_name) {
            return Err(DagError::invalid_state(format!(
                "vertex `{}` already reconfigured",
                vertex_name
            )));
        }

        let vertex_position = self
            .vertices
            .iter()
            .position(|v| v.name() == vertex_name)
            .ok_or_else(|| DagError::VertexNotFound(vertex_name.to_string()))?;

        {
            let vertex = &self.vertices[vertex_position];
            for edge_id in reconfiguration.edge_payloads().keys() {
                let own_edge = vertex.input_edges().contains(edge_id)
                    || vertex.output_edges().contains(edge_id);
                if !own_edge {
                    return Err(DagError::invalid_argument(format!(
                        "edge `{}` is not connected to vertex `{}`",
                        edge_id, vertex_name
                    )));
                }
            }
        }

        for (edge_id, payload) in reconfiguration.edge_payloads() {
            if let Some(edge) = self.edges.iter_mut().find(|e| e.id().eq(edge_id)) {
                edge.property_mut().set_edge_source_payload(payload.clone());
            }
        }

        let vertex = &mut self.vertices[vertex_position];
        vertex.set_parallelism(crate::dag::Parallelism::Fixed(reconfiguration.parallelism()));
        info!(
            "vertex `{}` reconfigured, parallelism={}",
            vertex_name,
            reconfiguration.parallelism()
        );

        self.resolved
            .insert(vertex_name.to_string(), reconfiguration.clone());
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| DagError::serialization(DAG_PLAN, None, e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DagError::serialization(DAG_PLAN, None, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::descriptor::{InputDescriptor, OutputDescriptor, ProcessorDescriptor};
    use crate::api::resource::Resource;
    use crate::dag::edge::{DataMovementType, DataSourceType, Edge, EdgeProperty, SchedulingType};
    use crate::dag::job_dag::JobDag;
    use crate::dag::plan::DagPlan;
    use crate::dag::vertex::Vertex;
    use crate::dag::{EdgeId, Parallelism};
    use crate::manager::reconfiguration::VertexReconfiguration;

    fn plan() -> DagPlan {
        let mut dag = JobDag::new("word-count");
        let mut reduce = Vertex::new(
            "reduce",
            ProcessorDescriptor::new("Summation"),
            10,
            Resource::new(1024, 1),
        )
        .unwrap();
        reduce.set_vertex_manager_plugin(
            crate::api::descriptor::VertexManagerPluginDescriptor::new("shuffle"),
        );

        dag.add_vertex(reduce)
            .unwrap()
            .add_vertex(
                Vertex::new(
                    "map",
                    ProcessorDescriptor::new("Tokenizer"),
                    4,
                    Resource::new(1024, 1),
                )
                .unwrap(),
            )
            .unwrap()
            .add_vertex(
                Vertex::new(
                    "sink",
                    ProcessorDescriptor::new("Writer"),
                    1,
                    Resource::new(512, 1),
                )
                .unwrap(),
            )
            .unwrap();

        let property = EdgeProperty::new(
            DataMovementType::ScatterGather,
            DataSourceType::Persisted,
            SchedulingType::Sequential,
            OutputDescriptor::with_payload("o", vec![0]),
            InputDescriptor::new("i"),
        )
        .unwrap();
        dag.add_edge(Edge::new("map", "reduce", property.clone()))
            .unwrap()
            .add_edge(Edge::new("reduce", "sink", property))
            .unwrap();

        dag.create_plan().unwrap()
    }

    #[test]
    pub fn plan_order_test() {
        let plan = plan();
        let names: Vec<&str> = plan.vertices().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["map", "reduce", "sink"]);
        assert_eq!(plan.downstream("map"), vec!["reduce"]);
        assert_eq!(plan.upstream("sink"), vec!["reduce"]);
        assert!(plan.upstream("map").is_empty());
    }

    #[test]
    pub fn apply_reconfiguration_test() {
        let mut plan = plan();
        let map_reduce = EdgeId::new("map", "reduce");

        let bad = VertexReconfiguration::new(3).with_edge_payload(EdgeId::new("x", "y"), vec![9]);
        assert!(plan
            .apply_reconfiguration("reduce", &bad)
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(plan.vertex("reduce").unwrap().parallelism(), Parallelism::Fixed(10));

        let reconfiguration = VertexReconfiguration::new(3)
            .with_routing("map", vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 2])
            .with_edge_payload(map_reduce.clone(), vec![7, 7]);
        plan.apply_reconfiguration("reduce", &reconfiguration).unwrap();

        assert_eq!(plan.vertex("reduce").unwrap().parallelism(), Parallelism::Fixed(3));
        assert_eq!(
            plan.edge(&map_reduce).unwrap().property().edge_source().user_payload(),
            Some(&[7u8, 7][..])
        );
        assert_eq!(plan.resolved("reduce"), Some(&reconfiguration));

        let e = plan
            .apply_reconfiguration("reduce", &VertexReconfiguration::new(5))
            .unwrap_err();
        assert!(e.is_invalid_state());
        assert_eq!(plan.vertex("reduce").unwrap().parallelism(), Parallelism::Fixed(3));
    }

    #[test]
    pub fn plan_json_test() {
        let mut plan = plan();
        plan.apply_reconfiguration("map", &VertexReconfiguration::new(4))
            .unwrap();

        let json = plan.to_json().unwrap();
        let decoded = DagPlan::from_json(json.as_str()).unwrap();
        assert_eq!(decoded.name(), "word-count");
        assert_eq!(decoded.vertices().len(), 3);
        assert_eq!(decoded.edges(), plan.edges());
        assert_eq!(decoded.topology(), plan.topology());
        assert!(decoded.resolved("map").is_some());

        assert!(DagPlan::from_json("{").is_err());
    }
}
