use std::ops::Index;

use daggy::{Dag, NodeIndex};
use serde::Serialize;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct JsonNode<N>
where
    N: Serialize,
{
    id: String,
    detail: N,
}

impl<N> JsonNode<N>
where
    N: Serialize,
{
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn detail(&self) -> &N {
        &self.detail
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct JsonEdge<E>
where
    E: Serialize,
{
    /// source JsonNode id
    source: String,
    /// target JsonNode id
    target: String,
    detail: E,
}

impl<E> JsonEdge<E>
where
    E: Serialize,
{
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn detail(&self) -> &E {
        &self.detail
    }
}

/// Serializable snapshot of a `daggy` graph, nodes in index order.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct JsonDag<N, E>
where
    N: Clone + Serialize,
    E: Clone + Serialize,
{
    nodes: Vec<JsonNode<N>>,
    edges: Vec<JsonEdge<E>>,
}

impl<'a, N, E> From<&'a Dag<N, E>> for JsonDag<N, E>
where
    N: Clone + Serialize,
    E: Clone + Serialize,
{
    fn from(dag: &'a Dag<N, E, u32>) -> Self {
        // isolated nodes are kept too
        let nodes = (0..dag.node_count())
            .map(|index| JsonDag::create_json_node(dag, NodeIndex::new(index)))
            .collect();

        let edges = dag
            .raw_edges()
            .iter()
            .map(|edge| JsonEdge {
                source: edge.source().index().to_string(),
                target: edge.target().index().to_string(),
                detail: edge.weight.clone(),
            })
            .collect();

        JsonDag { nodes, edges }
    }
}

impl<N, E> JsonDag<N, E>
where
    N: Clone + Serialize,
    E: Clone + Serialize,
{
    fn create_json_node(dag: &Dag<N, E>, node_index: NodeIndex) -> JsonNode<N> {
        let n = dag.index(node_index);
        let id = node_index.index().to_string();

        JsonNode {
            id,
            detail: n.clone(),
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&JsonNode<N>> {
        self.nodes.iter().find(|node| node.id.eq(id))
    }

    pub fn parents(&self, parent_node_id: &str) -> Vec<(&JsonNode<N>, &JsonEdge<E>)> {
        self.gets(parent_node_id, true)
    }

    pub fn children(&self, child_node_id: &str) -> Vec<(&JsonNode<N>, &JsonEdge<E>)> {
        self.gets(child_node_id, false)
    }

    fn gets(&self, node_id: &str, parent: bool) -> Vec<(&JsonNode<N>, &JsonEdge<E>)> {
        self.edges
            .iter()
            .filter_map(|edge| {
                let other = if parent {
                    edge.target().eq(node_id).then(|| edge.source())
                } else {
                    edge.source().eq(node_id).then(|| edge.target())
                };
                other
                    .and_then(|id| self.get_node(id))
                    .map(|node| (node, edge))
            })
            .collect()
    }

    pub fn nodes(&self) -> &Vec<JsonNode<N>> {
        &self.nodes
    }

    pub fn edges(&self) -> &Vec<JsonEdge<E>> {
        &self.edges
    }
}
