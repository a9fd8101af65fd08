use crate::api::descriptor::{EdgeManagerDescriptor, InputDescriptor, OutputDescriptor};
use crate::api::{DagError, Result};
use crate::dag::EdgeId;

#[derive(Copy, Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub enum DataMovementType {
    /// task i of the source feeds task i of the destination
    OneToOne,
    /// every source task feeds every destination task
    Broadcast,
    /// source task output is partitioned, partition i goes to destination task i
    ScatterGather,
    /// routing decided by an edge manager
    Custom,
}

#[derive(Copy, Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub enum DataSourceType {
    Persisted,
    PersistedReliable,
    Ephemeral,
}

#[derive(Copy, Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub enum SchedulingType {
    /// destination tasks start after source tasks produced data
    Sequential,
    /// destination tasks run together with source tasks
    Concurrent,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct EdgeProperty {
    data_movement: DataMovementType,
    data_source: DataSourceType,
    scheduling: SchedulingType,
    edge_source: OutputDescriptor,
    edge_destination: InputDescriptor,
    edge_manager: Option<EdgeManagerDescriptor>,
}

impl EdgeProperty {
    pub fn new(
        data_movement: DataMovementType,
        data_source: DataSourceType,
        scheduling: SchedulingType,
        edge_source: OutputDescriptor,
        edge_destination: InputDescriptor,
    ) -> Result<Self> {
        if data_movement == DataMovementType::Custom {
            return Err(DagError::invalid_argument(
                "Custom data movement requires an edge manager",
            ));
        }

        Ok(EdgeProperty {
            data_movement,
            data_source,
            scheduling,
            edge_source,
            edge_destination,
            edge_manager: None,
        })
    }

    pub fn custom(
        edge_manager: EdgeManagerDescriptor,
        data_source: DataSourceType,
        scheduling: SchedulingType,
        edge_source: OutputDescriptor,
        edge_destination: InputDescriptor,
    ) -> Self {
        EdgeProperty {
            data_movement: DataMovementType::Custom,
            data_source,
            scheduling,
            edge_source,
            edge_destination,
            edge_manager: Some(edge_manager),
        }
    }

    pub fn data_movement(&self) -> DataMovementType {
        self.data_movement
    }

    pub fn data_source(&self) -> DataSourceType {
        self.data_source
    }

    pub fn scheduling(&self) -> SchedulingType {
        self.scheduling
    }

    pub fn edge_source(&self) -> &OutputDescriptor {
        &self.edge_source
    }

    pub fn edge_destination(&self) -> &InputDescriptor {
        &self.edge_destination
    }

    pub fn edge_manager(&self) -> Option<&EdgeManagerDescriptor> {
        self.edge_manager.as_ref()
    }

    /// Replace the payload of the source output, used when a vertex manager rewrites
    /// the runtime configuration of an edge.
    pub(crate) fn set_edge_source_payload(&mut self, payload: Vec<u8>) {
        self.edge_source = self.edge_source.clone().set_user_payload(Some(payload));
    }
}

/// A directed data-movement contract between two vertices, owned by the DAG.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    source: String,
    destination: String,
    property: EdgeProperty,
}

impl Edge {
    pub fn new(source: &str, destination: &str, property: EdgeProperty) -> Self {
        Edge {
            id: EdgeId::new(source, destination),
            source: source.to_string(),
            destination: destination.to_string(),
            property,
        }
    }

    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    pub fn destination(&self) -> &str {
        self.destination.as_str()
    }

    pub fn property(&self) -> &EdgeProperty {
        &self.property
    }

    pub(crate) fn property_mut(&mut self) -> &mut EdgeProperty {
        &mut self.property
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({:?})",
            self.source, self.destination, self.property.data_movement
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::api::descriptor::{EdgeManagerDescriptor, InputDescriptor, OutputDescriptor};
    use crate::dag::edge::{DataMovementType, DataSourceType, Edge, EdgeProperty, SchedulingType};
    use crate::dag::EdgeId;

    #[test]
    pub fn edge_property_test() {
        let e = EdgeProperty::new(
            DataMovementType::Custom,
            DataSourceType::Persisted,
            SchedulingType::Sequential,
            OutputDescriptor::new("o"),
            InputDescriptor::new("i"),
        )
        .unwrap_err();
        assert!(e.is_invalid_argument());

        let custom = EdgeProperty::custom(
            EdgeManagerDescriptor::new("m"),
            DataSourceType::Ephemeral,
            SchedulingType::Concurrent,
            OutputDescriptor::new("o"),
            InputDescriptor::new("i"),
        );
        assert_eq!(custom.data_movement(), DataMovementType::Custom);
        assert_eq!(custom.edge_manager().unwrap().class_name(), "m");

        let property = EdgeProperty::new(
            DataMovementType::ScatterGather,
            DataSourceType::Persisted,
            SchedulingType::Sequential,
            OutputDescriptor::new("o"),
            InputDescriptor::new("i"),
        )
        .unwrap();
        let edge = Edge::new("map", "reduce", property);
        assert_eq!(edge.id(), &EdgeId::new("map", "reduce"));
        assert_eq!(edge.id().to_string(), "map->reduce");
        assert_eq!(edge.to_string(), "map -> reduce (ScatterGather)");
    }
}
