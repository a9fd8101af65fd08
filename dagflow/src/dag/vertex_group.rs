use std::collections::HashMap;

use crate::api::descriptor::InputDescriptor;
use crate::dag::edge::EdgeProperty;

/// Back-reference a member vertex keeps for each group it belongs to.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    group_name: String,
    members: Vec<String>,
}

impl GroupInfo {
    pub fn new(group_name: &str, members: Vec<String>) -> Self {
        GroupInfo {
            group_name: group_name.to_string(),
            members,
        }
    }

    pub fn group_name(&self) -> &str {
        self.group_name.as_str()
    }

    pub fn members(&self) -> &[String] {
        self.members.as_slice()
    }
}

/// A named set of vertices whose outputs are consumed as one logical input.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct VertexGroup {
    name: String,
    /// ordered, no duplicates
    members: Vec<String>,
    /// destination vertex names of group edges
    outputs: Vec<String>,
    /// destination vertex name -> input merging the member outputs
    merged_inputs: HashMap<String, InputDescriptor>,
}

impl VertexGroup {
    pub(crate) fn new(name: &str, members: Vec<String>) -> Self {
        VertexGroup {
            name: name.to_string(),
            members,
            outputs: Vec::new(),
            merged_inputs: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn members(&self) -> &[String] {
        self.members.as_slice()
    }

    pub fn contains(&self, vertex_name: &str) -> bool {
        self.members.iter().any(|m| m == vertex_name)
    }

    pub fn outputs(&self) -> &[String] {
        self.outputs.as_slice()
    }

    pub fn merged_input(&self, destination: &str) -> Option<&InputDescriptor> {
        self.merged_inputs.get(destination)
    }

    pub(crate) fn group_info(&self) -> GroupInfo {
        GroupInfo::new(self.name.as_str(), self.members.clone())
    }

    pub(crate) fn add_output_vertex(&mut self, destination: &str, merged_input: InputDescriptor) {
        self.outputs.push(destination.to_string());
        self.merged_inputs
            .insert(destination.to_string(), merged_input);
    }
}

/// An edge from every member of a group to one destination vertex.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GroupInputEdge {
    group: String,
    destination: String,
    property: EdgeProperty,
    merged_input: InputDescriptor,
}

impl GroupInputEdge {
    pub fn new(
        group: &str,
        destination: &str,
        property: EdgeProperty,
        merged_input: InputDescriptor,
    ) -> Self {
        GroupInputEdge {
            group: group.to_string(),
            destination: destination.to_string(),
            property,
            merged_input,
        }
    }

    pub fn group(&self) -> &str {
        self.group.as_str()
    }

    pub fn destination(&self) -> &str {
        self.destination.as_str()
    }

    pub fn property(&self) -> &EdgeProperty {
        &self.property
    }

    pub fn merged_input(&self) -> &InputDescriptor {
        &self.merged_input
    }
}
