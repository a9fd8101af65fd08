/// Physical shape of each task of a vertex
#[derive(Copy, Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub struct Resource {
    pub memory_mb: u32,
    pub v_cores: u32,
}

impl Resource {
    pub fn new(memory_mb: u32, v_cores: u32) -> Self {
        Resource { memory_mb, v_cores }
    }
}

#[derive(Copy, Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub enum LocalResourceType {
    File,
    Archive,
    Pattern,
}

#[derive(Copy, Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub enum LocalResourceVisibility {
    Public,
    Private,
    Application,
}

/// A file localized into every task's working directory before launch
#[derive(Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Hash)]
pub struct LocalResource {
    pub uri: String,
    pub size: u64,
    pub timestamp: u64,
    pub resource_type: LocalResourceType,
    pub visibility: LocalResourceVisibility,
}

impl LocalResource {
    pub fn file(uri: &str, size: u64, timestamp: u64) -> Self {
        LocalResource {
            uri: uri.to_string(),
            size,
            timestamp,
            resource_type: LocalResourceType::File,
            visibility: LocalResourceVisibility::Application,
        }
    }
}

/// Placement preference of one task
#[derive(Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Default)]
pub struct TaskLocationHint {
    pub hosts: Vec<String>,
    pub racks: Vec<String>,
}

impl TaskLocationHint {
    pub fn new(hosts: Vec<String>, racks: Vec<String>) -> Self {
        TaskLocationHint { hosts, racks }
    }
}

/// Placement preferences for all tasks of a vertex, one per task
#[derive(Clone, Serialize, Deserialize, Debug, Eq, PartialEq, Default)]
pub struct VertexLocationHint(pub(crate) Vec<TaskLocationHint>);

impl VertexLocationHint {
    pub fn task_location_hints(&self) -> &[TaskLocationHint] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
