use std::convert::TryFrom;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::api::properties::Properties;

pub const NAMESPACE_POLICY: &str = "dagflow.dag.namespace-policy";
pub const HISTORY_ENABLED: &str = "dagflow.history.enabled";
pub const HISTORY_FLUSH_TIMEOUT_MS: &str = "dagflow.history.flush-timeout-ms";
pub const HISTORY_MAX_EVENTS_PER_BATCH: &str = "dagflow.history.max-events-per-batch";
pub const HISTORY_QUEUE_CAPACITY: &str = "dagflow.history.queue-capacity";
pub const LOG_LEVEL: &str = "dagflow.log.level";
pub const LOG_DIR: &str = "dagflow.log.dir";

/// How vertex names and vertex-group names are checked for collisions.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Eq, PartialEq)]
pub enum NamespacePolicy {
    /// Vertices and groups are resolved through one namespace; a group may not reuse
    /// a vertex name and vice versa.
    Shared,
    /// Vertex names and group names are only unique within their own kind.
    Separate,
}

impl Default for NamespacePolicy {
    fn default() -> Self {
        NamespacePolicy::Shared
    }
}

impl<'a> TryFrom<&'a str> for NamespacePolicy {
    type Error = anyhow::Error;

    fn try_from(mode_str: &'a str) -> Result<Self, Self::Error> {
        let mode_str = mode_str.to_ascii_lowercase();
        match mode_str.as_str() {
            "shared" => Ok(NamespacePolicy::Shared),
            "separate" => Ok(NamespacePolicy::Separate),
            _ => Err(anyhow!("Unsupported namespace policy {}", mode_str)),
        }
    }
}

impl std::fmt::Display for NamespacePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamespacePolicy::Shared => write!(f, "Shared"),
            NamespacePolicy::Separate => write!(f, "Separate"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Eq, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// how long `stop` keeps draining queued events before dropping them
    pub flush_timeout_ms: u64,
    pub max_events_per_batch: usize,
    pub queue_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            enabled: true,
            flush_timeout_ms: 1000,
            max_events_per_batch: 100,
            queue_capacity: 10000,
        }
    }
}

impl HistoryConfig {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Eq, PartialEq)]
#[serde(default)]
pub struct DagConfig {
    pub namespace_policy: NamespacePolicy,
    pub history: HistoryConfig,
    /// ["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"], ignore ascii case
    pub log_level: String,
    /// console logging when absent
    pub log_dir: Option<String>,
}

impl Default for DagConfig {
    fn default() -> Self {
        DagConfig {
            namespace_policy: NamespacePolicy::default(),
            history: HistoryConfig::default(),
            log_level: "INFO".to_string(),
            log_dir: None,
        }
    }
}

impl DagConfig {
    /// Overlay any `dagflow.*` keys present in `properties`.
    pub fn apply_properties(&mut self, properties: &Properties) -> anyhow::Result<()> {
        if let Ok(policy) = properties.get_string(NAMESPACE_POLICY) {
            self.namespace_policy = NamespacePolicy::try_from(policy.as_str())?;
        }
        if properties.contains_key(HISTORY_ENABLED) {
            self.history.enabled = properties.get_bool(HISTORY_ENABLED)?;
        }
        if properties.contains_key(HISTORY_FLUSH_TIMEOUT_MS) {
            self.history.flush_timeout_ms = properties.get_u64(HISTORY_FLUSH_TIMEOUT_MS)?;
        }
        if properties.contains_key(HISTORY_MAX_EVENTS_PER_BATCH) {
            let batch = properties.get_u32(HISTORY_MAX_EVENTS_PER_BATCH)?;
            if batch == 0 {
                return Err(anyhow!("`{}` must be > 0", HISTORY_MAX_EVENTS_PER_BATCH));
            }
            self.history.max_events_per_batch = batch as usize;
        }
        if properties.contains_key(HISTORY_QUEUE_CAPACITY) {
            self.history.queue_capacity = properties.get_u32(HISTORY_QUEUE_CAPACITY)? as usize;
        }
        if let Ok(level) = properties.get_string(LOG_LEVEL) {
            self.log_level = level;
        }
        if let Ok(dir) = properties.get_string(LOG_DIR) {
            self.log_dir = Some(dir);
        }

        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<DagConfig> {
    let mut file = File::open(path.as_ref())
        .map_err(|e| anyhow!("open config {:?} error. {}", path.as_ref(), e))?;
    let mut buffer = String::new();
    file.read_to_string(&mut buffer)?;

    let config: DagConfig = serde_yaml::from_str(buffer.as_str())?;
    if config.history.max_events_per_batch == 0 {
        return Err(anyhow!("history.max_events_per_batch must be > 0"));
    }
    Ok(config)
}
