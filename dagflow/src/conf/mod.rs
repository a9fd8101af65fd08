//! Runtime I/O configuration: how a vertex output is partitioned, buffered and
//! compressed, built once and shipped to tasks as an opaque payload.

pub mod config_utils;
pub mod deprecated_keys;
pub mod edge_config;
pub mod keys;
pub mod unordered_partitioned_output;

pub use edge_config::UnorderedPartitionedKvEdgeConfig;
pub use unordered_partitioned_output::{SpecificConfigurer, UnorderedPartitionedKvOutputConfig};
