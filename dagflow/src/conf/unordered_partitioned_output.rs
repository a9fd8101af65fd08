//! Configuration of the unordered, partitioned key/value output.

use crate::api::properties::Properties;
use crate::api::{DagError, Result};
use crate::conf::config_utils::{
    does_key_qualify, extract_configuration_map, extract_defaults, merge_with_exclusions,
};
use crate::conf::deprecated_keys::translate_properties;
use crate::conf::keys::{
    ALLOWED_PREFIXES, OTHER_CONFIG_DEFAULTS, RUNTIME_ADDITIONAL_CONFIG_KEY_SET, RUNTIME_COMPRESS,
    RUNTIME_COMPRESS_CODEC, RUNTIME_CONFIG_DEFAULTS, RUNTIME_CONFIG_KEY_SET, RUNTIME_KEY_CLASS,
    RUNTIME_PARTITIONER_CLASS, RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB, RUNTIME_VALUE_CLASS,
    UNORDERED_PARTITIONED_KV_OUTPUT_KEYS,
};

pub const UNORDERED_PARTITIONED_KV_OUTPUT: &str = "UnorderedPartitionedKvOutput";

/// Output class named by the descriptors this configuration is attached to
pub const UNORDERED_PARTITIONED_KV_OUTPUT_CLASS: &str = "dagflow.runtime.UnorderedPartitionedKvOutput";

/// Setters shared by the output builder and the builders that embed it.
pub trait SpecificConfigurer: Sized {
    /// Buffer size in MB
    fn set_available_buffer_size(self, available_buffer_size: u32) -> Self;

    /// Set `key` if it qualifies, drop it silently otherwise. `None` unsets the key.
    fn set_additional_configuration(self, key: &str, value: Option<&str>) -> Self;

    /// Batched [`SpecificConfigurer::set_additional_configuration`], same filter.
    fn set_additional_configuration_map(self, conf: &Properties) -> Self;

    /// Copy the qualifying keys of an external configuration. Later setters override
    /// what this copies, so call it first.
    fn set_from_configuration(self, conf: &Properties) -> Self;
}

/// Immutable output configuration, only read or turned into a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnorderedPartitionedKvOutputConfig {
    conf: Properties,
}

impl UnorderedPartitionedKvOutputConfig {
    /// `partitioner_conf` is merged into the output configuration except for the keys
    /// owned by the runtime.
    pub fn new_builder(
        key_class_name: &str,
        value_class_name: &str,
        partitioner_class_name: &str,
        partitioner_conf: Option<&Properties>,
    ) -> Result<Builder> {
        Builder::new(
            key_class_name,
            value_class_name,
            partitioner_class_name,
            partitioner_conf,
        )
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.conf.to_bytes()
    }

    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        let conf = Properties::from_bytes(UNORDERED_PARTITIONED_KV_OUTPUT, payload)?;
        Ok(UnorderedPartitionedKvOutputConfig { conf })
    }

    pub fn key_class(&self) -> Option<&str> {
        self.conf.get(RUNTIME_KEY_CLASS)
    }

    pub fn value_class(&self) -> Option<&str> {
        self.conf.get(RUNTIME_VALUE_CLASS)
    }

    pub fn partitioner_class(&self) -> Option<&str> {
        self.conf.get(RUNTIME_PARTITIONER_CLASS)
    }

    pub fn is_compression_enabled(&self) -> bool {
        self.conf.get_bool(RUNTIME_COMPRESS).unwrap_or(false)
    }

    pub fn compression_codec(&self) -> Option<&str> {
        self.conf.get(RUNTIME_COMPRESS_CODEC)
    }

    pub fn available_buffer_size_mb(&self) -> anyhow::Result<u32> {
        self.conf.get_u32(RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.conf.get(key)
    }

    pub fn as_properties(&self) -> &Properties {
        &self.conf
    }
}

/// Accumulates the output configuration until [`Builder::build`].
#[derive(Clone, Debug)]
pub struct Builder {
    conf: Properties,
}

impl Builder {
    fn new(
        key_class_name: &str,
        value_class_name: &str,
        partitioner_class_name: &str,
        partitioner_conf: Option<&Properties>,
    ) -> Result<Self> {
        check_class_name(key_class_name, "Key")?;
        check_class_name(value_class_name, "Value")?;
        check_class_name(partitioner_class_name, "Partitioner")?;

        let mut conf = Properties::with_name(UNORDERED_PARTITIONED_KV_OUTPUT);
        conf.extend(extract_defaults(
            &RUNTIME_CONFIG_DEFAULTS,
            &UNORDERED_PARTITIONED_KV_OUTPUT_KEYS,
        ));
        conf.extend(OTHER_CONFIG_DEFAULTS.iter().map(|(k, v)| (*k, *v)));

        conf.set_str(RUNTIME_KEY_CLASS, key_class_name);
        conf.set_str(RUNTIME_VALUE_CLASS, value_class_name);
        conf.set_str(RUNTIME_PARTITIONER_CLASS, partitioner_class_name);
        if let Some(partitioner_conf) = partitioner_conf {
            merge_with_exclusions(&mut conf, partitioner_conf, &RUNTIME_CONFIG_KEY_SET);
        }

        Ok(Builder { conf })
    }

    /// Enable compression. The codec is only set when given, otherwise the task
    /// runtime falls back to its default codec.
    pub fn enable_compression(mut self, compression_codec: Option<&str>) -> Self {
        self.conf.set_bool(RUNTIME_COMPRESS, true);
        if let Some(codec) = compression_codec {
            self.conf.set_str(RUNTIME_COMPRESS_CODEC, codec);
        }
        self
    }

    pub fn build(self) -> UnorderedPartitionedKvOutputConfig {
        UnorderedPartitionedKvOutputConfig { conf: self.conf }
    }

    pub(crate) fn put_available_buffer_size(&mut self, available_buffer_size: u32) {
        self.conf
            .set_u32(RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB, available_buffer_size);
    }

    pub(crate) fn put_additional_configuration(&mut self, key: &str, value: Option<&str>) {
        let key_sets = [
            &*UNORDERED_PARTITIONED_KV_OUTPUT_KEYS,
            &*RUNTIME_ADDITIONAL_CONFIG_KEY_SET,
        ];
        if !does_key_qualify(key, &key_sets, ALLOWED_PREFIXES.as_slice()) {
            debug!("drop configuration key `{}`", key);
            return;
        }

        match value {
            Some(value) => self.conf.set_str(key, value),
            None => {
                self.conf.unset(key);
            }
        }
    }

    pub(crate) fn put_configuration_map(&mut self, conf: &Properties) {
        let key_sets = [
            &*UNORDERED_PARTITIONED_KV_OUTPUT_KEYS,
            &*RUNTIME_ADDITIONAL_CONFIG_KEY_SET,
        ];
        let map = extract_configuration_map(conf.iter(), &key_sets, ALLOWED_PREFIXES.as_slice());
        self.conf.extend(map);
    }

    /// Like [`Builder::put_configuration_map`], legacy keys translated first.
    pub(crate) fn put_from_configuration(&mut self, conf: &Properties) {
        let mut conf = conf.clone();
        translate_properties(&mut conf);
        self.put_configuration_map(&conf);
    }
}

impl SpecificConfigurer for Builder {
    fn set_available_buffer_size(mut self, available_buffer_size: u32) -> Self {
        self.put_available_buffer_size(available_buffer_size);
        self
    }

    fn set_additional_configuration(mut self, key: &str, value: Option<&str>) -> Self {
        self.put_additional_configuration(key, value);
        self
    }

    fn set_additional_configuration_map(mut self, conf: &Properties) -> Self {
        self.put_configuration_map(conf);
        self
    }

    fn set_from_configuration(mut self, conf: &Properties) -> Self {
        self.put_from_configuration(conf);
        self
    }
}

pub(crate) fn check_class_name(class_name: &str, kind: &str) -> Result<()> {
    if class_name.is_empty() {
        return Err(DagError::invalid_argument(format!(
            "{} class name cannot be empty",
            kind
        )));
    }
    Ok(())
}
