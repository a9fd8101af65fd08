//! Paired output/input configuration of a scatter-gather edge.

use crate::api::descriptor::{EdgeManagerDescriptor, InputDescriptor, OutputDescriptor};
use crate::api::properties::Properties;
use crate::api::Result;
use crate::conf::config_utils::{extract_configuration_map, extract_defaults};
use crate::conf::deprecated_keys::translate_properties;
use crate::conf::keys::{
    ALLOWED_PREFIXES, OTHER_CONFIG_DEFAULTS, RUNTIME_ADDITIONAL_CONFIG_KEY_SET, RUNTIME_COMPRESS,
    RUNTIME_COMPRESS_CODEC, RUNTIME_CONFIG_DEFAULTS, RUNTIME_KEY_CLASS, RUNTIME_VALUE_CLASS,
    UNORDERED_KV_INPUT_KEYS,
};
use crate::conf::unordered_partitioned_output::{
    self, SpecificConfigurer, UnorderedPartitionedKvOutputConfig,
    UNORDERED_PARTITIONED_KV_OUTPUT_CLASS,
};
use crate::dag::edge::{DataMovementType, DataSourceType, EdgeProperty, SchedulingType};

pub const UNORDERED_KV_INPUT: &str = "UnorderedKvInput";
pub const UNORDERED_KV_INPUT_CLASS: &str = "dagflow.runtime.UnorderedKvInput";

/// Built configuration of both ends of an unordered partitioned key/value edge.
#[derive(Clone, Debug)]
pub struct UnorderedPartitionedKvEdgeConfig {
    output_conf: UnorderedPartitionedKvOutputConfig,
    input_conf: Properties,
}

impl UnorderedPartitionedKvEdgeConfig {
    pub fn new_builder(
        key_class_name: &str,
        value_class_name: &str,
        partitioner_class_name: &str,
        partitioner_conf: Option<&Properties>,
    ) -> Result<EdgeConfigBuilder> {
        EdgeConfigBuilder::new(
            key_class_name,
            value_class_name,
            partitioner_class_name,
            partitioner_conf,
        )
    }

    pub fn output_conf(&self) -> &UnorderedPartitionedKvOutputConfig {
        &self.output_conf
    }

    pub fn input_conf(&self) -> &Properties {
        &self.input_conf
    }

    pub fn output_payload(&self) -> Result<Vec<u8>> {
        self.output_conf.to_bytes()
    }

    pub fn input_payload(&self) -> Result<Vec<u8>> {
        self.input_conf.to_bytes()
    }

    /// Persisted, sequentially scheduled scatter-gather edge carrying both payloads.
    pub fn create_default_edge_property(&self) -> Result<EdgeProperty> {
        EdgeProperty::new(
            DataMovementType::ScatterGather,
            DataSourceType::Persisted,
            SchedulingType::Sequential,
            OutputDescriptor::with_payload(
                UNORDERED_PARTITIONED_KV_OUTPUT_CLASS,
                self.output_payload()?,
            ),
            InputDescriptor::with_payload(UNORDERED_KV_INPUT_CLASS, self.input_payload()?),
        )
    }

    pub fn create_default_custom_edge_property(
        &self,
        edge_manager: EdgeManagerDescriptor,
    ) -> Result<EdgeProperty> {
        Ok(EdgeProperty::custom(
            edge_manager,
            DataSourceType::Persisted,
            SchedulingType::Sequential,
            OutputDescriptor::with_payload(
                UNORDERED_PARTITIONED_KV_OUTPUT_CLASS,
                self.output_payload()?,
            ),
            InputDescriptor::with_payload(UNORDERED_KV_INPUT_CLASS, self.input_payload()?),
        ))
    }
}

pub struct EdgeConfigBuilder {
    output_builder: unordered_partitioned_output::Builder,
    input_conf: Properties,
}

impl EdgeConfigBuilder {
    fn new(
        key_class_name: &str,
        value_class_name: &str,
        partitioner_class_name: &str,
        partitioner_conf: Option<&Properties>,
    ) -> Result<Self> {
        let output_builder = UnorderedPartitionedKvOutputConfig::new_builder(
            key_class_name,
            value_class_name,
            partitioner_class_name,
            partitioner_conf,
        )?;

        let mut input_conf = Properties::with_name(UNORDERED_KV_INPUT);
        input_conf.extend(extract_defaults(
            &RUNTIME_CONFIG_DEFAULTS,
            &UNORDERED_KV_INPUT_KEYS,
        ));
        input_conf.extend(OTHER_CONFIG_DEFAULTS.iter().map(|(k, v)| (*k, *v)));
        input_conf.set_str(RUNTIME_KEY_CLASS, key_class_name);
        input_conf.set_str(RUNTIME_VALUE_CLASS, value_class_name);

        Ok(EdgeConfigBuilder {
            output_builder,
            input_conf,
        })
    }

    /// Enable compression on both ends of the edge.
    pub fn enable_compression(mut self, compression_codec: Option<&str>) -> Self {
        self.output_builder = self.output_builder.enable_compression(compression_codec);
        self.input_conf.set_bool(RUNTIME_COMPRESS, true);
        if let Some(codec) = compression_codec {
            self.input_conf.set_str(RUNTIME_COMPRESS_CODEC, codec);
        }
        self
    }

    /// Apply the qualifying keys of an external configuration to both ends, legacy
    /// keys translated first.
    pub fn set_from_configuration(mut self, conf: &Properties) -> Self {
        let mut conf = conf.clone();
        translate_properties(&mut conf);
        self.output_builder.put_configuration_map(&conf);

        let key_sets = [&*UNORDERED_KV_INPUT_KEYS, &*RUNTIME_ADDITIONAL_CONFIG_KEY_SET];
        let map = extract_configuration_map(conf.iter(), &key_sets, ALLOWED_PREFIXES.as_slice());
        self.input_conf.extend(map);
        self
    }

    /// Switch to the output-specific setters; [`OutputSpecificBuilder::done`] comes
    /// back here.
    pub fn configure_output(self) -> OutputSpecificBuilder {
        OutputSpecificBuilder { edge_builder: self }
    }

    pub fn build(self) -> UnorderedPartitionedKvEdgeConfig {
        UnorderedPartitionedKvEdgeConfig {
            output_conf: self.output_builder.build(),
            input_conf: self.input_conf,
        }
    }
}

pub struct OutputSpecificBuilder {
    edge_builder: EdgeConfigBuilder,
}

impl OutputSpecificBuilder {
    pub fn done(self) -> EdgeConfigBuilder {
        self.edge_builder
    }
}

impl SpecificConfigurer for OutputSpecificBuilder {
    fn set_available_buffer_size(mut self, available_buffer_size: u32) -> Self {
        self.edge_builder
            .output_builder
            .put_available_buffer_size(available_buffer_size);
        self
    }

    fn set_additional_configuration(mut self, key: &str, value: Option<&str>) -> Self {
        self.edge_builder
            .output_builder
            .put_additional_configuration(key, value);
        self
    }

    fn set_additional_configuration_map(mut self, conf: &Properties) -> Self {
        self.edge_builder.output_builder.put_configuration_map(conf);
        self
    }

    fn set_from_configuration(mut self, conf: &Properties) -> Self {
        self.edge_builder.output_builder.put_from_configuration(conf);
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::api::descriptor::EdgeManagerDescriptor;
    use crate::api::properties::Properties;
    use crate::conf::edge_config::{UnorderedPartitionedKvEdgeConfig, UNORDERED_KV_INPUT_CLASS};
    use crate::conf::keys::{
        RUNTIME_COMPRESS_CODEC, RUNTIME_SHUFFLE_PARALLEL_COPIES,
        RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB,
    };
    use crate::conf::unordered_partitioned_output::{
        SpecificConfigurer, UnorderedPartitionedKvOutputConfig,
    };
    use crate::dag::edge::DataMovementType;

    #[test]
    pub fn edge_config_test() {
        let mut external = Properties::new();
        external.set_u32(RUNTIME_SHUFFLE_PARALLEL_COPIES, 5);
        external.set_u32(RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB, 16);

        let edge_config = UnorderedPartitionedKvEdgeConfig::new_builder("K", "V", "P", None)
            .unwrap()
            .set_from_configuration(&external)
            .configure_output()
            .set_available_buffer_size(48)
            .done()
            .enable_compression(Some("lz4"))
            .build();

        let output = edge_config.output_conf();
        assert_eq!(output.available_buffer_size_mb().unwrap(), 48);
        assert!(output.get(RUNTIME_SHUFFLE_PARALLEL_COPIES).is_none());
        assert_eq!(output.compression_codec(), Some("lz4"));

        let input = edge_config.input_conf();
        assert_eq!(input.get_u32(RUNTIME_SHUFFLE_PARALLEL_COPIES).unwrap(), 5);
        assert!(input.get(RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB).is_none());
        assert_eq!(input.get(RUNTIME_COMPRESS_CODEC), Some("lz4"));
    }

    #[test]
    pub fn default_edge_property_test() {
        let edge_config = UnorderedPartitionedKvEdgeConfig::new_builder("K", "V", "P", None)
            .unwrap()
            .build();

        let property = edge_config.create_default_edge_property().unwrap();
        assert_eq!(property.data_movement(), DataMovementType::ScatterGather);
        assert_eq!(property.edge_destination().class_name(), UNORDERED_KV_INPUT_CLASS);

        let payload = property.edge_source().user_payload().unwrap();
        let output = UnorderedPartitionedKvOutputConfig::from_bytes(payload).unwrap();
        assert_eq!(output.partitioner_class(), Some("P"));

        let custom = edge_config
            .create_default_custom_edge_property(EdgeManagerDescriptor::new("m"))
            .unwrap();
        assert_eq!(custom.data_movement(), DataMovementType::Custom);
    }

    #[test]
    pub fn legacy_configuration_test() {
        let mut external = Properties::new();
        external.set_str("mapreduce.reduce.shuffle.parallelcopies", "7");

        let edge_config = UnorderedPartitionedKvEdgeConfig::new_builder("K", "V", "P", None)
            .unwrap()
            .set_from_configuration(&external)
            .build();

        let input = edge_config.input_conf();
        assert_eq!(input.get_u32(RUNTIME_SHUFFLE_PARALLEL_COPIES).unwrap(), 7);
        assert!(!input.contains_key("mapreduce.reduce.shuffle.parallelcopies"));
        assert!(external.contains_key("mapreduce.reduce.shuffle.parallelcopies"));
    }
}
