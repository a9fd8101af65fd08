//! Legacy map/reduce key translation.

use std::collections::HashMap;

use crate::api::properties::Properties;
use crate::conf::keys::*;

lazy_static! {
    static ref LEGACY_TO_RUNTIME_KEYS: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("mapreduce.ifile.readahead", vec![RUNTIME_IFILE_READAHEAD]);
        m.insert("mapreduce.ifile.readahead.bytes", vec![RUNTIME_IFILE_READAHEAD_BYTES]);
        m.insert("mapreduce.task.merge.progress.records", vec![RUNTIME_RECORDS_BEFORE_PROGRESS]);
        m.insert("mapreduce.task.io.sort.factor", vec![RUNTIME_IO_SORT_FACTOR]);
        m.insert("mapreduce.map.sort.spill.percent", vec![RUNTIME_SORT_SPILL_PERCENT]);
        m.insert("mapreduce.task.io.sort.mb", vec![RUNTIME_IO_SORT_MB]);
        m.insert("mapreduce.task.index.cache.limit.bytes", vec![RUNTIME_INDEX_CACHE_MEMORY_LIMIT_BYTES]);
        m.insert("mapreduce.map.combine.minspills", vec![RUNTIME_COMBINE_MIN_SPILLS]);
        m.insert("mapreduce.reduce.memory.totalbytes", vec![RUNTIME_TASK_MEMORY]);
        m.insert("mapreduce.reduce.shuffle.parallelcopies", vec![RUNTIME_SHUFFLE_PARALLEL_COPIES]);
        m.insert("mapreduce.reduce.shuffle.maxfetchfailures", vec![RUNTIME_SHUFFLE_FETCH_FAILURES_LIMIT]);
        m.insert("mapreduce.reduce.shuffle.notify.readerror", vec![RUNTIME_SHUFFLE_NOTIFY_READERROR]);
        m.insert("mapreduce.reduce.shuffle.connect.timeout", vec![RUNTIME_SHUFFLE_CONNECT_TIMEOUT]);
        m.insert("mapreduce.reduce.shuffle.read.timeout", vec![RUNTIME_SHUFFLE_READ_TIMEOUT]);
        m.insert("mapreduce.shuffle.ssl.enabled", vec![RUNTIME_SHUFFLE_ENABLE_SSL]);
        m.insert("mapreduce.reduce.shuffle.input.buffer.percent", vec![RUNTIME_SHUFFLE_INPUT_BUFFER_PERCENT]);
        m.insert("mapreduce.reduce.shuffle.memory.limit.percent", vec![RUNTIME_SHUFFLE_MEMORY_LIMIT_PERCENT]);
        m.insert("mapreduce.reduce.shuffle.merge.percent", vec![RUNTIME_SHUFFLE_MERGE_PERCENT]);
        m.insert("mapreduce.reduce.merge.memtomem.threshold", vec![RUNTIME_SHUFFLE_MEMTOMEM_SEGMENTS]);
        m.insert("mapreduce.reduce.merge.memtomem.enabled", vec![RUNTIME_SHUFFLE_ENABLE_MEMTOMEM]);
        m.insert("mapreduce.reduce.input.buffer.percent", vec![RUNTIME_INPUT_BUFFER_PERCENT]);
        m.insert("map.sort.class", vec![RUNTIME_INTERNAL_SORTER_CLASS]);
        m.insert(
            "mapreduce.job.output.group.comparator.class",
            vec![RUNTIME_GROUP_COMPARATOR_CLASS, RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS],
        );
        m.insert("mapreduce.job.output.key.comparator.class", vec![RUNTIME_KEY_COMPARATOR_CLASS]);
        m.insert("mapreduce.map.output.key.class", vec![RUNTIME_KEY_CLASS]);
        m.insert("mapreduce.map.output.value.class", vec![RUNTIME_VALUE_CLASS]);
        m.insert("mapreduce.map.output.compress", vec![RUNTIME_COMPRESS]);
        m.insert("mapreduce.map.output.compress.codec", vec![RUNTIME_COMPRESS_CODEC]);
        m
    };
}

/// Current runtime keys of a legacy key; the group comparator feeds two of them
pub fn translate_key(legacy_key: &str) -> Option<&'static [&'static str]> {
    LEGACY_TO_RUNTIME_KEYS
        .get(legacy_key)
        .map(|runtime_keys| runtime_keys.as_slice())
}

/// Read-only view of the legacy to runtime key table
pub fn legacy_to_runtime_keys() -> &'static HashMap<&'static str, Vec<&'static str>> {
    &LEGACY_TO_RUNTIME_KEYS
}

/// Rewrite legacy keys in place.
///
/// A legacy value moves to its runtime key unless that key is already set
/// explicitly. The legacy key is removed either way.
pub fn translate_properties(properties: &mut Properties) {
    for (legacy_key, runtime_keys) in LEGACY_TO_RUNTIME_KEYS.iter() {
        let value = match properties.unset(legacy_key) {
            Some(value) => value,
            None => continue,
        };

        for runtime_key in runtime_keys {
            if properties.contains_key(runtime_key) {
                debug!(
                    "`{}` is set, ignore legacy `{}`={}",
                    runtime_key, legacy_key, value
                );
            } else {
                properties.set_string(runtime_key.to_string(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::properties::Properties;
    use crate::conf::deprecated_keys::{translate_key, translate_properties};
    use crate::conf::keys::{
        RUNTIME_COMPRESS, RUNTIME_GROUP_COMPARATOR_CLASS, RUNTIME_INPUT_BUFFER_PERCENT, RUNTIME_IO_SORT_FACTOR, RUNTIME_IO_SORT_MB,
        RUNTIME_SHUFFLE_ENABLE_MEMTOMEM, RUNTIME_SHUFFLE_INPUT_BUFFER_PERCENT,
        RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS, RUNTIME_SHUFFLE_MEMORY_LIMIT_PERCENT,
        RUNTIME_TASK_MEMORY,
    };

    #[test]
    pub fn reduce_key_translation_test() {
        let mut conf = Properties::new();
        conf.set_f32("mapreduce.reduce.shuffle.input.buffer.percent", 0.4);
        conf.set_i64("mapreduce.reduce.memory.totalbytes", 20000);
        conf.set_i32("mapreduce.task.io.sort.factor", 2000);
        conf.set_f32("mapreduce.reduce.shuffle.memory.limit.percent", 0.55);
        conf.set_bool("mapreduce.reduce.merge.memtomem.enabled", true);
        conf.set_f32("mapreduce.reduce.input.buffer.percent", 0.33);

        translate_properties(&mut conf);

        assert_eq!(conf.get_f32(RUNTIME_SHUFFLE_INPUT_BUFFER_PERCENT).unwrap(), 0.4);
        assert_eq!(conf.get_i64(RUNTIME_TASK_MEMORY).unwrap(), 20000);
        assert_eq!(conf.get_i32(RUNTIME_IO_SORT_FACTOR).unwrap(), 2000);
        assert_eq!(conf.get_f32(RUNTIME_SHUFFLE_MEMORY_LIMIT_PERCENT).unwrap(), 0.55);
        assert!(conf.get_bool(RUNTIME_SHUFFLE_ENABLE_MEMTOMEM).unwrap());
        assert_eq!(conf.get_f32(RUNTIME_INPUT_BUFFER_PERCENT).unwrap(), 0.33);
        assert!(!conf.contains_key("mapreduce.task.io.sort.factor"));
        assert_eq!(conf.len(), 6);
    }

    #[test]
    pub fn runtime_key_overrides_legacy_test() {
        let mut conf = Properties::new();
        conf.set_i32("mapreduce.task.io.sort.factor", 2000);
        conf.set_i32("mapreduce.task.io.sort.mb", 100);
        conf.set_bool("mapreduce.map.output.compress", false);
        conf.set_i32(RUNTIME_IO_SORT_FACTOR, 1000);
        conf.set_i32(RUNTIME_IO_SORT_MB, 200);
        conf.set_bool(RUNTIME_COMPRESS, true);

        translate_properties(&mut conf);

        assert_eq!(conf.get_i32(RUNTIME_IO_SORT_FACTOR).unwrap(), 1000);
        assert_eq!(conf.get_i32(RUNTIME_IO_SORT_MB).unwrap(), 200);
        assert!(conf.get_bool(RUNTIME_COMPRESS).unwrap());
        assert_eq!(conf.len(), 3);
    }

    #[test]
    pub fn translate_key_test() {
        assert_eq!(
            translate_key("mapreduce.task.io.sort.mb"),
            Some(&[RUNTIME_IO_SORT_MB][..])
        );
        assert!(translate_key("dagflow.runtime.io.sort.mb").is_none());
    }

    #[test]
    pub fn group_comparator_translation_test() {
        let legacy = "mapreduce.job.output.group.comparator.class";
        assert_eq!(
            translate_key(legacy),
            Some(&[RUNTIME_GROUP_COMPARATOR_CLASS, RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS][..])
        );

        let mut conf = Properties::new();
        conf.set_string(legacy.to_string(), "NameComparator".to_string());
        translate_properties(&mut conf);
        assert_eq!(conf.get(RUNTIME_GROUP_COMPARATOR_CLASS), Some("NameComparator"));
        assert_eq!(conf.get(RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS), Some("NameComparator"));
        assert_eq!(conf.len(), 2);

        let mut conf = Properties::new();
        conf.set_string(legacy.to_string(), "NameComparator".to_string());
        conf.set_string(RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS.to_string(), "Explicit".to_string());
        translate_properties(&mut conf);
        assert_eq!(conf.get(RUNTIME_GROUP_COMPARATOR_CLASS), Some("NameComparator"));
        assert_eq!(conf.get(RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS), Some("Explicit"));
    }
}
