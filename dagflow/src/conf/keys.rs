//! Runtime I/O configuration keys, their defaults and the key sets used to filter
//! user supplied configuration.

use std::collections::{HashMap, HashSet};

pub const RUNTIME_PREFIX: &str = "dagflow.runtime.";

pub const RUNTIME_KEY_CLASS: &str = "dagflow.runtime.key.class";
pub const RUNTIME_VALUE_CLASS: &str = "dagflow.runtime.value.class";
pub const RUNTIME_PARTITIONER_CLASS: &str = "dagflow.runtime.partitioner.class";
pub const RUNTIME_KEY_COMPARATOR_CLASS: &str = "dagflow.runtime.key.comparator.class";
pub const RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS: &str =
    "dagflow.runtime.key.secondary.comparator.class";
pub const RUNTIME_GROUP_COMPARATOR_CLASS: &str = "dagflow.runtime.group.comparator.class";
pub const RUNTIME_INTERNAL_SORTER_CLASS: &str = "dagflow.runtime.internal.sorter.class";

pub const RUNTIME_COMPRESS: &str = "dagflow.runtime.compress";
pub const RUNTIME_COMPRESS_CODEC: &str = "dagflow.runtime.compress.codec";
pub const RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB: &str =
    "dagflow.runtime.unordered.output.buffer.size-mb";
pub const RUNTIME_IFILE_READAHEAD: &str = "dagflow.runtime.ifile.readahead";
pub const RUNTIME_IFILE_READAHEAD_BYTES: &str = "dagflow.runtime.ifile.readahead.bytes";
pub const RUNTIME_RECORDS_BEFORE_PROGRESS: &str = "dagflow.runtime.records.before.progress";

pub const RUNTIME_IO_SORT_FACTOR: &str = "dagflow.runtime.io.sort.factor";
pub const RUNTIME_IO_SORT_MB: &str = "dagflow.runtime.io.sort.mb";
pub const RUNTIME_SORT_SPILL_PERCENT: &str = "dagflow.runtime.sort.spill.percent";
pub const RUNTIME_INDEX_CACHE_MEMORY_LIMIT_BYTES: &str =
    "dagflow.runtime.index.cache.memory.limit.bytes";
pub const RUNTIME_COMBINE_MIN_SPILLS: &str = "dagflow.runtime.combine.min.spills";
pub const RUNTIME_TASK_MEMORY: &str = "dagflow.runtime.task.memory";

pub const RUNTIME_SHUFFLE_PARALLEL_COPIES: &str = "dagflow.runtime.shuffle.parallel.copies";
pub const RUNTIME_SHUFFLE_FETCH_FAILURES_LIMIT: &str =
    "dagflow.runtime.shuffle.fetch.failures.limit";
pub const RUNTIME_SHUFFLE_NOTIFY_READERROR: &str = "dagflow.runtime.shuffle.notify.readerror";
pub const RUNTIME_SHUFFLE_CONNECT_TIMEOUT: &str = "dagflow.runtime.shuffle.connect.timeout";
pub const RUNTIME_SHUFFLE_READ_TIMEOUT: &str = "dagflow.runtime.shuffle.read.timeout";
pub const RUNTIME_SHUFFLE_ENABLE_SSL: &str = "dagflow.runtime.shuffle.ssl.enable";
pub const RUNTIME_SHUFFLE_INPUT_BUFFER_PERCENT: &str =
    "dagflow.runtime.shuffle.fetch.buffer.percent";
pub const RUNTIME_SHUFFLE_MEMORY_LIMIT_PERCENT: &str =
    "dagflow.runtime.shuffle.memory.limit.percent";
pub const RUNTIME_SHUFFLE_MERGE_PERCENT: &str = "dagflow.runtime.shuffle.merge.percent";
pub const RUNTIME_SHUFFLE_MEMTOMEM_SEGMENTS: &str = "dagflow.runtime.shuffle.memory-to-memory.segments";
pub const RUNTIME_SHUFFLE_ENABLE_MEMTOMEM: &str = "dagflow.runtime.shuffle.memory-to-memory.enable";
pub const RUNTIME_INPUT_BUFFER_PERCENT: &str = "dagflow.runtime.task.input.buffer.percent";

/// Number of destination tasks a scatter-gather output is routed to, written by the
/// shuffle vertex manager when it changes the destination parallelism.
pub const RUNTIME_DESTINATION_TASK_COUNT: &str = "dagflow.runtime.destination.task-count";

pub const IO_FILE_BUFFER_SIZE: &str = "io.file.buffer.size";
pub const IO_SERIALIZATIONS: &str = "io.serializations";

lazy_static! {
    /// Framework defaults of the runtime keys
    pub static ref RUNTIME_CONFIG_DEFAULTS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert(RUNTIME_COMPRESS, "false");
        m.insert(RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB, "100");
        m.insert(RUNTIME_IFILE_READAHEAD, "true");
        m.insert(RUNTIME_IFILE_READAHEAD_BYTES, "4194304");
        m.insert(RUNTIME_RECORDS_BEFORE_PROGRESS, "10000");
        m.insert(RUNTIME_IO_SORT_FACTOR, "100");
        m.insert(RUNTIME_IO_SORT_MB, "100");
        m.insert(RUNTIME_SORT_SPILL_PERCENT, "0.8");
        m.insert(RUNTIME_INDEX_CACHE_MEMORY_LIMIT_BYTES, "1048576");
        m.insert(RUNTIME_COMBINE_MIN_SPILLS, "3");
        m.insert(RUNTIME_SHUFFLE_PARALLEL_COPIES, "20");
        m.insert(RUNTIME_SHUFFLE_FETCH_FAILURES_LIMIT, "5");
        m.insert(RUNTIME_SHUFFLE_NOTIFY_READERROR, "true");
        m.insert(RUNTIME_SHUFFLE_CONNECT_TIMEOUT, "180000");
        m.insert(RUNTIME_SHUFFLE_READ_TIMEOUT, "180000");
        m.insert(RUNTIME_SHUFFLE_ENABLE_SSL, "false");
        m.insert(RUNTIME_SHUFFLE_INPUT_BUFFER_PERCENT, "0.7");
        m.insert(RUNTIME_SHUFFLE_MEMORY_LIMIT_PERCENT, "0.25");
        m.insert(RUNTIME_SHUFFLE_MERGE_PERCENT, "0.9");
        m.insert(RUNTIME_SHUFFLE_MEMTOMEM_SEGMENTS, "100");
        m.insert(RUNTIME_SHUFFLE_ENABLE_MEMTOMEM, "false");
        m.insert(RUNTIME_INPUT_BUFFER_PERCENT, "0.0");
        m
    };

    /// Non-runtime defaults loaded unfiltered into every runtime configuration
    pub static ref OTHER_CONFIG_DEFAULTS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert(IO_FILE_BUFFER_SIZE, "131072");
        m
    };

    /// Every key owned by the runtime. A partitioner configuration may not override
    /// any of these.
    pub static ref RUNTIME_CONFIG_KEY_SET: HashSet<&'static str> = {
        let mut s: HashSet<&'static str> = RUNTIME_CONFIG_DEFAULTS.keys().cloned().collect();
        s.insert(RUNTIME_KEY_CLASS);
        s.insert(RUNTIME_VALUE_CLASS);
        s.insert(RUNTIME_PARTITIONER_CLASS);
        s.insert(RUNTIME_KEY_COMPARATOR_CLASS);
        s.insert(RUNTIME_KEY_SECONDARY_COMPARATOR_CLASS);
        s.insert(RUNTIME_GROUP_COMPARATOR_CLASS);
        s.insert(RUNTIME_INTERNAL_SORTER_CLASS);
        s.insert(RUNTIME_COMPRESS_CODEC);
        s.insert(RUNTIME_TASK_MEMORY);
        s.insert(RUNTIME_DESTINATION_TASK_COUNT);
        s
    };

    /// Non-runtime keys any runtime component accepts
    pub static ref RUNTIME_ADDITIONAL_CONFIG_KEY_SET: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert(IO_FILE_BUFFER_SIZE);
        s.insert(IO_SERIALIZATIONS);
        s
    };

    /// Key prefixes any runtime component accepts
    pub static ref ALLOWED_PREFIXES: Vec<&'static str> = vec!["io.", "file.", "fs."];

    /// Keys understood by the unordered partitioned key/value output
    pub static ref UNORDERED_PARTITIONED_KV_OUTPUT_KEYS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert(RUNTIME_KEY_CLASS);
        s.insert(RUNTIME_VALUE_CLASS);
        s.insert(RUNTIME_PARTITIONER_CLASS);
        s.insert(RUNTIME_COMPRESS);
        s.insert(RUNTIME_COMPRESS_CODEC);
        s.insert(RUNTIME_UNORDERED_OUTPUT_BUFFER_SIZE_MB);
        s.insert(RUNTIME_IFILE_READAHEAD);
        s.insert(RUNTIME_IFILE_READAHEAD_BYTES);
        s.insert(RUNTIME_RECORDS_BEFORE_PROGRESS);
        s
    };

    /// Keys understood by the unordered key/value input
    pub static ref UNORDERED_KV_INPUT_KEYS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert(RUNTIME_KEY_CLASS);
        s.insert(RUNTIME_VALUE_CLASS);
        s.insert(RUNTIME_COMPRESS);
        s.insert(RUNTIME_COMPRESS_CODEC);
        s.insert(RUNTIME_IFILE_READAHEAD);
        s.insert(RUNTIME_IFILE_READAHEAD_BYTES);
        s.insert(RUNTIME_SHUFFLE_PARALLEL_COPIES);
        s.insert(RUNTIME_SHUFFLE_FETCH_FAILURES_LIMIT);
        s.insert(RUNTIME_SHUFFLE_NOTIFY_READERROR);
        s.insert(RUNTIME_SHUFFLE_CONNECT_TIMEOUT);
        s.insert(RUNTIME_SHUFFLE_READ_TIMEOUT);
        s.insert(RUNTIME_SHUFFLE_ENABLE_SSL);
        s.insert(RUNTIME_SHUFFLE_INPUT_BUFFER_PERCENT);
        s.insert(RUNTIME_SHUFFLE_MEMORY_LIMIT_PERCENT);
        s.insert(RUNTIME_SHUFFLE_MERGE_PERCENT);
        s.insert(RUNTIME_INPUT_BUFFER_PERCENT);
        s
    };
}
