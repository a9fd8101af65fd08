use std::sync::Arc;

use async_trait::async_trait;
use dagflow::api::config::DagConfig;
use dagflow::api::descriptor::{
    InputDescriptor, InputInitializerDescriptor, OutputDescriptor, ProcessorDescriptor,
    VertexManagerPluginDescriptor,
};
use dagflow::api::properties::Properties;
use dagflow::api::resource::Resource;
use dagflow::conf::keys::{RUNTIME_DESTINATION_TASK_COUNT, RUNTIME_KEY_CLASS};
use dagflow::conf::{UnorderedPartitionedKvEdgeConfig, UnorderedPartitionedKvOutputConfig};
use dagflow::dag::edge::{DataMovementType, DataSourceType, Edge, EdgeProperty, SchedulingType};
use dagflow::dag::{DagPlan, EdgeId, JobDag, Parallelism, Vertex};
use dagflow::history::{HistoryLoggingService, LoggingTimelineClient};
use dagflow::manager::initializer::{InitializerRegistry, InputInitializerContext};
use dagflow::manager::plugin::{PluginRegistry, SHUFFLE_VERTEX_MANAGER};
use dagflow::manager::shuffle::ShuffleVertexManagerConfig;
use dagflow::manager::{InitializerEvent, ReconfigState, RootInputInitializer};
use dagflow::runtime::DagScheduler;

/// one split per file named in the initializer payload, parallelism = files
struct FileSplitInitializer {}

#[async_trait]
impl RootInputInitializer for FileSplitInitializer {
    async fn initialize(
        &self,
        context: &InputInitializerContext,
    ) -> anyhow::Result<Vec<InitializerEvent>> {
        let payload = context
            .initializer_payload()
            .ok_or_else(|| anyhow::anyhow!("no files"))?;
        let files: Vec<&[u8]> = payload.split(|b| *b == b',').collect();

        let mut events = vec![InitializerEvent::SetParallelism(files.len() as u32)];
        for file in files {
            events.push(InitializerEvent::DataInformation(file.to_vec()));
        }
        Ok(events)
    }
}

fn word_count_plan() -> DagPlan {
    let mut dag = JobDag::with_config(
        uuid::Uuid::new_v4().to_string().as_str(),
        &DagConfig::default(),
    );

    let mut read = Vertex::new(
        "read",
        ProcessorDescriptor::new("Tokenizer"),
        -1,
        Resource::new(1024, 1),
    )
    .unwrap();
    read.add_input(
        "files",
        InputDescriptor::new("TextInput"),
        Some(InputInitializerDescriptor::with_payload(
            "file-split",
            b"a.txt,b.txt,c.txt,d.txt".to_vec(),
        )),
    )
    .unwrap();

    let shuffle_conf = ShuffleVertexManagerConfig {
        enable_auto_parallel: true,
        min_src_fraction: 0.5,
        desired_task_input_size: 1000,
    };
    let mut sum = Vertex::new(
        "sum",
        ProcessorDescriptor::new("Summation"),
        10,
        Resource::new(2048, 2),
    )
    .unwrap();
    sum.set_vertex_manager_plugin(VertexManagerPluginDescriptor::with_payload(
        SHUFFLE_VERTEX_MANAGER,
        shuffle_conf.to_payload().unwrap(),
    ));

    let mut write = Vertex::new(
        "write",
        ProcessorDescriptor::new("Writer"),
        1,
        Resource::new(512, 1),
    )
    .unwrap();
    write
        .add_output("counts", OutputDescriptor::new("TextOutput"), None)
        .unwrap();

    dag.add_vertex(read)
        .unwrap()
        .add_vertex(sum)
        .unwrap()
        .add_vertex(write)
        .unwrap();

    let edge_conf = UnorderedPartitionedKvEdgeConfig::new_builder(
        "Text",
        "IntWritable",
        "HashPartitioner",
        None,
    )
    .unwrap()
    .enable_compression(Some("lz4"))
    .build();
    dag.add_edge(Edge::new(
        "read",
        "sum",
        edge_conf.create_default_edge_property().unwrap(),
    ))
    .unwrap();

    let broadcast = EdgeProperty::new(
        DataMovementType::Broadcast,
        DataSourceType::Persisted,
        SchedulingType::Sequential,
        OutputDescriptor::new("o"),
        InputDescriptor::new("i"),
    )
    .unwrap();
    dag.add_edge(Edge::new("sum", "write", broadcast)).unwrap();

    dag.create_plan().unwrap()
}

#[tokio::test]
pub async fn word_count_reconfiguration_test() {
    let mut history = HistoryLoggingService::start(
        DagConfig::default().history,
        Arc::new(LoggingTimelineClient::default()),
    );

    let mut initializers = InitializerRegistry::default();
    initializers.register("file-split", || Arc::new(FileSplitInitializer {}));

    let plan = word_count_plan();
    let json = plan.to_json().unwrap();
    let plan = DagPlan::from_json(json.as_str()).unwrap();

    let scheduler = DagScheduler::submit(
        plan,
        &PluginRegistry::default(),
        &initializers,
        Some(history.handler()),
    )
    .unwrap();
    assert_eq!(scheduler.resolved_parallelism("write"), Some(1));

    let read = scheduler.await_finalized("read").await.unwrap();
    assert_eq!(read.parallelism(), 4);
    assert_eq!(read.routing()["files"], vec![0, 1, 2, 3]);

    // half of the readers produced 1400 bytes, 2800 expected in total:
    // 3 tasks wanted, 3 partitions per task
    scheduler.task_completed("read", 0, 700).unwrap();
    assert!(scheduler
        .state("sum")
        .map(|state| !state.is_terminated())
        .unwrap());
    scheduler.task_completed("read", 1, 700).unwrap();

    let sum = scheduler.await_finalized("sum").await.unwrap();
    assert_eq!(sum.parallelism(), 4);
    assert_eq!(sum.routing()["read"], vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3]);
    assert_eq!(scheduler.state("sum").unwrap(), ReconfigState::Finalized);

    let plan = scheduler.finalized_plan().await.unwrap();
    assert_eq!(plan.vertex("read").unwrap().parallelism(), Parallelism::Fixed(4));
    assert_eq!(plan.vertex("sum").unwrap().parallelism(), Parallelism::Fixed(4));
    assert_eq!(plan.vertex("write").unwrap().parallelism(), Parallelism::Fixed(1));

    let edge = plan.edge(&EdgeId::new("read", "sum")).unwrap();
    let output_conf =
        UnorderedPartitionedKvOutputConfig::from_bytes(edge.property().edge_source().user_payload().unwrap())
            .unwrap();
    assert_eq!(output_conf.get(RUNTIME_DESTINATION_TASK_COUNT), Some("4"));
    assert_eq!(output_conf.get(RUNTIME_KEY_CLASS), Some("Text"));
    assert!(output_conf.is_compression_enabled());

    let input_conf = Properties::from_bytes(
        "UnorderedKvInput",
        edge.property().edge_destination().user_payload().unwrap(),
    )
    .unwrap();
    assert!(!input_conf.contains_key(RUNTIME_DESTINATION_TASK_COUNT));

    assert_eq!(history.stop().await, 0);
}
