use std::collections::{HashMap, HashSet};

use crate::api::properties::Properties;
use crate::conf::keys::RUNTIME_DESTINATION_TASK_COUNT;
use crate::conf::unordered_partitioned_output::{
    UNORDERED_PARTITIONED_KV_OUTPUT, UNORDERED_PARTITIONED_KV_OUTPUT_CLASS,
};
use crate::dag::edge::DataMovementType;
use crate::manager::event::{Decision, VertexManagerEvent};
use crate::manager::plugin::{VertexManagerContext, VertexManagerPlugin};
use crate::manager::reconfiguration::VertexReconfiguration;

pub const SHUFFLE_VERTEX_MANAGER_CONF: &str = "ShuffleVertexManager";

pub const ENABLE_AUTO_PARALLEL: &str = "dagflow.shuffle-vertex-manager.enable.auto-parallel";
pub const MIN_SRC_FRACTION: &str = "dagflow.shuffle-vertex-manager.min-src-fraction";
pub const DESIRED_TASK_INPUT_SIZE: &str = "dagflow.shuffle-vertex-manager.desired-task-input-size";

#[derive(Clone, Debug, PartialEq)]
pub struct ShuffleVertexManagerConfig {
    pub enable_auto_parallel: bool,
    /// fraction of upstream tasks that must complete before deciding
    pub min_src_fraction: f32,
    /// bytes one destination task should read
    pub desired_task_input_size: u64,
}

impl Default for ShuffleVertexManagerConfig {
    fn default() -> Self {
        ShuffleVertexManagerConfig {
            enable_auto_parallel: true,
            min_src_fraction: 0.25,
            desired_task_input_size: 100 * 1024 * 1024,
        }
    }
}

impl ShuffleVertexManagerConfig {
    pub fn from_payload(payload: Option<&[u8]>) -> anyhow::Result<Self> {
        let mut conf = ShuffleVertexManagerConfig::default();
        let payload = match payload {
            Some(payload) => payload,
            None => return Ok(conf),
        };

        let properties = Properties::from_bytes(SHUFFLE_VERTEX_MANAGER_CONF, payload)?;
        if properties.contains_key(ENABLE_AUTO_PARALLEL) {
            conf.enable_auto_parallel = properties.get_bool(ENABLE_AUTO_PARALLEL)?;
        }
        if properties.contains_key(MIN_SRC_FRACTION) {
            conf.min_src_fraction = properties.get_f32(MIN_SRC_FRACTION)?;
        }
        if properties.contains_key(DESIRED_TASK_INPUT_SIZE) {
            conf.desired_task_input_size = properties.get_u64(DESIRED_TASK_INPUT_SIZE)?;
        }

        if !(0.0..=1.0).contains(&conf.min_src_fraction) {
            return Err(anyhow!(
                "`{}` must be within [0, 1], found {}",
                MIN_SRC_FRACTION,
                conf.min_src_fraction
            ));
        }
        if conf.desired_task_input_size == 0 {
            return Err(anyhow!("`{}` must be > 0", DESIRED_TASK_INPUT_SIZE));
        }

        Ok(conf)
    }

    pub fn to_payload(&self) -> anyhow::Result<Vec<u8>> {
        let mut properties = Properties::with_name(SHUFFLE_VERTEX_MANAGER_CONF);
        properties.set_bool(ENABLE_AUTO_PARALLEL, self.enable_auto_parallel);
        properties.set_f32(MIN_SRC_FRACTION, self.min_src_fraction);
        properties.set_u64(DESIRED_TASK_INPUT_SIZE, self.desired_task_input_size);
        Ok(properties.to_bytes()?)
    }
}

/// Auto-reduce for vertices fed by scatter-gather edges.
///
/// Once `min_src_fraction` of the upstream tasks completed, the total upstream output
/// is extrapolated from the completed tasks and the desired parallelism computed as
/// `ceil(estimate / desired_task_input_size)`, clamped to `[1, initial]`. Every
/// destination task then reads `initial / desired` contiguous source partitions, so
/// the final parallelism is `ceil(initial / (initial / desired))`. Nothing changes
/// when a task would read a single partition.
#[derive(Default, Debug)]
pub struct ShuffleVertexManager {
    conf: ShuffleVertexManagerConfig,
    initial_parallelism: u32,
    scatter_gather_sources: HashSet<String>,
    /// (source vertex, task index) -> output size
    completed_tasks: HashMap<(String, u32), u64>,
}

impl ShuffleVertexManager {
    fn try_decide(&self, context: &VertexManagerContext) -> anyhow::Result<Decision> {
        let mut total_tasks = 0u64;
        for source in &self.scatter_gather_sources {
            match context.source_parallelism(source) {
                Some(n) => total_tasks += n as u64,
                None => return Ok(Decision::Pending),
            }
        }

        if total_tasks == 0 {
            return Ok(Decision::Finalize(VertexReconfiguration::new(
                self.initial_parallelism,
            )));
        }

        let completed = self.completed_tasks.len() as u64;
        let fraction = completed as f64 / total_tasks as f64;
        if fraction < self.conf.min_src_fraction as f64 || completed == 0 {
            return Ok(Decision::Pending);
        }

        if !self.conf.enable_auto_parallel {
            return Ok(Decision::Finalize(VertexReconfiguration::new(
                self.initial_parallelism,
            )));
        }

        let completed_output: u128 = self.completed_tasks.values().map(|s| *s as u128).sum();
        let estimate = completed_output * total_tasks as u128 / completed as u128;
        let desired_size = self.conf.desired_task_input_size as u128;
        let desired = ((estimate + desired_size - 1) / desired_size)
            .max(1)
            .min(self.initial_parallelism as u128) as u32;

        let partitions_per_task = self.initial_parallelism / desired;
        if partitions_per_task <= 1 {
            return Ok(Decision::Finalize(VertexReconfiguration::new(
                self.initial_parallelism,
            )));
        }

        let parallelism = reduced_parallelism(self.initial_parallelism, partitions_per_task);
        info!(
            "vertex `{}` reduce parallelism from {} to {}, {} partitions per task, estimated input {} bytes",
            context.vertex_name(),
            self.initial_parallelism,
            parallelism,
            partitions_per_task,
            estimate
        );
        self.reconfigure(context, parallelism, partitions_per_task)
            .map(Decision::Finalize)
    }

    fn reconfigure(
        &self,
        context: &VertexManagerContext,
        parallelism: u32,
        partitions_per_task: u32,
    ) -> anyhow::Result<VertexReconfiguration> {
        let routing = partition_ranges(self.initial_parallelism, partitions_per_task);

        let mut reconfiguration = VertexReconfiguration::new(parallelism);
        for input_edge in context.input_edges() {
            if input_edge.data_movement != DataMovementType::ScatterGather {
                continue;
            }
            reconfiguration =
                reconfiguration.with_routing(input_edge.source_vertex.as_str(), routing.clone());

            // other outputs keep their opaque payload
            if input_edge.output_class != UNORDERED_PARTITIONED_KV_OUTPUT_CLASS {
                debug!(
                    "vertex `{}` keep payload of edge `{}`, output `{}`",
                    context.vertex_name(),
                    input_edge.edge_id,
                    input_edge.output_class
                );
                continue;
            }

            let mut output_conf = match &input_edge.output_payload {
                Some(payload) => Properties::from_bytes(UNORDERED_PARTITIONED_KV_OUTPUT, payload)?,
                None => Properties::with_name(UNORDERED_PARTITIONED_KV_OUTPUT),
            };
            output_conf.set_u32(RUNTIME_DESTINATION_TASK_COUNT, parallelism);
            reconfiguration = reconfiguration
                .with_edge_payload(input_edge.edge_id.clone(), output_conf.to_bytes()?);
        }

        Ok(reconfiguration)
    }
}

fn reduced_parallelism(partitions: u32, partitions_per_task: u32) -> u32 {
    partitions / partitions_per_task + u32::from(partitions % partitions_per_task != 0)
}

/// Partition `p` goes to task `p / partitions_per_task`; the last task may read fewer.
fn partition_ranges(partitions: u32, partitions_per_task: u32) -> Vec<u32> {
    let partitions_per_task = partitions_per_task.max(1);
    (0..partitions)
        .map(|partition| partition / partitions_per_task)
        .collect()
}

impl VertexManagerPlugin for ShuffleVertexManager {
    fn initialize(&mut self, context: &VertexManagerContext) -> anyhow::Result<Decision> {
        self.conf = ShuffleVertexManagerConfig::from_payload(context.user_payload())?;
        self.initial_parallelism = context.parallelism().fixed().ok_or_else(|| {
            anyhow!(
                "vertex `{}` needs an initial parallelism for auto-reduce",
                context.vertex_name()
            )
        })?;
        self.scatter_gather_sources = context
            .input_edges()
            .iter()
            .filter(|e| e.data_movement == DataMovementType::ScatterGather)
            .map(|e| e.source_vertex.clone())
            .collect();

        if self.scatter_gather_sources.is_empty() || self.initial_parallelism == 0 {
            return Ok(Decision::Finalize(VertexReconfiguration::new(
                self.initial_parallelism,
            )));
        }

        self.try_decide(context)
    }

    fn on_event(
        &mut self,
        context: &VertexManagerContext,
        event: &VertexManagerEvent,
    ) -> anyhow::Result<Decision> {
        match event {
            VertexManagerEvent::SourceTaskCompleted {
                source_vertex,
                task_index,
                output_size,
            } => {
                if self.scatter_gather_sources.contains(source_vertex) {
                    self.completed_tasks
                        .insert((source_vertex.clone(), *task_index), *output_size);
                }
                self.try_decide(context)
            }
            VertexManagerEvent::SourceVertexConfigured { .. } => self.try_decide(context),
            _ => Ok(Decision::Pending),
        }
    }
}
