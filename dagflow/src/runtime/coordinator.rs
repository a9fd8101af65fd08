use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::api::{DagError, Result};
use crate::dag::plan::DagPlan;
use crate::history::{HistoryEvent, HistoryEventType, HistoryHandler};
use crate::manager::event::{Decision, VertexManagerEvent};
use crate::manager::initializer::{
    to_manager_events, InitializerRegistry, InputInitializerContext, RootInputInitializer,
};
use crate::manager::plugin::{PluginRegistry, VertexManagerContext, VertexManagerPlugin};
use crate::manager::reconfiguration::{
    AtomicReconfigState, ReconfigState, ReconfigurationState, VertexReconfiguration,
};

/// Final outcome of one vertex, published once through the vertex's watch channel.
#[derive(Clone, Debug, PartialEq)]
pub enum VertexOutcome {
    Finalized(VertexReconfiguration),
    Aborted(String),
}

type OutcomeReceiver = watch::Receiver<Option<VertexOutcome>>;
type EventSender = mpsc::UnboundedSender<VertexManagerEvent>;

struct VertexHandle {
    state: Arc<AtomicReconfigState>,
    /// absent for vertices final at submission
    sender: Option<EventSender>,
    outcome: OutcomeReceiver,
    downstream: Vec<String>,
}

impl VertexHandle {
    fn state(&self) -> ReconfigState {
        self.state.load(Ordering::SeqCst)
    }
}

/// Drives the vertex managers of one submitted DAG.
///
/// Every vertex that may still change gets its own consuming task and event channel,
/// so events of one vertex are applied one at a time while vertices progress
/// independently. Readers wait for a vertex through its finalize signal and never
/// observe a half-applied decision.
pub struct DagScheduler {
    plan: DagPlan,
    vertices: HashMap<String, VertexHandle>,
    cancel: CancellationToken,
    history: Option<HistoryHandler>,
}

impl DagScheduler {
    /// Start the vertex managers and root-input initializers of `plan`. Must be called
    /// within a tokio runtime.
    ///
    /// Every plugin and initializer is resolved before anything is started, so an
    /// unknown class name fails the submission as a whole.
    pub fn submit(
        plan: DagPlan,
        plugins: &PluginRegistry,
        initializers: &InitializerRegistry,
        history: Option<HistoryHandler>,
    ) -> Result<Self> {
        let mut workers = Vec::new();
        for vertex in plan.vertices() {
            let plugin = plugins.plugin_for(vertex)?;

            let mut vertex_initializers = Vec::new();
            for input in vertex.initialized_inputs() {
                if let Some(descriptor) = input.controller() {
                    vertex_initializers.push((
                        InputInitializerContext::from_input(vertex, input),
                        initializers.create(descriptor)?,
                    ));
                }
            }

            workers.push((vertex.name().to_string(), plugin, vertex_initializers));
        }

        let cancel = CancellationToken::new();
        let dag_name = plan.name().to_string();
        report(
            &history,
            &dag_name,
            HistoryEventType::DagSubmitted {
                vertex_count: plan.vertices().len(),
            },
        );

        let mut channels = HashMap::new();
        for (vertex_name, plugin, _) in &workers {
            if plugin.is_some() {
                let (sender, receiver) = mpsc::unbounded_channel();
                channels.insert(vertex_name.clone(), (sender, receiver));
            }
        }
        let senders: HashMap<String, EventSender> = channels
            .iter()
            .map(|(name, (sender, _))| (name.clone(), sender.clone()))
            .collect();

        let mut vertices = HashMap::new();
        for (vertex_name, plugin, vertex_initializers) in workers {
            let vertex = plan
                .vertex(vertex_name.as_str())
                .ok_or_else(|| DagError::VertexNotFound(vertex_name.clone()))?;
            let downstream: Vec<String> = plan
                .downstream(vertex_name.as_str())
                .into_iter()
                .map(|name| name.to_string())
                .collect();

            let (plugin, receiver) = match (plugin, channels.remove(&vertex_name)) {
                (Some(plugin), Some((_, receiver))) => (plugin, receiver),
                _ => {
                    let parallelism = vertex.parallelism().fixed().ok_or_else(|| {
                        DagError::invalid_state(format!(
                            "vertex `{}` has parallelism -1 and nothing to decide it",
                            vertex_name
                        ))
                    })?;
                    let reconfiguration = VertexReconfiguration::new(parallelism);
                    let mut state = ReconfigurationState::new(vertex_name.as_str());
                    state.finalize(reconfiguration.clone())?;
                    report(
                        &history,
                        &dag_name,
                        HistoryEventType::VertexFinalized {
                            vertex_name: vertex_name.clone(),
                            parallelism,
                        },
                    );
                    debug!(
                        "vertex `{}` final at submission, parallelism={}",
                        vertex_name, parallelism
                    );

                    let (_tx, outcome) =
                        watch::channel(Some(VertexOutcome::Finalized(reconfiguration)));
                    vertices.insert(
                        vertex_name,
                        VertexHandle {
                            state: state.state_ref(),
                            sender: None,
                            outcome,
                            downstream,
                        },
                    );
                    continue;
                }
            };

            let sender = senders.get(&vertex_name).cloned();
            for (context, initializer) in vertex_initializers {
                if let Some(sender) = sender.clone() {
                    spawn_initializer(context, initializer, sender, cancel.clone());
                }
            }

            let (outcome_sender, outcome) = watch::channel(None);
            let worker = VertexWorker {
                dag_name: dag_name.clone(),
                context: VertexManagerContext::from_plan(&plan, vertex),
                state: ReconfigurationState::new(vertex_name.as_str()),
                plugin,
                outcome: outcome_sender,
                downstream: downstream
                    .iter()
                    .filter_map(|name| senders.get(name).map(|s| (name.clone(), s.clone())))
                    .collect(),
                history: history.clone(),
            };
            let state_ref = worker.state.state_ref();
            tokio::spawn(worker.run(receiver, cancel.clone()));

            vertices.insert(
                vertex_name,
                VertexHandle {
                    state: state_ref,
                    sender,
                    outcome,
                    downstream,
                },
            );
        }

        info!(
            "dag `{}` submitted, {} vertices, {} with vertex manager",
            dag_name,
            vertices.len(),
            senders.len()
        );

        Ok(DagScheduler {
            plan,
            vertices,
            cancel,
            history,
        })
    }

    pub fn plan(&self) -> &DagPlan {
        &self.plan
    }

    fn handle(&self, vertex_name: &str) -> Result<&VertexHandle> {
        self.vertices
            .get(vertex_name)
            .ok_or_else(|| DagError::VertexNotFound(vertex_name.to_string()))
    }

    pub fn state(&self, vertex_name: &str) -> Result<ReconfigState> {
        self.handle(vertex_name).map(|handle| handle.state())
    }

    /// Deliver `event` to the vertex manager of `vertex_name`.
    ///
    /// Fails with `InvalidState` once the vertex is finalized or aborted; the event is
    /// dropped and the job keeps running.
    pub fn send_event(&self, vertex_name: &str, event: VertexManagerEvent) -> Result<()> {
        let handle = self.handle(vertex_name)?;
        let state = handle.state();
        if state.is_terminated() {
            warn!(
                "vertex `{}` is {}, reject {} event",
                vertex_name,
                state,
                event.kind()
            );
            return Err(DagError::invalid_state(format!(
                "vertex `{}` is {}, reconfiguration events are rejected",
                vertex_name, state
            )));
        }

        let sent = match &handle.sender {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        };
        if !sent {
            warn!("vertex `{}` stopped consuming events", vertex_name);
            return Err(DagError::invalid_state(format!(
                "vertex `{}` stopped consuming events",
                vertex_name
            )));
        }
        Ok(())
    }

    /// Notify every downstream vertex that a task of `source_vertex` completed.
    /// Downstream vertices that are already final are skipped.
    pub fn task_completed(
        &self,
        source_vertex: &str,
        task_index: u32,
        output_size: u64,
    ) -> Result<()> {
        let handle = self.handle(source_vertex)?;
        for destination in &handle.downstream {
            let destination_handle = self.handle(destination.as_str())?;
            if destination_handle.state().is_terminated() {
                continue;
            }
            if let Some(sender) = &destination_handle.sender {
                let event = VertexManagerEvent::SourceTaskCompleted {
                    source_vertex: source_vertex.to_string(),
                    task_index,
                    output_size,
                };
                if sender.send(event).is_err() {
                    debug!("vertex `{}` stopped consuming events", destination);
                }
            }
        }
        Ok(())
    }

    /// Parallelism of `vertex_name`, once final.
    pub fn resolved_parallelism(&self, vertex_name: &str) -> Option<u32> {
        let handle = self.vertices.get(vertex_name)?;
        let outcome = handle.outcome.borrow();
        match outcome.as_ref() {
            Some(VertexOutcome::Finalized(reconfiguration)) => Some(reconfiguration.parallelism()),
            _ => None,
        }
    }

    /// Wait until the vertex manager of `vertex_name` decided. Fails with `Aborted` if
    /// the job was aborted or the vertex manager failed first.
    pub async fn await_finalized(&self, vertex_name: &str) -> Result<VertexReconfiguration> {
        let mut outcome = self.handle(vertex_name)?.outcome.clone();
        loop {
            let current = outcome.borrow().clone();
            match current {
                Some(VertexOutcome::Finalized(reconfiguration)) => return Ok(reconfiguration),
                Some(VertexOutcome::Aborted(reason)) => {
                    return Err(DagError::Aborted(format!(
                        "vertex `{}` aborted. {}",
                        vertex_name, reason
                    )))
                }
                None => {}
            }

            if outcome.changed().await.is_err() {
                return Err(DagError::Aborted(format!(
                    "vertex `{}` manager stopped without a decision",
                    vertex_name
                )));
            }
        }
    }

    /// Wait for every vertex and apply all decisions to a copy of the plan.
    pub async fn finalized_plan(&self) -> Result<DagPlan> {
        let mut plan = self.plan.clone();
        let names: Vec<String> = plan
            .vertices()
            .iter()
            .map(|vertex| vertex.name().to_string())
            .collect();
        let decisions = futures::future::try_join_all(
            names
                .iter()
                .map(|vertex_name| self.await_finalized(vertex_name.as_str())),
        )
        .await?;

        for (vertex_name, reconfiguration) in names.iter().zip(decisions) {
            plan.apply_reconfiguration(vertex_name.as_str(), &reconfiguration)?;
        }
        Ok(plan)
    }

    /// Abort the job. Vertices not yet final move to `Aborted` and pending events are
    /// dropped.
    pub fn abort(&self, reason: &str) {
        if self.cancel.is_cancelled() {
            return;
        }
        warn!("dag `{}` aborted. {}", self.plan.name(), reason);
        self.cancel.cancel();
        report(
            &self.history,
            self.plan.name(),
            HistoryEventType::DagAborted {
                reason: reason.to_string(),
            },
        );
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for DagScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn report(history: &Option<HistoryHandler>, dag_name: &str, event_type: HistoryEventType) {
    if let Some(history) = history {
        history.handle(HistoryEvent::new(dag_name, event_type));
    }
}

fn spawn_initializer(
    context: InputInitializerContext,
    initializer: Arc<dyn RootInputInitializer>,
    sender: EventSender,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let outcome = tokio::select! {
            outcome = initializer.initialize(&context) => outcome,
            _ = cancel.cancelled() => {
                debug!(
                    "vertex `{}` input `{}` initializer cancelled",
                    context.vertex_name(),
                    context.input_name()
                );
                return;
            }
        };

        let events = to_manager_events(context.vertex_name(), context.input_name(), outcome);
        for event in events {
            if sender.send(event).is_err() {
                debug!(
                    "vertex `{}` stopped consuming events, drop initializer events of `{}`",
                    context.vertex_name(),
                    context.input_name()
                );
                break;
            }
        }
    });
}

/// Single consumer of one vertex's events; the only writer of its state.
struct VertexWorker {
    dag_name: String,
    context: VertexManagerContext,
    state: ReconfigurationState,
    plugin: Box<dyn VertexManagerPlugin>,
    outcome: watch::Sender<Option<VertexOutcome>>,
    downstream: Vec<(String, EventSender)>,
    history: Option<HistoryHandler>,
}

impl VertexWorker {
    async fn run(
        mut self,
        mut receiver: mpsc::UnboundedReceiver<VertexManagerEvent>,
        cancel: CancellationToken,
    ) {
        if let Err(e) = self.state.await_events() {
            self.abort(e.to_string());
            return;
        }

        report(
            &self.history,
            self.dag_name.as_str(),
            HistoryEventType::VertexInitialized {
                vertex_name: self.state.vertex_name().to_string(),
            },
        );
        let decision = self.plugin.initialize(&self.context);
        if self.apply(decision) {
            return;
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.abort("job aborted".to_string());
                    return;
                }
                event = receiver.recv() => event,
            };

            let event = match event {
                Some(event) => event,
                None => {
                    self.abort("event channel closed".to_string());
                    return;
                }
            };

            if let VertexManagerEvent::SourceVertexConfigured {
                source_vertex,
                parallelism,
            } = &event
            {
                self.context
                    .set_source_parallelism(source_vertex.as_str(), *parallelism);
            }

            if let Err(e) = self.state.begin_event() {
                warn!("{}", e);
                continue;
            }
            let decision = self.plugin.on_event(&self.context, &event);
            if self.apply(decision) {
                return;
            }
        }
    }

    /// Returns true once the vertex reached a terminal state.
    fn apply(&mut self, decision: anyhow::Result<Decision>) -> bool {
        match decision {
            Ok(Decision::Pending) => {
                self.state.end_event();
                false
            }
            Ok(Decision::Finalize(reconfiguration)) => {
                self.finalize(reconfiguration);
                true
            }
            Err(e) => {
                self.abort(e.to_string());
                true
            }
        }
    }

    fn finalize(&mut self, reconfiguration: VertexReconfiguration) {
        let vertex_name = self.state.vertex_name().to_string();
        let parallelism = reconfiguration.parallelism();
        if let Err(e) = self.state.finalize(reconfiguration.clone()) {
            warn!("{}", e);
            return;
        }
        info!(
            "vertex `{}` finalized, parallelism={}, routing sources={:?}",
            vertex_name,
            parallelism,
            reconfiguration.routing().keys().collect::<Vec<&String>>()
        );

        report(
            &self.history,
            self.dag_name.as_str(),
            HistoryEventType::VertexReconfigured {
                vertex_name: vertex_name.clone(),
                parallelism,
            },
        );

        // downstream managers hear about the parallelism before any reader does
        for (destination, sender) in &self.downstream {
            let event = VertexManagerEvent::SourceVertexConfigured {
                source_vertex: vertex_name.clone(),
                parallelism,
            };
            if sender.send(event).is_err() {
                debug!("vertex `{}` stopped consuming events", destination);
            }
        }

        self.outcome
            .send_replace(Some(VertexOutcome::Finalized(reconfiguration)));
    }

    fn abort(&mut self, reason: String) {
        if !self.state.abort() {
            return;
        }
        error!("vertex `{}` aborted. {}", self.state.vertex_name(), reason);
        self.outcome.send_replace(Some(VertexOutcome::Aborted(reason)));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::api::descriptor::{
        InputDescriptor, InputInitializerDescriptor, OutputDescriptor, ProcessorDescriptor,
        VertexManagerPluginDescriptor,
    };
    use crate::api::config::HistoryConfig;
    use crate::api::resource::Resource;
    use crate::api::DagError;
    use crate::dag::edge::{DataMovementType, DataSourceType, Edge, EdgeProperty, SchedulingType};
    use crate::dag::job_dag::JobDag;
    use crate::dag::vertex::Vertex;
    use crate::dag::Parallelism;
    use crate::history::event::{HistoryEvent, HistoryEventType};
    use crate::history::service::{HistoryLoggingService, TimelineClient};
    use crate::manager::event::{InitializerEvent, VertexManagerEvent};
    use crate::manager::initializer::{
        InitializerRegistry, InputInitializerContext, RootInputInitializer,
    };
    use crate::manager::plugin::{PluginRegistry, SHUFFLE_VERTEX_MANAGER};
    use crate::manager::reconfiguration::ReconfigState;
    use crate::manager::shuffle::ShuffleVertexManagerConfig;
    use crate::runtime::coordinator::DagScheduler;

    struct ParallelismInitializer {}

    #[async_trait]
    impl RootInputInitializer for ParallelismInitializer {
        async fn initialize(
            &self,
            _context: &InputInitializerContext,
        ) -> anyhow::Result<Vec<InitializerEvent>> {
            Ok(vec![
                InitializerEvent::SetParallelism(5),
                InitializerEvent::DataInformation(vec![0]),
                InitializerEvent::DataInformation(vec![1]),
            ])
        }
    }

    /// never completes
    struct PendingInitializer {}

    #[async_trait]
    impl RootInputInitializer for PendingInitializer {
        async fn initialize(
            &self,
            _context: &InputInitializerContext,
        ) -> anyhow::Result<Vec<InitializerEvent>> {
            futures::future::pending::<()>().await;
            Ok(vec![])
        }
    }

    fn initializers() -> InitializerRegistry {
        let mut registry = InitializerRegistry::default();
        registry.register("parallelism", || Arc::new(ParallelismInitializer {}));
        registry.register("pending", || Arc::new(PendingInitializer {}));
        registry
    }

    fn source(initializer: &str) -> Vertex {
        let mut vertex = Vertex::new(
            "source",
            ProcessorDescriptor::new("Reader"),
            -1,
            Resource::new(1024, 1),
        )
        .unwrap();
        vertex
            .add_input(
                "files",
                InputDescriptor::new("FileInput"),
                Some(InputInitializerDescriptor::new(initializer)),
            )
            .unwrap();
        vertex
    }

    fn single_vertex_plan(initializer: &str) -> crate::dag::plan::DagPlan {
        let mut dag = JobDag::new(uuid::Uuid::new_v4().to_string().as_str());
        dag.add_vertex(source(initializer)).unwrap();
        dag.create_plan().unwrap()
    }

    #[tokio::test]
    pub async fn initializer_parallelism_test() {
        let scheduler = DagScheduler::submit(
            single_vertex_plan("parallelism"),
            &PluginRegistry::default(),
            &initializers(),
            None,
        )
        .unwrap();

        let reconfiguration = scheduler.await_finalized("source").await.unwrap();
        assert_eq!(reconfiguration.parallelism(), 5);
        assert_eq!(reconfiguration.routing()["files"], vec![0, 1]);

        for _ in 0..3 {
            assert_eq!(scheduler.resolved_parallelism("source"), Some(5));
        }
        assert_eq!(scheduler.state("source").unwrap(), ReconfigState::Finalized);

        let event = VertexManagerEvent::RootInputSetParallelism {
            input_name: "files".to_string(),
            parallelism: 7,
        };
        let e = scheduler.send_event("source", event).unwrap_err();
        assert!(e.is_invalid_state());
        assert_eq!(scheduler.resolved_parallelism("source"), Some(5));

        let plan = scheduler.finalized_plan().await.unwrap();
        assert_eq!(
            plan.vertex("source").unwrap().parallelism(),
            Parallelism::Fixed(5)
        );
    }

    #[tokio::test]
    pub async fn abort_test() {
        let scheduler = DagScheduler::submit(
            single_vertex_plan("pending"),
            &PluginRegistry::default(),
            &initializers(),
            None,
        )
        .unwrap();
        assert!(scheduler.resolved_parallelism("source").is_none());

        scheduler.abort("user kill");
        assert!(scheduler.is_aborted());
        match scheduler.await_finalized("source").await {
            Err(DagError::Aborted(_)) => {}
            other => panic!("expect aborted, found {:?}", other),
        }
        assert_eq!(scheduler.state("source").unwrap(), ReconfigState::Aborted);
        assert!(scheduler
            .send_event(
                "source",
                VertexManagerEvent::RootInputInitialized {
                    input_name: "files".to_string()
                }
            )
            .unwrap_err()
            .is_invalid_state());
        assert!(scheduler.finalized_plan().await.is_err());
    }

    #[tokio::test]
    pub async fn unknown_initializer_test() {
        let e = DagScheduler::submit(
            single_vertex_plan("no-such-initializer"),
            &PluginRegistry::default(),
            &initializers(),
            None,
        )
        .err()
        .unwrap();
        assert!(e.is_invalid_argument());

        let scheduler = DagScheduler::submit(
            single_vertex_plan("parallelism"),
            &PluginRegistry::default(),
            &initializers(),
            None,
        )
        .unwrap();
        assert!(matches!(
            scheduler.state("nope"),
            Err(DagError::VertexNotFound(_))
        ));
    }

    #[tokio::test]
    pub async fn shuffle_fan_out_test() {
        let mut dag = JobDag::new("shuffle-fan-out");
        let conf = ShuffleVertexManagerConfig {
            enable_auto_parallel: true,
            min_src_fraction: 1.0,
            desired_task_input_size: 100,
        };
        let mut reduce = Vertex::new(
            "reduce",
            ProcessorDescriptor::new("Summation"),
            8,
            Resource::new(1024, 1),
        )
        .unwrap();
        reduce.set_vertex_manager_plugin(VertexManagerPluginDescriptor::with_payload(
            SHUFFLE_VERTEX_MANAGER,
            conf.to_payload().unwrap(),
        ));
        dag.add_vertex(
            Vertex::new(
                "map",
                ProcessorDescriptor::new("Tokenizer"),
                2,
                Resource::new(1024, 1),
            )
            .unwrap(),
        )
        .unwrap()
        .add_vertex(reduce)
        .unwrap();
        let property = EdgeProperty::new(
            DataMovementType::ScatterGather,
            DataSourceType::Persisted,
            SchedulingType::Sequential,
            OutputDescriptor::new("o"),
            InputDescriptor::new("i"),
        )
        .unwrap();
        dag.add_edge(Edge::new("map", "reduce", property)).unwrap();

        let scheduler = DagScheduler::submit(
            dag.create_plan().unwrap(),
            &PluginRegistry::default(),
            &InitializerRegistry::default(),
            None,
        )
        .unwrap();
        assert_eq!(scheduler.resolved_parallelism("map"), Some(2));
        assert!(scheduler.resolved_parallelism("reduce").is_none());

        scheduler.task_completed("map", 0, 150).unwrap();
        scheduler.task_completed("map", 1, 150).unwrap();

        let reconfiguration = scheduler.await_finalized("reduce").await.unwrap();
        // 3 tasks wanted, 2 of the 8 partitions per task
        assert_eq!(reconfiguration.parallelism(), 4);
        assert_eq!(reconfiguration.routing()["map"], vec![0, 0, 1, 1, 2, 2, 3, 3]);

        // reduce is final, later completions are skipped
        scheduler.task_completed("map", 1, 150).unwrap();

        let plan = scheduler.finalized_plan().await.unwrap();
        assert_eq!(
            plan.vertex("reduce").unwrap().parallelism(),
            Parallelism::Fixed(4)
        );
    }

    #[derive(Default)]
    struct CollectingTimelineClient {
        events: Mutex<Vec<HistoryEvent>>,
    }

    #[async_trait]
    impl TimelineClient for CollectingTimelineClient {
        async fn put_entities(&self, events: Vec<HistoryEvent>) -> anyhow::Result<()> {
            self.events.lock().unwrap().extend(events);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    pub async fn concurrent_completions_test() {
        let map_tasks = 16u32;
        let conf = ShuffleVertexManagerConfig {
            enable_auto_parallel: true,
            min_src_fraction: 0.5,
            desired_task_input_size: 100,
        };
        let mut reduce = Vertex::new(
            "reduce",
            ProcessorDescriptor::new("Summation"),
            16,
            Resource::new(1024, 1),
        )
        .unwrap();
        reduce.set_vertex_manager_plugin(VertexManagerPluginDescriptor::with_payload(
            SHUFFLE_VERTEX_MANAGER,
            conf.to_payload().unwrap(),
        ));
        let mut dag = JobDag::new("concurrent-completions");
        dag.add_vertex(
            Vertex::new(
                "map",
                ProcessorDescriptor::new("Tokenizer"),
                map_tasks as i32,
                Resource::new(1024, 1),
            )
            .unwrap(),
        )
        .unwrap()
        .add_vertex(reduce)
        .unwrap();
        let property = EdgeProperty::new(
            DataMovementType::ScatterGather,
            DataSourceType::Persisted,
            SchedulingType::Sequential,
            OutputDescriptor::new("o"),
            InputDescriptor::new("i"),
        )
        .unwrap();
        dag.add_edge(Edge::new("map", "reduce", property)).unwrap();

        let client = Arc::new(CollectingTimelineClient::default());
        let mut history = HistoryLoggingService::start(HistoryConfig::default(), client.clone());
        let scheduler = Arc::new(
            DagScheduler::submit(
                dag.create_plan().unwrap(),
                &PluginRegistry::default(),
                &InitializerRegistry::default(),
                Some(history.handler()),
            )
            .unwrap(),
        );

        // every map task reports from its own task, twice
        let mut completions = Vec::new();
        for task_index in 0..map_tasks * 2 {
            let scheduler = scheduler.clone();
            completions.push(tokio::spawn(async move {
                scheduler.task_completed("map", task_index % map_tasks, 25)
            }));
        }
        for completion in completions {
            completion.await.unwrap().unwrap();
        }

        // 8 of 16 tasks produced 200 bytes, 400 expected -> 4 partitions per task
        let reconfiguration = scheduler.await_finalized("reduce").await.unwrap();
        assert_eq!(reconfiguration.parallelism(), 4);
        for _ in 0..3 {
            assert_eq!(scheduler.resolved_parallelism("reduce"), Some(4));
        }

        let late = VertexManagerEvent::SourceTaskCompleted {
            source_vertex: "map".to_string(),
            task_index: 0,
            output_size: 1_000_000,
        };
        assert!(scheduler.send_event("reduce", late).unwrap_err().is_invalid_state());
        scheduler.task_completed("map", 1, 1_000_000).unwrap();
        assert_eq!(scheduler.resolved_parallelism("reduce"), Some(4));

        let plan = scheduler.finalized_plan().await.unwrap();
        assert_eq!(
            plan.vertex("reduce").unwrap().parallelism(),
            Parallelism::Fixed(4)
        );

        assert_eq!(history.stop().await, 0);
        let decisions = client
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| {
                matches!(
                    &event.event_type,
                    HistoryEventType::VertexReconfigured { vertex_name, .. } if vertex_name == "reduce"
                )
            })
            .count();
        assert_eq!(decisions, 1);
    }
}
