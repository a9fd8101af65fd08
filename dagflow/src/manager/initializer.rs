use std::collections::HashMap;
use std::sync::Arc;

use crate::api::descriptor::InputInitializerDescriptor;
use crate::api::{DagError, Result};
use crate::dag::vertex::{RootInput, Vertex};
use crate::dag::Parallelism;
use crate::manager::event::{InitializerEvent, VertexManagerEvent};

/// What an initializer knows about the root input it prepares.
#[derive(Clone, Debug)]
pub struct InputInitializerContext {
    vertex_name: String,
    vertex_parallelism: Parallelism,
    input_name: String,
    input_payload: Option<Vec<u8>>,
    initializer_payload: Option<Vec<u8>>,
}

impl InputInitializerContext {
    pub fn new(vertex_name: &str, vertex_parallelism: Parallelism, input_name: &str) -> Self {
        InputInitializerContext {
            vertex_name: vertex_name.to_string(),
            vertex_parallelism,
            input_name: input_name.to_string(),
            input_payload: None,
            initializer_payload: None,
        }
    }

    pub fn from_input(vertex: &Vertex, input: &RootInput) -> Self {
        let mut context =
            InputInitializerContext::new(vertex.name(), vertex.parallelism(), input.name());
        context.input_payload = input.descriptor().user_payload().map(|p| p.to_vec());
        context.initializer_payload = input
            .controller()
            .and_then(|d| d.user_payload().map(|p| p.to_vec()));
        context
    }

    pub fn vertex_name(&self) -> &str {
        self.vertex_name.as_str()
    }

    pub fn vertex_parallelism(&self) -> Parallelism {
        self.vertex_parallelism
    }

    pub fn input_name(&self) -> &str {
        self.input_name.as_str()
    }

    pub fn input_payload(&self) -> Option<&[u8]> {
        self.input_payload.as_deref()
    }

    pub fn initializer_payload(&self) -> Option<&[u8]> {
        self.initializer_payload.as_deref()
    }
}

/// Discovers the splits of a root input before its vertex is scheduled.
///
/// Runs once per input in its own task. The returned events are delivered to the
/// vertex manager in order.
#[async_trait]
pub trait RootInputInitializer: Send + Sync {
    async fn initialize(
        &self,
        context: &InputInitializerContext,
    ) -> anyhow::Result<Vec<InitializerEvent>>;
}

pub type InitializerFactory = Arc<dyn Fn() -> Arc<dyn RootInputInitializer> + Send + Sync>;

/// Root-input initializers by class name
#[derive(Clone, Default)]
pub struct InitializerRegistry {
    factories: HashMap<String, InitializerFactory>,
}

impl InitializerRegistry {
    pub fn register<F>(&mut self, class_name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn RootInputInitializer> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(class_name.to_string(), Arc::new(factory))
            .is_some()
        {
            warn!("root input initializer `{}` replaced", class_name);
        }
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    pub fn create(
        &self,
        descriptor: &InputInitializerDescriptor,
    ) -> Result<Arc<dyn RootInputInitializer>> {
        self.factories
            .get(descriptor.class_name())
            .map(|factory| factory())
            .ok_or_else(|| {
                DagError::invalid_argument(format!(
                    "root input initializer `{}` not registered",
                    descriptor.class_name()
                ))
            })
    }
}

/// Translate the outcome of one initializer into vertex manager events.
///
/// Data information events are numbered per input. Only the first parallelism
/// directive is kept. The last event is always `RootInputInitialized`, or
/// `RootInputFailed` when the initializer returned an error.
pub(crate) fn to_manager_events(
    vertex_name: &str,
    input_name: &str,
    outcome: anyhow::Result<Vec<InitializerEvent>>,
) -> Vec<VertexManagerEvent> {
    let events = match outcome {
        Ok(events) => events,
        Err(e) => {
            error!(
                "vertex `{}` input `{}` initializer failed. {}",
                vertex_name, input_name, e
            );
            return vec![VertexManagerEvent::RootInputFailed {
                input_name: input_name.to_string(),
                message: e.to_string(),
            }];
        }
    };

    let mut manager_events = Vec::with_capacity(events.len() + 1);
    let mut index = 0u32;
    let mut directive: Option<u32> = None;
    for event in events {
        match event {
            InitializerEvent::DataInformation(payload) => {
                manager_events.push(VertexManagerEvent::RootInputDataInformation {
                    input_name: input_name.to_string(),
                    index,
                    payload,
                });
                index += 1;
            }
            InitializerEvent::SetParallelism(parallelism) => match directive {
                Some(first) => warn!(
                    "vertex `{}` input `{}` ignore parallelism {}, already set to {}",
                    vertex_name, input_name, parallelism, first
                ),
                None => {
                    directive = Some(parallelism);
                    manager_events.push(VertexManagerEvent::RootInputSetParallelism {
                        input_name: input_name.to_string(),
                        parallelism,
                    });
                }
            },
        }
    }

    manager_events.push(VertexManagerEvent::RootInputInitialized {
        input_name: input_name.to_string(),
    });
    manager_events
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::api::descriptor::{InputDescriptor, InputInitializerDescriptor, ProcessorDescriptor};
    use crate::api::resource::Resource;
    use crate::dag::vertex::Vertex;
    use crate::manager::event::{InitializerEvent, VertexManagerEvent};
    use crate::manager::initializer::{
        to_manager_events, InitializerRegistry, InputInitializerContext, RootInputInitializer,
    };

    struct SplitInitializer {}

    #[async_trait]
    impl RootInputInitializer for SplitInitializer {
        async fn initialize(
            &self,
            context: &InputInitializerContext,
        ) -> anyhow::Result<Vec<InitializerEvent>> {
            let splits = context.initializer_payload().map(|p| p[0]).unwrap_or(1);
            Ok((0..splits)
                .map(|i| InitializerEvent::DataInformation(vec![i]))
                .collect())
        }
    }

    #[tokio::test]
    pub async fn initializer_registry_test() {
        let mut registry = InitializerRegistry::default();
        registry.register("splits", || Arc::new(SplitInitializer {}));
        assert!(registry.contains("splits"));
        assert!(registry
            .create(&InputInitializerDescriptor::new("unknown"))
            .err()
            .unwrap()
            .is_invalid_argument());

        let mut vertex = Vertex::new("map", ProcessorDescriptor::new("p"), -1, Resource::new(1, 1))
            .unwrap();
        vertex
            .add_input(
                "lines",
                InputDescriptor::new("text"),
                Some(InputInitializerDescriptor::with_payload("splits", vec![3])),
            )
            .unwrap();

        let input = &vertex.inputs()[0];
        let context = InputInitializerContext::from_input(&vertex, input);
        assert_eq!(context.input_name(), "lines");
        assert!(context.input_payload().is_none());

        let initializer = registry.create(input.controller().unwrap()).unwrap();
        let events = initializer.initialize(&context).await.unwrap();
        assert_eq!(events.len(), 3);
    }

    #[test]
    pub fn to_manager_events_test() {
        let events = to_manager_events(
            "map",
            "lines",
            Ok(vec![
                InitializerEvent::DataInformation(vec![1]),
                InitializerEvent::SetParallelism(5),
                InitializerEvent::DataInformation(vec![2]),
                InitializerEvent::SetParallelism(7),
            ]),
        );
        assert_eq!(
            events,
            vec![
                VertexManagerEvent::RootInputDataInformation {
                    input_name: "lines".to_string(),
                    index: 0,
                    payload: vec![1],
                },
                VertexManagerEvent::RootInputSetParallelism {
                    input_name: "lines".to_string(),
                    parallelism: 5,
                },
                VertexManagerEvent::RootInputDataInformation {
                    input_name: "lines".to_string(),
                    index: 1,
                    payload: vec![2],
                },
                VertexManagerEvent::RootInputInitialized {
                    input_name: "lines".to_string(),
                },
            ]
        );

        let failed = to_manager_events("map", "lines", Err(anyhow!("no such path")));
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].kind(), "RootInputFailed");
    }
}
