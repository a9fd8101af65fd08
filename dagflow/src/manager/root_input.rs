use std::collections::{BTreeMap, HashSet};

use crate::manager::event::{Decision, VertexManagerEvent};
use crate::manager::plugin::{VertexManagerContext, VertexManagerPlugin};
use crate::manager::reconfiguration::VertexReconfiguration;

/// Waits for every root-input initializer of the vertex to complete.
///
/// The parallelism is the set-parallelism directive when one was emitted, the
/// construction parallelism otherwise, and for a deferred vertex without directive
/// the largest number of data information events of one input. Data information
/// events of each input are spread round-robin over the tasks.
#[derive(Default, Debug)]
pub struct RootInputVertexManager {
    pending_inputs: HashSet<String>,
    directive: Option<(String, u32)>,
    /// input name -> data information events seen
    data_information: BTreeMap<String, u32>,
}

impl RootInputVertexManager {
    fn decide(&self, context: &VertexManagerContext) -> anyhow::Result<Decision> {
        let parallelism = match (&self.directive, context.parallelism().fixed()) {
            (Some((_, parallelism)), _) => *parallelism,
            (None, Some(parallelism)) => parallelism,
            (None, None) => self.data_information.values().cloned().max().unwrap_or(0),
        };

        let mut reconfiguration = VertexReconfiguration::new(parallelism);
        for (input_name, count) in &self.data_information {
            if *count == 0 {
                continue;
            }
            if parallelism == 0 {
                return Err(anyhow!(
                    "vertex `{}` input `{}` has {} splits but parallelism 0",
                    context.vertex_name(),
                    input_name,
                    count
                ));
            }
            let routing = (0..*count).map(|index| index % parallelism).collect();
            reconfiguration = reconfiguration.with_routing(input_name, routing);
        }

        Ok(Decision::Finalize(reconfiguration))
    }
}

impl VertexManagerPlugin for RootInputVertexManager {
    fn initialize(&mut self, context: &VertexManagerContext) -> anyhow::Result<Decision> {
        self.pending_inputs = context.initialized_inputs().iter().cloned().collect();
        if self.pending_inputs.is_empty() {
            return match context.parallelism().fixed() {
                Some(_) => self.decide(context),
                None => Err(anyhow!(
                    "vertex `{}` is deferred but has no initialized root input",
                    context.vertex_name()
                )),
            };
        }
        Ok(Decision::Pending)
    }

    fn on_event(
        &mut self,
        context: &VertexManagerContext,
        event: &VertexManagerEvent,
    ) -> anyhow::Result<Decision> {
        match event {
            VertexManagerEvent::RootInputDataInformation { input_name, .. } => {
                *self
                    .data_information
                    .entry(input_name.to_string())
                    .or_insert(0) += 1;
                Ok(Decision::Pending)
            }
            VertexManagerEvent::RootInputSetParallelism {
                input_name,
                parallelism,
            } => {
                match &self.directive {
                    Some((other_input, other)) if other != parallelism => {
                        return Err(anyhow!(
                            "vertex `{}` inputs `{}` and `{}` set conflicting parallelism {} and {}",
                            context.vertex_name(),
                            other_input,
                            input_name,
                            other,
                            parallelism
                        ));
                    }
                    Some(_) => {}
                    None => {
                        info!(
                            "vertex `{}` input `{}` set parallelism to {}",
                            context.vertex_name(),
                            input_name,
                            parallelism
                        );
                        self.directive = Some((input_name.to_string(), *parallelism));
                    }
                }
                Ok(Decision::Pending)
            }
            VertexManagerEvent::RootInputInitialized { input_name } => {
                if !self.pending_inputs.remove(input_name.as_str()) {
                    warn!(
                        "vertex `{}` unexpected completion of input `{}`",
                        context.vertex_name(),
                        input_name
                    );
                }
                if self.pending_inputs.is_empty() {
                    self.decide(context)
                } else {
                    Ok(Decision::Pending)
                }
            }
            VertexManagerEvent::RootInputFailed {
                input_name,
                message,
            } => Err(anyhow!(
                "vertex `{}` input `{}` initializer failed. {}",
                context.vertex_name(),
                input_name,
                message
            )),
            VertexManagerEvent::SourceVertexConfigured { .. }
            | VertexManagerEvent::SourceTaskCompleted { .. } => Ok(Decision::Pending),
        }
    }
}
