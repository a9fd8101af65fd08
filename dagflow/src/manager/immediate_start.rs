use crate::manager::event::{Decision, VertexManagerEvent};
use crate::manager::plugin::{VertexManagerContext, VertexManagerPlugin};
use crate::manager::reconfiguration::VertexReconfiguration;

/// Finalizes at initialization with the parallelism given at construction.
#[derive(Default, Debug)]
pub struct ImmediateStartVertexManager {}

impl VertexManagerPlugin for ImmediateStartVertexManager {
    fn initialize(&mut self, context: &VertexManagerContext) -> anyhow::Result<Decision> {
        match context.parallelism().fixed() {
            Some(parallelism) => Ok(Decision::Finalize(VertexReconfiguration::new(parallelism))),
            None => Err(anyhow!(
                "vertex `{}` has no parallelism to start with",
                context.vertex_name()
            )),
        }
    }

    fn on_event(
        &mut self,
        context: &VertexManagerContext,
        event: &VertexManagerEvent,
    ) -> anyhow::Result<Decision> {
        debug!(
            "vertex `{}` ignore {} event",
            context.vertex_name(),
            event.kind()
        );
        Ok(Decision::Pending)
    }
}

#[cfg(test)]
mod tests {
    use crate::dag::Parallelism;
    use crate::manager::event::Decision;
    use crate::manager::immediate_start::ImmediateStartVertexManager;
    use crate::manager::plugin::{VertexManagerContext, VertexManagerPlugin};

    #[test]
    pub fn immediate_start_test() {
        let mut manager = ImmediateStartVertexManager::default();
        let context = VertexManagerContext::new("v", Parallelism::Fixed(4));
        match manager.initialize(&context).unwrap() {
            Decision::Finalize(r) => assert_eq!(r.parallelism(), 4),
            Decision::Pending => panic!("expect finalize"),
        }

        let context = VertexManagerContext::new("v", Parallelism::Deferred);
        assert!(manager.initialize(&context).is_err());
    }
}
