//! Runtime reconfiguration of vertices.
//!
//! A vertex manager plugin consumes events about its vertex (root-input splits,
//! upstream parallelism, upstream task completion) and decides once on the final
//! parallelism and routing.

pub mod event;
pub mod immediate_start;
pub mod initializer;
pub mod plugin;
pub mod reconfiguration;
pub mod root_input;
pub mod shuffle;

pub use event::{Decision, InitializerEvent, VertexManagerEvent};
pub use initializer::{InitializerRegistry, InputInitializerContext, RootInputInitializer};
pub use plugin::{PluginRegistry, VertexManagerContext, VertexManagerPlugin};
pub use reconfiguration::{ReconfigState, ReconfigurationState, VertexReconfiguration};
