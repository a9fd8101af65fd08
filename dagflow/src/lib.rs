//! Job DAG description and runtime vertex reconfiguration.
//!
//! A job is assembled from vertices, edges and vertex groups into a [`dag::JobDag`],
//! verified, and turned into a [`dag::DagPlan`]. At runtime the
//! [`runtime::DagScheduler`] drives one vertex manager per vertex until each vertex
//! has a final parallelism and routing.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate async_trait;
#[macro_use]
extern crate atomic_enum;

#[macro_use]
mod macros;

pub mod api;
pub mod conf;
pub mod dag;
pub mod history;
pub mod manager;
pub mod runtime;
pub mod utils;
