pub mod config;
pub mod descriptor;
pub mod error;
pub mod properties;
pub mod resource;

pub use error::*;
