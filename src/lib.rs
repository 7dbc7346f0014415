pub mod cli;
pub mod config;
pub mod error;
pub mod external;
pub mod geometry;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use error::{PipelineError, Result};
