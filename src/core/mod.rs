pub mod config;
pub mod errors;
pub mod logging;

pub use errors::PipelineError;
