pub mod project;

pub use crate::domain::project::PipelineConfig;
pub use project::load_pipeline_config;
