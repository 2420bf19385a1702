// happiness-core/src/domain/project/mod.rs

pub mod configuration;
pub mod layout;

pub use configuration::{
    CleaningConfig, CorrelationMethod, DashboardConfig, EdaConfig, Imputation, PipelineConfig,
    ReconcileConfig, SourcesConfig,
};
pub use layout::{Layer, ProjectLayout};
