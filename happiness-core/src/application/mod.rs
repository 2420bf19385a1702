// happiness-core/src/application/mod.rs

pub mod clean;
pub mod cleaning;
pub mod dashboard;
pub mod eda;
pub mod import;
pub mod loader;
pub mod pipeline;
pub mod reconcile;

// --- RE-EXPORTS (FACADE) ---
// The CLI only needs `use happiness_core::application::{run_pipeline, clean_project, ...}`.

pub use clean::clean_project;
pub use cleaning::BronzeCleaner;
pub use eda::EdaExplorer;
pub use import::{import_geolocation, import_happiness, import_sources};
pub use loader::{load_bronze, load_csv, load_gold, load_layer, load_silver};
pub use pipeline::{
    PipelineOptions, load_gold_frame, run_engineer, run_explore, run_import, run_pipeline,
    run_preprocess,
};
pub use reconcile::SchemaReconciler;
