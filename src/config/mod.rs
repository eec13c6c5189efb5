//! Configuration types for the orchestration engine

pub mod options;
pub mod types;

pub use options::ScrapeOptions;
pub use types::OrchestratorConfig;
