pub mod config;
mod orchestrator;
mod series;
mod types;

pub use config::{FailurePolicy, FixedEdgeStrategy, PipelineConfig, SeriesConfig};
pub use orchestrator::{
    process_group, process_group_reported, segment_group, GroupReport, GroupResult,
};
pub use series::{
    align_series, align_series_with_progress, RegisteredFrame, RegisteredSeries,
    RegistrationQuality,
};
pub use types::{NoOpReporter, PipelineStage, ProgressReporter};
