pub mod context;
pub mod controller;
pub mod report;
pub mod stage;
pub mod stages;
pub mod status;

pub use context::PipelineContext;
pub use controller::PipelineController;
pub use report::{RunSummary, StageReport, StageStatus, ZoneOutcome, ZoneReport};
pub use stage::{Stage, StageName};
pub use stages::{
    AggregateStage, BuffersStage, ConvertStage, IndicatorDecision, IndicatorsStage, ResultDirState,
};
pub use status::ZoneStatus;
