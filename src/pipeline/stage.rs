use crate::error::Result;
use crate::pipeline::{PipelineContext, StageReport};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Run the conversion tool for zones without an output directory
    Convert,
    /// Write the per-zone station buffer files
    Buffers,
    /// Run the indicator workflow for zones without complete results
    Indicators,
    /// Regroup zone results into one file per dataset, kind and radius
    Aggregate,
}

impl StageName {
    pub const ALL: [StageName; 4] = [
        StageName::Convert,
        StageName::Buffers,
        StageName::Indicators,
        StageName::Aggregate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StageName::Convert => "convert",
            StageName::Buffers => "buffers",
            StageName::Indicators => "indicators",
            StageName::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One resumable step of the pipeline. Completion is always judged from
/// what is on disk, never from a previous run's memory.
pub trait Stage {
    fn name(&self) -> StageName;

    fn is_complete(&self, ctx: &PipelineContext) -> Result<bool>;

    fn run(&self, ctx: &mut PipelineContext) -> Result<StageReport>;
}
