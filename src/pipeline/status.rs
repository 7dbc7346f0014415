use crate::error::Result;
use crate::models::{DatasetType, Zone};
use crate::pipeline::{IndicatorDecision, PipelineContext, ResultDirState};
use std::fmt;

/// Durable state of one zone, read from disk without running anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    pub dataset: DatasetType,
    pub directory: String,
    pub converted: bool,
    pub buffer_file: bool,
    pub results: ResultDirState,
}

impl ZoneStatus {
    pub fn inspect(ctx: &PipelineContext, zone: &Zone) -> Result<Self> {
        Ok(Self {
            dataset: zone.dataset,
            directory: zone.directory_name(),
            converted: ctx.conversion_dir(zone).is_dir(),
            buffer_file: ctx.buffer_path(zone).is_file(),
            results: ResultDirState::inspect(&ctx.result_dir(zone))?,
        })
    }

    pub fn collect(ctx: &PipelineContext) -> Result<Vec<Self>> {
        ctx.plan.iter().map(|zone| Self::inspect(ctx, zone)).collect()
    }

    pub fn indicator_decision(&self) -> IndicatorDecision {
        self.results.decision()
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let results = match self.results {
            ResultDirState::Absent => "none".to_string(),
            ResultDirState::Entries(n) => n.to_string(),
        };
        let next = match self.indicator_decision() {
            IndicatorDecision::Run => "run",
            IndicatorDecision::SkipComplete => "complete",
            IndicatorDecision::SkipInconsistent => "inconsistent",
        };
        write!(
            f,
            "{:<10} {:<60} converted={:<3} buffers={:<3} results={:<4} indicators={}",
            self.dataset.display_name(),
            self.directory,
            yes_no(self.converted),
            yes_no(self.buffer_file),
            results,
            next
        )
    }
}
