use crate::error::Result;
use crate::pipeline::stages::default_stages;
use crate::pipeline::{PipelineContext, RunSummary, Stage, StageName, StageReport};
use crate::utils::constants::RUN_SUMMARY_FILE;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{error, info};

/// Runs the selected stages in pipeline order. A stage whose durable state
/// already satisfies it is skipped unless the context forces it.
pub struct PipelineController {
    stages: Vec<Box<dyn Stage>>,
    profile: String,
}

impl PipelineController {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            stages: default_stages(),
            profile: profile.into(),
        }
    }

    pub fn with_stages(profile: impl Into<String>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            profile: profile.into(),
        }
    }

    pub fn summary_path(ctx: &PipelineContext) -> PathBuf {
        ctx.config.paths.results_output.join(RUN_SUMMARY_FILE)
    }

    /// Run `selected` stages, or every stage when `selected` is empty. The
    /// run summary is written whether or not a stage fails.
    pub fn run(&self, ctx: &mut PipelineContext, selected: &[StageName]) -> Result<RunSummary> {
        let mut summary = RunSummary::new(&self.profile, ctx.plan.len());
        let outcome = self.run_stages(ctx, selected, &mut summary);

        let path = Self::summary_path(ctx);
        summary.write(&path)?;
        info!("Run summary written to {}", path.display());

        outcome.map(|_| summary)
    }

    fn run_stages(&self, ctx: &mut PipelineContext, selected: &[StageName], summary: &mut RunSummary) -> Result<()> {
        for stage in &self.stages {
            let name = stage.name();
            if !selected.is_empty() && !selected.contains(&name) {
                continue;
            }

            if !ctx.force && stage.is_complete(ctx)? {
                let report = StageReport::skipped(name);
                info!("{}", report.summary());
                summary.stages.push(report);
                continue;
            }

            info!("Stage {} starting", name);
            let started_at = Utc::now();
            match stage.run(ctx) {
                Ok(report) => {
                    info!("{}", report.summary());
                    summary.stages.push(report);
                }
                Err(e) => {
                    error!("Stage {} failed: {}", name, e);
                    summary
                        .stages
                        .push(StageReport::failed(name, started_at, e.to_string()));
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
