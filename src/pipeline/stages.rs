use crate::error::{PipelineError, Result};
use crate::external::{ConversionRequest, WorkflowInvocation};
use crate::models::Zone;
use crate::pipeline::{PipelineContext, Stage, StageName, StageReport, ZoneOutcome};
use crate::processors::{BufferBuilder, BufferOutcome, ResultAggregator};
use crate::readers::read_layer;
use crate::utils::constants::EXPECTED_RESULT_FILES;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// State of a zone's result directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDirState {
    Absent,
    Entries(usize),
}

/// What the indicator stage does with a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorDecision {
    Run,
    SkipComplete,
    SkipInconsistent,
}

impl ResultDirState {
    pub fn inspect(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Ok(ResultDirState::Absent);
        }
        Ok(ResultDirState::Entries(fs::read_dir(dir)?.count()))
    }

    pub fn decision(&self) -> IndicatorDecision {
        match self {
            ResultDirState::Absent => IndicatorDecision::Run,
            ResultDirState::Entries(n) if *n == EXPECTED_RESULT_FILES => IndicatorDecision::SkipComplete,
            ResultDirState::Entries(1) => IndicatorDecision::SkipInconsistent,
            ResultDirState::Entries(_) => IndicatorDecision::Run,
        }
    }
}

/// The four stages in execution order
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ConvertStage),
        Box::new(BuffersStage),
        Box::new(IndicatorsStage),
        Box::new(AggregateStage),
    ]
}

pub struct ConvertStage;

impl ConvertStage {
    fn pending<'a>(ctx: &PipelineContext, zones: &'a [Zone]) -> Vec<&'a Zone> {
        zones
            .iter()
            .filter(|zone| !ctx.conversion_dir(zone).is_dir())
            .collect()
    }
}

impl Stage for ConvertStage {
    fn name(&self) -> StageName {
        StageName::Convert
    }

    fn is_complete(&self, ctx: &PipelineContext) -> Result<bool> {
        Ok(ctx.plan.iter().all(|zone| ctx.conversion_dir(zone).is_dir()))
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<StageReport> {
        let mut report = StageReport::started(self.name());
        let output_directory = ctx.config.paths.geoclimate_output.clone();
        fs::create_dir_all(&output_directory)?;

        for dataset in ctx.config.datasets.clone() {
            let zones = ctx.plan.zones(dataset.kind).to_vec();
            let pending = Self::pending(ctx, &zones);

            for zone in zones.iter().filter(|z| ctx.conversion_dir(z).is_dir()) {
                report.record(zone.directory_name(), ZoneOutcome::AlreadyConverted);
            }
            if pending.is_empty() {
                info!("{}: all {} zones already converted", dataset.kind, zones.len());
                continue;
            }

            info!(
                "{}: converting {} of {} zones",
                dataset.kind,
                pending.len(),
                zones.len()
            );
            let request = ConversionRequest {
                dataset: &dataset,
                bboxes: pending.iter().map(|zone| zone.bbox).collect(),
                output_directory: &output_directory,
            };
            let progress = ctx.progress(pending.len(), &format!("Converting {} zones", dataset.kind));
            ctx.conversion_tool.convert(&request, &progress)?;
            report.tool_calls += 1;
            progress.finish_with_message(&format!("{} conversion finished", dataset.kind));

            for zone in pending {
                if ctx.conversion_dir(zone).is_dir() {
                    report.record(zone.directory_name(), ZoneOutcome::Converted);
                } else {
                    warn!(
                        "{}: conversion finished without creating {}",
                        zone.directory_name(),
                        ctx.conversion_dir(zone).display()
                    );
                    report.record(zone.directory_name(), ZoneOutcome::NotConverted);
                }
            }
        }

        Ok(report.finish())
    }
}

pub struct BuffersStage;

impl Stage for BuffersStage {
    fn name(&self) -> StageName {
        StageName::Buffers
    }

    fn is_complete(&self, ctx: &PipelineContext) -> Result<bool> {
        Ok(ctx.plan.iter().all(|zone| ctx.buffer_path(zone).is_file()))
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<StageReport> {
        let mut report = StageReport::started(self.name());
        let builder = BufferBuilder::new(&ctx.config).with_overwrite(ctx.force);
        let progress = ctx.progress(ctx.plan.len(), "Building station buffers");

        for zone in ctx.plan.iter() {
            progress.set_message(&zone.directory_name());
            let outcome = match builder.build(zone, &ctx.stations, &ctx.conversion_dir(zone))? {
                BufferOutcome::Written { stations, features } => {
                    ZoneOutcome::BuffersWritten { stations, features }
                }
                BufferOutcome::AlreadyPresent => ZoneOutcome::BuffersPresent,
            };
            report.record(zone.directory_name(), outcome);
            progress.increment(1);
        }

        progress.finish_with_message("Station buffers ready");
        Ok(report.finish())
    }
}

pub struct IndicatorsStage;

impl IndicatorsStage {
    /// Identifier column the workflow keys its results by: the first
    /// property of the buffer layer
    fn identifier_column(ctx: &PipelineContext, buffer_file: &Path) -> Result<String> {
        let layer = read_layer(buffer_file)?;
        Ok(layer
            .identifier_column()
            .unwrap_or(ctx.config.stations.id_column.as_str())
            .to_string())
    }
}

impl Stage for IndicatorsStage {
    fn name(&self) -> StageName {
        StageName::Indicators
    }

    /// Every zone has its buffer file and a complete result directory.
    /// `--force` runs the stage but not the zones it would skip: a complete
    /// or inconsistent result directory has to be deleted to be recomputed.
    fn is_complete(&self, ctx: &PipelineContext) -> Result<bool> {
        for zone in ctx.plan.iter() {
            if !ctx.buffer_path(zone).is_file() {
                return Ok(false);
            }
            if ResultDirState::inspect(&ctx.result_dir(zone))?.decision() != IndicatorDecision::SkipComplete {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<StageReport> {
        let mut report = StageReport::started(self.name());
        let zones: Vec<Zone> = ctx.plan.iter().cloned().collect();
        let progress = ctx.progress(zones.len(), "Computing indicators");

        for zone in &zones {
            let name = zone.directory_name();
            progress.set_message(&name);

            let buffer_file = ctx.buffer_path(zone);
            if !buffer_file.is_file() {
                return Err(PipelineError::MissingBufferFile {
                    zone: name,
                    path: buffer_file,
                });
            }

            let result_dir = ctx.result_dir(zone);
            let state = ResultDirState::inspect(&result_dir)?;
            match state.decision() {
                IndicatorDecision::SkipComplete => {
                    debug!("{}: results complete", name);
                    report.record(name, ZoneOutcome::ResultsComplete);
                }
                IndicatorDecision::SkipInconsistent => {
                    warn!(
                        "{}: {} holds a single result file, state is inconsistent; \
                         delete the directory by hand to recompute this zone",
                        name,
                        result_dir.display()
                    );
                    report.record(name, ZoneOutcome::Inconsistent { files: 1 });
                }
                IndicatorDecision::Run => {
                    if state == ResultDirState::Absent {
                        fs::create_dir_all(&result_dir)?;
                    }
                    let id_column = Self::identifier_column(ctx, &buffer_file)?;
                    let conversion_dir = ctx.conversion_dir(zone);
                    let invocation = WorkflowInvocation {
                        buffer_file: &buffer_file,
                        result_dir: &result_dir,
                        conversion_dir: &conversion_dir,
                        id_column: &id_column,
                    };

                    info!("{}: running indicator workflow", name);
                    ctx.workflow.run(&invocation, &progress)?;
                    report.tool_calls += 1;
                    report.record(name, ZoneOutcome::WorkflowRun);
                }
            }
            progress.increment(1);
        }

        progress.finish_with_message("Indicators done");
        Ok(report.finish())
    }
}

pub struct AggregateStage;

impl Stage for AggregateStage {
    fn name(&self) -> StageName {
        StageName::Aggregate
    }

    /// Collation is cheap and its inputs may have changed
    fn is_complete(&self, _ctx: &PipelineContext) -> Result<bool> {
        Ok(false)
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<StageReport> {
        let mut report = StageReport::started(self.name());
        let aggregator = ResultAggregator::new(&ctx.config);
        report.outputs = aggregator.aggregate(&ctx.plan)?;
        Ok(report.finish())
    }
}
