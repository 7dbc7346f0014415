use crate::config::PipelineConfig;
use crate::error::Result;
use crate::external::{ConversionTool, IndicatorWorkflow, QgisProcessTool, SubprocessWorkflow};
use crate::models::{ProjectedStation, Zone};
use crate::processors::{ZonePlan, ZoneResolver};
use crate::readers::StationReader;
use crate::utils::ProgressReporter;
use std::path::PathBuf;
use tracing::info;

/// Everything a stage needs: the validated configuration, the stations and
/// zones resolved once at startup, and the two external tools
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub stations: Vec<ProjectedStation>,
    pub plan: ZonePlan,
    pub force: bool,
    pub quiet: bool,
    pub conversion_tool: Box<dyn ConversionTool>,
    pub workflow: Box<dyn IndicatorWorkflow>,
}

impl PipelineContext {
    /// Read the station table, persist the projected station layer and
    /// resolve the zones of every configured dataset
    pub fn prepare(
        config: PipelineConfig,
        conversion_tool: Box<dyn ConversionTool>,
        workflow: Box<dyn IndicatorWorkflow>,
    ) -> Result<Self> {
        let reader = StationReader::new(&config.stations)?;
        let stations = reader.read_stations(&config.stations.path)?;
        info!(
            "Loaded {} stations from {}",
            stations.len(),
            config.stations.path.display()
        );

        let resolver = ZoneResolver::new(&config);
        let projected = resolver.project_stations(&stations)?;
        resolver.persist_stations(&config.stations.cache_path(), &config.stations, &projected)?;
        let plan = resolver.resolve(&config.datasets, &projected)?;

        Ok(Self {
            config,
            stations: projected,
            plan,
            force: false,
            quiet: false,
            conversion_tool,
            workflow,
        })
    }

    /// Context wired to the real `qgis_process` and workflow subprocesses
    pub fn with_subprocess_tools(config: PipelineConfig) -> Result<Self> {
        let conversion = QgisProcessTool::new(config.conversion.clone());
        let workflow = SubprocessWorkflow::new(&config.indicators);
        Self::prepare(config, Box::new(conversion), Box::new(workflow))
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn progress(&self, total: usize, message: &str) -> ProgressReporter {
        ProgressReporter::new(total as u64, message, self.quiet)
    }

    pub fn conversion_dir(&self, zone: &Zone) -> PathBuf {
        zone.conversion_dir(&self.config.paths.geoclimate_output)
    }

    pub fn result_dir(&self, zone: &Zone) -> PathBuf {
        zone.result_dir(&self.config.paths.results_output)
    }

    pub fn buffer_path(&self, zone: &Zone) -> PathBuf {
        self.conversion_dir(zone).join(&self.config.indicators.buffer_file)
    }
}
