use crate::config::{ConversionConfig, DatasetConfig};
use crate::error::Result;
use crate::external::process::run_streaming;
use crate::geometry::BoundingBox;
use crate::utils::{format_ordinate, ProgressReporter};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// One batch of zones of a single dataset to convert
pub struct ConversionRequest<'a> {
    pub dataset: &'a DatasetConfig,
    pub bboxes: Vec<BoundingBox>,
    pub output_directory: &'a Path,
}

impl ConversionRequest<'_> {
    /// `[min_y, min_x, max_y, max_x], [...]`, the list syntax the conversion
    /// tool parses its LOCATION parameter with
    pub fn location(&self) -> String {
        self.bboxes
            .iter()
            .map(|bbox| {
                let ordinates = bbox
                    .location_ordinates()
                    .iter()
                    .map(|v| format_ordinate(*v))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}]", ordinates)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Turns raw land-cover data into standardized urban-morphology layers,
/// writing one directory per zone under the output directory
pub trait ConversionTool {
    fn convert(&mut self, request: &ConversionRequest<'_>, progress: &ProgressReporter) -> Result<()>;
}

/// Runs the conversion algorithm through the `qgis_process` command line
pub struct QgisProcessTool {
    config: ConversionConfig,
}

impl QgisProcessTool {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub fn arguments(&self, request: &ConversionRequest<'_>) -> Vec<OsString> {
        let flag = |name: &str, value: bool| OsString::from(format!("{}={}", name, value));
        let c = &self.config;

        let mut args: Vec<OsString> = vec![
            "run".into(),
            c.algorithm.clone().into(),
            "--".into(),
            format!("INPUT_DATASET={}", request.dataset.selector()).into(),
        ];

        if let Some(dir) = &request.dataset.input_directory {
            let mut arg = OsString::from("INPUT_DIRECTORY=");
            arg.push(dir);
            args.push(arg);
        }

        args.extend([
            flag("ESTIMATED_HEIGHT", c.estimated_height),
            flag("LCZ_CALC", c.lcz),
            flag("UTRF_CALC", c.utrf),
            flag("WRF_INPUTS", c.wrf_inputs),
            flag("TEB_INPUTS", c.teb_inputs),
            flag("SVF_SIMPLIFIED", c.svf_simplified),
        ]);
        args.push(format!("LOCATION={}", request.location()).into());

        let mut output = OsString::from("OUTPUT_DIRECTORY=");
        output.push(request.output_directory);
        args.push(output);

        args.extend([
            flag("LOAD_INPUTS", c.load_inputs),
            flag("LOAD_OUTPUTS", c.load_outputs),
            format!("STYLE_LANGUAGE={}", c.style_language).into(),
        ]);

        args
    }
}

impl ConversionTool for QgisProcessTool {
    fn convert(&mut self, request: &ConversionRequest<'_>, progress: &ProgressReporter) -> Result<()> {
        let mut command = Command::new(&self.config.program);
        command.args(self.arguments(request));

        run_streaming(&self.config.algorithm, &mut command, |line| {
            progress.println(line)
        })
    }
}
