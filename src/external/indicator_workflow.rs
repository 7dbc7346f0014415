use crate::config::IndicatorConfig;
use crate::error::Result;
use crate::external::process::run_streaming;
use crate::utils::ProgressReporter;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// The four positional arguments of the indicator workflow, in call order
pub struct WorkflowInvocation<'a> {
    pub buffer_file: &'a Path,
    pub result_dir: &'a Path,
    pub conversion_dir: &'a Path,
    pub id_column: &'a str,
}

/// Computes LCZ and urban canopy indicators for every buffer of a zone
pub trait IndicatorWorkflow {
    fn run(&mut self, invocation: &WorkflowInvocation<'_>, progress: &ProgressReporter) -> Result<()>;
}

/// Launches the workflow (by default a Groovy script) as a subprocess and
/// prints its output line by line while it runs
pub struct SubprocessWorkflow {
    program: String,
    args: Vec<String>,
}

impl SubprocessWorkflow {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    pub fn arguments(&self, invocation: &WorkflowInvocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        args.extend([
            invocation.buffer_file.as_os_str().to_owned(),
            invocation.result_dir.as_os_str().to_owned(),
            invocation.conversion_dir.as_os_str().to_owned(),
            OsString::from(invocation.id_column),
        ]);
        args
    }
}

impl IndicatorWorkflow for SubprocessWorkflow {
    fn run(&mut self, invocation: &WorkflowInvocation<'_>, progress: &ProgressReporter) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(self.arguments(invocation));

        run_streaming(&self.program, &mut command, |line| progress.println(line))
    }
}
