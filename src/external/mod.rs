pub mod conversion_tool;
pub mod indicator_workflow;
pub mod process;

pub use conversion_tool::{ConversionRequest, ConversionTool, QgisProcessTool};
pub use indicator_workflow::{IndicatorWorkflow, SubprocessWorkflow, WorkflowInvocation};
pub use process::run_streaming;
