use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] geos::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid data format: {0}")]
    DataFormat(String),

    #[error("Duplicate station identifier {0} in station table")]
    DuplicateStation(i64),

    #[error("Zone {zone}: reference geometry not found at {}", path.display())]
    MissingReferenceGeometry { zone: String, path: PathBuf },

    #[error(
        "Zone {zone}: buffer file not found at {}. Run the `buffers` stage first",
        path.display()
    )]
    MissingBufferFile { zone: String, path: PathBuf },

    #[error("Zone {zone}: composite identifier {id} is produced by two station/radius pairs")]
    CompositeIdCollision { zone: String, id: i64 },

    #[error("{tool} could not be started: {source}")]
    ToolNotStarted {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not run (exit status: {}): {stderr}", status.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ExternalTool {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Zone {zone}: expected result file not found at {}", path.display())]
    MissingResultFile { zone: String, path: PathBuf },
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        PipelineError::DataFormat(message.into())
    }
}
