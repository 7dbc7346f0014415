pub mod pipeline_config;

pub use pipeline_config::{
    BufferConfig, ConversionConfig, DatasetConfig, IndicatorConfig, PathsConfig, PipelineConfig,
    RadiusRecovery, StationTableConfig,
};
