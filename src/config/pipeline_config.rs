use crate::error::{PipelineError, Result};
use crate::geometry::supports_epsg;
use crate::models::{BufferRadii, DatasetType, ResultKind};
use crate::utils::constants::*;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

/// Everything the pipeline needs, loaded and validated once at startup
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    #[validate(nested)]
    pub stations: StationTableConfig,

    #[validate(nested)]
    pub buffers: BufferConfig,

    #[validate(length(min = 1, message = "at least one dataset must be configured"))]
    pub datasets: Vec<DatasetConfig>,

    pub paths: PathsConfig,

    #[serde(default)]
    #[validate(nested)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    #[validate(nested)]
    pub indicators: IndicatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationTableConfig {
    pub path: PathBuf,

    #[serde(default = "default_id_column")]
    #[validate(length(min = 1))]
    pub id_column: String,

    #[serde(default = "default_lon_column")]
    #[validate(length(min = 1))]
    pub lon_column: String,

    #[serde(default = "default_lat_column")]
    #[validate(length(min = 1))]
    pub lat_column: String,

    #[serde(default = "default_delimiter")]
    #[validate(length(equal = 1))]
    pub delimiter: String,

    #[serde(default = "default_decimal")]
    #[validate(length(equal = 1))]
    pub decimal: String,

    /// WHATWG label of the table encoding ("utf-8", "windows-1252", ...)
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl StationTableConfig {
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b';')
    }

    pub fn decimal_char(&self) -> char {
        self.decimal.chars().next().unwrap_or(DEFAULT_DECIMAL)
    }

    /// Where the stations are persisted as a spatial layer
    pub fn cache_path(&self) -> PathBuf {
        self.path.with_extension(GEOJSON_EXTENSION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BufferConfig {
    #[serde(default)]
    pub radii: BufferRadii,

    /// Projected system stations are buffered in
    #[serde(default = "default_working_epsg")]
    pub working_epsg: u32,

    #[serde(default = "default_segments")]
    #[validate(range(min = 1, max = 1024))]
    pub segments_per_quadrant: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub kind: DatasetType,

    /// Overrides the dataset's default coordinate system
    #[serde(default)]
    pub epsg: Option<u32>,

    /// Raw data location, required for BD TOPO
    #[serde(default)]
    pub input_directory: Option<PathBuf>,

    /// Overrides the dataset's index in the conversion tool
    #[serde(default)]
    pub selector: Option<u32>,
}

impl DatasetConfig {
    pub fn new(kind: DatasetType) -> Self {
        Self {
            kind,
            epsg: None,
            input_directory: None,
            selector: None,
        }
    }

    pub fn epsg(&self) -> u32 {
        self.epsg.unwrap_or_else(|| self.kind.default_epsg())
    }

    pub fn selector(&self) -> u32 {
        self.selector.unwrap_or_else(|| self.kind.default_selector())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the per-zone conversion output directories
    pub geoclimate_output: PathBuf,

    /// Root of the per-zone result directories and consolidated files
    pub results_output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConversionConfig {
    #[validate(length(min = 1))]
    pub program: String,

    #[validate(length(min = 1))]
    pub algorithm: String,

    pub estimated_height: bool,
    pub lcz: bool,
    pub utrf: bool,
    pub wrf_inputs: bool,
    pub teb_inputs: bool,
    pub svf_simplified: bool,
    pub load_inputs: bool,
    pub load_outputs: bool,
    pub style_language: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_CONVERSION_PROGRAM.to_string(),
            algorithm: DEFAULT_CONVERSION_ALGORITHM.to_string(),
            estimated_height: true,
            lcz: true,
            utrf: false,
            wrf_inputs: false,
            teb_inputs: false,
            svf_simplified: true,
            load_inputs: false,
            load_outputs: false,
            style_language: 0,
        }
    }
}

/// How the aggregator maps composite identifiers back to radii
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusRecovery {
    /// Look the composite up in the zone's buffer file: `composite - station == radius`
    Offset,
    /// Subtract the smallest composite of the result file; assumes a single
    /// station per zone file
    Minimum,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IndicatorConfig {
    #[validate(length(min = 1))]
    pub program: String,

    /// Arguments placed before the four positional workflow arguments
    pub args: Vec<String>,

    #[validate(length(min = 1))]
    pub reference_geometry_file: String,

    #[validate(length(min = 1))]
    pub buffer_file: String,

    #[validate(length(min = 1))]
    pub land_cover_file: String,

    #[validate(length(min = 1))]
    pub indicators_file: String,

    pub radius_recovery: RadiusRecovery,
}

impl IndicatorConfig {
    pub fn result_file(&self, kind: ResultKind) -> &str {
        match kind {
            ResultKind::LandCover => &self.land_cover_file,
            ResultKind::Indicators => &self.indicators_file,
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_WORKFLOW_PROGRAM.to_string(),
            args: vec![DEFAULT_WORKFLOW_SCRIPT.to_string()],
            reference_geometry_file: REFERENCE_GEOMETRY_FILE.to_string(),
            buffer_file: BUFFER_FILE.to_string(),
            land_cover_file: LAND_COVER_RESULT_FILE.to_string(),
            indicators_file: INDICATORS_RESULT_FILE.to_string(),
            radius_recovery: RadiusRecovery::Offset,
        }
    }
}

impl PipelineConfig {
    /// Layer `default.toml`, then `<profile>.toml`, then `STATION_LCZ__*`
    /// environment variables
    pub fn load(config_dir: &Path, profile: &str) -> Result<Self> {
        let default_path = config_dir.join(format!("{}.toml", DEFAULT_PROFILE));
        if !default_path.exists() {
            return Err(PipelineError::config(format!(
                "Configuration file not found: {}",
                default_path.display()
            )));
        }

        let mut builder = Config::builder().add_source(File::from(default_path.as_path()));

        if profile != DEFAULT_PROFILE {
            let profile_path = config_dir.join(format!("{}.toml", profile));
            if !profile_path.exists() {
                return Err(PipelineError::config(format!(
                    "Unknown profile '{}': {} does not exist",
                    profile,
                    profile_path.display()
                )));
            }
            builder = builder.add_source(File::from(profile_path.as_path()));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        debug!("Loaded configuration profile '{}' from {}", profile, config_dir.display());
        Self::from_settings(settings)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self> {
        let config: PipelineConfig = settings.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Field-level validation plus the cross-field rules
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        let stations = &self.stations;
        if !stations.delimiter.is_ascii() {
            return Err(PipelineError::config(format!(
                "Column separator must be an ASCII character, got '{}'",
                stations.delimiter
            )));
        }
        if stations.delimiter == stations.decimal {
            return Err(PipelineError::config(format!(
                "Column separator and decimal separator are both '{}'",
                stations.delimiter
            )));
        }
        if encoding_rs::Encoding::for_label(stations.encoding.as_bytes()).is_none() {
            return Err(PipelineError::config(format!(
                "Unknown station table encoding '{}'",
                stations.encoding
            )));
        }

        if !supports_epsg(self.buffers.working_epsg) {
            return Err(PipelineError::config(format!(
                "Unsupported working coordinate system EPSG:{}",
                self.buffers.working_epsg
            )));
        }
        if self.buffers.working_epsg == EPSG_WGS84 {
            return Err(PipelineError::config(
                "The working coordinate system must be projected (metric), not EPSG:4326",
            ));
        }

        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.kind) {
                return Err(PipelineError::config(format!(
                    "Dataset {} is configured twice",
                    dataset.kind
                )));
            }
            if !supports_epsg(dataset.epsg()) {
                return Err(PipelineError::config(format!(
                    "Unsupported coordinate system EPSG:{} for dataset {}",
                    dataset.epsg(),
                    dataset.kind
                )));
            }
            if dataset.kind.requires_input_directory() && dataset.input_directory.is_none() {
                return Err(PipelineError::config(format!(
                    "Dataset {} needs an input_directory",
                    dataset.kind
                )));
            }
        }

        if self.indicators.land_cover_file == self.indicators.indicators_file {
            return Err(PipelineError::config(
                "Land-cover and indicator result files must have different names",
            ));
        }

        Ok(())
    }
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_lon_column() -> String {
    DEFAULT_LON_COLUMN.to_string()
}

fn default_lat_column() -> String {
    DEFAULT_LAT_COLUMN.to_string()
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_decimal() -> String {
    DEFAULT_DECIMAL.to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_working_epsg() -> u32 {
    EPSG_LAMBERT93
}

fn default_segments() -> usize {
    DEFAULT_SEGMENTS_PER_QUADRANT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
        [stations]
        path = "data/stations.csv"

        [buffers]
        radii = [100, 300, 500]

        [[datasets]]
        kind = "osm"

        [paths]
        geoclimate_output = "out/geoclimate"
        results_output = "out/results"
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = PipelineConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.stations.id_column, "SITE");
        assert_eq!(config.stations.delimiter_byte(), b';');
        assert_eq!(config.stations.decimal_char(), ',');
        assert_eq!(config.buffers.radii.max(), 500);
        assert_eq!(config.buffers.working_epsg, 2154);
        assert_eq!(config.datasets[0].epsg(), 4326);
        assert_eq!(config.conversion.program, "qgis_process");
        assert_eq!(config.indicators.radius_recovery, RadiusRecovery::Offset);
        assert_eq!(
            config.stations.cache_path(),
            PathBuf::from("data/stations.geojson")
        );
    }

    #[test]
    fn test_rejects_unsorted_radii() {
        let toml = MINIMAL.replace("[100, 300, 500]", "[500, 100]");
        assert!(PipelineConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_rejects_unsupported_crs() {
        let toml = MINIMAL.replace("kind = \"osm\"", "kind = \"osm\"\nepsg = 999999");
        let err = PipelineConfig::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_bdtopo_needs_input_directory() {
        let toml = MINIMAL.replace("kind = \"osm\"", "kind = \"bdtopo_v3\"");
        let err = PipelineConfig::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));

        let toml = MINIMAL.replace(
            "kind = \"osm\"",
            "kind = \"bdtopo_v3\"\ninput_directory = \"/data/bdtopo\"",
        );
        let config = PipelineConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.datasets[0].epsg(), 2154);
    }

    #[test]
    fn test_rejects_duplicate_dataset() {
        let toml = format!("{}\n[[datasets]]\nkind = \"osm\"\n", MINIMAL);
        assert!(PipelineConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_rejects_same_separators() {
        let toml = MINIMAL.replace(
            "path = \"data/stations.csv\"",
            "path = \"data/stations.csv\"\ndelimiter = \",\"",
        );
        assert!(PipelineConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_profile_overrides_default() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("default.toml"), MINIMAL)?;
        fs::write(
            dir.path().join("laptop.toml"),
            "[paths]\ngeoclimate_output = \"/tmp/gc\"\nresults_output = \"/tmp/res\"\n",
        )?;

        let config = PipelineConfig::load(dir.path(), "laptop")?;
        assert_eq!(config.paths.geoclimate_output, PathBuf::from("/tmp/gc"));
        assert_eq!(config.buffers.radii.as_slice(), &[100, 300, 500]);

        let config = PipelineConfig::load(dir.path(), "default")?;
        assert_eq!(
            config.paths.geoclimate_output,
            PathBuf::from("out/geoclimate")
        );
        Ok(())
    }

    #[test]
    fn test_unknown_profile() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("default.toml"), MINIMAL)?;

        let err = PipelineConfig::load(dir.path(), "cluster").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        Ok(())
    }
}
