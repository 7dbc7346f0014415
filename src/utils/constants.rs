/// EPSG identifiers of the default dataset coordinate systems
pub const EPSG_WGS84: u32 = 4326;
pub const EPSG_LAMBERT93: u32 = 2154;

/// File names
pub const REFERENCE_GEOMETRY_FILE: &str = "zone.geojson";
pub const BUFFER_FILE: &str = "station_buffer.geojson";
pub const LAND_COVER_RESULT_FILE: &str = "lcz.geojson";
pub const INDICATORS_RESULT_FILE: &str = "indicators.geojson";
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";
pub const GEOJSON_EXTENSION: &str = "geojson";

/// Buffer file property names written next to the composite identifier
pub const STATION_ID_PROPERTY: &str = "station_id";
pub const RADIUS_PROPERTY: &str = "radius";

/// A zone result directory holding this many files is complete
pub const EXPECTED_RESULT_FILES: usize = 2;

/// Geometry defaults
pub const DEFAULT_SEGMENTS_PER_QUADRANT: usize = 16;
pub const DEFAULT_RADII: [u32; 3] = [100, 300, 500];

/// Station table defaults
pub const DEFAULT_ID_COLUMN: &str = "SITE";
pub const DEFAULT_LON_COLUMN: &str = "LON";
pub const DEFAULT_LAT_COLUMN: &str = "LAT";
pub const DEFAULT_DELIMITER: char = ';';
pub const DEFAULT_DECIMAL: char = ',';

/// External tool defaults
pub const DEFAULT_CONVERSION_PROGRAM: &str = "qgis_process";
pub const DEFAULT_CONVERSION_ALGORITHM: &str = "GeoClimateTool:coolparkstool_process";
pub const DEFAULT_WORKFLOW_PROGRAM: &str = "groovy";
pub const DEFAULT_WORKFLOW_SCRIPT: &str = "LczForStationBuffer/src/main/groovy/Main.groovy";

/// Configuration layering
pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_PROFILE: &str = "default";
pub const PROFILE_ENV_VAR: &str = "STATION_LCZ_PROFILE";
pub const ENV_PREFIX: &str = "STATION_LCZ";
