use crate::utils::constants::{EPSG_LAMBERT93, EPSG_WGS84};
use serde::{Deserialize, Serialize};

/// Raw land-cover source the conversion tool turns into standard inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
    /// OpenStreetMap, fetched by the conversion tool itself
    Osm,
    /// IGN BD TOPO version 3, read from a local directory
    BdtopoV3,
}

impl DatasetType {
    /// Coordinate system the zone bounding boxes are expressed in when they
    /// are handed to the conversion tool
    pub fn default_epsg(&self) -> u32 {
        match self {
            DatasetType::Osm => EPSG_WGS84,
            DatasetType::BdtopoV3 => EPSG_LAMBERT93,
        }
    }

    /// Prefix of the per-zone conversion output directories
    pub fn folder_prefix(&self) -> &'static str {
        match self {
            DatasetType::Osm => "osm",
            DatasetType::BdtopoV3 => "bdtopo_3",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DatasetType::Osm => "OSM",
            DatasetType::BdtopoV3 => "BDTOPO_V3",
        }
    }

    /// Position of the dataset in the conversion tool's dataset list
    pub fn default_selector(&self) -> u32 {
        match self {
            DatasetType::Osm => 0,
            DatasetType::BdtopoV3 => 1,
        }
    }

    /// Whether the conversion tool needs a raw-data directory
    pub fn requires_input_directory(&self) -> bool {
        match self {
            DatasetType::Osm => false,
            DatasetType::BdtopoV3 => true,
        }
    }
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
