use crate::error::Result;
use crate::geometry::BoundingBox;
use crate::models::DatasetType;
use crate::utils::format_ordinate;
use geo::Polygon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Folder-naming key of a zone: `{min_y}_{min_x}_{max_y}_{max_x}` with every
/// ordinate in shortest round-trip form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneKey(String);

impl ZoneKey {
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        let key = bbox
            .location_ordinates()
            .iter()
            .map(|v| format_ordinate(*v))
            .collect::<Vec<_>>()
            .join("_");
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Buffer of the largest radius around one station, expressed in the
/// coordinate system of a dataset
#[derive(Debug, Clone)]
pub struct Zone {
    pub dataset: DatasetType,
    pub station_id: i64,
    pub epsg: u32,
    pub polygon: Polygon<f64>,
    pub bbox: BoundingBox,
    pub key: ZoneKey,
}

impl Zone {
    pub fn new(dataset: DatasetType, station_id: i64, epsg: u32, polygon: Polygon<f64>) -> Result<Self> {
        let bbox = BoundingBox::of_polygon(&polygon)?;
        let key = ZoneKey::from_bbox(&bbox);
        Ok(Self {
            dataset,
            station_id,
            epsg,
            polygon,
            bbox,
            key,
        })
    }

    /// `{dataset prefix}_{zone key}`, shared by the conversion output and
    /// the result directory of the zone
    pub fn directory_name(&self) -> String {
        format!("{}_{}", self.dataset.folder_prefix(), self.key)
    }

    pub fn conversion_dir(&self, geoclimate_root: &Path) -> PathBuf {
        geoclimate_root.join(self.directory_name())
    }

    pub fn result_dir(&self, results_root: &Path) -> PathBuf {
        results_root.join(self.directory_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (min_x, min_y),
                (min_x + size, min_y),
                (min_x + size, min_y + size),
                (min_x, min_y + size),
                (min_x, min_y),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_zone_key_format() {
        let bbox = BoundingBox::new(651_969.5, 6_861_535.25, 652_969.5, 6_862_535.25);
        assert_eq!(
            ZoneKey::from_bbox(&bbox).as_str(),
            "6861535.25_651969.5_6862535.25_652969.5"
        );
    }

    #[test]
    fn test_zone_key_keeps_exact_ordinates() {
        let bbox = BoundingBox::new(2.3456789012345, 48.81234567, 2.3591, 48.8213);
        let key = ZoneKey::from_bbox(&bbox);
        let ordinates: Vec<f64> = key.as_str().split('_').map(|p| p.parse().unwrap()).collect();
        assert_eq!(ordinates, bbox.location_ordinates().to_vec());
    }

    #[test]
    fn test_zone_key_negative_ordinates() {
        let bbox = BoundingBox::new(-0.1327, 51.5029, -0.1229, 51.5119);
        let key = ZoneKey::from_bbox(&bbox);
        assert_eq!(key.as_str(), "51.5029_-0.1327_51.5119_-0.1229");
    }

    #[test]
    fn test_zone_directories() {
        let zone = Zone::new(DatasetType::BdtopoV3, 1, 2154, square(100.0, 200.0, 10.0)).unwrap();
        assert_eq!(zone.directory_name(), "bdtopo_3_200.0_100.0_210.0_110.0");
        assert_eq!(
            zone.conversion_dir(Path::new("/data/geoclimate")),
            PathBuf::from("/data/geoclimate/bdtopo_3_200.0_100.0_210.0_110.0")
        );
        assert_eq!(
            zone.result_dir(Path::new("/data/results")),
            PathBuf::from("/data/results/bdtopo_3_200.0_100.0_210.0_110.0")
        );
    }
}
