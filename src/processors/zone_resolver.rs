use crate::config::{DatasetConfig, PipelineConfig, StationTableConfig};
use crate::error::Result;
use crate::geometry::{buffer_point, Transformer};
use crate::models::{BufferRadii, DatasetType, Layer, ProjectedStation, Station, Zone};
use crate::utils::constants::EPSG_WGS84;
use crate::writers::write_layer;
use geojson::{Feature, Geometry, JsonObject, Value};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Zones of every configured dataset, in station order
#[derive(Debug, Clone, Default)]
pub struct ZonePlan {
    zones: BTreeMap<DatasetType, Vec<Zone>>,
}

impl ZonePlan {
    pub fn zones(&self, dataset: DatasetType) -> &[Zone] {
        self.zones.get(&dataset).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn datasets(&self) -> impl Iterator<Item = DatasetType> + '_ {
        self.zones.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Projects stations and derives one zone per station and dataset
pub struct ZoneResolver {
    working_epsg: u32,
    radii: BufferRadii,
    segments_per_quadrant: usize,
}

impl ZoneResolver {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            working_epsg: config.buffers.working_epsg,
            radii: config.buffers.radii.clone(),
            segments_per_quadrant: config.buffers.segments_per_quadrant,
        }
    }

    pub fn working_epsg(&self) -> u32 {
        self.working_epsg
    }

    /// Reproject station coordinates into the working coordinate system
    pub fn project_stations(&self, stations: &[Station]) -> Result<Vec<ProjectedStation>> {
        let transformer = Transformer::new(EPSG_WGS84, self.working_epsg)?;
        stations
            .iter()
            .map(|station| {
                Ok(ProjectedStation {
                    point: transformer.point(station.geographic_point())?,
                    station: station.clone(),
                })
            })
            .collect()
    }

    /// One zone per station (buffer of the largest radius) in the dataset's
    /// coordinate system. Stations sharing a location share a zone.
    pub fn zones_for(&self, dataset: &DatasetConfig, stations: &[ProjectedStation]) -> Result<Vec<Zone>> {
        let transformer = Transformer::new(self.working_epsg, dataset.epsg())?;
        let mut zones: Vec<Zone> = Vec::with_capacity(stations.len());
        let mut keys = HashSet::new();

        for projected in stations {
            let buffer = buffer_point(
                projected.point,
                self.radii.max() as f64,
                self.segments_per_quadrant,
            )?;
            let polygon = transformer.polygon(&buffer)?;
            let zone = Zone::new(dataset.kind, projected.id(), dataset.epsg(), polygon)?;

            if keys.insert(zone.key.clone()) {
                zones.push(zone);
            } else {
                debug!(
                    "Station {} shares zone {} with a previous station",
                    projected.id(),
                    zone.key
                );
            }
        }

        Ok(zones)
    }

    pub fn resolve(&self, datasets: &[DatasetConfig], stations: &[ProjectedStation]) -> Result<ZonePlan> {
        let mut plan = ZonePlan::default();
        for dataset in datasets {
            let zones = self.zones_for(dataset, stations)?;
            info!(
                "{}: {} zones in EPSG:{}",
                dataset.kind,
                zones.len(),
                dataset.epsg()
            );
            plan.zones.insert(dataset.kind, zones);
        }
        Ok(plan)
    }

    /// Persist stations as a spatial layer in the working coordinate system.
    /// Nothing downstream reads it back.
    pub fn persist_stations(
        &self,
        path: &Path,
        table: &StationTableConfig,
        stations: &[ProjectedStation],
    ) -> Result<()> {
        let features = stations
            .iter()
            .map(|projected| {
                let station = &projected.station;
                let mut props = JsonObject::new();
                props.insert(table.id_column.clone(), json!(station.id));
                props.insert(table.lon_column.clone(), json!(station.longitude));
                props.insert(table.lat_column.clone(), json!(station.latitude));
                for (key, value) in &station.attributes {
                    props.insert(key.clone(), json!(value));
                }

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::from(&projected.point))),
                    id: None,
                    properties: Some(props),
                    foreign_members: None,
                }
            })
            .collect();

        write_layer(path, &Layer::with_features(self.working_epsg, features))?;
        debug!("Station layer written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::read_layer;
    use geo::Intersects;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
        [stations]
        path = "stations.csv"
        [buffers]
        radii = [100, 300, 500]
        [[datasets]]
        kind = "osm"
        [[datasets]]
        kind = "bdtopo_v3"
        input_directory = "/data/bdtopo"
        [paths]
        geoclimate_output = "gc"
        results_output = "res"
    "#;

    fn paris_stations() -> Vec<Station> {
        vec![
            Station::new(1, 2.3375, 48.8217),
            Station::new(2, 2.3561, 48.8464),
            Station::new(3, 2.2950, 48.8738),
        ]
    }

    #[test]
    fn test_one_zone_per_station_and_dataset() -> Result<()> {
        let config = PipelineConfig::from_toml_str(CONFIG)?;
        let resolver = ZoneResolver::new(&config);
        let stations = resolver.project_stations(&paris_stations())?;
        let plan = resolver.resolve(&config.datasets, &stations)?;

        assert_eq!(plan.len(), 6);
        assert_eq!(plan.zones(DatasetType::Osm).len(), 3);
        assert_eq!(plan.zones(DatasetType::BdtopoV3).len(), 3);

        let l93 = &plan.zones(DatasetType::BdtopoV3)[0];
        assert_eq!(l93.epsg, 2154);
        assert!((l93.bbox.max_x - l93.bbox.min_x - 1000.0).abs() < 1e-6);
        assert!(l93.polygon.intersects(&stations[0].point));

        let osm = &plan.zones(DatasetType::Osm)[0];
        assert_eq!(osm.epsg, 4326);
        assert!(osm.bbox.min_x < 2.3375 && 2.3375 < osm.bbox.max_x);
        assert!(osm.bbox.min_y < 48.8217 && 48.8217 < osm.bbox.max_y);
        Ok(())
    }

    #[test]
    fn test_zone_keys_are_deterministic_and_distinct() -> Result<()> {
        let config = PipelineConfig::from_toml_str(CONFIG)?;
        let resolver = ZoneResolver::new(&config);
        let stations = resolver.project_stations(&paris_stations())?;

        let first = resolver.resolve(&config.datasets, &stations)?;
        let second = resolver.resolve(&config.datasets, &stations)?;

        let keys = |plan: &ZonePlan| plan.iter().map(|z| z.directory_name()).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));

        let unique: HashSet<_> = keys(&first).into_iter().collect();
        assert_eq!(unique.len(), 6);
        Ok(())
    }

    #[test]
    fn test_colocated_stations_share_a_zone() -> Result<()> {
        let config = PipelineConfig::from_toml_str(CONFIG)?;
        let resolver = ZoneResolver::new(&config);
        let stations = resolver.project_stations(&[
            Station::new(1, 2.3375, 48.8217),
            Station::new(2, 2.3375, 48.8217),
        ])?;

        let zones = resolver.zones_for(&config.datasets[1], &stations)?;
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].station_id, 1);
        Ok(())
    }

    #[test]
    fn test_persist_stations() -> Result<()> {
        let config = PipelineConfig::from_toml_str(CONFIG)?;
        let resolver = ZoneResolver::new(&config);
        let stations = resolver.project_stations(&[Station::new(1, 2.3375, 48.8217)
            .with_attributes(vec![("NAME".to_string(), "Montsouris".to_string())])])?;

        let dir = TempDir::new()?;
        let path = dir.path().join("stations.geojson");
        resolver.persist_stations(&path, &config.stations, &stations)?;

        let layer = read_layer(&path)?;
        assert_eq!(layer.epsg, 2154);
        let props = layer.features[0].properties.as_ref().unwrap();
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["SITE", "LON", "LAT", "NAME"]);
        assert_eq!(props["NAME"], json!("Montsouris"));
        Ok(())
    }
}
