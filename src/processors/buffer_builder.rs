use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::geometry::{buffer_point, Transformer};
use crate::models::{composite_id, BufferRadii, Layer, ProjectedStation, Zone};
use crate::readers::read_layer;
use crate::utils::constants::{EPSG_WGS84, RADIUS_PROPERTY, STATION_ID_PROPERTY};
use crate::writers::write_layer;
use geo::Intersects;
use geojson::{Feature, Geometry, JsonObject, Value};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferOutcome {
    Written { stations: usize, features: usize },
    AlreadyPresent,
}

/// Writes, for one zone, the buffers of every covered station at every
/// radius into a single layer keyed by `station_id + radius`
pub struct BufferBuilder {
    radii: BufferRadii,
    segments_per_quadrant: usize,
    working_epsg: u32,
    id_column: String,
    reference_geometry_file: String,
    buffer_file: String,
    overwrite: bool,
}

impl BufferBuilder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            radii: config.buffers.radii.clone(),
            segments_per_quadrant: config.buffers.segments_per_quadrant,
            working_epsg: config.buffers.working_epsg,
            id_column: config.stations.id_column.clone(),
            reference_geometry_file: config.indicators.reference_geometry_file.clone(),
            buffer_file: config.indicators.buffer_file.clone(),
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn buffer_path(&self, conversion_dir: &Path) -> PathBuf {
        conversion_dir.join(&self.buffer_file)
    }

    pub fn reference_path(&self, conversion_dir: &Path) -> PathBuf {
        conversion_dir.join(&self.reference_geometry_file)
    }

    /// Coordinate system the conversion tool wrote the zone in
    pub fn native_epsg(&self, zone: &Zone, conversion_dir: &Path) -> Result<u32> {
        let path = self.reference_path(conversion_dir);
        if !path.is_file() {
            return Err(PipelineError::MissingReferenceGeometry {
                zone: zone.directory_name(),
                path,
            });
        }
        Ok(read_layer(&path)?.epsg)
    }

    pub fn build(&self, zone: &Zone, stations: &[ProjectedStation], conversion_dir: &Path) -> Result<BufferOutcome> {
        let path = self.buffer_path(conversion_dir);
        let native_epsg = self.native_epsg(zone, conversion_dir)?;

        if path.is_file() && !self.overwrite {
            debug!("{}: buffer file already present", zone.directory_name());
            return Ok(BufferOutcome::AlreadyPresent);
        }

        let selected = self.covered_stations(zone, stations, native_epsg)?;
        let layer = self.build_layer(zone, &selected, native_epsg)?;
        let features = layer.len();
        write_layer(&path, &layer)?;

        debug!(
            "{}: {} stations x {} radii written to {}",
            zone.directory_name(),
            selected.len(),
            self.radii.len(),
            path.display()
        );
        Ok(BufferOutcome::Written {
            stations: selected.len(),
            features,
        })
    }

    /// Stations whose point falls inside or on the boundary of the zone,
    /// compared in the zone's native coordinate system
    pub fn covered_stations<'a>(
        &self,
        zone: &Zone,
        stations: &'a [ProjectedStation],
        native_epsg: u32,
    ) -> Result<Vec<&'a ProjectedStation>> {
        let zone_polygon = Transformer::new(zone.epsg, native_epsg)?.polygon(&zone.polygon)?;
        let to_native = Transformer::new(self.working_epsg, native_epsg)?;

        let mut covered = Vec::new();
        for station in stations {
            if zone_polygon.intersects(&to_native.point(station.point)?) {
                covered.push(station);
            }
        }
        Ok(covered)
    }

    /// All radii of all selected stations, radius-major in ascending radius
    /// order
    pub fn build_layer(&self, zone: &Zone, selected: &[&ProjectedStation], native_epsg: u32) -> Result<Layer> {
        // Distances are only meaningful in a projected system
        let metric_epsg = if native_epsg == EPSG_WGS84 {
            self.working_epsg
        } else {
            native_epsg
        };
        let to_metric = Transformer::new(self.working_epsg, metric_epsg)?;
        let to_native = Transformer::new(metric_epsg, native_epsg)?;

        let mut ids = HashSet::new();
        let mut layer = Layer::new(native_epsg);

        for radius in self.radii.iter() {
            for station in selected {
                let id = composite_id(station.id(), radius).ok_or_else(|| {
                    PipelineError::data_format(format!(
                        "Zone {}: station identifier {} plus radius {} does not fit in a 64-bit identifier",
                        zone.directory_name(),
                        station.id(),
                        radius
                    ))
                })?;
                if !ids.insert(id) {
                    return Err(PipelineError::CompositeIdCollision {
                        zone: zone.directory_name(),
                        id,
                    });
                }

                let center = to_metric.point(station.point)?;
                let buffer = buffer_point(center, radius as f64, self.segments_per_quadrant)?;
                let polygon = to_native.polygon(&buffer)?;

                let mut props = JsonObject::new();
                props.insert(self.id_column.clone(), json!(id));
                props.insert(STATION_ID_PROPERTY.to_string(), json!(station.id()));
                props.insert(RADIUS_PROPERTY.to_string(), json!(radius));

                layer.features.push(Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::from(&polygon))),
                    id: None,
                    properties: Some(props),
                    foreign_members: None,
                });
            }
        }

        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatasetType, Station};
    use crate::processors::ZoneResolver;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
        [stations]
        path = "stations.csv"
        [buffers]
        radii = [100, 300, 500]
        [[datasets]]
        kind = "bdtopo_v3"
        input_directory = "/data/bdtopo"
        [paths]
        geoclimate_output = "gc"
        results_output = "res"
    "#;

    fn write_reference(dir: &Path, epsg: u32) {
        fs::create_dir_all(dir).unwrap();
        write_layer(&dir.join("zone.geojson"), &Layer::new(epsg)).unwrap();
    }

    fn setup(stations: &[Station]) -> (PipelineConfig, Vec<ProjectedStation>, Vec<Zone>) {
        let config = PipelineConfig::from_toml_str(CONFIG).unwrap();
        let resolver = ZoneResolver::new(&config);
        let projected = resolver.project_stations(stations).unwrap();
        let zones = resolver.zones_for(&config.datasets[0], &projected).unwrap();
        (config, projected, zones)
    }

    fn ids(layer: &Layer, column: &str) -> Vec<i64> {
        layer
            .features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()[column].as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_three_isolated_stations() -> Result<()> {
        let stations = vec![
            Station::new(1, 2.3375, 48.8217),
            Station::new(2, 2.3561, 48.8464),
            Station::new(3, 2.2950, 48.8738),
        ];
        let (config, projected, zones) = setup(&stations);
        let builder = BufferBuilder::new(&config);
        let dir = TempDir::new()?;

        for zone in &zones {
            let conversion_dir = zone.conversion_dir(dir.path());
            write_reference(&conversion_dir, 2154);

            let outcome = builder.build(zone, &projected, &conversion_dir)?;
            assert_eq!(outcome, BufferOutcome::Written { stations: 1, features: 3 });

            let layer = read_layer(&builder.buffer_path(&conversion_dir))?;
            let s = zone.station_id;
            assert_eq!(ids(&layer, "SITE"), vec![s + 100, s + 300, s + 500]);
            assert_eq!(layer.identifier_column(), Some("SITE"));
        }
        Ok(())
    }

    #[test]
    fn test_nearby_station_is_included() -> Result<()> {
        // Second station ~150 m east of the first one
        let stations = vec![
            Station::new(10, 2.3375, 48.8217),
            Station::new(20, 2.3395, 48.8217),
        ];
        let (config, projected, zones) = setup(&stations);
        let builder = BufferBuilder::new(&config);

        let selected = builder.covered_stations(&zones[0], &projected, 2154)?;
        assert_eq!(selected.len(), 2);

        let layer = builder.build_layer(&zones[0], &selected, 2154)?;
        assert_eq!(layer.len(), 6);
        assert_eq!(ids(&layer, "SITE"), vec![110, 120, 310, 320, 510, 520]);
        assert_eq!(ids(&layer, STATION_ID_PROPERTY), vec![10, 20, 10, 20, 10, 20]);
        assert_eq!(ids(&layer, RADIUS_PROPERTY), vec![100, 100, 300, 300, 500, 500]);
        Ok(())
    }

    #[test]
    fn test_composite_collision_is_rejected() -> Result<()> {
        // 100 + 300 == 300 + 100
        let stations = vec![
            Station::new(100, 2.3375, 48.8217),
            Station::new(300, 2.3380, 48.8217),
        ];
        let (config, projected, zones) = setup(&stations);
        let builder = BufferBuilder::new(&config);
        let selected = builder.covered_stations(&zones[0], &projected, 2154)?;

        let err = builder.build_layer(&zones[0], &selected, 2154).unwrap_err();
        assert!(matches!(err, PipelineError::CompositeIdCollision { id: 400, .. }));
        Ok(())
    }

    #[test]
    fn test_composite_overflow_is_rejected() -> Result<()> {
        let stations = vec![Station::new(i64::MAX - 50, 2.3375, 48.8217)];
        let (config, projected, zones) = setup(&stations);
        let builder = BufferBuilder::new(&config);
        let selected = builder.covered_stations(&zones[0], &projected, 2154)?;
        assert_eq!(selected.len(), 1);

        let err = builder.build_layer(&zones[0], &selected, 2154).unwrap_err();
        assert!(matches!(err, PipelineError::DataFormat(_)));
        Ok(())
    }

    #[test]
    fn test_native_crs_comes_from_reference_geometry() -> Result<()> {
        let (config, projected, zones) = setup(&[Station::new(1, 2.3375, 48.8217)]);
        let builder = BufferBuilder::new(&config);
        let dir = TempDir::new()?;
        let conversion_dir = zones[0].conversion_dir(dir.path());
        write_reference(&conversion_dir, 32631);

        builder.build(&zones[0], &projected, &conversion_dir)?;
        let layer = read_layer(&builder.buffer_path(&conversion_dir))?;
        assert_eq!(layer.epsg, 32631);

        let geometry = layer.features[0].geometry.as_ref().unwrap();
        let polygon: geo::Polygon<f64> = geometry.value.clone().try_into().unwrap();
        let rect = geo::BoundingRect::bounding_rect(&polygon).unwrap();
        // UTM 31N eastings around Paris are ~450 km
        assert!(rect.min().x > 440_000.0 && rect.max().x < 460_000.0);
        assert!((rect.max().x - rect.min().x - 200.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_missing_reference_geometry() {
        let (config, projected, zones) = setup(&[Station::new(1, 2.3375, 48.8217)]);
        let builder = BufferBuilder::new(&config);
        let dir = TempDir::new().unwrap();

        let err = builder
            .build(&zones[0], &projected, &zones[0].conversion_dir(dir.path()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingReferenceGeometry { .. }));
    }

    #[test]
    fn test_existing_buffer_file_kept_unless_overwrite() -> Result<()> {
        let (config, projected, zones) = setup(&[Station::new(1, 2.3375, 48.8217)]);
        let dir = TempDir::new()?;
        let conversion_dir = zones[0].conversion_dir(dir.path());
        write_reference(&conversion_dir, 2154);

        let builder = BufferBuilder::new(&config);
        builder.build(&zones[0], &projected, &conversion_dir)?;
        assert_eq!(
            builder.build(&zones[0], &projected, &conversion_dir)?,
            BufferOutcome::AlreadyPresent
        );

        let builder = BufferBuilder::new(&config).with_overwrite(true);
        assert!(matches!(
            builder.build(&zones[0], &projected, &conversion_dir)?,
            BufferOutcome::Written { .. }
        ));
        assert_eq!(zones[0].dataset, DatasetType::BdtopoV3);
        Ok(())
    }
}
