use crate::config::{IndicatorConfig, PipelineConfig, RadiusRecovery};
use crate::error::{PipelineError, Result};
use crate::geometry::Transformer;
use crate::models::{radius_of, BufferRadii, DatasetType, Layer, ResultKind, Zone};
use crate::processors::ZonePlan;
use crate::readers::read_layer;
use crate::utils::constants::{GEOJSON_EXTENSION, STATION_ID_PROPERTY};
use crate::writers::write_layer;
use geojson::feature::Id;
use geojson::{Feature, JsonObject, JsonValue};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One row of a zone result file mapped back to its station and radius
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredRow {
    pub station_id: i64,
    pub radius: u32,
    pub feature: Feature,
}

/// A consolidated file written by [`ResultAggregator::aggregate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedOutput {
    pub dataset: DatasetType,
    pub kind: ResultKind,
    pub radius: u32,
    pub path: PathBuf,
    pub rows: usize,
}

/// Regroups per-zone result rows by radius across all zones of a dataset
pub struct ResultAggregator {
    radii: BufferRadii,
    id_column: String,
    files: IndicatorConfig,
    geoclimate_root: PathBuf,
    results_root: PathBuf,
    dataset_epsg: HashMap<DatasetType, u32>,
}

impl ResultAggregator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            radii: config.buffers.radii.clone(),
            id_column: config.stations.id_column.clone(),
            files: config.indicators.clone(),
            geoclimate_root: config.paths.geoclimate_output.clone(),
            results_root: config.paths.results_output.clone(),
            dataset_epsg: config
                .datasets
                .iter()
                .map(|dataset| (dataset.kind, dataset.epsg()))
                .collect(),
        }
    }

    pub fn result_path(&self, zone: &Zone, kind: ResultKind) -> PathBuf {
        zone.result_dir(&self.results_root).join(self.files.result_file(kind))
    }

    /// `<results root>/<dataset prefix>_<kind>_<radius>.geojson`
    pub fn consolidated_path(&self, dataset: DatasetType, kind: ResultKind, radius: u32) -> PathBuf {
        self.results_root.join(format!(
            "{}_{}_{}.{}",
            dataset.folder_prefix(),
            kind.label(),
            radius,
            GEOJSON_EXTENSION
        ))
    }

    /// Consolidated files are written in the dataset's configured system
    fn target_epsg(&self, dataset: DatasetType) -> u32 {
        self.dataset_epsg
            .get(&dataset)
            .copied()
            .unwrap_or_else(|| dataset.default_epsg())
    }

    /// Every expected result file must exist before anything is written
    pub fn check_complete(&self, plan: &ZonePlan) -> Result<()> {
        for zone in plan.iter() {
            for kind in ResultKind::ALL {
                let path = self.result_path(zone, kind);
                if !path.is_file() {
                    return Err(PipelineError::MissingResultFile {
                        zone: zone.directory_name(),
                        path,
                    });
                }
            }
        }
        Ok(())
    }

    /// A station covered by several zones keeps the row of the first zone in
    /// plan order
    pub fn aggregate(&self, plan: &ZonePlan) -> Result<Vec<ConsolidatedOutput>> {
        self.check_complete(plan)?;

        let mut buckets: BTreeMap<(DatasetType, ResultKind, u32), Vec<Feature>> = BTreeMap::new();
        for dataset in plan.datasets() {
            let target_epsg = self.target_epsg(dataset);
            let mut seen = HashSet::new();

            for zone in plan.zones(dataset) {
                for kind in ResultKind::ALL {
                    for row in self.recover_zone(zone, kind, target_epsg)? {
                        if !seen.insert((kind, row.station_id, row.radius)) {
                            debug!(
                                "{}: station {} r={} already collected from another zone",
                                zone.directory_name(),
                                row.station_id,
                                row.radius
                            );
                            continue;
                        }
                        buckets
                            .entry((dataset, kind, row.radius))
                            .or_default()
                            .push(row.feature);
                    }
                }
            }
        }

        let mut outputs = Vec::new();
        for dataset in plan.datasets() {
            let target_epsg = self.target_epsg(dataset);

            for kind in ResultKind::ALL {
                for radius in self.radii.iter() {
                    let features = buckets.remove(&(dataset, kind, radius)).unwrap_or_default();
                    let rows = features.len();
                    let path = self.consolidated_path(dataset, kind, radius);
                    write_layer(&path, &Layer::with_features(target_epsg, features))?;

                    info!("{} {} r={}: {} rows -> {}", dataset, kind, radius, rows, path.display());
                    outputs.push(ConsolidatedOutput {
                        dataset,
                        kind,
                        radius,
                        path,
                        rows,
                    });
                }
            }
        }

        Ok(outputs)
    }

    /// Read one result file of a zone, recover the station and radius of each
    /// row and rewrite the row keyed by its station, in `target_epsg`
    pub fn recover_zone(&self, zone: &Zone, kind: ResultKind, target_epsg: u32) -> Result<Vec<RecoveredRow>> {
        let path = self.result_path(zone, kind);
        if !path.is_file() {
            return Err(PipelineError::MissingResultFile {
                zone: zone.directory_name(),
                path,
            });
        }

        let layer = read_layer(&path)?;
        let composites = layer
            .features
            .iter()
            .map(|feature| self.composite_of(feature, &path))
            .collect::<Result<Vec<_>>>()?;

        let keys = match self.files.radius_recovery {
            RadiusRecovery::Offset => self.recover_by_offset(zone, &composites)?,
            RadiusRecovery::Minimum => self.recover_by_minimum(&composites, &path)?,
        };

        let transformer = Transformer::new(layer.epsg, target_epsg)?;
        let mut rows = Vec::with_capacity(keys.len());
        for (feature, (station_id, radius)) in layer.features.into_iter().zip(keys) {
            rows.push(RecoveredRow {
                station_id,
                radius,
                feature: self.rekey(feature, station_id, &transformer)?,
            });
        }

        debug!("{} {}: {} rows recovered", zone.directory_name(), kind, rows.len());
        Ok(rows)
    }

    /// `composite - station_id == radius`, with the station taken from the
    /// zone's buffer file
    fn recover_by_offset(&self, zone: &Zone, composites: &[i64]) -> Result<Vec<(i64, u32)>> {
        let buffer_path = zone.conversion_dir(&self.geoclimate_root).join(&self.files.buffer_file);
        if !buffer_path.is_file() {
            return Err(PipelineError::MissingBufferFile {
                zone: zone.directory_name(),
                path: buffer_path,
            });
        }

        let mut lookup = HashMap::new();
        for feature in read_layer(&buffer_path)?.features {
            let composite = self.composite_of(&feature, &buffer_path)?;
            let station_id = integer_property(&feature, STATION_ID_PROPERTY).ok_or_else(|| {
                PipelineError::data_format(format!(
                    "{}: buffer feature {} has no '{}'",
                    buffer_path.display(),
                    composite,
                    STATION_ID_PROPERTY
                ))
            })?;
            lookup.insert(composite, station_id);
        }

        composites
            .iter()
            .map(|composite| {
                let station_id = lookup.get(composite).copied().ok_or_else(|| {
                    PipelineError::data_format(format!(
                        "{}: identifier {} is not in the buffer file",
                        zone.directory_name(),
                        composite
                    ))
                })?;
                let offset = radius_of(*composite, station_id).ok_or_else(|| {
                    PipelineError::data_format(format!(
                        "{}: identifier {} is out of range for station {}",
                        zone.directory_name(),
                        composite,
                        station_id
                    ))
                })?;
                let radius = self.known_radius(offset, *composite)?;
                Ok((station_id, radius))
            })
            .collect()
    }

    /// Subtract the smallest identifier of the file and add back the smallest
    /// radius. Only sound when the file holds a single station.
    fn recover_by_minimum(&self, composites: &[i64], path: &Path) -> Result<Vec<(i64, u32)>> {
        let Some(minimum) = composites.iter().min().copied() else {
            return Ok(Vec::new());
        };

        composites
            .iter()
            .map(|composite| {
                let unmapped = || {
                    PipelineError::data_format(format!(
                        "{}: identifier {} does not map to a configured radius",
                        path.display(),
                        composite
                    ))
                };
                let offset = composite
                    .checked_sub(minimum)
                    .and_then(|delta| delta.checked_add(i64::from(self.radii.min())))
                    .ok_or_else(unmapped)?;
                let radius = self.known_radius(offset, *composite).map_err(|_| unmapped())?;
                let station_id = composite.checked_sub(i64::from(radius)).ok_or_else(unmapped)?;
                Ok((station_id, radius))
            })
            .collect()
    }

    fn known_radius(&self, radius: i64, composite: i64) -> Result<u32> {
        u32::try_from(radius)
            .ok()
            .filter(|r| self.radii.contains(*r))
            .ok_or_else(|| {
                PipelineError::data_format(format!(
                    "Identifier {} gives radius {}, expected one of {:?}",
                    composite,
                    radius,
                    self.radii.as_slice()
                ))
            })
    }

    fn composite_of(&self, feature: &Feature, path: &Path) -> Result<i64> {
        integer_property(feature, &self.id_column).ok_or_else(|| {
            PipelineError::data_format(format!(
                "{}: feature without an integer '{}' identifier",
                path.display(),
                self.id_column
            ))
        })
    }

    /// Replace the composite identifier with the station identifier, keeping
    /// every other property in order
    fn rekey(&self, feature: Feature, station_id: i64, transformer: &Transformer) -> Result<Feature> {
        let mut properties = JsonObject::new();
        properties.insert(self.id_column.clone(), json!(station_id));
        for (key, value) in feature.properties.unwrap_or_default() {
            if key != self.id_column {
                properties.insert(key, value);
            }
        }

        let geometry = match feature.geometry {
            Some(geometry) if transformer.from_epsg() != transformer.to_epsg() => {
                let shape: geo::Geometry<f64> = geometry.value.try_into()?;
                let projected = transformer.geometry(&shape)?;
                Some(geojson::Geometry::new(geojson::Value::from(&projected)))
            }
            other => other,
        };

        Ok(Feature {
            bbox: None,
            geometry,
            id: Some(Id::Number(station_id.into())),
            properties: Some(properties),
            foreign_members: feature.foreign_members,
        })
    }
}

/// Integer value of a property, accepting integral floats and numeric strings
fn integer_property(feature: &Feature, name: &str) -> Option<i64> {
    match feature.property(name)? {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
