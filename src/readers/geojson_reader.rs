use crate::error::{PipelineError, Result};
use crate::models::Layer;
use geojson::GeoJson;
use std::fs;
use std::path::Path;

/// Read a GeoJSON feature collection from disk
pub fn read_layer(path: &Path) -> Result<Layer> {
    let text = fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Layer::from_collection(collection),
        GeoJson::Feature(feature) => Ok(Layer::with_features(
            crate::utils::constants::EPSG_WGS84,
            vec![feature],
        )),
        GeoJson::Geometry(_) => Err(PipelineError::data_format(format!(
            "{} holds a bare geometry, expected a feature collection",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_projected_collection() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{"type":"FeatureCollection",
                "crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::2154"}}}},
                "features":[{{"type":"Feature","properties":{{"ID_ZONE":"zone"}},
                  "geometry":{{"type":"Point","coordinates":[652469.0,6862035.0]}}}}]}}"#
        )?;

        let layer = read_layer(file.path())?;
        assert_eq!(layer.epsg, 2154);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.identifier_column(), Some("ID_ZONE"));
        Ok(())
    }

    #[test]
    fn test_collection_without_crs_is_wgs84() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"type":"FeatureCollection","features":[]}}"#)?;
        assert_eq!(read_layer(file.path())?.epsg, 4326);
        Ok(())
    }

    #[test]
    fn test_bare_geometry_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"type":"Point","coordinates":[1.0,2.0]}}"#)?;
        assert!(read_layer(file.path()).is_err());
        Ok(())
    }
}
