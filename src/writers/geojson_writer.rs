use crate::error::Result;
use crate::models::Layer;
use geojson::GeoJson;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `bytes` to `path` through a temporary file in the same directory so
/// that an interrupted run never leaves a truncated file behind. Existence of
/// these files is what later runs trust.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write a layer as a GeoJSON feature collection
pub fn write_layer(path: &Path, layer: &Layer) -> Result<()> {
    let geojson = GeoJson::FeatureCollection(layer.clone().into_collection());
    write_atomic(path, geojson.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::read_layer;
    use geojson::{Feature, Geometry, JsonObject, Value};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_layer() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("layer.geojson");

        let mut props = JsonObject::new();
        props.insert("SITE".to_string(), json!(101));
        let layer = Layer::with_features(
            2154,
            vec![Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![652469.0, 6862035.0]))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }],
        );

        write_layer(&path, &layer)?;
        let restored = read_layer(&path)?;
        assert_eq!(restored, layer);
        Ok(())
    }

    #[test]
    fn test_write_atomic_replaces_content() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("summary.json");
        write_atomic(&path, b"first")?;
        write_atomic(&path, b"second")?;
        assert_eq!(fs::read_to_string(&path)?, "second");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }
}
