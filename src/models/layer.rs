use crate::error::{PipelineError, Result};
use crate::utils::constants::EPSG_WGS84;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde_json::json;

/// A feature collection together with the coordinate system its
/// coordinates are expressed in
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub epsg: u32,
    pub features: Vec<Feature>,
}

impl Layer {
    pub fn new(epsg: u32) -> Self {
        Self {
            epsg,
            features: Vec::new(),
        }
    }

    pub fn with_features(epsg: u32, features: Vec<Feature>) -> Self {
        Self { epsg, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Name of the first property of the first feature, the identifier
    /// column of buffer and result layers
    pub fn identifier_column(&self) -> Option<&str> {
        self.features
            .first()
            .and_then(|f| f.properties.as_ref())
            .and_then(|props| props.keys().next())
            .map(|k| k.as_str())
    }

    pub fn from_collection(collection: FeatureCollection) -> Result<Self> {
        let epsg = match collection
            .foreign_members
            .as_ref()
            .and_then(|members| members.get("crs"))
        {
            Some(crs) => epsg_from_crs_member(crs)?,
            None => EPSG_WGS84,
        };

        Ok(Self {
            epsg,
            features: collection.features,
        })
    }

    pub fn into_collection(self) -> FeatureCollection {
        let foreign_members = if self.epsg == EPSG_WGS84 {
            None
        } else {
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                json!({
                    "type": "name",
                    "properties": { "name": format!("EPSG:{}", self.epsg) }
                }),
            );
            Some(members)
        };

        FeatureCollection {
            bbox: None,
            features: self.features,
            foreign_members,
        }
    }
}

/// Parse a named CRS member: `EPSG:2154`, `urn:ogc:def:crs:EPSG::2154` or
/// the OGC CRS84 URN
fn epsg_from_crs_member(crs: &JsonValue) -> Result<u32> {
    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| PipelineError::data_format(format!("Unreadable crs member: {}", crs)))?;

    if name.ends_with("CRS84") {
        return Ok(EPSG_WGS84);
    }

    name.rsplit(':')
        .next()
        .and_then(|code| code.trim().parse::<u32>().ok())
        .ok_or_else(|| PipelineError::data_format(format!("Unsupported crs name '{}'", name)))
}
