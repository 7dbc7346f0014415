use crate::error::{PipelineError, Result};
use geo::{BoundingRect, Polygon};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the coordinate system of the geometry it was
/// taken from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn of_polygon(polygon: &Polygon<f64>) -> Result<Self> {
        let rect = polygon.bounding_rect().ok_or_else(|| {
            PipelineError::data_format("Cannot compute the bounding box of an empty polygon")
        })?;

        let bbox = Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        if ![bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(PipelineError::data_format(format!(
                "Non-finite bounding box: {:?}",
                bbox
            )));
        }

        Ok(bbox)
    }

    /// Ordinates in the order the conversion tool expects them:
    /// `[min_y, min_x, max_y, max_x]`
    pub fn location_ordinates(&self) -> [f64; 4] {
        [self.min_y, self.min_x, self.max_y, self.max_x]
    }
}
