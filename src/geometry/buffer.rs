use crate::error::{PipelineError, Result};
use geo::{Geometry, Point, Polygon};
use geos::{Geom, Geometry as GeosGeometry};

/// Disc of `radius` around `center`, computed by GEOS with
/// `segments_per_quadrant` segments per quarter circle.
pub fn buffer_point(center: Point<f64>, radius: f64, segments_per_quadrant: usize) -> Result<Polygon<f64>> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(PipelineError::config(format!(
            "Buffer radius must be a positive distance, got {}",
            radius
        )));
    }
    let quadsegs = i32::try_from(segments_per_quadrant)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            PipelineError::config(format!(
                "Buffer resolution must be between 1 and {} segments per quadrant, got {}",
                i32::MAX,
                segments_per_quadrant
            ))
        })?;

    let point: GeosGeometry = center.try_into()?;
    let buffered: Geometry<f64> = point.buffer(radius, quadsegs)?.try_into()?;

    match buffered {
        Geometry::Polygon(polygon) => Ok(polygon),
        other => Err(PipelineError::data_format(format!(
            "Buffer of ({}, {}) is not a polygon: {:?}",
            center.x(),
            center.y(),
            other
        ))),
    }
}
