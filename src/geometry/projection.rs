use crate::error::{PipelineError, Result};
use crate::utils::constants::EPSG_WGS84;
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use proj::Proj;

fn crs_name(epsg: u32) -> String {
    format!("EPSG:{}", epsg)
}

/// Whether PROJ knows `epsg` well enough to transform it from WGS84
pub fn supports_epsg(epsg: u32) -> bool {
    epsg == EPSG_WGS84 || Proj::new_known_crs(&crs_name(EPSG_WGS84), &crs_name(epsg), None).is_ok()
}

/// Point and polygon reprojection between two EPSG codes. Axis order is
/// normalized to x/y (longitude first for geographic systems).
pub struct Transformer {
    from_epsg: u32,
    to_epsg: u32,
    proj: Option<Proj>,
}

impl Transformer {
    pub fn new(from_epsg: u32, to_epsg: u32) -> Result<Self> {
        let proj = if from_epsg == to_epsg {
            None
        } else {
            let from_crs = crs_name(from_epsg);
            let to_crs = crs_name(to_epsg);
            let proj = Proj::new_known_crs(&from_crs, &to_crs, None).map_err(|e| {
                PipelineError::config(format!("Cannot transform {} to {}: {}", from_crs, to_crs, e))
            })?;
            Some(proj)
        };

        Ok(Self {
            from_epsg,
            to_epsg,
            proj,
        })
    }

    pub fn from_epsg(&self) -> u32 {
        self.from_epsg
    }

    pub fn to_epsg(&self) -> u32 {
        self.to_epsg
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    pub fn convert(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let Some(proj) = &self.proj else {
            return Ok((x, y));
        };

        let (tx, ty) = proj.convert((x, y)).map_err(|e| {
            PipelineError::data_format(format!(
                "Failed to transform ({}, {}) from EPSG:{} to EPSG:{}: {}",
                x, y, self.from_epsg, self.to_epsg, e
            ))
        })?;

        if !tx.is_finite() || !ty.is_finite() {
            return Err(PipelineError::data_format(format!(
                "Coordinates ({}, {}) cannot be represented in EPSG:{}",
                x, y, self.to_epsg
            )));
        }

        Ok((tx, ty))
    }

    pub fn point(&self, point: Point<f64>) -> Result<Point<f64>> {
        let (x, y) = self.convert(point.x(), point.y())?;
        Ok(Point::new(x, y))
    }

    pub fn polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        if self.is_identity() {
            return Ok(polygon.clone());
        }

        let exterior = self.line_string(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.line_string(ring))
            .collect::<Result<Vec<_>>>()?;

        Ok(Polygon::new(exterior, interiors))
    }

    /// Reproject any geometry a GeoJSON layer can carry
    pub fn geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }

        Ok(match geometry {
            Geometry::Point(p) => Geometry::Point(self.point(*p)?),
            Geometry::LineString(ls) => Geometry::LineString(self.line_string(ls)?),
            Geometry::Polygon(p) => Geometry::Polygon(self.polygon(p)?),
            Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint::new(
                mp.iter().map(|p| self.point(*p)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
                mls.iter().map(|ls| self.line_string(ls)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
                mp.iter().map(|p| self.polygon(p)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection::from(
                gc.iter().map(|g| self.geometry(g)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::Line(line) => Geometry::LineString(self.line_string(&LineString::from(*line))?),
            Geometry::Rect(rect) => Geometry::Polygon(self.polygon(&rect.to_polygon())?),
            Geometry::Triangle(triangle) => Geometry::Polygon(self.polygon(&triangle.to_polygon())?),
        })
    }

    fn line_string(&self, ring: &LineString<f64>) -> Result<LineString<f64>> {
        let coords = ring
            .coords()
            .map(|c| {
                let (x, y) = self.convert(c.x, c.y)?;
                Ok(Coord { x, y })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(LineString::new(coords))
    }
}
