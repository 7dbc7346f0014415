use geo::Point;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A weather station read from the station table. Coordinates are
/// geographic (EPSG:4326); `attributes` keeps every other input column in
/// table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Station {
    pub id: i64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    pub attributes: Vec<(String, String)>,
}

impl Station {
    pub fn new(id: i64, longitude: f64, latitude: f64) -> Self {
        Self {
            id,
            longitude,
            latitude,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<(String, String)>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn geographic_point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A station with its point in the working (projected) coordinate system
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedStation {
    pub station: Station,
    pub point: Point<f64>,
}

impl ProjectedStation {
    pub fn id(&self) -> i64 {
        self.station.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_validation() {
        let station = Station::new(1, 2.3375, 48.8217)
            .with_attributes(vec![("NAME".to_string(), "Montsouris".to_string())]);

        assert!(station.validate().is_ok());
        assert_eq!(station.attribute("NAME"), Some("Montsouris"));
        assert_eq!(station.geographic_point(), Point::new(2.3375, 48.8217));
    }

    #[test]
    fn test_invalid_coordinates() {
        // Latitude and longitude swapped in a projected table
        let station = Station::new(7, 652_469.0, 6_862_035.0);
        assert!(station.validate().is_err());
    }
}
