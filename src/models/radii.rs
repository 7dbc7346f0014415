use crate::error::{PipelineError, Result};
use crate::utils::constants::DEFAULT_RADII;
use serde::{Deserialize, Serialize};

/// Strictly ascending, positive buffer radii in working-CRS units. Each
/// radius doubles as the offset added to station identifiers in buffer files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct BufferRadii(Vec<u32>);

impl BufferRadii {
    pub fn new(radii: Vec<u32>) -> Result<Self> {
        if radii.is_empty() {
            return Err(PipelineError::config("At least one buffer radius is required"));
        }
        if radii.iter().any(|r| *r == 0) {
            return Err(PipelineError::config("Buffer radii must be strictly positive"));
        }
        if radii.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::config(format!(
                "Buffer radii must be strictly ascending and unique, got {:?}",
                radii
            )));
        }
        Ok(Self(radii))
    }

    pub fn max(&self) -> u32 {
        // Non-empty and ascending by construction
        self.0[self.0.len() - 1]
    }

    pub fn min(&self) -> u32 {
        self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn contains(&self, radius: u32) -> bool {
        self.0.binary_search(&radius).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for BufferRadii {
    fn default() -> Self {
        Self(DEFAULT_RADII.to_vec())
    }
}

impl TryFrom<Vec<u32>> for BufferRadii {
    type Error = PipelineError;

    fn try_from(radii: Vec<u32>) -> Result<Self> {
        Self::new(radii)
    }
}

impl From<BufferRadii> for Vec<u32> {
    fn from(radii: BufferRadii) -> Self {
        radii.0
    }
}

/// Identifier of one station buffered at one radius: `station_id + radius`.
/// `None` when the sum does not fit in an `i64`.
pub fn composite_id(station_id: i64, radius: u32) -> Option<i64> {
    station_id.checked_add(i64::from(radius))
}

/// Invert [`composite_id`] when the station is known
pub fn radius_of(composite: i64, station_id: i64) -> Option<i64> {
    composite.checked_sub(station_id)
}
