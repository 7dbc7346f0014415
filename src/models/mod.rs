pub mod dataset;
pub mod layer;
pub mod radii;
pub mod result_kind;
pub mod station;
pub mod zone;

pub use dataset::DatasetType;
pub use layer::Layer;
pub use radii::{composite_id, radius_of, BufferRadii};
pub use result_kind::ResultKind;
pub use station::{ProjectedStation, Station};
pub use zone::{Zone, ZoneKey};
