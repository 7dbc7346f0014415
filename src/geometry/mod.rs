pub mod bbox;
pub mod buffer;
pub mod projection;

pub use bbox::BoundingBox;
pub use buffer::buffer_point;
pub use projection::{supports_epsg, Transformer};
