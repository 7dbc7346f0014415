pub mod geojson_writer;
pub mod summary_writer;

pub use geojson_writer::{write_atomic, write_layer};
pub use summary_writer::write_json;
