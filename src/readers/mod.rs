pub mod geojson_reader;
pub mod station_reader;

pub use geojson_reader::read_layer;
pub use station_reader::StationReader;
