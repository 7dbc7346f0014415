pub mod constants;
pub mod coordinates;
pub mod progress;

pub use constants::*;
pub use coordinates::{format_ordinate, parse_decimal, parse_identifier};
pub use progress::ProgressReporter;
