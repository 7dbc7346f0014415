pub mod buffer_builder;
pub mod result_aggregator;
pub mod zone_resolver;

pub use buffer_builder::{BufferBuilder, BufferOutcome};
pub use result_aggregator::{ConsolidatedOutput, RecoveredRow, ResultAggregator};
pub use zone_resolver::{ZonePlan, ZoneResolver};
