pub mod spatial;
pub mod statistics;
pub mod temporal;

pub use spatial::SpatialAnalysis;
pub use statistics::Statistics;
pub use temporal::TemporalAnalysis;
