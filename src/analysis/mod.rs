//! Metric aggregation and table synthesis.
//!
//! Collection feeds labelled long-format results into the aggregator, whose
//! shaped table is sliced into the published views.

pub mod aggregator;
pub mod collector;
pub mod labels;
pub mod slicer;
pub mod stats;

pub use aggregator::shape_frame;
pub use collector::{aggregate_metric_type, CollectRequest};
pub use slicer::{demographic_view, quartile_view, PublishedView};
