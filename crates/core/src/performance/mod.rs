//! Realized-return tracking of past recommendations.

pub mod aggregator;
pub mod tracking;

pub use aggregator::{aggregate, PerformanceSummary};
