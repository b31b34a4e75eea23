//! Statistics for producers, consumers and tracks

pub mod metrics;

pub use metrics::{CounterSnapshot, Counters};
