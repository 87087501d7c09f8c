//! Stats module - regression for trend lines

mod calculator;

pub use calculator::{StatsCalculator, TrendFit, SIGNIFICANCE_THRESHOLD};
