//! Stats module - yearly rollups and exploratory statistics

mod aggregator;
mod calculator;

pub use aggregator::{Aggregator, NullableSum, WeightedMean};
pub use calculator::{
    ColumnSummary, CorrelationMatrix, CountryCorrelation, EmitterRow, Insights, StatsCalculator,
    METRIC_COLUMNS,
};
