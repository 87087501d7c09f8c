//! Data module - source loading and table derivation

mod loader;
mod processor;

pub use loader::{
    load_datasets, load_table, load_world_map, DatasetBundle, LoadError, MapPolygon, WorldMap,
};
pub use processor::{
    CountryAverage, DataProcessor, DeriveError, EconomicSummaryRow, GenderSplitRow, Sex,
    YearlyTrend, YearlyTrendRow,
};
