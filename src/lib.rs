//! Survival classifier pipeline: load two delimited tables, indicator-encode a fixed
//! set of columns, fit a random forest on the training rows and write one predicted
//! label per test row.

pub mod config;
pub mod encode;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod table;
pub mod writer;

pub use config::{EncodingConfig, ForestConfig, RunConfig};
pub use encode::{
    encode_indicators, ColumnKind, EncodedFeatures, FeatureEncoder, FittedEncoder,
    UnseenCategory, Vocabulary,
};
pub use error::{Error, Result};
pub use pipeline::{predict_tables, run, Predictions, RunSummary};
pub use table::Table;
pub use writer::write_predictions;

// Re-export the workspace crates so binaries only need this one.
pub use grove_helpers::{DataPoint, Float};
pub use random_forest::{ForestError, MaxFeatures, RandomForest};
