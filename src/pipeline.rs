//! Load → encode → fit → predict → write, as a single forward pass.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use grove_helpers::{class_counts, DataPoint};
use random_forest::RandomForest;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::encode::{FeatureEncoder, Vocabulary};
use crate::error::{Error, Result};
use crate::table::Table;
use crate::writer::write_predictions;

/// Test-set identifiers with their predicted labels, in test-file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub feature_names: Vec<String>,
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub feature_names: Vec<String>,
    pub output_path: PathBuf,
    /// Number of test rows per predicted label.
    pub predicted_counts: BTreeMap<String, usize>,
}

/// Runs the whole pipeline described by `config` and writes the output file.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let train = Table::from_path(&config.train_path)?;
    let test = Table::from_path(&config.test_path)?;
    info!(
        train_rows = train.len(),
        test_rows = test.len(),
        "loaded input tables"
    );

    let predictions = predict_tables(config, &train, &test)?;
    write_predictions(
        &config.output_path,
        &config.id_column,
        &config.target_column,
        &predictions.ids,
        &predictions.labels,
    )?;

    let mut predicted_counts = BTreeMap::new();
    for label in &predictions.labels {
        *predicted_counts.entry(label.clone()).or_insert(0) += 1;
    }
    Ok(RunSummary {
        train_rows: train.len(),
        test_rows: test.len(),
        feature_names: predictions.feature_names,
        output_path: config.output_path.clone(),
        predicted_counts,
    })
}

/// Fits the encoder and forest on `train` and predicts one label per row of `test`.
pub fn predict_tables(config: &RunConfig, train: &Table, test: &Table) -> Result<Predictions> {
    if train.is_empty() {
        return Err(Error::EmptyTable {
            table: train.source().to_string(),
        });
    }
    let labels = read_labels(train, &config.target_column)?;
    let ids: Vec<String> = test
        .column(&config.id_column)?
        .into_iter()
        .map(str::to_string)
        .collect();

    let encoder = FeatureEncoder::new(&config.features).with_unseen(config.encoding.unseen);
    let fitted = match config.encoding.vocabulary {
        Vocabulary::Training => encoder.fit(&[train])?,
        Vocabulary::Union => encoder.fit(&[train, test])?,
    };
    let x_train = fitted.transform(train)?;
    let x_test = fitted.transform(test)?;
    info!(features = ?fitted.feature_names(), "encoded features");

    let data: Vec<DataPoint<String, f64>> = x_train
        .rows()
        .into_iter()
        .zip(labels)
        .map(|(row, label)| DataPoint::new(row.to_owned(), label))
        .collect();
    info!(classes = ?class_counts(&data), "training labels");

    let forest_config = &config.forest;
    let mut forest = RandomForest::new(
        forest_config.n_trees,
        forest_config.depth_limit(),
        forest_config.seed,
    )
    .with_max_features(forest_config.max_features)
    .with_bootstrap(forest_config.bootstrap);
    forest.fit(&data)?;
    info!(
        trees = forest_config.n_trees,
        max_depth = ?forest_config.depth_limit(),
        seed = forest_config.seed,
        "fitted random forest"
    );

    let labels = forest.predict_batch(x_test.view())?;
    debug!(rows = labels.len(), "predicted test rows");

    Ok(Predictions {
        ids,
        labels,
        feature_names: fitted.feature_names().to_vec(),
    })
}

/// Reads the label column, which must be fully populated and hold at most two values.
fn read_labels(table: &Table, column: &str) -> Result<Vec<String>> {
    let cells = table.values(column)?;
    if let Some(row) = cells.iter().position(|v| v.is_empty()) {
        return Err(Error::MissingValue {
            table: table.source().to_string(),
            row: row + 1,
            column: column.to_string(),
        });
    }

    let distinct: BTreeSet<&str> = cells.iter().copied().collect();
    if distinct.len() > 2 {
        return Err(Error::LabelNotBinary {
            column: column.to_string(),
            found: distinct.into_iter().map(str::to_string).collect(),
        });
    }
    debug!(column, values = ?distinct, "read training labels");

    Ok(cells.into_iter().map(str::to_string).collect())
}
