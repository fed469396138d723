//! Indicator (one-hot) encoding of selected table columns.
//!
//! A [`FeatureEncoder`] is fitted once and the resulting [`FittedEncoder`] encodes
//! both the training and the test table, so the two matrices always share the same
//! columns in the same order. Numeric columns pass through first, in the order they
//! were listed; each categorical column then expands into one `<column>_<value>`
//! indicator per category, categories sorted.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::table::Table;

/// What to do with a categorical value that the fitted vocabulary does not contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnseenCategory {
    /// Encode the value as all-zero indicators and log a warning.
    #[default]
    ZeroFill,
    /// Fail with `Error::UnseenCategory`.
    Error,
}

/// Which tables the category vocabulary is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Vocabulary {
    /// Categories observed in the training table only.
    #[default]
    Training,
    /// Union of the categories observed in the training and test tables.
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Numeric,
    /// Sorted, de-duplicated categories.
    Categorical(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
struct FittedColumn {
    name: String,
    kind: ColumnKind,
    /// Position of the column's first output feature.
    offset: usize,
}

/// Unfitted encoder: the columns to select and the unseen-category policy.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    columns: Vec<String>,
    unseen: UnseenCategory,
}

impl FeatureEncoder {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            unseen: UnseenCategory::default(),
        }
    }

    pub fn with_unseen(mut self, unseen: UnseenCategory) -> Self {
        self.unseen = unseen;
        self
    }

    /// Derives column kinds and category lists from `tables`.
    ///
    /// A column is numeric when every non-empty cell across all tables parses as a
    /// finite number, categorical otherwise.
    ///
    /// # Errors
    ///
    /// `Error::MissingColumn` if a table lacks a selected column, `Error::EmptyTable`
    /// if no table has any rows.
    pub fn fit(&self, tables: &[&Table]) -> Result<FittedEncoder> {
        if tables.iter().all(|t| t.is_empty()) {
            return Err(Error::EmptyTable {
                table: tables
                    .first()
                    .map(|t| t.source().to_string())
                    .unwrap_or_default(),
            });
        }

        let mut kinds = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let mut values = Vec::new();
            for table in tables {
                values.extend(table.values(name)?.into_iter().filter(|v| !v.is_empty()));
            }

            let numeric = values.iter().all(|v| parse_finite(v).is_some());
            let kind = if numeric {
                ColumnKind::Numeric
            } else {
                let categories: BTreeSet<&str> = values.into_iter().collect();
                ColumnKind::Categorical(categories.into_iter().map(str::to_string).collect())
            };
            kinds.push((name.clone(), kind));
        }

        let mut columns = Vec::with_capacity(kinds.len());
        let mut feature_names = Vec::new();
        for (name, kind) in kinds.iter().filter(|(_, k)| *k == ColumnKind::Numeric) {
            columns.push(FittedColumn {
                name: name.clone(),
                kind: kind.clone(),
                offset: feature_names.len(),
            });
            feature_names.push(name.clone());
        }
        for (name, kind) in kinds {
            if let ColumnKind::Categorical(categories) = &kind {
                let offset = feature_names.len();
                feature_names.extend(categories.iter().map(|c| format!("{name}_{c}")));
                columns.push(FittedColumn { name, kind, offset });
            }
        }

        Ok(FittedEncoder {
            columns,
            feature_names,
            unseen: self.unseen,
        })
    }
}

/// The fitted vocabulary shared by every table it encodes.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedEncoder {
    columns: Vec<FittedColumn>,
    feature_names: Vec<String>,
    unseen: UnseenCategory,
}

impl FittedEncoder {
    /// Output feature names, one per matrix column.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn kind(&self, column: &str) -> Option<&ColumnKind> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| &c.kind)
    }

    /// Encodes `table` into a `rows x n_features` matrix.
    ///
    /// # Errors
    ///
    /// `Error::MissingColumn` for an absent column, `Error::MissingValue` for an empty
    /// numeric cell, `Error::InvalidNumber` for a non-numeric cell in a numeric column
    /// and, under `UnseenCategory::Error`, `Error::UnseenCategory`.
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((table.len(), self.n_features()));
        // (column, value) -> number of rows zero-filled
        let mut zero_filled: BTreeMap<(&str, &str), usize> = BTreeMap::new();

        for column in &self.columns {
            let cells = table.values(&column.name)?;
            for (row, value) in cells.into_iter().enumerate() {
                match &column.kind {
                    ColumnKind::Numeric => {
                        if value.is_empty() {
                            return Err(Error::MissingValue {
                                table: table.source().to_string(),
                                row: row + 1,
                                column: column.name.clone(),
                            });
                        }
                        let number = parse_finite(value).ok_or_else(|| Error::InvalidNumber {
                            table: table.source().to_string(),
                            row: row + 1,
                            column: column.name.clone(),
                            value: value.to_string(),
                        })?;
                        matrix[[row, column.offset]] = number;
                    }
                    ColumnKind::Categorical(categories) => {
                        if value.is_empty() {
                            continue;
                        }
                        match categories.binary_search_by(|c| c.as_str().cmp(value)) {
                            Ok(pos) => matrix[[row, column.offset + pos]] = 1.0,
                            Err(_) if self.unseen == UnseenCategory::Error => {
                                return Err(Error::UnseenCategory {
                                    table: table.source().to_string(),
                                    column: column.name.clone(),
                                    value: value.to_string(),
                                });
                            }
                            Err(_) => {
                                *zero_filled
                                    .entry((column.name.as_str(), value))
                                    .or_insert(0) += 1;
                            }
                        }
                    }
                }
            }
        }

        for ((column, value), rows) in zero_filled {
            warn!(
                table = table.source(),
                column,
                value,
                rows,
                "category not seen while fitting, encoded as all-zero indicators"
            );
        }
        Ok(matrix)
    }
}

/// Matrix plus column names produced by [`encode_indicators`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub feature_names: Vec<String>,
    pub matrix: Array2<f64>,
}

/// Indicator-expands `columns` of a single table, with a vocabulary taken only from
/// the values observed in that table.
///
/// Two tables encoded this way need not share columns; use one [`FittedEncoder`]
/// for tables that must line up.
pub fn encode_indicators<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<EncodedFeatures> {
    let fitted = FeatureEncoder::new(columns).fit(&[table])?;
    let matrix = fitted.transform(table)?;
    Ok(EncodedFeatures {
        feature_names: fitted.feature_names,
        matrix,
    })
}

fn parse_finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
