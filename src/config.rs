//! Run configuration, loaded from TOML with defaults for the Titanic dataset.

use std::fs;
use std::path::{Path, PathBuf};

use random_forest::MaxFeatures;
use serde::Deserialize;

use crate::encode::{UnseenCategory, Vocabulary};
use crate::error::{Error, Result};

/// Everything a run needs. Missing keys fall back to [`RunConfig::default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub output_path: PathBuf,
    /// Row identifier column, copied to the output.
    pub id_column: String,
    /// Label column, present in the training file only.
    pub target_column: String,
    /// Columns fed to the encoder, in order.
    pub features: Vec<String>,
    pub forest: ForestConfig,
    pub encoding: EncodingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("input/train.csv"),
            test_path: PathBuf::from("input/test.csv"),
            output_path: PathBuf::from("result/submission_rfc_bsc.csv"),
            id_column: "PassengerId".to_string(),
            target_column: "Survived".to_string(),
            features: ["Pclass", "Sex", "SibSp", "Parch"]
                .into_iter()
                .map(String::from)
                .collect(),
            forest: ForestConfig::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// 0 means unlimited depth.
    pub max_depth: usize,
    pub seed: u64,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 5,
            seed: 3,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

impl ForestConfig {
    pub fn depth_limit(&self) -> Option<usize> {
        (self.max_depth > 0).then_some(self.max_depth)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub vocabulary: Vocabulary,
    pub unseen: UnseenCategory,
}

impl RunConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.forest.n_trees == 0 {
            return Err(Error::Config("forest.n_trees must be at least 1".to_string()));
        }
        if self.features.is_empty() {
            return Err(Error::Config("features must name at least one column".to_string()));
        }
        if self.id_column.is_empty() || self.target_column.is_empty() {
            return Err(Error::Config(
                "id_column and target_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = RunConfig::default();
        assert_eq!(config.features, ["Pclass", "Sex", "SibSp", "Parch"]);
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.forest.depth_limit(), Some(5));
        assert_eq!(config.forest.seed, 3);
        assert_eq!(config.encoding.vocabulary, Vocabulary::Training);
        assert_eq!(config.encoding.unseen, UnseenCategory::ZeroFill);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RunConfig = toml::from_str(
            r#"
output_path = "out/predictions.csv"

[forest]
n_trees = 10
max_depth = 0
max_features = { count = 3 }

[encoding]
unseen = "error"
"#,
        )
        .unwrap();

        assert_eq!(config.output_path, PathBuf::from("out/predictions.csv"));
        assert_eq!(config.train_path, PathBuf::from("input/train.csv"));
        assert_eq!(config.forest.n_trees, 10);
        assert_eq!(config.forest.depth_limit(), None);
        assert_eq!(config.forest.seed, 3);
        assert_eq!(config.forest.max_features, MaxFeatures::Count(3));
        assert_eq!(config.encoding.unseen, UnseenCategory::Error);
        assert_eq!(config.encoding.vocabulary, Vocabulary::Training);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result: std::result::Result<RunConfig, _> = toml::from_str("n_estimators = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = RunConfig::default();
        config.forest.n_trees = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = RunConfig::default();
        config.features.clear();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grove.toml");
        std::fs::write(&path, "features = [\"Sex\"]\n[encoding]\nvocabulary = \"union\"\n").unwrap();

        let config = RunConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.features, ["Sex"]);
        assert_eq!(config.encoding.vocabulary, Vocabulary::Union);

        let err = RunConfig::from_toml_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
