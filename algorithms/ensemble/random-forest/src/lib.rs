use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
use tracing::debug;
// Core components from shared library
use decision_tree::{DecisionTree, TreeError, TreeParams};
use grove_helpers::{DataPoint, Float};

pub use decision_tree::MaxFeatures;

/// Errors that can occur when fitting or using a random forest.
#[derive(Debug, Clone, PartialEq)]
pub enum ForestError {
    /// A forest needs at least one tree.
    InvalidTreeCount,
    /// Cannot fit on an empty training set.
    EmptyDataSet,
    /// `predict` was called before `fit`.
    NotFitted,
    /// Growing or querying one of the trees failed.
    Tree(TreeError),
}

impl Display for ForestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ForestError::InvalidTreeCount => write!(f, "A random forest needs at least one tree"),
            ForestError::EmptyDataSet => write!(f, "Cannot fit a random forest on an empty training set"),
            ForestError::NotFitted => write!(f, "The random forest has not been fitted"),
            ForestError::Tree(err) => write!(f, "Decision tree error: {}", err),
        }
    }
}

impl Error for ForestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ForestError::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for ForestError {
    fn from(err: TreeError) -> Self {
        ForestError::Tree(err)
    }
}

/// A random forest classifier: bagged CART trees combined by majority vote.
///
/// Each tree is grown on a bootstrap sample of the training data and considers a
/// random subset of features at every split. All randomness derives from `seed`,
/// so fitting twice on the same data yields the same forest.
///
/// # Type Parameters
///
/// * `L`: The label type. Vote ties resolve to the smallest label.
/// * `F`: The float type for the features (e.g., `f32`, `f64`).
#[derive(Debug, Clone)]
pub struct RandomForest<L, F>
where
    L: Clone + Eq + Hash + Ord + Debug,
    F: Float,
{
    n_trees: usize,
    max_depth: Option<usize>,
    seed: u64,
    max_features: MaxFeatures,
    bootstrap: bool,
    trees: Option<Vec<DecisionTree<L, F>>>,
}

impl<L, F> RandomForest<L, F>
where
    L: Clone + Eq + Hash + Ord + Debug,
    F: Float,
{
    /// Creates an unfitted forest.
    ///
    /// # Arguments
    ///
    /// * `n_trees`: Number of trees in the ensemble. Must be greater than 0.
    /// * `max_depth`: Depth limit for every tree; `None` grows trees until leaves are pure.
    /// * `seed`: Seed for bootstrap sampling and feature subsampling.
    ///
    /// Defaults to `MaxFeatures::Sqrt` and bootstrap sampling enabled.
    pub fn new(n_trees: usize, max_depth: Option<usize>, seed: u64) -> Self {
        Self {
            n_trees,
            max_depth,
            seed,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            trees: None,
        }
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// When disabled every tree sees the full training set.
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Fits every tree in sequence.
    ///
    /// A master RNG seeded with `seed` hands one sub-seed to each tree, which then
    /// draws its bootstrap sample and grows with its own RNG.
    ///
    /// # Errors
    ///
    /// Returns `ForestError::InvalidTreeCount` if `n_trees` is 0,
    /// `ForestError::EmptyDataSet` if `data` is empty and
    /// `ForestError::Tree` if a tree rejects the data (ragged or non-finite features).
    pub fn fit(&mut self, data: &[DataPoint<L, F>]) -> Result<(), ForestError> {
        if self.n_trees == 0 {
            return Err(ForestError::InvalidTreeCount);
        }
        if data.is_empty() {
            return Err(ForestError::EmptyDataSet);
        }

        let params = TreeParams::new()
            .max_depth(self.max_depth)
            .max_features(self.max_features);
        let n = data.len();
        let mut master = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);

        for t in 0..self.n_trees {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(master.next_u64());
            let sample: Vec<usize> = if self.bootstrap {
                (0..n).map(|_| rng.random_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let tree = DecisionTree::fit_on_indices(data, &sample, &params, &mut rng)?;
            debug!(
                tree = t,
                depth = tree.depth(),
                leaves = tree.n_leaves(),
                "grew decision tree"
            );
            trees.push(tree);
        }

        self.trees = Some(trees);
        Ok(())
    }

    /// Predicts the label for one point by majority vote over all trees.
    pub fn predict(&self, features: ArrayView1<F>) -> Result<L, ForestError> {
        let votes = self.votes(features)?;

        // `votes` iterates in label order, so a strict `>` keeps the smallest label on ties.
        let mut winner: Option<(&L, usize)> = None;
        for (label, count) in votes {
            if winner.is_none_or(|(_, best)| count > best) {
                winner = Some((label, count));
            }
        }
        winner
            .map(|(label, _)| label.clone())
            .ok_or(ForestError::NotFitted)
    }

    /// Predicts one label per row of `records`, in row order.
    pub fn predict_batch(&self, records: ArrayView2<F>) -> Result<Vec<L>, ForestError> {
        records
            .rows()
            .into_iter()
            .map(|row| self.predict(row))
            .collect()
    }

    /// Share of trees voting for each class. Every class seen in training is present.
    pub fn predict_proba(&self, features: ArrayView1<F>) -> Result<BTreeMap<L, f64>, ForestError> {
        let trees = self.trees()?;
        let mut shares: BTreeMap<L, f64> = trees[0]
            .classes()
            .iter()
            .map(|label| (label.clone(), 0.0))
            .collect();

        let total = trees.len() as f64;
        for (label, count) in self.votes(features)? {
            if let Some(share) = shares.get_mut(label) {
                *share = count as f64 / total;
            }
        }
        Ok(shares)
    }

    /// The fitted trees.
    pub fn trees(&self) -> Result<&[DecisionTree<L, F>], ForestError> {
        self.trees.as_deref().ok_or(ForestError::NotFitted)
    }

    /// Sorted labels seen while fitting.
    pub fn classes(&self) -> Result<&[L], ForestError> {
        Ok(self.trees()?[0].classes())
    }

    fn votes(&self, features: ArrayView1<F>) -> Result<BTreeMap<&L, usize>, ForestError> {
        let mut votes = BTreeMap::new();
        for tree in self.trees()? {
            *votes.entry(tree.predict(features)?).or_insert(0) += 1;
        }
        Ok(votes)
    }
}
