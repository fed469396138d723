use ndarray::ArrayView1;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
// Core components from shared library
use grove_helpers::{DataPoint, Float};

/// Errors that can occur while growing or querying a decision tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The training data (or the sample drawn from it) is empty.
    EmptyDataSet,
    /// Data points (or a query) disagree on the number of features.
    MismatchedDimensions,
    /// A feature value is NaN or infinite.
    NonFiniteFeature { row: usize, feature: usize },
    /// `min_samples_split` must be at least 2.
    InvalidMinSamplesSplit,
    /// A sample index points outside the training data.
    InvalidIndex(usize),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::EmptyDataSet => write!(f, "Cannot grow a tree from an empty training set"),
            TreeError::MismatchedDimensions => {
                write!(f, "Data points have mismatched feature dimensions")
            }
            TreeError::NonFiniteFeature { row, feature } => write!(
                f,
                "Non-finite feature value at row {}, feature {}",
                row, feature
            ),
            TreeError::InvalidMinSamplesSplit => {
                write!(f, "min_samples_split must be at least 2")
            }
            TreeError::InvalidIndex(idx) => write!(f, "Sample index {} is out of bounds", idx),
        }
    }
}

impl Error for TreeError {}

/// How many features are considered when looking for the best split of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
pub enum MaxFeatures {
    /// Every feature.
    #[default]
    All,
    /// `floor(sqrt(n_features))`.
    Sqrt,
    /// `floor(log2(n_features))`.
    Log2,
    /// A fixed number of features.
    Count(usize),
}

impl MaxFeatures {
    /// Number of features to visit per split, clamped to `1..=n_features`.
    pub fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Count(n) => n,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Growth parameters for a single tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams {
    /// Maximum depth of the tree; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum number of samples a node needs before it may be split.
    pub min_samples_split: usize,
    /// Features considered per split.
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::All,
        }
    }
}

impl TreeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }
}

/// A node of the fitted tree. Children are indices into the tree's node arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<F: Float> {
    Leaf {
        /// Index into the tree's sorted class list.
        class: usize,
        n_samples: usize,
    },
    Split {
        feature: usize,
        /// Samples with `x[feature] <= threshold` go left.
        threshold: F,
        left: usize,
        right: usize,
    },
}

/// A CART classification tree using Gini impurity.
///
/// # Type Parameters
///
/// * `L`: The label type. Labels are ordered so that ties resolve deterministically.
/// * `F`: The float type for the features (e.g., `f32`, `f64`).
#[derive(Debug, Clone)]
pub struct DecisionTree<L, F>
where
    L: Clone + Eq + Hash + Ord + Debug,
    F: Float,
{
    classes: Vec<L>,
    nodes: Vec<Node<F>>,
    root: usize,
    n_features: usize,
}

impl<L, F> DecisionTree<L, F>
where
    L: Clone + Eq + Hash + Ord + Debug,
    F: Float,
{
    /// Grows a tree on the full training set with a random seed.
    pub fn fit(data: &[DataPoint<L, F>], params: &TreeParams) -> Result<Self, TreeError> {
        Self::fit_with_seed(data, params, rand::random())
    }

    /// Grows a tree on the full training set with a specific seed for reproducibility.
    ///
    /// The seed only matters when `max_features` is smaller than the number of features,
    /// or when several features tie for the best split.
    pub fn fit_with_seed(
        data: &[DataPoint<L, F>],
        params: &TreeParams,
        seed: u64,
    ) -> Result<Self, TreeError> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let indices: Vec<usize> = (0..data.len()).collect();
        Self::fit_on_indices(data, &indices, params, &mut rng)
    }

    /// Grows a tree on the rows of `data` selected by `indices`.
    ///
    /// Indices may repeat, which is how bootstrap samples are passed in. The class list
    /// is taken from all of `data`, so trees grown on different samples of the same data
    /// share class indices.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::EmptyDataSet` if `data` or `indices` is empty,
    /// `TreeError::MismatchedDimensions` if points differ in length,
    /// `TreeError::NonFiniteFeature` on NaN or infinite values,
    /// `TreeError::InvalidIndex` if an index is out of bounds and
    /// `TreeError::InvalidMinSamplesSplit` if `min_samples_split < 2`.
    pub fn fit_on_indices<R>(
        data: &[DataPoint<L, F>],
        indices: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Result<Self, TreeError>
    where
        R: RngCore + Rng,
    {
        if data.is_empty() || indices.is_empty() {
            return Err(TreeError::EmptyDataSet);
        }
        if params.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit);
        }

        let n_features = data[0].features.len();
        for (row, dp) in data.iter().enumerate() {
            if dp.features.len() != n_features {
                return Err(TreeError::MismatchedDimensions);
            }
            if let Some(feature) = dp.features.iter().position(|v| !v.is_finite()) {
                return Err(TreeError::NonFiniteFeature { row, feature });
            }
        }
        if let Some(&idx) = indices.iter().find(|&&i| i >= data.len()) {
            return Err(TreeError::InvalidIndex(idx));
        }

        let mut classes: Vec<L> = data.iter().map(|dp| dp.label.clone()).collect();
        classes.sort();
        classes.dedup();
        // every label is in `classes`, so the search always succeeds
        let targets: Vec<usize> = data
            .iter()
            .map(|dp| classes.binary_search(&dp.label).unwrap_or(0))
            .collect();

        let mut grower = Grower {
            data,
            targets: &targets,
            n_classes: classes.len(),
            n_features,
            max_features: params.max_features.resolve(n_features),
            params,
            rng,
            nodes: Vec::new(),
        };
        let root = grower.grow(indices.to_vec());
        let nodes = grower.nodes;

        Ok(Self {
            classes,
            nodes,
            root,
            n_features,
        })
    }

    /// Predicts the label for a single point by walking from the root to a leaf.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::MismatchedDimensions` if `features` has the wrong length.
    pub fn predict(&self, features: ArrayView1<F>) -> Result<&L, TreeError> {
        if features.len() != self.n_features {
            return Err(TreeError::MismatchedDimensions);
        }
        let mut node = self.root;
        loop {
            match &self.nodes[node] {
                Node::Leaf { class, .. } => return Ok(&self.classes[*class]),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Sorted, de-duplicated labels seen while fitting.
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn nodes(&self) -> &[Node<F>] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path. A single leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self.root, 0)];
        while let Some((node, depth)) = pending.pop() {
            match &self.nodes[node] {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Split { left, right, .. } => {
                    pending.push((*left, depth + 1));
                    pending.push((*right, depth + 1));
                }
            }
        }
        deepest
    }
}

/// Best split found for a node.
struct Split<F> {
    feature: usize,
    threshold: F,
    impurity: f64,
}

/// Builder holding the state shared by every node of one tree.
struct Grower<'a, L, F, R>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    data: &'a [DataPoint<L, F>],
    targets: &'a [usize],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    params: &'a TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node<F>>,
}

impl<L, F, R> Grower<'_, L, F, R>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    R: RngCore + Rng,
{
    /// Grows the tree for `rows` and returns the index of its root node.
    ///
    /// Nodes come off an explicit work list, so depth is bounded by `max_depth` and not
    /// by the call stack. Each pending entry owns a reserved arena slot that is
    /// overwritten once its node is decided.
    fn grow(&mut self, rows: Vec<usize>) -> usize {
        let root = self.reserve();
        let mut pending = vec![(rows, 0usize, root)];

        while let Some((rows, depth, slot)) = pending.pop() {
            let counts = self.class_counts(&rows);
            let leaf = Node::Leaf {
                class: majority_class(&counts),
                n_samples: rows.len(),
            };

            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
            if pure || depth_reached || rows.len() < self.params.min_samples_split {
                self.nodes[slot] = leaf;
                continue;
            }
            let Some(split) = self.best_split(&rows, &counts) else {
                self.nodes[slot] = leaf;
                continue;
            };

            let data = self.data;
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&i| data[i].features[split.feature] <= split.threshold);

            let left = self.reserve();
            let right = self.reserve();
            self.nodes[slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            // left is popped first, matching a depth-first left-to-right walk
            pending.push((right_rows, depth + 1, right));
            pending.push((left_rows, depth + 1, left));
        }
        root
    }

    fn reserve(&mut self) -> usize {
        self.nodes.push(Node::Leaf {
            class: 0,
            n_samples: 0,
        });
        self.nodes.len() - 1
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in rows {
            counts[self.targets[i]] += 1;
        }
        counts
    }

    /// Scans candidate features in random order for the threshold with the lowest
    /// weighted Gini impurity. Constant features are skipped and do not count
    /// towards `max_features`.
    fn best_split(&mut self, rows: &[usize], parent_counts: &[usize]) -> Option<Split<F>> {
        let mut order: Vec<usize> = (0..self.n_features).collect();
        order.shuffle(&mut *self.rng);

        let n = rows.len() as f64;
        let two = F::one() + F::one();
        let mut best: Option<Split<F>> = None;
        let mut visited = 0;
        let mut column: Vec<(F, usize)> = Vec::with_capacity(rows.len());

        for feature in order {
            if visited == self.max_features {
                break;
            }

            column.clear();
            column.extend(
                rows.iter()
                    .map(|&i| (self.data[i].features[feature], self.targets[i])),
            );
            column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            if column[0].0 == column[column.len() - 1].0 {
                continue;
            }
            visited += 1;

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent_counts.to_vec();
            for pos in 0..column.len() - 1 {
                let (value, class) = column[pos];
                left[class] += 1;
                right[class] -= 1;

                let next = column[pos + 1].0;
                if value == next {
                    continue;
                }

                let n_left = (pos + 1) as f64;
                let n_right = n - n_left;
                let impurity = (n_left * gini(&left, n_left) + n_right * gini(&right, n_right)) / n;
                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    let mut threshold = (value + next) / two;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

/// Gini impurity of a class histogram holding `total` samples.
fn gini(counts: &[usize], total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Index of the most frequent class; ties go to the lowest index.
fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> Vec<DataPoint<&'static str, f64>> {
        vec![
            DataPoint::new(array![1.0], "A"),
            DataPoint::new(array![2.0], "A"),
            DataPoint::new(array![3.0], "A"),
            DataPoint::new(array![8.0], "B"),
            DataPoint::new(array![9.0], "B"),
            DataPoint::new(array![10.0], "B"),
        ]
    }

    #[test]
    fn test_single_split_on_separable_data() {
        let data = separable_data();
        let tree = DecisionTree::fit_with_seed(&data, &TreeParams::default(), 7).unwrap();

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(*tree.predict(array![2.5].view()).unwrap(), "A");
        assert_eq!(*tree.predict(array![8.5].view()).unwrap(), "B");

        let threshold = tree
            .nodes()
            .iter()
            .find_map(|node| match node {
                Node::Split { threshold, .. } => Some(*threshold),
                Node::Leaf { .. } => None,
            })
            .unwrap();
        approx::assert_abs_diff_eq!(threshold, 5.5);
    }

    #[test]
    fn test_xor_needs_two_levels() {
        let data = vec![
            DataPoint::new(array![0.0, 0.0], "A"),
            DataPoint::new(array![1.0, 1.0], "A"),
            DataPoint::new(array![0.0, 1.0], "B"),
            DataPoint::new(array![1.0, 0.0], "B"),
        ];
        let tree = DecisionTree::fit_with_seed(&data, &TreeParams::default(), 1).unwrap();

        assert_eq!(tree.depth(), 2);
        for dp in &data {
            assert_eq!(tree.predict(dp.features.view()).unwrap(), &dp.label);
        }
    }

    #[test]
    fn test_max_depth_zero_gives_majority_leaf() {
        let data = vec![
            DataPoint::new(array![1.0], "A"),
            DataPoint::new(array![2.0], "A"),
            DataPoint::new(array![9.0], "B"),
        ];
        let params = TreeParams::new().max_depth(Some(0));
        let tree = DecisionTree::fit_with_seed(&data, &params, 0).unwrap();

        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(*tree.predict(array![9.0].view()).unwrap(), "A");
    }

    #[test]
    fn test_majority_tie_goes_to_smallest_label() {
        let data = vec![
            DataPoint::new(array![5.0], "B"),
            DataPoint::new(array![1.0], "A"),
        ];
        let params = TreeParams::new().max_depth(Some(0));
        let tree = DecisionTree::fit_with_seed(&data, &params, 0).unwrap();
        assert_eq!(*tree.predict(array![5.0].view()).unwrap(), "A");
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let data = vec![
            DataPoint::new(array![1.0, 1.0], "A"),
            DataPoint::new(array![1.0, 1.0], "B"),
            DataPoint::new(array![1.0, 1.0], "B"),
        ];
        let tree = DecisionTree::fit_with_seed(&data, &TreeParams::default(), 0).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(*tree.predict(array![1.0, 1.0].view()).unwrap(), "B");
    }

    #[test]
    fn test_constant_feature_does_not_use_up_max_features() {
        // Feature 0 is constant, so a one-feature budget must still reach feature 1.
        let data = vec![
            DataPoint::new(array![0.0, 0.0], "A"),
            DataPoint::new(array![0.0, 1.0], "B"),
        ];
        let params = TreeParams::new().max_features(MaxFeatures::Count(1));
        for seed in 0..8 {
            let tree = DecisionTree::fit_with_seed(&data, &params, seed).unwrap();
            assert_eq!(tree.n_leaves(), 2);
        }
    }

    #[test]
    fn test_fit_on_repeated_indices() {
        let data = separable_data();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let tree =
            DecisionTree::fit_on_indices(&data, &[4, 4, 5], &TreeParams::default(), &mut rng)
                .unwrap();

        // only "B" rows were sampled, but the class list still covers all of `data`
        assert_eq!(tree.classes(), &["A", "B"]);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(*tree.predict(array![1.0].view()).unwrap(), "B");
    }

    #[test]
    fn test_same_seed_same_tree() {
        let data = vec![
            DataPoint::new(array![1.0, 3.0, 0.0], 0),
            DataPoint::new(array![2.0, 1.0, 1.0], 1),
            DataPoint::new(array![3.0, 2.0, 0.0], 0),
            DataPoint::new(array![4.0, 5.0, 1.0], 1),
            DataPoint::new(array![5.0, 4.0, 1.0], 0),
        ];
        let params = TreeParams::new().max_features(MaxFeatures::Sqrt);
        let a = DecisionTree::fit_with_seed(&data, &params, 99).unwrap();
        let b = DecisionTree::fit_with_seed(&data, &params, 99).unwrap();
        assert_eq!(a.nodes(), b.nodes());
    }

    #[test]
    fn test_resolve_max_features() {
        assert_eq!(MaxFeatures::All.resolve(7), 7);
        assert_eq!(MaxFeatures::Sqrt.resolve(5), 2);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
        assert_eq!(MaxFeatures::Count(10).resolve(4), 4);
        assert_eq!(MaxFeatures::Count(0).resolve(4), 1);
    }

    #[test]
    fn test_unlimited_depth_on_alternating_labels() {
        // neighbouring rows always differ in label, so every leaf holds a single row
        let n = 3000;
        let data: Vec<DataPoint<usize, f64>> = (0..n)
            .map(|i| DataPoint::new(array![i as f64], i % 2))
            .collect();
        let tree = DecisionTree::fit_with_seed(&data, &TreeParams::default(), 5).unwrap();

        assert_eq!(tree.n_leaves(), n);
        assert!(tree.depth() >= 12);
        for dp in &data {
            assert_eq!(tree.predict(dp.features.view()).unwrap(), &dp.label);
        }
    }

    #[test]
    fn test_errors() {
        let empty: Vec<DataPoint<&str, f64>> = vec![];
        assert_eq!(
            DecisionTree::fit_with_seed(&empty, &TreeParams::default(), 0).unwrap_err(),
            TreeError::EmptyDataSet
        );

        let ragged = vec![
            DataPoint::new(array![1.0, 2.0], "A"),
            DataPoint::new(array![3.0], "B"),
        ];
        assert_eq!(
            DecisionTree::fit_with_seed(&ragged, &TreeParams::default(), 0).unwrap_err(),
            TreeError::MismatchedDimensions
        );

        let with_nan = vec![
            DataPoint::new(array![1.0], "A"),
            DataPoint::new(array![f64::NAN], "B"),
        ];
        assert_eq!(
            DecisionTree::fit_with_seed(&with_nan, &TreeParams::default(), 0).unwrap_err(),
            TreeError::NonFiniteFeature { row: 1, feature: 0 }
        );

        let data = separable_data();
        let params = TreeParams::new().min_samples_split(1);
        assert_eq!(
            DecisionTree::fit_with_seed(&data, &params, 0).unwrap_err(),
            TreeError::InvalidMinSamplesSplit
        );

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert_eq!(
            DecisionTree::fit_on_indices(&data, &[0, 6], &TreeParams::default(), &mut rng)
                .unwrap_err(),
            TreeError::InvalidIndex(6)
        );

        let tree = DecisionTree::fit_with_seed(&data, &TreeParams::default(), 0).unwrap();
        assert_eq!(
            tree.predict(array![1.0, 2.0].view()).unwrap_err(),
            TreeError::MismatchedDimensions
        );
    }
}
