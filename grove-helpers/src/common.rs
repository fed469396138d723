use ndarray::Array1;
use crate::Float;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Represents a single data point with features and a label.
///
/// L: The type of the label (e.g., String, i32, enum).
/// F: The float type for the features (e.g., f32, f64).
#[derive(Debug, Clone)]
pub struct DataPoint<L, F>
where
    L: Clone + Eq + std::hash::Hash + Debug,
    F: Float,
{
    pub features: Array1<F>,
    pub label: L,
}

impl<L, F> DataPoint<L, F>
where
    L: Clone + Eq + std::hash::Hash + Debug,
    F: Float,
{
    pub fn new(features: Array1<F>, label: L) -> Self {
        DataPoint { features, label }
    }
}

/// Counts how many points carry each label, in label order.
pub fn class_counts<L, F>(data: &[DataPoint<L, F>]) -> BTreeMap<&L, usize>
where
    L: Clone + Eq + Ord + std::hash::Hash + Debug,
    F: Float,
{
    let mut counts = BTreeMap::new();
    for dp in data {
        *counts.entry(&dp.label).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_counts_are_ordered_by_label() {
        let data = vec![
            DataPoint::new(array![1.0, 0.0], "b"),
            DataPoint::new(array![0.0, 1.0], "a"),
            DataPoint::new(array![1.0, 1.0], "b"),
        ];
        let counts: Vec<_> = class_counts(&data).into_iter().collect();
        assert_eq!(counts, vec![(&"a", 1), (&"b", 2)]);
    }
}
