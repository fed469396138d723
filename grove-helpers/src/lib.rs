use ndarray::NdFloat;

mod common;

pub use common::{class_counts, DataPoint};

/// Feature scalar shared by every algorithm crate in the workspace.
///
/// Trees only compare, average and test features for finiteness, all of which
/// `NdFloat` already provides.
pub trait Float: NdFloat {}

impl Float for f32 {}

impl Float for f64 {}
