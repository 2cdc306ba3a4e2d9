use crate::Energy;
use ndarray::Array2;
use ndarray::ArrayView2;

/// generalization of *element-wise* ground cost between
/// source cell `i` and target cell `j`.
///
/// source and target index different cell sets, so the
/// measure is rectangular in general.
pub trait Measure {
    fn distance(&self, i: usize, j: usize) -> Energy;
}

impl Measure for Array2<Energy> {
    fn distance(&self, i: usize, j: usize) -> Energy {
        self[[i, j]]
    }
}

impl Measure for ArrayView2<'_, Energy> {
    fn distance(&self, i: usize, j: usize) -> Energy {
        self[[i, j]]
    }
}
