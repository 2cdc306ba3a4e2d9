use super::measure::Measure;
use crate::Energy;
use crate::Mass;
use ndarray::Array2;

/// A transport plan between source cells (rows) and target cells (columns).
pub trait Coupling {
    /// mass moved from source cell `i` to target cell `j`
    fn flow(&self, i: usize, j: usize) -> Mass;
    /// (source cells, target cells)
    fn shape(&self) -> (usize, usize);

    /// dense plan. default materializes `flow` over the whole support.
    fn plan(&self) -> Array2<Mass> {
        Array2::from_shape_fn(self.shape(), |(i, j)| self.flow(i, j))
    }
    /// expected ground cost under this plan.
    fn cost(&self, measure: &impl Measure) -> Energy {
        let (n, m) = self.shape();
        (0..n)
            .flat_map(|i| (0..m).map(move |j| (i, j)))
            .map(|(i, j)| self.flow(i, j) * measure.distance(i, j))
            .inspect(|x| debug_assert!(x.is_finite()))
            .sum::<Energy>()
    }
}
