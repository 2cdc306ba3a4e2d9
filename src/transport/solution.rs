use crate::Energy;
use crate::Mass;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use serde::Deserialize;
use serde::Serialize;

/// A solved transport plan between two time slices.
///
/// Rows index source cells and columns index target cells.
/// The marginals are whatever the plan actually moves, so a coupling
/// injected from outside carries its own row and column sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    coupling: Array2<Mass>,
    a: Array1<Mass>,
    b: Array1<Mass>,
    cost: Option<Energy>,
    converged: bool,
    iterations: usize,
}

impl Solution {
    /// output of an iterative solver
    pub fn solved(coupling: Array2<Mass>, cost: Energy, converged: bool, iterations: usize) -> Self {
        Self {
            cost: Some(cost),
            converged,
            iterations,
            ..Self::from(coupling)
        }
    }
    pub fn coupling(&self) -> &Array2<Mass> {
        &self.coupling
    }
    /// mass leaving each source cell
    pub fn a(&self) -> &Array1<Mass> {
        &self.a
    }
    /// mass arriving at each target cell
    pub fn b(&self) -> &Array1<Mass> {
        &self.b
    }
    pub fn cost(&self) -> Option<Energy> {
        self.cost
    }
    pub fn converged(&self) -> bool {
        self.converged
    }
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl From<Array2<Mass>> for Solution {
    fn from(coupling: Array2<Mass>) -> Self {
        debug_assert!(coupling.iter().all(|x| *x >= 0.));
        Self {
            a: coupling.sum_axis(Axis(1)),
            b: coupling.sum_axis(Axis(0)),
            coupling,
            cost: None,
            converged: true,
            iterations: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn injected_marginals_are_coupling_sums() {
        let solution = Solution::from(array![[0.1, 0.2], [0.3, 0.4]]);
        assert!((solution.a()[0] - 0.3).abs() < 1e-12);
        assert!((solution.a()[1] - 0.7).abs() < 1e-12);
        assert!((solution.b()[1] - 0.6).abs() < 1e-12);
        assert!(solution.cost().is_none());
    }
}
