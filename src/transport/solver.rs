use super::geometry::Geometry;
use super::sinkhorn::Sinkhorn;
use super::solution::Solution;
use crate::Energy;
use crate::Entropy;
use crate::Error;
use crate::Mass;
use crate::Result;
use ndarray::Array2;
use ndarray::ArrayView1;
use serde::Deserialize;
use serde::Serialize;

/// Anything that turns a geometry and two marginals into a coupling.
pub trait Solver: Sync {
    fn solve(&self, geometry: &Geometry, a: ArrayView1<'_, Mass>, b: ArrayView1<'_, Mass>) -> Result<Solution>;
}

/// Normalization applied to ground costs before solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleCost {
    #[default]
    Unit,
    Mean,
    Max,
    Median,
}

impl ScaleCost {
    /// divide by the chosen statistic. degenerate statistics leave costs untouched.
    pub fn apply(&self, cost: Array2<Energy>) -> Array2<Energy> {
        let scale = match self {
            Self::Unit => return cost,
            Self::Mean => cost.mean().unwrap_or(0.),
            Self::Max => cost.iter().copied().fold(0., Energy::max),
            Self::Median => {
                let mut sorted = cost.iter().copied().collect::<Vec<_>>();
                sorted.sort_by(|a, b| a.total_cmp(b));
                match sorted.len() {
                    0 => 0.,
                    n if n % 2 == 1 => sorted[n / 2],
                    n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.,
                }
            }
        };
        match scale > 0. && scale.is_finite() {
            true => cost / scale,
            false => {
                log::debug!("{:<32}{:<32}", "skipping degenerate cost scale", scale);
                cost
            }
        }
    }
}

/// Entropic regularization must be strictly positive and finite.
pub fn validate_epsilon(epsilon: Entropy) -> Result<Entropy> {
    match epsilon > 0. && epsilon.is_finite() {
        true => Ok(epsilon),
        false => Err(Error::Value(format!(
            "`epsilon` must be positive and finite, found {}",
            epsilon
        ))),
    }
}

/// Hyperparameters of the entropic solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub epsilon: Entropy,
    pub max_iterations: usize,
    pub tolerance: Energy,
    pub scale_cost: ScaleCost,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: crate::SINKHORN_EPSILON,
            max_iterations: crate::SINKHORN_ITERATIONS,
            tolerance: crate::SINKHORN_TOLERANCE,
            scale_cost: ScaleCost::default(),
        }
    }
}

/// Balanced log-domain Sinkhorn.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SinkhornSolver {
    config: SolverConfig,
}

impl From<SolverConfig> for SinkhornSolver {
    fn from(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl SinkhornSolver {
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Solver for SinkhornSolver {
    fn solve(&self, geometry: &Geometry, a: ArrayView1<'_, Mass>, b: ArrayView1<'_, Mass>) -> Result<Solution> {
        let epsilon = validate_epsilon(self.config.epsilon)?;
        if geometry.shape() != (a.len(), b.len()) {
            return Err(Error::Value(format!(
                "geometry of shape {:?} does not match marginals of length ({}, {})",
                geometry.shape(),
                a.len(),
                b.len()
            )));
        }
        if a.sum() <= 0. || b.sum() <= 0. {
            return Err(Error::Value("marginals must carry positive mass".into()));
        }
        let ref cost = self.config.scale_cost.apply(geometry.cost(epsilon)?);
        let sinkhorn = Sinkhorn::new(cost.view(), a, b, epsilon)
            .with_iterations(self.config.max_iterations)
            .with_tolerance(self.config.tolerance)
            .minimize();
        let distance = sinkhorn.distance();
        let converged = sinkhorn.converged();
        let steps = sinkhorn.steps();
        Ok(Solution::solved(Array2::from(sinkhorn), distance, converged, steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TaggedArray;
    use ndarray::array;

    #[test]
    fn median_scaling() {
        let cost = array![[1., 2.], [3., 10.]];
        assert_eq!(ScaleCost::Median.apply(cost.clone()), &cost / 2.5);
        assert_eq!(ScaleCost::Max.apply(cost.clone()), &cost / 10.);
        assert_eq!(ScaleCost::Unit.apply(Array2::<f64>::zeros((1, 1))), Array2::<f64>::zeros((1, 1)));
    }

    #[test]
    fn config_defaults_from_json() {
        let config = serde_json::from_str::<SolverConfig>(r#"{"scale_cost": "mean"}"#).unwrap();
        assert_eq!(config.scale_cost, ScaleCost::Mean);
        assert_eq!(config.max_iterations, crate::SINKHORN_ITERATIONS);
    }

    #[test]
    fn solver_respects_iteration_cap() {
        let geometry = Geometry::Precomputed(TaggedArray::cost(array![[0., 1.], [1., 0.]]));
        let a = array![0.5, 0.5];
        let solver = SinkhornSolver::from(SolverConfig {
            max_iterations: 2,
            ..SolverConfig::default()
        });
        let solution = solver.solve(&geometry, a.view(), a.view()).unwrap();
        assert!(solution.iterations() <= 2);
        assert_eq!(solution.coupling().dim(), (2, 2));
    }

    #[test]
    fn degenerate_epsilon_is_rejected() {
        let geometry = Geometry::Precomputed(TaggedArray::cost(array![[0., 1.], [1., 0.]]));
        let a = array![0.5, 0.5];
        for epsilon in [0., -1., f64::NAN, f64::INFINITY] {
            let solver = SinkhornSolver::from(SolverConfig {
                epsilon,
                ..SolverConfig::default()
            });
            let result = solver.solve(&geometry, a.view(), a.view());
            assert!(matches!(result, Err(Error::Value(_))));
        }
    }

    #[test]
    fn mismatched_marginals_fail() {
        let geometry = Geometry::Precomputed(TaggedArray::cost(array![[0., 1.]]));
        let a = array![1.];
        let solver = SinkhornSolver::default();
        assert!(solver.solve(&geometry, a.view(), a.view()).is_err());
    }
}
