use super::coupling::Coupling;
use super::density::Density;
use super::measure::Measure;
use crate::Energy;
use crate::Entropy;
use crate::Mass;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;

/// Entropic optimal transport via Sinkhorn iteration.
///
/// Both marginals are balanced to unit mass. Potentials live in the log
/// domain, scaled by ε, so small regularization does not underflow.
///
/// # Algorithm
///
/// 1. Initialize potentials at zero
/// 2. Alternately rescale LHS and RHS potentials to match their marginals
/// 3. Stop when the row marginal violation falls below tolerance
/// 4. Read the coupling off the final potentials
pub struct Sinkhorn<'a> {
    /// Ground cost between source and target cells.
    metric: ArrayView2<'a, Energy>,
    /// Source distribution.
    mu: Array1<Mass>,
    /// Target distribution.
    nu: Array1<Mass>,
    /// LHS potential (dual variable).
    lhs: Array1<Entropy>,
    /// RHS potential (dual variable).
    rhs: Array1<Entropy>,
    epsilon: Entropy,
    iterations: usize,
    tolerance: Energy,
    steps: usize,
    error: Energy,
}

impl<'a> Sinkhorn<'a> {
    pub fn new(
        metric: ArrayView2<'a, Energy>,
        mu: ArrayView1<'_, Mass>,
        nu: ArrayView1<'_, Mass>,
        epsilon: Entropy,
    ) -> Self {
        debug_assert!(metric.dim() == (mu.len(), nu.len()));
        Self {
            metric,
            mu: super::density::normalize(&mu),
            nu: super::density::normalize(&nu),
            lhs: Array1::zeros(mu.len()),
            rhs: Array1::zeros(nu.len()),
            epsilon,
            iterations: crate::SINKHORN_ITERATIONS,
            tolerance: crate::SINKHORN_TOLERANCE,
            steps: 0,
            error: Energy::INFINITY,
        }
    }
    pub fn with_iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }
    pub fn with_tolerance(self, tolerance: Energy) -> Self {
        Self { tolerance, ..self }
    }

    /// runs Sinkhorn iteration until convergence or the iteration cap
    pub fn minimize(mut self) -> Self {
        for t in 0..self.iterations {
            self.lhs = self.lhs();
            self.rhs = self.rhs();
            self.steps = t + 1;
            self.error = self.violation();
            if self.error < self.tolerance {
                break;
            }
        }
        log::debug!(
            "{:<32}{:<16}{:<16.3e}",
            "sinkhorn stopped",
            self.steps,
            self.error
        );
        self
    }
    pub fn converged(&self) -> bool {
        self.error < self.tolerance
    }
    pub fn steps(&self) -> usize {
        self.steps
    }
    pub fn mu(&self) -> &Array1<Mass> {
        &self.mu
    }
    pub fn nu(&self) -> &Array1<Mass> {
        &self.nu
    }
    /// transport cost of the current plan against its own ground metric
    pub fn distance(&self) -> Energy {
        self.cost(&self.metric)
    }

    /// computes updated LHS potential via Sinkhorn scaling
    fn lhs(&self) -> Array1<Entropy> {
        Array1::from_shape_fn(self.mu.len(), |i| {
            self.divergence(self.mu.density(i), |j| self.rhs[j] - self.regularization(i, j), self.nu.len())
        })
    }
    /// computes updated RHS potential via Sinkhorn scaling
    fn rhs(&self) -> Array1<Entropy> {
        Array1::from_shape_fn(self.nu.len(), |j| {
            self.divergence(self.nu.density(j), |i| self.lhs[i] - self.regularization(i, j), self.mu.len())
        })
    }
    /// log-scale potential update balancing one marginal constraint
    /// via a stabilized softmin over the opposing potential.
    /// massless cells get a -∞ potential and never send or receive.
    fn divergence(&self, density: Mass, energy: impl Fn(usize) -> Entropy, n: usize) -> Entropy {
        if density <= 0. {
            return Entropy::NEG_INFINITY;
        }
        let max = (0..n).map(&energy).fold(Entropy::NEG_INFINITY, Entropy::max);
        if max == Entropy::NEG_INFINITY {
            return Entropy::NEG_INFINITY;
        }
        let sum = (0..n).map(&energy).map(|e| (e - max).exp()).sum::<Entropy>();
        density.ln() - max - sum.ln()
    }
    /// regularized cost: distance / temperature
    fn regularization(&self, i: usize, j: usize) -> Entropy {
        self.metric.distance(i, j) / self.epsilon
    }
    /// L1 violation of the row marginal; columns are exact after an RHS update
    fn violation(&self) -> Energy {
        (0..self.mu.len())
            .map(|i| (0..self.nu.len()).map(|j| self.flow(i, j)).sum::<Mass>() - self.mu[i])
            .map(Energy::abs)
            .sum::<Energy>()
    }
}

impl Coupling for Sinkhorn<'_> {
    fn flow(&self, i: usize, j: usize) -> Mass {
        (self.lhs[i] + self.rhs[j] - self.regularization(i, j)).exp()
    }
    fn shape(&self) -> (usize, usize) {
        (self.mu.len(), self.nu.len())
    }
}

impl From<Sinkhorn<'_>> for Array2<Mass> {
    fn from(sinkhorn: Sinkhorn<'_>) -> Self {
        sinkhorn.plan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn plan_matches_marginals() {
        let cost = array![[0., 1., 4.], [1., 0., 1.]];
        let a = array![0.25, 0.75];
        let b = array![0.5, 0.25, 0.25];
        let sinkhorn = Sinkhorn::new(cost.view(), a.view(), b.view(), 0.1).minimize();
        assert!(sinkhorn.converged());
        let plan = sinkhorn.plan();
        let rows = plan.sum_axis(ndarray::Axis(1));
        let cols = plan.sum_axis(ndarray::Axis(0));
        rows.iter().zip(a.iter()).for_each(|(r, a)| assert!((r - a).abs() < 1e-5));
        cols.iter().zip(b.iter()).for_each(|(c, b)| assert!((c - b).abs() < 1e-5));
    }

    #[test]
    fn identical_supports_cost_nothing_at_low_temperature() {
        let cost = array![[0., 9.], [9., 0.]];
        let a = array![0.5, 0.5];
        let sinkhorn = Sinkhorn::new(cost.view(), a.view(), a.view(), 0.05).minimize();
        assert!(sinkhorn.distance() < 1e-6);
    }

    #[test]
    fn massless_cells_receive_nothing() {
        let cost = array![[1., 2.], [3., 4.]];
        let a = array![1., 0.];
        let b = array![0.5, 0.5];
        let plan = Sinkhorn::new(cost.view(), a.view(), b.view(), 1.).minimize().plan();
        assert_eq!(plan[[1, 0]], 0.);
        assert_eq!(plan[[1, 1]], 0.);
        assert!((plan.sum() - 1.).abs() < 1e-6);
    }

    #[test]
    fn unnormalized_marginals_are_balanced() {
        let cost = array![[0., 1.], [1., 0.]];
        let a = array![2., 2.];
        let b = array![1., 3.];
        let sinkhorn = Sinkhorn::new(cost.view(), a.view(), b.view(), 0.5).minimize();
        assert!((sinkhorn.plan().sum() - 1.).abs() < 1e-6);
        assert!((sinkhorn.nu()[1] - 0.75).abs() < 1e-12);
    }
}
