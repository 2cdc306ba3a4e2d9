use super::temporal::Temporal;
use crate::transport::wasserstein;
use crate::Energy;
use crate::Entropy;
use crate::Error;
use crate::Mass;
use crate::Result;
use crate::Time;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use serde::Serialize;

/// How interpolated cells are drawn and compared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// position between source and target, computed from the times when absent
    pub interpolation_parameter: Option<f64>,
    /// defaults to the number of intermediate cells
    pub n_interpolated_cells: Option<usize>,
    pub account_for_unbalancedness: bool,
    pub posterior_marginals: bool,
    pub seed: u64,
    pub epsilon: Entropy,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            interpolation_parameter: None,
            n_interpolated_cells: None,
            account_for_unbalancedness: false,
            posterior_marginals: true,
            seed: crate::INTERPOLATION_SEED,
            epsilon: crate::DISTANCE_EPSILON,
        }
    }
}

/// Transport-quality diagnostics against held-out time points.
pub trait Distances: Temporal {
    /// Distances from growth-weighted source cells to the intermediate slice,
    /// and from the intermediate slice to the target.
    fn compute_time_point_distances(
        &self,
        source: Time,
        intermediate: Time,
        target: Time,
        posterior_marginals: bool,
        epsilon: Entropy,
    ) -> Result<(Energy, Energy)> {
        self.get_interp_param(source, intermediate, target, None)?;
        let data = self.get_data(source, intermediate, target, posterior_marginals)?;
        let source_to_intermediate = wasserstein(
            data.source.view(),
            data.intermediate.view(),
            Some(data.growth.view()),
            None,
            epsilon,
        )?;
        let intermediate_to_target =
            wasserstein(data.intermediate.view(), data.target.view(), None, None, epsilon)?;
        Ok((source_to_intermediate, intermediate_to_target))
    }

    /// Mean pairwise distance between batches observed at `time`.
    fn compute_batch_distances(&self, time: Time, batch_key: &str, epsilon: Entropy) -> Result<Energy> {
        let cells = self.cells(time)?;
        let column = self.dataset().column(batch_key)?;
        let categories = column.categories().ok_or_else(|| {
            Error::Type(format!(
                "Expected `adata.obs['{}']` to be categorical, found numeric",
                batch_key
            ))
        })?;
        let features = self.features()?.rows(cells).values().clone();
        let batches = categories
            .iter()
            .map(|c| {
                cells
                    .iter()
                    .enumerate()
                    .filter(|&(_, &i)| column.label(i) == Some(c.as_str()))
                    .map(|(k, _)| k)
                    .collect::<Vec<_>>()
            })
            .filter(|rows| !rows.is_empty())
            .map(|rows| features.select(Axis(0), &rows))
            .collect::<Vec<_>>();
        if batches.len() < 2 {
            return Err(Error::Value(format!(
                "time point {} holds {} batches, at least 2 are needed",
                time,
                batches.len()
            )));
        }
        let distances = batches
            .iter()
            .enumerate()
            .flat_map(|(i, x)| batches[i + 1..].iter().map(move |y| (x, y)))
            .map(|(x, y)| wasserstein(x.view(), y.view(), None, None, epsilon))
            .collect::<Result<Vec<_>>>()?;
        Ok(distances.iter().sum::<Energy>() / distances.len() as Energy)
    }

    /// Distance between the intermediate slice and cells interpolated along the transport map.
    fn compute_interpolated_distance(
        &self,
        source: Time,
        intermediate: Time,
        target: Time,
        config: &InterpolationConfig,
    ) -> Result<Energy> {
        let t = self.get_interp_param(source, intermediate, target, config.interpolation_parameter)?;
        let data = self.get_data(source, intermediate, target, config.posterior_marginals)?;
        let mut plan = self.transport_map(source, target)?.plan;
        if config.account_for_unbalancedness {
            plan.rows_mut()
                .into_iter()
                .zip(data.growth.iter())
                .for_each(|(mut row, g)| match *g > 0. {
                    true => row /= g.powf(1. - t),
                    false => row.fill(0.),
                });
        }
        let n = config.n_interpolated_cells.unwrap_or(data.intermediate.nrows());
        let interpolated = interpolate(&data.source, &data.target, &plan, t, n, config.seed)?;
        wasserstein(
            data.intermediate.view(),
            interpolated.view(),
            None,
            None,
            config.epsilon,
        )
    }

    /// Same as [`Distances::compute_interpolated_distance`] but pairs are drawn
    /// independently, so no solution is needed unless posterior growth is requested.
    fn compute_random_distance(
        &self,
        source: Time,
        intermediate: Time,
        target: Time,
        config: &InterpolationConfig,
    ) -> Result<Energy> {
        let t = self.get_interp_param(source, intermediate, target, config.interpolation_parameter)?;
        let x = self.slice(source)?;
        let y = self.slice(target)?;
        let z = self.slice(intermediate)?;
        let rows = match config.account_for_unbalancedness {
            true => self
                .growth_rates(source, target, config.posterior_marginals)?
                .mapv(|g| g.powf(t)),
            false => Array1::ones(x.nrows()),
        };
        let cols = crate::transport::uniform(y.nrows());
        let plan = rows
            .view()
            .insert_axis(Axis(1))
            .dot(&cols.view().insert_axis(Axis(0)));
        let n = config.n_interpolated_cells.unwrap_or(z.nrows());
        let interpolated = interpolate(&x, &y, &plan, t, n, config.seed)?;
        wasserstein(z.view(), interpolated.view(), None, None, config.epsilon)
    }
}

impl<T: Temporal> Distances for T {}

/// Draw `n` (source, target) pairs from the plan and place a cell at `(1 - t) x + t y` for each.
pub fn interpolate(
    x: &Array2<f64>,
    y: &Array2<f64>,
    plan: &Array2<Mass>,
    t: f64,
    n: usize,
    seed: u64,
) -> Result<Array2<f64>> {
    debug_assert!(plan.dim() == (x.nrows(), y.nrows()));
    let m = plan.ncols();
    let index = WeightedIndex::new(plan.iter()).map_err(|e| Error::Value(e.to_string()))?;
    let ref mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut cells = Array2::zeros((n, x.ncols()));
    cells.rows_mut().into_iter().for_each(|mut row| {
        let k = index.sample(rng);
        let (i, j) = (k / m, k % m);
        row.assign(&(&x.row(i) * (1. - t) + &y.row(j) * t));
    });
    log::debug!("{:<32}{:<32}", "interpolated cells", n);
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn interpolation_is_seeded() {
        let x = array![[0., 0.], [1., 0.]];
        let y = array![[0., 2.], [1., 2.]];
        let plan = array![[0.5, 0.], [0., 0.5]];
        let a = interpolate(&x, &y, &plan, 0.5, 16, 7).unwrap();
        let b = interpolate(&x, &y, &plan, 0.5, 16, 7).unwrap();
        assert_eq!(a, b);
        assert!(a.column(1).iter().all(|v| (v - 1.).abs() < 1e-12));
    }

    #[test]
    fn empty_plans_cannot_be_sampled() {
        let x = array![[0.]];
        let plan = array![[0.]];
        assert!(matches!(interpolate(&x, &x, &plan, 0.5, 1, 0), Err(Error::Value(_))));
    }
}
