use super::density;
use super::sinkhorn::Sinkhorn;
use super::solver::validate_epsilon;
use crate::data::sq_euclidean;
use crate::Energy;
use crate::Entropy;
use crate::Error;
use crate::Mass;
use crate::Result;
use ndarray::ArrayView1;
use ndarray::ArrayView2;

/// Entropic transport cost between two weighted point clouds.
///
/// Ground cost is squared euclidean. Missing weights are uniform.
/// The value reported is the primal cost of the regularized plan,
/// so it is nonnegative.
pub fn wasserstein(
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    a: Option<ArrayView1<'_, Mass>>,
    b: Option<ArrayView1<'_, Mass>>,
    epsilon: Entropy,
) -> Result<Energy> {
    let epsilon = validate_epsilon(epsilon)?;
    if x.ncols() != y.ncols() {
        return Err(Error::Value(format!(
            "cannot compare {} and {} features",
            x.ncols(),
            y.ncols()
        )));
    }
    if x.nrows() == 0 || y.nrows() == 0 {
        return Err(Error::Value("cannot compare empty point clouds".into()));
    }
    let a = a.map(|a| a.to_owned()).unwrap_or_else(|| density::uniform(x.nrows()));
    let b = b.map(|b| b.to_owned()).unwrap_or_else(|| density::uniform(y.nrows()));
    if a.len() != x.nrows() || b.len() != y.nrows() {
        return Err(Error::Value("weights must match point cloud sizes".into()));
    }
    let ref cost = sq_euclidean(x, y);
    let distance = Sinkhorn::new(cost.view(), a.view(), b.view(), epsilon)
        .minimize()
        .distance();
    log::debug!("{:<32}{:<32.6}", "wasserstein distance", distance);
    Ok(distance.max(0.))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn shifted_clouds_cost_the_shift() {
        let x = array![[0.], [1.]];
        let y = array![[2.], [3.]];
        let w = wasserstein(x.view(), y.view(), None, None, 1e-2).unwrap();
        assert!((w - 4.).abs() < 1e-3);
    }

    #[test]
    fn weights_shift_the_cost() {
        let x = array![[0.], [1.]];
        let y = array![[1.]];
        let a = array![0.9, 0.1];
        let w = wasserstein(x.view(), y.view(), Some(a.view()), None, 1e-2).unwrap();
        assert!((w - 0.9).abs() < 1e-6);
    }

    #[test]
    fn feature_mismatch_fails() {
        let x = array![[0., 0.]];
        let y = array![[0.]];
        assert!(wasserstein(x.view(), y.view(), None, None, 1.).is_err());
    }

    #[test]
    fn epsilon_must_be_positive() {
        let x = array![[0.], [1.]];
        let zero = wasserstein(x.view(), x.view(), None, None, 0.);
        let negative = wasserstein(x.view(), x.view(), None, None, -1.);
        assert!(matches!(zero, Err(Error::Value(_))));
        assert!(matches!(negative, Err(Error::Value(_))));
    }
}
