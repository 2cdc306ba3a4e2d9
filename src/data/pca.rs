use crate::Error;
use crate::Result;
use nalgebra::DMatrix;
use nalgebra::SymmetricEigen;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

/// Joint principal components of two point clouds.
///
/// Both clouds are stacked, centered together and projected onto the
/// leading eigenvectors of their covariance. Fewer than `n_comps` columns
/// come back when the variance runs out or when `n_comps` exceeds the rank
/// bound `min(n, d)`.
pub struct Pca {
    n_comps: usize,
}

impl Pca {
    pub fn new(n_comps: usize) -> Result<Self> {
        match n_comps {
            0 => Err(Error::Value("`n_comps` must be positive".into())),
            n_comps => Ok(Self { n_comps }),
        }
    }

    /// project `x` and `y` into their shared component space
    pub fn project(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        if x.ncols() != y.ncols() {
            return Err(Error::Value(format!(
                "cannot stack {} and {} features",
                x.ncols(),
                y.ncols()
            )));
        }
        let joint = ndarray::concatenate(Axis(0), &[x.view(), y.view()])
            .map_err(|e| Error::Value(e.to_string()))?;
        let n = joint.nrows();
        let mean = joint
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::Value("cannot project empty point clouds".into()))?;
        let centered = &joint - &mean;
        let components = self.components(&centered);
        let projected = centered.dot(&components);
        let (x, y) = projected.view().split_at(Axis(0), x.nrows());
        log::debug!("{:<32}{:<32}", "projected onto components", components.ncols());
        debug_assert!(x.nrows() + y.nrows() == n);
        Ok((x.to_owned(), y.to_owned()))
    }

    /// columns are unit eigenvectors ordered by decreasing eigenvalue
    fn components(&self, centered: &Array2<f64>) -> Array2<f64> {
        let (n, d) = centered.dim();
        let k = self.n_comps.min(n).min(d);
        let covariance = centered.t().dot(centered) / (n.max(2) - 1) as f64;
        let eigen = SymmetricEigen::new(DMatrix::from_fn(d, d, |i, j| covariance[[i, j]]));
        let mut order = (0..d).collect::<Vec<_>>();
        order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));
        let order = order
            .into_iter()
            .take(k)
            .take_while(|&i| eigen.eigenvalues[i] >= crate::PCA_TOLERANCE)
            .collect::<Vec<_>>();
        let mut components = Array2::zeros((d, order.len()));
        for (j, &i) in order.iter().enumerate() {
            let v = Array1::from_iter(eigen.eigenvectors.column(i).iter().copied());
            components.column_mut(j).assign(&Self::orient(v));
        }
        components
    }

    /// sign convention: largest-magnitude entry is positive
    fn orient(v: Array1<f64>) -> Array1<f64> {
        let pivot = v
            .iter()
            .copied()
            .fold(0., |best: f64, x| if x.abs() > best.abs() { x } else { best });
        match pivot < 0. {
            true => -v,
            false => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn projection_is_rank_bounded() {
        let x = array![[0., 0., 0.], [1., 1., 0.]];
        let y = array![[2., 2., 0.]];
        let (px, py) = Pca::new(50).unwrap().project(&x, &y).unwrap();
        assert_eq!(px.nrows(), 2);
        assert_eq!(py.nrows(), 1);
        assert_eq!(px.ncols(), 1);
    }

    #[test]
    fn first_component_preserves_collinear_distances() {
        let x = array![[0., 0.], [3., 4.]];
        let y = array![[6., 8.]];
        let (px, py) = Pca::new(1).unwrap().project(&x, &y).unwrap();
        assert!(((px[[1, 0]] - px[[0, 0]]).abs() - 5.).abs() < 1e-6);
        assert!(((py[[0, 0]] - px[[0, 0]]).abs() - 10.).abs() < 1e-6);
    }

    #[test]
    fn leading_axis_need_not_align_with_features() {
        let u = array![8., -7.] / 113f64.sqrt();
        let v = array![7., 8.] / 113f64.sqrt();
        let a = 1.1f64.sqrt();
        let x = ndarray::stack(Axis(0), &[(&u * a).view(), (&u * -a).view()]).unwrap();
        let y = ndarray::stack(Axis(0), &[v.view(), (-&v).view()]).unwrap();
        let (px, py) = Pca::new(1).unwrap().project(&x, &y).unwrap();
        assert!((px[[0, 0]].abs() - a).abs() < 1e-9);
        assert!((px[[0, 0]] + px[[1, 0]]).abs() < 1e-9);
        assert!(py.iter().all(|p| p.abs() < 1e-9));
    }

    #[test]
    fn mismatched_features_fail() {
        let x = array![[0., 0.]];
        let y = array![[0.]];
        assert!(Pca::new(2).unwrap().project(&x, &y).is_err());
        assert!(Pca::new(0).is_err());
    }
}
