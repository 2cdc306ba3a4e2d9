use crate::Energy;
use crate::Error;
use crate::Result;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Axis;
use serde::Deserialize;
use serde::Serialize;

/// Semantic role of a tagged array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tag {
    /// raw features, one row per cell
    #[default]
    PointCloud,
    /// precomputed pairwise costs
    CostMatrix,
    /// precomputed pairwise affinities, `exp(-cost / ε)`
    Kernel,
    /// regular grid geometry
    Grid,
}

/// Ground cost between two point clouds sharing a feature space.
pub type LossFn = fn(ArrayView2<'_, f64>, ArrayView2<'_, f64>) -> Array2<Energy>;

/// A named loss resolved from the registry. Equality is by name.
#[derive(Clone)]
pub struct Loss {
    name: String,
    f: LossFn,
}

impl Loss {
    pub fn new(name: &str, f: LossFn) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// pairwise cost between rows of `x` and rows of `y`
    pub fn cost(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<Array2<Energy>> {
        match x.ncols() == y.ncols() {
            true => Ok((self.f)(x, y)),
            false => Err(Error::Value(format!(
                "`{}` needs matching feature dimensions, found {} and {}",
                self.name,
                x.ncols(),
                y.ncols()
            ))),
        }
    }
}

impl PartialEq for Loss {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::fmt::Debug for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Loss").field(&self.name).finish()
    }
}

/// Rank-2 numeric array with its semantic tag and deferred loss.
///
/// Cost matrices never carry a loss: their entries already are costs.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedArray {
    values: Array2<f64>,
    tag: Tag,
    loss: Option<Loss>,
}

impl TaggedArray {
    pub fn new(values: Array2<f64>, tag: Tag, loss: Option<Loss>) -> Result<Self> {
        match (tag, loss.is_some()) {
            (Tag::CostMatrix, true) => Err(Error::Value(
                "cost matrices are already costs and cannot carry a loss".into(),
            )),
            _ => Ok(Self { values, tag, loss }),
        }
    }
    /// precomputed cost matrix
    pub fn cost(values: Array2<Energy>) -> Self {
        Self {
            values,
            tag: Tag::CostMatrix,
            loss: None,
        }
    }
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
    pub fn tag(&self) -> Tag {
        self.tag
    }
    pub fn loss(&self) -> Option<&Loss> {
        self.loss.as_ref()
    }
    pub fn is_point_cloud(&self) -> bool {
        self.tag == Tag::PointCloud
    }
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// rows at the given indices
    pub fn rows(&self, rows: &[usize]) -> Self {
        Self {
            values: self.values.select(Axis(0), rows),
            tag: self.tag,
            loss: self.loss.clone(),
        }
    }
    /// `rows × cols` block of a pairwise array
    pub fn block(&self, rows: &[usize], cols: &[usize]) -> Result<Self> {
        match self.tag {
            Tag::CostMatrix | Tag::Kernel => Ok(Self {
                values: self.values.select(Axis(0), rows).select(Axis(1), cols),
                tag: self.tag,
                loss: self.loss.clone(),
            }),
            tag => Err(Error::Value(format!("{:?} arrays are not pairwise", tag))),
        }
    }
    /// concrete ground cost against another point cloud, using this array's loss
    pub fn cost_to(&self, other: &Self) -> Result<Array2<Energy>> {
        match (self.tag, other.tag, self.loss.as_ref()) {
            (Tag::PointCloud, Tag::PointCloud, Some(loss)) => {
                loss.cost(self.values.view(), other.values.view())
            }
            (Tag::PointCloud, Tag::PointCloud, None) => {
                Err(Error::Value("point clouds need a loss to derive costs".into()))
            }
            (a, b, _) => Err(Error::Value(format!(
                "cannot derive costs between {:?} and {:?}",
                a, b
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn manhattan(x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<f64> {
        Array2::from_shape_fn((x.nrows(), y.nrows()), |(i, j)| {
            (&x.row(i) - &y.row(j)).mapv(f64::abs).sum()
        })
    }

    #[test]
    fn cost_matrices_reject_losses() {
        let loss = Loss::new("manhattan", manhattan);
        assert!(TaggedArray::new(array![[0.]], Tag::CostMatrix, Some(loss.clone())).is_err());
        assert!(TaggedArray::new(array![[0.]], Tag::PointCloud, Some(loss)).is_ok());
    }

    #[test]
    fn point_clouds_derive_costs() {
        let loss = Loss::new("manhattan", manhattan);
        let x = TaggedArray::new(array![[0., 0.], [1., 1.]], Tag::PointCloud, Some(loss.clone()));
        let y = TaggedArray::new(array![[2., 0.]], Tag::PointCloud, Some(loss));
        let cost = x.unwrap().cost_to(&y.unwrap()).unwrap();
        assert_eq!(cost, array![[2.], [2.]]);
    }

    #[test]
    fn blocks_only_for_pairwise_arrays() {
        let c = TaggedArray::cost(array![[0., 1., 2.], [1., 0., 3.], [2., 3., 0.]]);
        assert_eq!(c.block(&[0], &[1, 2]).unwrap().values(), &array![[1., 2.]]);
        assert_eq!(c.rows(&[2]).shape(), (1, 3));
        let x = TaggedArray::new(array![[0.]], Tag::PointCloud, None).unwrap();
        assert!(x.block(&[0], &[0]).is_err());
    }
}
