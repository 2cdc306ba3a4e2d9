use crate::Error;
use crate::Result;
use ndarray::Array2;
use ndarray::ArrayD;
use ndarray::Ix2;
use serde::Deserialize;
use serde::Serialize;

/// Compressed sparse row matrix.
///
/// `indptr` has `rows + 1` entries; row `i` owns
/// `indices[indptr[i]..indptr[i + 1]]` and the matching `data` slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CsrParts")]
pub struct Csr {
    shape: (usize, usize),
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl Csr {
    pub fn new(
        shape: (usize, usize),
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self> {
        if indptr.len() != shape.0 + 1 {
            return Err(Error::Value(format!(
                "expected {} row pointers, found {}",
                shape.0 + 1,
                indptr.len()
            )));
        }
        if indices.len() != data.len() || indptr.last().copied() != Some(data.len()) {
            return Err(Error::Value("sparse indices and data disagree in length".into()));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::Value("sparse row pointers must be nondecreasing".into()));
        }
        if indices.iter().any(|&j| j >= shape.1) {
            return Err(Error::Value("sparse column index out of bounds".into()));
        }
        Ok(Self {
            shape,
            indptr,
            indices,
            data,
        })
    }
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }
    pub fn nnz(&self) -> usize {
        self.data.len()
    }
    /// dense copy, summing duplicate entries
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros(self.shape);
        for i in 0..self.shape.0 {
            for k in self.indptr[i]..self.indptr[i + 1] {
                dense[[i, self.indices[k]]] += self.data[k];
            }
        }
        dense
    }
}

/// unchecked serialized form, validated through [`Csr::new`]
#[derive(Deserialize)]
struct CsrParts {
    shape: (usize, usize),
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl TryFrom<CsrParts> for Csr {
    type Error = Error;
    fn try_from(parts: CsrParts) -> Result<Self> {
        Self::new(parts.shape, parts.indptr, parts.indices, parts.data)
    }
}

impl From<&Array2<f64>> for Csr {
    fn from(dense: &Array2<f64>) -> Self {
        let mut indptr = vec![0];
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for row in dense.rows() {
            row.iter()
                .enumerate()
                .filter(|(_, x)| **x != 0.)
                .for_each(|(j, x)| {
                    indices.push(j);
                    data.push(*x);
                });
            indptr.push(data.len());
        }
        Self {
            shape: dense.dim(),
            indptr,
            indices,
            data,
        }
    }
}

/// A numeric container stored on a dataset attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Container {
    Dense(ArrayD<f64>),
    Sparse(Csr),
}

impl Container {
    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }
    /// number of leading entries (rows)
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(array) => array.shape().first().copied().unwrap_or(0),
            Self::Sparse(csr) => csr.shape().0,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// densify and coerce to rank 2. vectors become a single column.
    pub fn to_2d(&self) -> Result<Array2<f64>> {
        match self {
            Self::Sparse(csr) => Ok(csr.to_dense()),
            Self::Dense(array) => match array.ndim() {
                1 => Array2::from_shape_vec((array.len(), 1), array.iter().copied().collect())
                    .map_err(|e| Error::Value(e.to_string())),
                2 => array
                    .clone()
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| Error::Value(e.to_string())),
                n => Err(Error::Value(format!("expected a 2D array, found {}D", n))),
            },
        }
    }
}

impl From<Array2<f64>> for Container {
    fn from(array: Array2<f64>) -> Self {
        Self::Dense(array.into_dyn())
    }
}

impl From<ndarray::Array1<f64>> for Container {
    fn from(array: ndarray::Array1<f64>) -> Self {
        Self::Dense(array.into_dyn())
    }
}

impl From<Csr> for Container {
    fn from(csr: Csr) -> Self {
        Self::Sparse(csr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn sparse_densifies_to_source() {
        let dense = array![[0., 1.5, 0.], [2., 0., 0.], [0., 0., 0.]];
        let csr = Csr::from(&dense);
        assert_eq!(csr.nnz(), 2);
        assert_eq!(csr.to_dense(), dense);
        assert_eq!(Container::from(csr).to_2d().unwrap(), dense);
    }

    #[test]
    fn vectors_become_columns() {
        let column = Container::from(array![1., 2., 3.]).to_2d().unwrap();
        assert_eq!(column.dim(), (3, 1));
        assert_eq!(column[[2, 0]], 3.);
    }

    #[test]
    fn cubes_are_rejected() {
        let cube = Container::Dense(ArrayD::zeros(vec![2, 2, 2]));
        assert!(matches!(cube.to_2d(), Err(Error::Value(_))));
    }

    #[test]
    fn malformed_csr_is_rejected() {
        assert!(Csr::new((2, 2), vec![0, 1], vec![0], vec![1.]).is_err());
        assert!(Csr::new((1, 2), vec![0, 1], vec![5], vec![1.]).is_err());
        assert!(Csr::new((1, 2), vec![0, 1], vec![1], vec![1.]).is_ok());
    }
}
