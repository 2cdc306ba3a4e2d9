use crate::data::Tag;
use crate::data::TaggedArray;
use crate::Energy;
use crate::Entropy;
use crate::Error;
use crate::Result;
use ndarray::Array2;

/// What a transport problem is solved over.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// source and target point clouds sharing a feature space and a loss
    Linear { x: TaggedArray, y: TaggedArray },
    /// pairwise costs or affinities already sliced to `source × target`
    Precomputed(TaggedArray),
}

impl Geometry {
    /// (source cells, target cells)
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Linear { x, y } => (x.shape().0, y.shape().0),
            Self::Precomputed(array) => array.shape(),
        }
    }

    /// Ground cost matrix.
    ///
    /// Kernels are read as `K = exp(-C / ε)` and inverted at the
    /// solver's temperature, flooring at the smallest positive float.
    pub fn cost(&self, epsilon: Entropy) -> Result<Array2<Energy>> {
        match self {
            Self::Linear { x, y } => x.cost_to(y),
            Self::Precomputed(array) => match array.tag() {
                Tag::CostMatrix => Ok(array.values().clone()),
                Tag::Kernel => Ok(array
                    .values()
                    .mapv(|k| -epsilon * k.max(crate::MASS_MIN).ln())),
                tag => Err(Error::Value(format!(
                    "{:?} arrays cannot be solved as a precomputed geometry",
                    tag
                ))),
            },
        }
    }

    /// features of both slices, when this is a point-cloud geometry
    pub fn point_clouds(&self) -> Option<(&TaggedArray, &TaggedArray)> {
        match self {
            Self::Linear { x, y } => Some((x, y)),
            Self::Precomputed(_) => None,
        }
    }
}
