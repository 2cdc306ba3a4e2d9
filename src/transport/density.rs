use crate::Mass;
use ndarray::Array1;
use ndarray::ArrayView1;

/// generalization of a discrete marginal over indexed cells.
///
/// for a fresh problem this is the prior weighting of source or target cells.
/// for a solved one, row and column sums of the coupling are densities too.
pub trait Density {
    fn density(&self, i: usize) -> Mass;
    /// number of indexed cells, including those without mass
    fn n(&self) -> usize;
    /// cells with positive mass
    fn support(&self) -> impl Iterator<Item = usize> {
        (0..self.n()).filter(|&i| self.density(i) > 0.)
    }
    fn mass(&self) -> Mass {
        (0..self.n()).map(|i| self.density(i)).sum()
    }
}

impl Density for Array1<Mass> {
    fn density(&self, i: usize) -> Mass {
        self.get(i).copied().unwrap_or(0.)
    }
    fn n(&self) -> usize {
        self.len()
    }
}

impl Density for ArrayView1<'_, Mass> {
    fn density(&self, i: usize) -> Mass {
        self.get(i).copied().unwrap_or(0.)
    }
    fn n(&self) -> usize {
        self.len()
    }
}

/// uniform unit mass over `n` cells
pub fn uniform(n: usize) -> Array1<Mass> {
    Array1::from_elem(n, 1. / n.max(1) as Mass)
}

/// rescale to unit mass. massless inputs stay massless.
pub fn normalize(density: &impl Density) -> Array1<Mass> {
    let mass = density.mass();
    Array1::from_shape_fn(density.n(), |i| match mass > 0. {
        true => density.density(i) / mass,
        false => 0.,
    })
}
