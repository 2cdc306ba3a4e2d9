//! Couplings between time slices and the entropic solver that produces them.
pub mod coupling;
pub use coupling::*;

pub mod density;
pub use density::*;

pub mod geometry;
pub use geometry::*;

pub mod measure;
pub use measure::*;

pub mod sinkhorn;
pub use sinkhorn::*;

pub mod solution;
pub use solution::*;

pub mod solver;
pub use solver::*;

pub mod wasserstein;
pub use wasserstein::*;
