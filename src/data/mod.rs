//! Binding annotated cell data into tagged numeric arrays.
//!
//! A [`DataPointer`] names an attribute of a [`Dataset`] and resolves it,
//! through an injected [`LossRegistry`], into a [`TaggedArray`] whose tag says
//! whether it holds raw features or precomputed costs.
pub mod anndata;
pub use anndata::*;

pub mod column;
pub use column::*;

pub mod container;
pub use container::*;

pub mod loss;
pub use loss::*;

pub mod pca;
pub use pca::*;

pub mod pointer;
pub use pointer::*;

pub mod tagged;
pub use tagged::*;
