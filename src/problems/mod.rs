//! Time-indexed transport problems and the analyses run over their solutions.
//!
//! [`TemporalProblem`] pairs time slices under a [`Policy`], solves each pair,
//! and through the blanket [`CellTransition`], [`Distances`] and
//! [`AnnotationMapping`] traits answers questions about the resulting couplings.
pub mod annotation;
pub use annotation::*;

pub mod collection;
pub use collection::*;

pub mod distances;
pub use distances::*;

pub mod policy;
pub use policy::*;

pub mod stage;
pub use stage::*;

pub mod temporal;
pub use temporal::*;

pub mod timepoint;
pub use timepoint::*;

pub mod transition;
pub use transition::*;
