//! Temporal optimal transport over annotated single-cell data.
//!
//! Cells observed at several time points are paired into transport problems,
//! solved into couplings, and queried for group transitions, distances and
//! interpolation diagnostics.
//!
//! ## Modules
//!
//! - [`data`]: annotated datasets, tagged arrays, data pointers and losses
//! - [`transport`]: couplings, the Sinkhorn solver and Wasserstein distances
//! - [`problems`]: time-indexed problem collections and the temporal analyses
#![allow(clippy::module_inception)]

pub mod data;
pub mod error;
pub mod problems;
pub mod transport;

pub use error::Error;
pub use error::Result;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Transported mass, marginal weights and coupling entries.
pub type Mass = f64;
/// Ground costs and transport distances.
pub type Energy = f64;
/// Regularization strength and log-domain potentials.
pub type Entropy = f64;
/// Time point values as read from the temporal column.
pub type Time = f64;

// ============================================================================
// SINKHORN OPTIMAL TRANSPORT
// Entropy-regularized transport between two time slices.
// ============================================================================
/// Entropy regularization strength. Lower = sharper couplings, slower convergence.
pub const SINKHORN_EPSILON: Entropy = 1e-2;
/// Maximum Sinkhorn iterations before stopping.
pub const SINKHORN_ITERATIONS: usize = 1000;
/// Early stopping threshold on marginal constraint violation.
pub const SINKHORN_TOLERANCE: Energy = 1e-6;

// ============================================================================
// INTERPOLATION DIAGNOSTICS
// ============================================================================
/// Default seed for interpolated and random-baseline resampling.
pub const INTERPOLATION_SEED: u64 = 0;
/// Regularization used for validation distances unless overridden.
pub const DISTANCE_EPSILON: Entropy = 0.1;

// ============================================================================
// FEATURE CALLBACKS
// ============================================================================
/// Eigenvalues below this are treated as exhausted variance.
pub const PCA_TOLERANCE: Energy = 1e-12;

/// Floor for marginal and row sums before division.
pub const MASS_MIN: Mass = Mass::MIN_POSITIVE;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize terminal logging at INFO level.
#[cfg(feature = "terminal")]
pub fn log() {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    if simplelog::CombinedLogger::init(vec![term]).is_err() {
        log::debug!("logger already initialized");
    }
}
