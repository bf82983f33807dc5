//! Local Steinhardt `Wl` bond-order parameters for periodic particle systems.
//!
//! [`LocalWl`] finds a neighbor shell for every particle, averages the
//! spherical harmonics of its bonds and contracts them with Wigner 3-j
//! symbols into the rotation-invariant `Wl`, optionally smoothed over the
//! first shell and normalized by `Ql^3`.

pub mod common;
pub mod domain;
pub mod geometry;
pub mod lattice;
pub mod neighbors;
pub mod numerics;
pub mod order;

pub use common::{ConfigError, EngineConfig, ShellPolicy, load_engine_config};
pub use domain::{OrderError, OrderErrorCategory, OrderResult, OrderVariant};
pub use geometry::PeriodicBox;
pub use neighbors::ShellDiagnostics;
pub use order::LocalWl;
