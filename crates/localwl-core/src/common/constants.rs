//! Numeric constants shared by the harmonics, Wigner and engine kernels.

pub const PI: f64 = std::f64::consts::PI;
pub const FOUR_PI: f64 = 4.0 * PI;

/// Largest degree accepted by the Wigner table.
///
/// The alternating Racah sum loses precision to cancellation well before the
/// log-factorials themselves overflow; beyond this degree the table is refused.
pub const MAX_DEGREE: usize = 32;

/// Relative slack applied to the nearest-neighbor search radius estimate.
pub const NEAREST_RADIUS_SLACK: f64 = 1.5;
