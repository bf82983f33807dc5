pub mod harmonics;
pub mod wigner;

pub use harmonics::{SphericalHarmonicAccumulator, harmonics_for_direction, ql_from_qlm};
pub use wigner::{WignerTable, WignerTerm};
