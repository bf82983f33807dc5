pub mod special;

pub use special::{SphericalHarmonicAccumulator, WignerTable, ql_from_qlm};
