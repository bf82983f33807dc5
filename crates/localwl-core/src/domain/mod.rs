pub mod errors;

pub use errors::{OrderError, OrderErrorCategory, OrderResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The four per-particle quantities the engine can produce.
///
/// Every variant is the same Wigner contraction; they differ only in whether the
/// harmonics are averaged over the first shell and whether the result is scaled
/// by `Ql^3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderVariant {
    Wl,
    AveWl,
    WlNorm,
    WlAveNorm,
}

impl OrderVariant {
    pub const ALL: [Self; 4] = [Self::Wl, Self::AveWl, Self::WlNorm, Self::WlAveNorm];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wl => "Wl",
            Self::AveWl => "AveWl",
            Self::WlNorm => "WlNorm",
            Self::WlAveNorm => "WlAveNorm",
        }
    }

    pub const fn averaged(self) -> bool {
        matches!(self, Self::AveWl | Self::WlAveNorm)
    }

    pub const fn normalized(self) -> bool {
        matches!(self, Self::WlNorm | Self::WlAveNorm)
    }
}

impl Display for OrderVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Reshapes a flat `x0 y0 z0 x1 ...` buffer into points, rejecting anything
/// that is not N x 3.
pub fn positions_from_flat(flat: &[f32]) -> OrderResult<Vec<[f32; 3]>> {
    if flat.len() % 3 != 0 {
        return Err(OrderError::input_validation(
            "INPUT.POSITIONS_SHAPE",
            format!(
                "positions must have exactly 3 columns, got a flat buffer of {} values",
                flat.len()
            ),
        ));
    }

    let positions: Vec<[f32; 3]> = flat
        .chunks_exact(3)
        .map(|row| [row[0], row[1], row[2]])
        .collect();
    validate_positions(&positions)?;
    Ok(positions)
}

pub fn validate_positions(positions: &[[f32; 3]]) -> OrderResult<()> {
    if let Some((index, point)) = positions
        .iter()
        .enumerate()
        .find(|(_, point)| point.iter().any(|value| !value.is_finite()))
    {
        return Err(OrderError::input_validation(
            "INPUT.POSITIONS_FINITE",
            format!("position {index} is not finite: {point:?}"),
        ));
    }

    Ok(())
}
