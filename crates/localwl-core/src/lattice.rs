//! Reference crystal configurations.

use crate::domain::{OrderError, OrderResult};
use crate::geometry::PeriodicBox;

const FCC_BASIS: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.0, 0.5, 0.5],
    [0.5, 0.0, 0.5],
    [0.5, 0.5, 0.0],
];

/// Face-centered cubic crystal of `cells`^3 conventional cells filling a cubic
/// box centered on the origin. Every site has 12 nearest neighbors at
/// `lattice_constant / sqrt(2)`.
pub fn fcc(cells: usize, lattice_constant: f64) -> OrderResult<(PeriodicBox, Vec<[f32; 3]>)> {
    if cells == 0 {
        return Err(OrderError::input_validation(
            "INPUT.LATTICE_CELLS",
            "lattice needs at least one unit cell per side",
        ));
    }
    if !lattice_constant.is_finite() || lattice_constant <= 0.0 {
        return Err(OrderError::input_validation(
            "INPUT.LATTICE_CONSTANT",
            format!("lattice constant must be positive and finite, got {lattice_constant}"),
        ));
    }

    let side = cells as f64 * lattice_constant;
    let periodic_box = PeriodicBox::cube(side)?;
    let half = 0.5 * side;

    let mut positions = Vec::with_capacity(FCC_BASIS.len() * cells.pow(3));
    for iz in 0..cells {
        for iy in 0..cells {
            for ix in 0..cells {
                let origin = [ix as f64, iy as f64, iz as f64];
                for site in FCC_BASIS {
                    positions.push([
                        ((origin[0] + site[0]) * lattice_constant - half) as f32,
                        ((origin[1] + site[1]) * lattice_constant - half) as f32,
                        ((origin[2] + site[2]) * lattice_constant - half) as f32,
                    ]);
                }
            }
        }
    }

    Ok((periodic_box, positions))
}
