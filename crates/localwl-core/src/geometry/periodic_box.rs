//! Periodic simulation cell centered on the origin.
//!
//! Lattice vectors follow the upper-triangular convention
//! `a1 = (Lx, 0, 0)`, `a2 = (xy Ly, Ly, 0)`, `a3 = (xz Lz, yz Lz, Lz)`.
//! A 2D box ignores z entirely and never wraps along it.

use crate::domain::{OrderError, OrderResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PeriodicBox {
    lengths: [f64; 3],
    #[serde(default)]
    tilts: [f64; 3],
    #[serde(default)]
    is_2d: bool,
}

impl PeriodicBox {
    /// Triclinic box with tilt factors `[xy, xz, yz]`.
    pub fn new(lengths: [f64; 3], tilts: [f64; 3], is_2d: bool) -> OrderResult<Self> {
        let periodic_box = Self {
            lengths,
            tilts,
            is_2d,
        };
        periodic_box.validate()?;
        Ok(periodic_box)
    }

    pub fn cube(length: f64) -> OrderResult<Self> {
        Self::new([length; 3], [0.0; 3], false)
    }

    pub fn orthorhombic(lx: f64, ly: f64, lz: f64) -> OrderResult<Self> {
        Self::new([lx, ly, lz], [0.0; 3], false)
    }

    pub fn square(length: f64) -> OrderResult<Self> {
        Self::new([length, length, 0.0], [0.0; 3], true)
    }

    /// Rechecks invariants; boxes deserialized from documents bypass `new`.
    pub fn validate(&self) -> OrderResult<()> {
        let periodic_axes = if self.is_2d { 2 } else { 3 };
        if let Some(length) = self.lengths[..periodic_axes]
            .iter()
            .find(|length| !length.is_finite() || **length <= 0.0)
        {
            return Err(OrderError::input_validation(
                "INPUT.BOX_LENGTHS",
                format!(
                    "box lengths must be positive and finite, got {:?} (offending {length})",
                    self.lengths
                ),
            ));
        }

        if self.tilts.iter().any(|tilt| !tilt.is_finite()) {
            return Err(OrderError::input_validation(
                "INPUT.BOX_TILTS",
                format!("box tilt factors must be finite, got {:?}", self.tilts),
            ));
        }

        if self.is_2d && (self.tilts[1] != 0.0 || self.tilts[2] != 0.0) {
            return Err(OrderError::input_validation(
                "INPUT.BOX_TILTS",
                "a 2D box cannot carry xz or yz tilt",
            ));
        }

        Ok(())
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    /// Tilt factors `[xy, xz, yz]`.
    pub fn tilts(&self) -> [f64; 3] {
        self.tilts
    }

    pub fn is_2d(&self) -> bool {
        self.is_2d
    }

    pub fn volume(&self) -> f64 {
        if self.is_2d {
            self.lengths[0] * self.lengths[1]
        } else {
            self.lengths.iter().product()
        }
    }

    pub fn lattice_vectors(&self) -> [[f64; 3]; 3] {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilts;
        [[lx, 0.0, 0.0], [xy * ly, ly, 0.0], [xz * lz, yz * lz, lz]]
    }

    /// Maps a displacement onto its minimum image.
    pub fn wrap(&self, delta: [f64; 3]) -> [f64; 3] {
        let [a1, a2, a3] = self.lattice_vectors();
        let mut v = delta;

        if !self.is_2d {
            let images = (v[2] / self.lengths[2]).round();
            for axis in 0..3 {
                v[axis] -= images * a3[axis];
            }
        }

        let images = (v[1] / self.lengths[1]).round();
        for axis in 0..3 {
            v[axis] -= images * a2[axis];
        }

        let images = (v[0] / self.lengths[0]).round();
        v[0] -= images * a1[0];

        v
    }

    /// Minimum-image displacement from `from` to `to` and its length.
    pub fn displacement(&self, from: [f32; 3], to: [f32; 3]) -> ([f64; 3], f64) {
        let delta = [
            f64::from(to[0]) - f64::from(from[0]),
            f64::from(to[1]) - f64::from(from[1]),
            f64::from(to[2]) - f64::from(from[2]),
        ];
        let wrapped = self.wrap(delta);
        (wrapped, norm(wrapped))
    }

    /// Fractional coordinates in `[0, 1)` along each lattice vector.
    ///
    /// The z component is always zero for a 2D box.
    pub fn fractional(&self, point: [f32; 3]) -> [f64; 3] {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilts;
        let x = f64::from(point[0]);
        let y = f64::from(point[1]);
        let z = if self.is_2d { 0.0 } else { f64::from(point[2]) };

        let in_plane_y = y - yz * z;
        let fx = (x - xy * in_plane_y - xz * z) / lx + 0.5;
        let fy = in_plane_y / ly + 0.5;
        let fz = if self.is_2d { 0.0 } else { z / lz + 0.5 };

        [unit_interval(fx), unit_interval(fy), unit_interval(fz)]
    }

    /// Distance between opposite faces along each lattice direction.
    ///
    /// A sphere of radius `r` fits without touching its own image only when
    /// `2r` is below every entry.
    pub fn plane_distances(&self) -> [f64; 3] {
        let [a1, a2, a3] = self.lattice_vectors();
        if self.is_2d {
            let area = (a1[0] * a2[1] - a1[1] * a2[0]).abs();
            return [area / norm(a2), area / norm(a1), 0.0];
        }

        let volume = dot(a1, cross(a2, a3)).abs();
        [
            volume / norm(cross(a2, a3)),
            volume / norm(cross(a3, a1)),
            volume / norm(cross(a1, a2)),
        ]
    }
}

fn unit_interval(value: f64) -> f64 {
    let wrapped = value.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

pub(crate) fn norm(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
