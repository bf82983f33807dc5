//! Per-particle kernels shared by every order-parameter variant.

use crate::numerics::{WignerTable, ql_from_qlm};
use num_complex::Complex64;
use rayon::prelude::*;

/// Wl and Ql of one particle's harmonics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Invariants {
    pub wl: f64,
    pub ql: f64,
}

impl Invariants {
    pub fn of(wigner: &WignerTable, qlm: &[Complex64]) -> Self {
        Self {
            wl: wigner.contract(qlm),
            ql: ql_from_qlm(qlm),
        }
    }

    /// `Wl / Ql^3`, defined as zero for an empty shell.
    pub fn normalized(&self) -> f64 {
        if self.ql == 0.0 {
            0.0
        } else {
            self.wl / self.ql.powi(3)
        }
    }

    pub fn value(&self, normalize: bool) -> f64 {
        if normalize { self.normalized() } else { self.wl }
    }
}

pub(crate) fn invariants(wigner: &WignerTable, harmonics: &[Vec<Complex64>]) -> Vec<Invariants> {
    harmonics
        .par_iter()
        .map(|qlm| Invariants::of(wigner, qlm))
        .collect()
}

/// Second-shell smoothing: each particle's harmonics averaged with those of its
/// first-shell neighbors, the particle itself included.
///
/// Reads only the first-shell harmonics, so it must run after they are
/// complete for every particle.
pub(crate) fn shell_averaged(
    harmonics: &[Vec<Complex64>],
    neighbors: &[Vec<usize>],
) -> Vec<Vec<Complex64>> {
    harmonics
        .par_iter()
        .zip(neighbors.par_iter())
        .map(|(own, shell)| {
            let mut total = own.clone();
            for &neighbor in shell {
                for (sum, value) in total.iter_mut().zip(&harmonics[neighbor]) {
                    *sum += *value;
                }
            }

            let scale = 1.0 / (shell.len() + 1) as f64;
            for sum in &mut total {
                *sum *= scale;
            }
            total
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Invariants, shell_averaged};
    use num_complex::Complex64;

    #[test]
    fn normalization_is_zero_for_empty_shells() {
        let empty = Invariants { wl: 0.0, ql: 0.0 };
        assert_eq!(empty.normalized(), 0.0);

        let populated = Invariants { wl: -0.25, ql: 0.5 };
        assert_eq!(populated.normalized(), -2.0);
        assert_eq!(populated.value(false), -0.25);
    }

    #[test]
    fn averaging_includes_the_particle_itself() {
        let harmonics = vec![
            vec![Complex64::new(1.0, 0.0)],
            vec![Complex64::new(3.0, 0.0)],
            vec![Complex64::new(0.0, 6.0)],
        ];
        let neighbors = vec![vec![1, 2], vec![], vec![0]];

        let averaged = shell_averaged(&harmonics, &neighbors);
        assert_eq!(averaged[0], vec![Complex64::new(4.0 / 3.0, 2.0)]);
        assert_eq!(averaged[1], vec![Complex64::new(3.0, 0.0)]);
        assert_eq!(averaged[2], vec![Complex64::new(0.5, 3.0)]);
    }
}
