//! Per-particle neighbor shells under periodic boundary conditions.

mod cutoff;
mod nearest;

pub use cutoff::CutoffShell;
pub use nearest::NearestShell;

use crate::common::ShellPolicy;
use crate::geometry::PeriodicBox;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    /// Unit vector from the query particle towards the neighbor (minimum image).
    pub bond: [f64; 3],
    pub distance: f64,
}

/// Neighbors of one particle, ordered by ascending neighbor index for cutoff
/// shells and by ascending distance for nearest shells. Never holds the query
/// particle itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborSet {
    entries: Vec<Neighbor>,
}

impl NeighborSet {
    pub fn new(entries: Vec<Neighbor>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Neighbor] {
        &self.entries
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|neighbor| neighbor.index)
    }

    pub fn bonds(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.entries.iter().map(|neighbor| neighbor.bond)
    }
}

pub trait NeighborShellFinder: Sync {
    fn find(&self, index: usize) -> NeighborSet;

    /// Shell size the policy asks for, if it asks for a fixed one.
    fn requested_count(&self) -> Option<usize> {
        None
    }
}

/// Builds the finder for `policy` over one configuration.
pub fn shell_finder<'a>(
    policy: ShellPolicy,
    periodic_box: &'a PeriodicBox,
    positions: &'a [[f32; 3]],
) -> Box<dyn NeighborShellFinder + 'a> {
    match policy {
        ShellPolicy::Cutoff { r_cut } => Box::new(CutoffShell::new(periodic_box, positions, r_cut)),
        ShellPolicy::Nearest { count, r_guess } => Box::new(NearestShell::new(
            periodic_box,
            positions,
            count,
            r_guess,
        )),
    }
}

/// Reportable (non-fatal) neighborhood conditions of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShellDiagnostics {
    /// Particles with an empty shell; their harmonics are zero.
    pub isolated: usize,
    /// Particles whose shell is smaller than the requested nearest count.
    pub short_shells: usize,
}

impl ShellDiagnostics {
    pub fn from_counts(counts: &[usize], requested: Option<usize>) -> Self {
        Self {
            isolated: counts.iter().filter(|count| **count == 0).count(),
            short_shells: requested.map_or(0, |requested| {
                counts.iter().filter(|count| **count < requested).count()
            }),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.isolated == 0 && self.short_shells == 0
    }
}

/// Bond from `from` to `to`, or `None` for the particle itself and for exact
/// overlaps, which have no direction.
fn bond_between(
    periodic_box: &PeriodicBox,
    positions: &[[f32; 3]],
    from: usize,
    to: usize,
) -> Option<Neighbor> {
    if from == to {
        return None;
    }

    let (delta, distance) = periodic_box.displacement(positions[from], positions[to]);
    if distance <= 0.0 {
        return None;
    }

    Some(Neighbor {
        index: to,
        bond: [delta[0] / distance, delta[1] / distance, delta[2] / distance],
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::{ShellDiagnostics, bond_between};
    use crate::geometry::PeriodicBox;

    #[test]
    fn bonds_are_unit_vectors_and_skip_self_and_overlaps() {
        let periodic_box = PeriodicBox::cube(10.0).expect("box should build");
        let positions = [[0.0, 0.0, 0.0], [0.0, 3.0, 4.0], [0.0, 0.0, 0.0]];

        let bond = bond_between(&periodic_box, &positions, 0, 1).expect("distinct points bond");
        assert_eq!(bond.index, 1);
        assert!((bond.distance - 5.0).abs() <= 1.0e-12);
        assert!((bond.bond[1] - 0.6).abs() <= 1.0e-12);
        assert!((bond.bond[2] - 0.8).abs() <= 1.0e-12);

        assert!(bond_between(&periodic_box, &positions, 0, 0).is_none());
        assert!(bond_between(&periodic_box, &positions, 0, 2).is_none());
    }

    #[test]
    fn diagnostics_count_isolated_and_short_shells() {
        let counts = [0, 3, 12, 11];
        assert_eq!(
            ShellDiagnostics::from_counts(&counts, Some(12)),
            ShellDiagnostics {
                isolated: 1,
                short_shells: 3
            }
        );
        let cutoff = ShellDiagnostics::from_counts(&counts, None);
        assert_eq!(cutoff.isolated, 1);
        assert_eq!(cutoff.short_shells, 0);
        assert!(!cutoff.is_clean());
    }
}
