use super::{NeighborSet, NeighborShellFinder, bond_between};
use crate::geometry::{CellList, PeriodicBox};

/// Every particle strictly within `r_cut` of the query particle.
///
/// Distances use the minimum image. When `r_cut` exceeds half the smallest
/// plane distance of the box a neighbor is still counted once, through its
/// nearest image only; more distant images are silently dropped.
pub struct CutoffShell<'a> {
    periodic_box: &'a PeriodicBox,
    positions: &'a [[f32; 3]],
    r_cut: f64,
    cells: CellList,
}

impl<'a> CutoffShell<'a> {
    pub fn new(periodic_box: &'a PeriodicBox, positions: &'a [[f32; 3]], r_cut: f64) -> Self {
        Self {
            periodic_box,
            positions,
            r_cut,
            cells: CellList::build(periodic_box, positions, r_cut),
        }
    }

    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }
}

impl NeighborShellFinder for CutoffShell<'_> {
    fn find(&self, index: usize) -> NeighborSet {
        let mut entries = Vec::new();
        self.cells
            .for_each_candidate(self.cells.cell_of(index), self.r_cut, |candidate| {
                if let Some(neighbor) =
                    bond_between(self.periodic_box, self.positions, index, candidate)
                        .filter(|neighbor| neighbor.distance < self.r_cut)
                {
                    entries.push(neighbor);
                }
            });

        entries.sort_unstable_by_key(|neighbor| neighbor.index);
        NeighborSet::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::CutoffShell;
    use crate::geometry::PeriodicBox;
    use crate::neighbors::NeighborShellFinder;

    fn brute_force(periodic_box: &PeriodicBox, positions: &[[f32; 3]], index: usize, r_cut: f64) -> Vec<usize> {
        (0..positions.len())
            .filter(|other| *other != index)
            .filter(|other| periodic_box.displacement(positions[index], positions[*other]).1 < r_cut)
            .collect()
    }

    #[test]
    fn matches_brute_force_scan_in_a_tilted_box() {
        let periodic_box =
            PeriodicBox::new([7.0, 8.0, 9.0], [0.2, -0.1, 0.3], false).expect("box should build");
        let positions: Vec<[f32; 3]> = (0..150)
            .map(|index| {
                let t = index as f32;
                [
                    (t * 0.917).sin() * 3.4,
                    (t * 1.311).cos() * 3.9,
                    (t * 0.427).sin() * 4.4,
                ]
            })
            .collect();

        let finder = CutoffShell::new(&periodic_box, &positions, 1.8);
        for index in 0..positions.len() {
            let found: Vec<usize> = finder.find(index).indices().collect();
            assert_eq!(found, brute_force(&periodic_box, &positions, index, 1.8), "particle {index}");
        }
    }

    #[test]
    fn excludes_self_and_points_on_the_cutoff() {
        let periodic_box = PeriodicBox::cube(10.0).expect("box should build");
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.5, 0.0], [-4.75, 0.0, 0.0]];
        let finder = CutoffShell::new(&periodic_box, &positions, 1.0);

        let shell = finder.find(0);
        assert_eq!(shell.indices().collect::<Vec<_>>(), vec![2]);
        assert!((shell.entries()[0].bond[1] - 1.0).abs() <= 1.0e-12);
    }

    #[test]
    fn finds_neighbors_across_the_boundary() {
        let periodic_box = PeriodicBox::cube(10.0).expect("box should build");
        let positions = [[4.8, 0.0, 0.0], [-4.8, 0.0, 0.0]];
        let finder = CutoffShell::new(&periodic_box, &positions, 1.0);

        let shell = finder.find(0);
        assert_eq!(shell.len(), 1);
        assert!((shell.entries()[0].bond[0] - 1.0).abs() <= 1.0e-12);
        assert!((shell.entries()[0].distance - 0.4).abs() <= 1.0e-5);
    }

    #[test]
    fn oversized_cutoff_counts_each_neighbor_once() {
        let periodic_box = PeriodicBox::cube(2.0).expect("box should build");
        let positions = [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, -0.7, 0.2]];
        let finder = CutoffShell::new(&periodic_box, &positions, 5.0);

        assert_eq!(finder.find(0).indices().collect::<Vec<_>>(), vec![1, 2]);
    }
}
