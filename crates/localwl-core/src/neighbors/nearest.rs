use super::{Neighbor, NeighborSet, NeighborShellFinder, bond_between};
use crate::common::constants::{NEAREST_RADIUS_SLACK, PI};
use crate::geometry::{CellList, PeriodicBox};
use std::cmp::Ordering;

/// The `count` particles closest to the query particle.
///
/// Equal distances are broken by ascending neighbor index. When the system
/// holds fewer than `count + 1` particles every other particle is returned.
/// The search starts inside `r_guess` and doubles the radius until enough
/// candidates are enclosed or the whole box has been scanned.
pub struct NearestShell<'a> {
    periodic_box: &'a PeriodicBox,
    positions: &'a [[f32; 3]],
    count: usize,
    r_guess: f64,
    cells: CellList,
}

impl<'a> NearestShell<'a> {
    pub fn new(
        periodic_box: &'a PeriodicBox,
        positions: &'a [[f32; 3]],
        count: usize,
        r_guess: Option<f64>,
    ) -> Self {
        let r_guess =
            r_guess.unwrap_or_else(|| estimate_search_radius(periodic_box, positions.len(), count));
        Self {
            periodic_box,
            positions,
            count,
            r_guess,
            cells: CellList::build(periodic_box, positions, r_guess),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn r_guess(&self) -> f64 {
        self.r_guess
    }

    fn candidates_within(&self, index: usize, radius: f64, exhaustive: bool) -> Vec<Neighbor> {
        let mut candidates = Vec::new();
        self.cells
            .for_each_candidate(self.cells.cell_of(index), radius, |candidate| {
                if let Some(neighbor) =
                    bond_between(self.periodic_box, self.positions, index, candidate)
                        .filter(|neighbor| exhaustive || neighbor.distance <= radius)
                {
                    candidates.push(neighbor);
                }
            });
        candidates
    }
}

impl NeighborShellFinder for NearestShell<'_> {
    fn find(&self, index: usize) -> NeighborSet {
        let wanted = self.count.min(self.positions.len().saturating_sub(1));
        if wanted == 0 {
            return NeighborSet::default();
        }

        let mut radius = self.r_guess;
        let mut candidates = loop {
            let exhaustive = self.cells.covers_box(radius);
            let candidates = self.candidates_within(index, radius, exhaustive);
            if exhaustive || candidates.len() >= wanted {
                break candidates;
            }
            radius *= 2.0;
        };

        candidates.sort_unstable_by(by_distance_then_index);
        candidates.truncate(wanted);
        NeighborSet::new(candidates)
    }

    fn requested_count(&self) -> Option<usize> {
        Some(self.count)
    }
}

fn by_distance_then_index(lhs: &Neighbor, rhs: &Neighbor) -> Ordering {
    lhs.distance
        .total_cmp(&rhs.distance)
        .then(lhs.index.cmp(&rhs.index))
}

/// Radius of the sphere (disk in 2D) expected to hold `count` neighbors at the
/// mean number density, padded by a fixed slack.
fn estimate_search_radius(periodic_box: &PeriodicBox, points: usize, count: usize) -> f64 {
    let density = points.max(1) as f64 / periodic_box.volume();
    let enclosed = (count + 1) as f64;
    let radius = if periodic_box.is_2d() {
        (enclosed / (PI * density)).sqrt()
    } else {
        (3.0 * enclosed / (4.0 * PI * density)).cbrt()
    };
    radius * NEAREST_RADIUS_SLACK
}

#[cfg(test)]
mod tests {
    use super::NearestShell;
    use crate::geometry::PeriodicBox;
    use crate::neighbors::NeighborShellFinder;

    fn scattered(count: usize, half_width: f32) -> Vec<[f32; 3]> {
        (0..count)
            .map(|index| {
                let t = index as f32;
                [
                    (t * 0.613).sin() * half_width,
                    (t * 1.129).cos() * half_width,
                    (t * 0.271).sin() * half_width,
                ]
            })
            .collect()
    }

    fn brute_force_nearest(
        periodic_box: &PeriodicBox,
        positions: &[[f32; 3]],
        index: usize,
        count: usize,
    ) -> Vec<usize> {
        let mut ranked: Vec<(f64, usize)> = (0..positions.len())
            .filter(|other| *other != index)
            .map(|other| {
                (
                    periodic_box.displacement(positions[index], positions[other]).1,
                    other,
                )
            })
            .collect();
        ranked.sort_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0).then(lhs.1.cmp(&rhs.1)));
        ranked.into_iter().take(count).map(|(_, other)| other).collect()
    }

    #[test]
    fn matches_sorted_brute_force_distances() {
        let periodic_box = PeriodicBox::cube(12.0).expect("box should build");
        let positions = scattered(300, 5.9);
        // A deliberately small guess forces the radius to grow.
        let finder = NearestShell::new(&periodic_box, &positions, 8, Some(0.2));

        for index in (0..positions.len()).step_by(7) {
            let found: Vec<usize> = finder.find(index).indices().collect();
            assert_eq!(
                found,
                brute_force_nearest(&periodic_box, &positions, index, 8),
                "particle {index}"
            );
        }
    }

    #[test]
    fn matches_brute_force_in_a_strongly_tilted_box() {
        let periodic_box =
            PeriodicBox::new([9.0, 10.0, 11.0], [0.9, -0.6, 0.7], false).expect("box should build");
        let positions = scattered(200, 4.4);
        let finder = NearestShell::new(&periodic_box, &positions, 10, Some(0.1));

        for index in 0..positions.len() {
            let found: Vec<usize> = finder.find(index).indices().collect();
            assert_eq!(
                found,
                brute_force_nearest(&periodic_box, &positions, index, 10),
                "particle {index}"
            );
        }
    }

    #[test]
    fn equal_distances_are_broken_by_index() {
        let periodic_box = PeriodicBox::cube(20.0).expect("box should build");
        let positions = [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [-1.0, 0.0, 0.0],
        ];
        let finder = NearestShell::new(&periodic_box, &positions, 2, None);
        assert_eq!(finder.find(0).indices().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn small_systems_return_every_other_particle() {
        let periodic_box = PeriodicBox::cube(10.0).expect("box should build");
        let positions = [[0.0, 0.0, -1.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let finder = NearestShell::new(&periodic_box, &positions, 12, None);

        let shell = finder.find(1);
        assert_eq!(shell.len(), 2);
        assert_eq!(finder.requested_count(), Some(12));

        let single = [[0.0, 0.0, 0.0]];
        let lonely = NearestShell::new(&periodic_box, &single, 4, None);
        assert!(lonely.find(0).is_empty());
    }
}
