//! Link-cell binning in fractional coordinates.
//!
//! Cells are slabs of the (possibly tilted) box whose thickness perpendicular
//! to each face is at least the requested width, so two points closer than
//! the width always sit in the same or adjacent cells. The structure only
//! narrows candidate sets; exact distances are left to the caller.

use super::PeriodicBox;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CellList {
    dims: [usize; 3],
    thickness: [f64; 3],
    cell_starts: Vec<usize>,
    members: Vec<usize>,
    cell_of: Vec<[usize; 3]>,
}

impl CellList {
    pub fn build(periodic_box: &PeriodicBox, positions: &[[f32; 3]], cell_width: f64) -> Self {
        let plane_distances = periodic_box.plane_distances();
        let periodic_axes = if periodic_box.is_2d() { 2 } else { 3 };
        let max_per_axis = max_cells_per_axis(positions.len(), periodic_axes);

        let mut dims = [1_usize; 3];
        let mut thickness = [f64::INFINITY; 3];
        for axis in 0..periodic_axes {
            let fit = (plane_distances[axis] / cell_width).floor();
            dims[axis] = if fit.is_finite() && fit >= 1.0 {
                (fit as usize).min(max_per_axis)
            } else {
                1
            };
            thickness[axis] = plane_distances[axis] / dims[axis] as f64;
        }

        let cell_of: Vec<[usize; 3]> = positions
            .iter()
            .map(|point| {
                let fraction = periodic_box.fractional(*point);
                let mut coord = [0_usize; 3];
                for axis in 0..3 {
                    coord[axis] = ((fraction[axis] * dims[axis] as f64) as usize).min(dims[axis] - 1);
                }
                coord
            })
            .collect();

        let total = dims[0] * dims[1] * dims[2];
        let mut counts = vec![0_usize; total];
        for coord in &cell_of {
            counts[linear_index(dims, *coord)] += 1;
        }

        let mut cell_starts = vec![0_usize; total + 1];
        for cell in 0..total {
            cell_starts[cell + 1] = cell_starts[cell] + counts[cell];
        }

        let mut fill = cell_starts.clone();
        let mut members = vec![0_usize; positions.len()];
        for (index, coord) in cell_of.iter().enumerate() {
            let cell = linear_index(dims, *coord);
            members[fill[cell]] = index;
            fill[cell] += 1;
        }

        debug!(
            cells = ?dims,
            cell_width,
            points = positions.len(),
            "built cell list"
        );

        Self {
            dims,
            thickness,
            cell_starts,
            members,
            cell_of,
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn cell_of(&self, index: usize) -> [usize; 3] {
        self.cell_of[index]
    }

    /// Number of cells to step away from the home cell along each axis so that
    /// every point within `radius` is reached.
    fn reach(&self, radius: f64) -> [usize; 3] {
        let mut reach = [0_usize; 3];
        for axis in 0..3 {
            if self.dims[axis] > 1 {
                let steps = (radius / self.thickness[axis]).ceil();
                reach[axis] = if steps.is_finite() {
                    (steps as usize).min(self.dims[axis])
                } else {
                    self.dims[axis]
                };
            }
        }
        reach
    }

    /// True when a search of `radius` already visits every cell.
    pub fn covers_box(&self, radius: f64) -> bool {
        let reach = self.reach(radius);
        (0..3).all(|axis| 2 * reach[axis] + 1 >= self.dims[axis])
    }

    /// Visits every point stored in cells that may hold a point within
    /// `radius` of any point in `home`. Each point is visited at most once.
    pub fn for_each_candidate(&self, home: [usize; 3], radius: f64, mut visit: impl FnMut(usize)) {
        let reach = self.reach(radius);
        let spans = [
            axis_span(home[0], reach[0], self.dims[0]),
            axis_span(home[1], reach[1], self.dims[1]),
            axis_span(home[2], reach[2], self.dims[2]),
        ];

        for &cz in &spans[2] {
            for &cy in &spans[1] {
                for &cx in &spans[0] {
                    let cell = linear_index(self.dims, [cx, cy, cz]);
                    for &member in &self.members[self.cell_starts[cell]..self.cell_starts[cell + 1]]
                    {
                        visit(member);
                    }
                }
            }
        }
    }
}

fn linear_index(dims: [usize; 3], coord: [usize; 3]) -> usize {
    coord[0] + dims[0] * (coord[1] + dims[1] * coord[2])
}

/// Cell coordinates within `reach` of `center` on a periodic axis, without
/// repeats when the window wraps onto itself.
fn axis_span(center: usize, reach: usize, dim: usize) -> Vec<usize> {
    if 2 * reach + 1 >= dim {
        return (0..dim).collect();
    }

    (0..=2 * reach)
        .map(|offset| (center + dim - reach + offset) % dim)
        .collect()
}

/// Keeps the grid at most a few cells per point so tiny widths cannot blow up
/// memory.
fn max_cells_per_axis(points: usize, periodic_axes: usize) -> usize {
    let per_axis = (points.max(1) as f64).powf(1.0 / periodic_axes as f64).ceil() as usize;
    (2 * per_axis).max(1)
}
