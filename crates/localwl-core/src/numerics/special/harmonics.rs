use crate::common::constants::FOUR_PI;
use num_complex::Complex64;

/// Writes `Y_l^m` for `m = -l..=l` (slot `m + l`) along `direction`.
///
/// `direction` need not be normalized but must be nonzero. The polar sine is
/// taken from the in-plane length of the vector rather than `sqrt(1 - cos^2)`,
/// which keeps bonds close to the z axis accurate.
pub fn harmonics_for_direction(degree: usize, direction: [f64; 3], out: &mut [Complex64]) {
    debug_assert_eq!(out.len(), 2 * degree + 1);

    let [x, y, z] = direction;
    let in_plane = x.hypot(y);
    let radius = in_plane.hypot(z);
    debug_assert!(radius > 0.0, "harmonics need a nonzero direction");

    let cos_theta = z / radius;
    let sin_theta = in_plane / radius;
    let azimuth = if in_plane > 0.0 {
        Complex64::new(x / in_plane, y / in_plane)
    } else {
        Complex64::new(1.0, 0.0)
    };

    let mut phase = Complex64::new(1.0, 0.0);
    let mut p_mm = (1.0 / FOUR_PI).sqrt();
    for order in 0..=degree {
        if order > 0 {
            let m = order as f64;
            p_mm *= -((2.0 * m + 1.0) / (2.0 * m)).sqrt() * sin_theta;
            phase *= azimuth;
        }

        let legendre = normalized_legendre_from_diagonal(degree, order, cos_theta, p_mm);
        let positive = phase * legendre;
        out[degree + order] = positive;
        if order > 0 {
            let conjugate = positive.conj();
            out[degree - order] = if order % 2 == 0 { conjugate } else { -conjugate };
        }
    }
}

/// Climbs from the diagonal term `P_m^m` to `P_l^m` with the fully normalized
/// three-term recurrence.
fn normalized_legendre_from_diagonal(degree: usize, order: usize, x: f64, p_mm: f64) -> f64 {
    if degree == order {
        return p_mm;
    }

    let m = order as f64;
    let mut p_lm2 = p_mm;
    let mut p_lm1 = (2.0 * m + 3.0).sqrt() * x * p_mm;
    for l in (order + 2)..=degree {
        let l = l as f64;
        let a = ((4.0 * l * l - 1.0) / (l * l - m * m)).sqrt();
        let b = (((l - 1.0) * (l - 1.0) - m * m) / (4.0 * (l - 1.0) * (l - 1.0) - 1.0)).sqrt();
        let p_lm = a * (x * p_lm1 - b * p_lm2);
        p_lm2 = p_lm1;
        p_lm1 = p_lm;
    }

    p_lm1
}

/// Neighbor-averaged harmonics `Qlm` for one degree.
#[derive(Debug, Clone)]
pub struct SphericalHarmonicAccumulator {
    degree: usize,
}

impl SphericalHarmonicAccumulator {
    pub fn new(degree: usize) -> Self {
        Self { degree }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Averages `Y_l^m` over the bond directions; an empty set yields zeros.
    pub fn accumulate<I>(&self, bonds: I) -> Vec<Complex64>
    where
        I: IntoIterator<Item = [f64; 3]>,
    {
        let width = 2 * self.degree + 1;
        let mut qlm = vec![Complex64::new(0.0, 0.0); width];
        let mut row = vec![Complex64::new(0.0, 0.0); width];
        let mut count = 0_usize;

        for bond in bonds {
            harmonics_for_direction(self.degree, bond, &mut row);
            for (total, value) in qlm.iter_mut().zip(&row) {
                *total += *value;
            }
            count += 1;
        }

        if count > 0 {
            let scale = 1.0 / count as f64;
            for total in &mut qlm {
                *total *= scale;
            }
        }

        qlm
    }
}

/// Second-order invariant `sqrt(4 pi / (2l + 1) * sum |Qlm|^2)`.
pub fn ql_from_qlm(qlm: &[Complex64]) -> f64 {
    let power: f64 = qlm.iter().map(|value| value.norm_sqr()).sum();
    (FOUR_PI / qlm.len() as f64 * power).sqrt()
}

#[cfg(test)]
mod tests {
    use super::{SphericalHarmonicAccumulator, harmonics_for_direction, ql_from_qlm};
    use crate::common::constants::PI;
    use num_complex::Complex64;

    /// `Y_l^m` for every order at polar angle `theta` and azimuth `phi`.
    fn harmonics_at(degree: usize, theta: f64, phi: f64) -> Vec<Complex64> {
        let direction = [
            theta.sin() * phi.cos(),
            theta.sin() * phi.sin(),
            theta.cos(),
        ];
        let mut row = vec![Complex64::new(0.0, 0.0); 2 * degree + 1];
        harmonics_for_direction(degree, direction, &mut row);
        row
    }

    #[test]
    fn low_degree_rows_match_closed_forms() {
        let y0 = harmonics_at(0, 1.2, -0.8);
        assert_complex_close(
            "Y_0^0",
            Complex64::new((1.0 / (4.0 * PI)).sqrt(), 0.0),
            y0[0],
            1.0e-14,
            1.0e-13,
        );

        let theta = PI / 3.0;
        let y1 = harmonics_at(1, theta, 0.4);
        assert_complex_close(
            "Y_1^0",
            Complex64::new((3.0 / (4.0 * PI)).sqrt() * theta.cos(), 0.0),
            y1[1],
            1.0e-14,
            1.0e-13,
        );

        // Along +x the azimuthal phase is 1 and only the Condon-Shortley sign remains.
        let equator = harmonics_at(1, PI / 2.0, 0.0);
        assert_complex_close(
            "Y_1^1",
            Complex64::new(-(3.0 / (8.0 * PI)).sqrt(), 0.0),
            equator[2],
            1.0e-14,
            1.0e-13,
        );

        // Closed forms of Y_4^m at theta=1.1, phi=-0.7.
        let y4 = harmonics_at(4, 1.1, -0.7);
        let cases = [
            (-3, Complex64::new(-0.202_887_359_003_083_77, 0.346_906_249_390_448_8)),
            (0, Complex64::new(-0.178_865_809_936_687_33, 0.0)),
            (2, Complex64::new(0.019_881_280_188_664_634, -0.115_269_350_648_811_2)),
            (4, Complex64::new(-0.263_035_166_493_470_2, -0.093_516_848_461_762_52)),
        ];
        for (order, expected) in cases {
            assert_complex_close(
                &format!("Y_4^{order}"),
                expected,
                y4[(order + 4) as usize],
                1.0e-13,
                1.0e-12,
            );
        }
    }

    #[test]
    fn negative_orders_are_signed_conjugates() {
        for degree in 1..=6_usize {
            let row = harmonics_at(degree, 1.1, -0.7);
            for order in 1..=degree {
                let positive = row[degree + order];
                let expected = if order % 2 == 0 {
                    positive.conj()
                } else {
                    -positive.conj()
                };

                assert_complex_close(
                    &format!("l={degree} m=-{order}"),
                    expected,
                    row[degree - order],
                    1.0e-13,
                    1.0e-12,
                );
            }
        }
    }

    #[test]
    fn rows_satisfy_the_addition_theorem_sum_rule() {
        let samples = [(0.3, -1.2), (1.1, 0.4), (2.4, 2.2)];

        for degree in [0_usize, 1, 2, 4, 6, 12] {
            let expected_power = (2 * degree + 1) as f64 / (4.0 * PI);
            for (theta, phi) in samples {
                let power: f64 = harmonics_at(degree, theta, phi)
                    .iter()
                    .map(|value| value.norm_sqr())
                    .sum();

                assert_scalar_close(
                    &format!("l={degree} theta={theta} phi={phi}"),
                    expected_power,
                    power,
                    5.0e-12,
                    5.0e-11,
                );
            }
        }
    }

    #[test]
    fn direction_length_does_not_matter() {
        let mut unit = vec![Complex64::new(0.0, 0.0); 13];
        let mut scaled = vec![Complex64::new(0.0, 0.0); 13];
        harmonics_for_direction(6, [0.48, -0.6, 0.64], &mut unit);
        harmonics_for_direction(6, [1.2, -1.5, 1.6], &mut scaled);
        for (order, (lhs, rhs)) in unit.iter().zip(&scaled).enumerate() {
            assert_complex_close(&format!("slot {order}"), *lhs, *rhs, 1.0e-14, 1.0e-13);
        }
    }

    #[test]
    fn poles_are_axial_and_finite() {
        for degree in [1_usize, 6, 20] {
            let width = 2 * degree + 1;
            let mut north = vec![Complex64::new(0.0, 0.0); width];
            let mut south = vec![Complex64::new(0.0, 0.0); width];
            harmonics_for_direction(degree, [0.0, 0.0, 2.5], &mut north);
            harmonics_for_direction(degree, [0.0, 0.0, -0.5], &mut south);

            let axial = ((2 * degree + 1) as f64 / (4.0 * PI)).sqrt();
            let parity = if degree % 2 == 0 { 1.0 } else { -1.0 };
            assert_scalar_close("north m=0", axial, north[degree].re, 1.0e-12, 1.0e-12);
            assert_scalar_close(
                "south m=0",
                parity * axial,
                south[degree].re,
                1.0e-12,
                1.0e-12,
            );
            for (slot, value) in north.iter().enumerate().filter(|(slot, _)| *slot != degree) {
                assert!(value.norm() == 0.0, "slot {slot} should vanish at the pole");
            }
        }

        // A bond a hair off the axis still satisfies the sum rule.
        let degree = 8;
        let mut row = vec![Complex64::new(0.0, 0.0); 2 * degree + 1];
        harmonics_for_direction(degree, [1.0e-9, -2.0e-9, 1.0], &mut row);
        let power: f64 = row.iter().map(|value| value.norm_sqr()).sum();
        assert_scalar_close(
            "near pole",
            (2 * degree + 1) as f64 / (4.0 * PI),
            power,
            1.0e-12,
            1.0e-12,
        );
    }

    #[test]
    fn accumulator_averages_and_handles_empty_sets() {
        let accumulator = SphericalHarmonicAccumulator::new(2);
        let empty = accumulator.accumulate(std::iter::empty());
        assert_eq!(empty.len(), 5);
        assert!(empty.iter().all(|value| value.norm() == 0.0));
        assert_eq!(ql_from_qlm(&empty), 0.0);

        // Opposite bonds along z: the even harmonics add, the average equals one bond.
        let pair = accumulator.accumulate([[0.0, 0.0, 1.0], [0.0, 0.0, -1.0]]);
        let single = accumulator.accumulate([[0.0, 0.0, 1.0]]);
        for (lhs, rhs) in pair.iter().zip(&single) {
            assert_complex_close("axial pair", *rhs, *lhs, 1.0e-14, 1.0e-14);
        }
        assert_scalar_close("Ql", 1.0, ql_from_qlm(&pair), 1.0e-14, 1.0e-14);
    }

    fn assert_scalar_close(label: &str, expected: f64, actual: f64, abs_tol: f64, rel_tol: f64) {
        let abs_diff = (actual - expected).abs();
        let rel_diff = abs_diff / expected.abs().max(1.0);
        assert!(
            abs_diff <= abs_tol || rel_diff <= rel_tol,
            "{label} expected={expected:.15e} actual={actual:.15e} abs_diff={abs_diff:.15e} rel_diff={rel_diff:.15e} abs_tol={abs_tol:.15e} rel_tol={rel_tol:.15e}"
        );
    }

    fn assert_complex_close(
        label: &str,
        expected: Complex64,
        actual: Complex64,
        abs_tol: f64,
        rel_tol: f64,
    ) {
        let abs_diff = (actual - expected).norm();
        let rel_diff = abs_diff / expected.norm().max(1.0);
        assert!(
            abs_diff <= abs_tol || rel_diff <= rel_tol,
            "{label} expected=({:.15e},{:.15e}) actual=({:.15e},{:.15e}) abs_diff={:.15e} rel_diff={:.15e} abs_tol={:.15e} rel_tol={:.15e}",
            expected.re,
            expected.im,
            actual.re,
            actual.im,
            abs_diff,
            rel_diff,
            abs_tol,
            rel_tol
        );
    }
}
