use crate::common::constants::MAX_DEGREE;
use crate::domain::{OrderError, OrderResult};
use num_complex::Complex64;

/// Equal-degree Wigner 3-j symbol `(l l l; m1 m2 m3)` by Racah's formula.
///
/// With all three degrees equal the triangle factors reduce to `l!` and the
/// summation runs over `max(0, -m1, m2) ..= min(l, l - m1, l + m2)`.
fn equal_degree_symbol(
    log_factorial: &mut LogFactorial,
    degree: i32,
    m1: i32,
    m2: i32,
    m3: i32,
) -> f64 {
    let l = degree;
    if m1 + m2 + m3 != 0 || m1.abs() > l || m2.abs() > l || m3.abs() > l {
        return 0.0;
    }

    let mut ln = |n: i32| log_factorial.ln_factorial(n as usize);
    let mut prefactor_log = 3.0 * ln(l) - ln(3 * l + 1);
    for m in [m1, m2, m3] {
        prefactor_log += ln(l + m) + ln(l - m);
    }
    prefactor_log *= 0.5;

    let k_min = 0_i32.max(-m1).max(m2);
    let k_max = l.min(l - m1).min(l + m2);
    let mut sum = 0.0;
    for k in k_min..=k_max {
        let denominator_log =
            ln(k) + ln(l - k) + ln(l - m1 - k) + ln(l + m2 - k) + ln(m1 + k) + ln(k - m2);
        let magnitude = (prefactor_log - denominator_log).exp();
        sum += if k % 2 == 0 { magnitude } else { -magnitude };
    }

    if m3.rem_euclid(2) == 0 { sum } else { -sum }
}

/// Memoized `ln(n!)`, grown on demand and shared across a batch of symbols.
#[derive(Debug)]
struct LogFactorial {
    values: Vec<f64>,
}

impl LogFactorial {
    fn new() -> Self {
        Self { values: vec![0.0] }
    }

    fn ln_factorial(&mut self, n: usize) -> f64 {
        while self.values.len() <= n {
            let next_index = self.values.len();
            let next_value = self.values[next_index - 1] + (next_index as f64).ln();
            self.values.push(next_value);
        }

        self.values[n]
    }
}

/// One nonzero `(l l l; m1 m2 m3)` entry with `m1 + m2 + m3 = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WignerTerm {
    pub m1: i32,
    pub m2: i32,
    pub m3: i32,
    pub value: f64,
}

/// Every Wigner 3j symbol `(l l l; m1 m2 m3)` for one fixed degree.
///
/// Built once per engine and read concurrently afterwards; lookups never
/// allocate or mutate.
#[derive(Debug, Clone, PartialEq)]
pub struct WignerTable {
    degree: usize,
    coefficients: Vec<f64>,
    terms: Vec<WignerTerm>,
}

impl WignerTable {
    pub fn new(degree: usize) -> OrderResult<Self> {
        if degree > MAX_DEGREE {
            return Err(OrderError::computation(
                "RUN.WIGNER_OVERFLOW",
                format!(
                    "Wigner 3j table for degree {degree} exceeds the supported maximum {MAX_DEGREE}"
                ),
            ));
        }

        let l = degree as i32;
        let width = 2 * degree + 1;
        let mut log_factorial = LogFactorial::new();
        let mut coefficients = vec![0.0; width * width];
        let mut terms = Vec::new();

        for m1 in -l..=l {
            for m2 in -l..=l {
                let m3 = -(m1 + m2);
                if m3.abs() > l {
                    continue;
                }

                let value = equal_degree_symbol(&mut log_factorial, l, m1, m2, m3);
                if !value.is_finite() {
                    return Err(OrderError::computation(
                        "RUN.WIGNER_OVERFLOW",
                        format!(
                            "Wigner 3j ({degree} {degree} {degree}; {m1} {m2} {m3}) evaluated to {value}"
                        ),
                    ));
                }

                coefficients[(m1 + l) as usize * width + (m2 + l) as usize] = value;
                if value != 0.0 {
                    terms.push(WignerTerm { m1, m2, m3, value });
                }
            }
        }

        Ok(Self {
            degree,
            coefficients,
            terms,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// `(l l l; m1 m2 -(m1+m2))`, or zero when any order falls outside `[-l, l]`.
    pub fn coefficient(&self, m1: i32, m2: i32) -> f64 {
        let l = self.degree as i32;
        if m1.abs() > l || m2.abs() > l || (m1 + m2).abs() > l {
            return 0.0;
        }

        let width = 2 * self.degree + 1;
        self.coefficients[(m1 + l) as usize * width + (m2 + l) as usize]
    }

    pub fn terms(&self) -> &[WignerTerm] {
        &self.terms
    }

    /// Third-order invariant `Re sum W(m1,m2,m3) Q[m1] Q[m2] Q[m3]`.
    ///
    /// `qlm` is indexed by `m + l`.
    pub fn contract(&self, qlm: &[Complex64]) -> f64 {
        debug_assert_eq!(qlm.len(), 2 * self.degree + 1);
        let l = self.degree as i32;
        let at = |m: i32| qlm[(m + l) as usize];

        self.terms
            .iter()
            .map(|term| (at(term.m1) * at(term.m2) * at(term.m3) * term.value).re)
            .sum()
    }
}
