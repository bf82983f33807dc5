//! Steinhardt Wl bond-order parameters and their averaged and normalized
//! variants.
//!
//! Every entry point runs the same two phases. Phase 1 finds each particle's
//! neighbor shell and its averaged harmonics `Qlm`; phase 2, used only by the
//! averaged variants, smooths those harmonics over the first shell. Both
//! phases write a fresh array per particle and complete before the Wigner
//! contraction runs. Phase 1 is cached for the last configuration seen.

mod kernel;

use crate::common::EngineConfig;
use crate::domain::{OrderError, OrderResult, OrderVariant, validate_positions};
use crate::geometry::PeriodicBox;
use crate::neighbors::{NeighborSet, ShellDiagnostics, shell_finder};
use crate::numerics::{SphericalHarmonicAccumulator, WignerTable};
use kernel::{Invariants, invariants, shell_averaged};
use num_complex::Complex64;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, debug_span, info_span, warn};

/// Per-particle Wl bond-order engine for one fixed degree and shell policy.
pub struct LocalWl {
    config: EngineConfig,
    wigner: WignerTable,
    accumulator: SphericalHarmonicAccumulator,
    pool: Option<ThreadPool>,
    shell: Option<FirstShell>,
    results: OrderArrays,
    last_variant: Option<OrderVariant>,
}

/// Phase-1 state of one configuration.
struct FirstShell {
    periodic_box: PeriodicBox,
    positions: Vec<[f32; 3]>,
    neighbors: Vec<Vec<usize>>,
    qlm: Vec<Vec<Complex64>>,
    averaged: Option<Vec<Vec<Complex64>>>,
    counts: Vec<usize>,
    diagnostics: ShellDiagnostics,
}

impl FirstShell {
    fn matches(&self, periodic_box: &PeriodicBox, positions: &[[f32; 3]]) -> bool {
        self.periodic_box == *periodic_box && self.positions == positions
    }
}

#[derive(Debug, Clone, Default)]
struct OrderArrays {
    wl: Vec<f64>,
    ave_wl: Vec<f64>,
    wl_norm: Vec<f64>,
    wl_ave_norm: Vec<f64>,
    ql: Vec<f64>,
    ave_ql: Vec<f64>,
}

impl OrderArrays {
    fn slot(&self, variant: OrderVariant) -> &[f64] {
        match variant {
            OrderVariant::Wl => &self.wl,
            OrderVariant::AveWl => &self.ave_wl,
            OrderVariant::WlNorm => &self.wl_norm,
            OrderVariant::WlAveNorm => &self.wl_ave_norm,
        }
    }

    fn store(&mut self, variant: OrderVariant, values: Vec<f64>, ql: Vec<f64>) {
        match variant {
            OrderVariant::Wl => self.wl = values,
            OrderVariant::AveWl => self.ave_wl = values,
            OrderVariant::WlNorm => self.wl_norm = values,
            OrderVariant::WlAveNorm => self.wl_ave_norm = values,
        }
        if variant.averaged() {
            self.ave_ql = ql;
        } else {
            self.ql = ql;
        }
    }
}

impl LocalWl {
    pub fn new(config: EngineConfig) -> OrderResult<Self> {
        config.validate()?;
        let wigner = WignerTable::new(config.degree)?;
        let pool = config.threads.map(build_pool).transpose()?;

        debug!(
            degree = config.degree,
            shell = ?config.shell,
            threads = ?config.threads,
            wigner_terms = wigner.terms().len(),
            "configured order-parameter engine"
        );

        Ok(Self {
            config,
            accumulator: SphericalHarmonicAccumulator::new(config.degree),
            wigner,
            pool,
            shell: None,
            results: OrderArrays::default(),
            last_variant: None,
        })
    }

    /// Engine whose shells hold every particle strictly within `r_cut`.
    pub fn cutoff(degree: usize, r_cut: f64) -> OrderResult<Self> {
        Self::new(EngineConfig::cutoff(degree, r_cut))
    }

    /// Engine whose shells hold the `count` nearest particles.
    pub fn nearest(degree: usize, count: usize) -> OrderResult<Self> {
        Self::new(EngineConfig::nearest(degree, count))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn degree(&self) -> usize {
        self.config.degree
    }

    pub fn wigner(&self) -> &WignerTable {
        &self.wigner
    }

    /// Wl of each particle's first neighbor shell.
    pub fn compute(&mut self, periodic_box: &PeriodicBox, positions: &[[f32; 3]]) -> OrderResult<&[f64]> {
        self.evaluate(periodic_box, positions, OrderVariant::Wl)
    }

    /// Wl of the harmonics averaged over each particle and its first shell.
    pub fn compute_ave(
        &mut self,
        periodic_box: &PeriodicBox,
        positions: &[[f32; 3]],
    ) -> OrderResult<&[f64]> {
        self.evaluate(periodic_box, positions, OrderVariant::AveWl)
    }

    /// Wl divided by Ql cubed, zero for particles without neighbors.
    pub fn compute_norm(
        &mut self,
        periodic_box: &PeriodicBox,
        positions: &[[f32; 3]],
    ) -> OrderResult<&[f64]> {
        self.evaluate(periodic_box, positions, OrderVariant::WlNorm)
    }

    /// Shell-averaged Wl divided by the averaged Ql cubed.
    pub fn compute_ave_norm(
        &mut self,
        periodic_box: &PeriodicBox,
        positions: &[[f32; 3]],
    ) -> OrderResult<&[f64]> {
        self.evaluate(periodic_box, positions, OrderVariant::WlAveNorm)
    }

    /// Runs the variant and stores its array, replacing the previous result of
    /// the same variant only.
    pub fn evaluate(
        &mut self,
        periodic_box: &PeriodicBox,
        positions: &[[f32; 3]],
        variant: OrderVariant,
    ) -> OrderResult<&[f64]> {
        let _span = info_span!("evaluate", %variant, particles = positions.len()).entered();
        validate_configuration(periodic_box, positions)?;

        self.refresh_first_shell(periodic_box, positions);
        let Some(shell) = self.shell.as_mut() else {
            return Err(OrderError::internal(
                "RUN.SHELL_STATE",
                "first-shell state missing after refresh",
            ));
        };

        let pool = self.pool.as_ref();
        if variant.averaged() && shell.averaged.is_none() {
            let _phase = debug_span!("average_shells").entered();
            let averaged = run_in(pool, || shell_averaged(&shell.qlm, &shell.neighbors));
            shell.averaged = Some(averaged);
        }

        let harmonics = match (&shell.averaged, variant.averaged()) {
            (Some(averaged), true) => averaged,
            _ => &shell.qlm,
        };

        let wigner = &self.wigner;
        let per_particle: Vec<Invariants> = run_in(pool, || invariants(wigner, harmonics));
        let values = per_particle
            .iter()
            .map(|invariant| invariant.value(variant.normalized()))
            .collect();
        let ql = per_particle.iter().map(|invariant| invariant.ql).collect();

        self.results.store(variant, values, ql);
        self.last_variant = Some(variant);
        Ok(self.results.slot(variant))
    }

    pub fn wl(&self) -> &[f64] {
        &self.results.wl
    }

    pub fn ave_wl(&self) -> &[f64] {
        &self.results.ave_wl
    }

    pub fn wl_norm(&self) -> &[f64] {
        &self.results.wl_norm
    }

    pub fn wl_ave_norm(&self) -> &[f64] {
        &self.results.wl_ave_norm
    }

    /// Last computed array of `variant`, empty if it was never computed.
    pub fn result(&self, variant: OrderVariant) -> &[f64] {
        self.results.slot(variant)
    }

    /// Ql of the first-shell harmonics from the last non-averaged call.
    pub fn ql(&self) -> &[f64] {
        &self.results.ql
    }

    /// Ql of the shell-averaged harmonics from the last averaged call.
    pub fn ave_ql(&self) -> &[f64] {
        &self.results.ave_ql
    }

    /// First-shell harmonics of one particle, indexed by `m + l`.
    pub fn qlm(&self, index: usize) -> Option<&[Complex64]> {
        self.shell
            .as_ref()
            .and_then(|shell| shell.qlm.get(index))
            .map(Vec::as_slice)
    }

    /// Shell sizes of the cached configuration.
    pub fn neighbor_counts(&self) -> &[usize] {
        self.shell
            .as_ref()
            .map(|shell| shell.counts.as_slice())
            .unwrap_or_default()
    }

    pub fn diagnostics(&self) -> ShellDiagnostics {
        self.shell
            .as_ref()
            .map_or_else(ShellDiagnostics::default, |shell| shell.diagnostics)
    }

    /// System average of the most recently computed array.
    pub fn order(&self) -> Option<f64> {
        let values = self.results.slot(self.last_variant?);
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    fn refresh_first_shell(&mut self, periodic_box: &PeriodicBox, positions: &[[f32; 3]]) {
        if self
            .shell
            .as_ref()
            .is_some_and(|shell| shell.matches(periodic_box, positions))
        {
            debug!("reusing cached first-shell harmonics");
            return;
        }

        let _phase = debug_span!("first_shell").entered();
        let policy = self.config.shell;
        let accumulator = &self.accumulator;
        let (sets, qlm, requested) = run_in(self.pool.as_ref(), || {
            let finder = shell_finder(policy, periodic_box, positions);
            let (sets, qlm): (Vec<NeighborSet>, Vec<Vec<Complex64>>) = (0..positions.len())
                .into_par_iter()
                .map(|index| {
                    let set = finder.find(index);
                    let harmonics = accumulator.accumulate(set.bonds());
                    (set, harmonics)
                })
                .unzip();
            (sets, qlm, finder.requested_count())
        });

        let counts: Vec<usize> = sets.iter().map(NeighborSet::len).collect();
        let diagnostics = ShellDiagnostics::from_counts(&counts, requested);
        report_diagnostics(diagnostics, requested);

        self.shell = Some(FirstShell {
            periodic_box: *periodic_box,
            positions: positions.to_vec(),
            neighbors: sets
                .iter()
                .map(|set| set.indices().collect())
                .collect(),
            qlm,
            averaged: None,
            counts,
            diagnostics,
        });
    }
}

fn validate_configuration(periodic_box: &PeriodicBox, positions: &[[f32; 3]]) -> OrderResult<()> {
    periodic_box.validate()?;
    if periodic_box.is_2d() {
        return Err(OrderError::input_validation(
            "INPUT.BOX_2D",
            "Wl is a three-dimensional invariant; two-dimensional boxes are not supported",
        ));
    }
    validate_positions(positions)
}

fn build_pool(threads: usize) -> OrderResult<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("localwl-{index}"))
        .build()
        .map_err(|error| {
            OrderError::internal(
                "RUN.THREAD_POOL",
                format!("failed to build a pool of {threads} worker threads: {error}"),
            )
        })
}

fn run_in<R, F>(pool: Option<&ThreadPool>, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

fn report_diagnostics(diagnostics: ShellDiagnostics, requested: Option<usize>) {
    if diagnostics.isolated > 0 {
        warn!(
            particles = diagnostics.isolated,
            "particles without neighbors; their order parameters are zero"
        );
    }
    if diagnostics.short_shells > 0 {
        warn!(
            particles = diagnostics.short_shells,
            requested = requested.unwrap_or_default(),
            "fewer neighbors available than requested; using all of them"
        );
    }
}
