use super::CliError;
use super::helpers::{Frame, RunSummary, emit_summary, load_frame};
use clap::{Args, ValueEnum};
use localwl_core::lattice::fcc;
use localwl_core::{EngineConfig, LocalWl, OrderVariant, ShellPolicy, load_engine_config};
use std::path::PathBuf;
use tracing::info;

/// Shell and engine flags shared by every subcommand.
#[derive(Debug, Args)]
pub(super) struct ShellArgs {
    /// Spherical-harmonic degree l
    #[arg(short = 'l', long, default_value_t = 6)]
    degree: usize,
    /// Shell of every particle strictly within this distance
    #[arg(long, value_name = "R", conflicts_with = "neighbors")]
    r_cut: Option<f64>,
    /// Shell of the K nearest particles
    #[arg(long, value_name = "K")]
    neighbors: Option<usize>,
    /// Initial search radius for --neighbors
    #[arg(long, value_name = "R", requires = "neighbors")]
    r_guess: Option<f64>,
    /// Worker threads (default: rayon's global pool)
    #[arg(long, value_name = "T")]
    threads: Option<usize>,
}

impl ShellArgs {
    fn engine_config(&self) -> Result<EngineConfig, CliError> {
        let shell = match (self.r_cut, self.neighbors) {
            (Some(r_cut), None) => ShellPolicy::Cutoff { r_cut },
            (None, Some(count)) => ShellPolicy::Nearest {
                count,
                r_guess: self.r_guess,
            },
            _ => {
                return Err(CliError::Usage(
                    "exactly one of --r-cut or --neighbors is required".to_string(),
                ));
            }
        };

        Ok(EngineConfig {
            degree: self.degree,
            shell,
            threads: self.threads,
        })
    }
}

/// Output flags shared by every subcommand.
#[derive(Debug, Args)]
pub(super) struct OutputArgs {
    /// Which quantities to compute
    #[arg(long, value_enum, default_value_t = VariantSelection::All)]
    variant: VariantSelection,
    /// Include the per-particle arrays in the summary
    #[arg(long)]
    per_particle: bool,
    /// Write the summary to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(super) enum VariantSelection {
    Wl,
    Ave,
    Norm,
    AveNorm,
    All,
}

impl VariantSelection {
    fn variants(self) -> &'static [OrderVariant] {
        match self {
            Self::Wl => &[OrderVariant::Wl],
            Self::Ave => &[OrderVariant::AveWl],
            Self::Norm => &[OrderVariant::WlNorm],
            Self::AveNorm => &[OrderVariant::WlAveNorm],
            Self::All => &OrderVariant::ALL,
        }
    }
}

#[derive(Debug, Args)]
pub(super) struct LatticeArgs {
    /// Conventional cells per box side
    #[arg(long, default_value_t = 4)]
    cells: usize,
    /// Edge of the conventional cubic cell
    #[arg(long, value_name = "A", default_value_t = 2.0)]
    lattice_constant: f64,
    #[command(flatten)]
    shell: ShellArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
pub(super) struct ComputeArgs {
    /// Frame document: { "box": { "lengths": [..], "tilts": [..] }, "positions": [[x, y, z], ..] }
    #[arg(long, value_name = "FRAME.json")]
    frame: PathBuf,
    /// Engine configuration document; replaces the shell flags
    #[arg(long, value_name = "CONFIG.json", conflicts_with_all = ["r_cut", "neighbors", "r_guess"])]
    config: Option<PathBuf>,
    #[command(flatten)]
    shell: ShellArgs,
    #[command(flatten)]
    output: OutputArgs,
}

pub(super) fn run_lattice_command(args: LatticeArgs) -> Result<i32, CliError> {
    let config = args.shell.engine_config()?;
    let (periodic_box, positions) = fcc(args.cells, args.lattice_constant)?;
    info!(
        cells = args.cells,
        particles = positions.len(),
        "generated fcc lattice"
    );

    evaluate_frame(config, Frame { periodic_box, positions }, &args.output)
}

pub(super) fn run_compute_command(args: ComputeArgs) -> Result<i32, CliError> {
    let config = match &args.config {
        Some(path) => {
            let mut config = load_engine_config(path)?;
            if args.shell.threads.is_some() {
                config.threads = args.shell.threads;
            }
            config
        }
        None => args.shell.engine_config()?,
    };
    let frame = load_frame(&args.frame)?;
    info!(
        frame = %args.frame.display(),
        particles = frame.positions.len(),
        "loaded frame"
    );

    evaluate_frame(config, frame, &args.output)
}

fn evaluate_frame(config: EngineConfig, frame: Frame, output: &OutputArgs) -> Result<i32, CliError> {
    let mut engine = LocalWl::new(config)?;
    let mut summary = RunSummary::new(&config, frame.positions.len());

    for variant in output.variant.variants() {
        let values = engine.evaluate(&frame.periodic_box, &frame.positions, *variant)?;
        summary.push_variant(*variant, values, output.per_particle);
    }
    summary.set_diagnostics(engine.diagnostics());
    if output.per_particle {
        summary.set_neighbor_counts(engine.neighbor_counts());
    }

    emit_summary(&summary, output.output.as_deref())?;
    Ok(0)
}
