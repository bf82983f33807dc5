use super::CliError;
use anyhow::Context;
use localwl_core::{
    EngineConfig, OrderError, OrderVariant, PeriodicBox, ShellDiagnostics, ShellPolicy,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `RUST_LOG` is honored unless
/// `--verbose` forces debug output.
pub(super) fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // A subscriber may already be installed when commands run in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct Frame {
    #[serde(rename = "box")]
    pub(super) periodic_box: PeriodicBox,
    pub(super) positions: Vec<[f32; 3]>,
}

pub(super) fn load_frame(path: &Path) -> Result<Frame, CliError> {
    let source = fs::read_to_string(path).map_err(|error| {
        OrderError::io_system(
            "IO.FRAME_READ",
            format!("failed to read frame '{}': {error}", path.display()),
        )
    })?;

    let frame: Frame = serde_json::from_str(&source).map_err(|error| {
        OrderError::input_validation(
            "INPUT.FRAME_PARSE",
            format!("failed to parse frame '{}': {error}", path.display()),
        )
    })?;
    Ok(frame)
}

#[derive(Debug, Serialize)]
pub(super) struct RunSummary {
    particles: usize,
    degree: usize,
    shell: ShellPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    threads: Option<usize>,
    diagnostics: ShellDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    neighbor_counts: Option<Vec<usize>>,
    variants: Vec<VariantSummary>,
}

#[derive(Debug, Serialize)]
struct VariantSummary {
    variant: OrderVariant,
    mean: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Vec<f64>>,
}

impl RunSummary {
    pub(super) fn new(config: &EngineConfig, particles: usize) -> Self {
        Self {
            particles,
            degree: config.degree,
            shell: config.shell,
            threads: config.threads,
            diagnostics: ShellDiagnostics::default(),
            neighbor_counts: None,
            variants: Vec::new(),
        }
    }

    pub(super) fn push_variant(&mut self, variant: OrderVariant, values: &[f64], per_particle: bool) {
        let (min, max) = values
            .iter()
            .fold(None, |range: Option<(f64, f64)>, value| match range {
                Some((low, high)) => Some((low.min(*value), high.max(*value))),
                None => Some((*value, *value)),
            })
            .unzip();
        let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);

        self.variants.push(VariantSummary {
            variant,
            mean,
            min,
            max,
            values: per_particle.then(|| values.to_vec()),
        });
    }

    pub(super) fn set_diagnostics(&mut self, diagnostics: ShellDiagnostics) {
        self.diagnostics = diagnostics;
    }

    pub(super) fn set_neighbor_counts(&mut self, counts: &[usize]) {
        self.neighbor_counts = Some(counts.to_vec());
    }
}

pub(super) fn emit_summary(summary: &RunSummary, output: Option<&Path>) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(summary).context("failed to serialize run summary")?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory '{}'", parent.display())
                })?;
            }
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write summary '{}'", path.display()))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::RunSummary;
    use localwl_core::{EngineConfig, OrderVariant};

    #[test]
    fn summary_reports_range_and_mean() {
        let mut summary = RunSummary::new(&EngineConfig::cutoff(6, 1.5), 3);
        summary.push_variant(OrderVariant::Wl, &[-1.0, 0.5, 2.0], false);
        summary.push_variant(OrderVariant::AveWl, &[], true);

        let rendered = serde_json::to_value(&summary).expect("summary should serialize");
        let wl = &rendered["variants"][0];
        assert_eq!(wl["variant"], "wl");
        assert_eq!(wl["min"], -1.0);
        assert_eq!(wl["max"], 2.0);
        assert_eq!(wl["mean"], 0.5);
        assert!(wl.get("values").is_none());

        let empty = &rendered["variants"][1];
        assert!(empty["mean"].is_null());
        assert_eq!(empty["values"], serde_json::json!([]));
        assert_eq!(rendered["shell"]["kind"], "cutoff");
    }
}
