//! Engine configuration: degree, neighbor-shell policy and worker count.
//!
//! The configuration is plain data so it can be built in code or loaded from a
//! JSON document; nothing here is process-wide state.

use crate::domain::{OrderError, OrderResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How the neighborhood of each particle is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShellPolicy {
    /// Every other particle strictly closer than `r_cut`.
    Cutoff { r_cut: f64 },
    /// The `count` closest particles. `r_guess` seeds the search radius; when
    /// absent it is estimated from the number density.
    Nearest {
        count: usize,
        #[serde(default)]
        r_guess: Option<f64>,
    },
}

impl ShellPolicy {
    pub fn validate(&self) -> OrderResult<()> {
        match *self {
            Self::Cutoff { r_cut } => {
                if !r_cut.is_finite() || r_cut <= 0.0 {
                    return Err(OrderError::input_validation(
                        "INPUT.R_CUT",
                        format!("cutoff radius must be positive and finite, got {r_cut}"),
                    ));
                }
            }
            Self::Nearest { count, r_guess } => {
                if count == 0 {
                    return Err(OrderError::input_validation(
                        "INPUT.NEIGHBOR_COUNT",
                        "nearest-neighbor count must be >= 1",
                    ));
                }
                if let Some(radius) = r_guess.filter(|radius| !radius.is_finite() || *radius <= 0.0)
                {
                    return Err(OrderError::input_validation(
                        "INPUT.R_GUESS",
                        format!("initial search radius must be positive and finite, got {radius}"),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    pub degree: usize,
    pub shell: ShellPolicy,
    /// Worker threads for a dedicated pool; `None` runs on rayon's global pool.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl EngineConfig {
    pub fn cutoff(degree: usize, r_cut: f64) -> Self {
        Self {
            degree,
            shell: ShellPolicy::Cutoff { r_cut },
            threads: None,
        }
    }

    pub fn nearest(degree: usize, count: usize) -> Self {
        Self {
            degree,
            shell: ShellPolicy::Nearest {
                count,
                r_guess: None,
            },
            threads: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn validate(&self) -> OrderResult<()> {
        if self.degree == 0 {
            return Err(OrderError::input_validation(
                "INPUT.DEGREE",
                "spherical-harmonic degree must be >= 1, got 0",
            ));
        }
        if self.threads == Some(0) {
            return Err(OrderError::input_validation(
                "INPUT.THREADS",
                "thread count must be >= 1 when given",
            ));
        }
        self.shell.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read engine configuration '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse engine configuration '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn load_engine_config(config_path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}
