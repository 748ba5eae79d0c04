//! Run configuration, frozen before any sampling starts. CLI flags plus
//! one env override, validated up front.

use once_cell::sync::OnceCell;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_COUNT: usize = 10;
pub const DEFAULT_INTERVAL_SECS: f64 = 0.001;
pub const DEFAULT_CPU_SAMPLES: u32 = 3;

/// Which usage figure orders the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMode {
    Cpu,
    Memory,
}

/// How many ranked processes to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    All,
    Count(usize),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub limit: Limit,
    /// Per-sample CPU measurement interval.
    pub interval: Duration,
    /// Readings averaged per process in CPU mode.
    pub samples: u32,
    pub rank: RankMode,
    /// Skip the native utility and go straight to the library backend.
    pub force_generic: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("interval must be a positive number of seconds, got {0}")]
    BadInterval(f64),
    #[error("cpu sample count must be at least 1")]
    NoSamples,
}

// Read once; invalid values fall back to the default rather than erroring.
fn cpu_samples_env() -> Option<u32> {
    static N: OnceCell<Option<u32>> = OnceCell::new();
    *N.get_or_init(|| {
        std::env::var("PROCTOP_CPU_SAMPLES")
            .ok()
            .and_then(|v| v.parse().ok())
    })
}

impl Config {
    pub fn new(
        limit: Option<Limit>,
        interval_secs: f64,
        memory: bool,
        generic: bool,
    ) -> Result<Self, ConfigError> {
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(ConfigError::BadInterval(interval_secs));
        }
        let samples = cpu_samples_env().unwrap_or(DEFAULT_CPU_SAMPLES);
        if samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        Ok(Config {
            limit: limit.unwrap_or(Limit::Count(DEFAULT_COUNT)),
            interval: Duration::from_secs_f64(interval_secs),
            samples,
            rank: if memory { RankMode::Memory } else { RankMode::Cpu },
            force_generic: generic,
        })
    }
}
