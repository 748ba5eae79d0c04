//! Record and error types shared by the acquisition backends.
//! The serialized shape of `ProcessRecord` is the per-line output format.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// `top`-style memory figures are reported in MiB.
pub const BYTES_PER_MIB: f64 = 1_048_576.0;

/// One process as seen by a single acquisition pass. Built fresh every
/// run and discarded after rendering.
#[derive(Debug, Serialize, Clone)]
pub struct ProcessRecord {
    #[serde(skip)]
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub status: ProcStatus,
    /// Virtual memory size in MiB.
    pub vms_mib: f64,
    /// Mean CPU usage over the sampling window; set only when ranking by CPU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcStatus {
    Running,
    Sleeping,
    Idle,
    Zombie,
    Stopped,
    Dead,
    Unknown,
}

impl From<sysinfo::ProcessStatus> for ProcStatus {
    fn from(s: sysinfo::ProcessStatus) -> Self {
        use sysinfo::ProcessStatus as S;
        match s {
            S::Run => ProcStatus::Running,
            S::Sleep | S::UninterruptibleDiskSleep => ProcStatus::Sleeping,
            S::Idle | S::Parked | S::LockBlocked => ProcStatus::Idle,
            S::Zombie => ProcStatus::Zombie,
            S::Stop | S::Tracing => ProcStatus::Stopped,
            S::Dead => ProcStatus::Dead,
            _ => ProcStatus::Unknown,
        }
    }
}

impl ProcStatus {
    /// Map a state field from the native utility: single letters on Linux
    /// ("R", "S", "Z", ...), words on macOS ("running", "sleeping", ...).
    pub fn from_utility(field: &str) -> Self {
        match field.to_ascii_lowercase().as_str() {
            "r" | "running" | "runnable" => ProcStatus::Running,
            "s" | "d" | "sleeping" => ProcStatus::Sleeping,
            "i" | "w" | "idle" => ProcStatus::Idle,
            "z" | "zombie" => ProcStatus::Zombie,
            "t" | "stopped" | "stuck" => ProcStatus::Stopped,
            "x" | "dead" | "halted" => ProcStatus::Dead,
            _ => ProcStatus::Unknown,
        }
    }
}

/// Why a single process was dropped from a pass. Skips are local: the
/// pass keeps going and the pid simply never reaches the ranking heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Vanished between enumeration and collection.
    NotFound,
    /// The process table would not let us read its attributes.
    AccessDenied,
    /// Defunct entry with no collectable stats.
    Zombie,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => f.write_str("not found"),
            SkipReason::AccessDenied => f.write_str("access denied"),
            SkipReason::Zombie => f.write_str("zombie"),
        }
    }
}

/// A process excluded from the ranked set, with the reason.
#[derive(Debug, Clone, Copy)]
pub struct Skipped {
    pub pid: u32,
    pub reason: SkipReason,
}

/// Hard backend failures. A native-utility failure triggers fallback to
/// the library backend; a library failure ends the run.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to spawn {utility}: {source}")]
    Spawn {
        utility: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{utility} failed: {detail}")]
    Utility { utility: String, detail: String },
    #[error("{utility} produced no parseable process rows")]
    Unparseable { utility: String },
    #[error("process enumeration unavailable: {0}")]
    Enumeration(String),
}

/// Outcome of one acquisition attempt.
#[derive(Debug)]
pub enum Acquisition {
    /// Every visible process yielded a record.
    Complete(Vec<ProcessRecord>),
    /// Some processes were skipped, but the pass still produced records.
    Partial(Vec<ProcessRecord>, Vec<Skipped>),
    /// The backend produced nothing usable.
    Failed(AcquireError),
}
