//! Per-process CPU sampling: K instantaneous readings taken a fixed
//! interval apart, reduced to their unweighted mean.

use crate::types::SkipReason;
use std::thread;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Unweighted mean of a set of per-sample readings.
pub fn mean(readings: &[f32]) -> f32 {
    if readings.is_empty() {
        return 0.0;
    }
    readings.iter().sum::<f32>() / readings.len() as f32
}

/// Take `samples` CPU readings for `pid`, `interval` apart, and average
/// them. sysinfo derives usage from the CPU-time delta between two
/// consecutive refreshes, so each reading refreshes only this process.
/// Readings are raw: 0 to 100 x core count, no clamping.
///
/// A pid that stops resolving at any point in the loop is a transient
/// process loss; the caller drops it from the ranked set and moves on.
pub fn sample_cpu(
    sys: &mut System,
    pid: Pid,
    interval: Duration,
    samples: u32,
) -> Result<f32, SkipReason> {
    let mut readings = Vec::with_capacity(samples as usize);
    for _ in 0..samples {
        thread::sleep(interval);
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        );
        match sys.process(pid) {
            Some(p) => readings.push(p.cpu_usage()),
            None => return Err(SkipReason::NotFound),
        }
    }
    Ok(mean(&readings))
}
