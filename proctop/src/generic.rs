//! Library backend: enumerate the process table through sysinfo.
//!
//! Per-process trouble (vanished, unreadable, zombie) is a skip, not a
//! failure; the pass only fails when nothing can be enumerated at all.

use crate::config::{Config, RankMode};
use crate::sampler::sample_cpu;
use crate::types::{
    AcquireError, Acquisition, ProcStatus, ProcessRecord, SkipReason, Skipped, BYTES_PER_MIB,
};
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System, UpdateKind, Users};
use tracing::debug;

/// One full enumeration pass.
pub fn collect(cfg: &Config) -> Acquisition {
    let mut sys = System::new_with_specifics(
        RefreshKind::nothing().with_processes(
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_user(UpdateKind::OnlyIfNotSet),
        ),
    );
    if sys.processes().is_empty() {
        return Acquisition::Failed(AcquireError::Enumeration(
            "no processes visible to sysinfo".into(),
        ));
    }
    let users = Users::new_with_refreshed_list();
    let pids: Vec<Pid> = sys.processes().keys().copied().collect();

    let mut records = Vec::with_capacity(pids.len());
    let mut skipped = Vec::new();
    for pid in pids {
        let mut record = match snapshot(&sys, &users, pid) {
            Ok(r) => r,
            Err(reason) => {
                skipped.push(Skipped {
                    pid: pid.as_u32(),
                    reason,
                });
                continue;
            }
        };
        if cfg.rank == RankMode::Cpu {
            match sample_cpu(&mut sys, pid, cfg.interval, cfg.samples) {
                Ok(percent) => record.cpu_percent = Some(percent),
                Err(reason) => {
                    skipped.push(Skipped {
                        pid: record.pid,
                        reason,
                    });
                    continue;
                }
            }
        }
        records.push(record);
    }

    debug!(
        collected = records.len(),
        skipped = skipped.len(),
        "sysinfo enumeration pass complete"
    );
    if skipped.is_empty() {
        Acquisition::Complete(records)
    } else {
        Acquisition::Partial(records, skipped)
    }
}

fn snapshot(sys: &System, users: &Users, pid: Pid) -> Result<ProcessRecord, SkipReason> {
    let Some(p) = sys.process(pid) else {
        return Err(SkipReason::NotFound);
    };
    let status = ProcStatus::from(p.status());
    if status == ProcStatus::Zombie {
        return Err(SkipReason::Zombie);
    }
    // A missing uid means the process table is hiding the entry from us
    // (hidepid mounts, other users' processes on macOS).
    let Some(uid) = p.user_id() else {
        return Err(SkipReason::AccessDenied);
    };
    let user = users
        .get_user_by_id(uid)
        .map(|u| u.name().to_string())
        .unwrap_or_else(|| "unknown".into());
    Ok(ProcessRecord {
        pid: pid.as_u32(),
        name: p.name().to_string_lossy().into_owned(),
        user,
        status,
        vms_mib: p.virtual_memory() as f64 / BYTES_PER_MIB,
        cpu_percent: None,
    })
}
