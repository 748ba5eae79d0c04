//! Backend selection and the acquisition state machine.
//!
//! A native-utility failure is never fatal: the machine falls back to
//! the library backend and says so on the diagnostic stream. Only the
//! library backend failing ends the run.

use crate::config::Config;
use crate::generic;
use crate::native::{self, Family};
use crate::types::{AcquireError, Acquisition, ProcessRecord, Skipped};
use tracing::{debug, warn};

/// Acquisition capability, decided once per run from the OS family and
/// the forced-generic flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    NativeUtilityMac,
    NativeUtilityLinux,
    LibraryGeneric,
}

/// Pure selection: forcing generic wins, otherwise the OS family picks
/// its native utility, and unknown families go straight to the library.
pub fn select_backend(os: &str, force_generic: bool) -> Backend {
    if force_generic {
        return Backend::LibraryGeneric;
    }
    match os {
        "macos" => Backend::NativeUtilityMac,
        "linux" => Backend::NativeUtilityLinux,
        _ => Backend::LibraryGeneric,
    }
}

enum Phase {
    SelectBackend(Backend),
    TryNative(Family),
    TryLibrary,
    Done(Vec<ProcessRecord>),
    Failed(AcquireError),
}

/// Drive the state machine against injectable backends.
fn run<N, L>(backend: Backend, mut native: N, mut library: L) -> Result<Vec<ProcessRecord>, AcquireError>
where
    N: FnMut(Family) -> Acquisition,
    L: FnMut() -> Acquisition,
{
    let mut phase = Phase::SelectBackend(backend);
    loop {
        phase = match phase {
            Phase::SelectBackend(Backend::NativeUtilityMac) => Phase::TryNative(Family::Mac),
            Phase::SelectBackend(Backend::NativeUtilityLinux) => Phase::TryNative(Family::Linux),
            Phase::SelectBackend(Backend::LibraryGeneric) => Phase::TryLibrary,
            Phase::TryNative(family) => match native(family) {
                Acquisition::Complete(records) => Phase::Done(records),
                Acquisition::Partial(records, skipped) => {
                    log_skips(&skipped);
                    Phase::Done(records)
                }
                Acquisition::Failed(cause) => {
                    warn!(%cause, "native utility failed, falling back to process library");
                    Phase::TryLibrary
                }
            },
            Phase::TryLibrary => match library() {
                Acquisition::Complete(records) => Phase::Done(records),
                Acquisition::Partial(records, skipped) => {
                    log_skips(&skipped);
                    Phase::Done(records)
                }
                Acquisition::Failed(cause) => Phase::Failed(cause),
            },
            Phase::Done(records) => return Ok(records),
            Phase::Failed(cause) => return Err(cause),
        };
    }
}

fn log_skips(skipped: &[Skipped]) {
    for s in skipped {
        warn!(pid = s.pid, reason = %s.reason, "process skipped");
    }
}

/// Acquire one pass of process records for this run's configuration.
pub fn acquire(cfg: &Config) -> Result<Vec<ProcessRecord>, AcquireError> {
    let backend = select_backend(std::env::consts::OS, cfg.force_generic);
    debug!(?backend, "selected acquisition backend");
    run(
        backend,
        |family| native::collect(family, cfg.rank),
        || generic::collect(cfg),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProcStatus, SkipReason};
    use std::cell::Cell;

    fn record(pid: u32) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: format!("proc-{pid}"),
            user: "tester".into(),
            status: ProcStatus::Sleeping,
            vms_mib: 1.0,
            cpu_percent: None,
        }
    }

    fn spawn_failure() -> AcquireError {
        AcquireError::Spawn {
            utility: "top".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    #[test]
    fn backend_selection_is_pure() {
        assert_eq!(select_backend("linux", false), Backend::NativeUtilityLinux);
        assert_eq!(select_backend("macos", false), Backend::NativeUtilityMac);
        assert_eq!(select_backend("freebsd", false), Backend::LibraryGeneric);
        assert_eq!(select_backend("linux", true), Backend::LibraryGeneric);
        assert_eq!(select_backend("macos", true), Backend::LibraryGeneric);
    }

    #[test]
    fn native_failure_falls_back_to_library_exactly_once() {
        let library_calls = Cell::new(0);
        let result = run(
            Backend::NativeUtilityLinux,
            |_| Acquisition::Failed(spawn_failure()),
            || {
                library_calls.set(library_calls.get() + 1);
                Acquisition::Complete(vec![record(7)])
            },
        );
        assert_eq!(library_calls.get(), 1);
        assert_eq!(result.unwrap()[0].pid, 7);
    }

    #[test]
    fn forced_generic_never_touches_native() {
        let native_calls = Cell::new(0);
        let result = run(
            select_backend("linux", true),
            |_| {
                native_calls.set(native_calls.get() + 1);
                Acquisition::Failed(spawn_failure())
            },
            || Acquisition::Complete(vec![record(1)]),
        );
        assert_eq!(native_calls.get(), 0);
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn native_success_skips_library() {
        let library_calls = Cell::new(0);
        let result = run(
            Backend::NativeUtilityMac,
            |family| {
                assert_eq!(family, Family::Mac);
                Acquisition::Complete(vec![record(3), record(4)])
            },
            || {
                library_calls.set(library_calls.get() + 1);
                Acquisition::Complete(vec![])
            },
        );
        assert_eq!(library_calls.get(), 0);
        assert_eq!(result.unwrap().len(), 2);
    }

    #[test]
    fn partial_library_pass_still_succeeds() {
        let result = run(
            Backend::LibraryGeneric,
            |_| unreachable!("library backend was forced"),
            || {
                Acquisition::Partial(
                    vec![record(1)],
                    vec![Skipped {
                        pid: 2,
                        reason: SkipReason::AccessDenied,
                    }],
                )
            },
        );
        let records = result.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, 1);
    }

    #[test]
    fn library_exhaustion_is_fatal() {
        let result = run(
            Backend::NativeUtilityLinux,
            |_| Acquisition::Failed(spawn_failure()),
            || Acquisition::Failed(AcquireError::Enumeration("simulated outage".into())),
        );
        assert!(matches!(result, Err(AcquireError::Enumeration(_))));
    }
}
