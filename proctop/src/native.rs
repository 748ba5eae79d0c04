//! Native backend: spawn the platform's `top` in non-interactive mode
//! and parse its digit-led rows into process records.

use crate::config::RankMode;
use crate::types::{AcquireError, Acquisition, ProcStatus, ProcessRecord, BYTES_PER_MIB};
use std::process::Command;
use tracing::debug;

const UTILITY: &str = "top";

// Column order requested from macOS top; Linux batch output has a fixed
// PID USER PR NI VIRT RES SHR S %CPU %MEM TIME+ COMMAND layout.
const MAC_STATS: &str = "pid,cpu,mem,state,user,command";

/// Which platform family's `top` dialect to spawn and parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Linux,
    Mac,
}

fn utility_args(family: Family, rank: RankMode) -> Vec<&'static str> {
    match (family, rank) {
        (Family::Linux, RankMode::Cpu) => vec!["-b", "-n", "1"],
        (Family::Linux, RankMode::Memory) => vec!["-b", "-o", "%MEM", "-n", "1"],
        (Family::Mac, RankMode::Cpu) => vec!["-l", "1", "-stats", MAC_STATS],
        (Family::Mac, RankMode::Memory) => vec!["-l", "1", "-o", "mem", "-stats", MAC_STATS],
    }
}

/// Spawn the utility once, blocking until it exits, and parse its full
/// stdout. Any spawn failure, non-zero exit, or noise on stderr is a
/// hard failure so the orchestrator falls back to the library backend.
pub fn collect(family: Family, rank: RankMode) -> Acquisition {
    let args = utility_args(family, rank);
    debug!(?family, ?rank, ?args, "spawning native process utility");
    let output = match Command::new(UTILITY)
        .args(&args)
        // Keep the output locale- and tty-stable.
        .env("LC_ALL", "C")
        .env("TERM", "dumb")
        .output()
    {
        Ok(o) => o,
        Err(source) => {
            return Acquisition::Failed(AcquireError::Spawn {
                utility: UTILITY.into(),
                source,
            })
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() || !stderr.trim().is_empty() {
        let detail = if stderr.trim().is_empty() {
            format!("exit status {}", output.status)
        } else {
            stderr.trim().to_string()
        };
        return Acquisition::Failed(AcquireError::Utility {
            utility: UTILITY.into(),
            detail,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let records = parse_rows(&stdout, family, rank);
    if records.is_empty() {
        return Acquisition::Failed(AcquireError::Unparseable {
            utility: UTILITY.into(),
        });
    }
    Acquisition::Complete(records)
}

/// Rows start with a pid; anything else (banners, column headers, blank
/// lines) is noise and discarded.
pub fn parse_rows(raw: &str, family: Family, rank: RankMode) -> Vec<ProcessRecord> {
    raw.lines()
        .filter_map(|line| {
            let row = line.trim_start();
            match row.chars().next() {
                Some(c) if c.is_ascii_digit() => parse_row(row, family, rank),
                _ => None,
            }
        })
        .collect()
}

fn parse_row(row: &str, family: Family, rank: RankMode) -> Option<ProcessRecord> {
    match family {
        Family::Linux => parse_linux_row(row, rank),
        Family::Mac => parse_mac_row(row, rank),
    }
}

fn parse_linux_row(row: &str, rank: RankMode) -> Option<ProcessRecord> {
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() < 12 {
        return None;
    }
    let pid = fields[0].parse().ok()?;
    let vms_mib = parse_size_mib(fields[4], SizeUnit::Kib)?;
    let cpu = fields[8].parse::<f32>().ok()?;
    Some(ProcessRecord {
        pid,
        name: fields[11..].join(" "),
        user: fields[1].to_string(),
        status: ProcStatus::from_utility(fields[7]),
        vms_mib,
        cpu_percent: (rank == RankMode::Cpu).then_some(cpu),
    })
}

fn parse_mac_row(row: &str, rank: RankMode) -> Option<ProcessRecord> {
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() < 6 {
        return None;
    }
    let pid = fields[0].parse().ok()?;
    let cpu = fields[1].parse::<f32>().ok()?;
    let vms_mib = parse_size_mib(fields[2], SizeUnit::Bytes)?;
    Some(ProcessRecord {
        pid,
        name: fields[5..].join(" "),
        user: fields[4].to_string(),
        status: ProcStatus::from_utility(fields[3]),
        vms_mib,
        cpu_percent: (rank == RankMode::Cpu).then_some(cpu),
    })
}

/// Unit assumed for bare numbers: Linux VIRT is KiB, macOS mem is bytes.
#[derive(Debug, Clone, Copy)]
enum SizeUnit {
    Kib,
    Bytes,
}

impl SizeUnit {
    fn mib_factor(self) -> f64 {
        match self {
            SizeUnit::Kib => 1.0 / 1024.0,
            SizeUnit::Bytes => 1.0 / BYTES_PER_MIB,
        }
    }
}

/// Decode a `top`-style size field ("81456", "1.2g", "724M+") into MiB.
fn parse_size_mib(field: &str, default_unit: SizeUnit) -> Option<f64> {
    let cleaned = field.trim_end_matches(['+', '-']);
    if cleaned.is_empty() {
        return None;
    }
    let last = cleaned.chars().last()?;
    let (digits, factor) = if last.is_ascii_digit() {
        (cleaned, default_unit.mib_factor())
    } else {
        let factor = match last.to_ascii_lowercase() {
            'b' => 1.0 / BYTES_PER_MIB,
            'k' => 1.0 / 1024.0,
            'm' => 1.0,
            'g' => 1024.0,
            't' => 1024.0 * 1024.0,
            _ => return None,
        };
        (&cleaned[..cleaned.len() - 1], factor)
    };
    let value: f64 = digits.parse().ok()?;
    Some(value * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_BATCH: &str = "\
top - 14:31:07 up 10 days,  3:01,  1 user,  load average: 0.52, 0.58, 0.59
Tasks: 312 total,   1 running, 311 sleeping,   0 stopped,   0 zombie
%Cpu(s):  2.3 us,  0.8 sy,  0.0 ni, 96.8 id,  0.1 wa,  0.0 hi,  0.0 si,  0.0 st
MiB Mem :  31922.8 total,  12109.4 free,   8892.2 used,  10921.2 buff/cache
MiB Swap:   2048.0 total,   2048.0 free,      0.0 used.  21890.1 avail Mem

    PID USER      PR  NI    VIRT    RES    SHR S  %CPU  %MEM     TIME+ COMMAND
   1873 alice     20   0 4975584 312564 118212 R   6.2   1.0  42:17.33 gnome-shell
      1 root      20   0  168932  13012   8448 S   0.0   0.0   1:07.21 systemd
  21051 bob       20   0   21.2g 401224  89200 S   0.0   1.2   3:02.11 chrome --type=gpu
";

    const MAC_SAMPLE: &str = "\
Processes: 609 total, 2 running, 607 sleeping, 3127 threads
2026/08/06 10:44:12
Load Avg: 2.11, 2.33, 2.45
CPU usage: 5.26% user, 10.52% sys, 84.21% idle
PID    %CPU MEM    STATE    USER   COMMAND
724    3.4  724M+  sleeping alice  WindowServer
1      0.0  16M    sleeping root   launchd
";

    #[test]
    fn linux_headers_discarded_rows_parsed() {
        let records = parse_rows(LINUX_BATCH, Family::Linux, RankMode::Cpu);
        assert_eq!(records.len(), 3);

        let shell = &records[0];
        assert_eq!(shell.pid, 1873);
        assert_eq!(shell.user, "alice");
        assert_eq!(shell.name, "gnome-shell");
        assert_eq!(shell.status, ProcStatus::Running);
        assert_eq!(shell.cpu_percent, Some(6.2));
        assert!((shell.vms_mib - 4975584.0 / 1024.0).abs() < 1e-6);

        let chrome = &records[2];
        assert_eq!(chrome.name, "chrome --type=gpu");
        assert!((chrome.vms_mib - 21.2 * 1024.0).abs() < 1e-6);
    }

    #[test]
    fn linux_memory_mode_leaves_cpu_unset() {
        let records = parse_rows(LINUX_BATCH, Family::Linux, RankMode::Memory);
        assert!(records.iter().all(|r| r.cpu_percent.is_none()));
    }

    #[test]
    fn mac_rows_parsed() {
        let records = parse_rows(MAC_SAMPLE, Family::Mac, RankMode::Cpu);
        assert_eq!(records.len(), 2);

        let ws = &records[0];
        assert_eq!(ws.pid, 724);
        assert_eq!(ws.user, "alice");
        assert_eq!(ws.name, "WindowServer");
        assert_eq!(ws.status, ProcStatus::Sleeping);
        assert_eq!(ws.cpu_percent, Some(3.4));
        assert_eq!(ws.vms_mib, 724.0);
    }

    #[test]
    fn short_or_garbled_rows_are_noise() {
        let records = parse_rows("123 too short\n9no pid here\n", Family::Linux, RankMode::Cpu);
        assert!(records.is_empty());
    }

    #[test]
    fn size_fields_decode_to_mib() {
        assert_eq!(parse_size_mib("1024", SizeUnit::Kib), Some(1.0));
        assert_eq!(parse_size_mib("1.5g", SizeUnit::Kib), Some(1536.0));
        assert_eq!(parse_size_mib("724M+", SizeUnit::Bytes), Some(724.0));
        assert_eq!(parse_size_mib("16K", SizeUnit::Bytes), Some(0.015625));
        assert_eq!(parse_size_mib("2097152", SizeUnit::Bytes), Some(2.0));
        assert_eq!(parse_size_mib("junk", SizeUnit::Kib), None);
        assert_eq!(parse_size_mib("", SizeUnit::Kib), None);
    }

    #[test]
    fn cpu_and_memory_flags_differ_per_family() {
        assert_eq!(utility_args(Family::Linux, RankMode::Cpu), ["-b", "-n", "1"]);
        assert!(utility_args(Family::Linux, RankMode::Memory).contains(&"%MEM"));
        assert!(utility_args(Family::Mac, RankMode::Memory).contains(&"mem"));
        assert!(utility_args(Family::Mac, RankMode::Cpu).contains(&MAC_STATS));
    }
}
