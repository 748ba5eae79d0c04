//! Line-per-process output: the pid followed by the record's attribute
//! map as one JSON object. Diagnostics go to stderr, never here.

use crate::types::ProcessRecord;
use anyhow::Result;
use std::io::Write;

pub fn print_top(ranked: &[(u32, ProcessRecord)]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (pid, record) in ranked {
        let attrs = serde_json::to_string(record)?;
        writeln!(out, "{pid} {attrs}")?;
    }
    Ok(())
}
