//! Entry point for proctop. Parses flags, acquires one pass of process
//! records, ranks them, and prints the top of the list.

mod acquire;
mod config;
mod generic;
mod native;
mod render;
mod sampler;
mod topk;
mod types;

use anyhow::Context;
use config::{Config, Limit, RankMode, DEFAULT_COUNT, DEFAULT_INTERVAL_SECS};
use std::collections::HashMap;
use topk::RankEntry;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct ParsedArgs {
    limit: Option<Limit>,
    interval: f64,
    memory: bool,
    generic: bool,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [-n N|--number N] [-i SECS|--interval SECS] [-m|--memory] [-g|--generic]
  -n, --number    report only the top N processes, or 'all' (default {DEFAULT_COUNT})
  -i, --interval  CPU sampling interval in seconds (default {DEFAULT_INTERVAL_SECS})
  -m, --memory    rank by virtual memory instead of CPU
  -g, --generic   force the library backend, skip the native utility"
    )
}

fn parse_limit(prog: &str, raw: Option<String>) -> Result<Limit, String> {
    let raw = raw.ok_or_else(|| usage(prog))?;
    if raw == "all" {
        return Ok(Limit::All);
    }
    match raw.parse::<i64>() {
        // Zero or negative means "report nothing", not an error.
        Ok(n) if n <= 0 => Ok(Limit::Count(0)),
        Ok(n) => Ok(Limit::Count(n as usize)),
        Err(_) => Err(usage(prog)),
    }
}

fn parse_interval(prog: &str, raw: Option<String>) -> Result<f64, String> {
    raw.and_then(|v| v.parse().ok()).ok_or_else(|| usage(prog))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "proctop".into());
    let mut limit: Option<Limit> = None;
    let mut interval: Option<f64> = None;
    let mut memory = false;
    let mut generic = false;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "-n" | "--number" => limit = Some(parse_limit(&prog, it.next())?),
            "-i" | "--interval" => interval = Some(parse_interval(&prog, it.next())?),
            "-m" | "--memory" => memory = true,
            "-g" | "--generic" => generic = true,
            _ if arg.starts_with("--number=") => {
                let v = arg.split_once('=').map(|(_, v)| v.to_string());
                limit = Some(parse_limit(&prog, v)?);
            }
            _ if arg.starts_with("--interval=") => {
                let v = arg.split_once('=').map(|(_, v)| v.to_string());
                interval = Some(parse_interval(&prog, v)?);
            }
            _ => return Err(usage(&prog)),
        }
    }
    Ok(ParsedArgs {
        limit,
        interval: interval.unwrap_or(DEFAULT_INTERVAL_SECS),
        memory,
        generic,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let parsed = match parse_args(std::env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let cfg = Config::new(parsed.limit, parsed.interval, parsed.memory, parsed.generic)
        .context("invalid configuration")?;

    let records = acquire::acquire(&cfg).context("process acquisition failed")?;

    // Each pass owns its heap entries and pid -> record side table.
    let mut by_pid = HashMap::with_capacity(records.len());
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        let usage = match cfg.rank {
            RankMode::Cpu => f64::from(record.cpu_percent.unwrap_or(0.0)),
            RankMode::Memory => record.vms_mib,
        };
        entries.push(RankEntry::new(usage, record.pid));
        by_pid.insert(record.pid, record);
    }

    let ranked = topk::select_top(entries, &by_pid, cfg.limit);
    render::print_top(&ranked)
}
