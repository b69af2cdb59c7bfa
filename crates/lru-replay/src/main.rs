//! lru-replay - run a workload of cache operations against an LRU cache

mod replay;
mod workload;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::replay::Replay;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workload file, `-` for stdin
    #[arg(default_value = "-")]
    workload: String,

    /// Cache capacity (number of entries)
    #[arg(short, long, default_value_t = 1024)]
    capacity: usize,

    /// Only print the final summary
    #[arg(short, long)]
    quiet: bool,
}

/// `RUST_LOG`-style directives, falling back to `info`
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let mut replay = Replay::new(args.capacity)
        .with_context(|| format!("Invalid cache capacity {}", args.capacity))?;
    info!("Cache capacity: {}", args.capacity);

    let source = workload::load(&args.workload)?;
    let commands = workload::parse(&source)?;
    info!("Loaded {} commands from {}", commands.len(), args.workload);

    for command in commands {
        let line = replay.apply(command);
        if !args.quiet {
            writeln!(out, "{}", line)?;
        }
    }
    if !args.quiet {
        writeln!(out, "order (mru first): {}", replay.keys().join(" "))?;
    }
    writeln!(out, "{}", replay.summary())?;

    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr so the report stays clean on stdout
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&directives))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    run(&args, &mut stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn args(workload: &str, capacity: usize, quiet: bool) -> Args {
        Args {
            workload: workload.to_string(),
            capacity,
            quiet,
        }
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter("").max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_log_filter_global_level_overrides_default() {
        assert_eq!(log_filter("trace").max_level_hint(), Some(LevelFilter::TRACE));
        assert_eq!(log_filter("warn").max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_zero_capacity_rejected_before_reading_workload() {
        let err = run(&args("/nonexistent/workload.txt", 0, false), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("Invalid cache capacity 0"), "{}", err);
    }

    #[test]
    fn test_run_reports_operations_and_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "put A 1\nput B 2\nget A\nput C 3").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let mut out = Vec::new();
        run(&args(&path, 2, false), &mut out).unwrap();
        let report = String::from_utf8(out).unwrap();

        assert!(report.contains("put C 3 (evicted B=2)\n"), "{}", report);
        assert!(report.contains("order (mru first): C A\n"), "{}", report);
        assert!(report.ends_with("evictions=1\n"), "{}", report);
    }

    #[test]
    fn test_run_quiet_prints_summary_only() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "put a 1\nget a").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let mut out = Vec::new();
        run(&args(&path, 4, true), &mut out).unwrap();
        let report = String::from_utf8(out).unwrap();

        assert_eq!(report.lines().count(), 1);
        assert!(report.starts_with("capacity=4 entries=1"), "{}", report);
    }
}
