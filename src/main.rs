use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;

use ip4pool::config::Config;
use ip4pool::config_loader::{build_pools, load_config};
use ip4pool::{
    format_address, parse_address, AddressRange, AllocatorError, AllocatorState, BitmapAllocator,
};

/// Bitmap-backed IPv4 address pool allocator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the bounds and size of a range
    Info {
        /// CIDR subnet ("10.0.0.0/24", "10.0.0.0/255.255.255.0") or "FIRST-LAST"
        range: AddressRange,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Assign addresses from a fresh pool in ascending order
    Assign {
        /// CIDR subnet or "FIRST-LAST" range to allocate from
        range: AddressRange,

        /// Number of addresses to assign
        #[arg(short = 'n', long, default_value = "1")]
        count: u64,

        /// Claim these addresses before assigning
        #[arg(long = "reserve")]
        reserved: Vec<String>,

        /// Print the assignments as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a pool configuration file and start every pool in it
    Check {
        /// Path to the pool configuration YAML file
        #[arg(short, long)]
        config: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct PoolSummary {
    name: Option<String>,
    first: String,
    last: String,
    count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<AllocatorState>,
}

#[derive(Debug, Serialize)]
struct AssignReport {
    pool: PoolSummary,
    reserved: Vec<String>,
    assigned: Vec<String>,
    exhausted: bool,
}

impl PoolSummary {
    fn new(name: Option<String>, allocator: &BitmapAllocator) -> Self {
        Self {
            name,
            first: format_address(allocator.first()),
            last: format_address(allocator.last()),
            count: allocator.count(),
            status: Some(allocator.status()),
        }
    }

    fn print(&self) {
        match &self.name {
            Some(name) => println!(
                "{}: {} - {} ({} addresses)",
                name, self.first, self.last, self.count
            ),
            None => println!("{} - {} ({} addresses)", self.first, self.last, self.count),
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging; --log-level wins over the config file's log_level
    env_logger::Builder::from_env(Env::default().default_filter_or(log_filter(&args))).init();

    match args.command {
        Command::Info { range, json } => {
            let summary = PoolSummary {
                name: None,
                first: format_address(range.first()),
                last: format_address(range.last()),
                count: range.count(),
                status: None,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.print();
            }
        }
        Command::Assign {
            range,
            count,
            reserved,
            json,
        } => {
            let report = run_assign(range, count, &reserved)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for addr in &report.assigned {
                    println!("{}", addr);
                }
                if report.exhausted {
                    warn!(
                        "Pool {} - {} exhausted after {} assignment(s)",
                        report.pool.first,
                        report.pool.last,
                        report.assigned.len()
                    );
                }
            }
        }
        Command::Check { config, json } => {
            let config = load_config(&config)?;
            let pools = build_pools(&config)?;

            let summaries: Vec<PoolSummary> = pools
                .iter()
                .map(|pool| PoolSummary::new(Some(pool.name.clone()), &pool.allocator))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                summaries.iter().for_each(PoolSummary::print);
            }

            for pool in &pools {
                pool.allocator
                    .close()
                    .wrap_err_with(|| format!("Failed to close pool '{}'", pool.name))?;
            }
            info!("Configuration check completed successfully");
        }
    }

    Ok(())
}

/// Pick the default log filter from the command line or the config file
fn log_filter(args: &Args) -> String {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    if let Command::Check { config, .. } = &args.command {
        let level = std::fs::read_to_string(config)
            .ok()
            .and_then(|content| serde_yaml::from_str::<Config>(&content).ok())
            .and_then(|config| config.general.log_level);
        if let Some(level) = level {
            return level;
        }
    }
    "info".to_string()
}

/// Start a pool over `range`, claim `reserved`, then assign up to `count` addresses
fn run_assign(range: AddressRange, count: u64, reserved: &[String]) -> Result<AssignReport> {
    let allocator = BitmapAllocator::with_options(range, Default::default())?;

    for text in reserved {
        let addr = parse_address(text)?;
        allocator
            .try_assign_specific(addr)
            .wrap_err_with(|| format!("Cannot reserve {}", text))?;
    }

    let mut assigned = Vec::new();
    let mut exhausted = false;
    for _ in 0..count {
        match allocator.try_assign() {
            Ok(addr) => assigned.push(format_address(addr)),
            Err(AllocatorError::Exhausted) => {
                exhausted = true;
                break;
            }
            Err(e) => bail!("Assignment failed: {}", e),
        }
    }

    allocator.close()?;
    Ok(AssignReport {
        pool: PoolSummary::new(None, &allocator),
        reserved: reserved.to_vec(),
        assigned,
        exhausted,
    })
}
