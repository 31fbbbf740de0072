use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use flock_host::{HostSettings, RunOptions, Scenario};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless leader-following flock simulation", long_about = None)]
struct Args {
    /// JSON file with `follower` and `steering` settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Number of leaders orbiting the origin
    #[arg(short, long, default_value_t = 3)]
    leaders: usize,

    /// Number of followers, spread round-robin over the leaders
    #[arg(short, long, default_value_t = 30)]
    followers: usize,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Ask followers to switch to their nearest leader every N ticks (0 disables)
    #[arg(long, default_value_t = 60)]
    reelect_every: u64,

    /// Write a JSON report line every N ticks (0 disables)
    #[arg(long, default_value_t = 10)]
    report_every: u64,

    /// Seed for the initial scatter
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            leaders: self.leaders,
            followers: self.followers,
            ticks: self.ticks,
            dt: self.dt,
            reelect_every: self.reelect_every,
            report_every: self.report_every,
            seed: self.seed,
            ..RunOptions::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let settings = match &args.settings {
        Some(path) => HostSettings::load(path)?,
        None => HostSettings::default(),
    };
    log::debug!("Settings: {:?}", settings);

    let mut scenario =
        Scenario::new(args.run_options(), &settings).context("Failed to set up scenario")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = scenario.run(&mut out).context("Simulation error")?;

    log::info!(
        "{} ticks, {} reports written",
        summary.ticks,
        summary.reports
    );
    Ok(())
}
