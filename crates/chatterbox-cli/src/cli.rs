//! Command-line interface
//!
//! Exactly one population option picks the caller count. An optional
//! trailing OUTPUT path sends the log to that file at shutdown instead of
//! streaming it to stdout:
//!
//! ```text
//! chatterbox -c 10
//! chatterbox -r 5 20 calls.log
//! chatterbox -f count.txt calls.log
//! ```

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, ensure};
use chatterbox_core::logging::{LoggingConfig, log_welcome, setup_logging};
use chatterbox_core::prelude::*;
use clap::{ArgGroup, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::trigger;

#[derive(Parser, Debug)]
#[command(name = "chatterbox", author, version, about = "Concurrent phone caller simulation", long_about = None)]
#[command(group(ArgGroup::new("population").required(true).args(["count", "range", "from_file"])))]
pub struct Cli {
    /// Simulate exactly N callers
    #[arg(short = 'c', long, value_name = "N")]
    pub count: Option<usize>,

    /// Draw the caller count uniformly from LOWER..=UPPER
    #[arg(short = 'r', long, num_args = 2, value_names = ["LOWER", "UPPER"])]
    pub range: Option<Vec<usize>>,

    /// Read the caller count from the first token of a file
    #[arg(short = 'f', long = "from-file", value_name = "PATH", requires = "output")]
    pub from_file: Option<PathBuf>,

    /// Write the log to this file at shutdown instead of stdout
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Seed for every random draw, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Length of one pause tick in milliseconds
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Pauses are drawn from 0..TICKS ticks
    #[arg(long, value_name = "TICKS")]
    pub max_pause_ticks: Option<u32>,

    /// Stop on its own after this many seconds
    #[arg(long, value_name = "SECS")]
    pub run_for: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Diagnostic log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit diagnostics as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Caller count source selected on the command line
    pub fn population(&self) -> anyhow::Result<PopulationSource> {
        if let Some(count) = self.count {
            return Ok(PopulationSource::Fixed(count));
        }
        if let Some(bounds) = &self.range {
            let [lower, upper] = bounds.as_slice() else {
                anyhow::bail!("--range takes exactly two values");
            };
            return Ok(PopulationSource::Range {
                lower: *lower,
                upper: *upper,
            });
        }
        match &self.from_file {
            Some(path) => Ok(PopulationSource::File(path.clone())),
            None => anyhow::bail!("one of --count, --range or --from-file is required"),
        }
    }

    /// Configuration file (or defaults) with command-line overrides applied
    pub fn simulation_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(tick_ms) = self.tick_ms {
            config.pacing.tick_millis = tick_ms;
        }
        if let Some(ticks) = self.max_pause_ticks {
            config.pacing.max_pause_ticks = ticks;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_json {
            config.logging.json = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Run a simulation until a stop trigger fires
    pub async fn execute(self, process_start: Instant) -> anyhow::Result<()> {
        let config = self.simulation_config()?;
        setup_logging(LoggingConfig::from_settings(&config.logging)?)?;
        log_welcome("chatterbox", env!("CARGO_PKG_VERSION"));

        let population = self.population()?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let count = population.resolve(&mut rng)?;

        // Triggers are armed first so a failure here never strands a running sink.
        let shutdown = ShutdownSignal::new();
        let run_for = self.run_for.map(Duration::from_secs);
        let triggers = trigger::Triggers::arm(io::stdin(), &shutdown, run_for)
            .context("Can't start the stop listeners")?;

        let mut builder = SimulationBuilder::new()
            .config(config)
            .callers(count)
            .clock(MonotonicClock::since(process_start))
            .shutdown_signal(shutdown.clone());
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        if let Some(line) = population.announcement(count) {
            builder = builder.announce(line);
        }
        builder = match &self.output {
            Some(path) => {
                debug!("📝 Log lines will be written to {} at shutdown", path.display());
                builder.sink(BufferedFileSink::new(path))
            }
            None => builder.sink(ConsoleSink::stdout()),
        };

        let handle = builder.start()?;
        info!("☎️ {} callers on the line, press 'q' then Enter to stop", count);

        let report = handle.wait().await?;
        triggers.disarm();

        if let Some(path) = &self.output {
            info!("💾 Wrote {} lines to {}", report.counters.logged(), path.display());
        }
        ensure!(
            report.is_consistent(),
            "registry ended inconsistent: {:?}",
            report.pairing_violation
        );
        Ok(())
    }
}
