//! 47loader tape mastering tool.
//!
//! Concatenates the input files and writes them as 47loader blocks to a TZX
//! file, or to standard output. Diagnostics, including the defines the
//! loader needs for a dynamic table, go to standard error.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::level_filters::LevelFilter;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use loader_tzx::master::DEFAULT_CHUNK;
use loader_tzx::timing::DEFAULT_PILOT_MS;
use loader_tzx::{LoadPattern, Master, OutputMode, PilotTone, Speed, Tape, TapeWriter, Timing};

#[derive(Debug, Parser)]
#[command(name = "loader-tzx")]
#[command(version, about = "Master 47loader TZX tape images", long_about = None)]
#[command(group(ArgGroup::new("pilot").args(["pilot_ms", "short_pilot", "resume_pilot", "clicks"])))]
#[command(group(ArgGroup::new("mode").args(["progressive", "instascreen", "fancy", "reverse"])))]
struct Cli {
    /// Files to concatenate into the payload
    #[arg(required_unless_present = "list_patterns")]
    files: Vec<PathBuf>,

    /// Loader speed preset
    #[arg(short, long, value_enum, default_value_t = Speed::Standard)]
    speed: Speed,

    /// Pilot tone length in milliseconds
    #[arg(long, value_name = "MS")]
    pilot_ms: Option<u16>,

    /// Use a short 600-pulse pilot
    #[arg(long)]
    short_pilot: bool,

    /// Use the minimal two-pulse resume pilot
    #[arg(long)]
    resume_pilot: bool,

    /// Play clicks before each pilot
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "8")]
    clicks: Option<u16>,

    /// Pause after the last block in milliseconds
    #[arg(long, value_name = "MS", default_value_t = loader_tzx::timing::DEFAULT_PAUSE_MS)]
    pause: u16,

    /// Store the block back to front
    #[arg(long)]
    reverse: bool,

    /// Load the payload progressively from ADDR ($8000, 0x8000 or 32768)
    #[arg(long, value_name = "ADDR", value_parser = parse_address)]
    progressive: Option<u16>,

    /// Block size for a progressive load
    #[arg(long, value_name = "BYTES", requires = "progressive")]
    chunk: Option<u16>,

    /// Load a screen as a single block
    #[arg(long)]
    instascreen: bool,

    /// Load a screen in a fancy order (see --list-patterns)
    #[arg(long, value_name = "PATTERN")]
    fancy: Option<LoadPattern>,

    /// Never use the fixed-length table layout
    #[arg(long)]
    no_fixed_length: bool,

    /// Write to this file instead of standard output, appending if it exists
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the dynamic table report to this file as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// List the fancy screen patterns and exit
    #[arg(long)]
    list_patterns: bool,

    /// More diagnostics (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Fewer diagnostics (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,
}

impl Cli {
    fn pilot(&self) -> PilotTone {
        if self.short_pilot {
            PilotTone::Short
        } else if self.resume_pilot {
            PilotTone::Resume
        } else if let Some(clicks) = self.clicks {
            PilotTone::Clicking { clicks }
        } else {
            PilotTone::Duration {
                ms: self.pilot_ms.unwrap_or(DEFAULT_PILOT_MS),
            }
        }
    }

    fn mode(&self) -> OutputMode {
        if let Some(address) = self.progressive {
            OutputMode::Progressive {
                address,
                chunk: self.chunk.unwrap_or(DEFAULT_CHUNK),
            }
        } else if self.instascreen {
            OutputMode::Instascreen
        } else if let Some(pattern) = self.fancy {
            OutputMode::FancyScreen(pattern)
        } else {
            OutputMode::Simple {
                reverse: self.reverse,
            }
        }
    }

    fn level(&self) -> LevelFilter {
        match i16::from(self.verbose) - i16::from(self.quiet) {
            ..=-2 => LevelFilter::ERROR,
            -1 => LevelFilter::WARN,
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Accepts `$8000`, `0x8000` or `32768`.
fn parse_address(s: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = s.strip_prefix('$').or_else(|| s.strip_prefix("0x")) {
        u16::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("bad address {s:?}: {e}"))
}

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .init();
}

fn read_payload(files: &[PathBuf]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    for path in files {
        let data = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        debug!(path = %path.display(), len = data.len(), "input");
        payload.extend_from_slice(&data);
    }
    Ok(payload)
}

fn write_tape(tape: &Tape, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        return TapeWriter::new(io::stdout().lock())
            .write(tape)
            .context("cannot write to standard output");
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let existing = file
        .metadata()
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();
    let out = BufWriter::new(file);
    let mut writer = if existing > 0 {
        debug!(path = %path.display(), existing, "appending");
        TapeWriter::appending(out)
    } else {
        TapeWriter::new(out)
    };
    writer
        .write(tape)
        .with_context(|| format!("cannot write {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.level());

    if cli.list_patterns {
        let mut stdout = io::stdout().lock();
        for pattern in LoadPattern::all() {
            writeln!(stdout, "{pattern}")?;
        }
        return Ok(());
    }

    let timing = Timing::new(cli.speed, cli.pilot(), cli.pause).context("invalid timing")?;
    let mut master = Master::new(timing);
    if cli.no_fixed_length {
        master = master.disable_fixed_length();
    }

    let payload = read_payload(&cli.files)?;
    let tape = master
        .prepare(cli.mode(), &payload)
        .context("cannot master tape")?;
    write_tape(&tape, cli.output.as_deref())?;

    if let Some(path) = &cli.report {
        match tape.report() {
            Some(report) => {
                let json = serde_json::to_string_pretty(report)?;
                fs::write(path, json + "\n")
                    .with_context(|| format!("cannot write {}", path.display()))?;
            }
            None => warn!("no dynamic table, so no report written"),
        }
    }
    Ok(())
}
