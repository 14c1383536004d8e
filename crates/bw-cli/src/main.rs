mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bw_core::{
    EngineConfig, MomentLog, ReplaySource, ResonanceSession, SampleSource, SimulatedBreathSource,
    SimulatedPulse, coherence_tier, export_snapshot, frequency_family, millis_to_iso8601,
    now_unix_millis, rate_status, stress_label, table,
};
use bw_store::Store;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::run::{Recorder, RunSummary, drive, drive_live, format_cue};

#[derive(Parser)]
#[command(name = "bw", about = "Breathing estimator and therapeutic tone selector")]
struct Cli {
    /// Path to a bw.toml (default: $BW_DATA_DIR/bw.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulated breath source on a virtual clock
    Simulate {
        /// Simulated duration in seconds
        #[arg(long, default_value_t = 60)]
        seconds: u64,

        /// RNG seed for jitter (random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Breath period in milliseconds (overrides config)
        #[arg(long)]
        period_ms: Option<f64>,

        /// Persist the run as a session
        #[arg(long)]
        record: bool,

        /// Print the final snapshot as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Analyze a recorded `timestamp_ms,level` trace
    Analyze {
        /// Trace file
        file: PathBuf,

        /// Print the final snapshot as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Real-time tick loop on the fallback generator; always recorded
    Live {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(long)]
        seconds: Option<u64>,

        /// RNG seed for jitter (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List recorded sessions, newest first
    Sessions {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the memory log of high-coherence moments
    Moments {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Export the latest session as a snapshot JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Print the therapeutic tone table
    Table,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let data_dir = bw_store::resolve_data_dir();
    bw_store::load_config(cli.config.as_deref(), &data_dir).context("failed to load config")
}

fn open_store(config: &EngineConfig) -> Result<Store> {
    let data_dir = bw_store::resolve_data_dir();
    let mut store = Store::open_in_dir(&data_dir)
        .with_context(|| format!("failed to open store in {}", data_dir.display()))?;
    store.set_moment_capacity(config.moments.capacity);
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Simulate {
            seconds,
            seed,
            period_ms,
            record,
            json,
        } => cmd_simulate(&cli, *seconds, *seed, *period_ms, *record, *json),
        Commands::Analyze { file, json } => cmd_analyze(&cli, file, *json),
        Commands::Live { seconds, seed } => cmd_live(&cli, *seconds, *seed).await,
        Commands::Sessions { limit } => cmd_sessions(&cli, *limit),
        Commands::Moments { limit } => cmd_moments(&cli, *limit),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Table => cmd_table(),
    }
}

fn cmd_simulate(
    cli: &Cli,
    seconds: u64,
    seed: Option<u64>,
    period_ms: Option<f64>,
    record: bool,
    json: bool,
) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(period) = period_ms {
        anyhow::ensure!(
            period.is_finite() && period > 0.0,
            "--period-ms must be finite and positive"
        );
        config.simulated.period_ms = period;
    }
    let seed = seed.unwrap_or_else(rand::random);
    if record {
        // persisted moments carry wall-clock timestamps
        config.simulated.start_ms = now_unix_millis();
    }
    let tick_ms = config.simulated.tick_ms.max(1);
    let max_ticks = seconds * 1000 / tick_ms;

    let mut session = ResonanceSession::new(&config);
    let mut source = SimulatedBreathSource::new(config.simulated.clone(), seed);
    tracing::info!(seed, ticks = max_ticks, source = %source.describe(), "simulating");

    let summary = if record {
        let store = open_store(&config)?;
        let id = store
            .begin_session(&source.describe())
            .context("failed to start session")?;
        let recorder = Recorder {
            store: &store,
            session: id,
        };
        let summary = drive(&mut session, &mut source, Some(max_ticks), Some(&recorder))?;
        store
            .end_session(id, session.ticks())
            .context("failed to close session")?;
        if !json {
            println!("recorded session {id}");
        }
        summary
    } else {
        drive(&mut session, &mut source, Some(max_ticks), None)?
    };

    if !json {
        print_cues(&summary);
    }
    report(&session, &summary, simulated_pulse(&session, seed), json)
}

fn cmd_analyze(cli: &Cli, file: &Path, json: bool) -> Result<()> {
    let config = load_config(cli)?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut source = ReplaySource::parse(&text, &file.display().to_string())
        .with_context(|| format!("failed to parse {}", file.display()))?;
    tracing::info!(samples = source.remaining(), source = %source.describe(), "analyzing");

    let mut session = ResonanceSession::new(&config);
    let summary = drive(&mut session, &mut source, None, None)?;
    if summary.rejected > 0 {
        tracing::warn!(rejected = summary.rejected, "trace had out-of-order samples");
    }
    if !json {
        print_cues(&summary);
    }
    report(&session, &summary, None, json)
}

async fn cmd_live(cli: &Cli, seconds: Option<u64>, seed: Option<u64>) -> Result<()> {
    let mut config = load_config(cli)?;
    let store = open_store(&config)?;

    let seed = seed.unwrap_or_else(rand::random);
    config.simulated.start_ms = now_unix_millis();
    let tick_ms = config.simulated.tick_ms.max(1);
    let mut source = SimulatedBreathSource::new(config.simulated.clone(), seed);

    // Timestamps are wall-clock here, so persisted moments keep their spacing.
    let prior = store
        .load_moments(config.moments.capacity)
        .context("failed to load memory log")?;
    let mut session = ResonanceSession::new(&config)
        .with_moment_log(MomentLog::with_moments(config.moments.clone(), prior));

    let id = store
        .begin_session(&format!("live:{}", source.describe()))
        .context("failed to start session")?;
    let recorder = Recorder {
        store: &store,
        session: id,
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
        }
        on_signal.cancel();
    });
    if let Some(secs) = seconds {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
            on_timeout.cancel();
        });
    }

    println!("session {id} (Ctrl-C to stop)");
    let summary = drive_live(&mut session, &mut source, tick_ms, &recorder, cancel).await;
    store
        .end_session(id, session.ticks())
        .context("failed to close session")?;

    report(&session, &summary, simulated_pulse(&session, seed), false)
}

fn cmd_sessions(cli: &Cli, limit: usize) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(&config)?;
    let sessions = store.list_sessions(limit).context("failed to list sessions")?;

    if sessions.is_empty() {
        println!("(no sessions recorded)");
        return Ok(());
    }
    for s in sessions {
        println!(
            "{}  {}  {}  ticks={} readings={}",
            s.id,
            s.started_at,
            s.source,
            s.ticks,
            s.readings
        );
    }
    Ok(())
}

fn cmd_moments(cli: &Cli, limit: usize) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(&config)?;
    let moments = store.load_moments(limit).context("failed to load moments")?;

    if moments.is_empty() {
        println!("(no moments captured)");
        return Ok(());
    }
    for m in moments {
        println!(
            "{}  coherence={:.2} tier={}  {} Hz  rate={:.1}  stress={:.2}",
            millis_to_iso8601(m.timestamp),
            m.coherence,
            m.tier,
            m.frequency,
            m.metrics.rate,
            m.metrics.stress_level
        );
    }
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(&config)?;
    let id = store
        .export_latest(path)
        .context("failed to export latest session")?;
    println!("exported session {id} to {}", path.display());
    Ok(())
}

fn cmd_table() -> Result<()> {
    for e in table() {
        println!(
            "{:>4} Hz  {:<20} stress {:.1}-{:.1}  {}",
            e.frequency, e.name, e.stress_low, e.stress_high, e.purpose
        );
    }
    Ok(())
}

fn print_cues(summary: &RunSummary) {
    for (t, cue) in &summary.cues {
        println!("{}", format_cue(*t, cue));
    }
}

/// Pulse at the last accepted sample, from the run's seed.
fn simulated_pulse(session: &ResonanceSession, seed: u64) -> Option<f64> {
    session.last_timestamp().map(|t| SimulatedPulse::new(seed).at(t))
}

fn report(
    session: &ResonanceSession,
    summary: &RunSummary,
    pulse: Option<f64>,
    json: bool,
) -> Result<()> {
    if json {
        let snapshot =
            export_snapshot(&session.snapshot()).context("failed to serialize snapshot")?;
        println!("{snapshot}");
        return Ok(());
    }

    let m = session.metrics();
    let rec = session.recommendation();
    println!(
        "ticks:      {} (updates {}, rejected {})",
        summary.ticks, summary.updates, summary.rejected
    );
    println!("rate:       {:.1} bpm ({})", m.rate, rate_status(m.rate));
    println!("depth:      {:.2}", m.depth);
    println!("regularity: {:.2}", m.regularity);
    println!(
        "coherence:  {:.2} (tier {})",
        m.coherence,
        coherence_tier(m.coherence)
    );
    println!(
        "stress:     {:.2} ({})",
        m.stress_level,
        stress_label(m.stress_level)
    );
    println!("confidence: {:.2}", session.confidence());
    if let Some(pulse) = pulse {
        println!("pulse:      {pulse:.0} bpm (simulated)");
    }
    println!("phase:      {}", session.phase().as_str());
    println!(
        "tone:       {} Hz {} [{}] {} ms gain {:.2}",
        rec.frequency,
        rec.name,
        frequency_family(rec.frequency),
        rec.duration,
        rec.intensity
    );
    println!("cues:       {}", summary.cues.len());
    println!("moments:    {}", summary.moments.len());
    Ok(())
}
