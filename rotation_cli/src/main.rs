//! rotation_cli - Replay and step through rotation records from the terminal

mod app;
mod commands;
mod error;
mod simulation;

use app::App;
use clap::{Parser, Subcommand};
use error::CliError;
use rotation_core::config::load_toml;
use rotation_core::{JobCatalog, RealTimeDriver, SerializedRecord, Session, SessionConfig};
use simulation::{describe, replay_realtime, ReplaySummary};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Rotation planner - discrete-event simulation of skill rotations
#[derive(Parser, Debug)]
#[command(name = "rotation_cli")]
#[command(about = "Replay and build rotation records")]
struct Args {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Replay a saved record and print what happened
    Replay {
        /// Job definition (TOML)
        job: PathBuf,
        /// Saved record (JSON)
        record: PathBuf,
        /// Print the state at this display time instead of a timeline
        #[arg(long)]
        until: Option<f64>,
        /// Play the record against the wall clock
        #[arg(long)]
        realtime: bool,
        /// Simulated seconds per real second in realtime mode
        #[arg(long, default_value_t = 1.0)]
        time_scale: f64,
    },
    /// Build a record interactively, one command per line
    Live {
        /// Job definition (TOML); the built-in demo job when omitted
        job: Option<PathBuf>,
        /// Session parameters (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Continue from a saved record
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// List every skill of a job and whether it could be used at the pull
    Skills {
        /// Job definition (TOML); the built-in demo job when omitted
        job: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Mode::Replay {
            job,
            record,
            until,
            realtime,
            time_scale,
        } => {
            let (catalog, job) = load_catalog(Some(&job))?;
            let saved = SerializedRecord::load(&record)?;
            replay(catalog, &job, saved, until, realtime, time_scale)
        }
        Mode::Live {
            job,
            config,
            record,
        } => {
            let (catalog, job) = load_catalog(job.as_deref())?;
            let session = match record {
                Some(path) => load_session(catalog, &job, SerializedRecord::load(&path)?)?,
                None => Session::new(catalog, &job, load_config(config.as_deref())?)?,
            };
            live(App::new(session))
        }
        Mode::Skills { job, config } => {
            let (catalog, job) = load_catalog(job.as_deref())?;
            let session = Session::new(catalog, &job, load_config(config.as_deref())?)?;
            for availability in session.engine().skill_availabilities()? {
                println!(
                    "{:<14} {:<8} cast {:>5.2}s  recast {:>6.2}s  {}",
                    availability.skill.name,
                    if availability.instant { "instant" } else { "cast" },
                    availability.cast_time,
                    availability.recast,
                    availability.status
                );
            }
            Ok(())
        }
    }
}

/// Load a job file, or the demo job; the catalog's first job is the one simulated
fn load_catalog(path: Option<&Path>) -> Result<(Arc<JobCatalog>, String), CliError> {
    let catalog = match path {
        Some(path) => JobCatalog::load(&[path])?,
        None => JobCatalog::demo()?,
    };
    let job = catalog.job_ids().next().ok_or(CliError::NoJob)?.to_string();
    Ok((Arc::new(catalog), job))
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig, CliError> {
    let config = match path {
        Some(path) => load_toml::<SessionConfig>(path)?,
        None => SessionConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Replay a saved record; if an action fails, keep going with the actions before it
fn load_session(catalog: Arc<JobCatalog>, job: &str, saved: SerializedRecord) -> Result<Session, CliError> {
    let (session, failure) = Session::load(catalog, job, saved)?;
    if let Some(failure) = failure {
        eprintln!(
            "warning: {}; continuing with the {} actions before it",
            failure,
            session.record().len()
        );
    }
    Ok(session)
}

fn replay(
    catalog: Arc<JobCatalog>,
    job: &str,
    saved: SerializedRecord,
    until: Option<f64>,
    realtime: bool,
    time_scale: f64,
) -> Result<(), CliError> {
    if let Some(cutoff) = until {
        let session = load_session(catalog, job, saved)?;
        let snapshot = session.historical_state(cutoff)?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let mut session = if realtime {
        let mut session =
            Session::with_buff_markers(catalog, job, saved.config.clone(), saved.buff_markers.clone())?;
        let mut driver = RealTimeDriver::new(time_scale);
        replay_realtime(
            &mut session,
            &saved.actions,
            &mut driver,
            Duration::from_millis(16),
            |report| println!("{}", describe(report)),
        )?;
        session
    } else {
        let mut session = load_session(catalog, job, saved)?;
        for report in session.drain_reports() {
            println!("{}", describe(&report));
        }
        session
    };

    let summary = ReplaySummary::from_session(&mut session);
    println!();
    for (skill, entry) in &summary.damage.by_skill {
        println!("{:<20} {:>4} hits {:>10.1}", skill, entry.hits, entry.total);
    }
    println!(
        "total {:.1} potency, {:.2} per second, ends at {:.3}s",
        summary.damage.total_applied,
        summary.dps(),
        summary.end_time
    );
    Ok(())
}

fn live(mut app: App) -> Result<(), CliError> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("{} (type 'help' for commands)", app.session.job());
    while app.running {
        print!("[{:>8.3}] > ", app.session.engine().display_time());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match line.parse() {
            Ok(command) => {
                if let Err(e) = app.handle(command) {
                    println!("error: {}", e);
                }
            }
            Err(e) => println!("{}", e),
        }
        for out in app.take_output() {
            println!("{}", out);
        }
    }
    Ok(())
}
