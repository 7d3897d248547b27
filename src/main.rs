//! DaySchedule booking sync
//!
//! Pulls bookings from the DaySchedule API and keeps them in a local JSON file,
//! once or on a schedule.

// dayschedule-sync/src/main.rs
mod api;
mod booking;
mod config;
mod errors;
mod output;
mod sync;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::{
    AppConfig, EnvOverrides, OperationConfig, SyncMode, SyncOptions, load_schedule_config,
};
use errors::AppError;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dayschedule-sync",
    version,
    about = "Sync DaySchedule bookings into a local JSON file. Run without flags for interactive mode."
)]
struct Cli {
    /// Fetch strategy: everything, or only new/changed bookings
    #[arg(long, value_enum)]
    sync_mode: Option<SyncMode>,

    /// Test mode: limit defaults to 5 and the incremental cursor is not advanced
    #[arg(long)]
    test: bool,

    /// Maximum number of bookings to process
    #[arg(long)]
    limit: Option<usize>,

    /// Reprocess bookings that are already in the output file
    #[arg(long)]
    force_process: bool,

    /// Keep running and sync on an interval
    #[arg(long)]
    schedule: bool,

    /// Minutes between scheduled runs
    #[arg(long, requires = "schedule")]
    interval: Option<u64>,

    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Output file (overrides config)
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    /// No behavior flag given; `--config`/`--output` alone still prompt.
    fn is_interactive(&self) -> bool {
        self.sync_mode.is_none()
            && !self.test
            && self.limit.is_none()
            && !self.force_process
            && !self.schedule
            && self.interval.is_none()
    }

    fn run_plan(&self) -> RunPlan {
        RunPlan {
            mode: self.sync_mode.unwrap_or(SyncMode::Full),
            limit: self.limit,
            force: self.force_process,
            test: self.test,
            schedule: self.schedule,
            interval_minutes: self.interval,
        }
    }
}

/// What the user asked for, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunPlan {
    mode: SyncMode,
    limit: Option<usize>,
    force: bool,
    test: bool,
    schedule: bool,
    interval_minutes: Option<u64>,
}

impl RunPlan {
    fn into_operation(self, app_config: &AppConfig) -> Result<OperationConfig, AppError> {
        let sync = SyncOptions::new(self.mode, self.limit, self.force, self.test)?;
        if self.schedule {
            Ok(OperationConfig::Schedule(load_schedule_config(
                app_config,
                sync,
                self.interval_minutes,
            )?))
        } else {
            Ok(OperationConfig::Sync(sync))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = utils::init_tracing("info") {
        eprintln!("⚠️ {}", e);
    }

    match run_app().await {
        Ok(message) => {
            println!("✅ {}", message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<String> {
    let cli = Cli::parse();
    utils::ensure_dotenv();

    let mut app_config = AppConfig::load_from_json(&cli.config, &EnvOverrides::from_env())
        .with_context(|| {
            format!(
                "Failed to load application configuration from {}",
                cli.config.display()
            )
        })?;
    if let Some(output) = &cli.output {
        app_config.override_output_file(output.clone());
    }

    let plan = if cli.is_interactive() {
        let default_interval = app_config.default_interval.as_secs() / 60;
        let stdin = std::io::stdin();
        prompt_run_plan(&mut stdin.lock(), &mut std::io::stdout(), default_interval)?
    } else {
        cli.run_plan()
    };
    app_config.operation = Some(plan.into_operation(&app_config)?);

    match &app_config.operation {
        Some(OperationConfig::Sync(_)) => {
            println!("🚀 Starting DaySchedule sync...");
            let written = sync::run_sync_flow(&app_config)
                .await
                .context("Sync process failed")?;
            Ok(format!(
                "Synced {} bookings to {}",
                written,
                app_config.output_file.display()
            ))
        }
        Some(OperationConfig::Schedule(_)) => {
            println!("🗓️ Starting scheduled DaySchedule sync...");
            let ticks = sync::run_schedule_flow(&app_config)
                .await
                .context("Scheduled sync stopped")?;
            Ok(format!("Schedule stopped after {} runs", ticks))
        }
        None => anyhow::bail!("No operation selected"),
    }
}

/// Asks for the same options the flags provide.
fn prompt_run_plan<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    default_interval_minutes: u64,
) -> Result<RunPlan> {
    writeln!(out, "Select a sync mode:")?;
    writeln!(out, "1. Full sync (or type 'full')")?;
    writeln!(out, "2. Incremental sync (or type 'incremental')")?;
    let mode = match ask(input, out, "Enter your choice [1]: ")?.to_ascii_lowercase().as_str() {
        "" | "1" | "full" => SyncMode::Full,
        "2" | "incremental" => SyncMode::Incremental,
        other => {
            return Err(AppError::Config(format!("Invalid sync mode choice '{}'", other)).into());
        }
    };

    let limit = match ask(input, out, "Limit number of bookings (blank for all): ")?.as_str() {
        "" => None,
        raw => Some(
            raw.parse::<usize>()
                .map_err(|_| AppError::Config(format!("Invalid limit '{}'", raw)))?,
        ),
    };

    let force = ask_yes_no(input, out, "Reprocess bookings already synced? [y/N]: ")?;
    let schedule = ask_yes_no(input, out, "Run on a schedule? [y/N]: ")?;
    let interval_minutes = if schedule {
        let prompt = format!("Minutes between runs [{}]: ", default_interval_minutes);
        match ask(input, out, &prompt)?.as_str() {
            "" => None,
            raw => Some(
                raw.parse::<u64>()
                    .map_err(|_| AppError::Config(format!("Invalid interval '{}'", raw)))?,
            ),
        }
    } else {
        None
    };

    Ok(RunPlan {
        mode,
        limit,
        force,
        test: false,
        schedule,
        interval_minutes,
    })
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<String> {
    write!(out, "{}", prompt)?;
    out.flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read user input")?;
    Ok(line.trim().to_string())
}

fn ask_yes_no<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<bool> {
    Ok(matches!(
        ask(input, out, prompt)?.to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
