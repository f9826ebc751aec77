use bookline::application::engine::LifecycleEngine;
use bookline::domain::appointment::AppointmentDraft;
use bookline::domain::ports::{AppointmentStoreRef, ClockRef};
use bookline::error::EngineError;
use bookline::infrastructure::clock::ManualClock;
use bookline::infrastructure::gateway::{LoggingGateway, LoggingNotifier};
use bookline::infrastructure::in_memory::InMemoryAppointmentStore;
#[cfg(feature = "storage-rocksdb")]
use bookline::infrastructure::rocksdb::RocksDbAppointmentStore;
use bookline::interfaces::csv::command_reader::{Command, CommandOp, CommandReader};
use bookline::interfaces::csv::report_writer::ReportWriter;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rand::Rng;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input lifecycle commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn open_store(db_path: Option<PathBuf>) -> Result<AppointmentStoreRef> {
    match db_path {
        None => Ok(Arc::new(InMemoryAppointmentStore::new())),
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(
            RocksDbAppointmentStore::open(path).into_diagnostic()?,
        )),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette::miette!(
            "this build has no persistent storage; rebuild with --features storage-rocksdb"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the CSV report.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.db_path)?;

    let clock = Arc::new(ManualClock::new(chrono::Local::now().naive_local()));
    let engine = LifecycleEngine::new(
        store.clone(),
        Arc::new(LoggingGateway::new()),
        Arc::new(LoggingNotifier),
        clock.clone() as ClockRef,
    );

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command_result in reader.commands() {
        match command_result {
            Ok(command) => {
                if let Some(at) = command.at {
                    clock.set(at);
                }
                if let Err(engine_error) = run_command(&engine, &command).await {
                    warn!(
                        appointment = command.id,
                        code = engine_error.code(),
                        error = %engine_error,
                        "command rejected"
                    );
                }
            }
            Err(read_error) => warn!(error = %read_error, "skipping unreadable command"),
        }
    }

    let appointments = store.all().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(appointments).into_diagnostic()?;

    Ok(())
}

async fn run_command(
    engine: &LifecycleEngine,
    command: &Command,
) -> bookline::error::Result<()> {
    match command.op {
        CommandOp::Request => {
            let date = require(command.date, "request needs a date")?;
            let start_time = require(command.start, "request needs a start time")?;
            let end_time = require(command.end, "request needs an end time")?;
            let pin = command.pin.clone().unwrap_or_else(random_pin);
            let draft = AppointmentDraft {
                id: command.id,
                family: require(command.family, "request needs a family")?,
                educator: require(command.educator, "request needs an educator")?,
                date,
                start_time,
                end_time,
                amount: require(command.amount, "request needs an amount")?,
                pin_code: Some(pin),
                // The PIN is usable until the scheduled session end.
                pin_expires_at: Some(date.and_time(end_time)),
            };
            engine.request_appointment(draft).await?;
        }
        CommandOp::Accept => engine.accept_appointment(command.id).await?,
        CommandOp::Cancel => {
            let actor = require(command.actor, "cancel needs an actor")?;
            let outcome = engine.cancel_appointment(command.id, actor).await?;
            info!(
                appointment = command.id,
                late = outcome.late_cancellation,
                amount_charged = outcome.amount_charged,
                "cancelled"
            );
        }
        CommandOp::StartSession => {
            let pin = command
                .pin
                .as_deref()
                .ok_or_else(|| EngineError::Validation("start_session needs a pin".to_string()))?;
            engine.start_session(command.id, pin).await?;
        }
        CommandOp::Complete => {
            let outcome = engine.complete_session(command.id).await?;
            info!(
                appointment = command.id,
                amount_captured = outcome.amount_captured,
                "completed"
            );
        }
        CommandOp::ReportNoShow => {
            let actor = require(command.actor, "report_no_show needs an actor")?;
            let outcome = engine.report_no_show(command.id, actor).await?;
            info!(
                appointment = command.id,
                amount_charged = outcome.amount_charged,
                compensation = outcome.compensation,
                "no-show recorded"
            );
        }
    }
    Ok(())
}

fn require<T>(value: Option<T>, message: &str) -> bookline::error::Result<T> {
    value.ok_or_else(|| EngineError::Validation(message.to_string()))
}

fn random_pin() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}
