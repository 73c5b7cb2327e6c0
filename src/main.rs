//! # WorkPulse CLI
//!
//! Command-line front end to the WorkPulse engine: manage sessions, report
//! activity, inspect alerts and summaries, and run the periodic jobs either
//! once or on a schedule.
//!
//! ```bash
//! workpulse session start --user alice --org acme
//! workpulse activity log <SESSION> --user alice --org acme --type active --duration 30
//! workpulse scheduler
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use workpulse::config::{self, Config};
use workpulse::models::{ActivityType, ActivityUpdate, BulkActivityUpload};
use workpulse::{
    migrations, Engine, EventNotifier, LogTransport, Result, Scheduler, UserContext,
    WorkPulseError,
};

/// WorkPulse - work session tracking and alerting
#[derive(Parser)]
#[command(name = "workpulse")]
#[command(version)]
#[command(about = "Work session tracking, activity aggregation and alerting", long_about = None)]
struct Cli {
    /// Database file (overrides the configured path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example config file
    GenerateConfig,

    /// Apply pending schema migrations and print the schema version
    Migrate,

    /// Work session lifecycle
    #[command(subcommand)]
    Session(SessionCommand),

    /// Report activity for a session
    #[command(subcommand)]
    Activity(ActivityCommand),

    /// Inspect and resolve alerts
    #[command(subcommand)]
    Alert(AlertCommand),

    /// Run background jobs once
    #[command(subcommand)]
    Job(JobCommand),

    /// Daily summaries
    #[command(subcommand)]
    Report(ReportCommand),

    /// Run all periodic jobs until interrupted
    Scheduler,
}

/// Identity of the (already authenticated) caller
#[derive(Args)]
struct Identity {
    #[arg(long)]
    user: String,

    #[arg(long)]
    org: String,
}

impl Identity {
    fn context(&self) -> UserContext {
        UserContext::new(&self.user, &self.org)
    }
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start a new session
    Start {
        #[command(flatten)]
        identity: Identity,
        #[arg(long)]
        project: Option<String>,
        /// RFC 3339 start time (defaults to now)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
    },
    /// Stop a session
    Stop {
        session_id: String,
        #[command(flatten)]
        identity: Identity,
        /// RFC 3339 end time (defaults to now)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
    /// Show the caller's active session
    Active {
        #[command(flatten)]
        identity: Identity,
    },
    /// Show one session
    Show {
        session_id: String,
        #[command(flatten)]
        identity: Identity,
    },
    /// Delete a session and its activity logs
    Delete {
        session_id: String,
        #[command(flatten)]
        identity: Identity,
    },
}

#[derive(Subcommand)]
enum ActivityCommand {
    /// Log a single activity interval
    Log {
        session_id: String,
        #[command(flatten)]
        identity: Identity,
        /// active or idle
        #[arg(long = "type", value_parser = parse_activity_type)]
        activity_type: ActivityType,
        #[arg(long)]
        duration: i64,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,
    },
    /// Upload a batch: {"activities": [...]} read from FILE or stdin
    Bulk {
        session_id: String,
        #[command(flatten)]
        identity: Identity,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List a session's activity logs
    List {
        session_id: String,
        #[command(flatten)]
        identity: Identity,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
}

#[derive(Subcommand)]
enum AlertCommand {
    /// List unresolved alerts
    List {
        #[command(flatten)]
        identity: Identity,
    },
    /// Resolve an alert
    Resolve {
        alert_id: String,
        #[command(flatten)]
        identity: Identity,
    },
}

#[derive(Subcommand)]
enum JobCommand {
    /// Run one job: idle-detection, overtime-checker or daily-summary
    Run {
        name: String,
        /// Target date for daily-summary (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum ReportCommand {
    /// The caller's summary for one day
    Daily {
        #[command(flatten)]
        identity: Identity,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Up to 30 most recent summaries of a user
    User {
        user_id: String,
        #[command(flatten)]
        identity: Identity,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Summaries of everyone in the caller's organization
    Org {
        #[command(flatten)]
        identity: Identity,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn parse_activity_type(value: &str) -> std::result::Result<ActivityType, String> {
    ActivityType::from_db(&value.to_lowercase())
        .ok_or_else(|| format!("'{}' is not an activity type (active, idle)", value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging with INFO level by default (can be overridden with RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config::get_config();

    if let Commands::GenerateConfig = cli.command {
        return generate_config();
    }

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.database.resolved_path());
    let engine = Engine::open_at(
        &db_path,
        config,
        EventNotifier::new(Arc::new(LogTransport)),
    )?;

    match cli.command {
        Commands::GenerateConfig => Ok(()),
        Commands::Migrate => {
            let conn = engine.db.connection()?;
            let version = migrations::current_version(&conn)?;
            println!(
                "Database {} is at schema version {} (latest {})",
                engine.db.path().display(),
                version,
                migrations::latest_version()
            );
            Ok(())
        }
        Commands::Session(command) => run_session(&engine, command),
        Commands::Activity(command) => run_activity(&engine, command),
        Commands::Alert(command) => run_alert(&engine, command),
        Commands::Job(JobCommand::Run { name, date }) => {
            let job = workpulse::JobKind::parse(&name, date)?;
            print_json(&engine.job_runner().run(job)?)
        }
        Commands::Report(command) => run_report(&engine, command),
        Commands::Scheduler => run_scheduler(&engine, config),
    }
}

fn generate_config() -> Result<()> {
    let config_path = Config::default_config_path()?;
    println!("Generating example config file at: {:?}", config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&config_path, Config::example_toml())?;
    println!("Config file generated successfully!");
    println!("Edit {} to customize settings", config_path.display());
    Ok(())
}

fn run_session(engine: &Engine, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Start {
            identity,
            project,
            start,
        } => print_json(
            &engine
                .sessions
                .start_session(&identity.context(), project, start)?,
        ),
        SessionCommand::Stop {
            session_id,
            identity,
            end,
        } => print_json(
            &engine
                .sessions
                .stop_session(&session_id, &identity.context(), end)?,
        ),
        SessionCommand::Active { identity } => {
            print_json(&engine.sessions.get_active_session(&identity.context())?)
        }
        SessionCommand::Show {
            session_id,
            identity,
        } => print_json(&engine.sessions.get_session(&session_id, &identity.context())?),
        SessionCommand::Delete {
            session_id,
            identity,
        } => {
            engine
                .sessions
                .delete_session(&session_id, &identity.context())?;
            println!("Deleted session {}", session_id);
            Ok(())
        }
    }
}

fn run_activity(engine: &Engine, command: ActivityCommand) -> Result<()> {
    match command {
        ActivityCommand::Log {
            session_id,
            identity,
            activity_type,
            duration,
            url,
            timestamp,
        } => {
            let update = ActivityUpdate {
                activity_type,
                duration_seconds: duration,
                url,
                timestamp,
            };
            print_json(
                &engine
                    .activity
                    .log_activity(&session_id, &identity.context(), update)?,
            )
        }
        ActivityCommand::Bulk {
            session_id,
            identity,
            file,
        } => {
            let body = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let upload: BulkActivityUpload = serde_json::from_str(&body).map_err(|e| {
                WorkPulseError::validation(format!("Invalid bulk upload body: {}", e))
            })?;
            print_json(&engine.activity.bulk_upload_activities(
                &session_id,
                &identity.context(),
                upload,
            )?)
        }
        ActivityCommand::List {
            session_id,
            identity,
            from,
            to,
        } => print_json(&engine.activity.list_activities(
            &session_id,
            &identity.context(),
            from,
            to,
        )?),
    }
}

fn run_alert(engine: &Engine, command: AlertCommand) -> Result<()> {
    match command {
        AlertCommand::List { identity } => {
            print_json(&engine.alerts.list_open_alerts(&identity.context())?)
        }
        AlertCommand::Resolve { alert_id, identity } => {
            print_json(&engine.alerts.resolve_alert(&alert_id, &identity.context())?)
        }
    }
}

fn run_report(engine: &Engine, command: ReportCommand) -> Result<()> {
    match command {
        ReportCommand::Daily { identity, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            print_json(&engine.summary.get_daily_summary(&identity.context(), date)?)
        }
        ReportCommand::User {
            user_id,
            identity,
            from,
            to,
        } => print_json(&engine.summary.get_user_report(
            &identity.context(),
            &user_id,
            from,
            to,
        )?),
        ReportCommand::Org { identity, from, to } => print_json(
            &engine
                .summary
                .get_organization_report(&identity.context(), from, to)?,
        ),
    }
}

fn run_scheduler(engine: &Engine, config: &Config) -> Result<()> {
    let scheduler = Scheduler::new(engine.job_runner(), config.scheduler.clone());

    let stop = scheduler.stop_handle();
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|e| WorkPulseError::system(format!("Failed to install signal handler: {}", e)))?;

    info!("Scheduler running, press Ctrl+C to stop");
    for handle in scheduler.start() {
        if handle.join().is_err() {
            log::error!("A scheduler loop panicked");
        }
    }
    Ok(())
}
