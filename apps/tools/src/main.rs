use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use review::{queue, EventRepository, ReviewSession, TransitionOutcome};
use serde::Serialize;
use shared::domain::{ActionTarget, Analyst, EventId};
use storage::Storage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod demo;
mod settings;

use settings::{load_settings, normalize_database_url, Settings};

#[derive(Parser, Debug)]
#[command(name = "reviewctl", about = "Review auto-detected seismic events")]
struct Cli {
    /// Settings file; defaults to ./reviewctl.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill an empty database with demo events.
    Seed {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Auto-detected events waiting for review, oldest first.
    Pending,
    List,
    Show {
        event_id: i64,
    },
    /// Lock an event for review.
    Block {
        event_id: i64,
    },
    Confirm {
        event_id: i64,
        #[arg(long)]
        analyst: Option<String>,
    },
    Derive {
        event_id: i64,
        #[arg(long)]
        analyst: Option<String>,
    },
    Reject {
        event_id: i64,
        #[arg(long = "target", value_enum, required = true)]
        targets: Vec<TargetArg>,
        #[arg(long)]
        analyst: Option<String>,
    },
    PrintConfig,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TargetArg {
    Reach,
    Classification,
    Origin,
}

impl From<TargetArg> for ActionTarget {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Reach => ActionTarget::Reach,
            TargetArg::Classification => ActionTarget::Classification,
            TargetArg::Origin => ActionTarget::Origin,
        }
    }
}

#[derive(Clone, Copy)]
enum Disposition {
    Confirm,
    Derive,
    Reject,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }
    init_tracing(&settings);

    match cli.command {
        Command::PrintConfig => {
            print!("{}", toml::to_string(&settings)?);
        }
        Command::Seed { count } => {
            let storage = open_storage(&settings).await?;
            let existing = storage.count_events().await?;
            if existing > 0 {
                warn!(existing, "database already holds events; skipping seed");
                println!("database already holds {existing} events");
                return Ok(());
            }
            for event in demo::events(count, Utc::now()) {
                storage.insert_event(&event).await?;
            }
            info!(count, "demo events stored");
            println!("seeded {count} events");
        }
        Command::Pending => {
            let storage = open_storage(&settings).await?;
            let pending = queue::pending_reviews(storage.load_auto_detected_events().await?);
            let summaries: Vec<_> = pending.iter().map(queue::summarize).collect();
            print_json(&summaries)?;
        }
        Command::List => {
            let storage = open_storage(&settings).await?;
            let events = storage.load_all_events().await?;
            let summaries: Vec<_> = events.iter().map(queue::summarize).collect();
            print_json(&summaries)?;
        }
        Command::Show { event_id } => {
            let storage = open_storage(&settings).await?;
            let event = load_event(&storage, EventId(event_id)).await?;
            #[derive(Serialize)]
            struct Shown {
                event: shared::protocol::EventDetail,
                stations: Vec<shared::protocol::StationSamples>,
            }
            print_json(&Shown {
                event: review::engine::detail(&event),
                stations: review::engine::station_samples(&event),
            })?;
        }
        Command::Block { event_id } => {
            let storage = open_storage(&settings).await?;
            let event = load_event(&storage, EventId(event_id)).await?;
            let mut session = ReviewSession::new();
            let outcome = session.select_event(event, Utc::now())?;
            persist(&storage, &outcome).await?;
            print_outcome(&session, &outcome)?;
        }
        Command::Confirm { event_id, analyst } => {
            let analyst = resolve_analyst(analyst, &settings)?;
            decide(&settings, EventId(event_id), &analyst, Disposition::Confirm, &[]).await?;
        }
        Command::Derive { event_id, analyst } => {
            let analyst = resolve_analyst(analyst, &settings)?;
            decide(&settings, EventId(event_id), &analyst, Disposition::Derive, &[]).await?;
        }
        Command::Reject {
            event_id,
            targets,
            analyst,
        } => {
            let analyst = resolve_analyst(analyst, &settings)?;
            decide(
                &settings,
                EventId(event_id),
                &analyst,
                Disposition::Reject,
                &targets,
            )
            .await?;
        }
    }

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_storage(settings: &Settings) -> Result<Storage> {
    let database_url = normalize_database_url(&settings.database_url);
    Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open database '{database_url}'"))
}

fn resolve_analyst(flag: Option<String>, settings: &Settings) -> Result<Analyst> {
    flag.or_else(|| settings.analyst.clone())
        .and_then(Analyst::new)
        .context("no analyst given; pass --analyst or set APP__ANALYST")
}

async fn load_event(storage: &Storage, event_id: EventId) -> Result<review::SeismicEvent> {
    match storage.load_event(event_id).await? {
        Some(event) => Ok(event),
        None => bail!("event {event_id} not found"),
    }
}

/// Locks the event when needed, then applies the analyst's decision. Each
/// appended record is stored before the next step runs.
async fn decide(
    settings: &Settings,
    event_id: EventId,
    analyst: &Analyst,
    disposition: Disposition,
    targets: &[TargetArg],
) -> Result<()> {
    let storage = open_storage(settings).await?;
    let event = load_event(&storage, event_id).await?;

    let mut session = ReviewSession::new();
    let locked = session.select_event(event, Utc::now())?;
    persist(&storage, &locked).await?;

    for target in targets {
        session.choose_target((*target).into())?;
    }

    let now = Utc::now();
    let outcome = match disposition {
        Disposition::Confirm => session.confirm(now, analyst),
        Disposition::Derive => session.derive(now, analyst),
        Disposition::Reject => session.reject(now, analyst),
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            if locked.appended.is_some() {
                warn!(%event_id, "decision failed; the event stays blocked in review");
            }
            return Err(err.into());
        }
    };
    persist(&storage, &outcome).await?;
    print_outcome(&session, &outcome)
}

async fn persist(storage: &Storage, outcome: &TransitionOutcome) -> Result<()> {
    if let Some(record) = &outcome.appended {
        storage
            .append_state_change(outcome.event_id, record)
            .await?;
    }
    Ok(())
}

fn print_outcome(session: &ReviewSession, outcome: &TransitionOutcome) -> Result<()> {
    let event = session
        .selected()
        .context("review session lost its selected event")?;
    print_json(&outcome.view(event))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
