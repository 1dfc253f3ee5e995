mod config;
mod error;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use storage::{
    Executor, SqliteConnection, create_insert_events_sql_statement,
    create_insert_events_sql_statement_from_batches, get_event_count, get_events_from_stream,
    get_maximum_event_id,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "evtable.toml";
const READ_BACK_SQL: &str = "SELECT event FROM events ORDER BY id";

#[derive(Parser)]
#[command(name = "evtable")]
#[command(about = "Inspect and feed an append-only events table", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the events table
    Init,
    /// Show the maximum event id and the event count
    Stats,
    /// Print the insert_events statement for a JSON array of events
    Encode {
        /// File holding the events (stdin when omitted)
        file: Option<PathBuf>,
        /// Treat the input as an array of event arrays
        #[arg(short, long)]
        batches: bool,
    },
    /// Read all events back in id order, batch by batch
    Drain {
        /// Events per batch (defaults to drain.batch_size)
        #[arg(short, long)]
        batch: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    init_tracing(&config.log.level);

    let conn = SqliteConnection::open(&config.database.path)?;

    match cli.command {
        Commands::Init => cmd_init(&conn).await,
        Commands::Stats => cmd_stats(&conn).await,
        Commands::Encode { file, batches } => cmd_encode(&conn, file.as_deref(), batches).await,
        Commands::Drain { batch } => {
            cmd_drain(&conn, batch.unwrap_or(config.drain.batch_size)).await
        }
    }
}

/// Install the fmt subscriber; EVTABLE_LOG overrides the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env("EVTABLE_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn cmd_init(conn: &SqliteConnection) -> Result<()> {
    conn.init_schema().await?;
    info!(database = conn.database(), "Events table ready");
    Ok(())
}

async fn cmd_stats(conn: &SqliteConnection) -> Result<()> {
    let max_id = get_maximum_event_id(conn).await?;
    let count = get_event_count(conn).await?;

    println!("database: {}", conn.database());
    println!("max id:   {max_id}");
    println!("events:   {count}");
    Ok(())
}

async fn cmd_encode(conn: &SqliteConnection, file: Option<&Path>, batches: bool) -> Result<()> {
    let input = read_input(file)?;
    let statement = if batches {
        let batches: Vec<Vec<Value>> =
            serde_json::from_str(&input).map_err(|e| Error::Input(e.to_string()))?;
        create_insert_events_sql_statement_from_batches(&batches)?
    } else {
        let events: Vec<Value> =
            serde_json::from_str(&input).map_err(|e| Error::Input(e.to_string()))?;
        create_insert_events_sql_statement(&events)?
    };
    debug!(events = statement.event_count, "Encoded insert statement");

    let max_id = get_maximum_event_id(conn).await?;
    let insert = statement.bind(max_id, chrono::Utc::now())?;

    println!("{}", insert.sql);
    println!("-- $1 = {:?}", insert.ids);
    println!("-- $2 = {}", insert.timestamp.to_rfc3339());
    Ok(())
}

async fn cmd_drain(conn: &SqliteConnection, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::Input("batch size must be at least 1".to_string()));
    }

    let result = conn.execute(READ_BACK_SQL).await?;
    let mut source = result.into_column_source("event");

    let mut batch_no = 0;
    loop {
        let batch = get_events_from_stream(&mut source, batch_size).await?;
        if !batch.events.is_empty() {
            batch_no += 1;
            println!("== batch {batch_no} ({} events)", batch.events.len());
            for event in &batch.events {
                print_event(event);
            }
        }
        if batch.end_of_stream {
            break;
        }
    }

    if batch_no == 0 {
        println!("No events found.");
    }
    Ok(())
}

fn print_event(event: &Value) {
    // stored events are JSON text; anything else is shown as-is
    match event {
        Value::String(text) => println!("{text}"),
        other => println!("{other}"),
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}
