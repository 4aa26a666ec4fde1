//! Operator command line for tournaments backed by PostgreSQL.
//!
//! Each invocation runs one tournament operation and prints the result as
//! JSON. Authentication is left to whoever holds the database credentials.

mod commands;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Error};
use bracketeer::{
    Database, TournamentManager,
    tournament::{ErrorKind, TournamentError},
};
use log::{error, info};
use pico_args::Arguments;

use crate::config::CliConfig;

const HELP: &str = "\
Manage single-elimination tournaments

USAGE:
  bracketeer [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
  create [--start RFC3339] NAME    Create a tournament in draft
  join TOURNAMENT_ID USER_ID       Enroll a user
  start TOURNAMENT_ID              Mark a tournament started
  finish TOURNAMENT_ID             Mark a tournament finished
  generate TOURNAMENT_ID           (Re)build the opening round
  round TOURNAMENT_ID [ROUND]      List matches of a round [default: 1]
  play MATCH_ID WINNER_ID          Record a match winner
  show TOURNAMENT_ID               Show a tournament with its participants
  bracket TOURNAMENT_ID            Show the bracket with all matches
  list [--status STATUS]           List tournaments (draft|started|finished)
  delete TOURNAMENT_ID             Delete a tournament and its bracket
  my-matches USER_ID               List matches a user plays in
  matches                          List every match

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  DB_QUERY_TIMEOUT         Per-query timeout in seconds [default: 5]
  RUST_LOG                 Log filter [default: warn]
  (See .env file for all configuration options)
";

/// Exit code for a domain error of `kind`
fn exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::Validation => ExitCode::from(2),
        ErrorKind::NotFound => ExitCode::from(3),
        ErrorKind::Infrastructure => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_target(false)
        .init();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return ExitCode::SUCCESS;
    }

    match run(pargs).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<TournamentError>() {
            Some(domain) => {
                eprintln!("{}", domain.client_message());
                if domain.kind() == ErrorKind::Infrastructure {
                    error!("{domain}");
                }
                exit_code(domain.kind())
            }
            None => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(mut pargs: Arguments) -> Result<(), Error> {
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let command = commands::parse_command(pargs, chrono::Utc::now())?;

    let config = CliConfig::from_env(database_url)?;
    info!("Connecting to database: {}", config.redacted_url());

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.health_check().await?;
    let manager = TournamentManager::new(Arc::new(db.repository()));

    let output = commands::execute(&manager, command).await;
    db.close().await;

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}
