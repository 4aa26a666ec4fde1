//! Command parsing and dispatch onto the tournament manager.

use bracketeer::db::TournamentRepository;
use bracketeer::tournament::{
    MatchId, Round, TournamentId, TournamentManager, TournamentStatus, UserId,
};
use chrono::{DateTime, Utc};
use pico_args::Arguments;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during command parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// No subcommand given.
    #[error("Missing command. Run with --help to see available commands")]
    MissingCommand,

    /// Unrecognized subcommand.
    #[error("Unrecognized command '{0}'. Run with --help to see available commands")]
    UnrecognizedCommand(String),

    /// Required positional argument missing or malformed.
    #[error("'{command}' expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },

    /// Unknown status filter.
    #[error("Unknown status '{0}'. Use draft, started or finished")]
    UnknownStatus(String),

    /// Arguments left over after parsing.
    #[error("Unexpected arguments: {0}")]
    Unexpected(String),
}

/// A single facade operation to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        name: String,
        start_date: DateTime<Utc>,
    },
    Join {
        tournament_id: TournamentId,
        user_id: UserId,
    },
    Start(TournamentId),
    Finish(TournamentId),
    Generate(TournamentId),
    Round {
        tournament_id: TournamentId,
        round: Round,
    },
    Play {
        match_id: MatchId,
        winner: UserId,
    },
    Show(TournamentId),
    Bracket(TournamentId),
    List(Option<TournamentStatus>),
    Delete(TournamentId),
    MyMatches(UserId),
    Matches,
}

fn required<T>(
    pargs: &mut Arguments,
    command: &'static str,
    expected: &'static str,
) -> Result<T, ParseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    pargs
        .free_from_str()
        .map_err(|_| ParseError::BadArgument { command, expected })
}

/// Parse the subcommand and its arguments.
///
/// `now` is used as the start date when `create` gets no `--start`.
pub fn parse_command(mut pargs: Arguments, now: DateTime<Utc>) -> Result<Command, ParseError> {
    let name: String = pargs
        .subcommand()
        .map_err(|_| ParseError::MissingCommand)?
        .ok_or(ParseError::MissingCommand)?;

    let command = match name.as_str() {
        "create" => {
            let start_date = pargs
                .opt_value_from_fn("--start", |s| {
                    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc))
                })
                .map_err(|_| ParseError::BadArgument {
                    command: "create",
                    expected: "--start as an RFC 3339 timestamp",
                })?
                .unwrap_or(now);
            let name = required(&mut pargs, "create", "a tournament name")?;
            Command::Create { name, start_date }
        }
        "join" => Command::Join {
            tournament_id: required(&mut pargs, "join", "TOURNAMENT_ID USER_ID")?,
            user_id: required(&mut pargs, "join", "TOURNAMENT_ID USER_ID")?,
        },
        "start" => Command::Start(required(&mut pargs, "start", "TOURNAMENT_ID")?),
        "finish" => Command::Finish(required(&mut pargs, "finish", "TOURNAMENT_ID")?),
        "generate" => Command::Generate(required(&mut pargs, "generate", "TOURNAMENT_ID")?),
        "round" => {
            let tournament_id = required(&mut pargs, "round", "TOURNAMENT_ID [ROUND]")?;
            let round = pargs
                .opt_free_from_str()
                .map_err(|_| ParseError::BadArgument {
                    command: "round",
                    expected: "TOURNAMENT_ID [ROUND]",
                })?
                .unwrap_or(1);
            Command::Round {
                tournament_id,
                round,
            }
        }
        "play" => Command::Play {
            match_id: required(&mut pargs, "play", "MATCH_ID WINNER_ID")?,
            winner: required(&mut pargs, "play", "MATCH_ID WINNER_ID")?,
        },
        "show" => Command::Show(required(&mut pargs, "show", "TOURNAMENT_ID")?),
        "bracket" => Command::Bracket(required(&mut pargs, "bracket", "TOURNAMENT_ID")?),
        "list" => {
            let status: Option<String> =
                pargs
                    .opt_value_from_str("--status")
                    .map_err(|_| ParseError::BadArgument {
                        command: "list",
                        expected: "--status draft|started|finished",
                    })?;
            let status = status
                .map(|s| {
                    s.parse::<TournamentStatus>()
                        .map_err(|_| ParseError::UnknownStatus(s.clone()))
                })
                .transpose()?;
            Command::List(status)
        }
        "delete" => Command::Delete(required(&mut pargs, "delete", "TOURNAMENT_ID")?),
        "my-matches" => Command::MyMatches(required(&mut pargs, "my-matches", "USER_ID")?),
        "matches" => Command::Matches,
        other => return Err(ParseError::UnrecognizedCommand(other.to_string())),
    };

    let rest = pargs.finish();
    if !rest.is_empty() {
        let rest: Vec<String> = rest
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        return Err(ParseError::Unexpected(rest.join(" ")));
    }

    Ok(command)
}

/// Run a command and render its result as JSON
pub async fn execute<R>(
    manager: &TournamentManager<R>,
    command: Command,
) -> anyhow::Result<Value>
where
    R: TournamentRepository + ?Sized,
{
    let value = match command {
        Command::Create { name, start_date } => {
            serde_json::to_value(manager.create_tournament(&name, start_date).await?)?
        }
        Command::Join {
            tournament_id,
            user_id,
        } => serde_json::to_value(manager.add_participant(tournament_id, user_id).await?)?,
        Command::Start(id) => serde_json::to_value(manager.start_tournament(id).await?)?,
        Command::Finish(id) => serde_json::to_value(manager.finish_tournament(id).await?)?,
        Command::Generate(id) => serde_json::to_value(manager.generate_bracket(id).await?)?,
        Command::Round {
            tournament_id,
            round,
        } => serde_json::to_value(manager.get_matches_for_round(tournament_id, round).await?)?,
        Command::Play { match_id, winner } => {
            serde_json::to_value(manager.play_match(match_id, winner).await?)?
        }
        Command::Show(id) => serde_json::to_value(manager.get_tournament(id).await?)?,
        Command::Bracket(id) => serde_json::to_value(manager.get_bracket(id).await?)?,
        Command::List(status) => serde_json::to_value(manager.list_tournaments(status).await?)?,
        Command::Delete(id) => {
            manager.delete_tournament(id).await?;
            serde_json::json!({ "deleted": id })
        }
        Command::MyMatches(user_id) => {
            serde_json::to_value(manager.matches_for_user(user_id).await?)?
        }
        Command::Matches => serde_json::to_value(manager.list_matches().await?)?,
    };

    Ok(value)
}
