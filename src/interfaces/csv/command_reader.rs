use crate::domain::appointment::Party;
use crate::error::{EngineError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// A lifecycle operation to replay.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommandOp {
    Request,
    Accept,
    Cancel,
    StartSession,
    Complete,
    ReportNoShow,
}

/// One row of the replay CSV.
///
/// `at` moves the replay clock before the command runs; later columns are
/// only meaningful for some operations and stay empty otherwise.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub op: CommandOp,
    pub id: u32,
    pub actor: Option<Party>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub at: Option<NaiveDateTime>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_time")]
    pub start: Option<NaiveTime>,
    #[serde(default, deserialize_with = "de_opt_time")]
    pub end: Option<NaiveTime>,
    pub family: Option<u32>,
    pub educator: Option<u32>,
    pub amount: Option<i64>,
    pub pin: Option<String>,
}

fn de_opt_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn de_opt_time<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Reads replay commands from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// and yields an iterator of `Result<Command>` for streaming replays.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}
