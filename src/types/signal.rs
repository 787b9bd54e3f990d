use crate::types::{DataQuality, DataSource};
use chrono::{DateTime, Duration, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a binary-option signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    /// Map a hash parity to a direction: even is CALL, odd is PUT.
    pub fn from_parity(value: u64) -> Self {
        if value % 2 == 0 {
            Direction::Call
        } else {
            Direction::Put
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Call => write!(f, "CALL"),
            Direction::Put => write!(f, "PUT"),
        }
    }
}

/// Directional bias of an indicator reading, including the neutral case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Call,
    Put,
    Neutral,
}

impl Bias {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Bias::Call => Some(Direction::Call),
            Bias::Put => Some(Direction::Put),
            Bias::Neutral => None,
        }
    }
}

/// Local wall-clock minute a signal applies to, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryTime {
    hour: u8,
    minute: u8,
}

impl EntryTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Parse `HH:MM`.
    pub fn parse(s: &str) -> Option<Self> {
        let (h, m) = s.trim().split_once(':')?;
        Self::new(h.parse().ok()?, m.parse().ok()?)
    }

    /// Entry minute for a request made at `local_now`: the start of the next minute.
    pub fn next_minute(local_now: DateTime<FixedOffset>) -> Self {
        let entry = local_now + Duration::minutes(1);
        Self {
            hour: entry.hour() as u8,
            minute: entry.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for EntryTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for EntryTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid entry time: {value}"))
    }
}

impl From<EntryTime> for String {
    fn from(value: EntryTime) -> Self {
        value.to_string()
    }
}

/// Signal produced by one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub direction: Direction,
    pub confidence: u8,
    pub strategy_tag: String,
    pub entry_time: EntryTime,
}

/// Response handed back to the request handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalResponse {
    pub signal_id: String,
    pub direction: Direction,
    pub confidence: u8,
    pub entry_time: EntryTime,
    pub time_zone: String,
    pub asset: String,
    pub broker: Option<String>,
    pub strategy: String,
    pub data_quality: DataQuality,
    pub source: DataSource,
}

/// Row handed to the tracking collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub signal_id: String,
    pub asset: String,
    pub broker: Option<String>,
    pub direction: Direction,
    pub confidence: u8,
    pub entry_time: EntryTime,
}

impl From<&SignalResponse> for SignalRecord {
    fn from(response: &SignalResponse) -> Self {
        Self {
            signal_id: response.signal_id.clone(),
            asset: response.asset.clone(),
            broker: response.broker.clone(),
            direction: response.direction,
            confidence: response.confidence,
            entry_time: response.entry_time,
        }
    }
}
