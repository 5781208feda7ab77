use crate::model::common::FetchTarget;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
pub struct ApiSearchResponse {
    #[serde(default, deserialize_with = "deserialize_hit_count")]
    pub total_hits: u64,
    #[serde(default)]
    pub hits: Option<String>,
}

fn deserialize_hit_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => Ok(n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0)),
        Value::String(s) => Ok(s.trim().parse::<u64>().unwrap_or(0)),
        Value::Null => Ok(0),
        other => Err(de::Error::custom(format!(
            "unexpected total_hits value: {}",
            other
        ))),
    }
}

/// The multi-section endpoint answers either with rendered HTML or a bare
/// list of course paths.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ApiSectionGroupResponse {
    Html { html: String },
    Paths(Vec<Value>),
    Other(Value),
}

/// One search page reduced to what discovery needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub total_hits: u64,
    pub targets: Vec<FetchTarget>,
    pub groups: Vec<FetchTarget>,
    pub course_count: usize,
}

/// Why a successfully transferred body could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Empty or malformed body; worth asking again.
    Incomplete(String),
    /// Well-formed but not a usable record; asking again will not help.
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeKind {
    Success,
    NotFound,
    RateLimited,
    Timeout,
    TransportError,
    UnexpectedStatus,
    MalformedBody,
    ParseFailed,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::NotFound => "not_found",
            OutcomeKind::RateLimited => "rate_limited",
            OutcomeKind::Timeout => "timeout",
            OutcomeKind::TransportError => "transport_error",
            OutcomeKind::UnexpectedStatus => "unexpected_status",
            OutcomeKind::MalformedBody => "malformed_body",
            OutcomeKind::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Success(T),
    NotFound,
    RateLimited,
    Timeout,
    TransportError(String),
    UnexpectedStatus(u16),
    MalformedBody(String),
    ParseFailed(String),
}

impl<T> FetchOutcome<T> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            FetchOutcome::Success(_) => OutcomeKind::Success,
            FetchOutcome::NotFound => OutcomeKind::NotFound,
            FetchOutcome::RateLimited => OutcomeKind::RateLimited,
            FetchOutcome::Timeout => OutcomeKind::Timeout,
            FetchOutcome::TransportError(_) => OutcomeKind::TransportError,
            FetchOutcome::UnexpectedStatus(_) => OutcomeKind::UnexpectedStatus,
            FetchOutcome::MalformedBody(_) => OutcomeKind::MalformedBody,
            FetchOutcome::ParseFailed(_) => OutcomeKind::ParseFailed,
        }
    }

    /// Transient outcomes are retried; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchOutcome::RateLimited
            | FetchOutcome::Timeout
            | FetchOutcome::TransportError(_)
            | FetchOutcome::MalformedBody(_) => true,
            FetchOutcome::UnexpectedStatus(code) => (500..600).contains(code),
            FetchOutcome::Success(_) | FetchOutcome::NotFound | FetchOutcome::ParseFailed(_) => {
                false
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            FetchOutcome::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            FetchOutcome::Success(_) => "success".to_string(),
            FetchOutcome::NotFound => "not found (404)".to_string(),
            FetchOutcome::RateLimited => "rate limited (429)".to_string(),
            FetchOutcome::Timeout => "timeout".to_string(),
            FetchOutcome::TransportError(msg) => format!("transport error: {}", msg),
            FetchOutcome::UnexpectedStatus(code) => format!("status {}", code),
            FetchOutcome::MalformedBody(msg) => format!("malformed body: {}", msg),
            FetchOutcome::ParseFailed(msg) => format!("parse failed: {}", msg),
        }
    }

    pub fn and_then_decode<U, F>(self, decode: F) -> FetchOutcome<U>
    where
        F: FnOnce(T) -> Result<U, DecodeError>,
    {
        match self {
            FetchOutcome::Success(v) => match decode(v) {
                Ok(u) => FetchOutcome::Success(u),
                Err(DecodeError::Incomplete(msg)) => FetchOutcome::MalformedBody(msg),
                Err(DecodeError::Rejected(msg)) => FetchOutcome::ParseFailed(msg),
            },
            FetchOutcome::NotFound => FetchOutcome::NotFound,
            FetchOutcome::RateLimited => FetchOutcome::RateLimited,
            FetchOutcome::Timeout => FetchOutcome::Timeout,
            FetchOutcome::TransportError(m) => FetchOutcome::TransportError(m),
            FetchOutcome::UnexpectedStatus(c) => FetchOutcome::UnexpectedStatus(c),
            FetchOutcome::MalformedBody(m) => FetchOutcome::MalformedBody(m),
            FetchOutcome::ParseFailed(m) => FetchOutcome::ParseFailed(m),
        }
    }
}

/// Final outcome for one target, with the target carried alongside.
#[derive(Debug, Clone)]
pub struct FetchReport<T> {
    pub target: FetchTarget,
    pub outcome: FetchOutcome<T>,
    pub attempts: u32,
    pub delays: Vec<Duration>,
}

impl<T> FetchReport<T> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// Retry budget spent and still transient.
    pub fn exhausted(&self) -> bool {
        self.outcome.is_transient()
    }
}
