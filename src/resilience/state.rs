//! Circuit state and the persisted per-dependency record.
//!
//! # Store Layout
//! ```text
//! HASH circuit_breaker:<service>
//!     state            CLOSED | OPEN | HALF_OPEN
//!     failureCount     u32
//!     lastFailureTime  epoch ms, 0 if never failed
//!     halfOpenCalls    u32
//!     lastUpdated      epoch ms
//!     version          u64, bumped on every successful write
//!     failureTimes     comma-separated epoch ms of failures still inside
//!                      the monitoring window, oldest first
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Operating state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through, failures are counted.
    #[default]
    Closed,
    /// Calls are rejected immediately.
    Open,
    /// A bounded number of trial calls test recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }

    /// Numeric encoding for the state gauge.
    pub fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CircuitState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLOSED" => Ok(CircuitState::Closed),
            "OPEN" => Ok(CircuitState::Open),
            "HALF_OPEN" => Ok(CircuitState::HalfOpen),
            other => Err(format!("unknown circuit state '{}'", other)),
        }
    }
}

/// Persisted state of one circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerRecord {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: u64,
    pub half_open_calls: u32,
    pub last_updated: u64,
    pub version: u64,
    /// Failures inside the monitoring window, oldest first; at most
    /// `failure_threshold` entries.
    pub failure_times: Vec<u64>,
}

impl CircuitBreakerRecord {
    /// Flatten into hash fields, in store order.
    pub fn to_fields(&self) -> [(&'static str, String); 7] {
        [
            ("state", self.state.as_str().to_string()),
            ("failureCount", self.failure_count.to_string()),
            ("lastFailureTime", self.last_failure_time.to_string()),
            ("halfOpenCalls", self.half_open_calls.to_string()),
            ("lastUpdated", self.last_updated.to_string()),
            ("version", self.version.to_string()),
            ("failureTimes", join_times(&self.failure_times)),
        ]
    }

    /// Rebuild from hash fields. Missing fields take their defaults, so
    /// records written before `version` existed still load.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, String> {
        fn num<T: FromStr + Default>(fields: &HashMap<String, String>, key: &str) -> Result<T, String> {
            match fields.get(key) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| format!("field '{}' is not a number: '{}'", key, raw)),
                None => Ok(T::default()),
            }
        }

        let state = match fields.get("state") {
            Some(raw) => raw.parse()?,
            None => CircuitState::Closed,
        };

        Ok(Self {
            state,
            failure_count: num(fields, "failureCount")?,
            last_failure_time: num(fields, "lastFailureTime")?,
            half_open_calls: num(fields, "halfOpenCalls")?,
            last_updated: num(fields, "lastUpdated")?,
            version: num(fields, "version")?,
            failure_times: split_times(fields.get("failureTimes").map(String::as_str).unwrap_or_default())?,
        })
    }
}

fn join_times(times: &[u64]) -> String {
    times.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

fn split_times(raw: &str) -> Result<Vec<u64>, String> {
    raw.split(',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse()
                .map_err(|_| format!("field 'failureTimes' has a bad entry: '{}'", t))
        })
        .collect()
}
