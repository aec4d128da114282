//! Status document wire types
//!
//! The status document is what the dashboard polls. All types use camelCase
//! JSON serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of activity log entries kept
pub const DEFAULT_ACTIVITY_LOG_LIMIT: usize = 10;

/// What the monitored agent is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    #[default]
    Idle,
    Thinking,
    Working,
    Coding,
    Reading,
    Alert,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Thinking => write!(f, "thinking"),
            Self::Working => write!(f, "working"),
            Self::Coding => write!(f, "coding"),
            Self::Reading => write!(f, "reading"),
            Self::Alert => write!(f, "alert"),
        }
    }
}

impl std::str::FromStr for AgentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "thinking" => Ok(Self::Thinking),
            "working" => Ok(Self::Working),
            "coding" => Ok(Self::Coding),
            "reading" => Ok(Self::Reading),
            "alert" => Ok(Self::Alert),
            other => Err(format!("unknown agent state: {}", other)),
        }
    }
}

/// A state change derived from the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: AgentState,
    pub task: Option<String>,
    pub description: String,
}

impl Transition {
    pub fn new(state: AgentState, task: Option<String>, description: impl Into<String>) -> Self {
        Self {
            state,
            task,
            description: description.into(),
        }
    }
}

/// One activity log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub time: DateTime<Utc>,
    pub action: String,
}

impl ActivityEntry {
    /// Entry recording a transition into `state`
    pub fn state_change(time: DateTime<Utc>, state: AgentState, task: Option<&str>) -> Self {
        let action = match task {
            Some(task) => format!("State → {} ({})", state, task),
            None => format!("State → {}", state),
        };
        Self { time, action }
    }
}

/// Rolling activity log, newest first
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    limit: usize,
}

impl ActivityLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Prepend an entry, dropping the oldest beyond the limit
    pub fn record(&mut self, entry: ActivityEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the entries, newest first
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_LOG_LIMIT)
    }
}

/// Manual alert override written by an external actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOverride {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The published status artifact
///
/// `sub_agents` is passed through verbatim from the roster file; the bridge
/// does not interpret individual records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub state: AgentState,
    pub state_description: String,
    pub current_task: Option<String>,
    pub state_start_time: DateTime<Utc>,
    pub activity_log: Vec<ActivityEntry>,
    pub sub_agents: Vec<serde_json::Value>,
}
