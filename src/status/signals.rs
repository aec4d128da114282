//! Auxiliary signal readers
//!
//! The sub-agent roster and the alert override are written by other
//! processes. Both are read fresh on every publish; a missing or malformed
//! file is a normal steady state and yields the default without logging.

use crate::status::types::AlertOverride;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Locations of the externally written signal files
#[derive(Debug, Clone)]
pub struct SignalPaths {
    pub subagents: PathBuf,
    pub alert: PathBuf,
}

/// Snapshot of the auxiliary signals taken for one publish
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxiliarySignals {
    pub sub_agents: Vec<serde_json::Value>,
    pub alert: Option<AlertOverride>,
}

impl AuxiliarySignals {
    /// Read both signal files
    pub fn refresh(paths: &SignalPaths) -> Self {
        Self {
            sub_agents: read_subagents(&paths.subagents),
            alert: read_alert(&paths.alert),
        }
    }

    /// The override, if one is present and active
    pub fn active_alert(&self) -> Option<&AlertOverride> {
        self.alert.as_ref().filter(|a| a.active)
    }
}

/// Read the sub-agent roster; empty on any failure
pub fn read_subagents(path: &Path) -> Vec<serde_json::Value> {
    read_json(path).unwrap_or_default()
}

/// Read the alert override; `None` unless the file holds a JSON object.
///
/// Fields are extracted one by one: a field of the wrong type counts as
/// absent, so `{"active": true, "task": 5}` is still an active override.
pub fn read_alert(path: &Path) -> Option<AlertOverride> {
    let value: serde_json::Value = read_json(path)?;
    let object = value.as_object()?;
    let text = |key: &str| object.get(key).and_then(|v| v.as_str()).map(str::to_string);
    Some(AlertOverride {
        active: object.get("active").and_then(|v| v.as_bool()).unwrap_or(false),
        task: text("task"),
        description: text("description"),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}
