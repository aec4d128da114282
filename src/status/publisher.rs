//! Status publisher
//!
//! Owns the in-memory state (`current_state`, activity log) and writes the
//! status document to an ordered list of targets. Required targets fail the
//! publish; mirror targets fail silently and independently.

use crate::config::{expand_home, StatusConfig};
use crate::error::{Error, Result};
use crate::status::signals::{AuxiliarySignals, SignalPaths};
use crate::status::types::*;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// A file the status document is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    pub path: PathBuf,
    /// A failed write to a required target fails the publish
    pub required: bool,
}

impl WriteTarget {
    pub fn required(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    pub fn mirror(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }
}

/// Builds and writes the status document
pub struct StatusPublisher {
    targets: Vec<WriteTarget>,
    signals: SignalPaths,
    current_state: AgentState,
    activity_log: ActivityLog,
}

impl StatusPublisher {
    /// Create a publisher writing to `targets` in order
    pub fn new(targets: Vec<WriteTarget>, signals: SignalPaths, log_limit: usize) -> Self {
        Self {
            targets,
            signals,
            current_state: AgentState::default(),
            activity_log: ActivityLog::new(log_limit),
        }
    }

    /// Create a publisher from configuration: the primary path is required,
    /// every mirror is best-effort.
    pub fn from_config(config: &StatusConfig) -> Self {
        let mut targets = vec![WriteTarget::required(expand_home(&config.primary))];
        targets.extend(
            config
                .mirrors
                .iter()
                .map(|p| WriteTarget::mirror(expand_home(p))),
        );
        let signals = SignalPaths {
            subagents: expand_home(&config.subagents_file),
            alert: expand_home(&config.alert_file),
        };
        Self::new(targets, signals, config.activity_log_limit)
    }

    pub fn targets(&self) -> &[WriteTarget] {
        &self.targets
    }

    /// Last state passed to `publish`, before any alert override
    pub fn current_state(&self) -> AgentState {
        self.current_state
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity_log
    }

    /// Convenience wrapper around [`publish`](Self::publish)
    pub fn publish_state(
        &mut self,
        state: AgentState,
        task: Option<&str>,
        description: &str,
    ) -> Result<StatusDocument> {
        self.publish(&Transition::new(state, task.map(str::to_string), description))
    }

    /// Record the transition, merge auxiliary signals and write every target.
    ///
    /// The activity log records the transition as it came from the event
    /// stream; the written document reflects any active alert override.
    pub fn publish(&mut self, transition: &Transition) -> Result<StatusDocument> {
        let now = Utc::now();

        if transition.state != self.current_state {
            self.activity_log.record(ActivityEntry::state_change(
                now,
                transition.state,
                transition.task.as_deref(),
            ));
            self.current_state = transition.state;
        }

        let signals = AuxiliarySignals::refresh(&self.signals);
        let doc = build_document(transition, &self.activity_log, signals, now);

        self.write_targets(&doc)?;
        log_summary(&doc, now);
        Ok(doc)
    }

    fn write_targets(&self, doc: &StatusDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;

        for target in &self.targets {
            match write_atomic(&target.path, json.as_bytes(), target.required) {
                Ok(()) => {}
                Err(e) if target.required => {
                    tracing::error!(
                        path = %target.path.display(),
                        "Failed to write status file: {}",
                        e
                    );
                    return Err(Error::Publish(format!(
                        "{}: {}",
                        target.path.display(),
                        e
                    )));
                }
                Err(e) => {
                    tracing::debug!(
                        path = %target.path.display(),
                        "Skipping status mirror: {}",
                        e
                    );
                }
            }
        }
        Ok(())
    }
}

/// Assemble the status document from a transition and a signals snapshot
pub fn build_document(
    transition: &Transition,
    log: &ActivityLog,
    signals: AuxiliarySignals,
    now: DateTime<Utc>,
) -> StatusDocument {
    let (state, task, description) = match signals.active_alert() {
        Some(alert) => (
            AgentState::Alert,
            alert.task.clone(),
            alert
                .description
                .clone()
                .unwrap_or_else(|| "Manual alert".to_string()),
        ),
        None => (
            transition.state,
            transition.task.clone(),
            transition.description.clone(),
        ),
    };

    StatusDocument {
        state,
        state_description: description,
        current_task: task,
        state_start_time: now,
        activity_log: log.entries(),
        sub_agents: signals.sub_agents,
    }
}

/// Write via a sibling temp file and rename, so readers never see a
/// partially written document.
fn write_atomic(path: &Path, bytes: &[u8], create_parent: bool) -> std::io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;

    if create_parent {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let result = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn log_summary(doc: &StatusDocument, now: DateTime<Utc>) {
    let mut line = format!("[{}] {}", now.format("%H:%M:%S"), doc.state);
    if let Some(task) = &doc.current_task {
        line.push_str(&format!(" - {}", task));
    }
    if !doc.sub_agents.is_empty() {
        line.push_str(&format!(" ({} sub-agents)", doc.sub_agents.len()));
    }
    tracing::info!("{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_publisher(dir: &TempDir) -> StatusPublisher {
        StatusPublisher::new(
            vec![WriteTarget::required(dir.path().join("status.json"))],
            SignalPaths {
                subagents: dir.path().join("subagents.json"),
                alert: dir.path().join("alert.json"),
            },
            DEFAULT_ACTIVITY_LOG_LIMIT,
        )
    }

    fn read_doc(path: &Path) -> StatusDocument {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A directory at the destination makes the rename fail
        let target = dir.path().join("status.json");
        std::fs::create_dir(&target).unwrap();

        assert!(write_atomic(&target, b"{}", true).is_err());
        assert!(!dir.path().join(".status.json.tmp").exists());
    }

    #[test]
    fn test_publish_writes_document() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);

        let doc = publisher
            .publish_state(AgentState::Coding, Some("search"), "Using tools")
            .unwrap();

        let written = read_doc(&dir.path().join("status.json"));
        assert_eq!(written, doc);
        assert_eq!(written.state, AgentState::Coding);
        assert_eq!(written.current_task.as_deref(), Some("search"));
        assert_eq!(written.state_description, "Using tools");
        assert_eq!(written.activity_log.len(), 1);
        assert_eq!(written.activity_log[0].action, "State → coding (search)");
        assert!(written.sub_agents.is_empty());
    }

    #[test]
    fn test_same_state_does_not_log() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);

        publisher.publish_state(AgentState::Idle, None, "Bridge connected").unwrap();
        assert!(publisher.activity_log().is_empty());

        publisher.publish_state(AgentState::Working, Some("a"), "Writing").unwrap();
        publisher.publish_state(AgentState::Working, Some("b"), "Writing").unwrap();
        assert_eq!(publisher.activity_log().len(), 1);

        let doc = read_doc(&dir.path().join("status.json"));
        assert_eq!(doc.current_task.as_deref(), Some("b"));
    }

    #[test]
    fn test_activity_log_stays_bounded() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);
        let cycle = [AgentState::Thinking, AgentState::Working, AgentState::Idle];

        for i in 0..40 {
            let doc = publisher
                .publish_state(cycle[i % cycle.len()], None, "step")
                .unwrap();
            assert!(doc.activity_log.len() <= 10);
        }

        let doc = read_doc(&dir.path().join("status.json"));
        assert_eq!(doc.activity_log.len(), 10);
        assert!(doc
            .activity_log
            .windows(2)
            .all(|pair| pair[0].time >= pair[1].time));
        // i = 39 published Thinking
        assert_eq!(doc.activity_log[0].action, "State → thinking");
    }

    #[test]
    fn test_active_alert_overrides_published_state() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);
        std::fs::write(
            dir.path().join("alert.json"),
            r#"{"active": true, "task": "Server down", "description": "Paged by ops"}"#,
        )
        .unwrap();

        for state in [AgentState::Idle, AgentState::Thinking, AgentState::Reading] {
            let doc = publisher.publish_state(state, Some("x"), "desc").unwrap();
            assert_eq!(doc.state, AgentState::Alert);
            assert_eq!(doc.current_task.as_deref(), Some("Server down"));
            assert_eq!(doc.state_description, "Paged by ops");
        }

        // The log keeps the raw transitions and the override file is untouched
        let doc = read_doc(&dir.path().join("status.json"));
        assert_eq!(doc.activity_log[0].action, "State → reading (x)");
        assert_eq!(publisher.current_state(), AgentState::Reading);
        assert!(dir.path().join("alert.json").exists());
    }

    #[test]
    fn test_alert_override_without_fields() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);
        std::fs::write(dir.path().join("alert.json"), r#"{"active": true}"#).unwrap();

        let doc = publisher.publish_state(AgentState::Working, Some("x"), "desc").unwrap();
        assert_eq!(doc.state, AgentState::Alert);
        assert!(doc.current_task.is_none());
        assert_eq!(doc.state_description, "Manual alert");
    }

    #[test]
    fn test_active_alert_with_mistyped_task_still_overrides() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);
        std::fs::write(dir.path().join("alert.json"), r#"{"active": true, "task": 5}"#).unwrap();

        let doc = publisher.publish_state(AgentState::Working, Some("x"), "d").unwrap();
        assert_eq!(doc.state, AgentState::Alert);
        assert!(doc.current_task.is_none());
        assert_eq!(doc.state_description, "Manual alert");
        assert_eq!(read_doc(&dir.path().join("status.json")).state, AgentState::Alert);
    }

    #[test]
    fn test_corrupt_roster_publishes_empty_subagents() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);
        std::fs::write(dir.path().join("subagents.json"), "not json at all").unwrap();

        let doc = publisher.publish_state(AgentState::Thinking, None, "Thinking").unwrap();
        assert!(doc.sub_agents.is_empty());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("status.json")).unwrap())
                .unwrap();
        assert_eq!(raw["subAgents"], serde_json::json!([]));
    }

    #[test]
    fn test_roster_is_merged() {
        let dir = TempDir::new().unwrap();
        let mut publisher = make_publisher(&dir);
        std::fs::write(
            dir.path().join("subagents.json"),
            r#"[{"id":"a","task":"t","status":"running","startedAt":1}]"#,
        )
        .unwrap();

        let doc = publisher.publish_state(AgentState::Working, None, "w").unwrap();
        assert_eq!(doc.sub_agents.len(), 1);
        assert_eq!(doc.sub_agents[0]["status"], "running");
    }

    #[test]
    fn test_missing_mirror_directory_does_not_block_primary() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("status.json");
        let good_mirror = dir.path().join("mirror.json");
        let mut publisher = StatusPublisher::new(
            vec![
                WriteTarget::mirror(dir.path().join("missing").join("status.json")),
                WriteTarget::required(&primary),
                WriteTarget::mirror(&good_mirror),
            ],
            SignalPaths {
                subagents: dir.path().join("subagents.json"),
                alert: dir.path().join("alert.json"),
            },
            DEFAULT_ACTIVITY_LOG_LIMIT,
        );

        let doc = publisher
            .publish_state(AgentState::Reading, Some("Processing result"), "Reviewing")
            .unwrap();

        assert_eq!(read_doc(&primary), doc);
        assert_eq!(read_doc(&good_mirror), doc);
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_required_target_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let mut publisher = StatusPublisher::new(
            vec![WriteTarget::required(blocker.join("status.json"))],
            SignalPaths {
                subagents: dir.path().join("subagents.json"),
                alert: dir.path().join("alert.json"),
            },
            DEFAULT_ACTIVITY_LOG_LIMIT,
        );

        let err = publisher
            .publish_state(AgentState::Idle, None, "idle")
            .unwrap_err();
        assert!(matches!(err, Error::Publish(_)));
    }

    #[test]
    fn test_required_target_parent_is_created() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("data").join("status.json");
        let mut publisher = StatusPublisher::new(
            vec![WriteTarget::required(&primary)],
            SignalPaths {
                subagents: dir.path().join("subagents.json"),
                alert: dir.path().join("alert.json"),
            },
            DEFAULT_ACTIVITY_LOG_LIMIT,
        );

        publisher.publish_state(AgentState::Idle, None, "idle").unwrap();
        assert!(primary.exists());
        assert!(!dir.path().join("data").join(".status.json.tmp").exists());
    }

    #[test]
    fn test_from_config_orders_targets() {
        let config = StatusConfig {
            primary: PathBuf::from("/tmp/a.json"),
            mirrors: vec![PathBuf::from("/tmp/b.json"), PathBuf::from("/tmp/c.json")],
            ..StatusConfig::default()
        };
        let publisher = StatusPublisher::from_config(&config);
        let targets = publisher.targets();
        assert_eq!(targets.len(), 3);
        assert!(targets[0].required);
        assert!(!targets[1].required);
        assert_eq!(targets[2].path, PathBuf::from("/tmp/c.json"));
    }
}
