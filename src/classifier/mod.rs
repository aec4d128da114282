//! Event classifier
//!
//! Maps a gateway event (name + loosely typed payload) onto an optional
//! [`Transition`]. The event is first normalized into an [`EventKey`], then a
//! single `match` over the key is the decision table. Every payload field is
//! read defensively: a missing or mistyped field is treated as absent.

mod key;

pub use key::{AgentStream, EventKey, ExecStatus};

use crate::status::{AgentState, Transition};
use serde_json::Value;

/// Maximum characters of assistant text shown as the task
pub const ASSISTANT_TEXT_LIMIT: usize = 40;

/// Maximum characters of an approval command shown as the task
pub const APPROVAL_COMMAND_LIMIT: usize = 30;

const ELLIPSIS: &str = "...";

/// Classify one gateway event.
///
/// Returns `None` when the event does not affect the agent state.
pub fn classify(event: &str, payload: &Value) -> Option<Transition> {
    let normalized = EventKey::from_event(event, payload);

    let transition = match normalized {
        EventKey::Agent {
            stream: AgentStream::Lifecycle,
            phase: Some("start"),
        } => Transition::new(
            AgentState::Thinking,
            Some("Processing request".to_string()),
            "Thinking",
        ),
        EventKey::Agent {
            stream: AgentStream::Lifecycle,
            phase: Some("end"),
        } => Transition::new(AgentState::Idle, None, "Waiting for instructions"),
        EventKey::Agent {
            stream: AgentStream::Assistant,
            ..
        } => Transition::new(
            AgentState::Working,
            truncate(key::assistant_text(payload), ASSISTANT_TEXT_LIMIT),
            "Writing response",
        ),
        EventKey::Agent {
            stream: AgentStream::ToolCall,
            ..
        } => Transition::new(
            AgentState::Coding,
            Some(key::tool_name(payload).unwrap_or("Running tool").to_string()),
            "Using tools",
        ),
        EventKey::Agent {
            stream: AgentStream::ToolResult,
            ..
        } => Transition::new(
            AgentState::Reading,
            Some("Processing result".to_string()),
            "Reviewing tool output",
        ),
        EventKey::ApprovalRequested | EventKey::Exec(ExecStatus::Pending) => {
            let command = key::approval_command(payload);
            let shown = truncate(command.as_deref(), APPROVAL_COMMAND_LIMIT)
                .unwrap_or_else(|| "unknown command".to_string());
            Transition::new(
                AgentState::Alert,
                Some(format!("Approval: {}", shown)),
                "Waiting for command approval",
            )
        }
        EventKey::ApprovalResolved | EventKey::Exec(ExecStatus::Approved) => Transition::new(
            AgentState::Working,
            Some("Approved - executing".to_string()),
            "Executing approved command",
        ),
        EventKey::ExecFinished | EventKey::Exec(ExecStatus::Finished) => {
            Transition::new(AgentState::Idle, None, "Command finished")
        }
        EventKey::Agent { .. } | EventKey::Exec(ExecStatus::Other) | EventKey::Unrelated => {
            return None;
        }
    };

    Some(transition)
}

/// Cut `text` to `limit` characters, appending `...` when cut.
///
/// `None` stays `None`; text at or under the limit is returned unchanged.
pub fn truncate(text: Option<&str>, limit: usize) -> Option<String> {
    let text = text?;
    if text.chars().count() <= limit {
        return Some(text.to_string());
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str(ELLIPSIS);
    Some(cut)
}
