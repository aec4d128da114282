//! Event normalization
//!
//! Gateway event names and payload shapes vary between gateway versions;
//! this module folds the known spellings into a small [`EventKey`].

use serde_json::Value;

const APPROVAL_REQUESTED: &[&str] = &[
    "exec.approval.requested",
    "exec.approval.request",
    "exec.approval_requested",
    "exec.approval",
    "approval.requested",
    "approval.request",
];

const APPROVAL_RESOLVED: &[&str] = &[
    "exec.approval.resolved",
    "exec.approval.approved",
    "exec.approval.denied",
    "exec.approval_resolved",
    "approval.resolved",
    "approval.approved",
    "approval.denied",
];

const EXEC_FINISHED: &[&str] = &[
    "exec.finished",
    "exec.completed",
    "exec.complete",
    "exec.done",
    "exec.exited",
];

const EXEC_PENDING_STATUS: &[&str] = &[
    "pending",
    "requested",
    "awaiting_approval",
    "awaiting-approval",
    "approval_required",
    "needs_approval",
];

const EXEC_APPROVED_STATUS: &[&str] = &["approved", "denied", "running", "started"];

const EXEC_FINISHED_STATUS: &[&str] = &["finished", "completed", "done", "exited"];

/// Command locations in approval payloads, first present wins
const COMMAND_POINTERS: &[&str] = &[
    "/command",
    "/cmd",
    "/commandLine",
    "/request/command",
    "/request/cmd",
];

/// Stream carried by an `agent` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStream {
    Lifecycle,
    Assistant,
    ToolCall,
    ToolResult,
    Other,
}

/// Status reported by a generic `exec` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Pending,
    Approved,
    Finished,
    Other,
}

/// Normalized gateway event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKey<'a> {
    Agent {
        stream: AgentStream,
        phase: Option<&'a str>,
    },
    ApprovalRequested,
    ApprovalResolved,
    ExecFinished,
    Exec(ExecStatus),
    Unrelated,
}

impl<'a> EventKey<'a> {
    pub fn from_event(event: &str, payload: &'a Value) -> Self {
        match event {
            "agent" => {
                let phase = agent_phase(payload);
                let stream = match str_at(payload, "/stream") {
                    Some("lifecycle") => AgentStream::Lifecycle,
                    Some("assistant") => AgentStream::Assistant,
                    Some("tool") if phase == Some("result") => AgentStream::ToolResult,
                    Some("tool") | Some("tool_call") | Some("tool_use") => AgentStream::ToolCall,
                    Some("tool_result") => AgentStream::ToolResult,
                    _ => AgentStream::Other,
                };
                Self::Agent { stream, phase }
            }
            "exec" => Self::Exec(exec_status(payload)),
            name if APPROVAL_REQUESTED.contains(&name) => Self::ApprovalRequested,
            name if APPROVAL_RESOLVED.contains(&name) => Self::ApprovalResolved,
            name if EXEC_FINISHED.contains(&name) => Self::ExecFinished,
            _ => Self::Unrelated,
        }
    }
}

fn str_at<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload.pointer(pointer).and_then(Value::as_str)
}

/// Phase lives under `data.phase`; older gateways put it at the top level
fn agent_phase(payload: &Value) -> Option<&str> {
    str_at(payload, "/data/phase").or_else(|| str_at(payload, "/phase"))
}

fn exec_status(payload: &Value) -> ExecStatus {
    let status = match str_at(payload, "/status") {
        Some(status) => status.to_ascii_lowercase(),
        None => return ExecStatus::Other,
    };
    if EXEC_PENDING_STATUS.contains(&status.as_str()) {
        ExecStatus::Pending
    } else if EXEC_APPROVED_STATUS.contains(&status.as_str()) {
        ExecStatus::Approved
    } else if EXEC_FINISHED_STATUS.contains(&status.as_str()) {
        ExecStatus::Finished
    } else {
        ExecStatus::Other
    }
}

/// Assistant text: the accumulated `text`, else the latest `delta`
pub(super) fn assistant_text(payload: &Value) -> Option<&str> {
    str_at(payload, "/data/text").or_else(|| str_at(payload, "/data/delta"))
}

pub(super) fn tool_name(payload: &Value) -> Option<&str> {
    str_at(payload, "/data/name")
        .or_else(|| str_at(payload, "/data/tool"))
        .filter(|name| !name.is_empty())
}

/// The command awaiting approval; argv arrays are joined with spaces
pub(super) fn approval_command(payload: &Value) -> Option<String> {
    COMMAND_POINTERS.iter().find_map(|pointer| {
        match payload.pointer(pointer)? {
            Value::String(cmd) => Some(cmd.clone()),
            Value::Array(argv) => {
                let parts: Vec<&str> = argv.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            _ => None,
        }
    })
}
