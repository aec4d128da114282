//! Status module: published status document and its inputs
//!
//! ```text
//! Transition ──► StatusPublisher ──► primary status file (required)
//!                  ▲        │    └─► mirror status files (best-effort)
//!                  │        ▼
//!      AuxiliarySignals   ActivityLog (in memory, newest first)
//!      ├ sub-agent roster
//!      └ alert override
//! ```

pub mod publisher;
pub mod signals;
pub mod types;

pub use publisher::{build_document, StatusPublisher, WriteTarget};
pub use signals::{AuxiliarySignals, SignalPaths};
pub use types::{
    ActivityEntry, ActivityLog, AgentState, AlertOverride, StatusDocument, Transition,
    DEFAULT_ACTIVITY_LOG_LIMIT,
};
