//! Gateway session management
//!
//! Owns the one persistent gateway connection: handshake, event dispatch,
//! and fixed-delay reconnection.

mod manager;
pub mod protocol;
mod reconnect;

pub use manager::{ConnectionState, FrameOutcome, ShutdownHandle, StatusBridge};
pub use reconnect::ReconnectGuard;
