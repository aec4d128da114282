//! Status Bridge - mirrors agent gateway activity into dashboard status files
//!
//! The bridge holds one long-lived WebSocket session to the agent gateway,
//! folds the gateway's event stream into a small agent state machine, merges
//! in externally written signals, and publishes a status document that a
//! dashboard polls.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  events   ┌──────────────────────────────────────────┐
//! │   Gateway    │ ────────► │              StatusBridge                │
//! │ (WebSocket)  │ ◄──────── │  connect handshake, reconnect loop       │
//! └──────────────┘  connect  └──────┬───────────────────────────────────┘
//!                                   │ (event, payload)
//!                            ┌──────▼──────┐
//!                            │  classify   │ ─► Option<Transition>
//!                            └──────┬──────┘
//!                            ┌──────▼──────────┐   ┌──────────────────┐
//!                            │ StatusPublisher │ ◄─│ roster / alert   │
//!                            └──────┬──────────┘   └──────────────────┘
//!                                   ▼
//!                     primary status file + mirrors
//! ```
//!
//! ## Modules
//!
//! - [`session`]: gateway connection lifecycle and wire protocol
//! - [`classifier`]: event → state transition mapping
//! - [`status`]: status document, auxiliary signals, publishing
//! - [`credentials`]: gateway token lookup
//! - [`config`]: configuration management

pub mod classifier;
pub mod config;
pub mod credentials;
pub mod error;
pub mod session;
pub mod status;

pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use session::{ShutdownHandle, StatusBridge};
