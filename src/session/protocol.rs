//! Gateway wire protocol
//!
//! Every frame is a JSON object discriminated by `type`: the bridge sends a
//! single `req` (the connect handshake) and receives `res` and `event`
//! frames.

use crate::config::GatewayConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Method name of the handshake request
pub const CONNECT_METHOD: &str = "connect";

/// Outbound request envelope
#[derive(Debug, Clone, Serialize)]
pub struct RequestFrame<P: Serialize> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub method: String,
    pub params: P,
}

impl<P: Serialize> RequestFrame<P> {
    pub fn new(method: impl Into<String>, params: P) -> Self {
        Self {
            kind: "req",
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Parameters of the connect handshake
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: u32,
    pub max_protocol: u32,
    pub client: ClientInfo,
    pub role: String,
    pub scopes: Vec<String>,
    pub caps: Vec<String>,
    pub commands: Vec<String>,
    pub permissions: serde_json::Map<String, Value>,
    pub auth: AuthParams,
    pub locale: String,
    pub user_agent: String,
}

/// Client identity announced in the handshake
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub mode: String,
}

#[derive(Clone, Serialize)]
pub struct AuthParams {
    pub token: String,
}

impl std::fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthParams")
            .field("token", &crate::credentials::mask_token(&self.token))
            .finish()
    }
}

/// Build the connect request for the given gateway settings and token.
///
/// The bridge is a read-only observer: it declares no capabilities,
/// commands or permissions.
pub fn connect_request(config: &GatewayConfig, token: &str) -> RequestFrame<ConnectParams> {
    RequestFrame::new(
        CONNECT_METHOD,
        ConnectParams {
            min_protocol: config.min_protocol,
            max_protocol: config.max_protocol,
            client: ClientInfo {
                id: config.client_id.clone(),
                version: config.client_version.clone(),
                platform: config.platform.clone(),
                mode: config.client_mode.clone(),
            },
            role: config.role.clone(),
            scopes: config.scopes.clone(),
            caps: Vec::new(),
            commands: Vec::new(),
            permissions: serde_json::Map::new(),
            auth: AuthParams {
                token: token.to_string(),
            },
            locale: config.locale.clone(),
            user_agent: config.user_agent.clone(),
        },
    )
}

/// Inbound frame
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame {
    /// Response to a request
    Res(ResponseFrame),
    /// Server-pushed event
    Event(EventFrame),
    /// Any other frame type
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseFrame {
    pub id: String,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ResponseFrame {
    /// Human-readable error, whether the gateway sent a string or an
    /// `{code, message}` object
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(message)) => message.clone(),
            Some(err) => {
                let message = err.get("message").and_then(Value::as_str);
                let code = err.get("code").and_then(Value::as_str);
                match (code, message) {
                    (Some(code), Some(message)) => format!("{}: {}", code, message),
                    (None, Some(message)) => message.to_string(),
                    _ => err.to_string(),
                }
            }
            None => "no error detail".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub seq: Option<u64>,
}

/// Parse one inbound text frame
pub fn parse_frame(text: &str) -> serde_json::Result<InboundFrame> {
    serde_json::from_str(text)
}
