//! Relay collaborator boundary.
//!
//! The controller only needs three things from the relay: open a session bound
//! to the active browser tab, report that tab's id, and close the session. The
//! WebSocket connector speaks a one-message handshake:
//!
//! ```text
//! -> {"type":"attach","target":"activeTab"}
//! <- {"type":"attached","tabId":123}      (string ids are accepted too)
//! <- {"type":"error","message":"..."}     (handshake refused)
//! ```
//!
//! Traffic after the handshake belongs to the bridge and is not interpreted here.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use portal_core::TabId;
use portal_logging::{portal_debug, portal_info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::RelayError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[async_trait::async_trait]
pub trait RelayConnector: Send + Sync {
    async fn open(&self, relay_url: &str) -> Result<Box<dyn RelaySession>, RelayError>;
}

/// A live relay session bound to one browser tab.
#[async_trait::async_trait]
pub trait RelaySession: Send {
    fn tab_id(&self) -> TabId;

    async fn close(self: Box<Self>) -> Result<(), RelayError>;
}

/// Reports whether the browser bridge extension is available.
#[async_trait::async_trait]
pub trait ExtensionProbe: Send + Sync {
    async fn is_installed(&self) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct WsRelayConnector;

impl WsRelayConnector {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct AttachRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum AttachReply {
    Attached {
        #[serde(rename = "tabId")]
        tab_id: Value,
    },
    Error {
        message: String,
    },
}

#[async_trait::async_trait]
impl RelayConnector for WsRelayConnector {
    async fn open(&self, relay_url: &str) -> Result<Box<dyn RelaySession>, RelayError> {
        Url::parse(relay_url).map_err(|err| RelayError::InvalidUrl(err.to_string()))?;

        let (mut ws, _response) = connect_async(relay_url)
            .await
            .map_err(|err| RelayError::Unreachable(err.to_string()))?;
        portal_debug!("relay socket open url={}", relay_url);

        let request = serde_json::to_string(&AttachRequest {
            kind: "attach",
            target: "activeTab",
        })
        .map_err(|err| RelayError::Protocol(err.to_string()))?;
        ws.send(Message::text(request))
            .await
            .map_err(|err| RelayError::Unreachable(err.to_string()))?;

        let tab_id = read_attach_reply(&mut ws).await?;
        portal_info!("relay attached tab_id={}", tab_id);
        Ok(Box::new(WsRelaySession { ws, tab_id }))
    }
}

async fn read_attach_reply(ws: &mut WsStream) -> Result<TabId, RelayError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return parse_attach_reply(text.as_str()),
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|frame| frame.reason.as_str().to_string())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "relay closed before attaching a tab".to_string());
                return Err(RelayError::Rejected(reason));
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => return Err(RelayError::Protocol(err.to_string())),
            None => {
                return Err(RelayError::Rejected(
                    "relay closed before attaching a tab".to_string(),
                ))
            }
        }
    }
}

fn parse_attach_reply(text: &str) -> Result<TabId, RelayError> {
    match serde_json::from_str::<AttachReply>(text) {
        Ok(AttachReply::Attached {
            tab_id: Value::String(id),
        }) if !id.is_empty() => Ok(TabId::new(id)),
        Ok(AttachReply::Attached {
            tab_id: Value::Number(id),
        }) => Ok(TabId::new(id.to_string())),
        Ok(AttachReply::Attached { .. }) => Err(RelayError::Protocol(
            "relay attached without a tab id".to_string(),
        )),
        Ok(AttachReply::Error { message }) => Err(RelayError::Rejected(message)),
        Err(err) => Err(RelayError::Protocol(err.to_string())),
    }
}

struct WsRelaySession {
    ws: WsStream,
    tab_id: TabId,
}

#[async_trait::async_trait]
impl RelaySession for WsRelaySession {
    fn tab_id(&self) -> TabId {
        self.tab_id.clone()
    }

    async fn close(self: Box<Self>) -> Result<(), RelayError> {
        let mut session = *self;
        match session.ws.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                portal_debug!("relay session closed tab_id={}", session.tab_id);
                Ok(())
            }
            Err(err) => Err(RelayError::Teardown(err.to_string())),
        }
    }
}

/// Treats an accepting TCP listener at the relay address as a present bridge.
#[derive(Debug, Clone)]
pub struct TcpExtensionProbe {
    relay_url: String,
    timeout: Duration,
}

impl TcpExtensionProbe {
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            relay_url: relay_url.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl ExtensionProbe for TcpExtensionProbe {
    async fn is_installed(&self) -> bool {
        let Ok(url) = Url::parse(&self.relay_url) else {
            return false;
        };
        let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
            return false;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }
}

/// Probe with a fixed answer, for manual overrides and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedExtensionProbe(pub bool);

#[async_trait::async_trait]
impl ExtensionProbe for FixedExtensionProbe {
    async fn is_installed(&self) -> bool {
        self.0
    }
}
