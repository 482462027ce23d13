// ABOUTME: SMGP client module: configuration, event registration and the session handle
// ABOUTME: Spawns one session task per client that owns the connection and all per-session state

//! SMGP Client Module
//!
//! A client owns one outbound connection to an SMGP gateway. It logs in,
//! keeps the link alive with Active_Test, correlates Submit requests with
//! their responses, resends unanswered Submits and reconnects after
//! transport failures.
//!
//! All of this runs on a single session task. Handlers registered before
//! [`SmgpClient::start`] are invoked synchronously on that task, in
//! registration order, so they should return quickly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smgp::client::{ClientConfig, ConnectionState, SmgpClient};
//!
//! # async fn example() -> smgp::SmgpResult<()> {
//! let config = ClientConfig::new("127.0.0.1", 7890, "10001", "secret")
//!     .service_id("smgpservice")
//!     .src_id("10690001");
//!
//! let mut client = SmgpClient::new(config);
//! client
//!     .on_submit(|header, body| {
//!         println!("submit {} answered: {:?}", header.sequence_id, body.get("Status"));
//!     })
//!     .on_deliver(|_, deliver, ack| {
//!         println!("deliver from {}", deliver.src_term_id);
//!         ack.ack();
//!     });
//!
//! let handle = client.start();
//! handle.wait_for_state(ConnectionState::Ready).await?;
//! handle.send_sms("13311112222", "hello", None).await?;
//! handle.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod events;
mod keepalive;
mod pending;
mod session;

pub use config::{ClientConfig, DEFAULT_CLIENT_VERSION};
pub use events::{DeliverAck, ExitReason};
pub use keepalive::{Beat, Heartbeat};
pub use pending::{PendingRequest, PendingTable, Sweep};

use crate::codec::{Fields, Header};
use crate::datatypes::Deliver;
use crate::error::{SmgpError, SmgpResult};
use bytes::Bytes;
use events::EventHandlers;
use session::{ClientSession, Request};
use std::fmt;
use tokio::sync::{mpsc, oneshot, watch};

/// Lifecycle of a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Login sent, waiting for Login_Resp.
    Authenticating,
    /// Logged in; Submits are accepted.
    Ready,
    /// Exit sent, waiting for Exit_Resp.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Client under construction: configuration plus registered handlers.
#[derive(Debug)]
pub struct SmgpClient {
    config: ClientConfig,
    handlers: EventHandlers,
}

impl SmgpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            handlers: EventHandlers::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Called each time the TCP connection is established, before login.
    pub fn on_connect<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.handlers.connect.push(Box::new(handler));
        self
    }

    /// Called when a Submit_Resp resolves a pending Submit. The body holds
    /// the Submit's fields overlaid with the response's `MsgID` and `Status`.
    pub fn on_submit<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&Header, &Fields) + Send + 'static,
    {
        self.handlers.submit.push(Box::new(handler));
        self
    }

    /// Called for every Deliver. Acknowledge through the [`DeliverAck`].
    pub fn on_deliver<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&Header, &Deliver, &DeliverAck) + Send + 'static,
    {
        self.handlers.deliver.push(Box::new(handler));
        self
    }

    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&SmgpError) + Send + 'static,
    {
        self.handlers.error.push(Box::new(handler));
        self
    }

    pub fn on_exit<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(ExitReason) + Send + 'static,
    {
        self.handlers.exit.push(Box::new(handler));
        self
    }

    /// Called once per Submit abandoned after its last resend, with the
    /// destination and the encoded content.
    pub fn on_timeout<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&str, &Bytes) + Send + 'static,
    {
        self.handlers.timeout.push(Box::new(handler));
        self
    }

    /// Spawn the session task and connect. Must be called within a Tokio
    /// runtime.
    pub fn start(self) -> ClientHandle {
        let (requests_tx, requests) = mpsc::channel(64);
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let session = ClientSession::new(self.config, self.handlers, requests, state_tx);
        tokio::spawn(session.run());
        ClientHandle {
            requests: requests_tx,
            state,
        }
    }
}

/// Cheap, cloneable handle to a running client session.
///
/// Dropping every handle ends the session the same way
/// [`ClientHandle::disconnect`] does.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    requests: mpsc::Sender<Request>,
    state: watch::Receiver<ConnectionState>,
}

impl ClientHandle {
    /// Submit `text` to `mobile`, split into parts when it exceeds the
    /// segment limit. `extend_code` is appended to the configured `src_id`.
    ///
    /// Resolves once every part has been written, with their `SequenceID`s;
    /// outcomes arrive later as submit or timeout events.
    pub async fn send_sms(
        &self,
        mobile: &str,
        text: &str,
        extend_code: Option<&str>,
    ) -> SmgpResult<Vec<u32>> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::SendSms {
                mobile: mobile.to_string(),
                text: text.to_string(),
                extend_code: extend_code.map(str::to_string),
                reply,
            })
            .await
            .map_err(|_| SmgpError::ConnectionClosed)?;
        response.await.map_err(|_| SmgpError::ConnectionClosed)?
    }

    /// Send Exit and stop the session. Resolves once the session has shut
    /// down; no reconnect follows.
    pub async fn disconnect(&self) {
        let (reply, done) = oneshot::channel();
        if self.requests.send(Request::Disconnect { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the session reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> SmgpResult<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| SmgpError::ConnectionClosed)
    }

    /// Whether the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handlers_register_in_order() {
        let mut client = SmgpClient::new(ClientConfig::new("127.0.0.1", 7890, "1", "TEST"));
        client.on_connect(|| {}).on_connect(|| {}).on_exit(|_| {});
        assert_eq!(client.handlers.connect.len(), 2);
        assert_eq!(client.handlers.exit.len(), 1);
        assert_eq!(client.config().port, 7890);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Ready.to_string(), "Ready");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}
