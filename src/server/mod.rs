// ABOUTME: SMGP server: accepts client connections and spawns one session per connection
// ABOUTME: The handle pushes Deliver frames to the most recent client and shuts the server down

//! SMGP Server Module
//!
//! The server listens for gateway clients, answers Login, Submit,
//! Active_Test and Exit on each connection, and forwards decisions to a
//! [`ServerHandler`]. Deliver frames can be pushed to the most recently
//! connected client through the [`ServerHandle`].

mod handler;
mod session;

pub use handler::ServerHandler;

use crate::connection::Connection;
use crate::datatypes::Deliver;
use crate::error::{SmgpError, SmgpResult};
use crate::macros::config_setters;
use session::{ServerSession, SessionCommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Protocol version announced in Login_Resp (3.0).
pub const DEFAULT_SERVER_VERSION: u8 = 0x30;

/// Listening address and protocol settings for a server.
///
/// Port `0` binds an ephemeral port; read it back from
/// [`ServerHandle::local_addr`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Filled into Login_Resp when the handler leaves `server_version` at 0.
    pub server_version: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7890,
            server_version: DEFAULT_SERVER_VERSION,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    config_setters! {
        host: String,
    }

    config_setters! {
        port: u16,
        server_version: u8,
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
enum ServerCommand {
    Deliver {
        deliver: Box<Deliver>,
        reply: oneshot::Sender<SmgpResult<u32>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Server under construction.
pub struct SmgpServer<H> {
    config: ServerConfig,
    handler: Arc<H>,
}

impl<H: ServerHandler> SmgpServer<H> {
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Bind the listener and spawn the accept loop. Must be called within a
    /// Tokio runtime.
    pub async fn start(self) -> SmgpResult<ServerHandle> {
        let listener = TcpListener::bind(self.config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "SMGP server listening");

        let (commands_tx, commands) = mpsc::channel(32);
        let accept = AcceptLoop {
            listener,
            handler: self.handler,
            server_version: self.config.server_version,
            commands,
            sessions: Vec::new(),
            notify_shutdown: broadcast::channel(1).0,
        };
        tokio::spawn(accept.run());

        Ok(ServerHandle {
            local_addr,
            commands: commands_tx,
        })
    }
}

/// Handle to a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    commands: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Push a Deliver to the most recently connected, logged-in client.
    /// Returns the `SequenceID` the frame was written with.
    pub async fn deliver(&self, deliver: Deliver) -> SmgpResult<u32> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(ServerCommand::Deliver {
                deliver: Box::new(deliver),
                reply,
            })
            .await
            .map_err(|_| SmgpError::ConnectionClosed)?;
        response.await.map_err(|_| SmgpError::ConnectionClosed)?
    }

    /// Stop accepting and close every open connection.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(ServerCommand::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }
}

struct AcceptLoop<H> {
    listener: TcpListener,
    handler: Arc<H>,
    server_version: u8,
    commands: mpsc::Receiver<ServerCommand>,
    // Senders to live sessions in accept order; the last one is current.
    sessions: Vec<mpsc::Sender<SessionCommand>>,
    notify_shutdown: broadcast::Sender<()>,
}

impl<H: ServerHandler> AcceptLoop<H> {
    async fn run(mut self) {
        let closer = loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!(%peer, "accepted connection");
                        let (tx, rx) = mpsc::channel(16);
                        let session = ServerSession::new(
                            Connection::new(socket),
                            self.handler.clone(),
                            self.server_version,
                            rx,
                            self.notify_shutdown.subscribe(),
                        );
                        self.sessions.retain(|session| !session.is_closed());
                        self.sessions.push(tx);
                        tokio::spawn(session.run());
                    }
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        self.handler.on_error(&SmgpError::Transport(err));
                    }
                },
                command = self.commands.recv() => match command {
                    Some(ServerCommand::Deliver { deliver, reply }) => {
                        self.forward_deliver(deliver, reply).await;
                    }
                    Some(ServerCommand::Shutdown { reply }) => break Some(reply),
                    None => break None,
                },
            }
        };

        info!("SMGP server stopped accepting connections");
        let _ = self.notify_shutdown.send(());
        if let Some(closer) = closer {
            let _ = closer.send(());
        }
    }

    async fn forward_deliver(
        &mut self,
        deliver: Box<Deliver>,
        reply: oneshot::Sender<SmgpResult<u32>>,
    ) {
        self.sessions.retain(|session| !session.is_closed());
        let Some(current) = self.sessions.last() else {
            let _ = reply.send(Err(SmgpError::InvalidState(
                "no client connected".to_string(),
            )));
            return;
        };

        if let Err(mpsc::error::SendError(SessionCommand::Deliver { reply, .. })) = current
            .send(SessionCommand::Deliver { deliver, reply })
            .await
        {
            let _ = reply.send(Err(SmgpError::ConnectionClosed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "127.0.0.1:7890");
        assert_eq!(config.server_version, 0x30);

        let config = ServerConfig::new("0.0.0.0", 0).server_version(0x20);
        assert_eq!(config.address(), "0.0.0.0:0");
        assert_eq!(config.server_version, 0x20);
    }
}
