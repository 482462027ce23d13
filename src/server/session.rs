// ABOUTME: Per-connection SMGP server session answering client requests
// ABOUTME: Also writes server-initiated Deliver frames with its own SequenceID counter

use crate::connection::Connection;
use crate::datatypes::{CommandId, Deliver, STATUS_OK};
use crate::error::{SmgpError, SmgpResult};
use crate::frame::{Frame, Message, RawFrame, SequenceIds};
use crate::server::handler::ServerHandler;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Work handed to a session by the accept loop.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Deliver {
        deliver: Box<Deliver>,
        reply: oneshot::Sender<SmgpResult<u32>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Generates 10-character `MsgID`s: `MMDDHH` followed by a four-digit
/// counter that wraps after 9999.
#[derive(Debug, Default)]
pub(crate) struct MsgIds {
    counter: u32,
}

impl MsgIds {
    pub(crate) fn next_id(&mut self) -> String {
        self.counter = (self.counter + 1) % 10_000;
        format!(
            "{}{:04}",
            chrono::Local::now().format("%m%d%H"),
            self.counter
        )
    }
}

pub(crate) struct ServerSession<H> {
    connection: Connection,
    handler: Arc<H>,
    server_version: u8,
    commands: mpsc::Receiver<SessionCommand>,
    shutdown: broadcast::Receiver<()>,
    sequence: SequenceIds,
    msg_ids: MsgIds,
    client_id: Option<String>,
}

impl<H: ServerHandler> ServerSession<H> {
    pub(crate) fn new(
        connection: Connection,
        handler: Arc<H>,
        server_version: u8,
        commands: mpsc::Receiver<SessionCommand>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            connection,
            handler,
            server_version,
            commands,
            shutdown,
            sequence: SequenceIds::new(),
            msg_ids: MsgIds::default(),
            client_id: None,
        }
    }

    pub(crate) async fn run(mut self) {
        let peer = self
            .connection
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        info!(%peer, "client connected");

        loop {
            let step = tokio::select! {
                frame = self.connection.read_frame() => match frame {
                    Ok(Some(raw)) => self.on_frame(raw).await,
                    Ok(None) => {
                        debug!(%peer, "client closed connection");
                        break;
                    }
                    Err(err) => {
                        // Unreadable stream; nothing after this can be framed.
                        self.handler.on_error(&err);
                        break;
                    }
                },
                Some(command) = self.commands.recv() => self.on_command(command).await,
                _ = self.shutdown.recv() => {
                    debug!(%peer, "server shutting down");
                    break;
                }
            };

            match step {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => break,
                Err(err) => {
                    self.handler.on_error(&err);
                    if matches!(err, SmgpError::Transport(_)) {
                        break;
                    }
                }
            }
        }

        self.connection.shutdown().await;
        info!(%peer, client_id = self.client_id.as_deref().unwrap_or(""), "client disconnected");
    }

    async fn on_frame(&mut self, raw: RawFrame) -> SmgpResult<Flow> {
        let frame = Frame::decode(raw)?;
        let header = frame.header;
        debug!(
            request_id = format_args!("0x{:08x}", header.request_id),
            sequence_id = header.sequence_id,
            "received frame"
        );

        match frame.message {
            Message::Login(login) => {
                let mut resp = self.handler.on_login(&header, &login);
                if resp.server_version == 0 {
                    resp.server_version = self.server_version;
                }
                let accepted = resp.status == STATUS_OK;
                let status = resp.status;
                self.reply(header.sequence_id, Message::LoginResp(resp)).await?;

                if !accepted {
                    warn!(client_id = %login.client_id, status, "login rejected");
                    return Ok(Flow::Close);
                }
                info!(client_id = %login.client_id, mode = ?login.login_mode, "client logged in");
                self.client_id = Some(login.client_id);
                Ok(Flow::Continue)
            }
            Message::Submit(submit) => {
                let mut resp = self.handler.on_submit(&header, &submit);
                if resp.msg_id.is_empty() {
                    resp.msg_id = self.msg_ids.next_id();
                }
                self.reply(header.sequence_id, Message::SubmitResp(resp)).await?;
                Ok(Flow::Continue)
            }
            Message::DeliverResp(resp) => {
                self.handler.on_deliver_resp(&header, &resp);
                Ok(Flow::Continue)
            }
            Message::ActiveTest => {
                self.reply(header.sequence_id, Message::ActiveTestResp).await?;
                Ok(Flow::Continue)
            }
            Message::ActiveTestResp => Ok(Flow::Continue),
            Message::Exit => {
                self.reply(header.sequence_id, Message::ExitResp).await?;
                Ok(Flow::Close)
            }
            _ => Err(SmgpError::UnexpectedCommand {
                request_id: header.request_id,
            }),
        }
    }

    async fn on_command(&mut self, command: SessionCommand) -> SmgpResult<Flow> {
        match command {
            SessionCommand::Deliver { deliver, reply } => {
                if self.client_id.is_none() {
                    let _ = reply.send(Err(SmgpError::InvalidState(
                        "client has not logged in".to_string(),
                    )));
                    return Ok(Flow::Continue);
                }

                let sequence_id = self.sequence.next_id();
                let frame = Frame::new(sequence_id, Message::Deliver(deliver));
                match self.connection.write_frame(&frame).await {
                    Ok(()) => {
                        debug!(sequence_id, "pushed {}", CommandId::Deliver);
                        let _ = reply.send(Ok(sequence_id));
                        Ok(Flow::Continue)
                    }
                    Err(err) => {
                        let _ = reply.send(Err(SmgpError::ConnectionClosed));
                        Err(err)
                    }
                }
            }
        }
    }

    async fn reply(&mut self, sequence_id: u32, message: Message) -> SmgpResult<()> {
        self.connection
            .write_frame(&Frame::new(sequence_id, message))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_ids_are_ten_digits_and_count_up() {
        let mut ids = MsgIds::default();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_eq!(first.len(), 10);
        assert!(first.chars().all(|c| c.is_ascii_digit()));
        assert!(first.ends_with("0001"));
        assert!(second.ends_with("0002"));
    }

    #[test]
    fn test_msg_id_counter_wraps() {
        let mut ids = MsgIds { counter: 9_999 };
        assert!(ids.next_id().ends_with("0000"));
    }
}
