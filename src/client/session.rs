// ABOUTME: Single-owner event loop driving one SMGP client connection at a time
// ABOUTME: Handles login, heartbeat, submit correlation and retry, deliver acks, exit and reconnect

use crate::auth;
use crate::client::ConnectionState;
use crate::client::config::ClientConfig;
use crate::client::events::{Acknowledgement, DeliverAck, EventHandlers, ExitReason};
use crate::client::keepalive::{Beat, Heartbeat};
use crate::client::pending::PendingTable;
use crate::codec::{Fields, Header};
use crate::connection::Connection;
use crate::datatypes::{CommandId, Login, LoginResp, STATUS_OK, Submit, SubmitResp};
use crate::error::{SmgpError, SmgpResult};
use crate::frame::{Frame, Message, RawFrame, SequenceIds};
use crate::segment::Segmenter;
use bytes::Bytes;
use std::io;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until, timeout};
use tracing::{debug, error, info, warn};

/// Longest content a single Submit can carry; `MsgLength` is one byte.
const MAX_CONTENT_LEN: usize = 255;

/// Requests from [`crate::client::ClientHandle`] to the session task.
#[derive(Debug)]
pub(crate) enum Request {
    SendSms {
        mobile: String,
        text: String,
        extend_code: Option<String>,
        reply: oneshot::Sender<SmgpResult<Vec<u32>>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
}

/// What happens after a connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Reconnect,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Response the session is waiting on with a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    Login,
    Exit,
}

pub(crate) struct ClientSession {
    config: ClientConfig,
    handlers: EventHandlers,
    requests: mpsc::Receiver<Request>,
    requests_open: bool,
    acks_tx: mpsc::UnboundedSender<Acknowledgement>,
    acks: mpsc::UnboundedReceiver<Acknowledgement>,
    state: watch::Sender<ConnectionState>,
    sequence: SequenceIds,
    pending: PendingTable,
    heartbeat: Heartbeat,
    segmenter: Segmenter,
    // Callers of `disconnect()` waiting for the session to stop.
    closers: Vec<oneshot::Sender<()>>,
    deadline: Option<(Instant, Deadline)>,
}

impl ClientSession {
    pub(crate) fn new(
        config: ClientConfig,
        handlers: EventHandlers,
        requests: mpsc::Receiver<Request>,
        state: watch::Sender<ConnectionState>,
    ) -> Self {
        let (acks_tx, acks) = mpsc::unbounded_channel();
        let heartbeat = Heartbeat::new(config.heartbeat_max_attempts);
        let segmenter = Segmenter::new(config.segment_limit);
        Self {
            config,
            handlers,
            requests,
            requests_open: true,
            acks_tx,
            acks,
            state,
            sequence: SequenceIds::new(),
            pending: PendingTable::new(),
            heartbeat,
            segmenter,
            closers: Vec::new(),
            deadline: None,
        }
    }

    /// Drive connections until the session finishes: the client disconnects,
    /// the peer exits, the heartbeat gives up, or login is rejected.
    pub(crate) async fn run(mut self) {
        loop {
            match self.run_connection().await {
                Outcome::Finished => break,
                Outcome::Reconnect => {
                    self.set_state(ConnectionState::Disconnected);
                    if !self.backoff().await {
                        break;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        for request in self.pending.drain() {
            warn!(
                destination = %request.submit.dest_term_id,
                sequence_id = request.sequence_id,
                "submit unanswered when session stopped"
            );
            self.handlers
                .emit_timeout(&request.submit.dest_term_id, &request.submit.msg_content);
        }
        for closer in self.closers.drain(..) {
            let _ = closer.send(());
        }
        info!("SMGP client session stopped");
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = ?*current, to = ?state, "client state changed");
            *current = state;
            true
        });
    }

    /// Wait `heartbeat_interval` before reconnecting. Returns `false` when
    /// the client asked to stop in the meantime.
    async fn backoff(&mut self) -> bool {
        let resume = Instant::now() + self.config.heartbeat_interval;
        info!(delay = ?self.config.heartbeat_interval, "reconnecting after delay");

        loop {
            tokio::select! {
                _ = sleep_until(resume) => return true,
                request = self.requests.recv(), if self.requests_open => match request {
                    Some(Request::SendSms { reply, .. }) => {
                        let _ = reply.send(Err(SmgpError::InvalidState(
                            "not connected".to_string(),
                        )));
                    }
                    Some(Request::Disconnect { reply }) => {
                        self.closers.push(reply);
                        return false;
                    }
                    None => {
                        self.requests_open = false;
                        return false;
                    }
                },
            }
        }
    }

    async fn run_connection(&mut self) -> Outcome {
        self.set_state(ConnectionState::Connecting);
        let address = self.config.address();
        let socket = match timeout(self.config.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(err)) => {
                warn!(%address, error = %err, "connect failed");
                self.handlers.emit_error(&SmgpError::Transport(err));
                return Outcome::Reconnect;
            }
            Err(_) => {
                warn!(%address, "connect timed out");
                self.handlers.emit_error(&SmgpError::Transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "connect timed out",
                )));
                return Outcome::Reconnect;
            }
        };

        let mut connection = Connection::new(socket);
        info!(%address, "connected to SMGP gateway");
        self.handlers.emit_connect();

        // Acks for Delivers of a previous connection are meaningless here.
        while self.acks.try_recv().is_ok() {}
        self.heartbeat.reset();
        self.deadline = None;

        self.set_state(ConnectionState::Authenticating);
        if let Err(err) = self.send_login(&mut connection).await {
            self.handlers.emit_error(&err);
            connection.shutdown().await;
            return if err.is_fatal() { Outcome::Reconnect } else { Outcome::Finished };
        }

        let start = Instant::now();
        let mut heartbeat = interval_at(
            start + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweep = interval_at(start + self.config.retry_interval, self.config.retry_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            let deadline = self.deadline.map(|(at, _)| at);
            let step = tokio::select! {
                frame = connection.read_frame() => match frame {
                    Ok(Some(raw)) => self.on_frame(&mut connection, raw).await,
                    Ok(None) => Err(SmgpError::Transport(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed by peer",
                    ))),
                    // A bad PacketLength leaves the stream unreadable.
                    Err(SmgpError::Codec(err)) => Err(SmgpError::Transport(io::Error::new(
                        io::ErrorKind::InvalidData,
                        err,
                    ))),
                    Err(err) => Err(err),
                },
                _ = heartbeat.tick() => self.on_heartbeat(&mut connection).await,
                _ = sweep.tick() => self.on_sweep(&mut connection).await,
                Some(ack) = self.acks.recv() => self.send_ack(&mut connection, ack).await,
                request = self.requests.recv(), if self.requests_open => {
                    self.on_request(&mut connection, request).await
                }
                _ = sleep_until(deadline.unwrap_or(start)), if deadline.is_some() => {
                    self.on_deadline()
                }
            };

            match step {
                Ok(Flow::Continue) => {}
                Ok(Flow::Finished) => break Outcome::Finished,
                Err(err) => {
                    let closing = self.current() == ConnectionState::Closing;
                    if closing && err.is_fatal() {
                        debug!(error = %err, "connection ended while closing");
                        break Outcome::Finished;
                    }
                    warn!(error = %err, "SMGP client error");
                    self.handlers.emit_error(&err);
                    if err.is_fatal() {
                        break Outcome::Reconnect;
                    }
                }
            }
        };

        self.deadline = None;
        connection.shutdown().await;
        outcome
    }

    async fn send_login(&mut self, connection: &mut Connection) -> SmgpResult<()> {
        let timestamp = auth::timestamp_now();
        let digest = auth::client_digest(&self.config.client_id, &self.config.secret, &timestamp);
        let login = Login {
            client_id: self.config.client_id.clone(),
            authenticator: Bytes::copy_from_slice(&digest),
            login_mode: self.config.login_mode,
            timestamp: timestamp
                .parse()
                .map_err(|_| SmgpError::InvalidData(format!("bad timestamp {timestamp}")))?,
            client_version: self.config.client_version,
        };

        let frame = Frame::new(self.sequence.next_id(), Message::Login(login));
        connection.write_frame(&frame).await?;
        self.deadline = Some((Instant::now() + self.config.timeout, Deadline::Login));
        Ok(())
    }

    fn on_deadline(&mut self) -> SmgpResult<Flow> {
        match self.deadline.take() {
            Some((_, Deadline::Login)) => Err(SmgpError::Transport(io::Error::new(
                io::ErrorKind::TimedOut,
                "no Login_Resp before timeout",
            ))),
            Some((_, Deadline::Exit)) => {
                debug!("no Exit_Resp before timeout, closing anyway");
                Ok(Flow::Finished)
            }
            None => Ok(Flow::Continue),
        }
    }

    async fn on_frame(&mut self, connection: &mut Connection, raw: RawFrame) -> SmgpResult<Flow> {
        self.heartbeat.on_peer_reply();
        let frame = Frame::decode(raw)?;
        let header = frame.header;
        debug!(
            request_id = format_args!("0x{:08x}", header.request_id),
            sequence_id = header.sequence_id,
            "received frame"
        );

        match frame.message {
            Message::LoginResp(resp) => self.on_login_resp(resp),
            Message::SubmitResp(resp) => {
                self.on_submit_resp(&header, resp)?;
                Ok(Flow::Continue)
            }
            Message::Deliver(deliver) => {
                let ack = DeliverAck::new(
                    self.acks_tx.clone(),
                    header.sequence_id,
                    deliver.msg_id.clone(),
                );
                self.handlers.emit_deliver(&header, &deliver, &ack);
                Ok(Flow::Continue)
            }
            Message::ActiveTest => {
                let reply = Frame::new(header.sequence_id, Message::ActiveTestResp);
                connection.write_frame(&reply).await?;
                Ok(Flow::Continue)
            }
            Message::ActiveTestResp => Ok(Flow::Continue),
            Message::Exit => {
                info!("gateway requested exit");
                self.set_state(ConnectionState::Closing);
                let reply = Frame::new(header.sequence_id, Message::ExitResp);
                if let Err(err) = connection.write_frame(&reply).await {
                    debug!(error = %err, "could not answer Exit");
                }
                self.handlers.emit_exit(ExitReason::Peer);
                Ok(Flow::Finished)
            }
            Message::ExitResp => {
                if self.current() == ConnectionState::Closing {
                    Ok(Flow::Finished)
                } else {
                    Err(SmgpError::UnexpectedCommand {
                        request_id: header.request_id,
                    })
                }
            }
            message => match (message.command(), message.status()) {
                (Some(command), Some(status)) if command.is_response() && status != STATUS_OK => {
                    Err(SmgpError::protocol(command, status))
                }
                (Some(command), _) if command.is_response() => Ok(Flow::Continue),
                _ => Err(SmgpError::UnexpectedCommand {
                    request_id: header.request_id,
                }),
            },
        }
    }

    fn on_login_resp(&mut self, resp: LoginResp) -> SmgpResult<Flow> {
        if self.current() != ConnectionState::Authenticating {
            return Err(SmgpError::UnexpectedCommand {
                request_id: CommandId::LoginResp.into(),
            });
        }
        self.deadline = None;

        if resp.status != STATUS_OK {
            let err = SmgpError::authentication(resp.status);
            error!(status = resp.status, "login rejected");
            self.handlers.emit_error(&err);
            return Ok(Flow::Finished);
        }

        info!(
            sp_id = %self.config.sp_id,
            server_version = resp.server_version,
            "logged in"
        );
        self.set_state(ConnectionState::Ready);
        Ok(Flow::Continue)
    }

    fn on_submit_resp(&mut self, header: &Header, resp: SubmitResp) -> SmgpResult<()> {
        let Some(request) = self.pending.resolve(header.sequence_id) else {
            return Err(SmgpError::Correlation {
                sequence_id: header.sequence_id,
            });
        };

        let mut body = Fields::from(&request.submit);
        body.merge(Fields::from(&resp));
        self.handlers.emit_submit(header, &body);

        if resp.status != STATUS_OK {
            return Err(SmgpError::protocol(CommandId::SubmitResp, resp.status));
        }
        Ok(())
    }

    async fn on_heartbeat(&mut self, connection: &mut Connection) -> SmgpResult<Flow> {
        if self.current() != ConnectionState::Ready {
            return Ok(Flow::Continue);
        }

        match self.heartbeat.on_tick() {
            Beat::Probe => {
                let probe = Frame::new(self.sequence.next_id(), Message::ActiveTest);
                connection.write_frame(&probe).await?;
                Ok(Flow::Continue)
            }
            Beat::Exhausted => {
                self.handlers.emit_exit(ExitReason::Heartbeat);
                self.begin_exit(connection).await
            }
        }
    }

    async fn on_sweep(&mut self, connection: &mut Connection) -> SmgpResult<Flow> {
        if self.current() != ConnectionState::Ready {
            return Ok(Flow::Continue);
        }

        let now = Instant::now();
        let sweep = self.pending.sweep(
            now,
            self.config.retry_interval,
            self.config.submit_max_retries,
        );

        for request in sweep.expired {
            warn!(
                destination = %request.submit.dest_term_id,
                attempts = request.attempts,
                "submit timed out"
            );
            self.handlers
                .emit_timeout(&request.submit.dest_term_id, &request.submit.msg_content);
        }

        for request in sweep.resend {
            let sequence_id = self.sequence.next_id();
            let frame = Frame::new(sequence_id, Message::Submit(Box::new(request.submit.clone())));
            debug!(
                previous = request.sequence_id,
                sequence_id,
                attempt = request.attempts + 1,
                "resending submit"
            );
            self.pending.register_retry(sequence_id, request, now);
            connection.write_frame(&frame).await?;
        }
        Ok(Flow::Continue)
    }

    async fn send_ack(&mut self, connection: &mut Connection, ack: Acknowledgement) -> SmgpResult<Flow> {
        let frame = Frame::new(ack.sequence_id, Message::DeliverResp(ack.response));
        connection.write_frame(&frame).await?;
        Ok(Flow::Continue)
    }

    async fn on_request(
        &mut self,
        connection: &mut Connection,
        request: Option<Request>,
    ) -> SmgpResult<Flow> {
        match request {
            Some(Request::SendSms {
                mobile,
                text,
                extend_code,
                reply,
            }) => {
                let result = self
                    .send_sms(connection, &mobile, &text, extend_code.as_deref())
                    .await;
                // Write failures are reported to the caller and to the loop.
                let outcome = match &result {
                    Err(SmgpError::Transport(err)) => Err(SmgpError::Transport(io::Error::new(
                        err.kind(),
                        err.to_string(),
                    ))),
                    _ => Ok(Flow::Continue),
                };
                let _ = reply.send(result);
                outcome
            }
            Some(Request::Disconnect { reply }) => {
                self.closers.push(reply);
                self.disconnect(connection).await
            }
            None => {
                debug!("all client handles dropped");
                self.requests_open = false;
                self.disconnect(connection).await
            }
        }
    }

    async fn disconnect(&mut self, connection: &mut Connection) -> SmgpResult<Flow> {
        match self.current() {
            ConnectionState::Ready | ConnectionState::Authenticating => {
                self.handlers.emit_exit(ExitReason::Requested);
                self.begin_exit(connection).await
            }
            ConnectionState::Closing => Ok(Flow::Continue),
            ConnectionState::Disconnected | ConnectionState::Connecting => Ok(Flow::Finished),
        }
    }

    /// Send Exit and wait up to `timeout` for Exit_Resp.
    async fn begin_exit(&mut self, connection: &mut Connection) -> SmgpResult<Flow> {
        self.set_state(ConnectionState::Closing);
        self.deadline = Some((Instant::now() + self.config.timeout, Deadline::Exit));
        let frame = Frame::new(self.sequence.next_id(), Message::Exit);
        connection.write_frame(&frame).await?;
        Ok(Flow::Continue)
    }

    /// Write one Submit per segment and register each for correlation.
    /// Returns the `SequenceID` of every Submit written.
    async fn send_sms(
        &mut self,
        connection: &mut Connection,
        mobile: &str,
        text: &str,
        extend_code: Option<&str>,
    ) -> SmgpResult<Vec<u32>> {
        if self.current() != ConnectionState::Ready {
            return Err(SmgpError::InvalidState(format!(
                "cannot submit while {:?}",
                self.current()
            )));
        }

        let src_term_id = format!("{}{}", self.config.src_id, extend_code.unwrap_or_default());
        let template = Submit::new(self.config.service_id.as_str(), src_term_id, mobile);

        let submits = match self.segmenter.split(text) {
            Some(segments) => segments
                .into_iter()
                .map(|segment| {
                    template
                        .clone()
                        .with_segment(segment.payload, segment.total, segment.number)
                })
                .collect(),
            None => vec![template.with_text(text)],
        };

        if submits.is_empty() || submits.iter().any(|submit| submit.msg_length() > MAX_CONTENT_LEN) {
            return Err(SmgpError::InvalidData(format!(
                "content for {mobile} does not fit a Submit"
            )));
        }

        let mut sequence_ids = Vec::with_capacity(submits.len());
        for submit in submits {
            let sequence_id = self.sequence.next_id();
            let frame = Frame::new(sequence_id, Message::Submit(Box::new(submit.clone())));
            self.pending.register(sequence_id, submit, Instant::now());
            connection.write_frame(&frame).await?;
            sequence_ids.push(sequence_id);
        }

        debug!(destination = mobile, parts = sequence_ids.len(), "submitted message");
        Ok(sequence_ids)
    }
}
