// ABOUTME: Event handler registry for the SMGP client session
// ABOUTME: Handlers run synchronously on the session task, in registration order per event kind

use crate::codec::{Fields, Header};
use crate::datatypes::{Deliver, DeliverResp, STATUS_OK};
use crate::error::SmgpError;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Why a session ended in an orderly way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Active_Test probes went unanswered.
    Heartbeat,
    /// The gateway sent Exit.
    Peer,
    /// `disconnect()` was called or every handle was dropped.
    Requested,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExitReason::Heartbeat => "heartbeat",
            ExitReason::Peer => "peer",
            ExitReason::Requested => "requested",
        })
    }
}

/// Deliver_Resp queued by a [`DeliverAck`] for the session to write.
#[derive(Debug)]
pub(crate) struct Acknowledgement {
    pub sequence_id: u32,
    pub response: DeliverResp,
}

/// Acknowledgement action handed to deliver handlers.
///
/// Calling [`DeliverAck::ack`] queues a Deliver_Resp echoing the Deliver's
/// `SequenceID` and `MsgID`. Only the first call has any effect; never
/// calling it withholds the acknowledgement. The handle may be cloned and
/// moved to another task to acknowledge later.
#[derive(Debug, Clone)]
pub struct DeliverAck {
    tx: mpsc::UnboundedSender<Acknowledgement>,
    sequence_id: u32,
    msg_id: String,
    sent: Arc<AtomicBool>,
}

impl DeliverAck {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Acknowledgement>,
        sequence_id: u32,
        msg_id: String,
    ) -> Self {
        Self {
            tx,
            sequence_id,
            msg_id,
            sent: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Acknowledge with `Status = 0`.
    pub fn ack(&self) -> bool {
        self.ack_with_status(STATUS_OK)
    }

    /// Acknowledge with an explicit status. Returns `false` if the Deliver
    /// was already acknowledged or the session has ended.
    pub fn ack_with_status(&self, status: u32) -> bool {
        if self.sent.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tx
            .send(Acknowledgement {
                sequence_id: self.sequence_id,
                response: DeliverResp {
                    msg_id: self.msg_id.clone(),
                    status,
                },
            })
            .is_ok()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }
}

type ConnectHandler = Box<dyn FnMut() + Send>;
type SubmitHandler = Box<dyn FnMut(&Header, &Fields) + Send>;
type DeliverHandler = Box<dyn FnMut(&Header, &Deliver, &DeliverAck) + Send>;
type ErrorHandler = Box<dyn FnMut(&SmgpError) + Send>;
type ExitHandler = Box<dyn FnMut(ExitReason) + Send>;
type TimeoutHandler = Box<dyn FnMut(&str, &Bytes) + Send>;

/// Handlers registered per event kind.
#[derive(Default)]
pub(crate) struct EventHandlers {
    pub connect: Vec<ConnectHandler>,
    pub submit: Vec<SubmitHandler>,
    pub deliver: Vec<DeliverHandler>,
    pub error: Vec<ErrorHandler>,
    pub exit: Vec<ExitHandler>,
    pub timeout: Vec<TimeoutHandler>,
}

impl EventHandlers {
    pub fn emit_connect(&mut self) {
        for handler in &mut self.connect {
            handler();
        }
    }

    pub fn emit_submit(&mut self, header: &Header, body: &Fields) {
        for handler in &mut self.submit {
            handler(header, body);
        }
    }

    pub fn emit_deliver(&mut self, header: &Header, deliver: &Deliver, ack: &DeliverAck) {
        for handler in &mut self.deliver {
            handler(header, deliver, ack);
        }
    }

    pub fn emit_error(&mut self, error: &SmgpError) {
        for handler in &mut self.error {
            handler(error);
        }
    }

    pub fn emit_exit(&mut self, reason: ExitReason) {
        for handler in &mut self.exit {
            handler(reason);
        }
    }

    pub fn emit_timeout(&mut self, destination: &str, content: &Bytes) {
        for handler in &mut self.timeout {
            handler(destination, content);
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("connect", &self.connect.len())
            .field("submit", &self.submit.len())
            .field("deliver", &self.deliver.len())
            .field("error", &self.error.len())
            .field("exit", &self.exit.len())
            .field("timeout", &self.timeout.len())
            .finish()
    }
}
