// ABOUTME: SMGP error types shared by the client and server sessions
// ABOUTME: Separates transport, authentication, protocol, correlation and timeout failures

use crate::codec::CodecError;
use crate::datatypes::{CommandId, describe_status};
use std::io;
use thiserror::Error;

/// Error type for SMGP sessions and the operations they expose.
///
/// Only `Transport` ends a connection with a reconnect; `Authentication`
/// ends it for good. Protocol, correlation and timeout errors are reported
/// while the connection stays open.
#[derive(Debug, Error)]
pub enum SmgpError {
    /// Socket failure while connecting, reading or writing
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Login rejected by the peer (`Login_Resp.Status != 0`)
    #[error("Authentication failed: {reason} (status {status})")]
    Authentication { status: u32, reason: String },

    /// Response carried a nonzero `Status`
    #[error("Protocol error: {command} returned {reason} (status {status})")]
    Protocol {
        command: CommandId,
        status: u32,
        reason: String,
    },

    /// Command the session does not handle in its current role
    #[error("Unexpected command: 0x{request_id:08x}")]
    UnexpectedCommand { request_id: u32 },

    /// Response whose `SequenceID` matches no outstanding request
    #[error("No pending request for sequence id {sequence_id}")]
    Correlation { sequence_id: u32 },

    /// Request abandoned after exhausting its retry budget
    #[error("Request to {destination} timed out")]
    Timeout { destination: String },

    /// Malformed frame or body
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Data validation error (content too long, etc.)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Session not in the right state for the operation
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// The session task has stopped
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias for SMGP operations
pub type SmgpResult<T> = Result<T, SmgpError>;

impl SmgpError {
    pub fn authentication(status: u32) -> Self {
        SmgpError::Authentication {
            status,
            reason: describe_status(status),
        }
    }

    pub fn protocol(command: CommandId, status: u32) -> Self {
        SmgpError::Protocol {
            command,
            status,
            reason: describe_status(status),
        }
    }

    /// Whether the error ends the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SmgpError::Transport(_) | SmgpError::Authentication { .. })
    }
}
