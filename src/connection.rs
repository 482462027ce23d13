// ABOUTME: Provides TCP connection management for SMGP protocol communication
// ABOUTME: Implements frame-based I/O on top of the stream reassembler with buffered writes

use crate::error::{SmgpError, SmgpResult};
use crate::frame::{Frame, RawFrame, Reassembler};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::debug;

/// SMGP Connection Management
///
/// Handles frame-based communication over TCP for one SMGP session. The
/// connection only moves frames; session state (login, heartbeat,
/// correlation) is tracked by the client and server sessions that own it.
///
/// Reads are cancel safe: bytes are only appended to the reassembler once a
/// socket read completes, so `read_frame` can be raced in `tokio::select!`
/// without losing data.
#[derive(Debug)]
pub struct Connection {
    // The `TcpStream`, decorated with a `BufWriter` so a frame is handed to
    // the socket in one write.
    stream: BufWriter<TcpStream>,

    // Inbound bytes not yet cut into frames.
    frames: Reassembler,
}

impl Connection {
    /// Create a new `Connection`, backed by `socket`.
    pub fn new(socket: TcpStream) -> Connection {
        Connection {
            stream: BufWriter::new(socket),
            frames: Reassembler::new(),
        }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.get_ref().peer_addr()
    }

    /// Read a single frame from the underlying stream.
    ///
    /// Any bytes remaining after the frame are kept for the next call.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the `TcpStream` is
    /// closed in a way that doesn't break a frame in half, it returns
    /// `None`. Otherwise, an error is returned.
    pub async fn read_frame(&mut self) -> SmgpResult<Option<RawFrame>> {
        loop {
            if let Some(frame) = self.frames.next_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(self.frames.buffer_mut()).await? {
                // A clean shutdown leaves nothing buffered. Anything left
                // means the peer closed the socket mid-frame.
                return if self.frames.is_empty() {
                    Ok(None)
                } else {
                    Err(SmgpError::Transport(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )))
                };
            }
        }
    }

    /// Encode and write a single frame, flushing it to the socket.
    pub async fn write_frame(&mut self, frame: &Frame) -> SmgpResult<()> {
        let bytes = frame.encode()?;
        debug!(
            request_id = format_args!("0x{:08x}", frame.header.request_id),
            sequence_id = frame.header.sequence_id,
            len = bytes.len(),
            "writing frame"
        );
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Best-effort shutdown of the write half. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
