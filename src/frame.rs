//! SMGP frames: typed messages over the schema codec, and the stream
//! reassembler that cuts a TCP byte stream into complete frames.

use crate::codec::{self, CodecError, Fields, Header, MAX_PACKET_SIZE};
use crate::datatypes::{
    CommandId, Deliver, DeliverResp, Login, LoginResp, Submit, SubmitResp,
};
use bytes::{Bytes, BytesMut};

/// A complete frame as cut from the stream, body not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub header: Header,
    pub body: Bytes,
}

/// Decoded body of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Login(Login),
    LoginResp(LoginResp),
    Submit(Box<Submit>),
    SubmitResp(SubmitResp),
    Deliver(Box<Deliver>),
    DeliverResp(DeliverResp),
    ActiveTest,
    ActiveTestResp,
    Exit,
    ExitResp,
    /// Known command this crate carries but does not interpret
    /// (Forward, Query, Query_TE_Route and their responses).
    Unsupported { command: CommandId, body: Bytes },
    /// Command code outside the SMGP set.
    Unknown { request_id: u32, body: Bytes },
}

impl Message {
    pub fn request_id(&self) -> u32 {
        match self {
            Message::Unknown { request_id, .. } => *request_id,
            Message::Unsupported { command, .. } => (*command).into(),
            Message::Login(_) => CommandId::Login.into(),
            Message::LoginResp(_) => CommandId::LoginResp.into(),
            Message::Submit(_) => CommandId::Submit.into(),
            Message::SubmitResp(_) => CommandId::SubmitResp.into(),
            Message::Deliver(_) => CommandId::Deliver.into(),
            Message::DeliverResp(_) => CommandId::DeliverResp.into(),
            Message::ActiveTest => CommandId::ActiveTest.into(),
            Message::ActiveTestResp => CommandId::ActiveTestResp.into(),
            Message::Exit => CommandId::Exit.into(),
            Message::ExitResp => CommandId::ExitResp.into(),
        }
    }

    /// Command code, or `None` for [`Message::Unknown`].
    pub fn command(&self) -> Option<CommandId> {
        CommandId::try_from(self.request_id()).ok()
    }

    pub fn decode(request_id: u32, body: Bytes) -> Result<Message, CodecError> {
        let Ok(command) = CommandId::try_from(request_id) else {
            return Ok(Message::Unknown { request_id, body });
        };

        let fields = codec::decode_body(command, &body)?;
        let message = match command {
            CommandId::Login => Message::Login(Login::try_from(&fields)?),
            CommandId::LoginResp => Message::LoginResp(LoginResp::try_from(&fields)?),
            CommandId::Submit => Message::Submit(Box::new(Submit::try_from(&fields)?)),
            CommandId::SubmitResp => Message::SubmitResp(SubmitResp::try_from(&fields)?),
            CommandId::Deliver => Message::Deliver(Box::new(Deliver::try_from(&fields)?)),
            CommandId::DeliverResp => Message::DeliverResp(DeliverResp::try_from(&fields)?),
            CommandId::ActiveTest => Message::ActiveTest,
            CommandId::ActiveTestResp => Message::ActiveTestResp,
            CommandId::Exit => Message::Exit,
            CommandId::ExitResp => Message::ExitResp,
            command => Message::Unsupported { command, body },
        };
        Ok(message)
    }

    /// Field view of the body, empty for header-only and opaque messages.
    pub fn to_fields(&self) -> Result<Fields, CodecError> {
        let fields = match self {
            Message::Login(login) => Fields::from(login),
            Message::LoginResp(resp) => Fields::from(resp),
            Message::Submit(submit) => Fields::from(submit.as_ref()),
            Message::SubmitResp(resp) => Fields::from(resp),
            Message::Deliver(deliver) => Fields::try_from(deliver.as_ref())?,
            Message::DeliverResp(resp) => Fields::from(resp),
            _ => Fields::new(),
        };
        Ok(fields)
    }

    pub fn encode_body(&self) -> Result<Bytes, CodecError> {
        match self {
            Message::Unsupported { body, .. } | Message::Unknown { body, .. } => Ok(body.clone()),
            message => match message.command() {
                Some(command) => codec::encode_body(command, &message.to_fields()?),
                None => Ok(Bytes::new()),
            },
        }
    }

    /// `Status` of a response body, when the body has one.
    pub fn status(&self) -> Option<u32> {
        match self {
            Message::LoginResp(resp) => Some(resp.status),
            Message::SubmitResp(resp) => Some(resp.status),
            Message::DeliverResp(resp) => Some(resp.status),
            _ => None,
        }
    }
}

/// A decoded SMGP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub message: Message,
}

impl Frame {
    /// Build an outbound frame; `PacketLength` is filled in on encode.
    pub fn new(sequence_id: u32, message: Message) -> Self {
        Self {
            header: Header {
                packet_length: 0,
                request_id: message.request_id(),
                sequence_id,
            },
            message,
        }
    }

    pub fn sequence_id(&self) -> u32 {
        self.header.sequence_id
    }

    pub fn decode(raw: RawFrame) -> Result<Frame, CodecError> {
        let message = Message::decode(raw.header.request_id, raw.body)?;
        Ok(Frame {
            header: raw.header,
            message,
        })
    }

    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let body = self.message.encode_body()?;
        Ok(codec::encode_frame(
            self.message.request_id(),
            self.header.sequence_id,
            &body,
        ))
    }
}

/// Accumulates inbound bytes and yields complete frames in arrival order.
///
/// A frame is only cut once all `PacketLength` bytes are buffered, so
/// frames are never yielded partially regardless of how the stream was
/// chunked.
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
    max_packet_size: u32,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self::with_max_packet_size(MAX_PACKET_SIZE)
    }

    pub fn with_max_packet_size(max_packet_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            max_packet_size,
        }
    }

    /// Append a chunk and extract every frame it completes.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<RawFrame>, CodecError> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Cut the next complete frame from the buffer, if there is one.
    ///
    /// An implausible `PacketLength` is an error: the stream cannot be
    /// resynchronised after it, so the connection should be dropped.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, CodecError> {
        if self.buffer.len() < Header::SIZE {
            return Ok(None);
        }

        let header = Header::decode(&self.buffer[..Header::SIZE])?;
        header.validate(self.max_packet_size)?;

        let len = header.packet_length as usize;
        if self.buffer.len() < len {
            return Ok(None);
        }

        let frame = self.buffer.split_to(len).freeze();
        Ok(Some(RawFrame {
            header,
            body: frame.slice(Header::SIZE..),
        }))
    }

    /// Spare space for socket reads.
    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of buffered bytes not yet part of a yielded frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Per-session `SequenceID` allocator. Starts at 1 and wraps from
/// `0xFFFFFFFF` back to 1.
#[derive(Debug, Clone)]
pub struct SequenceIds {
    next: u32,
}

impl Default for SequenceIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl SequenceIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next = if id == u32::MAX { 1 } else { id + 1 };
        id
    }
}
