use crate::{error, Address, Pipe, MAX_PAYLOAD_LEN};

/// Bounded payload storage of a message.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// The error byte of a frame.
///
/// Any byte may appear on the wire, the associated
/// constants are the values the protocol assigns
/// a meaning to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReplyCode(pub u8);

impl ReplyCode {
    pub const OK: Self = Self(0x00);
    /// Invalid payload length.
    pub const SIZE: Self = Self(0x01);
    /// Unknown command, or a known command with the wrong payload length.
    pub const UNKNOWN_COMMAND: Self = Self(0x02);
    /// An application API call failed.
    pub const API: Self = Self(0x03);
    /// Invalid parameter.
    pub const PARAM: Self = Self(0x04);
    /// The device lacks the capability the command needs.
    pub const NOT_SUPPORTED: Self = Self(0x05);
    /// Set on an answer to suppress the reply.
    pub const NONE: Self = Self(0xff);

    #[inline]
    pub fn is_suppressed(&self) -> bool {
        *self == Self::NONE
    }
}

/// A logical protocol message.
///
/// `address` and `origin` never go on the wire: the
/// address selects the peer of an outbound message, the
/// origin records the pipe an inbound message arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    pub address: Address,
    pub origin: Option<Pipe>,
    pub command: u8,
    pub reply: ReplyCode,
    pub payload: Payload,
}

impl Message {
    /// Create a message with an empty payload.
    pub const fn new(command: u8) -> Self {
        Self {
            address: Address::UNSET,
            origin: None,
            command,
            reply: ReplyCode::OK,
            payload: Payload::new(),
        }
    }

    /// Create a message carrying a copy of `payload`.
    pub fn with_payload(command: u8, payload: &[u8]) -> Result<Self, error::Overflow> {
        let mut message = Self::new(command);
        message.set_payload(payload)?;

        Ok(message)
    }

    /// Set the peer this message will be sent to.
    #[must_use]
    pub fn addressed_to(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Replace the payload with a copy of `payload`.
    ///
    /// The payload is left untouched on failure.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), error::Overflow> {
        if payload.len() > MAX_PAYLOAD_LEN {
            Err(error::Overflow)?;
        }

        self.payload.clear();
        // length checked above
        self.payload
            .extend_from_slice(payload)
            .map_err(|_| error::Overflow)
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Write the on-wire representation of the message,
    /// returning the number of bytes written.
    pub fn serialize_iter<'a>(
        &self,
        dst: impl IntoIterator<Item = &'a mut u8>,
    ) -> Result<usize, error::EndOfInput> {
        let mut dst = dst.into_iter();

        *dst.next().ok_or(error::EndOfInput)? = self.command;
        *dst.next().ok_or(error::EndOfInput)? = self.reply.0;

        for &byte in &self.payload {
            *dst.next().ok_or(error::EndOfInput)? = byte;
        }

        Ok(crate::HEADER_SIZE + self.payload.len())
    }

    /// Read a message from its on-wire representation.
    ///
    /// Every remaining byte of `src` is taken as payload.
    pub fn deserialize_iter<'a>(
        src: impl IntoIterator<Item = &'a u8>,
    ) -> Result<Self, error::Error> {
        let mut src = src.into_iter();

        let mut message = Self::new(*src.next().ok_or(error::EndOfInput)?);
        message.reply = ReplyCode(*src.next().ok_or(error::EndOfInput)?);

        for &byte in src {
            // more than one frame worth of bytes
            message.payload.push(byte).map_err(|_| error::Invalid)?;
        }

        Ok(message)
    }
}
