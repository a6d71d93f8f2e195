use crate::{error, Message, FRAME_SIZE, HEADER_SIZE};

/// An encoded message, ready for the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    buf: [u8; FRAME_SIZE],
    len: usize,
}

impl Frame {
    /// Copy raw radio bytes into a frame.
    ///
    /// Fails for anything shorter than the header
    /// or longer than a radio frame.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, error::Error> {
        if raw.len() < HEADER_SIZE {
            Err(error::EndOfInput)?;
        }

        if raw.len() > FRAME_SIZE {
            Err(error::Invalid)?;
        }

        let mut buf = [0; FRAME_SIZE];
        buf[..raw.len()].copy_from_slice(raw);

        Ok(Self {
            buf,
            len: raw.len(),
        })
    }

    /// The populated region of the frame.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// A frame always holds at least the header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn command(&self) -> u8 {
        self.buf[0]
    }
}

impl From<&Message> for Frame {
    fn from(message: &Message) -> Self {
        let mut buf = [0; FRAME_SIZE];

        // SAFETY: a frame always fits the header plus
        // the largest payload a `Message` can hold
        let len = unsafe { message.serialize_iter(buf.iter_mut()).unwrap_unchecked() };

        Self { buf, len }
    }
}

/// Pack a message into a wire frame.
#[inline]
pub fn encode(message: &Message) -> Frame {
    Frame::from(message)
}

/// Unpack a message from raw radio bytes.
///
/// Truncated frames fail with [`error::Error::EndOfInput`],
/// frames longer than [`FRAME_SIZE`] with [`error::Error::Invalid`].
pub fn decode(raw: &[u8]) -> Result<Message, error::Error> {
    if raw.len() > FRAME_SIZE {
        Err(error::Invalid)?;
    }

    Message::deserialize_iter(raw)
}
