use esb_wire::error;

use crate::{queue::InboundSink, Address, Pipe};

/// The radio driver the protocol runs on.
///
/// Every operation reports failure synchronously; the
/// protocol never retries on its own.
pub trait Link<'q> {
    type Error;

    /// Bring up the radio.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Set the address of a pipe.
    fn set_pipeline_address(&mut self, pipe: Pipe, address: &Address) -> Result<(), Self::Error>;

    /// Listen on a pipe, handing every received
    /// frame to `listener`.
    fn start_listening(&mut self, pipe: Pipe, listener: Listener<'q>) -> Result<(), Self::Error>;

    fn stop_listening(&mut self, pipe: Pipe) -> Result<(), Self::Error>;

    fn set_rf_channel(&mut self, channel: u8) -> Result<(), Self::Error>;

    /// Send one encoded frame on a pipe.
    fn send(&mut self, pipe: Pipe, frame: &[u8]) -> Result<(), Self::Error>;
}

/// Why a received frame was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError {
    /// Shorter than the frame header.
    Truncated,
    /// Longer than a radio frame.
    Oversized,
    /// The inbound queue is full.
    QueueFull,
}

impl From<error::Error> for ReceiveError {
    fn from(value: error::Error) -> Self {
        match value {
            error::Error::EndOfInput => Self::Truncated,
            error::Error::Invalid => Self::Oversized,
        }
    }
}

/// Receive path of a listening pipe.
///
/// Handed to the driver by the engine, meant to be called
/// from the radio's interrupt or callback context.
#[derive(Clone, Copy)]
pub struct Listener<'q> {
    pipe: Pipe,
    sink: &'q (dyn InboundSink + Sync),
}

impl<'q> Listener<'q> {
    pub fn new(pipe: Pipe, sink: &'q (dyn InboundSink + Sync)) -> Self {
        Self { pipe, sink }
    }

    /// The pipe this listener serves.
    #[inline]
    pub fn pipe(&self) -> Pipe {
        self.pipe
    }

    /// Decode a received frame and queue it for the next
    /// processing tick.
    ///
    /// On error the frame is dropped; the driver may
    /// ignore the result.
    pub fn on_receive(&self, raw: &[u8]) -> Result<(), ReceiveError> {
        let mut message = esb_wire::decode(raw).map_err(|err| {
            warn!("dropped malformed frame ({} bytes)", raw.len());
            ReceiveError::from(err)
        })?;

        message.origin = Some(self.pipe);

        self.sink.push(message).map_err(|_| {
            warn!("inbound queue full, frame dropped");
            ReceiveError::QueueFull
        })
    }
}

impl core::fmt::Debug for Listener<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Listener")
            .field("pipe", &self.pipe)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    use super::*;
    use crate::{Inbound, Message};

    #[test]
    fn stamps_origin() {
        let inbound = Inbound::<CriticalSectionRawMutex, 2>::new();
        let listener = Listener::new(Pipe::Listening, &inbound);

        listener.on_receive(&[0x92, 0x00, 0x01]).unwrap();

        let message = inbound.try_receive().unwrap();
        assert_eq!(0x92, message.command);
        assert_eq!(&[0x01], message.payload.as_slice());
        assert_eq!(Some(Pipe::Listening), message.origin);
        assert!(message.address.is_unset());
    }

    #[test]
    fn drops_malformed() {
        let inbound = Inbound::<CriticalSectionRawMutex, 2>::new();
        let listener = Listener::new(Pipe::Listening, &inbound);

        assert_eq!(Err(ReceiveError::Truncated), listener.on_receive(&[0x92]));
        assert_eq!(
            Err(ReceiveError::Oversized),
            listener.on_receive(&[0; esb_wire::FRAME_SIZE + 1])
        );
        assert!(inbound.try_receive().is_err());
    }

    #[test]
    fn drops_on_full_queue() {
        let inbound = Inbound::<CriticalSectionRawMutex, 2>::new();
        let listener = Listener::new(Pipe::Listening, &inbound);

        listener.on_receive(&[0x01, 0x00]).unwrap();
        listener.on_receive(&[0x02, 0x00]).unwrap();
        assert_eq!(Err(ReceiveError::QueueFull), listener.on_receive(&[0x03, 0x00]));

        // no-overflow: the queued frames are kept
        let first: Message = inbound.try_receive().unwrap();
        assert_eq!(0x01, first.command);
        assert_eq!(0x02, inbound.try_receive().unwrap().command);
    }
}
