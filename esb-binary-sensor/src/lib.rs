//! A device reporting `N` binary channels, such as
//! contacts or motion detectors, to its central.
//!
//! Channel changes are recorded locally and sent as
//! notifications on [`BinarySensor::publish`]. The central can
//! read and write channels with the commands of
//! [`command_table`].

#![no_std]

use esb_protocol::{
    debug,
    registry::{CommandEntry, Context, PayloadLength},
    Address, Application, Error, Message, Outbox, ReplyCode,
};

pub mod id {
    /// Channel change notification, sent to the central.
    pub const NOTIFICATION: u8 = 0x91;
    /// Get a channel value.
    pub const GET_CHANNEL: u8 = 0x92;
    /// Set a channel value.
    pub const SET_CHANNEL: u8 = 0x93;
}

/// Number of entries in the command table.
pub const COMMAND_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Channel {
    value: bool,
    /// Changed since it was last published.
    changed: bool,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BinarySensor<const N: usize = 1> {
    peripheral: Address,
    central: Address,
    channels: [Channel; N],
}

impl<const N: usize> BinarySensor<N> {
    /// Channel indices are single bytes on the wire.
    const CHANNELS_FIT: () = assert!(N <= u8::MAX as usize + 1, "at most 256 channels");

    pub const fn new(peripheral: Address) -> Self {
        let () = Self::CHANNELS_FIT;

        Self {
            peripheral,
            central: Address::UNSET,
            channels: [Channel {
                value: false,
                changed: false,
            }; N],
        }
    }

    #[inline]
    pub fn peripheral_address(&self) -> Address {
        self.peripheral
    }

    #[inline]
    pub fn central_address(&self) -> Address {
        self.central
    }

    /// Set the central notifications are sent to.
    pub fn set_central_address(&mut self, central: Address) {
        self.central = central;
    }

    /// Set a channel, marking it for the next publish
    /// if the value changed.
    pub fn set_channel(&mut self, index: u8, value: bool) -> Result<(), Error> {
        let channel = self
            .channels
            .get_mut(usize::from(index))
            .ok_or(Error::InvalidArgument)?;

        if channel.value != value {
            channel.value = value;
            channel.changed = true;
        }

        Ok(())
    }

    pub fn get_channel(&self, index: u8) -> Result<bool, Error> {
        self.channels
            .get(usize::from(index))
            .map(|channel| channel.value)
            .ok_or(Error::InvalidArgument)
    }

    /// Whether any channel waits to be published.
    pub fn has_changes(&self) -> bool {
        self.channels.iter().any(|channel| channel.changed)
    }

    /// Send a notification for every changed channel.
    ///
    /// A channel stays marked until its notification is queued,
    /// so after a [`Error::QueueFull`] the next publish picks up
    /// where this one stopped.
    pub fn publish(&mut self, outbox: &mut impl Outbox) -> Result<(), Error> {
        if self.central.is_unset() || self.peripheral.is_unset() {
            Err(Error::NotInitialized)?;
        }

        for (index, channel) in self.channels.iter_mut().enumerate() {
            if !channel.changed {
                continue;
            }

            // `new` bounds `N` to the byte range
            let index = index as u8;

            let mut notification = Message::new(id::NOTIFICATION).addressed_to(self.central);
            notification.set_payload(self.peripheral.as_bytes())?;
            notification
                .payload
                .extend_from_slice(&[index, channel.value as u8])
                .map_err(|_| Error::InvalidArgument)?;

            outbox.enqueue_outbound(notification).map_err(|err| {
                debug!("channel {} publish deferred", index);
                err
            })?;

            channel.changed = false;
        }

        Ok(())
    }
}

impl<const N: usize> AsMut<BinarySensor<N>> for BinarySensor<N> {
    fn as_mut(&mut self) -> &mut BinarySensor<N> {
        self
    }
}

/// The bonded central receives the notifications.
impl<const N: usize> Application for BinarySensor<N> {
    fn on_bond(&mut self, peer: Address) {
        self.set_central_address(peer);
    }

    fn on_unbond(&mut self) {
        self.set_central_address(Address::UNSET);
    }
}

/// The commands of a binary sensor, for any host
/// application owning one.
pub fn command_table<C: AsMut<BinarySensor<N>>, const N: usize>() -> [CommandEntry<C>; COMMAND_COUNT] {
    [
        CommandEntry::new(id::GET_CHANNEL, PayloadLength::Exact(1), get_channel::<C, N>),
        CommandEntry::new(id::SET_CHANNEL, PayloadLength::Exact(2), set_channel::<C, N>),
    ]
}

/// Payload: `[index]`, answer: `[value]`.
fn get_channel<C: AsMut<BinarySensor<N>>, const N: usize>(
    ctx: &mut Context<'_, C>,
    request: &Message,
    answer: &mut Message,
) {
    let [index] = request.payload[..] else {
        answer.reply = ReplyCode::SIZE;
        return;
    };

    let Ok(value) = ctx.app.as_mut().get_channel(index) else {
        answer.reply = ReplyCode::PARAM;
        return;
    };

    if answer.set_payload(&[value as u8]).is_err() {
        answer.reply = ReplyCode::SIZE;
    }
}

/// Payload: `[index, value]`, where value is 0 or 1.
fn set_channel<C: AsMut<BinarySensor<N>>, const N: usize>(
    ctx: &mut Context<'_, C>,
    request: &Message,
    answer: &mut Message,
) {
    let [index, value] = request.payload[..] else {
        answer.reply = ReplyCode::SIZE;
        return;
    };

    let value = match value {
        0 => false,
        1 => true,
        _ => {
            answer.reply = ReplyCode::PARAM;
            return;
        }
    };

    if ctx.app.as_mut().set_channel(index, value).is_err() {
        answer.reply = ReplyCode::PARAM;
    }
}
