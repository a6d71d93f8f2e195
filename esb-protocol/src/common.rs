//! Commands every device answers, independent of
//! the applications it runs.

use crate::{
    registry::{CommandEntry, Context, PayloadLength},
    Address, Message, ReplyCode,
};

pub mod id {
    /// Get firmware version.
    pub const VERSION: u8 = 0x10;
    /// Bond with a central, or delete the bond with the zero address.
    pub const BOND: u8 = 0x11;
    /// Set a configuration item. Reserved.
    pub const CONFIG_SET: u8 = 0x21;
    /// Get a configuration item. Reserved.
    pub const CONFIG_GET: u8 = 0x22;
}

/// Number of entries in the common command table.
pub const COMMAND_COUNT: usize = 4;

/// Hooks the protocol calls into the host application.
///
/// Every hook defaults to doing nothing.
pub trait Application {
    /// A central bonded with this device.
    fn on_bond(&mut self, _peer: Address) {}

    /// The bond was deleted.
    fn on_unbond(&mut self) {}
}

impl Application for () {}

/// Firmware version reported by the version command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 3] {
        [self.major, self.minor, self.patch]
    }
}

/// Protocol-owned device state.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Device {
    version: Version,
    bonded_peer: Option<Address>,
}

impl Device {
    pub const fn new(version: Version) -> Self {
        Self {
            version,
            bonded_peer: None,
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// The central this device is bonded with, if any.
    #[inline]
    pub fn bonded_peer(&self) -> Option<Address> {
        self.bonded_peer
    }
}

/// The common command table, always in slot 0 of the registry.
pub fn command_table<C: Application>() -> [CommandEntry<C>; COMMAND_COUNT] {
    [
        CommandEntry::new(id::VERSION, PayloadLength::Exact(0), get_version::<C>),
        CommandEntry::new(id::BOND, PayloadLength::Exact(5), bond::<C>),
        CommandEntry::new(id::CONFIG_SET, PayloadLength::Dynamic, unsupported::<C>),
        CommandEntry::new(id::CONFIG_GET, PayloadLength::Exact(1), unsupported::<C>),
    ]
}

/// Replies `[major, minor, patch]`.
fn get_version<C>(ctx: &mut Context<'_, C>, _request: &Message, answer: &mut Message) {
    // three bytes always fit
    if answer.set_payload(&ctx.device.version.to_bytes()).is_err() {
        answer.reply = ReplyCode::SIZE;
    }
}

/// Payload: peer address (5 bytes). The zero address deletes the bond.
fn bond<C: Application>(ctx: &mut Context<'_, C>, request: &Message, answer: &mut Message) {
    let Ok(peer) = Address::deserialize_iter(&request.payload) else {
        answer.reply = ReplyCode::SIZE;
        return;
    };

    if peer.is_unset() {
        info!("bond deleted");
        ctx.device.bonded_peer = None;
        ctx.app.on_unbond();
    } else {
        info!("bonded with {:?}", peer);
        ctx.device.bonded_peer = Some(peer);
        ctx.app.on_bond(peer);
    }
}

/// Configuration items are reserved and answered
/// like an unknown command.
fn unsupported<C>(_ctx: &mut Context<'_, C>, _request: &Message, answer: &mut Message) {
    answer.reply = ReplyCode::UNKNOWN_COMMAND;
}
