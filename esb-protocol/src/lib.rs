//! Command dispatch and request/reply processing
//! for ESB peripherals.
//!
//! Frames arrive from the radio through a [`Listener`] into
//! the inbound queue. Each [`Engine::process`] tick dispatches
//! queued requests through the [`Registry`], sends the replies
//! and then flushes messages the applications enqueued.

#![no_std]

mod fmt;

pub mod common;
pub mod engine;
pub mod link;
pub mod queue;
pub mod registry;

pub use common::{Application, Device, Version};
pub use engine::{Config, Engine, Outbox, State, Stats};
pub use link::{Link, Listener, ReceiveError};
pub use queue::{Inbound, InboundSink, MessageQueue};
pub use registry::{CommandEntry, Context, Handler, PayloadLength, Registry};

pub use esb_wire as wire;
pub use esb_wire::{Address, Message, Pipe, ReplyCode};

/// Default capacity of the inbound and outbound queues.
pub const QUEUE_CAPACITY: usize = 5;

/// Default number of application command tables.
pub const APP_TABLE_CAPACITY: usize = 3;

pub mod error {
    /// A push against a full queue.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct QueueFull;
}

/// Errors returned to callers of the protocol layer.
///
/// Failures of individual requests never show up here,
/// they are answered over the link instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The engine has not been initialized.
    NotInitialized,
    /// Required data is missing or out of range.
    InvalidArgument,
    /// Every application table slot is taken.
    CapacityExceeded,
    /// The entry count does not describe the table.
    MalformedTable,
    /// The link driver reported a failure.
    Hardware,
    /// The outbound queue is full.
    QueueFull,
}

impl From<error::QueueFull> for Error {
    fn from(_: error::QueueFull) -> Self {
        Self::QueueFull
    }
}

impl From<wire::error::Overflow> for Error {
    fn from(_: wire::error::Overflow) -> Self {
        Self::InvalidArgument
    }
}
