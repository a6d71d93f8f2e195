//! Wire format and shared message types of the ESB command protocol.
//!
//! Every frame on the radio link has the same shape:
//!
//! | Offset | Field        | Size |
//! |--------|--------------|------|
//! | 0      | command id   | 1    |
//! | 1      | reply code   | 1    |
//! | 2..N   | payload      | 0-30 |

#![no_std]

pub mod address;
pub mod frame;
pub mod message;

pub use address::{Address, Pipe, ADDRESS_LEN};
pub use frame::{decode, encode, Frame};
pub use message::{Message, Payload, ReplyCode};

/// Maximum size of a radio frame.
pub const FRAME_SIZE: usize = 32;

/// Command and reply code bytes.
pub const HEADER_SIZE: usize = 2;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_LEN: usize = FRAME_SIZE - HEADER_SIZE;

pub mod error {
    /// The medium ran out before the value was
    /// fully written or read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct EndOfInput;

    /// The medium held a value that cannot be
    /// represented.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Invalid;

    /// A payload did not fit in a single frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Overflow;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Error {
        EndOfInput,
        Invalid,
    }

    impl From<EndOfInput> for Error {
        fn from(_: EndOfInput) -> Self {
            Self::EndOfInput
        }
    }

    impl From<Invalid> for Error {
        fn from(_: Invalid) -> Self {
            Self::Invalid
        }
    }
}
