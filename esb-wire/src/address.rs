use fill_array::fill;

use crate::error;

/// Length of a pipe address in bytes.
pub const ADDRESS_LEN: usize = 5;

/// A radio pipe address.
///
/// The all-zero address is never assigned
/// to a device and means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const UNSET: Self = Self([0; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Determines whether the address
    /// is the all-zero placeholder.
    #[inline]
    pub fn is_unset(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Write the address to a medium via an iterator.
    pub fn serialize_iter<'a>(
        &self,
        dst: impl IntoIterator<Item = &'a mut u8>,
    ) -> Result<(), error::EndOfInput> {
        let mut dst = dst.into_iter();

        for byte in self.0 {
            *dst.next().ok_or(error::EndOfInput)? = byte;
        }

        Ok(())
    }

    /// Read an address from a medium via an iterator.
    pub fn deserialize_iter<'a>(
        src: impl IntoIterator<Item = &'a u8>,
    ) -> Result<Self, error::EndOfInput> {
        let mut src = src.into_iter();

        // all byte values are valid address bytes
        let bytes = fill![*src.next().ok_or(error::EndOfInput)?; 5];

        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(value: [u8; ADDRESS_LEN]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The two radio pipes used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Pipe {
    /// Outbound notifications, addressed per message.
    Send = 0,
    /// Incoming requests and their replies.
    Listening = 1,
}

impl Pipe {
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset() {
        assert!(Address::UNSET.is_unset());
        assert!(Address::default().is_unset());
        assert!(!Address::new([0, 0, 0, 0, 1]).is_unset());
    }

    #[test]
    fn iter() {
        let addr = Address::new([0xe7, 0xe7, 0xe7, 0xe7, 0x01]);
        let mut buf = [0u8; 6];

        addr.serialize_iter(buf.iter_mut()).unwrap();
        assert_eq!([0xe7, 0xe7, 0xe7, 0xe7, 0x01, 0x00], buf);

        assert_eq!(addr, Address::deserialize_iter(buf.iter()).unwrap());
    }

    #[test]
    fn short() {
        let buf = [0xe7u8; 4];

        assert_eq!(
            Err(error::EndOfInput),
            Address::deserialize_iter(buf.iter())
        );

        let mut buf = [0u8; 4];

        assert!(Address::new([1; 5]).serialize_iter(buf.iter_mut()).is_err());
    }
}
