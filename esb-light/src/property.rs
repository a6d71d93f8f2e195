use crate::{Capabilities, Error};

/// Wire id of a property.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PropertyId {
    State = 0x00,
    Brightness = 0x01,
    Rgb = 0x02,
    Rgbw = 0x03,
    ColorTemp = 0x04,
    Hsi = 0x05,
}

impl PropertyId {
    pub const ALL: [Self; 6] = [
        Self::State,
        Self::Brightness,
        Self::Rgb,
        Self::Rgbw,
        Self::ColorTemp,
        Self::Hsi,
    ];

    /// The capability a device needs for this property.
    /// `None` for the on/off state, which every light has.
    pub const fn capability(self) -> Option<Capabilities> {
        match self {
            Self::State => None,
            Self::Brightness => Some(Capabilities::BRIGHTNESS),
            Self::Rgb => Some(Capabilities::RGB),
            Self::Rgbw => Some(Capabilities::RGBW),
            Self::ColorTemp => Some(Capabilities::TEMP),
            Self::Hsi => Some(Capabilities::HSI),
        }
    }

    /// Number of data bytes on the wire.
    pub const fn data_len(self) -> usize {
        match self {
            Self::State | Self::Brightness => 1,
            Self::ColorTemp => 2,
            Self::Rgb | Self::Hsi => 3,
            Self::Rgbw => 4,
        }
    }

    #[inline]
    pub(crate) const fn mask(self) -> u8 {
        1 << self as u8
    }
}

impl TryFrom<u8> for PropertyId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|id| *id as u8 == value)
            .ok_or(Error::InvalidArgument)
    }
}

/// A property together with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Property {
    State(bool),
    Brightness(u8),
    Rgb([u8; 3]),
    Rgbw([u8; 4]),
    /// Kelvin, little endian on the wire.
    ColorTemp(u16),
    Hsi([u8; 3]),
}

impl Property {
    pub fn id(&self) -> PropertyId {
        match self {
            Self::State(_) => PropertyId::State,
            Self::Brightness(_) => PropertyId::Brightness,
            Self::Rgb(_) => PropertyId::Rgb,
            Self::Rgbw(_) => PropertyId::Rgbw,
            Self::ColorTemp(_) => PropertyId::ColorTemp,
            Self::Hsi(_) => PropertyId::Hsi,
        }
    }

    /// Parse the data of property `id`.
    ///
    /// The data must be exactly [`PropertyId::data_len`] bytes
    /// long, and the state either 0 or 1.
    pub fn from_bytes(id: PropertyId, data: &[u8]) -> Result<Self, Error> {
        if data.len() != id.data_len() {
            Err(Error::InvalidArgument)?;
        }

        Ok(match (id, data) {
            (PropertyId::State, [0]) => Self::State(false),
            (PropertyId::State, [1]) => Self::State(true),
            (PropertyId::State, _) => Err(Error::InvalidArgument)?,
            (PropertyId::Brightness, &[brightness]) => Self::Brightness(brightness),
            (PropertyId::Rgb, &[r, g, b]) => Self::Rgb([r, g, b]),
            (PropertyId::Rgbw, &[r, g, b, w]) => Self::Rgbw([r, g, b, w]),
            (PropertyId::ColorTemp, &[lo, hi]) => Self::ColorTemp(u16::from_le_bytes([lo, hi])),
            (PropertyId::Hsi, &[h, s, i]) => Self::Hsi([h, s, i]),
            _ => Err(Error::InvalidArgument)?,
        })
    }

    pub fn to_bytes(&self) -> heapless::Vec<u8, 4> {
        let mut buf = [0u8; 4];

        let data: &[u8] = match self {
            Self::State(on) => {
                buf[0] = *on as u8;
                &buf[..1]
            }
            Self::Brightness(brightness) => {
                buf[0] = *brightness;
                &buf[..1]
            }
            Self::Rgb(rgb) | Self::Hsi(rgb) => rgb,
            Self::Rgbw(rgbw) => rgbw,
            Self::ColorTemp(kelvin) => {
                buf[..2].copy_from_slice(&kelvin.to_le_bytes());
                &buf[..2]
            }
        };

        // SAFETY: no property carries more than four bytes
        unsafe { heapless::Vec::from_slice(data).unwrap_unchecked() }
    }
}
