//! A dimmable and optionally colored light.
//!
//! [`Light`] keeps the value of every property and forwards
//! changes to the hardware through a [`LightDriver`]. Which
//! properties a device has is decided by its [`Capabilities`];
//! the others are answered with `NOT_SUPPORTED`.

#![no_std]

pub mod property;

use core::ops::BitOr;

use esb_protocol::{
    registry::{CommandEntry, Context, PayloadLength},
    warn,
    wire::error::Overflow,
    Address, Application, Message, Outbox, ReplyCode,
};

pub use property::{Property, PropertyId};

pub mod id {
    pub const SET_STATE: u8 = 0xa0;
    pub const SET_BRIGHTNESS: u8 = 0xa1;
    pub const SET_RGB: u8 = 0xa2;
    pub const SET_RGBW: u8 = 0xa3;
    pub const SET_HSI: u8 = 0xa4;
    pub const SET_COLOR_TEMP: u8 = 0xa5;
    /// Payload: `[property id]`, answer: property data.
    pub const GET_PROPERTY: u8 = 0xa6;
    /// Property change notification, sent to the central.
    pub const NOTIFICATION: u8 = 0xaf;
}

/// Number of entries in the command table.
pub const COMMAND_COUNT: usize = 7;

pub mod error {
    /// The light hardware rejected a change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct DriverError;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The device lacks the capability for this property.
    NotSupported,
    /// Unknown property id or malformed property data.
    InvalidArgument,
    /// The driver failed to apply a change.
    Driver,
    Protocol(esb_protocol::Error),
}

impl From<error::DriverError> for Error {
    fn from(_: error::DriverError) -> Self {
        Self::Driver
    }
}

impl From<esb_protocol::Error> for Error {
    fn from(value: esb_protocol::Error) -> Self {
        Self::Protocol(value)
    }
}

impl From<Overflow> for Error {
    fn from(_: Overflow) -> Self {
        Self::InvalidArgument
    }
}

/// Light sources a device has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities(pub u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const RGB: Self = Self(0x01);
    pub const RGBW: Self = Self(0x02);
    /// Separate warm and cold white sources.
    pub const TEMP: Self = Self(0x04);
    pub const HSI: Self = Self(0x08);
    pub const BRIGHTNESS: Self = Self(0x10);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The hardware side of a light.
///
/// Every method defaults to accepting the change without
/// doing anything.
pub trait LightDriver {
    fn set_state(&mut self, _on: bool) -> Result<(), error::DriverError> {
        Ok(())
    }

    fn set_brightness(&mut self, _brightness: u8) -> Result<(), error::DriverError> {
        Ok(())
    }

    fn set_rgb(&mut self, _r: u8, _g: u8, _b: u8) -> Result<(), error::DriverError> {
        Ok(())
    }

    fn set_rgbw(&mut self, _r: u8, _g: u8, _b: u8, _w: u8) -> Result<(), error::DriverError> {
        Ok(())
    }

    /// Color temperature in kelvin.
    fn set_color_temp(&mut self, _kelvin: u16) -> Result<(), error::DriverError> {
        Ok(())
    }

    fn set_hsi(&mut self, _h: u8, _s: u8, _i: u8) -> Result<(), error::DriverError> {
        Ok(())
    }
}

impl LightDriver for () {}

/// Current value of every property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightState {
    pub on: bool,
    pub brightness: u8,
    pub rgb: [u8; 3],
    pub rgbw: [u8; 4],
    pub color_temp: u16,
    pub hsi: [u8; 3],
}

pub struct Light<D> {
    peripheral: Address,
    central: Address,
    capabilities: Capabilities,
    state: LightState,
    /// One bit per property id.
    changed: u8,
    driver: D,
}

impl<D: LightDriver> Light<D> {
    pub fn new(peripheral: Address, capabilities: Capabilities, driver: D) -> Self {
        Self {
            peripheral,
            central: Address::UNSET,
            capabilities,
            state: LightState::default(),
            changed: 0,
            driver,
        }
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn state(&self) -> &LightState {
        &self.state
    }

    #[inline]
    pub fn central_address(&self) -> Address {
        self.central
    }

    /// Set the central notifications are sent to.
    pub fn set_central_address(&mut self, central: Address) {
        self.central = central;
    }

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn supports(&self, prop: PropertyId) -> bool {
        prop.capability()
            .map_or(true, |capability| self.capabilities.contains(capability))
    }

    /// Apply a property through the driver and store it.
    ///
    /// The stored value is left untouched when the driver fails.
    pub fn set_property(&mut self, property: Property) -> Result<(), Error> {
        let prop = property.id();

        if !self.supports(prop) {
            Err(Error::NotSupported)?;
        }

        let applied = match property {
            Property::State(on) => self.driver.set_state(on),
            Property::Brightness(brightness) => self.driver.set_brightness(brightness),
            Property::Rgb([r, g, b]) => self.driver.set_rgb(r, g, b),
            Property::Rgbw([r, g, b, w]) => self.driver.set_rgbw(r, g, b, w),
            Property::ColorTemp(kelvin) => self.driver.set_color_temp(kelvin),
            Property::Hsi([h, s, i]) => self.driver.set_hsi(h, s, i),
        };

        applied.map_err(|err| {
            warn!("driver rejected property {}", prop as u8);
            Error::from(err)
        })?;

        match property {
            Property::State(on) => self.state.on = on,
            Property::Brightness(brightness) => self.state.brightness = brightness,
            Property::Rgb(rgb) => self.state.rgb = rgb,
            Property::Rgbw(rgbw) => self.state.rgbw = rgbw,
            Property::ColorTemp(kelvin) => self.state.color_temp = kelvin,
            Property::Hsi(hsi) => self.state.hsi = hsi,
        }
        self.changed |= prop.mask();

        Ok(())
    }

    pub fn property(&self, prop: PropertyId) -> Result<Property, Error> {
        if !self.supports(prop) {
            Err(Error::NotSupported)?;
        }

        Ok(match prop {
            PropertyId::State => Property::State(self.state.on),
            PropertyId::Brightness => Property::Brightness(self.state.brightness),
            PropertyId::Rgb => Property::Rgb(self.state.rgb),
            PropertyId::Rgbw => Property::Rgbw(self.state.rgbw),
            PropertyId::ColorTemp => Property::ColorTemp(self.state.color_temp),
            PropertyId::Hsi => Property::Hsi(self.state.hsi),
        })
    }

    /// Whether any property waits to be published.
    #[inline]
    pub fn has_changes(&self) -> bool {
        self.changed != 0
    }

    /// Send the current value of a property to the central.
    pub fn notify_property(&mut self, prop: PropertyId, outbox: &mut impl Outbox) -> Result<(), Error> {
        if self.central.is_unset() || self.peripheral.is_unset() {
            Err(esb_protocol::Error::NotInitialized)?;
        }

        let property = self.property(prop)?;

        let mut notification = Message::new(id::NOTIFICATION).addressed_to(self.central);
        notification.set_payload(self.peripheral.as_bytes())?;
        notification
            .payload
            .push(prop as u8)
            .map_err(|_| Error::InvalidArgument)?;
        notification
            .payload
            .extend_from_slice(&property.to_bytes())
            .map_err(|_| Error::InvalidArgument)?;

        outbox.enqueue_outbound(notification)?;
        self.changed &= !prop.mask();

        Ok(())
    }

    /// Notify every changed property, in property id order.
    ///
    /// Stops at the first failure; properties not yet
    /// notified stay marked.
    pub fn publish(&mut self, outbox: &mut impl Outbox) -> Result<(), Error> {
        for prop in PropertyId::ALL {
            if self.changed & prop.mask() != 0 {
                self.notify_property(prop, outbox)?;
            }
        }

        Ok(())
    }
}

impl<D> AsMut<Light<D>> for Light<D> {
    fn as_mut(&mut self) -> &mut Light<D> {
        self
    }
}

/// The bonded central receives the notifications.
impl<D: LightDriver> Application for Light<D> {
    fn on_bond(&mut self, peer: Address) {
        self.set_central_address(peer);
    }

    fn on_unbond(&mut self) {
        self.set_central_address(Address::UNSET);
    }
}

/// The commands of a light, for any host application owning one.
pub fn command_table<C, D>() -> [CommandEntry<C>; COMMAND_COUNT]
where
    C: AsMut<Light<D>>,
    D: LightDriver,
{
    [
        CommandEntry::new(id::SET_STATE, PayloadLength::Exact(1), set::<C, D, 0x00>),
        CommandEntry::new(id::SET_BRIGHTNESS, PayloadLength::Exact(1), set::<C, D, 0x01>),
        CommandEntry::new(id::SET_RGB, PayloadLength::Exact(3), set::<C, D, 0x02>),
        CommandEntry::new(id::SET_RGBW, PayloadLength::Exact(4), set::<C, D, 0x03>),
        CommandEntry::new(id::SET_HSI, PayloadLength::Exact(3), set::<C, D, 0x05>),
        CommandEntry::new(id::SET_COLOR_TEMP, PayloadLength::Exact(2), set::<C, D, 0x04>),
        CommandEntry::new(id::GET_PROPERTY, PayloadLength::Exact(1), get::<C, D>),
    ]
}

fn reply_code(err: Error) -> ReplyCode {
    match err {
        Error::NotSupported => ReplyCode::NOT_SUPPORTED,
        Error::Driver => ReplyCode::API,
        Error::InvalidArgument | Error::Protocol(_) => ReplyCode::PARAM,
    }
}

/// Sets the property with id `P` from the payload.
fn set<C, D, const P: u8>(ctx: &mut Context<'_, C>, request: &Message, answer: &mut Message)
where
    C: AsMut<Light<D>>,
    D: LightDriver,
{
    let applied = PropertyId::try_from(P)
        .and_then(|prop| Property::from_bytes(prop, &request.payload))
        .and_then(|property| ctx.app.as_mut().set_property(property));

    if let Err(err) = applied {
        answer.reply = reply_code(err);
    }
}

fn get<C, D>(ctx: &mut Context<'_, C>, request: &Message, answer: &mut Message)
where
    C: AsMut<Light<D>>,
    D: LightDriver,
{
    let [prop] = request.payload[..] else {
        answer.reply = ReplyCode::SIZE;
        return;
    };

    let property = PropertyId::try_from(prop)
        .and_then(|prop| ctx.app.as_mut().property(prop));

    match property {
        Ok(property) => {
            if answer.set_payload(&property.to_bytes()).is_err() {
                answer.reply = ReplyCode::SIZE;
            }
        }
        Err(err) => answer.reply = reply_code(err),
    }
}

#[cfg(test)]
mod tests {
    use esb_protocol::common::Device;

    use super::*;

    const PERIPHERAL: Address = Address::new([0xe7, 0xe7, 0xe7, 0xe7, 0x0a]);
    const CENTRAL: Address = Address::new([0xc2, 0xc2, 0xc2, 0xc2, 0x01]);

    /// Records what reached the hardware.
    #[derive(Default)]
    struct Leds {
        on: Option<bool>,
        rgb: Option<[u8; 3]>,
        kelvin: Option<u16>,
        broken: bool,
    }

    impl LightDriver for Leds {
        fn set_state(&mut self, on: bool) -> Result<(), error::DriverError> {
            if self.broken {
                Err(error::DriverError)?;
            }

            self.on = Some(on);
            Ok(())
        }

        fn set_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<(), error::DriverError> {
            self.rgb = Some([r, g, b]);
            Ok(())
        }

        fn set_color_temp(&mut self, kelvin: u16) -> Result<(), error::DriverError> {
            self.kelvin = Some(kelvin);
            Ok(())
        }
    }

    struct Recorder {
        sent: heapless::Vec<Message, 8>,
        capacity: usize,
    }

    impl Recorder {
        fn new(capacity: usize) -> Self {
            Self {
                sent: heapless::Vec::new(),
                capacity,
            }
        }
    }

    impl Outbox for Recorder {
        fn enqueue_outbound(&mut self, message: Message) -> Result<(), esb_protocol::Error> {
            if self.sent.len() >= self.capacity {
                Err(esb_protocol::Error::QueueFull)?;
            }

            self.sent
                .push(message)
                .map_err(|_| esb_protocol::Error::QueueFull)
        }
    }

    fn light() -> Light<Leds> {
        let mut light = Light::new(
            PERIPHERAL,
            Capabilities::RGB | Capabilities::TEMP,
            Leds::default(),
        );
        light.set_central_address(CENTRAL);
        light
    }

    fn run(light: &mut Light<Leds>, request: &[u8]) -> Message {
        let request = Message::with_payload(request[0], &request[1..]).unwrap();
        let table = command_table::<Light<Leds>, Leds>();
        let entry = table
            .iter()
            .find(|entry| entry.id == request.command)
            .unwrap();
        assert!(entry.length.accepts(request.payload_len()));

        call(light, entry, &request)
    }

    /// Invoke a handler directly, without the length check of the registry.
    fn call(light: &mut Light<Leds>, entry: &CommandEntry<Light<Leds>>, request: &Message) -> Message {
        let mut device = Device::default();
        let mut ctx = Context {
            app: light,
            device: &mut device,
        };
        let mut answer = Message::new(request.command);
        (entry.handler)(&mut ctx, request, &mut answer);

        answer
    }

    mod properties {
        use super::*;

        #[test]
        fn set_supported() {
            let mut light = light();

            light.set_property(Property::Rgb([1, 2, 3])).unwrap();
            light.set_property(Property::State(true)).unwrap();

            assert_eq!(Some([1, 2, 3]), light.driver().rgb);
            assert_eq!(Some(true), light.driver().on);
            assert_eq!(Ok(Property::Rgb([1, 2, 3])), light.property(PropertyId::Rgb));
            assert!(light.has_changes());
        }

        #[test]
        fn not_supported() {
            let mut light = light();

            assert_eq!(
                Err(Error::NotSupported),
                light.set_property(Property::Brightness(10))
            );
            assert_eq!(
                Err(Error::NotSupported),
                light.property(PropertyId::Hsi)
            );
            assert!(!light.has_changes());
        }

        #[test]
        fn state_always_supported() {
            let light = Light::new(PERIPHERAL, Capabilities::NONE, ());

            assert!(light.supports(PropertyId::State));
            assert!(!light.supports(PropertyId::Rgbw));
        }

        #[test]
        fn driver_failure() {
            let mut light = light();
            light.driver_mut().broken = true;

            assert_eq!(Err(Error::Driver), light.set_property(Property::State(true)));
            assert!(!light.state().on);
            assert!(!light.has_changes());
        }
    }

    mod notify {
        use super::*;

        #[test]
        fn property() {
            let mut light = light();
            let mut outbox = Recorder::new(8);

            light.set_property(Property::ColorTemp(2700)).unwrap();
            light.notify_property(PropertyId::ColorTemp, &mut outbox).unwrap();

            let notification = &outbox.sent[0];
            assert_eq!(id::NOTIFICATION, notification.command);
            assert_eq!(CENTRAL, notification.address);
            assert_eq!(
                &[0xe7, 0xe7, 0xe7, 0xe7, 0x0a, 0x04, 0x8c, 0x0a],
                notification.payload.as_slice()
            );
            assert!(!light.has_changes());
        }

        #[test]
        fn without_central() {
            let mut light = Light::new(PERIPHERAL, Capabilities::RGB, ());
            let mut outbox = Recorder::new(8);

            assert_eq!(
                Err(Error::Protocol(esb_protocol::Error::NotInitialized)),
                light.notify_property(PropertyId::State, &mut outbox)
            );
            assert!(outbox.sent.is_empty());
        }

        #[test]
        fn publish_changes_only() {
            let mut light = light();
            let mut outbox = Recorder::new(8);

            light.set_property(Property::Rgb([9, 9, 9])).unwrap();
            light.set_property(Property::State(true)).unwrap();
            light.publish(&mut outbox).unwrap();

            let ids: heapless::Vec<u8, 8> = outbox.sent.iter().map(|m| m.payload[5]).collect();
            assert_eq!(&[0x00, 0x02], ids.as_slice());

            light.publish(&mut outbox).unwrap();
            assert_eq!(2, outbox.sent.len());
        }

        #[test]
        fn publish_resumes_after_queue_full() {
            let mut light = light();
            let mut outbox = Recorder::new(1);

            light.set_property(Property::State(true)).unwrap();
            light.set_property(Property::ColorTemp(4000)).unwrap();

            assert_eq!(
                Err(Error::Protocol(esb_protocol::Error::QueueFull)),
                light.publish(&mut outbox)
            );
            assert!(light.has_changes());

            outbox.capacity = 8;
            light.publish(&mut outbox).unwrap();

            assert_eq!(2, outbox.sent.len());
            assert_eq!(0x04, outbox.sent[1].payload[5]);
            assert!(!light.has_changes());
        }
    }

    mod commands {
        use super::*;

        #[test]
        fn short_payload() {
            let mut light = light();
            let table = command_table::<Light<Leds>, Leds>();

            for entry in &table {
                let answer = call(&mut light, entry, &Message::new(entry.id));
                assert_ne!(ReplyCode::OK, answer.reply);
            }

            let get = table.last().unwrap();
            assert_eq!(id::GET_PROPERTY, get.id);
            assert_eq!(
                ReplyCode::SIZE,
                call(&mut light, get, &Message::new(id::GET_PROPERTY)).reply
            );
            assert!(!light.has_changes());
        }

        #[test]
        fn set_state() {
            let mut light = light();

            let answer = run(&mut light, &[id::SET_STATE, 1]);

            assert_eq!(ReplyCode::OK, answer.reply);
            assert!(light.state().on);
        }

        #[test]
        fn set_state_invalid() {
            let mut light = light();

            let answer = run(&mut light, &[id::SET_STATE, 2]);

            assert_eq!(ReplyCode::PARAM, answer.reply);
            assert!(!light.state().on);
        }

        #[test]
        fn set_color_temp() {
            let mut light = light();

            let answer = run(&mut light, &[id::SET_COLOR_TEMP, 0x98, 0x3a]);

            assert_eq!(ReplyCode::OK, answer.reply);
            assert_eq!(Some(15000), light.driver().kelvin);
        }

        #[test]
        fn set_unsupported() {
            let mut light = light();

            let answer = run(&mut light, &[id::SET_HSI, 1, 2, 3]);
            assert_eq!(ReplyCode::NOT_SUPPORTED, answer.reply);

            let answer = run(&mut light, &[id::SET_BRIGHTNESS, 100]);
            assert_eq!(ReplyCode::NOT_SUPPORTED, answer.reply);
        }

        #[test]
        fn driver_failure() {
            let mut light = light();
            light.driver_mut().broken = true;

            let answer = run(&mut light, &[id::SET_STATE, 1]);

            assert_eq!(ReplyCode::API, answer.reply);
        }

        #[test]
        fn get() {
            let mut light = light();
            light.set_property(Property::Rgb([10, 20, 30])).unwrap();

            let answer = run(&mut light, &[id::GET_PROPERTY, 0x02]);
            assert_eq!(ReplyCode::OK, answer.reply);
            assert_eq!(&[10, 20, 30], answer.payload.as_slice());

            let answer = run(&mut light, &[id::GET_PROPERTY, 0x03]);
            assert_eq!(ReplyCode::NOT_SUPPORTED, answer.reply);

            let answer = run(&mut light, &[id::GET_PROPERTY, 0x06]);
            assert_eq!(ReplyCode::PARAM, answer.reply);
        }
    }
}
