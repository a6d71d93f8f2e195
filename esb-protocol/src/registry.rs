use crate::{
    common::{self, Application, Device},
    Error, Message, APP_TABLE_CAPACITY,
};

/// Payload length a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadLength {
    Exact(u8),
    /// Any payload length is accepted.
    Dynamic,
}

impl PayloadLength {
    #[inline]
    pub fn accepts(&self, len: usize) -> bool {
        match self {
            Self::Exact(expected) => usize::from(*expected) == len,
            Self::Dynamic => true,
        }
    }
}

/// State a command handler may act on.
pub struct Context<'a, C> {
    /// The host application.
    pub app: &'a mut C,
    /// State owned by the protocol itself.
    pub device: &'a mut Device,
}

/// A command handler.
///
/// The answer arrives with reply code `OK` and an empty payload;
/// the handler fills in whatever it needs to. Setting the reply
/// code to [`ReplyCode::NONE`](crate::ReplyCode::NONE) suppresses the reply.
pub type Handler<C> = fn(&mut Context<'_, C>, &Message, &mut Message);

/// One row of a command table.
pub struct CommandEntry<C> {
    pub id: u8,
    pub length: PayloadLength,
    pub handler: Handler<C>,
}

impl<C> CommandEntry<C> {
    pub const fn new(id: u8, length: PayloadLength, handler: Handler<C>) -> Self {
        Self {
            id,
            length,
            handler,
        }
    }
}

// manual impls: a derive would demand `C: Clone`
impl<C> Clone for CommandEntry<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for CommandEntry<C> {}

impl<C> core::fmt::Debug for CommandEntry<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("id", &self.id)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// The dispatch space of a device.
///
/// Slot 0 always holds the built-in common commands, the
/// remaining `T` slots take application tables in the order
/// they are registered. Lookup visits slots in that order
/// and the first entry with a matching id decides.
pub struct Registry<'t, C, const T: usize = APP_TABLE_CAPACITY> {
    common: [CommandEntry<C>; common::COMMAND_COUNT],
    tables: heapless::Vec<&'t [CommandEntry<C>], T>,
}

impl<'t, C: Application, const T: usize> Default for Registry<'t, C, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'t, C: Application, const T: usize> Registry<'t, C, T> {
    pub fn new() -> Self {
        Self {
            common: common::command_table(),
            tables: heapless::Vec::new(),
        }
    }

    /// Drop every application table, keeping
    /// only the common commands.
    pub fn init(&mut self) {
        self.tables.clear();
    }

    /// Register an application command table.
    ///
    /// `entry_count` must describe `table` exactly. Nothing
    /// is registered when an error is returned.
    pub fn register(&mut self, table: &'t [CommandEntry<C>], entry_count: usize) -> Result<(), Error> {
        if table.is_empty() {
            Err(Error::InvalidArgument)?;
        }

        if self.tables.is_full() {
            warn!("no free command table slot (capacity {})", T);
            Err(Error::CapacityExceeded)?;
        }

        if entry_count == 0 || entry_count != table.len() {
            Err(Error::MalformedTable)?;
        }

        // capacity checked above
        self.tables.push(table).map_err(|_| Error::CapacityExceeded)?;

        debug!(
            "registered command table in slot {} ({} entries)",
            self.tables.len(),
            entry_count
        );

        Ok(())
    }

    /// Find the handler for a command.
    ///
    /// A command whose id matches but whose length does not is
    /// reported as missing; later tables are not consulted.
    pub fn lookup(&self, id: u8, payload_len: usize) -> Option<&CommandEntry<C>> {
        self.tables()
            .flat_map(|table| table.iter())
            .find(|entry| entry.id == id)
            .filter(|entry| entry.length.accepts(payload_len))
    }

    /// Number of registered application tables.
    #[inline]
    pub fn app_tables(&self) -> usize {
        self.tables.len()
    }

    /// Maximum number of application tables.
    #[inline]
    pub fn capacity(&self) -> usize {
        T
    }

    fn tables(&self) -> impl Iterator<Item = &[CommandEntry<C>]> + '_ {
        core::iter::once(&self.common[..]).chain(self.tables.iter().map(|table| &**table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::id, ReplyCode};

    fn get(_: &mut Context<'_, ()>, _: &Message, answer: &mut Message) {
        answer.payload.push(0x01).unwrap();
    }

    fn set(_: &mut Context<'_, ()>, _: &Message, answer: &mut Message) {
        answer.payload.push(0x02).unwrap();
    }

    fn other(_: &mut Context<'_, ()>, _: &Message, answer: &mut Message) {
        answer.payload.push(0x03).unwrap();
    }

    fn shadow(_: &mut Context<'_, ()>, _: &Message, answer: &mut Message) {
        answer.reply = ReplyCode::API;
    }

    const SENSOR: [CommandEntry<()>; 2] = [
        CommandEntry::new(0x92, PayloadLength::Exact(1), get),
        CommandEntry::new(0x93, PayloadLength::Exact(2), set),
    ];

    /// Run a looked up handler and return its answer.
    fn invoke(entry: &CommandEntry<()>) -> Message {
        let mut device = Device::default();
        let mut app = ();
        let mut ctx = Context {
            app: &mut app,
            device: &mut device,
        };
        let mut answer = Message::default();

        (entry.handler)(&mut ctx, &Message::default(), &mut answer);

        answer
    }

    mod register {
        use super::*;

        #[test]
        fn basic() {
            let mut registry = Registry::<(), 3>::new();

            registry.register(&SENSOR, 2).unwrap();

            assert_eq!(1, registry.app_tables());
        }

        #[test]
        fn empty() {
            let mut registry = Registry::<(), 3>::new();

            assert_eq!(Err(Error::InvalidArgument), registry.register(&[], 0));
            assert_eq!(0, registry.app_tables());
        }

        #[test]
        fn malformed() {
            let mut registry = Registry::<(), 3>::new();

            assert_eq!(Err(Error::MalformedTable), registry.register(&SENSOR, 0));
            assert_eq!(Err(Error::MalformedTable), registry.register(&SENSOR, 1));
            assert_eq!(Err(Error::MalformedTable), registry.register(&SENSOR, 3));
            assert_eq!(0, registry.app_tables());
        }

        #[test]
        fn capacity() {
            let mut registry = Registry::<(), 2>::new();

            registry.register(&SENSOR, 2).unwrap();
            registry.register(&SENSOR, 2).unwrap();

            assert_eq!(Err(Error::CapacityExceeded), registry.register(&SENSOR, 2));
            assert_eq!(2, registry.app_tables());
            assert_eq!(2, registry.capacity());
        }

        #[test]
        fn init() {
            let mut registry = Registry::<(), 1>::new();

            registry.register(&SENSOR, 2).unwrap();
            registry.init();

            assert_eq!(0, registry.app_tables());
            assert!(registry.lookup(0x92, 1).is_none());
            assert!(registry.lookup(id::VERSION, 0).is_some());

            registry.register(&SENSOR, 2).unwrap();
            assert!(registry.lookup(0x92, 1).is_some());
        }
    }

    mod lookup {
        use super::*;

        #[test]
        fn exact_length() {
            let mut registry = Registry::<(), 3>::new();
            registry.register(&SENSOR, 2).unwrap();

            assert_eq!(Some(0x92), registry.lookup(0x92, 1).map(|e| e.id));
            assert!(registry.lookup(0x92, 2).is_none());
            assert_eq!(Some(0x93), registry.lookup(0x93, 2).map(|e| e.id));
            assert!(registry.lookup(0x93, 0).is_none());
        }

        #[test]
        fn unknown() {
            let mut registry = Registry::<(), 3>::new();
            registry.register(&SENSOR, 2).unwrap();

            assert!(registry.lookup(0xff, 0).is_none());
        }

        #[test]
        fn dynamic() {
            let registry = Registry::<(), 3>::new();

            for len in 0..=crate::wire::MAX_PAYLOAD_LEN {
                assert!(registry.lookup(id::CONFIG_SET, len).is_some());
            }
        }

        #[test]
        fn first_registered_wins() {
            let a = [CommandEntry::new(0x50, PayloadLength::Exact(0), get)];
            let b = [CommandEntry::new(0x50, PayloadLength::Exact(0), other)];

            let mut registry = Registry::<(), 3>::new();
            registry.register(&a, 1).unwrap();
            registry.register(&b, 1).unwrap();

            let entry = registry.lookup(0x50, 0).unwrap();
            assert_eq!(&[0x01], invoke(entry).payload.as_slice());
        }

        #[test]
        fn length_mismatch_stops_the_scan() {
            let a = [CommandEntry::new(0x50, PayloadLength::Exact(1), get)];
            let b = [CommandEntry::new(0x50, PayloadLength::Exact(2), other)];

            let mut registry = Registry::<(), 3>::new();
            registry.register(&a, 1).unwrap();
            registry.register(&b, 1).unwrap();

            // `b` would accept the length, but `a` owns the id
            assert!(registry.lookup(0x50, 2).is_none());
        }

        #[test]
        fn common_never_shadowed() {
            let hijack = [
                CommandEntry::new(id::VERSION, PayloadLength::Exact(0), shadow),
                CommandEntry::new(id::BOND, PayloadLength::Dynamic, shadow),
            ];

            let mut registry = Registry::<(), 3>::new();
            registry.register(&hijack, 2).unwrap();

            let answer = invoke(registry.lookup(id::VERSION, 0).unwrap());
            assert_eq!(ReplyCode::OK, answer.reply);
            assert_eq!(3, answer.payload_len());

            // the common bond entry owns the id, so its length rules
            assert!(registry.lookup(id::BOND, 3).is_none());
        }
    }

    #[test]
    fn accepts() {
        assert!(PayloadLength::Exact(3).accepts(3));
        assert!(!PayloadLength::Exact(3).accepts(2));
        assert!(PayloadLength::Dynamic.accepts(0));
        assert!(PayloadLength::Dynamic.accepts(30));
    }
}
