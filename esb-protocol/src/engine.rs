use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};

use crate::{
    common::{Application, Device, Version},
    link::{Link, Listener},
    queue::{Inbound, MessageQueue},
    registry::{CommandEntry, Context, Registry},
    Address, Error, Message, Pipe, ReplyCode, APP_TABLE_CAPACITY, QUEUE_CAPACITY,
};

/// Runtime configuration of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Address of the listening pipe, i.e. this device.
    pub listening_address: Address,
    /// Reported by the version command.
    pub version: Version,
    /// RF channel to select during init. The driver's
    /// default is kept when `None`.
    pub rf_channel: Option<u8>,
}

impl Config {
    pub const fn new(listening_address: Address) -> Self {
        Self {
            listening_address,
            version: Version::new(0, 0, 0),
            rf_channel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized,
    Initialized,
}

/// Counters kept by the engine. All of them wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Replies handed to the link.
    pub replies_sent: u32,
    /// Replies a handler suppressed.
    pub replies_suppressed: u32,
    /// Requests answered with `UNKNOWN_COMMAND` by the registry.
    pub unknown_commands: u32,
    /// Outbound messages handed to the link.
    pub transmitted: u32,
    /// Link failures while sending a reply or an outbound message.
    pub send_failures: u32,
}

#[inline]
fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

/// Where applications put messages they want sent.
pub trait Outbox {
    /// Queue a message for the next processing tick.
    ///
    /// A full queue is reported as [`Error::QueueFull`] and the
    /// message is not sent; the caller decides whether to retry.
    #[must_use = "a full outbound queue drops the message"]
    fn enqueue_outbound(&mut self, message: Message) -> Result<(), Error>;
}

/// The protocol engine of one device.
///
/// Owns the outbound queue, the registry and the link, and
/// consumes the inbound queue its [`Listener`] feeds. Not
/// re-entrant: [`Engine::process`] is called from the host's
/// polling loop.
pub struct Engine<
    'q,
    L,
    C,
    M = CriticalSectionRawMutex,
    const Q: usize = QUEUE_CAPACITY,
    const T: usize = APP_TABLE_CAPACITY,
> where
    M: RawMutex,
{
    link: L,
    config: Config,
    state: State,
    inbound: &'q Inbound<M, Q>,
    outbound: MessageQueue<Q>,
    registry: Registry<'q, C, T>,
    device: Device,
    stats: Stats,
}

impl<'q, L, C, M, const Q: usize, const T: usize> Engine<'q, L, C, M, Q, T>
where
    L: Link<'q>,
    C: Application,
    M: RawMutex + Sync,
{
    pub fn new(link: L, inbound: &'q Inbound<M, Q>, config: Config) -> Self {
        Self {
            link,
            config,
            state: State::Uninitialized,
            inbound,
            outbound: MessageQueue::new(),
            registry: Registry::new(),
            device: Device::new(config.version),
            stats: Stats::default(),
        }
    }

    /// Bring up the link, start listening and reset the
    /// queues and the registry.
    ///
    /// Application tables must be registered afterwards. The
    /// engine stays uninitialized when any step fails.
    pub fn init(&mut self) -> Result<(), Error> {
        self.state = State::Uninitialized;

        self.link.init().map_err(|_| {
            error!("link init failed");
            Error::Hardware
        })?;

        if let Some(channel) = self.config.rf_channel {
            self.link.set_rf_channel(channel).map_err(|_| {
                error!("failed to select rf channel {}", channel);
                Error::Hardware
            })?;
        }

        self.link
            .set_pipeline_address(Pipe::Listening, &self.config.listening_address)
            .map_err(|_| {
                error!("failed to set listening address");
                Error::Hardware
            })?;

        self.link
            .start_listening(Pipe::Listening, Listener::new(Pipe::Listening, self.inbound))
            .map_err(|_| {
                error!("failed to start listening");
                Error::Hardware
            })?;

        self.outbound.reset();
        while self.inbound.try_receive().is_ok() {}

        if self.registry.app_tables() > 0 {
            warn!(
                "init drops {} registered command tables",
                self.registry.app_tables()
            );
        }
        self.registry.init();

        self.state = State::Initialized;
        info!("protocol initialized on {:?}", self.config.listening_address);

        Ok(())
    }

    /// Stop listening and return to the uninitialized state.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        self.ensure_initialized()?;

        self.link.stop_listening(Pipe::Listening).map_err(|_| {
            error!("failed to stop listening");
            Error::Hardware
        })?;

        self.state = State::Uninitialized;
        info!("protocol shut down");

        Ok(())
    }

    /// Register an application command table.
    ///
    /// See [`Registry::register`].
    pub fn register(&mut self, table: &'q [CommandEntry<C>], entry_count: usize) -> Result<(), Error> {
        self.registry.register(table, entry_count)
    }

    /// See [`Registry::lookup`].
    pub fn lookup(&self, id: u8, payload_len: usize) -> Option<&CommandEntry<C>> {
        self.registry.lookup(id, payload_len)
    }

    /// Queue a message for transmission on the next tick.
    ///
    /// The message goes out on the send pipe, addressed
    /// to its own `address`.
    #[must_use = "a full outbound queue drops the message"]
    pub fn enqueue_outbound(&mut self, message: Message) -> Result<(), Error> {
        self.ensure_initialized()?;

        self.outbound.push(message).map_err(|err| {
            warn!("outbound queue full");
            Error::from(err)
        })
    }

    /// Run one processing tick.
    ///
    /// Answers every queued request, then sends every queued
    /// outbound message. Failing requests are answered over the
    /// link and never fail the tick.
    pub fn process(&mut self, app: &mut C) -> Result<(), Error> {
        self.ensure_initialized()?;

        while let Ok(request) = self.inbound.try_receive() {
            self.dispatch(app, &request);
        }

        while let Some(message) = self.outbound.pop() {
            if self.transmit(Pipe::Send, &message) {
                bump(&mut self.stats.transmitted);
            }
        }

        Ok(())
    }

    fn dispatch(&mut self, app: &mut C, request: &Message) {
        let mut answer = Message::new(request.command);

        match self
            .registry
            .lookup(request.command, request.payload_len())
            .map(|entry| entry.handler)
        {
            Some(handler) => {
                let mut ctx = Context {
                    app,
                    device: &mut self.device,
                };

                handler(&mut ctx, request, &mut answer);
            }
            None => {
                debug!(
                    "unknown command {:#x} ({} byte payload)",
                    request.command,
                    request.payload_len()
                );
                bump(&mut self.stats.unknown_commands);
                answer.reply = ReplyCode::UNKNOWN_COMMAND;
            }
        }

        if answer.reply.is_suppressed() {
            trace!("reply to {} suppressed", request.command);
            bump(&mut self.stats.replies_suppressed);
            return;
        }

        answer.command = request.command;

        if self.transmit(Pipe::Listening, &answer) {
            bump(&mut self.stats.replies_sent);
        }
    }

    /// Hand a message to the link. Replies keep the listening
    /// pipe's address, everything else is sent to the message's
    /// own address.
    fn transmit(&mut self, pipe: Pipe, message: &Message) -> bool {
        if pipe == Pipe::Send
            && self
                .link
                .set_pipeline_address(pipe, &message.address)
                .is_err()
        {
            warn!("failed to address {:?}", message.address);
            bump(&mut self.stats.send_failures);
            return false;
        }

        let frame = esb_wire::encode(message);

        if self.link.send(pipe, frame.as_bytes()).is_err() {
            warn!("failed to send command {} on {:?}", message.command, pipe);
            bump(&mut self.stats.send_failures);
            return false;
        }

        true
    }

    #[inline]
    fn ensure_initialized(&self) -> Result<(), Error> {
        match self.state {
            State::Initialized => Ok(()),
            State::Uninitialized => Err(Error::NotInitialized),
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state == State::Initialized
    }

    #[inline]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The central this device is bonded with, if any.
    #[inline]
    pub fn bonded_peer(&self) -> Option<Address> {
        self.device.bonded_peer()
    }

    /// Messages waiting for the next tick.
    #[inline]
    pub fn outbound(&self) -> &MessageQueue<Q> {
        &self.outbound
    }

    #[inline]
    pub fn registry(&self) -> &Registry<'q, C, T> {
        &self.registry
    }

    #[inline]
    pub fn link(&self) -> &L {
        &self.link
    }

    #[inline]
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

impl<'q, L, C, M, const Q: usize, const T: usize> Outbox for Engine<'q, L, C, M, Q, T>
where
    L: Link<'q>,
    C: Application,
    M: RawMutex + Sync,
{
    fn enqueue_outbound(&mut self, message: Message) -> Result<(), Error> {
        Engine::enqueue_outbound(self, message)
    }
}
