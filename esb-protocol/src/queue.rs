use core::mem::MaybeUninit;

use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Channel};

use crate::{error, Message, QUEUE_CAPACITY};

/// The inbound queue.
///
/// Pushed from the radio's receive context, popped by the
/// engine. Both ends run inside the `RawMutex` critical
/// section, which is held only for the copy of one message.
pub type Inbound<M, const N: usize = QUEUE_CAPACITY> = Channel<M, Message, N>;

/// The producing end of the inbound queue, as seen
/// by a [`Listener`](crate::Listener).
pub trait InboundSink {
    /// Push a message without blocking.
    ///
    /// A full queue rejects the message and keeps
    /// its current contents.
    fn push(&self, message: Message) -> Result<(), error::QueueFull>;
}

impl<M: RawMutex, const N: usize> InboundSink for Channel<M, Message, N> {
    fn push(&self, message: Message) -> Result<(), error::QueueFull> {
        self.try_send(message).map_err(|_| error::QueueFull)
    }
}

/// A bounded FIFO of messages that never overwrites.
///
/// Used for the outbound path, where producer and consumer
/// share the polling context.
pub struct MessageQueue<const N: usize = QUEUE_CAPACITY> {
    buf: [MaybeUninit<Message>; N],
    start_cursor: usize,
    size: usize,
}

impl<const N: usize> Default for MessageQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MessageQueue<N> {
    pub const fn new() -> Self {
        Self {
            // SAFETY: an array of `MaybeUninit` needs no initialization
            buf: unsafe { MaybeUninit::<[MaybeUninit<Message>; N]>::uninit().assume_init() },
            start_cursor: 0,
            size: 0,
        }
    }

    /// Append a message to the back of the queue.
    ///
    /// Fails when the queue is full, leaving the
    /// queued messages untouched.
    pub fn push(&mut self, message: Message) -> Result<(), error::QueueFull> {
        if self.is_full() {
            Err(error::QueueFull)?;
        }

        let write_cursor = self.end_cursor();
        // SAFETY:
        // 1. cursor is wrapped, so always < N
        // 2. the slot is outside the populated region
        unsafe { self.buf.get_unchecked_mut(write_cursor) }.write(message);
        self.size += 1;

        Ok(())
    }

    /// Take the oldest message out of the queue.
    pub fn pop(&mut self) -> Option<Message> {
        if self.is_empty() {
            return None;
        }

        // SAFETY:
        // 1. start cursor is wrapped, so always < N
        // 2. the queue is not empty, so the slot was written
        // 3. the cursor moves past the slot, so it is read once
        let message = unsafe { self.buf.get_unchecked(self.start_cursor).assume_init_read() };

        self.start_cursor = Self::wrap(self.start_cursor + 1);
        self.size -= 1;

        Some(message)
    }

    /// Drop every queued message.
    pub fn reset(&mut self) {
        while self.pop().is_some() {}
        self.start_cursor = 0;
    }

    /// Wrap a provided cursor to adhere
    /// to the buffer size.
    #[inline]
    fn wrap(cursor: usize) -> usize {
        cursor % N
    }

    /// Get the position of the end of
    /// the populated region of the buffer.
    #[inline]
    fn end_cursor(&self) -> usize {
        Self::wrap(self.start_cursor + self.len())
    }

    /// Get the capacity (maximum length) of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    /// Get the number of queued messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Iterate over the queued messages, oldest first,
    /// without removing them.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        (0..self.len()).map(move |offset| {
            // SAFETY: every offset below `len` is inside the populated region
            unsafe {
                self.buf
                    .get_unchecked(Self::wrap(self.start_cursor + offset))
                    .assume_init_ref()
            }
        })
    }
}

impl<const N: usize> Drop for MessageQueue<N> {
    fn drop(&mut self) {
        self.reset();
    }
}
