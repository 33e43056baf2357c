//! # Intcode channels
//! Unbounded FIFO queues of values carried between a machine and whoever talks to it:
//! another machine, a scripted sequence of inputs or an interactive source living on
//! another thread.
//!
//! A [`Channel`] is a cheap handle, cloning it yields another handle to the same queue.
//! Each queue has exactly one writer and one reader in practice, but the handles are
//! `Send + Sync` so that the two ends may live on different threads.
//!
//! Closing a channel tells its reader that nothing will be pushed anymore. Values already
//! queued are still handed out, the reader only sees [`Input::Closed`] once the queue is
//! drained.

use std::{
    collections::VecDeque,
    fmt::Debug,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

use crate::bus::Input;

#[derive(Debug, Default)]
struct ChannelState {
    queue: VecDeque<i64>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<ChannelState>,
    ready: Condvar,
}

/// Shared handle to an unbounded queue of Intcode values.
#[derive(Clone, Debug, Default)]
pub struct Channel {
    shared: Arc<Shared>,
}
impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        // A panicking peer cannot leave the queue half updated.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues a value. Never blocks.
    pub fn push(&self, value: i64) {
        self.state().queue.push_back(value);
        self.shared.ready.notify_all()
    }

    /// Consumes the oldest queued value.
    pub fn pop(&self) -> Input {
        let mut state = self.state();
        match state.queue.pop_front() {
            Some(value) => Input::Value(value),
            None if state.closed => Input::Closed,
            None => Input::Pending,
        }
    }

    /// Marks the channel as finished: once drained, readers see [`Input::Closed`].
    pub fn close(&self) {
        self.state().closed = true;
        self.shared.ready.notify_all()
    }
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
    /// Reopens a closed channel.
    pub fn reopen(&self) {
        self.state().closed = false
    }

    pub fn len(&self) -> usize {
        self.state().queue.len()
    }
    pub fn is_empty(&self) -> bool {
        self.state().queue.is_empty()
    }

    /// Removes and returns every queued value, oldest first.
    pub fn drain(&self) -> Vec<i64> {
        self.state().queue.drain(..).collect()
    }
    /// Copies every queued value without consuming them.
    pub fn queued(&self) -> Vec<i64> {
        self.state().queue.iter().copied().collect()
    }

    /// Blocks the current thread until a value is queued or the channel is closed.
    ///
    /// Only meant for hosts running machines on their own threads. Cooperative hosts
    /// should retry suspended machines instead.
    pub fn wait(&self) {
        let state = self.state();
        let _state = self
            .shared
            .ready
            .wait_while(state, |state| state.queue.is_empty() && !state.closed)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Whether both handles point to the same queue.
    pub fn same_channel(&self, other: &Channel) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}
impl Extend<i64> for Channel {
    fn extend<T: IntoIterator<Item = i64>>(&mut self, values: T) {
        let mut state = self.state();
        state.queue.extend(values);
        drop(state);
        self.shared.ready.notify_all()
    }
}

/// Where a machine's output goes.
pub enum OutputSink {
    /// Output is kept in emission order until the host reads it.
    Buffered(Vec<i64>),
    /// Output is forwarded right away to a peer's input channel.
    Chained(Channel),
    /// Output is handed to a callback as soon as it is produced.
    Interactive(Box<dyn FnMut(i64) + Send>),
}
impl OutputSink {
    pub fn buffered() -> Self {
        Self::Buffered(Vec::new())
    }
    pub fn interactive(callback: impl FnMut(i64) + Send + 'static) -> Self {
        Self::Interactive(Box::new(callback))
    }

    pub fn send(&mut self, value: i64) {
        match self {
            Self::Buffered(values) => values.push(value),
            Self::Chained(channel) => channel.push(value),
            Self::Interactive(callback) => callback(value),
        }
    }

    /// Takes the buffered values out. Other sinks keep nothing and return an empty list.
    pub fn take(&mut self) -> Vec<i64> {
        match self {
            Self::Buffered(values) => core::mem::take(values),
            _ => Vec::new(),
        }
    }
}
impl Default for OutputSink {
    fn default() -> Self {
        Self::buffered()
    }
}
impl Debug for OutputSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Buffered(values) => f.debug_tuple("Buffered").field(values).finish(),
            Self::Chained(channel) => f.debug_tuple("Chained").field(channel).finish(),
            Self::Interactive(_) => f.write_str("Interactive(..)"),
        }
    }
}
