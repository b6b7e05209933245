// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-topic outgoing queue with flow control.
//!
//! Bounded FIFO that never blocks producers: when full, the oldest pending
//! message is evicted (KEEP_LAST semantics) and an overflow notification is
//! recorded. The single consumer drains notifications one per
//! [`dequeue_for_send`](OutgoingQueue::dequeue_for_send) call before any
//! further message is delivered.
//!
//! The last transmitted message is latched so that a reconnecting peer can
//! be sent the most recent value again ([`prepare_latch`](OutgoingQueue::prepare_latch)).
//!
//! Messages leaving queue ownership without becoming the latched value
//! (evicted, cleared, superseded) are handed to an optional [`MessagePool`].
//! A latched message re-queued by `prepare_latch` is only recycled once it
//! is superseded, even if its queued copy is evicted or cleared first.

pub mod pool;

pub use pool::{PoolStats, RecyclePool};

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::ser::{WireMessage, WireSerializer};

/// Receiver of messages the queue no longer needs.
pub trait MessagePool<M>: Send + Sync {
    fn accept(&self, message: Arc<M>);
}

/// Pending message plus its trailing-pad flag.
#[derive(Debug)]
pub(crate) struct QueueEntry<M> {
    pub(crate) message: Arc<M>,
    pub(crate) use_trailing_pad: bool,
}

/// Outcome of a dequeue / send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueState {
    /// A message was delivered.
    Normal,
    /// One overflow (dropped message) notification was consumed.
    QueueFullWarning,
    /// Nothing pending.
    NoMessageToSendError,
}

/// Result of [`OutgoingQueue::dequeue_for_send`].
#[derive(Debug)]
pub enum Dequeued<M> {
    Normal {
        message: Arc<M>,
        use_trailing_pad: bool,
    },
    QueueFullWarning,
    NoMessageToSendError,
}

impl<M> Dequeued<M> {
    pub fn state(&self) -> QueueState {
        match self {
            Dequeued::Normal { .. } => QueueState::Normal,
            Dequeued::QueueFullWarning => QueueState::QueueFullWarning,
            Dequeued::NoMessageToSendError => QueueState::NoMessageToSendError,
        }
    }

    pub fn into_message(self) -> Option<Arc<M>> {
        match self {
            Dequeued::Normal { message, .. } => Some(message),
            _ => None,
        }
    }
}

struct QueueInner<M> {
    entries: VecDeque<QueueEntry<M>>,
    overflow: usize,
}

/// Bounded outgoing queue for one topic.
pub struct OutgoingQueue<M> {
    topic: String,
    capacity: usize,
    inner: Mutex<QueueInner<M>>,
    /// Written by the consumer only. Read under `inner` when entries
    /// leave the queue (lock order: `inner`, then `last_sent`).
    last_sent: Mutex<Option<Arc<M>>>,
    pool: RwLock<Option<Arc<dyn MessagePool<M>>>>,
}

impl<M> std::fmt::Debug for OutgoingQueue<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("OutgoingQueue")
            .field("topic", &self.topic)
            .field("capacity", &self.capacity)
            .field("len", &inner.entries.len())
            .field("overflow", &inner.overflow)
            .finish_non_exhaustive()
    }
}

impl<M> OutgoingQueue<M>
where
    M: WireMessage + Send + Sync + 'static,
{
    /// Create a queue for `topic` holding at most `capacity` messages.
    ///
    /// # Errors
    ///
    /// `Error::InvalidCapacity` if `capacity` is 0.
    pub fn new(topic: impl Into<String>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(Self {
            topic: topic.into(),
            capacity,
            inner: Mutex::new(QueueInner {
                entries: VecDeque::with_capacity(capacity),
                overflow: 0,
            }),
            last_sent: Mutex::new(None),
            pool: RwLock::new(None),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Overflow notifications not yet consumed.
    pub fn overflow_pending(&self) -> usize {
        self.inner.lock().overflow
    }

    /// Latched message (last one handed to the sink).
    pub fn last_sent(&self) -> Option<Arc<M>> {
        self.last_sent.lock().clone()
    }

    pub fn set_pool(&self, pool: Option<Arc<dyn MessagePool<M>>>) {
        *self.pool.write() = pool;
    }

    /// Hand `message` to the pool, or drop it when none is configured.
    pub fn try_recycle(&self, message: Arc<M>) {
        let pool = self.pool.read().clone();
        if let Some(pool) = pool {
            pool.accept(message);
        }
    }

    /// Enqueue with the trailing pad enabled.
    pub fn enqueue(&self, message: Arc<M>) {
        self.enqueue_with_pad(message, true);
    }

    /// Enqueue, evicting the oldest entry when the queue is full.
    pub fn enqueue_with_pad(&self, message: Arc<M>, use_trailing_pad: bool) {
        let evicted = {
            let mut inner = self.inner.lock();
            let evicted = if inner.entries.len() >= self.capacity {
                inner.overflow += 1;
                inner
                    .entries
                    .pop_front()
                    .filter(|entry| !self.is_latched(&entry.message))
            } else {
                None
            };
            inner.entries.push_back(QueueEntry {
                message,
                use_trailing_pad,
            });
            evicted
        };

        if let Some(entry) = evicted {
            log::debug!("[OutgoingQueue::enqueue] {} full, dropping oldest", self.topic);
            self.try_recycle(entry.message);
        }
    }

    /// Pop the next outcome for the transmit loop.
    pub fn dequeue_for_send(&self) -> Dequeued<M> {
        let mut inner = self.inner.lock();
        if inner.overflow > 0 {
            inner.overflow -= 1;
            return Dequeued::QueueFullWarning;
        }
        match inner.entries.pop_front() {
            Some(entry) => Dequeued::Normal {
                message: entry.message,
                use_trailing_pad: entry.use_trailing_pad,
            },
            None => Dequeued::NoMessageToSendError,
        }
    }

    pub fn peek_head(&self) -> Option<Arc<M>> {
        self.inner
            .lock()
            .entries
            .front()
            .map(|entry| Arc::clone(&entry.message))
    }

    /// Re-queue the latched message if nothing else is pending.
    pub fn prepare_latch(&self) {
        let Some(latched) = self.last_sent() else {
            return;
        };
        let mut inner = self.inner.lock();
        if inner.entries.is_empty() {
            inner.entries.push_front(QueueEntry {
                message: latched,
                use_trailing_pad: true,
            });
        }
    }

    /// Dequeue one outcome and, for a message, encode and write its frame.
    ///
    /// The frame is `[topic][u32 length][message bytes]`. The message becomes
    /// the latched value before the write, so a failed write is still
    /// re-sent by [`prepare_latch`](Self::prepare_latch) after reconnection.
    pub fn send_next<W: Write + ?Sized>(
        &self,
        ser: &mut WireSerializer,
        sink: &mut W,
    ) -> Result<QueueState> {
        let (message, use_trailing_pad) = match self.dequeue_for_send() {
            Dequeued::Normal {
                message,
                use_trailing_pad,
            } => (message, use_trailing_pad),
            other => return Ok(other.state()),
        };

        ser.clear();
        ser.set_trailing_pad(use_trailing_pad);
        ser.serialize_topic_message(&self.topic, message.as_ref());
        self.record_sent(message);

        ser.send_to(sink)?;
        Ok(QueueState::Normal)
    }

    /// True if `message` is the latched instance. Call with `inner` held.
    fn is_latched(&self, message: &Arc<M>) -> bool {
        self.last_sent
            .lock()
            .as_ref()
            .is_some_and(|latched| Arc::ptr_eq(latched, message))
    }

    fn record_sent(&self, message: Arc<M>) {
        let previous = self.last_sent.lock().replace(Arc::clone(&message));
        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous, &message) {
                self.try_recycle(previous);
            }
        }
    }

    /// Drop every pending message and overflow notification.
    pub fn clear_all(&self) {
        let drained: Vec<QueueEntry<M>> = {
            let mut inner = self.inner.lock();
            inner.overflow = 0;
            let drained: Vec<_> = inner.entries.drain(..).collect();
            drained
                .into_iter()
                .filter(|entry| !self.is_latched(&entry.message))
                .collect()
        };
        for entry in drained {
            self.try_recycle(entry.message);
        }
    }
}
