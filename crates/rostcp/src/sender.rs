// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transmit loop: the single consumer of every topic queue.
//!
//! Producers publish through [`TopicPublisher`] handles, which enqueue and
//! wake the loop over a crossbeam channel. [`TransmitLoop::run`] drains
//! woken topics onto the sink and writes a keepalive frame whenever the
//! link has been idle for the configured period.
//!
//! ```text
//! producer --publish--> OutgoingQueue --wake--> TransmitLoop::run --frames--> sink
//! ```
//!
//! At most one wakeup per topic, plus one stop request, is pending at any
//! time, so the channel stays bounded while the loop is not draining.
//!
//! Reconnection is driven by the caller: call
//! [`prepare_reconnect`](TransmitLoop::prepare_reconnect), then `run` again
//! with the new stream.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::config::ConnectorConfig;
use crate::error::Result;
use crate::queue::{OutgoingQueue, QueueState};
use crate::ser::{WireMessage, WireSerializer};
use crate::transport::{write_keepalive, write_sys_command, PublishRegistration, SysCommand};

enum Wake {
    Topic(usize),
    Stop,
}

/// Type-erased view of a topic queue, as seen by the loop.
trait PendingTopic: Send + Sync {
    fn topic(&self) -> &str;
    fn send_next(&self, ser: &mut WireSerializer, sink: &mut dyn Write) -> Result<QueueState>;
    fn prepare_latch(&self);
    fn clear_all(&self);
}

impl<M> PendingTopic for OutgoingQueue<M>
where
    M: WireMessage + Send + Sync + 'static,
{
    fn topic(&self) -> &str {
        OutgoingQueue::topic(self)
    }

    fn send_next(&self, ser: &mut WireSerializer, sink: &mut dyn Write) -> Result<QueueState> {
        OutgoingQueue::send_next(self, ser, sink)
    }

    fn prepare_latch(&self) {
        OutgoingQueue::prepare_latch(self);
    }

    fn clear_all(&self) {
        OutgoingQueue::clear_all(self);
    }
}

struct TopicSlot {
    queue: Arc<dyn PendingTopic>,
    registration: SysCommand,
    scheduled: Arc<AtomicBool>,
}

/// Send `Wake::Topic(id)` unless one is already pending for the topic.
fn schedule(wake: &Sender<Wake>, scheduled: &AtomicBool, id: usize) -> bool {
    if scheduled.swap(true, Ordering::SeqCst) {
        return true;
    }
    wake.send(Wake::Topic(id)).is_ok()
}

/// Loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmitStats {
    pub frames_sent: u64,
    pub overflow_warnings: u64,
    pub keepalives_sent: u64,
    pub commands_sent: u64,
}

/// Producer handle for one advertised topic.
pub struct TopicPublisher<M> {
    queue: Arc<OutgoingQueue<M>>,
    id: usize,
    trailing_pad: bool,
    scheduled: Arc<AtomicBool>,
    wake: Sender<Wake>,
}

impl<M> Clone for TopicPublisher<M> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            id: self.id,
            trailing_pad: self.trailing_pad,
            scheduled: Arc::clone(&self.scheduled),
            wake: self.wake.clone(),
        }
    }
}

impl<M> TopicPublisher<M>
where
    M: WireMessage + Send + Sync + 'static,
{
    /// Queue `message` with the configured trailing-pad default.
    pub fn publish(&self, message: Arc<M>) {
        self.publish_with_pad(message, self.trailing_pad);
    }

    pub fn publish_with_pad(&self, message: Arc<M>, use_trailing_pad: bool) {
        self.queue.enqueue_with_pad(message, use_trailing_pad);
        if !schedule(&self.wake, &self.scheduled, self.id) {
            log::debug!(
                "[TopicPublisher::publish] {}: transmit loop gone",
                self.queue.topic()
            );
        }
    }

    pub fn topic(&self) -> &str {
        self.queue.topic()
    }

    pub fn queue(&self) -> &Arc<OutgoingQueue<M>> {
        &self.queue
    }
}

/// Cloneable handle that makes [`TransmitLoop::run`] return.
///
/// A request made while the loop is not running ends the next `run`, after
/// the topics woken before it are drained. Repeated requests collapse into
/// one.
#[derive(Clone)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
    wake: Sender<Wake>,
}

impl StopHandle {
    pub fn stop(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.wake.send(Wake::Stop).is_err() {
            log::debug!("[StopHandle::stop] transmit loop gone");
        }
    }
}

/// Single consumer writing every advertised topic onto one sink.
pub struct TransmitLoop {
    config: ConnectorConfig,
    ser: WireSerializer,
    topics: Vec<TopicSlot>,
    pending_commands: VecDeque<SysCommand>,
    stop_requested: Arc<AtomicBool>,
    wake_tx: Sender<Wake>,
    wake_rx: Receiver<Wake>,
    stats: TransmitStats,
}

impl TransmitLoop {
    /// # Errors
    ///
    /// Returns the validation error of `config`.
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        config.validate()?;
        let (wake_tx, wake_rx) = channel::unbounded();
        Ok(Self {
            ser: WireSerializer::new(config.wire_format),
            config,
            topics: Vec::new(),
            pending_commands: VecDeque::new(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
            stats: TransmitStats::default(),
        })
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn stats(&self) -> TransmitStats {
        self.stats
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            requested: Arc::clone(&self.stop_requested),
            wake: self.wake_tx.clone(),
        }
    }

    /// Create the queue for `topic` and schedule its `__publish` registration.
    pub fn advertise<M>(
        &mut self,
        topic: impl Into<String>,
        message_name: impl Into<String>,
        latch: bool,
    ) -> Result<TopicPublisher<M>>
    where
        M: WireMessage + Send + Sync + 'static,
    {
        let queue = Arc::new(OutgoingQueue::new(topic, self.config.queue_capacity)?);
        let registration = SysCommand::Publish(PublishRegistration {
            topic: queue.topic().to_string(),
            message_name: message_name.into(),
            queue_size: queue.capacity(),
            latch,
        });
        log::debug!(
            "[TransmitLoop::advertise] {} (capacity {})",
            queue.topic(),
            queue.capacity()
        );

        let id = self.topics.len();
        let scheduled = Arc::new(AtomicBool::new(false));
        self.pending_commands.push_back(registration.clone());
        self.topics.push(TopicSlot {
            queue: Arc::clone(&queue) as Arc<dyn PendingTopic>,
            registration,
            scheduled: Arc::clone(&scheduled),
        });

        Ok(TopicPublisher {
            queue,
            id,
            trailing_pad: self.config.trailing_pad,
            scheduled,
            wake: self.wake_tx.clone(),
        })
    }

    /// Re-register every topic and re-queue latched values.
    ///
    /// Call before running the loop on a fresh connection.
    pub fn prepare_reconnect(&mut self) {
        self.pending_commands.clear();
        for (id, slot) in self.topics.iter().enumerate() {
            self.pending_commands.push_back(slot.registration.clone());
            slot.queue.prepare_latch();
            if !schedule(&self.wake_tx, &slot.scheduled, id) {
                log::debug!(
                    "[TransmitLoop::prepare_reconnect] {}: wake failed",
                    slot.queue.topic()
                );
            }
        }
    }

    /// Drop everything pending on every topic.
    pub fn clear_all(&self) {
        for slot in &self.topics {
            slot.queue.clear_all();
        }
    }

    /// Run until [`StopHandle::stop`] is called or the sink fails.
    pub fn run<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        log::debug!(
            "[TransmitLoop::run] starting ({} topics, {} format)",
            self.topics.len(),
            self.config.wire_format
        );
        self.flush_commands(sink)?;

        loop {
            match self.wake_rx.recv_timeout(self.config.keepalive) {
                Ok(Wake::Topic(id)) => {
                    self.drain_topic(id, sink)?;
                    sink.flush()?;
                }
                Ok(Wake::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    self.stop_requested.store(false, Ordering::SeqCst);
                    sink.flush()?;
                    log::debug!("[TransmitLoop::run] stopped: {:?}", self.stats);
                    return Ok(());
                }
                Err(RecvTimeoutError::Timeout) => {
                    write_keepalive(sink)?;
                    sink.flush()?;
                    self.stats.keepalives_sent += 1;
                }
            }
        }
    }

    fn flush_commands<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<()> {
        while let Some(command) = self.pending_commands.pop_front() {
            if let Err(e) = write_sys_command(&mut self.ser, sink, &command) {
                self.pending_commands.push_front(command);
                return Err(e);
            }
            self.stats.commands_sent += 1;
        }
        Ok(())
    }

    fn drain_topic<W: Write>(&mut self, id: usize, sink: &mut W) -> Result<()> {
        let Some(slot) = self.topics.get(id) else {
            log::debug!("[TransmitLoop::drain_topic] unknown topic id {}", id);
            return Ok(());
        };
        let queue = Arc::clone(&slot.queue);
        // Publishes racing with the drain below re-arm the wakeup.
        slot.scheduled.store(false, Ordering::SeqCst);

        loop {
            match queue.send_next(&mut self.ser, &mut *sink)? {
                QueueState::Normal => self.stats.frames_sent += 1,
                QueueState::QueueFullWarning => {
                    self.stats.overflow_warnings += 1;
                    log::warn!(
                        "[TransmitLoop] {}: queue full, messages are being dropped \
                         (connection too slow for this traffic?)",
                        queue.topic()
                    );
                }
                QueueState::NoMessageToSendError => return Ok(()),
            }
        }
    }
}
