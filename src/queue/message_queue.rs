//! Blocking, bounded, typed message queue

use std::sync::Arc;

use log::{debug, trace, warn};

use crate::{
    boundary::{ByteSink, ByteSource, VecSink},
    error::{QueueError, Result},
    framing::{self, FrameHeader, Message, RingStorage, HEADER_SIZE},
    sync::{CancelToken, Monitor, WaitCondition},
};

use super::{
    config::QueueConfig,
    stats::{QueueStats, StatsSnapshot},
};

/// How an operation behaves when its condition does not hold yet
#[derive(Clone, Copy)]
enum WaitMode<'a> {
    /// Park until the condition holds, optionally interruptible
    Block(Option<&'a CancelToken>),
    /// Fail with `WouldBlock`
    NonBlocking,
}

/// Single ring shared by every producer and consumer.
///
/// Push blocks while `capacity - used < 8 + len(payload)`, pop blocks while
/// fewer than 8 bytes (one header) are buffered. All ring mutation happens under
/// one lock that is never held while parked.
#[derive(Debug)]
pub struct MessageQueue {
    config: QueueConfig,
    monitor: Arc<Monitor<RingStorage>>,
    stats: QueueStats,
}

impl MessageQueue {
    /// Create a queue from a validated configuration
    pub fn new(config: QueueConfig) -> Result<Self> {
        config.validate()?;

        let ring = RingStorage::with_capacity(config.initial_capacity as usize)?;
        let stats = QueueStats::default();
        stats.update_occupancy(ring.capacity(), 0);

        debug!(
            "created queue '{}' with capacity {} (max {})",
            config.name, config.initial_capacity, config.max_capacity
        );

        Ok(Self {
            config,
            monitor: Arc::new(Monitor::new(ring)),
            stats,
        })
    }

    /// Create a queue with default configuration and the given capacity
    pub fn with_capacity(capacity: u32) -> Result<Self> {
        Self::new(QueueConfig::default().with_initial_capacity(capacity))
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Current capacity in bytes
    pub fn capacity(&self) -> usize {
        self.monitor.lock().capacity()
    }

    /// Bytes currently buffered (headers included)
    pub fn used(&self) -> usize {
        self.monitor.lock().used()
    }

    /// Non-blocking statistics snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Replace the storage with a fresh ring of `new_capacity` bytes.
    ///
    /// Buffered messages are discarded. On allocation failure the queue is left
    /// without storage until the next successful resize.
    pub fn resize(&self, new_capacity: u32) -> Result<()> {
        let mut ring = self.monitor.lock();
        let discarded = ring.used();
        *ring = RingStorage::empty();

        let result = if new_capacity > self.config.max_capacity {
            Err(QueueError::out_of_memory(new_capacity as usize))
        } else {
            RingStorage::with_capacity(new_capacity as usize)
        };

        let outcome = match result {
            Ok(fresh) => {
                *ring = fresh;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "queue '{}': resize to {} bytes failed, queue has no storage",
                    self.config.name, new_capacity
                );
                Err(e)
            }
        };
        self.stats.update_occupancy(ring.capacity(), 0);
        drop(ring);

        if discarded > 0 {
            debug!(
                "queue '{}': resize discarded {} buffered bytes",
                self.config.name, discarded
            );
        }
        if self.config.wake_on_resize {
            self.monitor.notify_all_conditions();
        }
        outcome
    }

    /// Push a message, blocking until there is room
    pub fn push(&self, msg_type: i32, payload: &[u8]) -> Result<()> {
        self.enqueue(msg_type, payload, WaitMode::Block(None))
    }

    /// Push a message, blocking until there is room or `cancel` fires
    pub fn push_cancellable(&self, msg_type: i32, payload: &[u8], cancel: &CancelToken) -> Result<()> {
        self.enqueue(msg_type, payload, WaitMode::Block(Some(cancel)))
    }

    /// Push a message whose payload is read through a caller boundary
    pub fn push_from<S: ByteSource + ?Sized>(
        &self,
        msg_type: i32,
        payload: &S,
        cancel: Option<&CancelToken>,
    ) -> Result<()> {
        self.enqueue(msg_type, payload, WaitMode::Block(cancel))
    }

    /// Push without waiting; `WouldBlock` if there is not enough free space
    pub fn try_push(&self, msg_type: i32, payload: &[u8]) -> Result<()> {
        self.enqueue(msg_type, payload, WaitMode::NonBlocking)
    }

    /// Pop the oldest message, blocking until one is buffered.
    ///
    /// A message longer than `max_len` yields `MessageTooLarge` and stays queued.
    pub fn pop(&self, max_len: u32) -> Result<Message> {
        self.pop_message(max_len, WaitMode::Block(None))
    }

    /// Pop the oldest message, blocking until one is buffered or `cancel` fires
    pub fn pop_cancellable(&self, max_len: u32, cancel: &CancelToken) -> Result<Message> {
        self.pop_message(max_len, WaitMode::Block(Some(cancel)))
    }

    /// Pop the oldest message into a caller boundary; the sink's capacity is
    /// the receive limit
    pub fn pop_into<S: ByteSink + ?Sized>(
        &self,
        sink: &mut S,
        cancel: Option<&CancelToken>,
    ) -> Result<FrameHeader> {
        self.dequeue(sink, WaitMode::Block(cancel))
    }

    /// Pop without waiting; `WouldBlock` if no message is buffered
    pub fn try_pop(&self, max_len: u32) -> Result<Message> {
        self.pop_message(max_len, WaitMode::NonBlocking)
    }

    fn pop_message(&self, max_len: u32, mode: WaitMode<'_>) -> Result<Message> {
        let mut sink = VecSink::new(max_len as usize);
        let header = self.dequeue(&mut sink, mode)?;
        Ok(Message::new(header.msg_type, sink.into_inner()))
    }

    fn enqueue<S: ByteSource + ?Sized>(&self, msg_type: i32, payload: &S, mode: WaitMode<'_>) -> Result<()> {
        let required = framing::frame_len(payload.len())
            .ok_or_else(|| QueueError::message_too_large(usize::MAX, u32::MAX as usize))?;

        let guard = self.monitor.lock();
        let too_large = |ring: &RingStorage| -> Result<()> {
            if required > ring.capacity() {
                return Err(QueueError::message_too_large(required, ring.capacity()));
            }
            Ok(())
        };

        let mut ring = match mode {
            WaitMode::Block(cancel) => self.monitor.wait_while(
                guard,
                WaitCondition::SpaceAvailable,
                cancel,
                |ring| {
                    too_large(ring)?;
                    Ok(ring.free() < required)
                },
                || self.stats.record_blocked_writer(),
            )?,
            WaitMode::NonBlocking => {
                too_large(&*guard)?;
                if guard.free() < required {
                    return Err(QueueError::would_block("push: queue full"));
                }
                guard
            }
        };

        framing::write_frame(&mut ring, msg_type, payload)?;
        self.stats.record_push();
        self.stats.update_occupancy(ring.capacity(), ring.used());
        trace!(
            "queue '{}': pushed type {} ({} bytes, {} used)",
            self.config.name,
            msg_type,
            required,
            ring.used()
        );
        drop(ring);

        self.monitor.notify(WaitCondition::DataAvailable);
        Ok(())
    }

    fn dequeue<S: ByteSink + ?Sized>(&self, sink: &mut S, mode: WaitMode<'_>) -> Result<FrameHeader> {
        let guard = self.monitor.lock();

        let mut ring = match mode {
            WaitMode::Block(cancel) => self.monitor.wait_while(
                guard,
                WaitCondition::DataAvailable,
                cancel,
                |ring| Ok(ring.used() < HEADER_SIZE),
                || self.stats.record_blocked_reader(),
            )?,
            WaitMode::NonBlocking => {
                if guard.used() < HEADER_SIZE {
                    return Err(QueueError::would_block("pop: queue empty"));
                }
                guard
            }
        };

        let header = framing::read_frame(&mut ring, sink)?;
        self.stats.record_pop();
        self.stats.update_occupancy(ring.capacity(), ring.used());
        trace!(
            "queue '{}': popped type {} ({} bytes, {} used)",
            self.config.name,
            header.msg_type,
            header.frame_len(),
            ring.used()
        );
        drop(ring);

        self.monitor.notify(WaitCondition::SpaceAvailable);
        Ok(header)
    }
}
