//! Single-slot, latest-wins frame hand-off between threads.
//!
//! Producers (the scheduler through a [`QueueSink`], or a [`Scroller`]) publish
//! whole frames; a [`SinkPump`] thread owns the real display and forwards
//! whichever frame is newest when it wakes. An unread frame is replaced by the
//! next one, so a slow display never makes a producer wait.
//!
//! [`Scroller`]: crate::scroller::Scroller

use crate::binding::lock;
use crate::colors::Color;
use crate::error::{Error, Result};
use crate::frame::{self, FrameBuffer};
use crate::sink::{DisplaySink, SinkConfig};
use anyhow::anyhow;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error};

#[derive(Debug, Default)]
struct Slot {
    frame: Option<FrameBuffer>,
    closed: bool,
    published: u64,
    replaced: u64,
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    available: Condvar,
}

impl Shared {
    fn close(&self) {
        lock(&self.slot).closed = true;
        self.available.notify_all();
    }

    fn is_closed(&self) -> bool {
        lock(&self.slot).closed
    }
}

/// Creates a connected publisher and receiver.
pub fn latest_frame_channel() -> (FramePublisher, FrameReceiver) {
    let shared = Arc::new(Shared::default());
    (
        FramePublisher {
            shared: Arc::clone(&shared),
        },
        FrameReceiver { shared },
    )
}

/// Writing end of the frame channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FramePublisher {
    shared: Arc<Shared>,
}

impl FramePublisher {
    /// Publishes `frame`, replacing any frame not yet taken.
    ///
    /// # Errors
    /// `Error::Other` once the channel is closed.
    pub fn publish(&self, frame: FrameBuffer) -> Result<()> {
        let mut slot = lock(&self.shared.slot);
        if slot.closed {
            return Err(Error::Other(anyhow!("frame channel closed")));
        }
        if slot.frame.replace(frame).is_some() {
            slot.replaced += 1;
        }
        slot.published += 1;
        drop(slot);
        self.shared.available.notify_one();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Closes the channel for every publisher and the receiver.
    pub fn close(&self) {
        self.shared.close();
    }
}

/// Reading end of the frame channel.
#[derive(Debug)]
pub struct FrameReceiver {
    shared: Arc<Shared>,
}

impl FrameReceiver {
    /// Takes the newest frame without waiting.
    pub fn try_recv(&self) -> Option<FrameBuffer> {
        lock(&self.shared.slot).frame.take()
    }

    /// Waits up to `timeout` for a frame.
    ///
    /// Returns `None` on timeout, or when the channel is closed and empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FrameBuffer> {
        let deadline = Instant::now() + timeout;
        let mut slot = lock(&self.shared.slot);
        loop {
            if let Some(frame) = slot.frame.take() {
                return Some(frame);
            }
            if slot.closed {
                return None;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            slot = match self.shared.available.wait_timeout(slot, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn close(&self) {
        self.shared.close();
    }

    /// Frames published so far.
    pub fn published(&self) -> u64 {
        lock(&self.shared.slot).published
    }

    /// Frames overwritten before anyone took them.
    pub fn replaced(&self) -> u64 {
        lock(&self.shared.slot).replaced
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// [`DisplaySink`] that publishes into a frame channel.
///
/// Lets the scheduler run against a display owned by a [`SinkPump`].
#[derive(Debug, Clone)]
pub struct QueueSink {
    publisher: FramePublisher,
    config: Option<SinkConfig>,
}

impl QueueSink {
    pub fn new(publisher: FramePublisher) -> Self {
        Self {
            publisher,
            config: None,
        }
    }
}

impl DisplaySink for QueueSink {
    fn init(&mut self, config: &SinkConfig) -> Result<()> {
        self.config = Some(*config);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.config.is_some() && !self.publisher.is_closed()
    }

    fn submit(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.publisher.publish(frame.clone())
    }

    fn clear(&mut self, background: Color) -> Result<()> {
        let Some(config) = self.config else {
            return Ok(());
        };
        let mut blank = frame::transparent(config.width, config.height);
        frame::fill(&mut blank, background.opaque());
        self.publisher.publish(blank)
    }
}

/// Thread that owns a display and feeds it the newest published frame.
#[derive(Debug)]
pub struct SinkPump<S: DisplaySink + 'static> {
    shared: Arc<Shared>,
    handle: JoinHandle<S>,
}

impl<S: DisplaySink + 'static> SinkPump<S> {
    /// Initializes `sink` and starts forwarding frames from `receiver`.
    ///
    /// The pump stops when the channel closes or the sink fails a submit; a
    /// failed submit also closes the channel so producers notice.
    ///
    /// # Errors
    /// Whatever `sink.init` returns.
    pub fn spawn(mut sink: S, receiver: FrameReceiver, config: SinkConfig) -> Result<Self> {
        sink.init(&config)?;
        let shared = Arc::clone(&receiver.shared);
        let poll = Duration::from_secs_f64(1.0 / f64::from(config.fps.max(1)));

        let handle = std::thread::Builder::new()
            .name("sink-pump".into())
            .spawn(move || {
                while !receiver.is_closed() {
                    let Some(frame) = receiver.recv_timeout(poll) else {
                        continue;
                    };
                    if !sink.is_ready() {
                        debug!("display busy, frame dropped");
                        continue;
                    }
                    if let Err(err) = sink.submit(&frame) {
                        error!(%err, "display rejected frame, stopping pump");
                        break;
                    }
                }
                receiver.close();
                sink
            })
            .map_err(|e| Error::Other(anyhow!("spawn sink pump: {e}")))?;

        Ok(Self { shared, handle })
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Closes the channel, waits for the pump and returns the sink.
    pub fn stop(self) -> Result<S> {
        self.shared.close();
        self.handle
            .join()
            .map_err(|_| Error::Other(anyhow!("sink pump panicked")))
    }
}
