//! Fast-path panning of one image across the display.
//!
//! A [`Scroller`] runs its own tightly-timed thread and publishes straight into
//! a frame channel instead of going through the scheduler's frame loop. It
//! must not share a display region with a scheduled animation.

use crate::assets::ImageAsset;
use crate::colors::Color;
use crate::composite::paste_with_alpha_at;
use crate::error::{Error, Result};
use crate::frame::{self, FrameBuffer};
use crate::frame_queue::FramePublisher;
use anyhow::anyhow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Interval between scroller frames.
pub const DEFAULT_STEP: Duration = Duration::from_millis(5);

/// Where and how long to pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPath {
    pub start: (i32, i32),
    pub end: (i32, i32),
    pub duration: Duration,
    pub background: Color,
    pub step: Duration,
}

impl ScrollPath {
    pub fn new(start: (i32, i32), end: (i32, i32), duration: Duration) -> Self {
        Self {
            start,
            end,
            duration,
            background: crate::colors::BLACK,
            step: DEFAULT_STEP,
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Image position `elapsed` into the scroll, clamped to the end point.
    pub fn position_at(&self, elapsed: Duration) -> (i32, i32) {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.end;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let lerp = |a: i32, b: i32| a + (f64::from(b - a) * t).round() as i32;
        (lerp(self.start.0, self.end.0), lerp(self.start.1, self.end.1))
    }
}

/// Handle to a running scroll.
#[derive(Debug)]
pub struct Scroller {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl Scroller {
    /// Starts panning `image` along `path` on a `size` display.
    ///
    /// # Errors
    /// `Error::Configuration` for a zero-area display or a zero step.
    pub fn start(
        image: ImageAsset,
        path: ScrollPath,
        size: (u32, u32),
        publisher: FramePublisher,
    ) -> Result<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(Error::configuration("scroller needs a non-zero display"));
        }
        if path.step.is_zero() {
            return Err(Error::configuration("scroller step must be positive"));
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let handle = std::thread::Builder::new()
            .name("scroller".into())
            .spawn(move || run(&image, &path, size, &publisher, &flag))
            .map_err(|e| Error::Other(anyhow!("spawn scroller: {e}")))?;

        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    /// Whether the scroll is still running.
    pub fn is_busy(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancels the scroll and waits for the thread. Returns the number of
    /// frames published.
    pub fn stop(&mut self) -> Result<u64> {
        self.cancel.store(true, Ordering::SeqCst);
        self.wait()
    }

    /// Waits for the scroll to reach its end point.
    pub fn join(mut self) -> Result<u64> {
        self.wait()
    }

    fn wait(&mut self) -> Result<u64> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Other(anyhow!("scroller panicked"))),
            None => Ok(0),
        }
    }
}

impl Drop for Scroller {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

fn run(
    image: &ImageAsset,
    path: &ScrollPath,
    size: (u32, u32),
    publisher: &FramePublisher,
    cancel: &AtomicBool,
) -> u64 {
    info!(from = ?path.start, to = ?path.end, duration = ?path.duration, "scroll started");
    let started = Instant::now();
    let mut published = 0;

    loop {
        let elapsed = started.elapsed();
        let done = elapsed >= path.duration;
        let frame = compose(image, path, size, path.position_at(elapsed));
        if publisher.publish(frame).is_err() {
            debug!("frame channel closed, scroll abandoned");
            break;
        }
        published += 1;
        if done || cancel.load(Ordering::SeqCst) {
            break;
        }

        let next = path.step * u32::try_from(published).unwrap_or(u32::MAX);
        if let Some(wait) = next.checked_sub(started.elapsed()) {
            std::thread::sleep(wait.min(path.duration.saturating_sub(started.elapsed())));
        }
    }

    info!(frames = published, "scroll finished");
    published
}

fn compose(image: &ImageAsset, path: &ScrollPath, size: (u32, u32), at: (i32, i32)) -> FrameBuffer {
    let mut frame = frame::transparent(size.0, size.1);
    frame::fill(&mut frame, path.background.opaque());
    paste_with_alpha_at(&mut frame, at.0, at.1, image.image());
    frame
}
