//! Display sink abstraction.
//!
//! Provides the [`DisplaySink`] trait the scheduler submits frames to, and an
//! [`InMemorySink`] that records them for tests and headless simulation.

use crate::binding::lock;
use crate::colors::Color;
use crate::error::{Error, Result};
use crate::frame::{self, FrameBuffer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Frames an [`InMemorySink`] retains unless told otherwise.
pub const DEFAULT_KEPT_FRAMES: usize = 256;

/// Geometry and refresh rate handed to a sink before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Trait for abstracting display hardware or simulators.
///
/// Implement this for your panel driver, LED strip or window so the scheduler
/// can drive it. The scheduler calls [`init`](Self::init) once, then polls
/// [`is_ready`](Self::is_ready) before each frame.
pub trait DisplaySink: Send {
    /// Prepares the display. Must precede the first `submit`.
    fn init(&mut self, config: &SinkConfig) -> Result<()>;

    /// Whether the display can take a frame now.
    fn is_ready(&self) -> bool;

    /// Hands over a complete frame.
    ///
    /// Implementations should not block for longer than one refresh of the
    /// display.
    fn submit(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Fills the whole display with `background`.
    fn clear(&mut self, background: Color) -> Result<()>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn init(&mut self, config: &SinkConfig) -> Result<()> {
        (**self).init(config)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn submit(&mut self, frame: &FrameBuffer) -> Result<()> {
        (**self).submit(frame)
    }

    fn clear(&mut self, background: Color) -> Result<()> {
        (**self).clear(background)
    }
}

#[derive(Debug, Default)]
struct Recorded {
    config: Option<SinkConfig>,
    frames: VecDeque<FrameBuffer>,
    submitted: u64,
    clears: Vec<Color>,
}

impl Recorded {
    fn push(&mut self, frame: FrameBuffer, keep: usize) {
        while self.frames.len() >= keep {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }
}

/// Sink that keeps the most recent submitted frames in memory.
///
/// Clones share the same recording and ready flag, so a test can keep one
/// clone while the scheduler owns the other.
#[derive(Debug, Clone)]
pub struct InMemorySink {
    recorded: Arc<Mutex<Recorded>>,
    ready: Arc<AtomicBool>,
    keep: usize,
}

impl InMemorySink {
    /// Creates a ready sink that keeps the last [`DEFAULT_KEPT_FRAMES`]
    /// frames.
    pub fn new() -> Self {
        Self {
            recorded: Arc::default(),
            ready: Arc::new(AtomicBool::new(true)),
            keep: DEFAULT_KEPT_FRAMES,
        }
    }

    /// Keeps only the most recent `frames` frames.
    pub fn keep_last(mut self, frames: usize) -> Self {
        self.keep = frames.max(1);
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Geometry passed to `init`, if it was called.
    pub fn config(&self) -> Option<SinkConfig> {
        lock(&self.recorded).config
    }

    /// Frames currently retained.
    pub fn frame_count(&self) -> usize {
        lock(&self.recorded).frames.len()
    }

    /// Frames passed to `submit` since creation, retained or not.
    pub fn submitted(&self) -> u64 {
        lock(&self.recorded).submitted
    }

    pub fn frames(&self) -> Vec<FrameBuffer> {
        lock(&self.recorded).frames.iter().cloned().collect()
    }

    pub fn last_frame(&self) -> Option<FrameBuffer> {
        lock(&self.recorded).frames.back().cloned()
    }

    /// Background colors passed to `clear`, oldest first.
    pub fn clears(&self) -> Vec<Color> {
        lock(&self.recorded).clears.clone()
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for InMemorySink {
    fn init(&mut self, config: &SinkConfig) -> Result<()> {
        lock(&self.recorded).config = Some(*config);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn submit(&mut self, frame: &FrameBuffer) -> Result<()> {
        let mut recorded = lock(&self.recorded);
        let Some(config) = recorded.config else {
            return Err(Error::configuration("sink used before init"));
        };
        if frame.dimensions() != (config.width, config.height) {
            return Err(Error::configuration(format!(
                "frame is {:?}, sink expects {}x{}",
                frame.dimensions(),
                config.width,
                config.height
            )));
        }
        recorded.submitted += 1;
        recorded.push(frame.clone(), self.keep);
        Ok(())
    }

    fn clear(&mut self, background: Color) -> Result<()> {
        let mut recorded = lock(&self.recorded);
        recorded.clears.push(background);
        if let Some(config) = recorded.config {
            let mut blank = frame::transparent(config.width, config.height);
            frame::fill(&mut blank, background.opaque());
            recorded.push(blank, self.keep);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors;
    use image::Rgba;

    fn config() -> SinkConfig {
        SinkConfig {
            width: 2,
            height: 2,
            fps: 30,
        }
    }

    #[test]
    fn submit_requires_init() {
        let mut sink = InMemorySink::new();
        let frame = frame::transparent(2, 2);
        assert!(matches!(sink.submit(&frame), Err(Error::Configuration(_))));
        sink.init(&config()).unwrap();
        sink.submit(&frame).unwrap();
        assert_eq!(sink.frame_count(), 1);
    }

    #[test]
    fn submit_rejects_wrong_size() {
        let mut sink = InMemorySink::new();
        sink.init(&config()).unwrap();
        assert!(sink.submit(&frame::transparent(3, 2)).is_err());
        assert_eq!(sink.frame_count(), 0);
    }

    #[test]
    fn clones_share_recording() {
        let observer = InMemorySink::new().keep_last(2);
        let mut sink = observer.clone();
        sink.init(&config()).unwrap();
        for _ in 0..5 {
            sink.submit(&frame::transparent(2, 2)).unwrap();
        }
        assert_eq!(observer.frame_count(), 2);
        assert_eq!(observer.submitted(), 5);

        observer.set_ready(false);
        assert!(!sink.is_ready());
    }

    #[test]
    fn default_sink_is_bounded() {
        let mut sink = InMemorySink::new();
        sink.init(&config()).unwrap();
        for _ in 0..DEFAULT_KEPT_FRAMES + 10 {
            sink.submit(&frame::transparent(2, 2)).unwrap();
        }
        assert_eq!(sink.frame_count(), DEFAULT_KEPT_FRAMES);
        assert_eq!(sink.submitted(), DEFAULT_KEPT_FRAMES as u64 + 10);
    }

    #[test]
    fn clear_records_background_frame() {
        let mut sink = InMemorySink::new();
        sink.init(&config()).unwrap();
        sink.clear(colors::BLUE).unwrap();
        assert_eq!(sink.clears(), vec![colors::BLUE]);
        let last = sink.last_frame().unwrap();
        assert_eq!(*last.get_pixel(1, 1), Rgba([0, 0, 255, 255]));
    }
}
