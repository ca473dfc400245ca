//! Fixed-interval frame loop.
//!
//! Provides [`Scheduler`] which owns the bindings and the frame target, steps
//! every binding once per frame in registration order and submits the result
//! to a [`DisplaySink`]. Frame pacing uses the host's monotonic clock while
//! animation time comes from the injected [`TimeSource`], so tests can drive
//! lifecycles with a hand-advanced clock.

use crate::binding::Binding;
use crate::command::SchedulerCommand;
use crate::config::{FPS_RANGE, SchedulerConfig};
use crate::error::{Error, Result};
use crate::frame::{self, FrameBuffer};
use crate::sink::{DisplaySink, SinkConfig};
use crate::time::TimeSource;
use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest sleep between display readiness polls.
const READY_POLL: Duration = Duration::from_millis(10);

/// Final stretch of each frame interval that is spun rather than slept.
const SPIN_MARGIN: Duration = Duration::from_millis(1);

/// Thread-safe handle for stopping or reconfiguring a scheduler.
///
/// Cheap to clone. Commands sent after the scheduler is dropped are ignored.
#[derive(Debug, Clone)]
pub struct SchedulerControl {
    running: Arc<AtomicBool>,
    commands: Sender<SchedulerCommand>,
}

impl SchedulerControl {
    /// Asks the loop to exit after the frame in flight.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.commands.send(SchedulerCommand::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Queues a reset of every binding. Returns `false` if the scheduler is gone.
    pub fn request_reset(&self) -> bool {
        self.commands.send(SchedulerCommand::Reset).is_ok()
    }

    /// Queues a frame rate change.
    ///
    /// # Errors
    /// `Error::Configuration` if `fps` is outside `1..=200`.
    pub fn request_fps(&self, fps: u32) -> Result<bool> {
        check_fps(fps)?;
        Ok(self.commands.send(SchedulerCommand::SetFps(fps)).is_ok())
    }
}

/// Owns the bindings and drives them at a fixed frame rate.
///
/// # Type Parameters
/// * `S` - The display the frames go to
/// * `T` - The clock animation units are stepped against
pub struct Scheduler<S: DisplaySink, T: TimeSource> {
    config: SchedulerConfig,
    sink: S,
    time: T,
    bindings: Vec<Binding>,
    frame: FrameBuffer,
    control: SchedulerControl,
    commands: Receiver<SchedulerCommand>,
    overrun_reported: bool,
    overruns: u64,
    frames: u64,
}

impl<S: DisplaySink, T: TimeSource> core::fmt::Debug for Scheduler<S, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("bindings", &self.bindings.len())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl<S: DisplaySink, T: TimeSource> Scheduler<S, T> {
    /// Validates `config` and initializes the display.
    ///
    /// # Errors
    /// `Error::Configuration` for an invalid config, or whatever `sink.init`
    /// returns.
    pub fn new(config: SchedulerConfig, mut sink: S, time: T) -> Result<Self> {
        config.validate()?;
        sink.init(&SinkConfig {
            width: config.width,
            height: config.height,
            fps: config.fps,
        })?;

        let (commands_tx, commands) = mpsc::channel();
        Ok(Self {
            frame: frame::transparent(config.width, config.height),
            config,
            sink,
            time,
            bindings: Vec::new(),
            control: SchedulerControl {
                running: Arc::new(AtomicBool::new(false)),
                commands: commands_tx,
            },
            commands,
            overrun_reported: false,
            overruns: 0,
            frames: 0,
        })
    }

    /// Registers a binding. Bindings are drawn in registration order, so later
    /// ones end up on top.
    pub fn add_binding(&mut self, binding: Binding) -> usize {
        self.bindings.push(binding);
        self.bindings.len() - 1
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// The most recently composed frame.
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Frames submitted so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Paced frames that took longer than one interval. Only the first is
    /// logged per run.
    pub fn overrun_count(&self) -> u64 {
        self.overruns
    }

    pub fn control(&self) -> SchedulerControl {
        self.control.clone()
    }

    /// Changes the frame rate of the loop and of every bound unit.
    ///
    /// # Errors
    /// `Error::Configuration` if `fps` is outside `1..=200`.
    pub fn set_fps(&mut self, fps: u32) -> Result<()> {
        check_fps(fps)?;
        for binding in &self.bindings {
            binding.set_fps(fps)?;
        }
        self.config.fps = fps;
        debug!(fps, "frame rate changed");
        Ok(())
    }

    /// Restarts every binding from its first unit.
    ///
    /// # Errors
    /// `Error::Resource` if a unit's images cannot be loaded.
    pub fn reset(&mut self) -> Result<()> {
        let now = self.time.now();
        for binding in &mut self.bindings {
            binding.reset(now)?;
        }
        debug!(bindings = self.bindings.len(), "scheduler reset");
        Ok(())
    }

    /// Applies a control command.
    pub fn handle_command(&mut self, command: SchedulerCommand) -> Result<()> {
        match command {
            SchedulerCommand::Reset => self.reset(),
            SchedulerCommand::SetFps(fps) => self.set_fps(fps),
            SchedulerCommand::Stop => {
                self.control.running.store(false, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    /// Composes one frame at the current animation time and submits it.
    ///
    /// # Errors
    /// Unit failures, or a display that rejects the frame.
    pub fn render_frame(&mut self) -> Result<()> {
        let now = self.time.now();
        frame::fill(&mut self.frame, self.config.background.opaque());
        for binding in &mut self.bindings {
            binding.next_frame(&mut self.frame, now)?;
        }
        self.sink.submit(&self.frame)?;
        self.frames += 1;
        Ok(())
    }

    /// Renders `count` frames back to back, without pacing or readiness
    /// polling. Pending commands are applied before each frame.
    pub fn render_frames(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.apply_commands()?;
            self.render_frame()?;
        }
        Ok(())
    }

    /// Runs the frame loop on the calling thread until stopped.
    ///
    /// The display is blanked to the background color on exit.
    ///
    /// # Errors
    /// `Error::SinkUnavailable` if the display is not ready within the
    /// configured timeout, and any unit or display failure.
    pub fn run(&mut self) -> Result<()> {
        self.control.running.store(true, Ordering::SeqCst);
        self.run_loop()
    }

    /// Moves the scheduler onto its own thread and starts the loop there.
    pub fn start(self) -> Result<SchedulerHandle<S, T>>
    where
        S: 'static,
        T: 'static,
    {
        let control = self.control();
        control.running.store(true, Ordering::SeqCst);

        let mut scheduler = self;
        let handle = std::thread::Builder::new()
            .name("scheduler".into())
            .spawn(move || {
                let result = scheduler.run_loop();
                (scheduler, result)
            })
            .map_err(|e| Error::Other(anyhow!("spawn scheduler: {e}")))?;

        Ok(SchedulerHandle { control, handle })
    }

    #[tracing::instrument(skip(self), fields(fps = self.config.fps, bindings = self.bindings.len()))]
    fn run_loop(&mut self) -> Result<()> {
        info!(width = self.config.width, height = self.config.height, "scheduler started");
        self.overrun_reported = false;

        let result = self.frame_loop();
        self.control.running.store(false, Ordering::SeqCst);

        if let Err(err) = self.sink.clear(self.config.background) {
            warn!(%err, "failed to blank display");
        }
        info!(frames = self.frames, "scheduler stopped");
        result
    }

    fn frame_loop(&mut self) -> Result<()> {
        while self.control.is_running() {
            let started = Instant::now();
            self.apply_commands()?;
            if !self.control.is_running() {
                break;
            }
            self.wait_until_ready()?;
            self.render_frame()?;
            self.pace(started);
        }
        Ok(())
    }

    fn apply_commands(&mut self) -> Result<()> {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command)?;
        }
        Ok(())
    }

    fn wait_until_ready(&self) -> Result<()> {
        if self.sink.is_ready() {
            return Ok(());
        }
        let timeout = self.config.ready_timeout();
        let deadline = Instant::now() + timeout;
        debug!(?timeout, "waiting for display");
        while !self.sink.is_ready() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                error!(?timeout, "display not ready, giving up");
                return Err(Error::SinkUnavailable(timeout));
            }
            std::thread::sleep(remaining.min(READY_POLL));
        }
        Ok(())
    }

    /// Holds the loop until one frame interval has passed since `started`.
    fn pace(&mut self, started: Instant) {
        let interval = self.config.frame_interval();
        let spent = started.elapsed();
        if spent > interval {
            self.overruns += 1;
            if !self.overrun_reported {
                warn!(?spent, ?interval, "frame overran its interval");
                self.overrun_reported = true;
            }
            return;
        }
        if let Some(coarse) = (interval - spent).checked_sub(SPIN_MARGIN) {
            std::thread::sleep(coarse);
        }
        let deadline = started + interval;
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// A scheduler running on its own thread.
#[derive(Debug)]
pub struct SchedulerHandle<S: DisplaySink, T: TimeSource> {
    control: SchedulerControl,
    handle: JoinHandle<(Scheduler<S, T>, Result<()>)>,
}

impl<S: DisplaySink, T: TimeSource> SchedulerHandle<S, T> {
    pub fn control(&self) -> SchedulerControl {
        self.control.clone()
    }

    /// Whether the loop has exited on its own, e.g. after a display failure.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the loop, waits for it and hands the scheduler back.
    ///
    /// # Errors
    /// The error that ended the loop, if any.
    pub fn stop(self) -> Result<Scheduler<S, T>> {
        self.control.stop();
        self.join()
    }

    /// Waits for the loop to exit without asking it to.
    pub fn join(self) -> Result<Scheduler<S, T>> {
        let (scheduler, result) = self
            .handle
            .join()
            .map_err(|_| Error::Other(anyhow!("scheduler thread panicked")))?;
        result.map(|()| scheduler)
    }
}

fn check_fps(fps: u32) -> Result<()> {
    if FPS_RANGE.contains(&fps) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "fps must be between 1 and 200, got {fps}"
        )))
    }
}
