//! Command-based control for a running scheduler.

/// Requests a [`SchedulerControl`](crate::scheduler::SchedulerControl) can
/// queue for the frame loop. They are applied at the top of the next
/// iteration, before the display is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Re-initialize every binding.
    Reset,
    /// Change the frame rate of the loop and of every unit.
    SetFps(u32),
    /// Leave the loop after the current iteration.
    Stop,
}
