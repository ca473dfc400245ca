//! Bindings pair a sequence of animation units with an optional pixel chain.
//!
//! Sequences and chains are held through shared handles so the same chain can
//! be driven by several bindings, and so callers keep access to both after the
//! scheduler is gone.

use crate::animation::{AnimationUnit, FrameOutcome};
use crate::chain::PixelChain;
use crate::error::{Error, Result};
use crate::frame::FrameBuffer;
use crate::sequence::AnimSequence;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Sequence handle shared between bindings and the caller.
pub type SharedSequence = Arc<Mutex<AnimSequence>>;

/// Chain handle shared between bindings and the caller.
pub type SharedChain = Arc<Mutex<PixelChain>>;

pub fn shared_sequence(sequence: AnimSequence) -> SharedSequence {
    Arc::new(Mutex::new(sequence))
}

pub fn shared_chain(chain: PixelChain) -> SharedChain {
    Arc::new(Mutex::new(chain))
}

/// Locks a shared handle. A panic on another thread does not leave the pixel
/// data in a state worth refusing.
pub(crate) fn lock<T>(handle: &Mutex<T>) -> MutexGuard<'_, T> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One layer stack registered with the scheduler.
///
/// The binding remembers which unit of its sequence is playing. When that
/// unit reports [`FrameOutcome::DurationExpired`], the binding takes the next
/// unit from the sequence, resets it and plays it in the same frame.
///
/// Bindings sharing one sequence also share its cursor, so they take turns
/// drawing units from it.
#[derive(Debug)]
pub struct Binding {
    sequence: SharedSequence,
    chain: Option<SharedChain>,
    current: Option<usize>,
}

impl Binding {
    pub fn new(sequence: SharedSequence) -> Self {
        Self {
            sequence,
            chain: None,
            current: None,
        }
    }

    pub fn with_chain(sequence: SharedSequence, chain: SharedChain) -> Self {
        Self {
            sequence,
            chain: Some(chain),
            current: None,
        }
    }

    pub fn sequence(&self) -> &SharedSequence {
        &self.sequence
    }

    pub fn chain(&self) -> Option<&SharedChain> {
        self.chain.as_ref()
    }

    /// Index of the playing unit, `None` before the first frame.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Restarts the binding from the first unit of its sequence.
    pub fn reset(&mut self, now: Duration) -> Result<()> {
        let mut sequence = lock(&self.sequence);
        sequence.rewind();
        let index = sequence.next_index();
        unit_at(&mut sequence, index)?.reset(now)?;
        self.current = Some(index);
        Ok(())
    }

    /// Steps the playing unit to `now` and draws it onto `frame`.
    ///
    /// Expired units are replaced until one plays or every unit of the
    /// sequence has been tried; in the latter case nothing is drawn and
    /// `DurationExpired` is returned.
    ///
    /// # Errors
    /// Effect failures and image load failures of the playing unit.
    pub fn next_frame(&mut self, frame: &mut FrameBuffer, now: Duration) -> Result<FrameOutcome> {
        let mut sequence = lock(&self.sequence);
        let mut chain = self.chain.as_deref().map(lock);

        let mut index = match self.current {
            Some(index) => index,
            None => {
                let index = sequence.next_index();
                self.current = Some(index);
                index
            }
        };

        for _ in 0..=sequence.len() {
            let unit = unit_at(&mut sequence, index)?;
            let outcome = unit.next_frame(now, chain.as_deref_mut())?;
            if !outcome.is_expired() {
                unit.render(frame, chain.as_deref());
                return Ok(outcome);
            }

            index = sequence.next_index();
            debug!(index, "switching animation");
            unit_at(&mut sequence, index)?.reset(now)?;
            self.current = Some(index);
        }
        Ok(FrameOutcome::DurationExpired)
    }

    /// Changes the frame rate of every unit in the sequence.
    pub fn set_fps(&self, fps: u32) -> Result<()> {
        lock(&self.sequence).set_fps(fps)
    }
}

fn unit_at(sequence: &mut AnimSequence, index: usize) -> Result<&mut AnimationUnit> {
    let len = sequence.len();
    sequence.unit_mut(index).ok_or(Error::Range { index, len })
}
