use crate::animation::AnimationUnit;
use crate::config::UnitSpec;
use crate::error::{Result, SequenceError};
use tracing::debug;

/// A non-empty, ordered list of animation units with a cyclic cursor.
///
/// Each unit plays until its duration expires, then the owning binding asks
/// for the next one. After the last unit the cursor wraps to the first.
#[derive(Debug)]
pub struct AnimSequence {
    units: Vec<AnimationUnit>,
    next: usize,
}

impl AnimSequence {
    /// Creates a sequence from units in play order.
    ///
    /// # Errors
    /// `SequenceError::EmptySequence` if `units` is empty.
    pub fn new(units: Vec<AnimationUnit>) -> core::result::Result<Self, SequenceError> {
        if units.is_empty() {
            return Err(SequenceError::EmptySequence);
        }
        Ok(Self { units, next: 0 })
    }

    /// Creates a new sequence builder.
    pub fn builder() -> SequenceBuilder {
        SequenceBuilder::new()
    }

    /// Builds every unit from its spec.
    ///
    /// # Errors
    /// The first configuration error of any spec, or
    /// `SequenceError::EmptySequence` for an empty list.
    pub fn from_specs(specs: &[UnitSpec]) -> Result<Self> {
        let units = specs.iter().map(UnitSpec::build).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(units)?)
    }

    /// Parses a JSON array of unit specs and builds the sequence.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_specs(&UnitSpec::list_from_json(json)?)
    }

    /// Returns the number of units in this sequence.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Always false: construction rejects empty sequences.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the index of the unit that plays next and advances the cursor.
    pub fn next_index(&mut self) -> usize {
        let index = self.next;
        self.next = (self.next + 1) % self.units.len();
        debug!(index, unit = %self.units[index].name(), "next animation");
        index
    }

    /// Returns the unit that plays next and advances the cursor.
    pub fn next_animation(&mut self) -> &mut AnimationUnit {
        let index = self.next_index();
        &mut self.units[index]
    }

    pub fn unit(&self, index: usize) -> Option<&AnimationUnit> {
        self.units.get(index)
    }

    pub fn unit_mut(&mut self, index: usize) -> Option<&mut AnimationUnit> {
        self.units.get_mut(index)
    }

    pub fn units(&self) -> &[AnimationUnit] {
        &self.units
    }

    /// Moves the cursor back to the first unit and restarts every unit's
    /// palette cycle.
    pub fn rewind(&mut self) {
        self.next = 0;
        for unit in &mut self.units {
            unit.rewind_palette();
        }
    }

    /// Changes the frame rate of every unit.
    ///
    /// # Errors
    /// `Error::Configuration` if `fps` is outside `1..=200`; no unit is
    /// changed in that case.
    pub fn set_fps(&mut self, fps: u32) -> Result<()> {
        for unit in &mut self.units {
            unit.set_fps(fps)?;
        }
        Ok(())
    }
}

/// Builder for constructing validated sequences.
#[derive(Debug, Default)]
pub struct SequenceBuilder {
    units: Vec<AnimationUnit>,
}

impl SequenceBuilder {
    /// Creates a new empty sequence builder.
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Appends a unit to the play order.
    pub fn unit(mut self, unit: AnimationUnit) -> Self {
        self.units.push(unit);
        self
    }

    /// Builds and validates the sequence.
    ///
    /// # Errors
    /// * `EmptySequence` - No units were added
    pub fn build(self) -> core::result::Result<AnimSequence, SequenceError> {
        AnimSequence::new(self.units)
    }
}
