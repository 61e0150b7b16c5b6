//! Per-binding progress through a chord sequence
//!
//! Each chord of a binding has a [`Stage`]. The active chord is the first
//! one not yet consumed; every chord before it is `Consumed` and every
//! chord after it is `Idle`.

use serde::{Deserialize, Serialize};

use super::matcher;
use crate::binding::Binding;
use crate::keys::KeyState;

/// State of a single chord within a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Not pressed yet
    #[default]
    Idle,
    /// Currently held
    Satisfied,
    /// Pressed and fully released; the sequence has moved on
    Consumed,
}

/// What a single step did to a binding's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed that anyone needs to hear about
    Unchanged,
    /// An intermediate chord was just pressed
    Armed { chord: usize },
    /// An intermediate chord was released; the next one is now active
    Advanced { chord: usize },
    /// The final chord was just pressed
    Pressed,
    /// The final chord was released (fully, or partially when allowed)
    Released,
    /// An unrelated key broke the sequence; `release` is set when the
    /// final chord had already fired its press
    Aborted { release: bool },
}

/// Progress invariants that should never be violated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("every chord is consumed; no chord is active")]
    NoActiveChord,

    #[error("chord {index} is {stage:?} but comes after the active chord {active}")]
    StrayStage {
        index: usize,
        active: usize,
        stage: Stage,
    },
}

/// Stage of every chord in one binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    stages: Vec<Stage>,
}

impl Progress {
    pub fn new(chords: usize) -> Self {
        Self {
            stages: vec![Stage::Idle; chords],
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn reset(&mut self) {
        self.stages.fill(Stage::Idle);
    }

    #[cfg(test)]
    pub(crate) fn consumed(chords: usize) -> Self {
        Self {
            stages: vec![Stage::Consumed; chords],
        }
    }

    /// Index of the chord currently being evaluated
    pub fn active_index(&self) -> Result<usize, ProgressError> {
        let active = self
            .stages
            .iter()
            .position(|s| *s != Stage::Consumed)
            .ok_or(ProgressError::NoActiveChord)?;

        if let Some((offset, stage)) = self.stages[active + 1..]
            .iter()
            .enumerate()
            .find(|(_, s)| **s != Stage::Idle)
        {
            return Err(ProgressError::StrayStage {
                index: active + 1 + offset,
                active,
                stage: *stage,
            });
        }

        Ok(active)
    }

    /// Evaluate the active chord against the current key state
    pub fn step<K: KeyState + ?Sized>(
        &mut self,
        binding: &Binding,
        actuate_on_partial_release: bool,
        keys: &K,
    ) -> Result<Transition, ProgressError> {
        let index = self.active_index()?;
        let chord = &binding.chords()[index];
        let last = index + 1 == binding.len();

        if index > 0 && matcher::foreign_key_pressed(chord, keys) {
            let release = last && self.stages[index] == Stage::Satisfied;
            self.reset();
            return Ok(Transition::Aborted { release });
        }

        if matcher::is_matched(chord, keys) {
            let previous = std::mem::replace(&mut self.stages[index], Stage::Satisfied);
            return Ok(match (previous, last) {
                (Stage::Satisfied, _) => Transition::Unchanged,
                (_, true) => Transition::Pressed,
                (_, false) => Transition::Armed { chord: index },
            });
        }

        if self.stages[index] != Stage::Satisfied {
            return Ok(Transition::Unchanged);
        }

        let fully_released = matcher::all_released(chord, keys);
        if last {
            if fully_released || actuate_on_partial_release {
                self.reset();
                return Ok(Transition::Released);
            }
        } else if fully_released {
            self.stages[index] = Stage::Consumed;
            return Ok(Transition::Advanced { chord: index + 1 });
        }

        Ok(Transition::Unchanged)
    }
}
