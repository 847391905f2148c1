//! Discrete step clock.
//!
//! The clock counts completed steps. Step 0 is the initial condition; the
//! first executed step is step 1. All arithmetic is checked.

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Step counter would overflow.
    #[error("step counter overflow: cannot advance beyond u64::MAX")]
    StepOverflow,
}

/// Counts completed simulation steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepClock {
    /// Last completed step (0 before the first step runs).
    step: u64,
}

impl StepClock {
    /// A clock at step 0.
    pub const fn new() -> Self {
        Self { step: 0 }
    }

    /// A clock resumed at `step` (useful for tests).
    pub const fn from_step(step: u64) -> Self {
        Self { step }
    }

    /// The number of the step that would run next, without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::StepOverflow`] if the counter is exhausted.
    pub fn peek_next(&self) -> Result<u64, ClockError> {
        self.step.checked_add(1).ok_or(ClockError::StepOverflow)
    }

    /// Advance by one step. Returns the new step number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::StepOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.step = self.peek_next()?;
        Ok(self.step)
    }

    /// Last completed step.
    pub const fn step(&self) -> u64 {
        self.step
    }
}
