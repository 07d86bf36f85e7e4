use serde::{Deserialize, Serialize};
use std::num::NonZeroU8;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("a wizard needs at least one step")]
    NoSteps,
    #[error("step {step} is outside 1..={total}")]
    OutOfRange { step: u8, total: u8 },
}

/// The multi-step flows driven by a [`StepWizard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardId {
    Onboarding,
    Booking,
    CheckIn,
}

/// Linear step counter; `current` always stays within `1..=total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWizard {
    current: u8,
    total: u8,
}

impl StepWizard {
    #[must_use]
    pub const fn new(total: NonZeroU8) -> Self {
        Self {
            current: 1,
            total: total.get(),
        }
    }

    pub fn try_new(total: u8) -> Result<Self, WizardError> {
        NonZeroU8::new(total).map(Self::new).ok_or(WizardError::NoSteps)
    }

    #[must_use]
    pub const fn current(self) -> u8 {
        self.current
    }

    #[must_use]
    pub const fn total(self) -> u8 {
        self.total
    }

    #[must_use]
    pub const fn is_first(self) -> bool {
        self.current == 1
    }

    #[must_use]
    pub const fn is_last(self) -> bool {
        self.current == self.total
    }

    /// Moves forward one step; returns false when already on the last step.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Moves back one step; returns false when already on the first step.
    pub fn back(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn go_to(&mut self, step: u8) -> Result<(), WizardError> {
        if step == 0 || step > self.total {
            return Err(WizardError::OutOfRange {
                step,
                total: self.total,
            });
        }
        self.current = step;
        Ok(())
    }

    pub fn restart(&mut self) {
        self.current = 1;
    }

    /// Fraction of steps completed, 0.0 on the first step and 1.0 on the last.
    #[must_use]
    pub fn progress(self) -> f64 {
        if self.total == 1 {
            return 1.0;
        }
        f64::from(self.current - 1) / f64::from(self.total - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wizard(total: u8) -> StepWizard {
        StepWizard::try_new(total).unwrap()
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert_eq!(StepWizard::try_new(0), Err(WizardError::NoSteps));
    }

    #[test]
    fn test_advance_stops_at_last() {
        let mut w = wizard(3);
        assert!(w.advance());
        assert!(w.advance());
        assert!(!w.advance());
        assert_eq!(w.current(), 3);
        assert!(w.is_last());
    }

    #[test]
    fn test_back_stops_at_first() {
        let mut w = wizard(3);
        assert!(!w.back());
        w.advance();
        assert!(w.back());
        assert!(w.is_first());
    }

    #[test]
    fn test_go_to_bounds() {
        let mut w = wizard(4);
        assert!(w.go_to(4).is_ok());
        assert_eq!(w.go_to(0), Err(WizardError::OutOfRange { step: 0, total: 4 }));
        assert_eq!(w.go_to(5), Err(WizardError::OutOfRange { step: 5, total: 4 }));
        assert_eq!(w.current(), 4);
    }

    #[test]
    fn test_progress() {
        let mut w = wizard(5);
        assert!((w.progress() - 0.0).abs() < f64::EPSILON);
        w.go_to(3).unwrap();
        assert!((w.progress() - 0.5).abs() < f64::EPSILON);
        assert!((wizard(1).progress() - 1.0).abs() < f64::EPSILON);
    }
}
