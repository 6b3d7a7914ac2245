use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExamSettingsError {
    #[error("exam size must be > 0")]
    InvalidExamSize,

    #[error("exam duration must be > 0 seconds")]
    InvalidDuration,

    #[error("pass threshold must be in (0, 1], got {0}")]
    InvalidPassThreshold(f64),
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// Untimed, optionally filtered by topic, with feedback after each answer.
    Practice,
    /// Timed run over a random draw, graded pass/fail at the end.
    MockTest,
}

impl SessionMode {
    #[must_use]
    pub fn is_timed(self) -> bool {
        matches!(self, SessionMode::MockTest)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Practice => f.write_str("practice"),
            SessionMode::MockTest => f.write_str("mock test"),
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables for exam length, timing and grading.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSettings {
    exam_size: u32,
    exam_duration_secs: u32,
    pass_threshold: f64,
    persist_practice: bool,
}

impl ExamSettings {
    pub const DEFAULT_EXAM_SIZE: u32 = 50;
    pub const DEFAULT_DURATION_SECS: u32 = 57 * 60;
    /// 43 correct out of 50.
    pub const DEFAULT_PASS_THRESHOLD: f64 = 0.86;

    /// Creates custom exam settings.
    ///
    /// # Errors
    ///
    /// Returns `ExamSettingsError` if the size or duration is zero, or the threshold
    /// is not a finite number in `(0, 1]`.
    pub fn new(
        exam_size: u32,
        exam_duration_secs: u32,
        pass_threshold: f64,
        persist_practice: bool,
    ) -> Result<Self, ExamSettingsError> {
        if exam_size == 0 {
            return Err(ExamSettingsError::InvalidExamSize);
        }
        if exam_duration_secs == 0 {
            return Err(ExamSettingsError::InvalidDuration);
        }
        if !pass_threshold.is_finite() || pass_threshold <= 0.0 || pass_threshold > 1.0 {
            return Err(ExamSettingsError::InvalidPassThreshold(pass_threshold));
        }
        Ok(Self {
            exam_size,
            exam_duration_secs,
            pass_threshold,
            persist_practice,
        })
    }

    #[must_use]
    pub fn exam_size(&self) -> u32 {
        self.exam_size
    }

    #[must_use]
    pub fn exam_duration_secs(&self) -> u32 {
        self.exam_duration_secs
    }

    #[must_use]
    pub fn pass_threshold(&self) -> f64 {
        self.pass_threshold
    }

    /// Whether finished practice runs are written to the history log too.
    #[must_use]
    pub fn persist_practice(&self) -> bool {
        self.persist_practice
    }

    /// Smallest passing score for a session of `total` questions:
    /// `ceil(total * pass_threshold)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pass_mark(&self, total: u32) -> u32 {
        // 50 * 0.86 can land a hair above 43.0 in binary floating point.
        let raw = f64::from(total) * self.pass_threshold - 1e-9;
        raw.ceil().max(0.0) as u32
    }

    #[must_use]
    pub fn is_pass(&self, score: u32, total: u32) -> bool {
        score >= self.pass_mark(total)
    }
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            exam_size: Self::DEFAULT_EXAM_SIZE,
            exam_duration_secs: Self::DEFAULT_DURATION_SECS,
            pass_threshold: Self::DEFAULT_PASS_THRESHOLD,
            persist_practice: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pass_mark_matches_forty_three_of_fifty() {
        let settings = ExamSettings::default();
        assert_eq!(settings.pass_mark(50), 43);
        assert!(settings.is_pass(43, 50));
        assert!(!settings.is_pass(42, 50));
    }

    #[test]
    fn short_exam_needs_every_answer() {
        let settings = ExamSettings::default();
        assert_eq!(settings.pass_mark(5), 5);
        assert!(!settings.is_pass(4, 5));
        assert!(settings.is_pass(5, 5));
    }

    #[test]
    fn validates_threshold_range() {
        assert!(matches!(
            ExamSettings::new(5, 60, 0.0, false),
            Err(ExamSettingsError::InvalidPassThreshold(_))
        ));
        assert!(matches!(
            ExamSettings::new(5, 60, 1.5, false),
            Err(ExamSettingsError::InvalidPassThreshold(_))
        ));
        assert!(matches!(
            ExamSettings::new(5, 60, f64::NAN, false),
            Err(ExamSettingsError::InvalidPassThreshold(_))
        ));
        assert_eq!(
            ExamSettings::new(0, 60, 0.5, false),
            Err(ExamSettingsError::InvalidExamSize)
        );
        assert_eq!(ExamSettings::new(1, 1, 1.0, true).unwrap().pass_mark(1), 1);
    }
}
