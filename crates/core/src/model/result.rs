use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestResultError {
    #[error("a result needs at least one question")]
    EmptyTotal,

    #[error("score ({score}) exceeds total ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

/// Outcome of one completed session, as kept in the history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    date: NaiveDate,
    score: u32,
    total: u32,
    passed: bool,
    time_taken_secs: u32,
}

impl TestResult {
    /// # Errors
    ///
    /// Returns `TestResultError::EmptyTotal` for a zero total and
    /// `TestResultError::ScoreExceedsTotal` when `score > total`.
    pub fn new(
        date: NaiveDate,
        score: u32,
        total: u32,
        passed: bool,
        time_taken_secs: u32,
    ) -> Result<Self, TestResultError> {
        if total == 0 {
            return Err(TestResultError::EmptyTotal);
        }
        if score > total {
            return Err(TestResultError::ScoreExceedsTotal { score, total });
        }
        Ok(Self {
            date,
            score,
            total,
            passed,
            time_taken_secs,
        })
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> u32 {
        self.time_taken_secs
    }

    /// Fraction of questions answered correctly, in `[0, 1]`.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        f64::from(self.score) / f64::from(self.total)
    }
}

/// Aggregates shown on the progress dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub tests_taken: usize,
    pub tests_passed: usize,
    /// Share of passed tests, rounded to a whole percent.
    pub pass_rate_percent: u32,
    /// Mean of per-test `score / total`, rounded to a whole percent.
    pub average_score_percent: u32,
}

impl HistoryStats {
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let taken = results.len();
        let passed = results.iter().filter(|r| r.passed()).count();
        #[allow(clippy::cast_precision_loss)]
        let count = taken as f64;
        #[allow(clippy::cast_precision_loss)]
        let pass_rate = passed as f64 / count;
        let average = results.iter().map(TestResult::ratio).sum::<f64>() / count;

        Self {
            tests_taken: taken,
            tests_passed: passed,
            pass_rate_percent: to_percent(pass_rate),
            average_score_percent: to_percent(average),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(ratio: f64) -> u32 {
    (ratio * 100.0).round().clamp(0.0, 100.0) as u32
}
