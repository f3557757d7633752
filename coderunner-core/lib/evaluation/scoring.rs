use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Marks a task is worth when none are given.
pub const DEFAULT_TASK_MARKS: f64 = 10.0;

/// Share of the final score earned by test cases when structural constraints are also present.
pub const TEST_CASE_WEIGHT: f64 = 0.7;

/// Share of the final score earned by structural constraints when test cases are also present.
pub const STRUCTURAL_WEIGHT: f64 = 0.3;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Pass/fail tally of a set of checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    /// Fraction passed, `0.0` when there are no checks.
    pub score: f64,

    /// Number of checks.
    pub total: usize,

    /// Number passed.
    pub passed: usize,

    /// Number failed.
    pub failed: usize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Tally {
    /// Tallies pass/fail outcomes.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = bool>) -> Self {
        let (total, passed) = outcomes
            .into_iter()
            .fold((0, 0), |(total, passed), ok| (total + 1, passed + ok as usize));

        Self {
            score: if total > 0 {
                passed as f64 / total as f64
            } else {
                0.0
            },
            total,
            passed,
            failed: total - passed,
        }
    }

    /// Whether there was anything to check.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Combines test case and structural results into a score out of `max_score`, rounded to one
/// decimal.
///
/// When both kinds of checks are present they are weighted 70/30. When only one is present it
/// carries the whole score; when neither is, the score is zero.
pub fn final_score(tests: &Tally, structure: &Tally, max_score: f64) -> f64 {
    let fraction = match (tests.is_empty(), structure.is_empty()) {
        (false, true) => tests.score,
        (true, false) => structure.score,
        (false, false) => tests.score * TEST_CASE_WEIGHT + structure.score * STRUCTURAL_WEIGHT,
        (true, true) => return 0.0,
    };
    round_tenths(fraction * max_score)
}

/// Rounds to one decimal place.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
