//! Grade bands

use std::fmt;

/// Letter grade with its performance comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeBand {
    pub letter: &'static str,
    pub comment: &'static str,
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.letter, self.comment)
    }
}

/// Lower bound (inclusive) of each band, best first. Anything below the
/// last bound fails.
const BANDS: [(f64, GradeBand); 5] = [
    (
        90.0,
        GradeBand {
            letter: "A+ (Excellent)",
            comment: "Outstanding performance!",
        },
    ),
    (
        80.0,
        GradeBand {
            letter: "A (Very Good)",
            comment: "Excellent work!",
        },
    ),
    (
        70.0,
        GradeBand {
            letter: "B (Good)",
            comment: "Good job! Keep improving.",
        },
    ),
    (
        60.0,
        GradeBand {
            letter: "C (Satisfactory)",
            comment: "Satisfactory. Room for improvement.",
        },
    ),
    (
        50.0,
        GradeBand {
            letter: "D (Pass)",
            comment: "You passed, but need to work harder.",
        },
    ),
];

const FAIL: GradeBand = GradeBand {
    letter: "F (Fail)",
    comment: "You need to focus more on your studies.",
};

/// Band for an average score out of 100.
pub fn grade_for(score: f64) -> GradeBand {
    BANDS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, band)| *band)
        .unwrap_or(FAIL)
}

/// Mean of subject marks; `None` when there are none.
pub fn average(marks: &[f64]) -> Option<f64> {
    if marks.is_empty() {
        None
    } else {
        Some(marks.iter().sum::<f64>() / marks.len() as f64)
    }
}
