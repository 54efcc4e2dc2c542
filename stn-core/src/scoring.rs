//! Scoring engine
//!
//! Reduces a probe into a 0-100 score and a letter grade. Both functions are
//! pure and total.

use serde::Serialize;

use crate::{OnionAvailability, ProbeResult};

/// HSTS max-age (seconds) that earns the long max-age bonus: 18 weeks
pub const HSTS_MIN_MAX_AGE: i64 = 18 * 7 * 24 * 60 * 60;

/// Baseline for valid HTTPS that does not downgrade
const BASE_NO_DOWNGRADE: u8 = 50;

/// Baseline for valid HTTPS that downgrades to HTTP
const BASE_DOWNGRADES: u8 = 30;

/// Baseline once HTTPS is the default; replaces the two above
const BASE_DEFAULTS: u8 = 70;

const BONUS_HSTS: u8 = 4;
const BONUS_MAX_AGE: u8 = 4;
const BONUS_ENTIRE_DOMAIN: u8 = 6;
const BONUS_PRELOAD_READY: u8 = 4;
const BONUS_PRELOADED: u8 = 4;
const BONUS_ONION: u8 = 4;

/// Compute the HTTPS quality score for a probe
///
/// # Panics
///
/// Panics if the result falls outside `0..=100`, which would mean the
/// constants above are inconsistent.
pub fn score(probe: &ProbeResult, onion: OnionAvailability) -> u8 {
    if !probe.valid_https {
        return 0;
    }

    let mut score = if probe.downgrades_https {
        BASE_DOWNGRADES
    } else {
        BASE_NO_DOWNGRADE
    };

    if probe.defaults_to_https {
        score = BASE_DEFAULTS;

        if probe.hsts {
            score += BONUS_HSTS;
        }
        if probe
            .hsts_max_age
            .is_some_and(|max_age| max_age >= HSTS_MIN_MAX_AGE)
        {
            score += BONUS_MAX_AGE;
        }
        if probe.hsts_entire_domain {
            score += BONUS_ENTIRE_DOMAIN;
        }
        if probe.hsts_preload_ready {
            score += BONUS_PRELOAD_READY;
        }
        if probe.hsts_preloaded {
            score += BONUS_PRELOADED;
        }
        if onion.is_available() {
            score += BONUS_ONION;
        }
    }

    assert!(score <= 100, "score must be between 0 and 100 (inclusive), is: {score}");
    score
}

/// Letter grade thresholds, highest first: (minimum score, letter)
const LETTERS: &[(u8, &str)] = &[
    (96, "A+"),
    (85, "A"),
    (80, "A-"),
    (75, "B+"),
    (65, "B"),
    (60, "B-"),
    (55, "C+"),
    (45, "C"),
    (40, "C-"),
    (35, "D+"),
    (25, "D"),
    (20, "D-"),
    (0, "F"),
];

/// Presentation class thresholds, highest first
const CLASSES: &[(u8, &str)] = &[
    (80, "grade-a"),
    (60, "grade-b"),
    (40, "grade-c"),
    (20, "grade-d"),
    (0, "grade-f"),
];

/// Letter grade and presentation class derived from a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grade {
    /// Letter, `A+` through `F`
    pub grade: &'static str,
    /// CSS class, `grade-a` through `grade-f`
    pub class_name: &'static str,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        Self {
            grade: lookup(LETTERS, score),
            class_name: lookup(CLASSES, score),
        }
    }
}

fn lookup(table: &[(u8, &'static str)], score: u8) -> &'static str {
    table
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, label)| *label)
        .unwrap_or("F")
}

/// Shorthand for [`Grade::from_score`]
pub fn grade(score: u8) -> Grade {
    Grade::from_score(score)
}
