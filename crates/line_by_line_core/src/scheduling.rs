//! crates/line_by_line_core/src/scheduling.rs
//!
//! Review-outcome transition: a simplified SM-2 variant with a binary
//! remembered/forgotten outcome and progressive masking of trailing words.
//!
//! The branch thresholds and constants are deliberate and differ from
//! textbook SM-2: the ease factor only moves on a lapse, and the second
//! successful repetition uses a fixed formula instead of a 6-day step.

use chrono::{DateTime, Days, Utc};

use crate::domain::{Line, LineSchedule, ReviewOutcome};

/// Shortest spacing between reviews, in days.
pub const MIN_INTERVAL: u32 = 1;

/// Ease factor floor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor penalty applied on every lapse.
pub const LAPSE_EASE_PENALTY: f64 = 0.2;

/// Computes the next scheduling state of `line` for the given outcome.
///
/// Pure and total: the result depends only on the arguments.
pub fn calculate_next_review(line: &Line, outcome: ReviewOutcome, now: DateTime<Utc>) -> LineSchedule {
    let mut repetitions = line.repetitions;
    let mut interval = line.interval;
    let mut ease_factor = line.ease_factor;
    let mut lapses = line.lapses;
    let mut mask_level = line.mask_level;

    match outcome {
        ReviewOutcome::Remembered => {
            repetitions = repetitions.saturating_add(1);
            interval = match repetitions {
                1 => MIN_INTERVAL,
                2 => {
                    let step = if ease_factor > 1.5 { 2.5 } else { 1.5 };
                    scale_interval(MIN_INTERVAL, step)
                }
                _ => scale_interval(interval, ease_factor),
            };
            mask_level = mask_level.saturating_add(1).min(line.max_mask_level());
        }
        ReviewOutcome::Forgotten => {
            repetitions = 0;
            lapses = lapses.saturating_add(1);
            interval = MIN_INTERVAL;
            ease_factor = (ease_factor - LAPSE_EASE_PENALTY).max(MIN_EASE_FACTOR);
            mask_level = 0;
        }
    }

    LineSchedule {
        repetitions,
        interval,
        ease_factor,
        lapses,
        mask_level,
        next_review_date: add_days(now, interval),
        last_reviewed_at: now,
    }
}

/// `max(MIN_INTERVAL, round(interval * factor))`, saturating at `u32::MAX`.
fn scale_interval(interval: u32, factor: f64) -> u32 {
    let scaled = (f64::from(interval) * factor).round();
    if scaled.is_nan() || scaled < f64::from(MIN_INTERVAL) {
        MIN_INTERVAL
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Calendar-day addition. Dates past chrono's range clamp to the maximum.
pub fn add_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
