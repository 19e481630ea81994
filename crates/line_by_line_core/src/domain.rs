//! crates/line_by_line_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type TextId = Uuid;
pub type LineId = Uuid;

/// Ease factor every new line starts with.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// A unit of study material, stored verbatim alongside its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub id: TextId,
    pub title: String,
    pub author: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Highest 0-based line number currently eligible for review.
    pub max_unlocked_line_number: u32,
}

/// A Text that has not been stored yet. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewText {
    pub title: String,
    pub author: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub max_unlocked_line_number: u32,
}

/// Partial update of a Text. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextChanges {
    pub title: Option<String>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub max_unlocked_line_number: Option<u32>,
}

impl TextChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.last_reviewed_at.is_none()
            && self.max_unlocked_line_number.is_none()
    }

    pub fn apply_to(&self, text: &mut Text) {
        if let Some(title) = &self.title {
            text.title = title.clone();
        }
        if let Some(at) = self.last_reviewed_at {
            text.last_reviewed_at = Some(at);
        }
        if let Some(max) = self.max_unlocked_line_number {
            text.max_unlocked_line_number = max;
        }
    }
}

/// One reviewable, non-blank line of a Text.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: LineId,
    pub text_id: TextId,
    pub line_number: u32,
    pub original_line_text: String,
    pub next_review_date: DateTime<Utc>,
    /// Spacing in whole days.
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub lapses: u32,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Number of trailing words hidden when the line is displayed.
    pub mask_level: u32,
}

impl Line {
    /// Whitespace-split word count of the source line.
    pub fn total_words(&self) -> u32 {
        self.original_line_text.split_whitespace().count() as u32
    }

    /// Highest mask level this line accepts; one word always stays visible.
    pub fn max_mask_level(&self) -> u32 {
        self.total_words().saturating_sub(1)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    pub fn is_reviewed(&self) -> bool {
        self.last_reviewed_at.is_some()
    }

    /// Replaces the mutable scheduling fields, leaving identity and source text alone.
    pub fn apply_schedule(&mut self, schedule: &LineSchedule) {
        self.repetitions = schedule.repetitions;
        self.interval = schedule.interval;
        self.ease_factor = schedule.ease_factor;
        self.lapses = schedule.lapses;
        self.mask_level = schedule.mask_level;
        self.next_review_date = schedule.next_review_date;
        self.last_reviewed_at = Some(schedule.last_reviewed_at);
    }
}

/// A Line awaiting bulk insertion. The owning Text is named by the write.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLine {
    pub line_number: u32,
    pub original_line_text: String,
    pub next_review_date: DateTime<Utc>,
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub lapses: u32,
    pub mask_level: u32,
}

impl NewLine {
    /// A fresh line: due immediately, never reviewed, fully visible.
    pub fn fresh(line_number: u32, original_line_text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            line_number,
            original_line_text: original_line_text.into(),
            next_review_date: now,
            interval: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            repetitions: 0,
            lapses: 0,
            mask_level: 0,
        }
    }

    pub fn into_line(self, id: LineId, text_id: TextId) -> Line {
        Line {
            id,
            text_id,
            line_number: self.line_number,
            original_line_text: self.original_line_text,
            next_review_date: self.next_review_date,
            interval: self.interval,
            ease_factor: self.ease_factor,
            repetitions: self.repetitions,
            lapses: self.lapses,
            last_reviewed_at: None,
            mask_level: self.mask_level,
        }
    }
}

/// Binary review outcome reported by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Remembered,
    Forgotten,
}

/// The mutable scheduling state of a Line after a review.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSchedule {
    pub repetitions: u32,
    pub interval: u32,
    pub ease_factor: f64,
    pub lapses: u32,
    pub mask_level: u32,
    pub next_review_date: DateTime<Utc>,
    pub last_reviewed_at: DateTime<Utc>,
}
