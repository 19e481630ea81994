//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the client and the REST API.

use chrono::{DateTime, Utc};
use line_by_line_core::domain::{Line, ReviewOutcome, Text};
use line_by_line_core::masking::masked_text;
use line_by_line_core::ReviewReport;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Payloads Sent FROM the Client TO the Server
//=========================================================================================

/// Body of `POST /texts`.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateTextRequest {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    pub content: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Remembered,
    Forgotten,
}

impl From<Outcome> for ReviewOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Remembered => ReviewOutcome::Remembered,
            Outcome::Forgotten => ReviewOutcome::Forgotten,
        }
    }
}

/// Body of `POST /texts/{id}/lines/{line_id}/review`.
#[derive(Deserialize, Debug, ToSchema)]
pub struct ReviewRequest {
    pub outcome: Outcome,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct CreateTextResponse {
    pub text_id: Uuid,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TextView {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub max_unlocked_line_number: u32,
}

impl From<Text> for TextView {
    fn from(text: Text) -> Self {
        Self {
            id: text.id,
            title: text.title,
            author: text.author,
            content: text.content,
            created_at: text.created_at,
            last_reviewed_at: text.last_reviewed_at,
            max_unlocked_line_number: text.max_unlocked_line_number,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct LineView {
    pub id: Uuid,
    pub text_id: Uuid,
    pub line_number: u32,
    pub original_line_text: String,
    /// The line with its trailing `mask_level` words blanked out.
    pub display_text: String,
    pub next_review_date: DateTime<Utc>,
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub lapses: u32,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub mask_level: u32,
}

impl From<Line> for LineView {
    fn from(line: Line) -> Self {
        let display_text = masked_text(&line);
        Self {
            id: line.id,
            text_id: line.text_id,
            line_number: line.line_number,
            original_line_text: line.original_line_text,
            display_text,
            next_review_date: line.next_review_date,
            interval: line.interval,
            ease_factor: line.ease_factor,
            repetitions: line.repetitions,
            lapses: line.lapses,
            last_reviewed_at: line.last_reviewed_at,
            mask_level: line.mask_level,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ReviewResponse {
    pub line: LineView,
    pub unlocked_line_number: Option<u32>,
}

impl From<ReviewReport> for ReviewResponse {
    fn from(report: ReviewReport) -> Self {
        Self {
            line: report.line.into(),
            unlocked_line_number: report.unlocked_line_number,
        }
    }
}
