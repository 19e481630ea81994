//! crates/line_by_line_core/src/progression.rs
//!
//! Line-unlock progression and the review loop built on top of it.
//!
//! A Text admits its lines one at a time: only lines up to
//! `max_unlocked_line_number` are eligible. Due lines beyond the gate never
//! appear in the review queue, even though the base due query returns them.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{Line, LineId, ReviewOutcome, Text, TextChanges, TextId};
use crate::error::{CoreError, CoreResult};
use crate::ports::{LineFilter, LineOrder, RecordStore};
use crate::scheduling::calculate_next_review;
use crate::selector::all_lines;

/// What a recorded review changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReport {
    pub line: Line,
    /// The Text's new unlock maximum, when the review admitted another line.
    pub unlocked_line_number: Option<u32>,
}

async fn require_text(store: &dyn RecordStore, text_id: TextId) -> CoreResult<Text> {
    store
        .get_text(text_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Text {} not found", text_id)))
}

/// Due lines within the unlock gate, ascending by line number.
pub async fn reviewable_lines(
    store: &dyn RecordStore,
    text_id: TextId,
    now: DateTime<Utc>,
) -> CoreResult<Vec<Line>> {
    let text = require_text(store, text_id).await?;
    let filter = LineFilter::for_text(text_id)
        .due_at_or_before(now)
        .up_to_line(text.max_unlocked_line_number);
    Ok(store.get_lines(filter, LineOrder::LineNumberAsc).await?)
}

/// Whether every unlocked line has been reviewed and none of them is due.
pub fn unlock_ready(unlocked: &[Line], now: DateTime<Utc>) -> bool {
    unlocked
        .iter()
        .all(|line| line.is_reviewed() && !line.is_due(now))
}

/// Admits the next line into rotation when the unlocked ones are settled.
///
/// Advances by exactly one and never past the last line. Returns the new
/// maximum if it moved.
pub async fn advance_unlock(
    store: &dyn RecordStore,
    text_id: TextId,
    now: DateTime<Utc>,
) -> CoreResult<Option<u32>> {
    let text = require_text(store, text_id).await?;
    let lines = all_lines(store, text_id).await?;
    let line_count = lines.len() as u64;
    let current = text.max_unlocked_line_number;

    if u64::from(current) + 1 >= line_count {
        return Ok(None);
    }

    let unlocked: Vec<Line> = lines
        .into_iter()
        .filter(|line| line.line_number <= current)
        .collect();
    if !unlock_ready(&unlocked, now) {
        return Ok(None);
    }

    let next = current + 1;
    store
        .update_text(
            text_id,
            TextChanges {
                max_unlocked_line_number: Some(next),
                ..TextChanges::default()
            },
        )
        .await?;
    info!(%text_id, max_unlocked_line_number = next, "Unlocked next line");
    Ok(Some(next))
}

/// Applies a review outcome to one line of a Text and persists the result.
///
/// The Text's `last_reviewed_at` is bumped and unlock progression is
/// re-evaluated afterwards, as a separate update.
pub async fn record_review(
    store: &dyn RecordStore,
    text_id: TextId,
    line_id: LineId,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
) -> CoreResult<ReviewReport> {
    let text = require_text(store, text_id).await?;
    let mut line = all_lines(store, text_id)
        .await?
        .into_iter()
        .find(|line| line.id == line_id)
        .ok_or_else(|| CoreError::NotFound(format!("Line {} not found in text {}", line_id, text_id)))?;

    if line.line_number > text.max_unlocked_line_number {
        return Err(CoreError::Validation(format!(
            "line {} is still locked",
            line.line_number
        )));
    }

    let schedule = calculate_next_review(&line, outcome, now);
    line.apply_schedule(&schedule);
    store.update_line(&line).await?;
    debug!(
        %line_id,
        ?outcome,
        interval = line.interval,
        mask_level = line.mask_level,
        "Review recorded"
    );

    store
        .update_text(
            text_id,
            TextChanges {
                last_reviewed_at: Some(now),
                ..TextChanges::default()
            },
        )
        .await?;

    let unlocked_line_number = advance_unlock(store, text_id, now).await?;
    Ok(ReviewReport {
        line,
        unlocked_line_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::ingest_text;
    use crate::memory::InMemoryRecordStore;
    use crate::selector::due_lines;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 27, 18, 0, 0).unwrap()
    }

    async fn three_line_text(store: &InMemoryRecordStore) -> TextId {
        ingest_text(store, "Ode", None, "first line here\nsecond line\nthird", now())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_queue_is_gated_by_unlock() {
        let store = InMemoryRecordStore::new();
        let text_id = three_line_text(&store).await;

        assert_eq!(due_lines(&store, text_id, now()).await.unwrap().len(), 3);
        let queue = reviewable_lines(&store, text_id, now()).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].line_number, 0);
    }

    #[tokio::test]
    async fn test_review_unlocks_next_line() {
        let store = InMemoryRecordStore::new();
        let text_id = three_line_text(&store).await;
        let first = reviewable_lines(&store, text_id, now()).await.unwrap().remove(0);

        let report = record_review(&store, text_id, first.id, ReviewOutcome::Remembered, now())
            .await
            .unwrap();

        assert_eq!(report.line.repetitions, 1);
        assert_eq!(report.line.next_review_date, now() + Duration::days(1));
        assert_eq!(report.unlocked_line_number, Some(1));

        let text = store.get_text(text_id).await.unwrap().unwrap();
        assert_eq!(text.max_unlocked_line_number, 1);
        assert_eq!(text.last_reviewed_at, Some(now()));

        let queue = reviewable_lines(&store, text_id, now()).await.unwrap();
        let numbers: Vec<u32> = queue.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![1]);
    }

    #[tokio::test]
    async fn test_no_unlock_while_unlocked_line_is_unreviewed() {
        let store = InMemoryRecordStore::new();
        let text_id = three_line_text(&store).await;

        assert_eq!(advance_unlock(&store, text_id, now()).await.unwrap(), None);
        let text = store.get_text(text_id).await.unwrap().unwrap();
        assert_eq!(text.max_unlocked_line_number, 0);
    }

    #[tokio::test]
    async fn test_unlock_stops_at_last_line() {
        let store = InMemoryRecordStore::new();
        let text_id = ingest_text(&store, "Short", None, "only one", now()).await.unwrap();
        let line = reviewable_lines(&store, text_id, now()).await.unwrap().remove(0);

        let report = record_review(&store, text_id, line.id, ReviewOutcome::Remembered, now())
            .await
            .unwrap();
        assert_eq!(report.unlocked_line_number, None);
        let text = store.get_text(text_id).await.unwrap().unwrap();
        assert_eq!(text.max_unlocked_line_number, 0);
    }

    #[tokio::test]
    async fn test_locked_line_cannot_be_reviewed() {
        let store = InMemoryRecordStore::new();
        let text_id = three_line_text(&store).await;
        let locked = all_lines(&store, text_id).await.unwrap().remove(2);

        let result = record_review(&store, text_id, locked.id, ReviewOutcome::Remembered, now()).await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_review_of_unknown_line_is_not_found() {
        let store = InMemoryRecordStore::new();
        let text_id = three_line_text(&store).await;

        let result =
            record_review(&store, text_id, Uuid::new_v4(), ReviewOutcome::Forgotten, now()).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_forgotten_line_keeps_gate_closed_until_settled() {
        let store = InMemoryRecordStore::new();
        let text_id = three_line_text(&store).await;
        let first = reviewable_lines(&store, text_id, now()).await.unwrap().remove(0);

        let report = record_review(&store, text_id, first.id, ReviewOutcome::Forgotten, now())
            .await
            .unwrap();
        assert_eq!(report.line.lapses, 1);
        assert_eq!(report.line.mask_level, 0);
        // Reviewed and scheduled for tomorrow, so the gate opens.
        assert_eq!(report.unlocked_line_number, Some(1));

        // Tomorrow line 0 is due again; line 1 unreviewed; the gate holds.
        let tomorrow = now() + Duration::days(1);
        assert_eq!(advance_unlock(&store, text_id, tomorrow).await.unwrap(), None);
        let queue = reviewable_lines(&store, text_id, tomorrow).await.unwrap();
        let numbers: Vec<u32> = queue.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![0, 1]);
    }
}
