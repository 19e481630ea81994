//! crates/line_by_line_core/src/selector.rs
//!
//! Read-only queries over the lines of one Text. Each call is a single
//! store query, so it sees one committed snapshot.

use chrono::{DateTime, Utc};

use crate::domain::{Line, TextId};
use crate::ports::{LineFilter, LineOrder, PortResult, RecordStore};

/// Every line of the Text, ascending by line number.
pub async fn all_lines(store: &dyn RecordStore, text_id: TextId) -> PortResult<Vec<Line>> {
    store
        .get_lines(LineFilter::for_text(text_id), LineOrder::LineNumberAsc)
        .await
}

/// Lines whose next review date is at or before `now`, ascending.
///
/// Not gated by the Text's unlock progression; see
/// [`crate::progression::reviewable_lines`] for the gated queue.
pub async fn due_lines(
    store: &dyn RecordStore,
    text_id: TextId,
    now: DateTime<Utc>,
) -> PortResult<Vec<Line>> {
    store
        .get_lines(
            LineFilter::for_text(text_id).due_at_or_before(now),
            LineOrder::LineNumberAsc,
        )
        .await
}

/// The lowest-numbered line that has never been reviewed.
pub async fn next_unreviewed_line(
    store: &dyn RecordStore,
    text_id: TextId,
) -> PortResult<Option<Line>> {
    let lines = store
        .get_lines(
            LineFilter::for_text(text_id).unreviewed(),
            LineOrder::LineNumberAsc,
        )
        .await?;
    Ok(lines.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewLine, NewText};
    use crate::memory::InMemoryRecordStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    async fn seed(store: &InMemoryRecordStore, lines: Vec<NewLine>) -> TextId {
        let text_id = store
            .insert_text(NewText {
                title: "seed".to_string(),
                author: None,
                content: String::new(),
                created_at: now(),
                max_unlocked_line_number: 0,
            })
            .await
            .unwrap();
        store.bulk_insert_lines(text_id, lines).await.unwrap();
        text_id
    }

    #[tokio::test]
    async fn test_due_lines_include_now_and_past_only() {
        let store = InMemoryRecordStore::new();
        // Inserted out of order to check the ordering.
        let text_id = seed(
            &store,
            vec![
                NewLine::fresh(2, "future", now() + Duration::days(1)),
                NewLine::fresh(0, "past", now() - Duration::days(1)),
                NewLine::fresh(1, "now", now()),
            ],
        )
        .await;

        let due = due_lines(&store, text_id, now()).await.unwrap();
        let numbers: Vec<u32> = due.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_next_unreviewed_picks_lowest_number() {
        let store = InMemoryRecordStore::new();
        let text_id = seed(
            &store,
            vec![
                NewLine::fresh(0, "zero", now()),
                NewLine::fresh(1, "one", now()),
                NewLine::fresh(2, "two", now()),
            ],
        )
        .await;

        let mut lines = all_lines(&store, text_id).await.unwrap();
        lines[1].last_reviewed_at = Some(now());
        store.update_line(&lines[1]).await.unwrap();

        let next = next_unreviewed_line(&store, text_id).await.unwrap().unwrap();
        assert_eq!(next.line_number, 0);

        lines[0].last_reviewed_at = Some(now());
        store.update_line(&lines[0]).await.unwrap();
        let next = next_unreviewed_line(&store, text_id).await.unwrap().unwrap();
        assert_eq!(next.line_number, 2);
    }

    #[tokio::test]
    async fn test_next_unreviewed_absent_when_all_reviewed() {
        let store = InMemoryRecordStore::new();
        let text_id = seed(&store, vec![NewLine::fresh(0, "only", now())]).await;

        let mut line = all_lines(&store, text_id).await.unwrap().remove(0);
        line.last_reviewed_at = Some(now());
        store.update_line(&line).await.unwrap();

        assert!(next_unreviewed_line(&store, text_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queries_are_scoped_to_one_text() {
        let store = InMemoryRecordStore::new();
        let first = seed(&store, vec![NewLine::fresh(0, "mine", now())]).await;
        seed(&store, vec![NewLine::fresh(0, "other", now())]).await;

        let lines = all_lines(&store, first).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].original_line_text, "mine");
    }
}
