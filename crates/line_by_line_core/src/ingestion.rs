//! crates/line_by_line_core/src/ingestion.rs
//!
//! Turns raw content into a Text and its numbered Lines, and removes a Text
//! together with its Lines. Both run as one grouped write.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{NewLine, NewText, TextId};
use crate::error::{CoreError, CoreResult};
use crate::ports::{LineFilter, PortError, RecordStore, TextRef, WriteBatch, WriteOp};

/// Splits content on line breaks and drops blank lines, keeping order.
///
/// The surviving lines are numbered from 0, so a line number is not the raw
/// source line index. A trailing `\r` from CRLF input is not kept.
pub fn split_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Stores a new Text and all of its Lines atomically, returning the Text id.
pub async fn ingest_text(
    store: &dyn RecordStore,
    title: &str,
    author: Option<&str>,
    content: &str,
    now: DateTime<Utc>,
) -> CoreResult<TextId> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("title cannot be empty".to_string()));
    }
    if content.trim().is_empty() {
        return Err(CoreError::Validation("content cannot be empty".to_string()));
    }

    let lines: Vec<NewLine> = split_lines(content)
        .into_iter()
        .enumerate()
        .map(|(index, line)| NewLine::fresh(index as u32, line, now))
        .collect();
    let line_count = lines.len();

    let text = NewText {
        title: title.to_string(),
        author: author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
        content: content.to_string(),
        created_at: now,
        max_unlocked_line_number: 0,
    };

    let batch = WriteBatch::new()
        .push(WriteOp::InsertText(text))
        .push(WriteOp::BulkInsertLines {
            text: TextRef::Inserted,
            lines,
        });

    let outcome = store.run_atomic(batch).await?;
    let text_id = outcome.inserted_text_id.ok_or_else(|| {
        CoreError::Storage(PortError::Unexpected(
            "store did not report the inserted text id".to_string(),
        ))
    })?;

    info!(%text_id, line_count, "Text ingested");
    Ok(text_id)
}

/// Deletes the Text and every Line it owns in one grouped write.
pub async fn delete_text_and_lines(store: &dyn RecordStore, text_id: TextId) -> CoreResult<()> {
    let batch = WriteBatch::new()
        .push(WriteOp::DeleteLines(LineFilter::for_text(text_id)))
        .push(WriteOp::DeleteText(text_id));
    store.run_atomic(batch).await?;
    debug!(%text_id, "Text and lines deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRecordStore;
    use crate::ports::LineOrder;
    use crate::selector::all_lines;

    #[test]
    fn test_split_drops_blank_lines() {
        assert_eq!(split_lines("a\n\nb\n   \nc"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("x\r\ny\r\n"), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_ingest_numbers_surviving_lines() {
        let store = InMemoryRecordStore::new();
        let now = Utc::now();
        let text_id = ingest_text(&store, "Poem", Some("  "), "a\n\nb\n   \nc", now)
            .await
            .unwrap();

        let text = store.get_text(text_id).await.unwrap().unwrap();
        assert_eq!(text.author, None);
        assert_eq!(text.content, "a\n\nb\n   \nc");
        assert_eq!(text.max_unlocked_line_number, 0);
        assert_eq!(text.created_at, now);

        let lines = all_lines(&store, text_id).await.unwrap();
        let shape: Vec<(u32, &str)> = lines
            .iter()
            .map(|l| (l.line_number, l.original_line_text.as_str()))
            .collect();
        assert_eq!(shape, vec![(0, "a"), (1, "b"), (2, "c")]);
        for line in &lines {
            assert_eq!(line.next_review_date, now);
            assert_eq!(line.interval, 0);
            assert_eq!(line.ease_factor, 2.5);
            assert_eq!(line.repetitions, 0);
            assert_eq!(line.lapses, 0);
            assert_eq!(line.mask_level, 0);
            assert!(line.last_reviewed_at.is_none());
        }
    }

    #[tokio::test]
    async fn test_ingest_trims_author() {
        let store = InMemoryRecordStore::new();
        let text_id = ingest_text(&store, "Poem", Some(" Keats "), "line", Utc::now())
            .await
            .unwrap();
        let text = store.get_text(text_id).await.unwrap().unwrap();
        assert_eq!(text.author.as_deref(), Some("Keats"));
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_without_writes() {
        let store = InMemoryRecordStore::new();
        let result = ingest_text(&store, "   ", None, "content", Utc::now()).await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
        let result = ingest_text(&store, "Title", None, " \n\t\n", Utc::now()).await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
        assert!(store.list_texts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_line_insert_leaves_no_text() {
        let store = InMemoryRecordStore::new();
        store.fail_next_line_insert();

        let result = ingest_text(&store, "Lost", None, "a\nb", Utc::now()).await;
        assert!(matches!(
            result,
            Err(CoreError::Storage(PortError::Unavailable(_)))
        ));
        assert!(store.list_texts().await.unwrap().iter().all(|t| t.title != "Lost"));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_lines() {
        let store = InMemoryRecordStore::new();
        let keep = ingest_text(&store, "Keep", None, "k1\nk2", Utc::now()).await.unwrap();
        let gone = ingest_text(&store, "Gone", None, "g1\ng2\ng3", Utc::now()).await.unwrap();

        delete_text_and_lines(&store, gone).await.unwrap();

        assert!(store.get_text(gone).await.unwrap().is_none());
        let orphans = store
            .get_lines(LineFilter::for_text(gone), LineOrder::LineNumberAsc)
            .await
            .unwrap();
        assert!(orphans.is_empty());
        assert_eq!(all_lines(&store, keep).await.unwrap().len(), 2);
    }
}
