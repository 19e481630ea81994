//! crates/line_by_line_core/src/memory.rs
//!
//! An in-process implementation of the `RecordStore` port. State lives behind
//! a mutex; grouped writes run against a copy that is swapped in on success.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Line, LineId, NewLine, NewText, Text, TextChanges, TextId};
use crate::ports::{
    BatchOutcome, LineFilter, LineOrder, PortError, PortResult, RecordStore, TextRef, WriteBatch,
    WriteOp,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    texts: HashMap<TextId, Text>,
    lines: HashMap<LineId, Line>,
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<Tables>,
    fail_next_line_insert: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next line insertion fail with `PortError::Unavailable`.
    /// Used to exercise the rollback path of grouped writes.
    pub fn fail_next_line_insert(&self) {
        self.fail_next_line_insert.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("record store lock poisoned".to_string()))
    }

    fn check_line_insert_fault(&self) -> PortResult<()> {
        if self.fail_next_line_insert.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unavailable("line insert failed".to_string()));
        }
        Ok(())
    }

    /// Applies one write to `tables`, returning the id of an inserted Text.
    fn apply(&self, tables: &mut Tables, op: WriteOp, inserted: Option<TextId>) -> PortResult<Option<TextId>> {
        match op {
            WriteOp::InsertText(text) => Ok(Some(insert_text(tables, text))),
            WriteOp::BulkInsertLines { text, lines } => {
                let text_id = match text {
                    TextRef::Existing(id) => id,
                    TextRef::Inserted => inserted.ok_or_else(|| {
                        PortError::Unexpected("batch inserts lines before any text".to_string())
                    })?,
                };
                self.check_line_insert_fault()?;
                insert_lines(tables, text_id, lines)?;
                Ok(None)
            }
            WriteOp::UpdateText { id, changes } => {
                update_text(tables, id, &changes)?;
                Ok(None)
            }
            WriteOp::DeleteLines(filter) => {
                tables.lines.retain(|_, line| !filter.matches(line));
                Ok(None)
            }
            WriteOp::DeleteText(id) => {
                delete_text(tables, id);
                Ok(None)
            }
        }
    }
}

fn insert_text(tables: &mut Tables, text: NewText) -> TextId {
    let id = Uuid::new_v4();
    tables.texts.insert(
        id,
        Text {
            id,
            title: text.title,
            author: text.author,
            content: text.content,
            created_at: text.created_at,
            last_reviewed_at: None,
            max_unlocked_line_number: text.max_unlocked_line_number,
        },
    );
    id
}

fn insert_lines(tables: &mut Tables, text_id: TextId, lines: Vec<NewLine>) -> PortResult<()> {
    if !tables.texts.contains_key(&text_id) {
        return Err(PortError::Conflict(format!("Text {} does not exist", text_id)));
    }
    for new_line in lines {
        let taken = tables
            .lines
            .values()
            .any(|l| l.text_id == text_id && l.line_number == new_line.line_number);
        if taken {
            return Err(PortError::Conflict(format!(
                "Line {} of text {} already exists",
                new_line.line_number, text_id
            )));
        }
        let line = new_line.into_line(Uuid::new_v4(), text_id);
        tables.lines.insert(line.id, line);
    }
    Ok(())
}

fn update_text(tables: &mut Tables, id: TextId, changes: &TextChanges) -> PortResult<()> {
    let text = tables
        .texts
        .get_mut(&id)
        .ok_or_else(|| PortError::NotFound(format!("Text {} not found", id)))?;
    changes.apply_to(text);
    Ok(())
}

fn delete_text(tables: &mut Tables, id: TextId) {
    tables.texts.remove(&id);
    tables.lines.retain(|_, line| line.text_id != id);
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_text(&self, text: NewText) -> PortResult<TextId> {
        let mut tables = self.lock()?;
        Ok(insert_text(&mut tables, text))
    }

    async fn get_text(&self, id: TextId) -> PortResult<Option<Text>> {
        Ok(self.lock()?.texts.get(&id).cloned())
    }

    async fn list_texts(&self) -> PortResult<Vec<Text>> {
        let mut texts: Vec<Text> = self.lock()?.texts.values().cloned().collect();
        texts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(texts)
    }

    async fn update_text(&self, id: TextId, changes: TextChanges) -> PortResult<()> {
        let mut tables = self.lock()?;
        update_text(&mut tables, id, &changes)
    }

    async fn delete_text(&self, id: TextId) -> PortResult<()> {
        let mut tables = self.lock()?;
        delete_text(&mut tables, id);
        Ok(())
    }

    async fn bulk_insert_lines(&self, text_id: TextId, lines: Vec<NewLine>) -> PortResult<()> {
        self.check_line_insert_fault()?;
        let mut tables = self.lock()?;
        // All-or-nothing, same as a single INSERT of many rows.
        let mut staged = tables.clone();
        insert_lines(&mut staged, text_id, lines)?;
        *tables = staged;
        Ok(())
    }

    async fn get_lines(&self, filter: LineFilter, order: LineOrder) -> PortResult<Vec<Line>> {
        let mut lines: Vec<Line> = self
            .lock()?
            .lines
            .values()
            .filter(|line| filter.matches(line))
            .cloned()
            .collect();
        match order {
            LineOrder::LineNumberAsc => lines.sort_by_key(|line| line.line_number),
        }
        Ok(lines)
    }

    async fn update_line(&self, line: &Line) -> PortResult<()> {
        let mut tables = self.lock()?;
        let stored = tables
            .lines
            .get_mut(&line.id)
            .ok_or_else(|| PortError::NotFound(format!("Line {} not found", line.id)))?;
        stored.next_review_date = line.next_review_date;
        stored.interval = line.interval;
        stored.ease_factor = line.ease_factor;
        stored.repetitions = line.repetitions;
        stored.lapses = line.lapses;
        stored.last_reviewed_at = line.last_reviewed_at;
        stored.mask_level = line.mask_level;
        Ok(())
    }

    async fn delete_lines(&self, filter: LineFilter) -> PortResult<()> {
        self.lock()?.lines.retain(|_, line| !filter.matches(line));
        Ok(())
    }

    async fn run_atomic(&self, batch: WriteBatch) -> PortResult<BatchOutcome> {
        let mut tables = self.lock()?;
        let mut staged = tables.clone();
        let mut outcome = BatchOutcome::default();

        for op in batch.ops {
            if let Some(id) = self.apply(&mut staged, op, outcome.inserted_text_id)? {
                outcome.inserted_text_id = Some(id);
            }
        }

        *tables = staged;
        Ok(outcome)
    }
}
