//! crates/line_by_line_core/src/ports.rs
//!
//! Defines the storage contract for the application's core logic.
//! The trait forms the boundary of the hexagonal architecture, so the core
//! never depends on a concrete database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Line, NewLine, NewText, Text, TextChanges, TextId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all record store operations.
/// This abstracts away the specific errors of the underlying storage.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Write conflict: {0}")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Queries
//=========================================================================================

/// A conjunction of conditions over the lines of one Text.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFilter {
    pub text_id: TextId,
    pub due_at_or_before: Option<DateTime<Utc>>,
    pub max_line_number: Option<u32>,
    pub unreviewed_only: bool,
}

impl LineFilter {
    pub fn for_text(text_id: TextId) -> Self {
        Self {
            text_id,
            due_at_or_before: None,
            max_line_number: None,
            unreviewed_only: false,
        }
    }

    pub fn due_at_or_before(mut self, now: DateTime<Utc>) -> Self {
        self.due_at_or_before = Some(now);
        self
    }

    pub fn up_to_line(mut self, line_number: u32) -> Self {
        self.max_line_number = Some(line_number);
        self
    }

    pub fn unreviewed(mut self) -> Self {
        self.unreviewed_only = true;
        self
    }

    pub fn matches(&self, line: &Line) -> bool {
        line.text_id == self.text_id
            && self.due_at_or_before.map_or(true, |now| line.next_review_date <= now)
            && self.max_line_number.map_or(true, |max| line.line_number <= max)
            && (!self.unreviewed_only || line.last_reviewed_at.is_none())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineOrder {
    #[default]
    LineNumberAsc,
}

//=========================================================================================
// Atomic Write Batches
//=========================================================================================

/// Names the Text a batched write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRef {
    /// The Text created by the `InsertText` op earlier in the same batch.
    Inserted,
    Existing(TextId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    InsertText(NewText),
    BulkInsertLines { text: TextRef, lines: Vec<NewLine> },
    UpdateText { id: TextId, changes: TextChanges },
    DeleteLines(LineFilter),
    DeleteText(TextId),
}

/// An ordered group of writes that become visible together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub inserted_text_id: Option<TextId>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Texts ---
    async fn insert_text(&self, text: NewText) -> PortResult<TextId>;

    /// Returns `None` when no Text has this id.
    async fn get_text(&self, id: TextId) -> PortResult<Option<Text>>;

    /// All Texts, newest first.
    async fn list_texts(&self) -> PortResult<Vec<Text>>;

    async fn update_text(&self, id: TextId, changes: TextChanges) -> PortResult<()>;

    async fn delete_text(&self, id: TextId) -> PortResult<()>;

    // --- Lines ---
    async fn bulk_insert_lines(&self, text_id: TextId, lines: Vec<NewLine>) -> PortResult<()>;

    async fn get_lines(&self, filter: LineFilter, order: LineOrder) -> PortResult<Vec<Line>>;

    /// Replaces the stored line's mutable fields.
    async fn update_line(&self, line: &Line) -> PortResult<()>;

    async fn delete_lines(&self, filter: LineFilter) -> PortResult<()>;

    // --- Grouped writes ---
    async fn run_atomic(&self, batch: WriteBatch) -> PortResult<BatchOutcome>;
}
