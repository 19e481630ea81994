//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RecordStore` port from the core crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use line_by_line_core::domain::{Line, NewLine, NewText, Text, TextChanges, TextId};
use line_by_line_core::ports::{
    BatchOutcome, LineFilter, LineOrder, PortError, PortResult, RecordStore, TextRef, WriteBatch,
    WriteOp,
};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

/// Rows per INSERT statement; keeps bind parameters under Postgres' limit.
const LINE_INSERT_CHUNK: usize = 1000;

const TEXT_COLUMNS: &str =
    "id, title, author, content, created_at, last_reviewed_at, max_unlocked_line_number";

const LINE_COLUMNS: &str = "id, text_id, line_number, original_line_text, next_review_date, \
     interval_days, ease_factor, repetitions, lapses, last_reviewed_at, mask_level";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RecordStore` port.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Creates a new `PgRecordStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct TextRecord {
    id: Uuid,
    title: String,
    author: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
    last_reviewed_at: Option<DateTime<Utc>>,
    max_unlocked_line_number: i32,
}
impl TextRecord {
    fn to_domain(self) -> Text {
        Text {
            id: self.id,
            title: self.title,
            author: self.author,
            content: self.content,
            created_at: self.created_at,
            last_reviewed_at: self.last_reviewed_at,
            max_unlocked_line_number: self.max_unlocked_line_number as u32,
        }
    }
}

#[derive(FromRow)]
struct LineRecord {
    id: Uuid,
    text_id: Uuid,
    line_number: i32,
    original_line_text: String,
    next_review_date: DateTime<Utc>,
    interval_days: i32,
    ease_factor: f64,
    repetitions: i32,
    lapses: i32,
    last_reviewed_at: Option<DateTime<Utc>>,
    mask_level: i32,
}
impl LineRecord {
    fn to_domain(self) -> Line {
        Line {
            id: self.id,
            text_id: self.text_id,
            line_number: self.line_number as u32,
            original_line_text: self.original_line_text,
            next_review_date: self.next_review_date,
            interval: self.interval_days as u32,
            ease_factor: self.ease_factor,
            repetitions: self.repetitions as u32,
            lapses: self.lapses as u32,
            last_reviewed_at: self.last_reviewed_at,
            mask_level: self.mask_level as u32,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Postgres INTEGER columns are signed; larger counts saturate.
fn to_db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn map_sqlx_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("Record not found".to_string()),
        sqlx::Error::Database(ref db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            PortError::Conflict(db.to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn push_line_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &LineFilter) {
    qb.push(" WHERE text_id = ").push_bind(filter.text_id);
    if let Some(now) = filter.due_at_or_before {
        qb.push(" AND next_review_date <= ").push_bind(now);
    }
    if let Some(max) = filter.max_line_number {
        qb.push(" AND line_number <= ").push_bind(to_db_int(max));
    }
    if filter.unreviewed_only {
        qb.push(" AND last_reviewed_at IS NULL");
    }
}

//=========================================================================================
// Statements (shared by single calls and transactions)
//=========================================================================================

async fn insert_text(conn: &mut PgConnection, text: NewText) -> PortResult<TextId> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO texts (id, title, author, content, created_at, max_unlocked_line_number) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(text.title)
    .bind(text.author)
    .bind(text.content)
    .bind(text.created_at)
    .bind(to_db_int(text.max_unlocked_line_number))
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(id)
}

async fn insert_lines(conn: &mut PgConnection, text_id: TextId, lines: Vec<NewLine>) -> PortResult<()> {
    for chunk in lines.chunks(LINE_INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO lines (id, text_id, line_number, original_line_text, next_review_date, \
             interval_days, ease_factor, repetitions, lapses, mask_level) ",
        );
        qb.push_values(chunk, |mut row, line| {
            row.push_bind(Uuid::new_v4())
                .push_bind(text_id)
                .push_bind(to_db_int(line.line_number))
                .push_bind(line.original_line_text.clone())
                .push_bind(line.next_review_date)
                .push_bind(to_db_int(line.interval))
                .push_bind(line.ease_factor)
                .push_bind(to_db_int(line.repetitions))
                .push_bind(to_db_int(line.lapses))
                .push_bind(to_db_int(line.mask_level));
        });
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

async fn update_text(conn: &mut PgConnection, id: TextId, changes: TextChanges) -> PortResult<()> {
    if changes.is_empty() {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM texts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
        return exists
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Text {} not found", id)));
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE texts SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(title) = changes.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(at) = changes.last_reviewed_at {
            set.push("last_reviewed_at = ").push_bind_unseparated(at);
        }
        if let Some(max) = changes.max_unlocked_line_number {
            set.push("max_unlocked_line_number = ")
                .push_bind_unseparated(to_db_int(max));
        }
    }
    qb.push(" WHERE id = ").push_bind(id);

    let result = qb
        .build()
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    if result.rows_affected() == 0 {
        return Err(PortError::NotFound(format!("Text {} not found", id)));
    }
    Ok(())
}

async fn delete_lines(conn: &mut PgConnection, filter: &LineFilter) -> PortResult<()> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("DELETE FROM lines");
    push_line_conditions(&mut qb, filter);
    qb.build()
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

async fn delete_text(conn: &mut PgConnection, id: TextId) -> PortResult<()> {
    sqlx::query("DELETE FROM texts WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_text(&self, text: NewText) -> PortResult<TextId> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        insert_text(&mut conn, text).await
    }

    async fn get_text(&self, id: TextId) -> PortResult<Option<Text>> {
        let record: Option<TextRecord> =
            sqlx::query_as(&format!("SELECT {} FROM texts WHERE id = $1", TEXT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(record.map(TextRecord::to_domain))
    }

    async fn list_texts(&self) -> PortResult<Vec<Text>> {
        let records: Vec<TextRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM texts ORDER BY created_at DESC",
            TEXT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_text(&self, id: TextId, changes: TextChanges) -> PortResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        update_text(&mut conn, id, changes).await
    }

    async fn delete_text(&self, id: TextId) -> PortResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        delete_text(&mut conn, id).await
    }

    async fn bulk_insert_lines(&self, text_id: TextId, lines: Vec<NewLine>) -> PortResult<()> {
        // Chunked inserts still land all-or-nothing.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        insert_lines(&mut tx, text_id, lines).await?;
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn get_lines(&self, filter: LineFilter, order: LineOrder) -> PortResult<Vec<Line>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM lines", LINE_COLUMNS));
        push_line_conditions(&mut qb, &filter);
        match order {
            LineOrder::LineNumberAsc => qb.push(" ORDER BY line_number ASC"),
        };

        let records: Vec<LineRecord> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_line(&self, line: &Line) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE lines SET next_review_date = $1, interval_days = $2, ease_factor = $3, \
             repetitions = $4, lapses = $5, last_reviewed_at = $6, mask_level = $7 WHERE id = $8",
        )
        .bind(line.next_review_date)
        .bind(to_db_int(line.interval))
        .bind(line.ease_factor)
        .bind(to_db_int(line.repetitions))
        .bind(to_db_int(line.lapses))
        .bind(line.last_reviewed_at)
        .bind(to_db_int(line.mask_level))
        .bind(line.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Line {} not found", line.id)));
        }
        Ok(())
    }

    async fn delete_lines(&self, filter: LineFilter) -> PortResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        delete_lines(&mut conn, &filter).await
    }

    async fn run_atomic(&self, batch: WriteBatch) -> PortResult<BatchOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut outcome = BatchOutcome::default();
        let op_count = batch.ops.len();

        // Returning early drops `tx`, which rolls the whole batch back.
        for op in batch.ops {
            match op {
                WriteOp::InsertText(text) => {
                    outcome.inserted_text_id = Some(insert_text(&mut tx, text).await?);
                }
                WriteOp::BulkInsertLines { text, lines } => {
                    let text_id = match text {
                        TextRef::Existing(id) => id,
                        TextRef::Inserted => outcome.inserted_text_id.ok_or_else(|| {
                            PortError::Unexpected(
                                "batch inserts lines before any text".to_string(),
                            )
                        })?,
                    };
                    insert_lines(&mut tx, text_id, lines).await?;
                }
                WriteOp::UpdateText { id, changes } => update_text(&mut tx, id, changes).await?,
                WriteOp::DeleteLines(filter) => delete_lines(&mut tx, &filter).await?,
                WriteOp::DeleteText(id) => delete_text(&mut tx, id).await?,
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(op_count, "Atomic batch committed");
        Ok(outcome)
    }
}
