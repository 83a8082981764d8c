// SQLite-backed message store.
//
// Tables:
// - feed_messages: one row per message; rows are never deleted, only re-statused
//
// Listings are served by the (created_at DESC, id DESC) indexes, never by
// loading the table and sorting in memory.

use crate::core::errors::StoreError;
use crate::core::feed::{Message, MessageFilter, MessageId, MessageStatus, MessageStore, NewMessage};
use crate::core::pagination::Cursor;
use crate::infra::sqlite_support::{
    classify, connect, decode_timestamp, encode_timestamp, truncate_to_micros,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};

const MESSAGE_COLUMNS: &str = "id, author_name, author_identity, body, created_at, status";

pub struct SqliteMessageStore {
    pool: Pool<Sqlite>,
}

impl SqliteMessageStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and run migrations.
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let store = Self::new(connect(database_url).await?);
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_name TEXT NOT NULL,
                author_identity TEXT,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'visible'
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feed_messages_order \
             ON feed_messages(created_at DESC, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feed_messages_status_order \
             ON feed_messages(status, created_at DESC, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn row_to_message(row: &SqliteRow) -> Result<Message, StoreError> {
    let created_at: String = row.get("created_at");
    let status: String = row.get("status");

    Ok(Message {
        id: MessageId(row.get::<i64, _>("id") as u64),
        author_name: row.get("author_name"),
        author_identity: row.get("author_identity"),
        body: row.get("body"),
        created_at: decode_timestamp(&created_at)?,
        status: status
            .parse::<MessageStatus>()
            .map_err(StoreError::Permanent)?,
    })
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        let NewMessage {
            author_name,
            author_identity,
            body,
            created_at,
        } = message;
        let created_at = truncate_to_micros(created_at.unwrap_or_else(Utc::now));

        let result = sqlx::query(
            r#"
            INSERT INTO feed_messages (author_name, author_identity, body, created_at, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(author_name.clone())
        .bind(author_identity.clone())
        .bind(body.clone())
        .bind(encode_timestamp(&created_at))
        .bind(MessageStatus::Visible.as_str())
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(Message {
            id: MessageId(result.last_insert_rowid() as u64),
            author_name,
            author_identity,
            body,
            created_at,
            status: MessageStatus::Visible,
        })
    }

    async fn get_by_id(&self, id: MessageId) -> Result<Message, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM feed_messages WHERE id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(id.0 as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        match row {
            Some(row) => row_to_message(&row),
            None => Err(StoreError::NotFound(format!("message {}", id))),
        }
    }

    async fn update_status(&self, id: MessageId, status: MessageStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE feed_messages SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0 as i64)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("message {}", id)));
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: MessageFilter,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<Message>, StoreError> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM feed_messages WHERE 1=1",
            MESSAGE_COLUMNS
        ));

        if filter == MessageFilter::VisibleOnly {
            qb.push(" AND status = ");
            qb.push_bind(MessageStatus::Visible.as_str());
        }

        if let Some(cursor) = before {
            let timestamp = encode_timestamp(&cursor.timestamp);
            qb.push(" AND (created_at < ");
            qb.push_bind(timestamp.clone());
            qb.push(" OR (created_at = ");
            qb.push_bind(timestamp);
            qb.push(" AND id < ");
            qb.push_bind(cursor.id as i64);
            qb.push("))");
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(classify)?;
        rows.iter().map(row_to_message).collect()
    }
}
