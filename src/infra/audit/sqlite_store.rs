// SQLite-backed audit log.
//
// Tables:
// - audit_records: one row per recorded action
//
// Triggers abort any UPDATE or DELETE on audit_records, so the append-only
// rule holds even for code that bypasses this type.

use crate::core::audit::{AuditAction, AuditLog, AuditRecord, AuditRecordId, NewAuditRecord};
use crate::core::errors::StoreError;
use crate::core::pagination::Cursor;
use crate::infra::sqlite_support::{
    classify, connect, decode_timestamp, encode_timestamp, truncate_to_micros,
};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};

pub struct SqliteAuditLog {
    pool: Pool<Sqlite>,
}

impl SqliteAuditLog {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let log = Self::new(connect(database_url).await?);
        log.migrate().await?;
        Ok(log)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor TEXT NOT NULL CHECK (length(trim(actor)) > 0),
                action TEXT NOT NULL,
                target TEXT NOT NULL,
                detail TEXT,
                recorded_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_audit_records_order \
             ON audit_records(recorded_at DESC, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS audit_records_no_update
            BEFORE UPDATE ON audit_records
            BEGIN
                SELECT RAISE(ABORT, 'audit_records is append-only');
            END;
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS audit_records_no_delete
            BEFORE DELETE ON audit_records
            BEGIN
                SELECT RAISE(ABORT, 'audit_records is append-only');
            END;
            "#,
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

fn row_to_record(row: &SqliteRow) -> Result<AuditRecord, StoreError> {
    let action: String = row.get("action");
    let recorded_at: String = row.get("recorded_at");
    let detail: Option<String> = row.get("detail");

    let detail = match detail {
        Some(raw) => Some(
            serde_json::from_str(&raw)
                .map_err(|e| StoreError::Permanent(format!("unreadable audit detail: {}", e)))?,
        ),
        None => None,
    };

    Ok(AuditRecord {
        id: AuditRecordId(row.get::<i64, _>("id") as u64),
        actor: row.get("actor"),
        action: action
            .parse::<AuditAction>()
            .map_err(StoreError::Permanent)?,
        target: row.get("target"),
        recorded_at: decode_timestamp(&recorded_at)?,
        detail,
    })
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError> {
        let detail = record
            .detail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Permanent(format!("unencodable audit detail: {}", e)))?;

        let mut record = record;
        record.recorded_at = truncate_to_micros(record.recorded_at);

        let result = sqlx::query(
            r#"
            INSERT INTO audit_records (actor, action, target, detail, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.actor.clone())
        .bind(record.action.as_str())
        .bind(record.target.clone())
        .bind(detail)
        .bind(encode_timestamp(&record.recorded_at))
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(AuditRecord::from_new(
            AuditRecordId(result.last_insert_rowid() as u64),
            record,
        ))
    }

    async fn list(
        &self,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, actor, action, target, detail, recorded_at \
             FROM audit_records WHERE 1=1",
        );

        if let Some(cursor) = before {
            let timestamp = encode_timestamp(&cursor.timestamp);
            qb.push(" AND (recorded_at < ");
            qb.push_bind(timestamp.clone());
            qb.push(" OR (recorded_at = ");
            qb.push_bind(timestamp);
            qb.push(" AND id < ");
            qb.push_bind(cursor.id as i64);
            qb.push("))");
        }

        qb.push(" ORDER BY recorded_at DESC, id DESC LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(classify)?;
        rows.iter().map(row_to_record).collect()
    }
}
