//! SqliteStore - SQLite persistence for the contact roster
//!
//! Schema mirrors the flat file: one row per (phone, cohort_id), tracking
//! columns alongside the roster fields, extra columns as a JSON attributes
//! blob. The terminal-reply guard is a conditional UPDATE, so concurrent
//! webhook deliveries cannot both record an answer.

use super::{ContactStore, ReplyWrite, SendRecord, StoreStats};
use crate::contact::{normalize_phone, Contact, Decision, OptIn, ReplyState, SendState};
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};

/// SQLite-backed contact store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub async fn from_path(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        // WAL for read/write concurrency
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("contact store initialized at {}", db_path.display());
        Ok(store)
    }

    /// In-memory store (for tests)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        debug!("in-memory contact store initialized");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS contacts (
                phone                TEXT NOT NULL,
                cohort_id            TEXT NOT NULL DEFAULT '',
                cohort_name          TEXT NOT NULL DEFAULT '',
                display_name         TEXT NOT NULL DEFAULT '',
                opt_in               TEXT NOT NULL DEFAULT '',
                send_state           TEXT NOT NULL DEFAULT '',
                send_timestamp       TEXT NOT NULL DEFAULT '',
                provider_message_id  TEXT NOT NULL DEFAULT '',
                reply_state          TEXT NOT NULL DEFAULT '',
                reply_timestamp      TEXT NOT NULL DEFAULT '',
                reply_correlation_id TEXT NOT NULL DEFAULT '',
                attributes           TEXT NOT NULL DEFAULT '{}',
                created_at           TEXT NOT NULL,
                updated_at           TEXT NOT NULL,
                PRIMARY KEY (phone, cohort_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_phone ON contacts(phone)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_cohort ON contacts(cohort_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn row_to_contact(row: &sqlx::sqlite::SqliteRow) -> Contact {
        let opt = |s: String| if s.is_empty() { None } else { Some(s) };

        let mut contact = Contact::new(row.get::<String, _>("phone"));
        contact.cohort_id = opt(row.get("cohort_id"));
        contact.cohort_name = opt(row.get("cohort_name"));
        contact.display_name = opt(row.get("display_name"));
        contact.opt_in = OptIn::parse(&row.get::<String, _>("opt_in"));
        contact.send_state = SendState::parse(&row.get::<String, _>("send_state"));
        contact.send_timestamp = parse_timestamp(&row.get::<String, _>("send_timestamp"));
        contact.provider_message_id = opt(row.get("provider_message_id"));
        contact.reply_state = ReplyState::parse(&row.get::<String, _>("reply_state"));
        contact.reply_timestamp = parse_timestamp(&row.get::<String, _>("reply_timestamp"));
        contact.reply_correlation_id = opt(row.get("reply_correlation_id"));
        contact.attributes =
            serde_json::from_str(&row.get::<String, _>("attributes")).unwrap_or_default();
        contact
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn render_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339()).unwrap_or_default()
}

const UPSERT_SQL: &str = "INSERT INTO contacts (
        phone, cohort_id, cohort_name, display_name, opt_in,
        send_state, send_timestamp, provider_message_id,
        reply_state, reply_timestamp, reply_correlation_id,
        attributes, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
    ON CONFLICT(phone, cohort_id) DO UPDATE SET
        cohort_name          = excluded.cohort_name,
        display_name         = excluded.display_name,
        opt_in               = excluded.opt_in,
        send_state           = excluded.send_state,
        send_timestamp       = excluded.send_timestamp,
        provider_message_id  = excluded.provider_message_id,
        reply_state = CASE WHEN contacts.reply_state = ''
            THEN excluded.reply_state ELSE contacts.reply_state END,
        reply_timestamp = CASE WHEN contacts.reply_state = ''
            THEN excluded.reply_timestamp ELSE contacts.reply_timestamp END,
        reply_correlation_id = CASE WHEN contacts.reply_state = ''
            THEN excluded.reply_correlation_id ELSE contacts.reply_correlation_id END,
        attributes = excluded.attributes,
        updated_at = excluded.updated_at";

fn bind_contact<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    contact: &'q Contact,
    now: String,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(normalize_phone(&contact.phone))
        .bind(contact.cohort_id.clone().unwrap_or_default())
        .bind(contact.cohort_name.clone().unwrap_or_default())
        .bind(contact.display_name.clone().unwrap_or_default())
        .bind(contact.opt_in.as_str())
        .bind(contact.send_state.as_str())
        .bind(render_timestamp(contact.send_timestamp))
        .bind(contact.provider_message_id.clone().unwrap_or_default())
        .bind(contact.reply_state.as_str())
        .bind(render_timestamp(contact.reply_timestamp))
        .bind(contact.reply_correlation_id.clone().unwrap_or_default())
        .bind(serde_json::to_string(&contact.attributes).unwrap_or_else(|_| "{}".to_string()))
        .bind(now)
}

#[async_trait::async_trait]
impl ContactStore for SqliteStore {
    async fn load(&self) -> Result<Vec<Contact>> {
        let rows = sqlx::query("SELECT * FROM contacts ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::row_to_contact).collect())
    }

    async fn save(&self, contacts: &[Contact]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM contacts").execute(&mut *tx).await?;
        let now = Utc::now().to_rfc3339();
        for contact in contacts {
            bind_contact(sqlx::query(UPSERT_SQL), contact, now.clone())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, phone: &str) -> Result<Option<Contact>> {
        let row = sqlx::query("SELECT * FROM contacts WHERE phone = ?1 ORDER BY rowid LIMIT 1")
            .bind(normalize_phone(phone))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::row_to_contact))
    }

    async fn upsert(&self, contact: Contact) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        bind_contact(sqlx::query(UPSERT_SQL), &contact, now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_reply(
        &self,
        phone: &str,
        decision: Decision,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ReplyWrite> {
        let normalized = normalize_phone(phone);
        let stamp = now.to_rfc3339();

        // The WHERE clause is the terminal-state guard: only a NoReply row
        // can take the write, no matter how many deliveries race. The write
        // targets the first roster row for the phone, same as the flat file,
        // so a phone present in several cohorts records one answer.
        let updated = sqlx::query(
            "UPDATE contacts
             SET reply_state = ?1, reply_timestamp = ?2,
                 reply_correlation_id = ?3, updated_at = ?2
             WHERE reply_state = ''
               AND rowid = (SELECT MIN(rowid) FROM contacts WHERE phone = ?4)",
        )
        .bind(ReplyState::from(decision).as_str())
        .bind(&stamp)
        .bind(correlation_id)
        .bind(&normalized)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated > 0 {
            return Ok(ReplyWrite::Recorded);
        }

        let prior = sqlx::query(
            "SELECT reply_state FROM contacts WHERE phone = ?1 ORDER BY rowid LIMIT 1",
        )
        .bind(&normalized)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match prior {
            Some(row) => {
                let state = ReplyState::parse(&row.get::<String, _>("reply_state"));
                match state.decision() {
                    Some(d) => ReplyWrite::AlreadyAnswered(d),
                    None => ReplyWrite::NotFound,
                }
            }
            None => ReplyWrite::NotFound,
        })
    }

    async fn record_send(
        &self,
        phone: &str,
        cohort_id: Option<&str>,
        record: SendRecord,
    ) -> Result<()> {
        let normalized = normalize_phone(phone);
        let cohort = cohort_id.unwrap_or("");

        let result = match record {
            SendRecord::Sent { message_id, at } => {
                sqlx::query(
                    "UPDATE contacts
                     SET send_state = 'sent', provider_message_id = ?1,
                         send_timestamp = ?2, updated_at = ?2
                     WHERE phone = ?3 AND cohort_id = ?4",
                )
                .bind(message_id)
                .bind(at.to_rfc3339())
                .bind(&normalized)
                .bind(cohort)
                .execute(&self.pool)
                .await?
            }
            SendRecord::Failed { error, at } => {
                sqlx::query(
                    "UPDATE contacts
                     SET send_state = 'error',
                         attributes = json_set(attributes, '$.last_send_error', ?1),
                         send_timestamp = ?2, updated_at = ?2
                     WHERE phone = ?3 AND cohort_id = ?4",
                )
                .bind(error)
                .bind(at.to_rfc3339())
                .bind(&normalized)
                .bind(cohort)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(crate::error::Error::Store(format!(
                "contact not found: {phone}"
            )));
        }
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let count = |sql: &'static str| async move {
            let row = sqlx::query(sql).fetch_one(&self.pool).await?;
            Ok::<u64, crate::error::Error>(row.get::<i64, _>(0) as u64)
        };

        let total = count("SELECT COUNT(*) FROM contacts").await?;
        let sent = count("SELECT COUNT(*) FROM contacts WHERE send_state = 'sent'").await?;
        let errors = count("SELECT COUNT(*) FROM contacts WHERE send_state = 'error'").await?;
        let replied_yes = count("SELECT COUNT(*) FROM contacts WHERE reply_state = 'yes'").await?;
        let replied_no = count("SELECT COUNT(*) FROM contacts WHERE reply_state = 'no'").await?;

        Ok(StoreStats {
            total,
            sent,
            errors,
            pending: total - sent - errors,
            replied_yes,
            replied_no,
        })
    }
}
