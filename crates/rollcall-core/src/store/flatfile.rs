//! FlatFileStore - delimited-file contact store
//!
//! The whole file is the unit of locking: every operation takes the store
//! mutex, reads, mutates, writes. Coarse, but the roster is small and it
//! makes read-check-write atomic for concurrent webhook deliveries.

use super::table::Table;
use super::{compute_stats, ContactStore, ReplyWrite, SendRecord, StoreStats};
use crate::contact::{normalize_phone, Contact, Decision, OptIn, ReplyState, SendState};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Fixed schema columns, in file order
pub const FIXED_COLUMNS: &[&str] = &[
    "phone",
    "cohort_id",
    "cohort_name",
    "display_name",
    "opt_in",
    "send_state",
    "send_timestamp",
    "provider_message_id",
    "reply_state",
    "reply_timestamp",
    "reply_correlation_id",
];

/// Tracking columns that self-heal: created empty when a roster file lacks them
pub const TRACKING_COLUMNS: &[&str] = &[
    "send_state",
    "send_timestamp",
    "provider_message_id",
    "reply_state",
    "reply_timestamp",
    "reply_correlation_id",
];

/// Map a parsed table to contacts. The `phone` column is required; fixed
/// columns fill the typed fields and everything else lands in `attributes`.
pub fn contacts_from_table(table: &Table) -> Result<Vec<Contact>> {
    let phone_col = table
        .column("phone")
        .ok_or_else(|| Error::MissingColumn("phone".to_string()))?;

    let col = |name: &str| table.column(name);
    let opt = |value: &str| {
        let v = value.trim();
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    };

    let mut contacts = Vec::with_capacity(table.rows.len());
    for row_idx in 0..table.rows.len() {
        let get = |idx: Option<usize>| idx.map(|i| table.cell(row_idx, i)).unwrap_or("");

        let mut contact = Contact::new(table.cell(row_idx, phone_col));
        contact.cohort_id = opt(get(col("cohort_id")));
        contact.cohort_name = opt(get(col("cohort_name")));
        contact.display_name = opt(get(col("display_name")));
        contact.opt_in = OptIn::parse(get(col("opt_in")));
        contact.send_state = SendState::parse(get(col("send_state")));
        contact.send_timestamp = parse_timestamp(get(col("send_timestamp")));
        contact.provider_message_id = opt(get(col("provider_message_id")));
        contact.reply_state = ReplyState::parse(get(col("reply_state")));
        contact.reply_timestamp = parse_timestamp(get(col("reply_timestamp")));
        contact.reply_correlation_id = opt(get(col("reply_correlation_id")));

        for (col_idx, header) in table.headers.iter().enumerate() {
            if FIXED_COLUMNS.contains(&header.as_str()) {
                continue;
            }
            let value = table.cell(row_idx, col_idx);
            if !value.is_empty() {
                contact
                    .attributes
                    .insert(header.clone(), value.to_string());
            }
        }

        contacts.push(contact);
    }
    Ok(contacts)
}

/// Render contacts as a table: fixed columns first, then the union of
/// attribute columns in sorted order.
#[must_use]
pub fn contacts_to_table(contacts: &[Contact]) -> Table {
    let mut extra: BTreeSet<String> = BTreeSet::new();
    for c in contacts {
        extra.extend(c.attributes.keys().cloned());
    }

    let mut headers: Vec<String> = FIXED_COLUMNS.iter().map(|s| s.to_string()).collect();
    headers.extend(extra.iter().cloned());

    let mut table = Table::with_headers(headers);
    for c in contacts {
        let mut row = vec![
            c.phone.clone(),
            c.cohort_id.clone().unwrap_or_default(),
            c.cohort_name.clone().unwrap_or_default(),
            c.display_name.clone().unwrap_or_default(),
            c.opt_in.as_str().to_string(),
            c.send_state.as_str().to_string(),
            render_timestamp(c.send_timestamp),
            c.provider_message_id.clone().unwrap_or_default(),
            c.reply_state.as_str().to_string(),
            render_timestamp(c.reply_timestamp),
            c.reply_correlation_id.clone().unwrap_or_default(),
        ];
        for key in &extra {
            row.push(c.attributes.get(key).cloned().unwrap_or_default());
        }
        table.rows.push(row);
    }
    table
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn render_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339()).unwrap_or_default()
}

/// Flat-file contact store
pub struct FlatFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FlatFileStore {
    /// Create a store over the given file path. The file is created on the
    /// first write; loading a missing file is an error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The backing file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_contacts(&self) -> Result<Vec<Contact>> {
        // Only a missing file maps to Store, the signal for a first-time
        // bootstrap; any other read failure is an I/O error on a roster
        // that exists and must propagate.
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Store(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let mut table = Table::parse(&raw)?;
        if table.column("phone").is_none() {
            return Err(Error::MissingColumn("phone".to_string()));
        }
        for col in TRACKING_COLUMNS {
            table.ensure_column(col);
        }
        contacts_from_table(&table)
    }

    fn write_contacts(&self, contacts: &[Contact]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, contacts_to_table(contacts).render())?;
        debug!(path = %self.path.display(), count = contacts.len(), "roster written");
        Ok(())
    }

    fn find_index(contacts: &[Contact], phone: &str) -> Option<usize> {
        let needle = normalize_phone(phone);
        contacts
            .iter()
            .position(|c| normalize_phone(&c.phone) == needle)
    }
}

#[async_trait::async_trait]
impl ContactStore for FlatFileStore {
    async fn load(&self) -> Result<Vec<Contact>> {
        let _guard = self.lock.lock().await;
        self.read_contacts()
    }

    async fn save(&self, contacts: &[Contact]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_contacts(contacts)
    }

    async fn find(&self, phone: &str) -> Result<Option<Contact>> {
        let _guard = self.lock.lock().await;
        let contacts = self.read_contacts()?;
        Ok(Self::find_index(&contacts, phone).map(|i| contacts[i].clone()))
    }

    async fn upsert(&self, contact: Contact) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut contacts = match self.read_contacts() {
            Ok(c) => c,
            // First upsert bootstraps a missing file; an unreadable
            // existing file must not be replaced with a one-row roster
            Err(Error::Store(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let key = contact.key();
        match contacts.iter_mut().find(|c| c.key() == key) {
            Some(existing) => {
                // Merge: roster fields are overwritten, a terminal reply is kept
                let mut merged = contact;
                if existing.has_answered() {
                    merged.reply_state = existing.reply_state;
                    merged.reply_timestamp = existing.reply_timestamp;
                    merged.reply_correlation_id = existing.reply_correlation_id.clone();
                }
                *existing = merged;
            }
            None => contacts.push(contact),
        }
        self.write_contacts(&contacts)
    }

    async fn record_reply(
        &self,
        phone: &str,
        decision: Decision,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ReplyWrite> {
        let _guard = self.lock.lock().await;
        let mut contacts = self.read_contacts()?;
        let Some(idx) = Self::find_index(&contacts, phone) else {
            return Ok(ReplyWrite::NotFound);
        };
        if let Some(prior) = contacts[idx].reply_state.decision() {
            return Ok(ReplyWrite::AlreadyAnswered(prior));
        }
        contacts[idx].reply_state = decision.into();
        contacts[idx].reply_timestamp = Some(now);
        contacts[idx].reply_correlation_id = Some(correlation_id.to_string());
        self.write_contacts(&contacts)?;
        Ok(ReplyWrite::Recorded)
    }

    async fn record_send(
        &self,
        phone: &str,
        cohort_id: Option<&str>,
        record: SendRecord,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut contacts = self.read_contacts()?;
        let needle = normalize_phone(phone);
        let cohort = cohort_id.unwrap_or("");
        let idx = contacts
            .iter()
            .position(|c| {
                normalize_phone(&c.phone) == needle
                    && c.cohort_id.as_deref().unwrap_or("") == cohort
            })
            .ok_or_else(|| Error::Store(format!("contact not found: {phone}")))?;

        match record {
            SendRecord::Sent { message_id, at } => {
                contacts[idx].send_state = SendState::Sent;
                contacts[idx].provider_message_id = Some(message_id);
                contacts[idx].send_timestamp = Some(at);
            }
            SendRecord::Failed { error, at } => {
                contacts[idx].send_state = SendState::SendError;
                contacts[idx].send_timestamp = Some(at);
                contacts[idx]
                    .attributes
                    .insert("last_send_error".to_string(), error);
            }
        }
        self.write_contacts(&contacts)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let _guard = self.lock.lock().await;
        Ok(compute_stats(&self.read_contacts()?))
    }

    async fn backup(&self) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        if !self.path.exists() {
            return Ok(None);
        }
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup_path = self.path.with_extension(format!("backup_{stamp}.csv"));
        std::fs::copy(&self.path, &backup_path)?;
        info!(path = %backup_path.display(), "roster backup created");
        Ok(Some(backup_path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(content: &str) -> (tempfile::TempDir, FlatFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(&path, content).unwrap();
        (dir, FlatFileStore::new(path))
    }

    #[tokio::test]
    async fn test_load_self_heals_tracking_columns() {
        let (_dir, store) = store_with("phone,display_name,opt_in\n573001112233,Ana,TRUE\n");
        let contacts = store.load().await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].phone, "573001112233");
        assert_eq!(contacts[0].opt_in, OptIn::Yes);
        assert_eq!(contacts[0].send_state, SendState::NotSent);
        assert_eq!(contacts[0].reply_state, ReplyState::NoReply);
    }

    #[tokio::test]
    async fn test_missing_phone_column_is_error() {
        let (_dir, store) = store_with("name\nAna\n");
        assert!(matches!(
            store.load().await,
            Err(Error::MissingColumn(col)) if col == "phone"
        ));
    }

    #[tokio::test]
    async fn test_extra_columns_round_trip_as_attributes() {
        let (_dir, store) =
            store_with("phone,opt_in,bootcamp,schedule\n573001112233,TRUE,IA,Mañana\n");
        let contacts = store.load().await.unwrap();
        assert_eq!(contacts[0].attributes.get("bootcamp").unwrap(), "IA");

        store.save(&contacts).await.unwrap();
        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded[0].attributes.get("schedule").unwrap(), "Mañana");
    }

    #[tokio::test]
    async fn test_record_reply_then_terminal_guard() {
        let (_dir, store) = store_with("phone,opt_in\n573001112233,TRUE\n");
        let now = Utc::now();

        let first = store
            .record_reply("573001112233", Decision::Yes, "btn_si", now)
            .await
            .unwrap();
        assert_eq!(first, ReplyWrite::Recorded);

        // Duplicate delivery of the same tap and a contradictory later answer
        // both hit the terminal guard
        for decision in [Decision::Yes, Decision::No] {
            let again = store
                .record_reply("573001112233", decision, "btn_no", Utc::now())
                .await
                .unwrap();
            assert_eq!(again, ReplyWrite::AlreadyAnswered(Decision::Yes));
        }

        let contact = store.find("573001112233").await.unwrap().unwrap();
        assert_eq!(contact.reply_state, ReplyState::Yes);
        assert_eq!(contact.reply_correlation_id.as_deref(), Some("btn_si"));
    }

    #[tokio::test]
    async fn test_record_reply_unknown_phone() {
        let (_dir, store) = store_with("phone,opt_in\n573001112233,TRUE\n");
        let result = store
            .record_reply("5739999999999", Decision::Yes, "x", Utc::now())
            .await
            .unwrap();
        assert_eq!(result, ReplyWrite::NotFound);
        // No contact was created
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_matches_with_plus_prefix() {
        let (_dir, store) = store_with("phone\n573001112233\n");
        let found = store.find("+57 300 111 2233").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_upsert_preserves_terminal_reply() {
        let (_dir, store) = store_with("phone,opt_in\n573001112233,TRUE\n");
        store
            .record_reply("573001112233", Decision::No, "btn_no", Utc::now())
            .await
            .unwrap();

        // Re-import the same row with fresh roster data
        let update = Contact::new("573001112233")
            .with_display_name("Ana María")
            .with_opt_in(OptIn::Yes);
        store.upsert(update).await.unwrap();

        let contact = store.find("573001112233").await.unwrap().unwrap();
        assert_eq!(contact.display_name.as_deref(), Some("Ana María"));
        assert_eq!(contact.reply_state, ReplyState::No);
    }

    #[tokio::test]
    async fn test_upsert_keyed_on_phone_and_cohort() {
        let (_dir, store) = store_with("phone,cohort_id\n573001112233,ia-01\n");
        store
            .upsert(Contact::new("573001112233").with_cohort("web-02"))
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap().len(), 2);

        store
            .upsert(Contact::new("573001112233").with_cohort("web-02"))
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_does_not_bootstrap_over_unreadable_roster() {
        // Pointing the store at a directory makes every read fail with
        // something other than NotFound
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        let result = store.upsert(Contact::new("573001112233")).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_record_reply_touches_first_cohort_row_only() {
        let (_dir, store) = store_with(
            "phone,cohort_id,opt_in\n573001112233,ia-01,TRUE\n573001112233,web-02,TRUE\n",
        );
        let write = store
            .record_reply("573001112233", Decision::Yes, "btn_si", Utc::now())
            .await
            .unwrap();
        assert_eq!(write, ReplyWrite::Recorded);

        let contacts = store.load().await.unwrap();
        assert_eq!(contacts[0].reply_state, ReplyState::Yes);
        assert_eq!(contacts[1].reply_state, ReplyState::NoReply);
    }

    #[tokio::test]
    async fn test_record_send_checkpoints() {
        let (_dir, store) = store_with("phone,opt_in\n111,TRUE\n222,TRUE\n");
        store
            .record_send(
                "111",
                None,
                SendRecord::Sent {
                    message_id: "wamid.1".to_string(),
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();
        store
            .record_send(
                "222",
                None,
                SendRecord::Failed {
                    error: "rate limited".to_string(),
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let contacts = store.load().await.unwrap();
        assert_eq!(contacts[0].send_state, SendState::Sent);
        assert_eq!(contacts[0].provider_message_id.as_deref(), Some("wamid.1"));
        assert_eq!(contacts[1].send_state, SendState::SendError);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_backup_snapshot() {
        let (dir, store) = store_with("phone\n111\n");
        let backup = store.backup().await.unwrap().unwrap();
        assert!(std::path::Path::new(&backup).exists());
        assert!(backup.starts_with(dir.path().to_str().unwrap()));
    }
}
