//! Push subscription credentials: cached item, write intent and stored row.
//!
//! # Responsibility
//! - Define the item cached by the push credentials repository.
//! - Define the change/record pair exchanged with the durable store.
//! - Map subscription status between item and record vocabularies.
//!
//! # Invariants
//! - An item's id is `channel_id:client_id:device_id` and never stored
//!   separately on the item.
//! - Unknown stored status values read back as `WaitingForUnsubscribe`.

use crate::db::{DatabaseModel, DbError, DbResult, SqliteModel};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Lifecycle of one device push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushSubscriptionStatus {
    Active,
    WaitingForSubscribe,
    WaitingForUnsubscribe,
}

/// Credentials a device registered for push delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCredentials {
    pub site_id: i64,
    pub channel_id: String,
    pub client_id: String,
    pub device_id: String,
    /// Token issued by the push provider for this device.
    pub device_live_token: String,
    /// Unix epoch milliseconds of the last registration attempt.
    pub date_ms: i64,
    pub status: PushSubscriptionStatus,
}

impl PushCredentials {
    /// Repository index for these credentials.
    pub fn id(&self) -> String {
        [
            self.channel_id.as_str(),
            self.client_id.as_str(),
            self.device_id.as_str(),
        ]
        .join(":")
    }
}

/// Status vocabulary used by the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushCredentialsRecordStatus {
    Active,
    WaitingForRegister,
    WaitingForUnregister,
    Unknown,
}

impl PushCredentialsRecordStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::WaitingForRegister => "waiting_for_register",
            Self::WaitingForUnregister => "waiting_for_unregister",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_str(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "waiting_for_register" => Self::WaitingForRegister,
            "waiting_for_unregister" => Self::WaitingForUnregister,
            _ => Self::Unknown,
        }
    }
}

impl From<PushSubscriptionStatus> for PushCredentialsRecordStatus {
    fn from(value: PushSubscriptionStatus) -> Self {
        match value {
            PushSubscriptionStatus::Active => Self::Active,
            PushSubscriptionStatus::WaitingForSubscribe => Self::WaitingForRegister,
            PushSubscriptionStatus::WaitingForUnsubscribe => Self::WaitingForUnregister,
        }
    }
}

impl From<PushCredentialsRecordStatus> for PushSubscriptionStatus {
    fn from(value: PushCredentialsRecordStatus) -> Self {
        match value {
            PushCredentialsRecordStatus::Active => Self::Active,
            PushCredentialsRecordStatus::WaitingForRegister => Self::WaitingForSubscribe,
            PushCredentialsRecordStatus::WaitingForUnregister
            | PushCredentialsRecordStatus::Unknown => Self::WaitingForUnsubscribe,
        }
    }
}

/// Write intent for one `push_credentials` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCredentialsChange {
    pub id: String,
    pub site_id: i64,
    pub channel_id: String,
    pub client_id: String,
    pub device_id: String,
    pub device_live_token: String,
    pub date_ms: i64,
    pub status: PushCredentialsRecordStatus,
}

impl From<&PushCredentials> for PushCredentialsChange {
    fn from(item: &PushCredentials) -> Self {
        Self {
            id: item.id(),
            site_id: item.site_id,
            channel_id: item.channel_id.clone(),
            client_id: item.client_id.clone(),
            device_id: item.device_id.clone(),
            device_live_token: item.device_live_token.clone(),
            date_ms: item.date_ms,
            status: item.status.into(),
        }
    }
}

/// Stored `push_credentials` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCredentialsRecord {
    pub id: String,
    pub site_id: i64,
    pub channel_id: String,
    pub client_id: String,
    pub device_id: String,
    pub device_live_token: String,
    pub date_ms: i64,
    pub status: PushCredentialsRecordStatus,
    /// Assigned by the store on every write, epoch milliseconds.
    pub updated_at: i64,
}

impl From<&PushCredentialsRecord> for PushCredentials {
    fn from(record: &PushCredentialsRecord) -> Self {
        Self {
            site_id: record.site_id,
            channel_id: record.channel_id.clone(),
            client_id: record.client_id.clone(),
            device_id: record.device_id.clone(),
            device_live_token: record.device_live_token.clone(),
            date_ms: record.date_ms,
            status: record.status.into(),
        }
    }
}

impl DatabaseModel for PushCredentialsRecord {
    type Change = PushCredentialsChange;
    type MainKey = String;
}

const PUSH_CREDENTIALS_SELECT_SQL: &str = "SELECT
    id,
    site_id,
    channel_id,
    client_id,
    device_id,
    device_live_token,
    date_ms,
    status,
    updated_at
FROM push_credentials";

impl SqliteModel for PushCredentialsRecord {
    const TABLE: &'static str = "push_credentials";

    fn load_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(&format!("{PUSH_CREDENTIALS_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn upsert_change(conn: &Connection, change: &Self::Change) -> DbResult<Option<Self>> {
        if change.id.is_empty() {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO push_credentials (
                id,
                site_id,
                channel_id,
                client_id,
                device_id,
                device_live_token,
                date_ms,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                site_id = excluded.site_id,
                channel_id = excluded.channel_id,
                client_id = excluded.client_id,
                device_id = excluded.device_id,
                device_live_token = excluded.device_live_token,
                date_ms = excluded.date_ms,
                status = excluded.status,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                change.id.as_str(),
                change.site_id,
                change.channel_id.as_str(),
                change.client_id.as_str(),
                change.device_id.as_str(),
                change.device_live_token.as_str(),
                change.date_ms,
                change.status.as_db_str(),
            ],
        )?;

        Self::find(conn, &change.id)?.map(Some).ok_or_else(|| {
            DbError::InvalidData(format!(
                "push_credentials row `{}` missing after upsert",
                change.id
            ))
        })
    }

    fn find(conn: &Connection, key: &Self::MainKey) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(&format!("{PUSH_CREDENTIALS_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([key.as_str()], |row| Ok(parse_record_row(row)))
            .optional()?;
        row.transpose()
    }

    fn delete(conn: &Connection, object: &Self) -> DbResult<bool> {
        let changed = conn.execute(
            "DELETE FROM push_credentials WHERE id = ?1;",
            [object.id.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn delete_all(conn: &Connection) -> DbResult<usize> {
        Ok(conn.execute("DELETE FROM push_credentials;", [])?)
    }
}

fn parse_record_row(row: &Row<'_>) -> DbResult<PushCredentialsRecord> {
    let status_text: String = row.get("status")?;
    Ok(PushCredentialsRecord {
        id: row.get("id")?,
        site_id: row.get("site_id")?,
        channel_id: row.get("channel_id")?,
        client_id: row.get("client_id")?,
        device_id: row.get("device_id")?,
        device_live_token: row.get("device_live_token")?,
        date_ms: row.get("date_ms")?,
        status: PushCredentialsRecordStatus::from_db_str(&status_text),
        updated_at: row.get("updated_at")?,
    })
}
