//! SQLite-backed event store.
//!
//! Schema migration and pragma setup follow the usual open/migrate flow;
//! the connection lives behind a tokio mutex so the async trait methods
//! serialize access without blocking the runtime between calls.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DateRange, EventFilter, EventOrder, EventStore, StoreError};
use crate::models::{
    AlertLevel, CareCategory, CareEvent, HealthAlert, IndicatorRecord, NewCareEvent,
    NewHealthAlert, TrendType,
};

const MIGRATION_V1: &str = "
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);

CREATE TABLE care_events (
    id          BLOB PRIMARY KEY,
    subject_id  BLOB NOT NULL,
    category    TEXT NOT NULL,
    task_name   TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    notes       TEXT,
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX idx_care_events_subject_time
    ON care_events (subject_id, timestamp);
CREATE INDEX idx_care_events_subject_category
    ON care_events (subject_id, category, timestamp);

CREATE TABLE indicators (
    id          BLOB PRIMARY KEY,
    subject_id  BLOB NOT NULL,
    name        TEXT NOT NULL,
    value       TEXT NOT NULL,
    abnormal    INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL
);
CREATE INDEX idx_indicators_subject_time
    ON indicators (subject_id, recorded_at);

CREATE TABLE health_alerts (
    id          BLOB PRIMARY KEY,
    subject_id  BLOB NOT NULL,
    alert_type  TEXT NOT NULL,
    description TEXT NOT NULL,
    level       TEXT NOT NULL,
    resolved    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    resolved_at TEXT
);
CREATE INDEX idx_health_alerts_subject
    ON health_alerts (subject_id, resolved);

INSERT INTO schema_version (version) VALUES (1);
";

/// Open a connection, configure pragmas and run pending migrations.
fn open_connection(conn: Connection) -> Result<Connection, StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;",
    )?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(1, MIGRATION_V1)];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Current schema version (0 if no schema exists yet).
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// SQLite implementation of [`EventStore`].
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = open_connection(Connection::open(path)?)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, primarily for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = open_connection(Connection::open_in_memory()?)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record a health indicator reading. Indicators are written by the
    /// wellness-check screens, outside the toggle path, so this is an
    /// inherent method rather than part of the [`EventStore`] trait.
    pub async fn record_indicator(
        &self,
        subject_id: Uuid,
        name: &str,
        value: &str,
        abnormal: bool,
        recorded_at: NaiveDateTime,
    ) -> Result<IndicatorRecord, StoreError> {
        let record = IndicatorRecord {
            id: Uuid::new_v4(),
            subject_id,
            name: name.to_string(),
            value: value.to_string(),
            abnormal,
            recorded_at,
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO indicators (id, subject_id, name, value, abnormal, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.subject_id,
                record.name,
                record.value,
                record.abnormal,
                record.recorded_at
            ],
        )?;
        Ok(record)
    }
}

/// Build the WHERE clause + params for an event query.
fn event_query_sql(filter: &EventFilter, order: EventOrder) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut bind: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(subject_id) = filter.subject_id {
        bind.push(Box::new(subject_id));
        clauses.push(format!("subject_id = ?{}", bind.len()));
    }
    if let Some(category) = filter.category {
        bind.push(Box::new(category.as_str()));
        clauses.push(format!("category = ?{}", bind.len()));
    }
    if let Some(range) = filter.date_range {
        bind.push(Box::new(range.start));
        clauses.push(format!("timestamp >= ?{}", bind.len()));
        bind.push(Box::new(range.end));
        clauses.push(format!("timestamp <= ?{}", bind.len()));
    }

    let mut sql = String::from(
        "SELECT id, subject_id, category, task_name, timestamp, notes, created_by, created_at
         FROM care_events",
    );
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(match order {
        EventOrder::NewestFirst => " ORDER BY timestamp DESC",
        EventOrder::OldestFirst => " ORDER BY timestamp ASC",
    });

    (sql, bind)
}

/// Row tuple read before enum parsing.
type RawEventRow = (
    Uuid,
    Uuid,
    String,
    String,
    NaiveDateTime,
    Option<String>,
    String,
    NaiveDateTime,
);

fn event_from_raw(raw: RawEventRow) -> Result<CareEvent, StoreError> {
    let (id, subject_id, category, task_name, timestamp, notes, created_by, created_at) = raw;
    Ok(CareEvent {
        id,
        subject_id,
        category: CareCategory::from_str(&category)?,
        task_name,
        timestamp,
        notes,
        created_by,
        created_at,
    })
}

type RawAlertRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    bool,
    NaiveDateTime,
    Option<NaiveDateTime>,
);

fn alert_from_raw(raw: RawAlertRow) -> Result<HealthAlert, StoreError> {
    let (id, subject_id, alert_type, description, level, resolved, created_at, resolved_at) = raw;
    Ok(HealthAlert {
        id,
        subject_id,
        alert_type: TrendType::from_str(&alert_type)?,
        description,
        level: AlertLevel::from_str(&level)?,
        resolved,
        created_at,
        resolved_at,
    })
}

const ALERT_COLUMNS: &str =
    "id, subject_id, alert_type, description, level, resolved, created_at, resolved_at";

fn fetch_alert(conn: &Connection, alert_id: Uuid) -> Result<HealthAlert, StoreError> {
    let raw: RawAlertRow = conn
        .query_row(
            &format!("SELECT {ALERT_COLUMNS} FROM health_alerts WHERE id = ?1"),
            params![alert_id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                entity_type: "health_alert".into(),
                id: alert_id.to_string(),
            },
            other => StoreError::Sqlite(other),
        })?;
    alert_from_raw(raw)
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn query(
        &self,
        filter: &EventFilter,
        order: EventOrder,
    ) -> Result<Vec<CareEvent>, StoreError> {
        let conn = self.conn.lock().await;
        let (sql, bind) = event_query_sql(filter, order);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(event_from_raw(row?)?);
        }
        Ok(events)
    }

    async fn latest_per_category(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<(CareCategory, NaiveDateTime)>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT category, MAX(timestamp) FROM care_events
             WHERE subject_id = ?1
             GROUP BY category",
        )?;
        let rows = stmt.query_map(params![subject_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, NaiveDateTime>(1)?))
        })?;

        let mut latest = Vec::new();
        for row in rows {
            let (category, timestamp) = row?;
            latest.push((CareCategory::from_str(&category)?, timestamp));
        }
        Ok(latest)
    }

    async fn insert(&self, event: NewCareEvent) -> Result<CareEvent, StoreError> {
        let stored = CareEvent {
            id: Uuid::new_v4(),
            subject_id: event.subject_id,
            category: event.category,
            task_name: event.task_name,
            timestamp: event.timestamp,
            notes: event.notes,
            created_by: event.created_by,
            created_at: Utc::now().naive_utc(),
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO care_events
                 (id, subject_id, category, task_name, timestamp, notes, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id,
                stored.subject_id,
                stored.category.as_str(),
                stored.task_name,
                stored.timestamp,
                stored.notes,
                stored.created_by,
                stored.created_at
            ],
        )?;
        Ok(stored)
    }

    async fn delete(&self, event_id: Uuid) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let affected = conn.execute("DELETE FROM care_events WHERE id = ?1", params![event_id])?;
        Ok(affected > 0)
    }

    async fn query_indicators(
        &self,
        subject_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<IndicatorRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, subject_id, name, value, abnormal, recorded_at
             FROM indicators
             WHERE subject_id = ?1 AND recorded_at >= ?2 AND recorded_at <= ?3
             ORDER BY recorded_at DESC",
        )?;
        let rows = stmt.query_map(params![subject_id, range.start, range.end], |row| {
            Ok(IndicatorRecord {
                id: row.get(0)?,
                subject_id: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
                abnormal: row.get(4)?,
                recorded_at: row.get(5)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn query_alerts(
        &self,
        subject_id: Uuid,
        resolved: bool,
    ) -> Result<Vec<HealthAlert>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM health_alerts
             WHERE subject_id = ?1 AND resolved = ?2
             ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![subject_id, resolved], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(alert_from_raw(row?)?);
        }
        Ok(alerts)
    }

    async fn insert_alert(&self, alert: NewHealthAlert) -> Result<HealthAlert, StoreError> {
        let stored = HealthAlert {
            id: Uuid::new_v4(),
            subject_id: alert.subject_id,
            alert_type: alert.alert_type,
            description: alert.description,
            level: alert.level,
            resolved: false,
            created_at: Utc::now().naive_utc(),
            resolved_at: None,
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO health_alerts
                 (id, subject_id, alert_type, description, level, resolved, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                stored.id,
                stored.subject_id,
                stored.alert_type.as_str(),
                stored.description,
                stored.level.as_str(),
                stored.created_at
            ],
        )?;
        Ok(stored)
    }

    async fn resolve_alert(&self, alert_id: Uuid) -> Result<HealthAlert, StoreError> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(
            "UPDATE health_alerts
             SET resolved = 1, resolved_at = COALESCE(resolved_at, ?2)
             WHERE id = ?1",
            params![alert_id, Utc::now().naive_utc()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                entity_type: "health_alert".into(),
                id: alert_id.to_string(),
            });
        }
        let alert = fetch_alert(&conn, alert_id)?;
        tracing::info!(alert_id = %alert_id, alert_type = %alert.alert_type.as_str(), "Alert resolved");
        Ok(alert)
    }
}
