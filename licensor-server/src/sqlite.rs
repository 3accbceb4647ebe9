//! SQLite-backed record store.
//!
//! Every read and write goes to the database file, so a running server sees
//! licenses and tokens that the CLI adds later, and separate processes can
//! write to the same file at the same time. WAL mode plus a busy timeout
//! handles lock contention between processes. Inside one process the
//! connection sits behind a mutex.

use crate::store::{
    DeviceRecord, DeviceRegistration, DeviceStore, LicenseRecord, LicenseStore, StoreError,
    StoreResult, TokenRecord, TokenStore,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

// busy_timeout goes first so the WAL switch itself waits on a locked file.
const PRAGMAS: &str = "
    PRAGMA busy_timeout = 5000;
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS licenses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id TEXT NOT NULL,
        license_key TEXT NOT NULL DEFAULT '',
        license_type TEXT NOT NULL,
        expiry_date TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_licenses_device ON licenses(device_id);

    CREATE TABLE IF NOT EXISTS tokens (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token TEXT NOT NULL UNIQUE,
        token_type TEXT NOT NULL,
        app_id TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        expires_at TEXT,
        revoked INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS devices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id TEXT NOT NULL UNIQUE,
        device_name TEXT NOT NULL DEFAULT '',
        app_id TEXT NOT NULL DEFAULT '',
        license_id INTEGER,
        status TEXT NOT NULL DEFAULT 'active',
        registered_at TEXT NOT NULL,
        last_seen TEXT NOT NULL
    );
";

const LICENSE_COLUMNS: &str =
    "id, device_id, license_key, license_type, expiry_date, created_at";
const TOKEN_COLUMNS: &str = "id, token, token_type, app_id, created_at, expires_at, revoked";
const DEVICE_COLUMNS: &str =
    "id, device_id, device_name, app_id, license_id, status, registered_at, last_seen";

/// Persistent store for licenses, API tokens and devices.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening record database");
        Self::init(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

fn id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|e| conversion_error(idx, Type::Integer, e.to_string()))
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: T::Err| conversion_error(idx, Type::Text, e.to_string()))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, e.to_string()))
}

fn license_from_row(row: &Row<'_>) -> rusqlite::Result<LicenseRecord> {
    Ok(LicenseRecord {
        id: id_column(row, 0)?,
        device_id: row.get(1)?,
        license_key: row.get(2)?,
        license_type: parsed_column(row, 3)?,
        expiry_date: time_column(row, 4)?,
        created_at: time_column(row, 5)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<TokenRecord> {
    let expires_at = match row.get::<_, Option<String>>(5)? {
        Some(_) => Some(time_column(row, 5)?),
        None => None,
    };
    Ok(TokenRecord {
        id: id_column(row, 0)?,
        token: row.get(1)?,
        token_type: parsed_column(row, 2)?,
        app_id: row.get(3)?,
        created_at: time_column(row, 4)?,
        expires_at,
        revoked: row.get(6)?,
    })
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceRecord> {
    let license_id = match row.get::<_, Option<i64>>(4)? {
        Some(_) => Some(id_column(row, 4)?),
        None => None,
    };
    Ok(DeviceRecord {
        id: id_column(row, 0)?,
        device_id: row.get(1)?,
        device_name: row.get(2)?,
        app_id: row.get(3)?,
        license_id,
        status: parsed_column(row, 5)?,
        registered_at: time_column(row, 6)?,
        last_seen: time_column(row, 7)?,
    })
}

fn rowid(conn: &Connection) -> StoreResult<u64> {
    u64::try_from(conn.last_insert_rowid()).map_err(|e| {
        StoreError::Database(conversion_error(0, Type::Integer, e.to_string()))
    })
}

impl LicenseStore for SqliteStore {
    fn find_license_by_device(&self, device_id: &str) -> StoreResult<Option<LicenseRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {LICENSE_COLUMNS} FROM licenses WHERE device_id = ?1 ORDER BY id LIMIT 1"
                ),
                params![device_id],
                license_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn save_license(&self, record: LicenseRecord) -> StoreResult<u64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO licenses (device_id, license_key, license_type, expiry_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.device_id,
                record.license_key,
                record.license_type.as_str(),
                record.expiry_date.to_rfc3339(),
                record.created_at.to_rfc3339(),
            ],
        )?;
        rowid(&conn)
    }
}

impl TokenStore for SqliteStore {
    fn find_token(&self, token: &str) -> StoreResult<Option<TokenRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token = ?1"),
                params![token],
                token_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn save_token(&self, record: TokenRecord) -> StoreResult<u64> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO tokens (token, token_type, app_id, created_at, expires_at, revoked)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.token,
                record.token_type.to_string(),
                record.app_id,
                record.created_at.to_rfc3339(),
                record.expires_at.map(|t| t.to_rfc3339()),
                record.revoked,
            ],
        );
        match inserted {
            Ok(_) => rowid(&conn),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::DuplicateToken)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn revoke_token(&self, token: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tokens SET revoked = 1 WHERE token = ?1",
            params![token],
        )?;
        Ok(changed > 0)
    }
}

impl DeviceStore for SqliteStore {
    fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE device_id = ?1"),
                params![device_id],
                device_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn register_device(
        &self,
        registration: DeviceRegistration,
        now: DateTime<Utc>,
    ) -> StoreResult<DeviceRecord> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO devices (device_id, device_name, app_id, license_id, status, registered_at, last_seen)
             VALUES (?1, ?2, ?3,
                     (SELECT id FROM licenses WHERE device_id = ?1 ORDER BY id LIMIT 1),
                     'active', ?4, ?4)
             ON CONFLICT(device_id) DO UPDATE SET
                 device_name = excluded.device_name,
                 app_id = excluded.app_id,
                 license_id = COALESCE(excluded.license_id, devices.license_id),
                 last_seen = excluded.last_seen",
            params![
                registration.device_id,
                registration.device_name,
                registration.app_id,
                now.to_rfc3339(),
            ],
        )?;
        let record = conn.query_row(
            &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE device_id = ?1"),
            params![registration.device_id],
            device_from_row,
        )?;
        Ok(record)
    }

    fn touch_device(&self, device_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE devices SET last_seen = ?2 WHERE device_id = ?1",
            params![device_id, now.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }
}
