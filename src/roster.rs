//! SQLite-backed roster of known persons.
//!
//! The roster table needs at least a `name` (text) and a `picture` (image
//! blob) column. The recognizer labels faces by a record's position in
//! [`Roster::select`], so rows are always read in `rowid` order.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// One roster row. Either field may be missing; such rows are not trainable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RosterRecord {
    pub name: Option<String>,
    pub picture: Option<Vec<u8>>,
}

impl RosterRecord {
    /// Name and picture are both present and non-empty.
    #[must_use]
    pub fn is_trainable(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
            && self.picture.as_deref().is_some_and(|p| !p.is_empty())
    }

    #[must_use]
    pub fn picture_len(&self) -> usize {
        self.picture.as_ref().map_or(0, Vec::len)
    }
}

/// Handle on the roster table.
#[derive(Debug)]
pub struct Roster {
    path: PathBuf,
    table: String,
    conn: Connection,
}

impl Roster {
    /// Open an existing roster read-only and check that `table` is queryable.
    ///
    /// `table` must already be validated as a plain identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the table is missing.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening roster at {}", path.display());

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        let roster = Self {
            path,
            table: table.to_string(),
            conn,
        };
        roster.log_summary()?;
        Ok(roster)
    }

    /// Open a roster for writing, creating the file and table if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or table cannot be created.
    pub fn create(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch(&create_table_sql(table))?;

        info!("Roster ready at {}", path.display());
        Ok(Self {
            path,
            table: table.to_string(),
            conn,
        })
    }

    /// Create an in-memory roster for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(table: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        conn.execute_batch(&create_table_sql(table))?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            table: table.to_string(),
            conn,
        })
    }

    /// Try [`Roster::open`] up to `attempts` times, sleeping `delay` between
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns `Error::DatabaseUnavailable` when every attempt fails.
    pub fn connect_with_retry(
        path: impl AsRef<Path>,
        table: &str,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self> {
        let path = path.as_ref();

        for attempt in 1..=attempts {
            match Self::open(path, table) {
                Ok(roster) => return Ok(roster),
                Err(err) => {
                    warn!("Database connection attempt {attempt}/{attempts} failed: {err}");
                    if attempt < attempts {
                        thread::sleep(delay);
                    }
                }
            }
        }

        Err(Error::DatabaseUnavailable {
            path: path.to_path_buf(),
            attempts,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of rows in the roster table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// All records in row order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn select(&self) -> Result<Vec<RosterRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, picture FROM {} ORDER BY rowid",
            self.table
        ))?;

        let records = stmt
            .query_map([], |row| {
                Ok(RosterRecord {
                    name: row.get(0)?,
                    picture: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// The record at `index` in row order, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn record(&self, index: usize) -> Result<Option<RosterRecord>> {
        let offset = i64::try_from(index).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, picture FROM {} ORDER BY rowid LIMIT 1 OFFSET ?1",
            self.table
        ))?;
        let mut rows = stmt.query([offset])?;

        match rows.next()? {
            Some(row) => Ok(Some(RosterRecord {
                name: row.get(0)?,
                picture: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    /// Insert a person with their reference photo. Returns the new row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster was opened read-only or the insert fails.
    pub fn enroll(&self, name: &str, picture: &[u8]) -> Result<i64> {
        self.conn.execute(
            &format!("INSERT INTO {} (name, picture) VALUES (?1, ?2)", self.table),
            params![name, picture],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Enrolled '{}' as row {}", name, id);
        Ok(id)
    }

    fn log_summary(&self) -> Result<()> {
        let count = self.row_count()?;
        info!("Roster table '{}' has {} records", self.table, count);
        if let Some(first) = self.record(0)? {
            debug!(
                "First record: name={:?}, picture size={}",
                first.name.as_deref().unwrap_or(""),
                first.picture_len()
            );
        }
        Ok(())
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        r"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            picture BLOB
        )
        "
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_with(rows: &[(Option<&str>, Option<&[u8]>)]) -> Roster {
        let roster = Roster::open_in_memory("user_profile").unwrap();
        for (name, picture) in rows {
            roster
                .conn
                .execute(
                    "INSERT INTO user_profile (name, picture) VALUES (?1, ?2)",
                    params![name, picture],
                )
                .unwrap();
        }
        roster
    }

    #[test]
    fn test_select_preserves_row_order() {
        let roster = Roster::open_in_memory("user_profile").unwrap();
        roster.enroll("alice", &[1, 2, 3]).unwrap();
        roster.enroll("bob", &[4]).unwrap();
        roster.enroll("carol", &[5, 6]).unwrap();

        let names: Vec<_> = roster
            .select()
            .unwrap()
            .into_iter()
            .map(|r| r.name.unwrap())
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
        assert_eq!(roster.row_count().unwrap(), 3);
    }

    #[test]
    fn test_null_fields_are_preserved() {
        let roster = roster_with(&[(None, Some(&[1u8][..])), (Some("dave"), None)]);
        let records = roster.select().unwrap();

        assert_eq!(records[0].name, None);
        assert_eq!(records[1].picture, None);
        assert!(!records[0].is_trainable());
        assert!(!records[1].is_trainable());
    }

    #[test]
    fn test_empty_fields_are_not_trainable() {
        let record = RosterRecord {
            name: Some(String::new()),
            picture: Some(vec![1]),
        };
        assert!(!record.is_trainable());

        let record = RosterRecord {
            name: Some("erin".to_string()),
            picture: Some(Vec::new()),
        };
        assert!(!record.is_trainable());
    }

    #[test]
    fn test_record_by_index() {
        let roster = Roster::open_in_memory("user_profile").unwrap();
        roster.enroll("alice", &[1]).unwrap();
        roster.enroll("bob", &[2, 2]).unwrap();

        let second = roster.record(1).unwrap().unwrap();
        assert_eq!(second.name.as_deref(), Some("bob"));
        assert_eq!(second.picture_len(), 2);
        assert!(roster.record(2).unwrap().is_none());
    }

    #[test]
    fn test_open_reads_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("roster.db");
        {
            let roster = Roster::create(&path, "user_profile").unwrap();
            roster.enroll("alice", &[9, 9, 9]).unwrap();
        }

        let roster = Roster::open(&path, "user_profile").unwrap();
        assert_eq!(roster.row_count().unwrap(), 1);
        assert_eq!(roster.table(), "user_profile");
        assert_eq!(roster.path(), path.as_path());
    }

    #[test]
    fn test_read_only_roster_rejects_enroll() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");
        Roster::create(&path, "user_profile").unwrap();

        let roster = Roster::open(&path, "user_profile").unwrap();
        assert!(roster.enroll("mallory", &[1]).is_err());
    }

    #[test]
    fn test_open_fails_on_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");
        Roster::create(&path, "user_profile").unwrap();

        assert!(Roster::open(&path, "other_table").is_err());
    }

    #[test]
    fn test_retry_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = Roster::connect_with_retry(&path, "user_profile", 2, Duration::from_millis(1))
            .unwrap_err();
        assert!(matches!(err, Error::DatabaseUnavailable { attempts: 2, .. }));
        // read-only open must not create the file
        assert!(!path.exists());
    }

    #[test]
    fn test_retry_sleeps_between_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let started = std::time::Instant::now();
        let err = Roster::connect_with_retry(&path, "user_profile", 3, Duration::from_millis(50))
            .unwrap_err();

        // two pauses, none after the last attempt
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(matches!(err, Error::DatabaseUnavailable { attempts: 3, .. }));
    }

    #[test]
    fn test_retry_succeeds_first_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");
        Roster::create(&path, "user_profile").unwrap();

        let roster =
            Roster::connect_with_retry(&path, "user_profile", 3, Duration::from_secs(60)).unwrap();
        assert_eq!(roster.row_count().unwrap(), 0);
    }
}
