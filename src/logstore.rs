//! Append-only structured log store, backed by SQLite.
//!
//! Every column, including `details`, is written through a parameterized
//! statement. The system this was ported from built the `details` column by
//! string interpolation while parameterizing the rest of the row - a SQL
//! injection hazard fixed here by binding every column uniformly. JSON
//! export goes through `serde_json` rather than hand-built string
//! concatenation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::sync::Mutex;

use crate::error::Result;

/// Severity of a log entry. Stored in the `level` column as its lowercase
/// name via `as_str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
	Debug,
	Info,
	Warn,
	Error,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
	pub id: i64,
	pub timestamp: DateTime<Utc>,
	pub level: String,
	pub module: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<String>,
}

pub struct Store {
	conn: Mutex<Connection>,
}

impl Store {
	pub fn open(db_path: impl AsRef<std::path::Path>) -> Result<Self> {
		let db_path = db_path.as_ref();
		if let Some(parent) = db_path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let conn = Connection::open(db_path)?;
		conn.execute_batch(
			"CREATE TABLE IF NOT EXISTS logs (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
				level TEXT NOT NULL,
				module TEXT NOT NULL,
				message TEXT NOT NULL,
				details TEXT
			);
			CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp DESC);
			CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level);",
		)?;
		Ok(Store {
			conn: Mutex::new(conn),
		})
	}

	pub fn add(&self, level: &str, module: &str, message: &str, details: Option<&str>) -> Result<()> {
		let conn = self.conn.lock().unwrap();
		conn.execute(
			"INSERT INTO logs (timestamp, level, module, message, details) VALUES (?1, ?2, ?3, ?4, ?5)",
			params![Utc::now(), level, module, message, details],
		)?;
		Ok(())
	}

	pub fn get(&self, limit: i64, offset: i64) -> Result<Vec<Entry>> {
		self.query(
			"SELECT id, timestamp, level, module, message, details FROM logs
			 ORDER BY timestamp DESC LIMIT ?1 OFFSET ?2",
			params![clamp_limit(limit), offset],
		)
	}

	pub fn get_by_time_range(
		&self,
		start: DateTime<Utc>,
		end: DateTime<Utc>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<Entry>> {
		self.query(
			"SELECT id, timestamp, level, module, message, details FROM logs
			 WHERE timestamp >= ?1 AND timestamp <= ?2
			 ORDER BY timestamp DESC LIMIT ?3 OFFSET ?4",
			params![start, end, clamp_limit(limit), offset],
		)
	}

	pub fn get_by_level(&self, level: &str, limit: i64, offset: i64) -> Result<Vec<Entry>> {
		self.query(
			"SELECT id, timestamp, level, module, message, details FROM logs
			 WHERE level = ?1
			 ORDER BY timestamp DESC LIMIT ?2 OFFSET ?3",
			params![level, clamp_limit(limit), offset],
		)
	}

	fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Entry>> {
		let conn = self.conn.lock().unwrap();
		let mut stmt = conn.prepare(sql)?;
		let rows = stmt.query_map(params, |row| {
			Ok(Entry {
				id: row.get(0)?,
				timestamp: row.get(1)?,
				level: row.get(2)?,
				module: row.get(3)?,
				message: row.get(4)?,
				details: row.get(5)?,
			})
		})?;
		let mut out = Vec::new();
		for row in rows {
			out.push(row?);
		}
		Ok(out)
	}

	pub fn count(&self) -> Result<i64> {
		let conn = self.conn.lock().unwrap();
		Ok(conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?)
	}

	pub fn clear(&self) -> Result<()> {
		let conn = self.conn.lock().unwrap();
		conn.execute("DELETE FROM logs", [])?;
		Ok(())
	}

	pub fn delete_before(&self, before: DateTime<Utc>) -> Result<usize> {
		let conn = self.conn.lock().unwrap();
		Ok(conn.execute("DELETE FROM logs WHERE timestamp < ?1", params![before])?)
	}

	pub fn export_as_text(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<String> {
		let entries = self.get_by_time_range(start, end, i64::MAX, 0)?;
		let mut out = String::new();
		for e in entries.iter().rev() {
			out.push_str(&format!(
				"[{}] {} {}: {}",
				e.timestamp.format("%Y-%m-%d %H:%M:%S"),
				e.level,
				e.module,
				e.message
			));
			if let Some(details) = &e.details {
				if !details.is_empty() {
					out.push_str(" - ");
					out.push_str(details);
				}
			}
			out.push('\n');
		}
		Ok(out)
	}

	/// Emits the time range as a JSON array via `serde_json`, ascending by
	/// timestamp.
	pub fn export_as_json(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<String> {
		let mut entries = self.get_by_time_range(start, end, i64::MAX, 0)?;
		entries.reverse();
		Ok(serde_json::to_string_pretty(&entries)?)
	}
}

fn clamp_limit(limit: i64) -> i64 {
	if limit <= 0 {
		100
	} else {
		limit.min(1000)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	#[test]
	fn add_then_get_returns_most_recent_first() {
		let dir = tempfile::tempdir().unwrap();
		let store = Store::open(dir.path().join("log.sqlite")).unwrap();
		store.add("info", "encrypt", "first", None).unwrap();
		store.add("info", "encrypt", "second", Some("detail")).unwrap();

		let entries = store.get(10, 0).unwrap();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].message, "second");
		assert_eq!(entries[0].details.as_deref(), Some("detail"));
		assert_eq!(entries[1].message, "first");
	}

	#[test]
	fn get_by_level_filters() {
		let dir = tempfile::tempdir().unwrap();
		let store = Store::open(dir.path().join("log.sqlite")).unwrap();
		store.add("info", "m", "a", None).unwrap();
		store.add("error", "m", "b", None).unwrap();

		let errors = store.get_by_level("error", 10, 0).unwrap();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].message, "b");
	}

	#[test]
	fn details_containing_sql_metacharacters_are_stored_verbatim() {
		let dir = tempfile::tempdir().unwrap();
		let store = Store::open(dir.path().join("log.sqlite")).unwrap();
		let hostile = "'; DROP TABLE logs; --";
		store.add("info", "m", "msg", Some(hostile)).unwrap();

		let entries = store.get(10, 0).unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].details.as_deref(), Some(hostile));
		// the table must still exist and be queryable
		assert_eq!(store.count().unwrap(), 1);
	}

	#[test]
	fn export_as_json_is_valid_json() {
		let dir = tempfile::tempdir().unwrap();
		let store = Store::open(dir.path().join("log.sqlite")).unwrap();
		store.add("info", "m", "hello\nworld", None).unwrap();
		let start = Utc::now() - Duration::hours(1);
		let end = Utc::now() + Duration::hours(1);
		let json = store.export_as_json(start, end).unwrap();
		let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
		assert!(parsed.is_array());
		assert_eq!(parsed[0]["message"], "hello\nworld");
	}

	#[test]
	fn delete_before_removes_old_entries() {
		let dir = tempfile::tempdir().unwrap();
		let store = Store::open(dir.path().join("log.sqlite")).unwrap();
		store.add("info", "m", "old", None).unwrap();
		let cutoff = Utc::now() + Duration::seconds(1);
		std::thread::sleep(std::time::Duration::from_millis(1100));
		store.add("info", "m", "new", None).unwrap();
		let removed = store.delete_before(cutoff).unwrap();
		assert_eq!(removed, 1);
		assert_eq!(store.count().unwrap(), 1);
	}
}
