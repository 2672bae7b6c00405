//! Key/value configuration store for operation defaults, backed by SQLite
//! with an in-memory fallback when no database path is given.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::Result;

pub const KEY_DEFAULT_CARRIER_DIR: &str = "defaultCarrierDir";
pub const KEY_DEFAULT_OUTPUT_DIR: &str = "defaultOutputDir";
pub const KEY_DEFAULT_ENCRYPT_PASSWORD: &str = "defaultEncryptPassword";
pub const KEY_DEFAULT_DECRYPT_PASSWORD: &str = "defaultDecryptPassword";
pub const KEY_DEFAULT_ENCRYPT_OUTPUT_NAME: &str = "defaultEncryptOutputName";
pub const KEY_AUTHOR: &str = "author";
pub const KEY_REPOSITORY: &str = "repository";
pub const KEY_CONTACT: &str = "contact";

const SCHEMA_INIT: &str = "CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v TEXT NOT NULL);";

enum Backend {
	Sqlite(Mutex<Connection>),
	Memory(Mutex<HashMap<String, String>>),
}

/// A flat string-keyed settings table. Construct with [`Store::in_memory`]
/// for tests and transient use, or [`Store::open`] for a persisted store.
pub struct Store {
	backend: Backend,
}

impl Store {
	pub fn in_memory() -> Self {
		Store {
			backend: Backend::Memory(Mutex::new(HashMap::new())),
		}
	}

	pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
		let db_path = db_path.as_ref();
		if let Some(parent) = db_path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let conn = Connection::open(db_path)?;
		conn.execute(SCHEMA_INIT, [])?;
		Ok(Store {
			backend: Backend::Sqlite(Mutex::new(conn)),
		})
	}

	pub fn get_all(&self) -> HashMap<String, String> {
		match &self.backend {
			Backend::Memory(mem) => mem.lock().unwrap().clone(),
			Backend::Sqlite(conn) => {
				let conn = conn.lock().unwrap();
				let mut out = HashMap::new();
				let Ok(mut stmt) = conn.prepare("SELECT k, v FROM kv") else {
					return out;
				};
				let Ok(rows) = stmt.query_map([], |row| {
					Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
				}) else {
					return out;
				};
				for row in rows.flatten() {
					out.insert(row.0, row.1);
				}
				out
			}
		}
	}

	pub fn save_all(&self, values: &HashMap<String, String>) -> Result<()> {
		match &self.backend {
			Backend::Memory(mem) => {
				let mut mem = mem.lock().unwrap();
				for (k, v) in values {
					if k.is_empty() {
						continue;
					}
					mem.insert(k.clone(), v.clone());
				}
				Ok(())
			}
			Backend::Sqlite(conn) => {
				let mut conn = conn.lock().unwrap();
				let tx = conn.transaction()?;
				{
					let mut stmt = tx.prepare(
						"INSERT INTO kv(k, v) VALUES(?1, ?2) ON CONFLICT(k) DO UPDATE SET v = excluded.v",
					)?;
					for (k, v) in values {
						if k.is_empty() {
							continue;
						}
						stmt.execute((k, v))?;
					}
				}
				tx.commit()?;
				Ok(())
			}
		}
	}

	/// Fills in documented defaults for any key absent from the store.
	pub fn get_all_with_defaults(&self) -> HashMap<String, String> {
		let mut m = self.get_all();
		m.entry(KEY_DEFAULT_CARRIER_DIR.to_string())
			.or_insert_with(|| "./images".to_string());
		m.entry(KEY_DEFAULT_OUTPUT_DIR.to_string())
			.or_insert_with(|| "./output".to_string());
		m.entry(KEY_DEFAULT_ENCRYPT_PASSWORD.to_string())
			.or_default();
		m.entry(KEY_DEFAULT_DECRYPT_PASSWORD.to_string())
			.or_default();
		m.entry(KEY_DEFAULT_ENCRYPT_OUTPUT_NAME.to_string())
			.or_insert_with(|| "encrypted".to_string());
		m.entry(KEY_AUTHOR.to_string()).or_default();
		m.entry(KEY_REPOSITORY.to_string()).or_default();
		m.entry(KEY_CONTACT.to_string()).or_default();
		m
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn in_memory_store_roundtrips() {
		let store = Store::in_memory();
		let mut values = HashMap::new();
		values.insert(KEY_AUTHOR.to_string(), "jane".to_string());
		store.save_all(&values).unwrap();
		assert_eq!(store.get_all().get(KEY_AUTHOR).unwrap(), "jane");
	}

	#[test]
	fn sqlite_store_roundtrips() {
		let dir = tempfile::tempdir().unwrap();
		let store = Store::open(dir.path().join("config.sqlite")).unwrap();
		let mut values = HashMap::new();
		values.insert(KEY_DEFAULT_CARRIER_DIR.to_string(), "/tmp/carriers".to_string());
		store.save_all(&values).unwrap();
		assert_eq!(
			store.get_all().get(KEY_DEFAULT_CARRIER_DIR).unwrap(),
			"/tmp/carriers"
		);
	}

	#[test]
	fn defaults_fill_in_missing_keys() {
		let store = Store::in_memory();
		let defaults = store.get_all_with_defaults();
		assert_eq!(defaults.get(KEY_DEFAULT_OUTPUT_DIR).unwrap(), "./output");
		assert_eq!(
			defaults.get(KEY_DEFAULT_ENCRYPT_OUTPUT_NAME).unwrap(),
			"encrypted"
		);
	}

	#[test]
	fn save_overwrites_existing_key() {
		let store = Store::in_memory();
		let mut values = HashMap::new();
		values.insert(KEY_AUTHOR.to_string(), "first".to_string());
		store.save_all(&values).unwrap();
		values.insert(KEY_AUTHOR.to_string(), "second".to_string());
		store.save_all(&values).unwrap();
		assert_eq!(store.get_all().get(KEY_AUTHOR).unwrap(), "second");
	}
}
