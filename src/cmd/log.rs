use std::error::Error;
use std::path::PathBuf;

use clap::Subcommand;

use stego::logstore::Store;

#[derive(Subcommand, Debug)]
pub enum LogCommands {
	/// Print the most recent log entries
	Tail {
		#[clap(long, default_value_t = 50)]
		limit: i64,
		#[clap(long, default_value = "./stego-log.sqlite")]
		db_path: PathBuf,
	},

	/// Export all log entries as JSON
	Export {
		#[clap(long, default_value = "./stego-log.sqlite")]
		db_path: PathBuf,
	},

	/// Delete every stored log entry
	Clear {
		#[clap(long, default_value = "./stego-log.sqlite")]
		db_path: PathBuf,
	},
}

pub fn run(cmd: LogCommands) -> Result<(), Box<dyn Error>> {
	match cmd {
		LogCommands::Tail { limit, db_path } => {
			let store = Store::open(db_path)?;
			for entry in store.get(limit, 0)? {
				println!(
					"[{}] {} {}: {}",
					entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
					entry.level,
					entry.module,
					entry.message
				);
			}
			Ok(())
		}
		LogCommands::Export { db_path } => {
			let store = Store::open(db_path)?;
			let start = chrono::DateTime::<chrono::Utc>::MIN_UTC;
			let end = chrono::Utc::now();
			println!("{}", store.export_as_json(start, end)?);
			Ok(())
		}
		LogCommands::Clear { db_path } => {
			let store = Store::open(db_path)?;
			store.clear()?;
			Ok(())
		}
	}
}
