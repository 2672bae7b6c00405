use std::error::Error;
use std::path::PathBuf;

use clap::Subcommand;

use stego::config::Store;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
	/// Print every stored setting, filling in documented defaults
	List {
		#[clap(long, default_value = "./stego.sqlite")]
		db_path: PathBuf,
	},

	/// Set a single key/value pair
	Set {
		key: String,
		value: String,
		#[clap(long, default_value = "./stego.sqlite")]
		db_path: PathBuf,
	},
}

pub fn run(cmd: ConfigCommands) -> Result<(), Box<dyn Error>> {
	match cmd {
		ConfigCommands::List { db_path } => {
			let store = Store::open(db_path)?;
			let mut values: Vec<_> = store.get_all_with_defaults().into_iter().collect();
			values.sort();
			for (k, v) in values {
				println!("{k} = {v}");
			}
			Ok(())
		}
		ConfigCommands::Set { key, value, db_path } => {
			let store = Store::open(db_path)?;
			let mut values = std::collections::HashMap::new();
			values.insert(key, value);
			store.save_all(&values)?;
			Ok(())
		}
	}
}
