mod cmd;

use std::error::Error;

use clap::Parser;
use cmd::{Cli, Commands};

fn main() -> Result<(), Box<dyn Error>> {
	env_logger::init();
	let cli = Cli::parse();

	match cli.command {
		Commands::Encrypt(args) => cmd::encrypt::run(args),
		Commands::Decrypt(args) => cmd::decrypt::run(args),
		Commands::Generate(args) => cmd::generate::run(args),
		Commands::Config(cmd) => cmd::config::run(cmd),
		Commands::Log(cmd) => cmd::log::run(cmd),
	}
}
