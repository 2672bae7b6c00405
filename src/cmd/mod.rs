pub mod config;
pub mod decrypt;
pub mod encrypt;
pub mod generate;
pub mod log;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "stego", version, about = "Hide and recover payloads inside images")]
pub struct Cli {
	#[clap(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Hide a file or directory inside a carrier image
	Encrypt(encrypt::EncryptArgs),

	/// Recover a payload from a stego image
	Decrypt(decrypt::DecryptArgs),

	/// Generate synthetic carrier images with known capacity
	Generate(generate::GenerateArgs),

	/// Inspect or update stored defaults
	#[clap(subcommand)]
	Config(config::ConfigCommands),

	/// Inspect the append-only operation log
	#[clap(subcommand)]
	Log(log::LogCommands),
}
