use std::error::Error;
use std::path::PathBuf;

use clap::Args;

use stego::cancel::CancellationToken;
use stego::logger::StoreLogger;
use stego::logstore;
use stego::pipeline::{self, DecryptRequest};
use stego::progress::TerminalProgressSink;

#[derive(Args, Debug)]
pub struct DecryptArgs {
	/// Stego image to extract from
	pub image_path: PathBuf,

	/// Password used for key derivation (and scatter, if the image used it)
	#[clap(long)]
	pub password: String,

	/// Directory the recovered file or directory is written under
	#[clap(long, default_value = "./output")]
	pub output_dir: PathBuf,

	/// Prefix used when the recovered payload is a directory
	#[clap(long, default_value = "stego")]
	pub identifier: String,

	/// Append-only log store the stage timings are persisted to
	#[clap(long, default_value = "./stego-log.sqlite")]
	pub log_db_path: PathBuf,
}

pub fn run(args: DecryptArgs) -> Result<(), Box<dyn Error>> {
	let mut sink = TerminalProgressSink::new();
	let logger = StoreLogger::new(logstore::Store::open(&args.log_db_path)?);
	let cancel = CancellationToken::new();
	let out = pipeline::decrypt(
		DecryptRequest {
			image_path: args.image_path,
			password: args.password,
			output_dir: args.output_dir,
			identifier: args.identifier,
		},
		&mut sink,
		&logger,
		&cancel,
	)?;

	println!("wrote {}", out.display());
	Ok(())
}
