use std::error::Error;
use std::path::PathBuf;

use clap::Args;

use stego::cancel::CancellationToken;
use stego::logger::StoreLogger;
use stego::logstore;
use stego::pipeline::{self, GenerateRequest};
use stego::progress::TerminalProgressSink;

#[derive(Args, Debug)]
pub struct GenerateArgs {
	/// Directory the generated PNGs are written under
	#[clap(long, default_value = "./images")]
	pub output_dir: PathBuf,

	/// Minimum number of payload bytes each carrier must be able to hold
	#[clap(long)]
	pub target_bytes: i64,

	/// How many carriers to generate
	#[clap(long, default_value_t = 1)]
	pub count: u32,

	/// File name prefix for the generated PNGs
	#[clap(long, default_value = "carrier")]
	pub prefix: String,

	/// Seed for reproducible generation; 0 is remapped to 1
	#[clap(long, default_value_t = 0)]
	pub seed: u64,

	/// Reserved for parity with the upstream generator's noise toggle
	#[clap(long)]
	pub noise_enabled: bool,

	/// Append-only log store the stage timings are persisted to
	#[clap(long, default_value = "./stego-log.sqlite")]
	pub log_db_path: PathBuf,
}

pub fn run(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
	let mut sink = TerminalProgressSink::new();
	let logger = StoreLogger::new(logstore::Store::open(&args.log_db_path)?);
	let cancel = CancellationToken::new();
	let paths = pipeline::generate(
		GenerateRequest {
			output_dir: args.output_dir,
			target_bytes: args.target_bytes,
			count: args.count,
			prefix: args.prefix,
			seed: args.seed,
			noise_enabled: args.noise_enabled,
		},
		&mut sink,
		&logger,
		&cancel,
	)?;

	for path in paths {
		println!("wrote {}", path.display());
	}
	Ok(())
}
