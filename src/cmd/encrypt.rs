use std::error::Error;
use std::path::PathBuf;

use clap::Args;

use stego::cancel::CancellationToken;
use stego::logger::StoreLogger;
use stego::logstore;
use stego::pipeline::{self, CarrierSource, EncryptRequest};
use stego::progress::TerminalProgressSink;

#[derive(Args, Debug)]
pub struct EncryptArgs {
	/// File or directory to hide
	pub data_source: PathBuf,

	/// Explicit carrier image; if omitted, one is auto-selected from --carrier-dir
	#[clap(long)]
	pub carrier_image: Option<PathBuf>,

	/// Directory to auto-select a carrier from when --carrier-image is omitted
	#[clap(long, default_value = "./images")]
	pub carrier_dir: PathBuf,

	/// Prefer the carrier with the largest capacity instead of the most textured one
	#[clap(long)]
	pub prefer_largest_image: bool,

	/// Password used for key derivation and, if --scatter is set, slot scattering
	#[clap(long)]
	pub password: String,

	/// Directory the output PNG is written under
	#[clap(long, default_value = "./output")]
	pub output_dir: PathBuf,

	/// Base name (without extension) of the output file
	#[clap(long, default_value = "encrypted")]
	pub output_file_name: String,

	/// Scatter the payload across slots using the password (default: on)
	#[clap(long, default_value_t = true)]
	pub scatter: bool,

	/// Append-only log store the stage timings are persisted to
	#[clap(long, default_value = "./stego-log.sqlite")]
	pub log_db_path: PathBuf,
}

pub fn run(args: EncryptArgs) -> Result<(), Box<dyn Error>> {
	let carrier = match args.carrier_image {
		Some(path) => CarrierSource::Explicit(path),
		None => CarrierSource::AutoSelect {
			dir: args.carrier_dir,
			prefer_largest: args.prefer_largest_image,
		},
	};

	let mut sink = TerminalProgressSink::new();
	let logger = StoreLogger::new(logstore::Store::open(&args.log_db_path)?);
	let cancel = CancellationToken::new();
	let out = pipeline::encrypt(
		EncryptRequest {
			data_source: args.data_source,
			carrier,
			password: args.password,
			output_dir: args.output_dir,
			output_file_name: args.output_file_name,
			scatter: args.scatter,
		},
		&mut sink,
		&logger,
		&cancel,
	)?;

	println!("wrote {}", out.display());
	Ok(())
}
