//! High-level encrypt/decrypt/generate operations: assemble the codec
//! modules into the external interface described for callers, emitting
//! progress events and observing cancellation between stages.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::archive::{is_zip, unzip_to_dir, zip_directory};
use crate::cancel::CancellationToken;
use crate::crypto::{self, AesGcmConfig};
use crate::ecc;
use crate::error::{Result, StegoError};
use crate::frame;
use crate::imageio;
use crate::logger::{LogLevel, Logger};
use crate::progress::{ProgressEvent, ProgressSink};

/// Either an explicit carrier image, or a directory to auto-select one from.
pub enum CarrierSource {
	Explicit(PathBuf),
	AutoSelect {
		dir: PathBuf,
		prefer_largest: bool,
	},
}

pub struct EncryptRequest {
	pub data_source: PathBuf,
	pub carrier: CarrierSource,
	pub password: String,
	pub output_dir: PathBuf,
	pub output_file_name: String,
	pub scatter: bool,
}

pub struct DecryptRequest {
	pub image_path: PathBuf,
	pub password: String,
	pub output_dir: PathBuf,
	pub identifier: String,
}

fn emit(sink: &mut dyn ProgressSink, progress: u8, message: &str) {
	sink.emit(ProgressEvent {
		progress,
		message: message.to_string(),
		done: false,
		..Default::default()
	});
}

fn emit_done(sink: &mut dyn ProgressSink) {
	sink.emit(ProgressEvent {
		progress: 100,
		message: "done".to_string(),
		done: true,
		..Default::default()
	});
}

fn emit_error(sink: &mut dyn ProgressSink, progress: u8, err: &StegoError) {
	sink.emit(ProgressEvent {
		progress,
		error: Some(err.to_string()),
		done: true,
		..Default::default()
	});
}

fn log_stage(logger: &dyn Logger, module: &str, stage: &str, started: Instant, extra: &str) {
	let elapsed = started.elapsed();
	let formatted = if elapsed.as_secs() < 1 {
		format!("{}ms", elapsed.as_millis())
	} else if elapsed.as_secs_f64() < 10.0 {
		format!("{:.2}s", elapsed.as_secs_f64())
	} else {
		format!("{:.1}s", elapsed.as_secs_f64())
	};
	let message = format!("{stage} took {formatted}");
	let details = if extra.is_empty() { None } else { Some(extra) };
	logger.log(LogLevel::Info, module, &message, details);
}

fn read_data_source(path: &Path, cancel: &CancellationToken) -> Result<Vec<u8>> {
	let metadata = std::fs::metadata(path)?;
	if metadata.is_dir() {
		zip_directory(path, cancel)
	} else {
		Ok(std::fs::read(path)?)
	}
}

/// Avoids overwriting an existing file by appending `_2`, `_3`, ... before
/// the extension.
fn unique_file_path(path: &Path) -> PathBuf {
	if !path.exists() {
		return path.to_path_buf();
	}
	let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
	let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
	let parent = path.parent().unwrap_or_else(|| Path::new(""));
	for i in 2..10_000 {
		let candidate = if ext.is_empty() {
			parent.join(format!("{stem}_{i}"))
		} else {
			parent.join(format!("{stem}_{i}.{ext}"))
		};
		if !candidate.exists() {
			return candidate;
		}
	}
	path.to_path_buf()
}

pub fn encrypt(
	req: EncryptRequest,
	sink: &mut dyn ProgressSink,
	logger: &dyn Logger,
	cancel: &CancellationToken,
) -> Result<PathBuf> {
	let start_all = Instant::now();

	emit(sink, 0, "reading data source");
	let t0 = Instant::now();
	let data = match read_data_source(&req.data_source, cancel) {
		Ok(d) => d,
		Err(e) => {
			emit_error(sink, 0, &e);
			return Err(e);
		}
	};
	log_stage(logger, "encrypt", "ReadDataSource", t0, &format!("bytes={}", data.len()));
	cancel.check()?;

	let crypto_cfg = AesGcmConfig::default();
	let meta_probe = crypto::EncryptMetadata::from_config(&crypto_cfg);
	let meta_probe_json = serde_json::to_vec(&meta_probe)?;
	let required_payload_bytes = crypto::estimate_required_payload_bytes(
		data.len() as i64,
		meta_probe_json.len() as i64,
		crypto_cfg.salt_length,
		crypto_cfg.nonce_length,
		crypto_cfg.tag_length,
	);
	let required_bytes_in_carrier =
		frame::HEADER_LEN as i64 + frame::INTEGRITY_HASH_LEN as i64 + required_payload_bytes + frame::CRC_LEN as i64;

	emit(sink, 10, "selecting carrier image");
	let carrier_path = match &req.carrier {
		CarrierSource::Explicit(path) => path.clone(),
		CarrierSource::AutoSelect { dir, prefer_largest } => {
			let t0 = Instant::now();
			let picked = match crate::carrier::select_carrier_image(dir, required_bytes_in_carrier, *prefer_largest) {
				Ok(p) => p,
				Err(e) => {
					emit_error(sink, 10, &e);
					return Err(e);
				}
			};
			log_stage(logger, "encrypt", "SelectCarrierImage", t0, "");
			picked
		}
	};
	cancel.check()?;

	emit(sink, 20, "encrypting and error-correction encoding");
	let t0 = Instant::now();
	let sealed = crypto::seal(&req.password, &data, &crypto_cfg)?;
	let wrapped = ecc::wrap(&sealed);
	log_stage(logger, "encrypt", "Encrypt+ECCWrap", t0, &format!("wrappedBytes={}", wrapped.len()));

	emit(sink, 50, "embedding data");
	let t0 = Instant::now();
	let (rgb, width, height) = imageio::load_rgb(&carrier_path)?;
	log_stage(logger, "encrypt", "LoadCarrierImage", t0, &format!("w={width} h={height}"));

	let t0 = Instant::now();
	let embedded = frame::embed(&rgb, width, height, &wrapped, &req.password, req.scatter)?;
	log_stage(logger, "encrypt", "Hide", t0, "");

	let mut out_file = req.output_dir.join("encrypted").join(&req.output_file_name);
	if out_file.extension().is_none() {
		out_file.set_extension("png");
	}
	let out_file = unique_file_path(&out_file);

	emit(sink, 90, "saving image");
	let t0 = Instant::now();
	imageio::save_rgb_as_png(&out_file, &embedded.rgb, width, height)?;
	log_stage(
		logger,
		"encrypt",
		"SavePNG",
		t0,
		out_file.file_name().and_then(|f| f.to_str()).unwrap_or(""),
	);

	emit_done(sink);
	log_stage(logger, "encrypt", "Total", start_all, "ok=true");
	Ok(out_file)
}

pub fn decrypt(
	req: DecryptRequest,
	sink: &mut dyn ProgressSink,
	logger: &dyn Logger,
	cancel: &CancellationToken,
) -> Result<PathBuf> {
	let start_all = Instant::now();

	emit(sink, 0, "reading image");
	let t0 = Instant::now();
	let (rgb, width, height) = match imageio::load_rgb(&req.image_path) {
		Ok(v) => v,
		Err(e) => {
			emit_error(sink, 0, &e);
			return Err(e);
		}
	};
	log_stage(logger, "decrypt", "LoadImage", t0, &format!("w={width} h={height}"));
	cancel.check()?;

	emit(sink, 20, "extracting data");
	let t0 = Instant::now();
	let extracted = match frame::extract(&rgb, width, height, &req.password) {
		Ok(v) => v,
		Err(e) => {
			emit_error(sink, 20, &e);
			return Err(e);
		}
	};
	log_stage(logger, "decrypt", "Extract", t0, &format!("bytes={}", extracted.data.len()));

	emit(sink, 40, "error-correction decoding");
	let t0 = Instant::now();
	let unwrapped = match ecc::unwrap(&extracted.data) {
		Ok(v) => v,
		Err(e) => {
			emit_error(sink, 40, &e);
			return Err(e);
		}
	};
	log_stage(logger, "decrypt", "ECCUnwrap", t0, &format!("bytes={}", unwrapped.len()));
	cancel.check()?;

	emit(sink, 60, "decrypting");
	let t0 = Instant::now();
	let plain = match crypto::open(&req.password, &unwrapped) {
		Ok(v) => v,
		Err(e) => {
			emit_error(sink, 60, &e);
			return Err(e);
		}
	};
	log_stage(logger, "decrypt", "Decrypt", t0, &format!("plainBytes={}", plain.len()));

	let out_base = req.output_dir.join("extracted");
	std::fs::create_dir_all(&out_base)?;

	emit(sink, 80, "writing output");
	let t0 = Instant::now();
	let out_path = if is_zip(&plain) {
		let stem = req
			.image_path
			.file_stem()
			.and_then(|s| s.to_str())
			.unwrap_or("image");
		let dest = out_base.join(format!("{}_{}", req.identifier, stem));
		std::fs::create_dir_all(&dest)?;
		unzip_to_dir(&plain, &dest)?;
		dest
	} else {
		let file_name = req
			.image_path
			.file_name()
			.and_then(|s| s.to_str())
			.unwrap_or("image");
		let out_file = out_base.join(format!("{file_name}_extracted.bin"));
		std::fs::write(&out_file, &plain)?;
		out_file
	};
	log_stage(logger, "decrypt", "WriteOutput", t0, "");

	emit_done(sink);
	log_stage(logger, "decrypt", "Total", start_all, "ok=true");
	Ok(out_path)
}

pub struct GenerateRequest {
	pub output_dir: PathBuf,
	pub target_bytes: i64,
	pub count: u32,
	pub prefix: String,
	pub seed: u64,
	pub noise_enabled: bool,
}

pub fn generate(
	req: GenerateRequest,
	sink: &mut dyn ProgressSink,
	logger: &dyn Logger,
	cancel: &CancellationToken,
) -> Result<Vec<PathBuf>> {
	let start_all = Instant::now();
	std::fs::create_dir_all(&req.output_dir)?;
	let mut out = Vec::with_capacity(req.count as usize);
	for i in 0..req.count {
		cancel.check()?;
		let t0 = Instant::now();
		let seed = req.seed.wrapping_add(i as u64);
		let generated = crate::generator::generate_carrier_png(req.target_bytes, seed, req.noise_enabled)?;
		let path = unique_file_path(&req.output_dir.join(format!("{}_{i}.png", req.prefix)));
		std::fs::write(&path, &generated.png)?;
		log_stage(
			logger,
			"generate",
			"GenerateCarrierPNG",
			t0,
			&format!("seed={seed} w={} h={}", generated.width, generated.height),
		);
		out.push(path);

		let progress = (((i + 1) as f32 / req.count.max(1) as f32) * 100.0) as u8;
		emit(sink, progress, &format!("generated {}/{}", i + 1, req.count));
	}
	log_stage(logger, "generate", "Total", start_all, &format!("count={}", req.count));
	emit_done(sink);
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::logger::NullLogger;
	use crate::progress::NullProgressSink;

	#[test]
	fn encrypt_then_decrypt_round_trips_a_file() {
		let carrier_dir = tempfile::tempdir().unwrap();
		let rgb = vec![0u8; 256 * 256 * 3];
		imageio::save_rgb_as_png(carrier_dir.path().join("carrier.png"), &rgb, 256, 256).unwrap();

		let data_dir = tempfile::tempdir().unwrap();
		let data_path = data_dir.path().join("secret.txt");
		std::fs::write(&data_path, b"hide this").unwrap();

		let out_dir = tempfile::tempdir().unwrap();
		let mut sink = NullProgressSink;
		let cancel = CancellationToken::new();

		let stego_path = encrypt(
			EncryptRequest {
				data_source: data_path,
				carrier: CarrierSource::Explicit(carrier_dir.path().join("carrier.png")),
				password: "hunter2".to_string(),
				output_dir: out_dir.path().to_path_buf(),
				output_file_name: "encrypted".to_string(),
				scatter: true,
			},
			&mut sink,
			&NullLogger,
			&cancel,
		)
		.unwrap();

		let extract_dir = tempfile::tempdir().unwrap();
		let result_path = decrypt(
			DecryptRequest {
				image_path: stego_path,
				password: "hunter2".to_string(),
				output_dir: extract_dir.path().to_path_buf(),
				identifier: "stego".to_string(),
			},
			&mut sink,
			&NullLogger,
			&cancel,
		)
		.unwrap();

		assert_eq!(std::fs::read(result_path).unwrap(), b"hide this");
	}

	#[test]
	fn decrypt_with_wrong_password_fails_auth() {
		let carrier_dir = tempfile::tempdir().unwrap();
		let rgb = vec![0u8; 512 * 512 * 3];
		imageio::save_rgb_as_png(carrier_dir.path().join("carrier.png"), &rgb, 512, 512).unwrap();

		let data_dir = tempfile::tempdir().unwrap();
		let data_path = data_dir.path().join("secret.bin");
		std::fs::write(&data_path, vec![7u8; 10 * 1024]).unwrap();

		let out_dir = tempfile::tempdir().unwrap();
		let mut sink = NullProgressSink;
		let cancel = CancellationToken::new();

		let stego_path = encrypt(
			EncryptRequest {
				data_source: data_path,
				carrier: CarrierSource::Explicit(carrier_dir.path().join("carrier.png")),
				password: "secret".to_string(),
				output_dir: out_dir.path().to_path_buf(),
				output_file_name: "encrypted".to_string(),
				scatter: false,
			},
			&mut sink,
			&NullLogger,
			&cancel,
		)
		.unwrap();

		let extract_dir = tempfile::tempdir().unwrap();
		let result = decrypt(
			DecryptRequest {
				image_path: stego_path,
				password: "secrot".to_string(),
				output_dir: extract_dir.path().to_path_buf(),
				identifier: "stego".to_string(),
			},
			&mut sink,
			&NullLogger,
			&cancel,
		);
		assert!(matches!(result, Err(StegoError::CryptoAuth)));
	}

	#[test]
	fn generate_writes_the_requested_count() {
		let out_dir = tempfile::tempdir().unwrap();
		let mut sink = NullProgressSink;
		let cancel = CancellationToken::new();
		let paths = generate(
			GenerateRequest {
				output_dir: out_dir.path().to_path_buf(),
				target_bytes: 4096,
				count: 3,
				prefix: "carrier".to_string(),
				seed: 42,
				noise_enabled: true,
			},
			&mut sink,
			&NullLogger,
			&cancel,
		)
		.unwrap();
		assert_eq!(paths.len(), 3);
		for p in paths {
			assert!(p.exists());
		}
	}
}
