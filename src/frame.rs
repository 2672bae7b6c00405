//! Stego frame assembly: header + pixel-hash integrity field + payload + CRC32,
//! laid out over an RGB slot buffer. See [`crate::scatter`] and
//! [`crate::bitembed`] for the underlying slot-packing primitives.

use sha2::{Digest, Sha256};

use crate::bitembed::{embed_at_slot, extract_at_slot};
use crate::error::{Result, StegoError};
use crate::scatter::{embed_scattered, extract_scattered};

pub const HEADER_LEN: usize = 4;
pub const CRC_LEN: usize = 4;
pub const INTEGRITY_HASH_LEN: usize = 16;

const INTEGRITY_FLAG: u32 = 0x8000_0000;
const SCATTER_FLAG: u32 = 0x4000_0000;

/// `W*H*3*2/8`, optionally minus the fixed 32-byte slack the original
/// implementation subtracts when advertising capacity to callers.
pub fn max_capacity(width: u32, height: u32, include_overhead: bool) -> i64 {
	if width == 0 || height == 0 {
		return 0;
	}
	let base = (width as i64) * (height as i64) * 3 * 2 / 8;
	if include_overhead {
		base - 32
	} else {
		base
	}
}

fn crc32_of(data: &[u8]) -> [u8; 4] {
	crc32fast::hash(data).to_le_bytes()
}

/// Result of comparing the recomputed pixel hash against the one embedded in
/// the image. Advisory: CRC32 is the authoritative integrity signal, this is
/// surfaced to the caller rather than silently discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityReport {
	NotPresent,
	Matched,
	Mismatched,
}

fn pixel_hash(rgb: &[u8], width: u32, height: u32) -> Result<[u8; INTEGRITY_HASH_LEN]> {
	if rgb.len() != width as usize * height as usize * 3 {
		return Err(StegoError::InvalidImage("rgb buffer size mismatch".into()));
	}
	let hash_slot_start = (HEADER_LEN * 8) / 2;
	let hash_slots = (INTEGRITY_HASH_LEN * 8) / 2;
	let hash_slot_end = (hash_slot_start + hash_slots).min(rgb.len());

	let mut hasher = Sha256::new();
	hasher.update(width.to_le_bytes());
	hasher.update(height.to_le_bytes());
	if hash_slot_start > 0 {
		hasher.update(&rgb[..hash_slot_start]);
	}
	if hash_slot_end > hash_slot_start {
		let masked: Vec<u8> = rgb[hash_slot_start..hash_slot_end]
			.iter()
			.map(|b| b & 0xFC)
			.collect();
		hasher.update(&masked);
	}
	if hash_slot_end < rgb.len() {
		hasher.update(&rgb[hash_slot_end..]);
	}
	let sum = hasher.finalize();
	let mut out = [0u8; INTEGRITY_HASH_LEN];
	out.copy_from_slice(&sum[..INTEGRITY_HASH_LEN]);
	Ok(out)
}

/// Result of [`embed`]: the modified image buffer and the integrity bytes
/// that were embedded (useful for callers that log or display it).
pub struct Embedded {
	pub rgb: Vec<u8>,
	pub integrity: [u8; INTEGRITY_HASH_LEN],
}

/// Embeds `data` into `rgb`, always with the integrity field, and with
/// scatter enabled whenever `scatter` is requested and `password` is
/// non-empty.
pub fn embed(
	rgb: &[u8],
	width: u32,
	height: u32,
	data: &[u8],
	password: &str,
	scatter: bool,
) -> Result<Embedded> {
	let max_cap = max_capacity(width, height, false);
	let total_bits_needed = (HEADER_LEN + INTEGRITY_HASH_LEN + data.len() + CRC_LEN) * 8;
	if total_bits_needed as i64 > max_cap * 8 {
		return Err(StegoError::CapacityInsufficient {
			needed: total_bits_needed / 8,
			available: (max_cap.max(0) as usize),
		});
	}

	let crc = crc32_of(data);
	let scatter_enabled = !password.is_empty() && scatter;
	let mut flags = INTEGRITY_FLAG;
	if scatter_enabled {
		flags |= SCATTER_FLAG;
	}
	let header_word = (data.len() as u32) | flags;

	let mut out = rgb.to_vec();
	embed_at_slot(&mut out, 0, &header_word.to_le_bytes());

	let mut body = Vec::with_capacity(data.len() + CRC_LEN);
	body.extend_from_slice(data);
	body.extend_from_slice(&crc);

	let body_start_slot = ((HEADER_LEN + INTEGRITY_HASH_LEN) * 8) / 2;
	if scatter_enabled {
		embed_scattered(&mut out, body_start_slot, &body, password)?;
	} else {
		embed_at_slot(&mut out, body_start_slot, &body);
	}

	let integrity = pixel_hash(&out, width, height)?;
	let integrity_slot_start = (HEADER_LEN * 8) / 2;
	embed_at_slot(&mut out, integrity_slot_start, &integrity);

	Ok(Embedded {
		rgb: out,
		integrity,
	})
}

/// Result of [`extract`]: the recovered payload plus the flags observed in
/// the header and the outcome of the advisory integrity check.
pub struct Extracted {
	pub data: Vec<u8>,
	pub integrity_enabled: bool,
	pub scatter_enabled: bool,
	pub integrity_report: IntegrityReport,
}

pub fn extract(rgb: &[u8], width: u32, height: u32, password: &str) -> Result<Extracted> {
	if rgb.len() != width as usize * height as usize * 3 {
		return Err(StegoError::InvalidImage("rgb buffer size mismatch".into()));
	}
	let header_bytes = extract_at_slot(rgb, 0, HEADER_LEN);
	if header_bytes.len() != HEADER_LEN {
		return Err(StegoError::CorruptHeader("truncated header".into()));
	}
	let raw_len = u32::from_le_bytes(header_bytes.try_into().unwrap());
	let integrity_enabled = raw_len & INTEGRITY_FLAG != 0;
	let scatter_enabled = raw_len & SCATTER_FLAG != 0;
	let data_len = if integrity_enabled {
		(raw_len & !(INTEGRITY_FLAG | SCATTER_FLAG)) as usize
	} else {
		raw_len as usize
	};

	let mut max_size = max_capacity(width, height, true) - HEADER_LEN as i64 - CRC_LEN as i64 + 32;
	if integrity_enabled {
		max_size -= INTEGRITY_HASH_LEN as i64;
	}
	if data_len == 0 || data_len as i64 > max_size {
		return Err(StegoError::CorruptHeader(format!(
			"invalid data length {data_len}"
		)));
	}

	let mut integrity_bytes = Vec::new();
	if integrity_enabled {
		let integrity_slot_start = (HEADER_LEN * 8) / 2;
		integrity_bytes = extract_at_slot(rgb, integrity_slot_start, INTEGRITY_HASH_LEN);
		if integrity_bytes.len() != INTEGRITY_HASH_LEN {
			return Err(StegoError::CorruptHeader("truncated integrity field".into()));
		}
	}

	let mut fixed_len = HEADER_LEN;
	if integrity_enabled {
		fixed_len += INTEGRITY_HASH_LEN;
	}
	let start_slot = (fixed_len * 8) / 2;

	let body = if scatter_enabled {
		if password.is_empty() {
			return Err(StegoError::PasswordRequired);
		}
		extract_scattered(rgb, start_slot, data_len + CRC_LEN, password)
	} else {
		extract_at_slot(rgb, start_slot, data_len + CRC_LEN)
	};
	if body.len() != data_len + CRC_LEN {
		return Err(StegoError::CorruptHeader("truncated payload".into()));
	}
	let (data, crc_bytes) = body.split_at(data_len);
	if crc32_of(data) != crc_bytes {
		return Err(StegoError::CrcMismatch);
	}

	let integrity_report = if !integrity_enabled {
		IntegrityReport::NotPresent
	} else {
		match pixel_hash(rgb, width, height) {
			Ok(actual) if actual.as_slice() == integrity_bytes.as_slice() => {
				IntegrityReport::Matched
			}
			Ok(_) => IntegrityReport::Mismatched,
			Err(_) => IntegrityReport::Mismatched,
		}
	};

	Ok(Extracted {
		data: data.to_vec(),
		integrity_enabled,
		scatter_enabled,
		integrity_report,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rgb_buffer(width: u32, height: u32) -> Vec<u8> {
		vec![0u8; width as usize * height as usize * 3]
	}

	#[test]
	fn round_trips_with_scatter_and_password() {
		let rgb = rgb_buffer(256, 256);
		let data = b"hello world - stego test".to_vec();
		let embedded = embed(&rgb, 256, 256, &data, "pass", true).unwrap();
		let extracted = extract(&embedded.rgb, 256, 256, "pass").unwrap();
		assert_eq!(extracted.data, data);
		assert!(extracted.integrity_enabled);
		assert!(extracted.scatter_enabled);
		assert_eq!(extracted.integrity_report, IntegrityReport::Matched);
	}

	#[test]
	fn round_trips_without_scatter_or_password() {
		let rgb = rgb_buffer(128, 128);
		let data: Vec<u8> = (0..2048u32).map(|i| ((i * 13) % 256) as u8).collect();
		let embedded = embed(&rgb, 128, 128, &data, "", false).unwrap();
		let extracted = extract(&embedded.rgb, 128, 128, "").unwrap();
		assert_eq!(extracted.data, data);
		assert!(!extracted.scatter_enabled);
	}

	#[test]
	fn single_bit_flip_triggers_crc_mismatch() {
		let rgb = rgb_buffer(64, 64);
		let data = b"short payload".to_vec();
		let embedded = embed(&rgb, 64, 64, &data, "", false).unwrap();
		let mut tampered = embedded.rgb.clone();
		let body_start_slot = ((HEADER_LEN + INTEGRITY_HASH_LEN) * 8) / 2;
		tampered[body_start_slot] ^= 0x01;
		assert!(matches!(
			extract(&tampered, 64, 64, ""),
			Err(StegoError::CrcMismatch)
		));
	}

	#[test]
	fn scatter_without_password_is_rejected() {
		let rgb = rgb_buffer(64, 64);
		let data = b"secret".to_vec();
		let embedded = embed(&rgb, 64, 64, &data, "pw", true).unwrap();
		assert!(matches!(
			extract(&embedded.rgb, 64, 64, ""),
			Err(StegoError::PasswordRequired)
		));
	}

	#[test]
	fn repeated_embed_is_integrity_stable() {
		let rgb = rgb_buffer(64, 64);
		let data = b"stable hash".to_vec();
		let first = embed(&rgb, 64, 64, &data, "pw", false).unwrap();
		let second = embed(&rgb, 64, 64, &data, "pw", false).unwrap();
		assert_eq!(first.integrity, second.integrity);
	}
}
