//! Password-derived bijective slot permutation.
//!
//! `scatter_slot_index` maps payload index `k` to a slot in `[0, n)` via
//! `(a*k + b) mod n`, where `a` and `b` are derived from the password and
//! `gcd(a, n) = 1` so the map is a bijection on `[0, n)`.

use sha2::{Digest, Sha256};

use crate::bitembed::{embed_at_slot, extract_at_slot};
use crate::error::{Result, StegoError};

const SCATTER_CONTEXT: &[u8] = b"scatter_body_v1";

fn gcd(mut a: i64, mut b: i64) -> i64 {
	a = a.abs();
	b = b.abs();
	while b != 0 {
		(a, b) = (b, a % b);
	}
	a
}

/// Derives the `(a, b)` linear-congruential parameters for a window of `n`
/// slots from `password` and a context tag that keys independent windows.
fn scatter_params(password: &str, n: usize) -> (u64, u64) {
	if n == 0 {
		return (1, 0);
	}
	let n = n as u64;
	let mut hasher = Sha256::new();
	hasher.update(password.as_bytes());
	hasher.update(b"|");
	hasher.update(SCATTER_CONTEXT);
	let h = hasher.finalize();

	let x = u64::from_le_bytes(h[0..8].try_into().unwrap());
	let mut a = (x | 1) % n;
	if a == 0 {
		a = 1;
	}
	while gcd(a as i64, n as i64) != 1 {
		a = (a + 2) % n;
		if a == 0 {
			a = 1;
		}
	}
	let b = u64::from_le_bytes(h[8..16].try_into().unwrap()) % n;
	(a, b)
}

fn scatter_slot_index(k: u64, n: u64, a: u64, b: u64) -> u64 {
	(a.wrapping_mul(k).wrapping_add(b)) % n
}

/// Embeds `data` into the `n = rgb.len() - start_slot` window starting at
/// `start_slot`, permuted by the password-derived scatter sequence.
pub fn embed_scattered(
	rgb: &mut [u8],
	start_slot: usize,
	data: &[u8],
	password: &str,
) -> Result<()> {
	if start_slot >= rgb.len() {
		return Err(StegoError::CapacityInsufficient {
			needed: data.len() * 4,
			available: 0,
		});
	}
	let available = rgb.len() - start_slot;
	let slots_needed = data.len() * 4;
	if slots_needed > available {
		return Err(StegoError::CapacityInsufficient {
			needed: slots_needed,
			available,
		});
	}
	let (a, b) = scatter_params(password, available);
	let mut k: u64 = 0;
	for &byte in data {
		let mut shift = 6i32;
		while shift >= 0 {
			let two = (byte >> shift) & 0x3;
			let idx = start_slot + scatter_slot_index(k, available as u64, a, b) as usize;
			rgb[idx] = (rgb[idx] & 0xFC) | two;
			k += 1;
			shift -= 2;
		}
	}
	Ok(())
}

/// Inverse of [`embed_scattered`].
pub fn extract_scattered(
	rgb: &[u8],
	start_slot: usize,
	mut byte_len: usize,
	password: &str,
) -> Vec<u8> {
	if byte_len == 0 || start_slot >= rgb.len() {
		return Vec::new();
	}
	let available = rgb.len() - start_slot;
	if available == 0 {
		return Vec::new();
	}
	if byte_len * 4 > available {
		byte_len = available / 4;
	}
	if byte_len == 0 {
		return Vec::new();
	}
	let (a, b) = scatter_params(password, available);
	let mut out = vec![0u8; byte_len];
	let mut k: u64 = 0;
	for byte in out.iter_mut() {
		let mut shift = 6i32;
		while shift >= 0 {
			let idx = start_slot + scatter_slot_index(k, available as u64, a, b) as usize;
			let two = rgb[idx] & 0x3;
			*byte |= two << shift;
			k += 1;
			shift -= 2;
		}
	}
	out
}

/// Sequential embed, exposed here so callers needn't reach into
/// [`crate::bitembed`] directly when `password` is empty / scatter disabled.
pub fn embed_sequential(rgb: &mut [u8], start_slot: usize, data: &[u8]) {
	embed_at_slot(rgb, start_slot, data);
}

pub fn extract_sequential(rgb: &[u8], start_slot: usize, byte_len: usize) -> Vec<u8> {
	extract_at_slot(rgb, start_slot, byte_len)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scatter_slot_index_is_bijective_over_window() {
		let n = 997u64; // prime, any a != 0 mod n is coprime
		let (a, b) = scatter_params("correct horse battery staple", n as usize);
		let mut seen = vec![false; n as usize];
		for k in 0..n {
			let idx = scatter_slot_index(k, n, a, b) as usize;
			assert!(!seen[idx], "collision at k={k}");
			seen[idx] = true;
		}
		assert!(seen.iter().all(|&s| s));
	}

	#[test]
	fn embed_then_extract_round_trips_with_password() {
		let mut rgb = vec![0u8; 4096];
		let data = b"scattered payload bytes".to_vec();
		embed_scattered(&mut rgb, 16, &data, "hunter2").unwrap();
		let out = extract_scattered(&rgb, 16, data.len(), "hunter2");
		assert_eq!(out, data);
	}

	#[test]
	fn different_passwords_give_different_layouts() {
		let mut a = vec![0u8; 4096];
		let mut b = vec![0u8; 4096];
		let data = b"same payload, different keys".to_vec();
		embed_scattered(&mut a, 0, &data, "alpha").unwrap();
		embed_scattered(&mut b, 0, &data, "beta").unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn rejects_oversized_payload() {
		let mut rgb = vec![0u8; 8];
		let data = vec![0u8; 10];
		assert!(embed_scattered(&mut rgb, 0, &data, "pw").is_err());
	}
}
