//! Framed Reed-Solomon wrapper: adds a length-prefixed header, splits the
//! payload into 223-byte blocks, encodes each to 255 bytes, and interleaves
//! the codewords column-major so a contiguous burst in the wrapped stream
//! spreads across many codewords instead of wrecking one.

use crate::error::{Result, StegoError};
use crate::rs255223::{self, CODEWORD_LEN, K, NSYM};

const MAGIC: &[u8; 3] = b"RS1";
const HEADER_LEN: usize = 3 + 2 + 2 + 4;

pub fn wrap(data: &[u8]) -> Vec<u8> {
	let mut framed = Vec::with_capacity(4 + data.len());
	framed.extend_from_slice(&(data.len() as u32).to_le_bytes());
	framed.extend_from_slice(data);

	let blocks = framed.len().div_ceil(K);
	let mut codewords = Vec::with_capacity(blocks);
	for i in 0..blocks {
		let start = i * K;
		let end = (start + K).min(framed.len());
		let mut chunk = vec![0u8; K];
		chunk[..end - start].copy_from_slice(&framed[start..end]);
		codewords.push(rs255223::encode(&chunk, NSYM));
	}

	let payload = interleave(&codewords, CODEWORD_LEN);

	let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
	out.extend_from_slice(MAGIC);
	out.extend_from_slice(&(K as u16).to_le_bytes());
	out.extend_from_slice(&(NSYM as u16).to_le_bytes());
	out.extend_from_slice(&(framed.len() as u32).to_le_bytes());
	out.extend_from_slice(&payload);
	out
}

/// Blobs that don't start with the ECC magic pass through unchanged.
pub fn unwrap(blob: &[u8]) -> Result<Vec<u8>> {
	if !blob.starts_with(MAGIC) {
		return Ok(blob.to_vec());
	}
	if blob.len() < HEADER_LEN {
		return Err(StegoError::EccHeader);
	}
	let k = u16::from_le_bytes([blob[3], blob[4]]) as usize;
	let nsym = u16::from_le_bytes([blob[5], blob[6]]) as usize;
	let framed_len = u32::from_le_bytes([blob[7], blob[8], blob[9], blob[10]]) as usize;
	if k != K || nsym != NSYM {
		return Err(StegoError::EccUnsupportedParams { k, nsym });
	}
	let cw_len = k + nsym;
	let interleaved = &blob[HEADER_LEN..];
	if interleaved.len() % cw_len != 0 {
		return Err(StegoError::EccLength);
	}
	let blocks = interleaved.len() / cw_len;
	let codewords = deinterleave(interleaved, blocks, cw_len);

	let mut decoded = Vec::with_capacity(blocks * k);
	for cw in &codewords {
		decoded.extend(rs255223::decode(cw, k, nsym)?);
	}
	if framed_len < 4 || framed_len > decoded.len() {
		return Err(StegoError::EccLength);
	}
	let framed = &decoded[..framed_len];
	let n = u32::from_le_bytes([framed[0], framed[1], framed[2], framed[3]]) as usize;
	if n != framed_len - 4 {
		return Err(StegoError::EccLength);
	}
	Ok(framed[4..].to_vec())
}

fn interleave(codewords: &[Vec<u8>], cw_len: usize) -> Vec<u8> {
	let blocks = codewords.len();
	let mut out = Vec::with_capacity(blocks * cw_len);
	for col in 0..cw_len {
		for row in codewords.iter().take(blocks) {
			out.push(row[col]);
		}
	}
	out
}

fn deinterleave(interleaved: &[u8], blocks: usize, cw_len: usize) -> Vec<Vec<u8>> {
	let mut out = vec![vec![0u8; cw_len]; blocks];
	let mut idx = 0;
	for col in 0..cw_len {
		for row in 0..blocks {
			out[row][col] = interleaved[idx];
			idx += 1;
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lcg_bytes(seed: u64, len: usize) -> Vec<u8> {
		let mut state = seed;
		(0..len)
			.map(|_| {
				state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
				(state >> 33) as u8
			})
			.collect()
	}

	#[test]
	fn wrap_unwrap_round_trips() {
		let data = lcg_bytes(2, 5000);
		let wrapped = wrap(&data);
		let unwrapped = unwrap(&wrapped).unwrap();
		assert_eq!(unwrapped, data);
	}

	#[test]
	fn passthrough_for_non_ecc_blob() {
		let data = b"not an ecc frame".to_vec();
		assert_eq!(unwrap(&data).unwrap(), data);
	}

	#[test]
	fn rejects_unsupported_params() {
		let mut blob = wrap(b"hello");
		blob[3] = 1;
		blob[4] = 0;
		assert!(matches!(
			unwrap(&blob),
			Err(StegoError::EccUnsupportedParams { .. })
		));
	}

	#[test]
	fn tolerates_burst_within_correction_budget() {
		let data = lcg_bytes(4, 2000);
		let mut wrapped = wrap(&data);
		// A contiguous burst in the interleaved stream lands on one byte per
		// codeword after de-interleaving, well within the 16-symbol budget.
		let burst_start = HEADER_LEN + 10;
		for b in wrapped.iter_mut().skip(burst_start).take(16) {
			*b ^= 0xff;
		}
		assert_eq!(unwrap(&wrapped).unwrap(), data);
	}
}
