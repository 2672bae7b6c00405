//! Symmetric envelope: PBKDF2-HMAC-SHA1 key derivation, AES-256-GCM seal/open,
//! and the fixed-schema metadata record that travels alongside the ciphertext.

use aes_gcm::aead::{Aead, NewAead};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hmac::Hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::error::{Result, StegoError};

#[derive(Debug, Clone, Copy)]
pub struct AesGcmConfig {
	pub key_length: usize,
	pub salt_length: usize,
	pub nonce_length: usize,
	pub tag_length: usize,
	pub iterations: u32,
}

impl Default for AesGcmConfig {
	fn default() -> Self {
		AesGcmConfig {
			key_length: 32,
			salt_length: 16,
			nonce_length: 12,
			tag_length: 16,
			iterations: 50_000,
		}
	}
}

/// Stable six-field JSON record. Field order in the struct mirrors the
/// serialized key order; unknown fields in a decoded record are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptMetadata {
	pub algorithm: String,
	pub key_length: usize,
	pub salt_length: usize,
	pub nonce_length: usize,
	pub tag_length: usize,
	pub pbkdf2_iterations: u32,
}

impl EncryptMetadata {
	pub fn from_config(cfg: &AesGcmConfig) -> Self {
		EncryptMetadata {
			algorithm: "AES-GCM".to_string(),
			key_length: cfg.key_length,
			salt_length: cfg.salt_length,
			nonce_length: cfg.nonce_length,
			tag_length: cfg.tag_length,
			pbkdf2_iterations: cfg.iterations,
		}
	}
}

pub fn random_bytes(n: usize) -> Vec<u8> {
	let mut buf = vec![0u8; n];
	rand::thread_rng().fill_bytes(&mut buf);
	buf
}

pub fn derive_key(password: &str, salt: &[u8], iterations: u32, key_len: usize) -> Vec<u8> {
	let mut key = vec![0u8; key_len];
	pbkdf2::pbkdf2::<Hmac<Sha1>>(password.as_bytes(), salt, iterations, &mut key);
	key
}

/// Returns `(ciphertext, tag)`, split the way the original envelope lays
/// them out on the wire.
pub fn encrypt_aes_gcm(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
	let cipher = Aes256Gcm::new(Key::from_slice(key));
	let combined = cipher
		.encrypt(Nonce::from_slice(nonce), plaintext)
		.map_err(|_| StegoError::CryptoAuth)?;
	let tag_len = 16;
	if combined.len() < tag_len {
		return Err(StegoError::CryptoAuth);
	}
	let split = combined.len() - tag_len;
	Ok((combined[..split].to_vec(), combined[split..].to_vec()))
}

pub fn decrypt_aes_gcm(key: &[u8], nonce: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
	let cipher = Aes256Gcm::new(Key::from_slice(key));
	let mut combined = Vec::with_capacity(ciphertext.len() + tag.len());
	combined.extend_from_slice(ciphertext);
	combined.extend_from_slice(tag);
	cipher
		.decrypt(Nonce::from_slice(nonce), combined.as_ref())
		.map_err(|_| StegoError::CryptoAuth)
}

/// Assembles `metaLen(4 LE) || metaJSON || salt || nonce || tag || ciphertext`.
pub fn seal(password: &str, plaintext: &[u8], cfg: &AesGcmConfig) -> Result<Vec<u8>> {
	let salt = random_bytes(cfg.salt_length);
	let nonce = random_bytes(cfg.nonce_length);
	let key = derive_key(password, &salt, cfg.iterations, cfg.key_length);
	let (ciphertext, tag) = encrypt_aes_gcm(&key, &nonce, plaintext)?;

	let meta = EncryptMetadata::from_config(cfg);
	let meta_json = serde_json::to_vec(&meta)?;

	let mut out = Vec::with_capacity(4 + meta_json.len() + salt.len() + nonce.len() + tag.len() + ciphertext.len());
	out.extend_from_slice(&(meta_json.len() as u32).to_le_bytes());
	out.extend_from_slice(&meta_json);
	out.extend_from_slice(&salt);
	out.extend_from_slice(&nonce);
	out.extend_from_slice(&tag);
	out.extend_from_slice(&ciphertext);
	Ok(out)
}

/// Inverse of [`seal`]: parses the metadata record (any extra fields it
/// carries are ignored) and recovers the plaintext.
pub fn open(password: &str, blob: &[u8]) -> Result<Vec<u8>> {
	if blob.len() < 4 {
		return Err(StegoError::CorruptHeader("metadata length missing".into()));
	}
	let meta_len = u32::from_le_bytes(blob[0..4].try_into().unwrap()) as usize;
	let meta_end = 4 + meta_len;
	if meta_end > blob.len() {
		return Err(StegoError::CorruptHeader(
			"metadata length out of range".into(),
		));
	}
	let meta: EncryptMetadata = serde_json::from_slice(&blob[4..meta_end])?;

	let encrypted = &blob[meta_end..];
	let min_size = meta.salt_length + meta.nonce_length + meta.tag_length;
	if encrypted.len() < min_size {
		return Err(StegoError::CorruptHeader(
			"encrypted payload incomplete".into(),
		));
	}
	let salt = &encrypted[..meta.salt_length];
	let nonce = &encrypted[meta.salt_length..meta.salt_length + meta.nonce_length];
	let tag =
		&encrypted[meta.salt_length + meta.nonce_length..meta.salt_length + meta.nonce_length + meta.tag_length];
	let ciphertext = &encrypted[meta.salt_length + meta.nonce_length + meta.tag_length..];

	let key = derive_key(password, salt, meta.pbkdf2_iterations, meta.key_length);
	decrypt_aes_gcm(&key, nonce, ciphertext, tag)
}

/// Mirrors `estimateRequiredPayloadBytes`: how large the final wrapped
/// payload will be once framed, PBKDF2/AES-GCM'd, and RS-wrapped, plus a
/// safety margin so the carrier picked before encryption still fits it.
pub fn estimate_required_payload_bytes(
	plain_len: i64,
	meta_json_len: i64,
	salt_len: usize,
	nonce_len: usize,
	tag_len: usize,
) -> i64 {
	let full_data_len = 4 + meta_json_len + salt_len as i64 + nonce_len as i64 + tag_len as i64 + plain_len;
	let framed_len = 4 + full_data_len;
	let blocks = framed_len.div_ceil(crate::rs255223::K as i64);
	let wrapped_len = (3 + 2 + 2 + 4) + blocks * (crate::rs255223::K + crate::rs255223::NSYM) as i64;
	wrapped_len + 256
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn seal_then_open_round_trips() {
		let cfg = AesGcmConfig::default();
		let plaintext = b"the quick brown fox".to_vec();
		let blob = seal("correct password", &plaintext, &cfg).unwrap();
		let opened = open("correct password", &blob).unwrap();
		assert_eq!(opened, plaintext);
	}

	#[test]
	fn wrong_password_fails_auth() {
		let cfg = AesGcmConfig::default();
		let blob = seal("secret", b"payload", &cfg).unwrap();
		assert!(matches!(open("secrot", &blob), Err(StegoError::CryptoAuth)));
	}

	#[test]
	fn metadata_has_the_stable_six_field_schema() {
		let meta = EncryptMetadata::from_config(&AesGcmConfig::default());
		let json = serde_json::to_value(&meta).unwrap();
		let obj = json.as_object().unwrap();
		assert_eq!(obj.len(), 6);
		for key in [
			"algorithm",
			"key_length",
			"salt_length",
			"nonce_length",
			"tag_length",
			"pbkdf2_iterations",
		] {
			assert!(obj.contains_key(key), "missing {key}");
		}
	}
}
