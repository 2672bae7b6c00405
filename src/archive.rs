//! Directory <-> single byte stream packaging, used to let encrypt accept a
//! directory as its data source and decrypt restore one.

use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::cancel::CancellationToken;
use crate::error::{Result, StegoError};

const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

pub fn is_zip(data: &[u8]) -> bool {
	data.len() >= 4 && data[..4] == ZIP_MAGIC
}

/// Recursively zips `dir`, with slash-normalized relative paths and the
/// Deflated method, returning the archive bytes.
pub fn zip_directory(dir: impl AsRef<Path>, cancel: &CancellationToken) -> Result<Vec<u8>> {
	let root = dir.as_ref();
	let mut buf = Cursor::new(Vec::new());
	let mut writer = ZipWriter::new(&mut buf);
	let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

	for entry in walk_files(root)? {
		cancel.check()?;
		let rel = entry
			.strip_prefix(root)
			.map_err(|e| StegoError::Archive(e.to_string()))?;
		let name = rel.to_string_lossy().replace('\\', "/");

		writer
			.start_file(name, options)
			.map_err(|e| StegoError::Archive(e.to_string()))?;
		let mut f = File::open(&entry)?;
		let mut contents = Vec::new();
		f.read_to_end(&mut contents)?;
		writer.write_all(&contents)?;
	}

	writer
		.finish()
		.map_err(|e| StegoError::Archive(e.to_string()))?;
	Ok(buf.into_inner())
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
	let mut out = Vec::new();
	let mut stack = vec![root.to_path_buf()];
	while let Some(dir) = stack.pop() {
		for entry in fs::read_dir(&dir)? {
			let entry = entry?;
			let path = entry.path();
			if entry.file_type()?.is_dir() {
				stack.push(path);
			} else {
				out.push(path);
			}
		}
	}
	out.sort();
	Ok(out)
}

/// Extracts `data` as a zip archive under `out_dir`. Rejects any entry whose
/// resolved path would escape `out_dir` (zip-slip guard).
pub fn unzip_to_dir(data: &[u8], out_dir: impl AsRef<Path>) -> Result<()> {
	let out_dir = out_dir.as_ref();
	fs::create_dir_all(out_dir)?;
	let canonical_out = fs::canonicalize(out_dir)?;

	let mut archive =
		ZipArchive::new(Cursor::new(data)).map_err(|e| StegoError::Archive(e.to_string()))?;
	for i in 0..archive.len() {
		let mut file = archive
			.by_index(i)
			.map_err(|e| StegoError::Archive(e.to_string()))?;
		let Some(enclosed) = file.enclosed_name() else {
			return Err(StegoError::Archive("zip path traversal detected".into()));
		};
		let dest = out_dir.join(enclosed);

		if file.is_dir() {
			fs::create_dir_all(&dest)?;
			continue;
		}
		if let Some(parent) = dest.parent() {
			fs::create_dir_all(parent)?;
		}

		// Re-check against the canonicalized root: enclosed_name() already
		// strips ".." components, but a symlinked parent could still escape.
		if let Ok(canonical_parent) = fs::canonicalize(dest.parent().unwrap_or(out_dir)) {
			if !canonical_parent.starts_with(&canonical_out) {
				return Err(StegoError::Archive("zip path traversal detected".into()));
			}
		}

		let mut out_file = File::create(&dest)?;
		std::io::copy(&mut file, &mut out_file)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zip_magic_is_detected() {
		assert!(is_zip(&[0x50, 0x4B, 0x03, 0x04, 0x00]));
		assert!(!is_zip(b"not a zip"));
	}

	#[test]
	fn round_trips_a_directory_tree() {
		let src = tempfile::tempdir().unwrap();
		fs::create_dir_all(src.path().join("nested")).unwrap();
		fs::write(src.path().join("a.txt"), b"hello").unwrap();
		fs::write(src.path().join("nested/b.txt"), b"world").unwrap();

		let cancel = CancellationToken::new();
		let archive = zip_directory(src.path(), &cancel).unwrap();
		assert!(is_zip(&archive));

		let dest = tempfile::tempdir().unwrap();
		unzip_to_dir(&archive, dest.path()).unwrap();
		assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), b"hello");
		assert_eq!(fs::read(dest.path().join("nested/b.txt")).unwrap(), b"world");
	}
}
