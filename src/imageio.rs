//! Decode any supported raster format to a packed RGB buffer, and encode a
//! packed RGB buffer back to PNG at the fastest compression setting.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::GenericImageView;

use crate::error::Result;

/// Loads `path`, decoding any format the `image` crate understands, and
/// returns a row-major `R,G,B,R,G,B,...` buffer plus dimensions.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<(Vec<u8>, u32, u32)> {
	let img = image::open(path.as_ref())?;
	let (width, height) = img.dimensions();
	let rgba = img.to_rgba8();

	let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
	for px in rgba.pixels() {
		rgb.push(px[0]);
		rgb.push(px[1]);
		rgb.push(px[2]);
	}
	Ok((rgb, width, height))
}

/// Reads only the header of `path` to obtain its dimensions without decoding
/// pixel data, used by carrier selection to avoid full decodes.
pub fn probe_dimensions(path: impl AsRef<Path>) -> Result<(u32, u32)> {
	let reader = image::ImageReader::open(path.as_ref())?.with_guessed_format()?;
	let dims = reader.into_dimensions()?;
	Ok(dims)
}

/// Writes `rgb` (length `width*height*3`) as a PNG with alpha forced opaque,
/// at the fastest compression level.
pub fn save_rgb_as_png(path: impl AsRef<Path>, rgb: &[u8], width: u32, height: u32) -> Result<()> {
	use png::{BitDepth, ColorType, Encoder};

	if rgb.len() != width as usize * height as usize * 3 {
		return Err(crate::error::StegoError::InvalidImage(
			"rgb buffer size mismatch".into(),
		));
	}
	if let Some(parent) = path.as_ref().parent() {
		std::fs::create_dir_all(parent)?;
	}

	let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
	for chunk in rgb.chunks_exact(3) {
		rgba.extend_from_slice(chunk);
		rgba.push(0xFF);
	}

	let file = File::create(path.as_ref())?;
	let writer = BufWriter::with_capacity(1 << 20, file);
	let mut encoder = Encoder::new(writer, width, height);
	encoder.set_color(ColorType::Rgba);
	encoder.set_depth(BitDepth::Eight);
	encoder.set_compression(png::Compression::Fast);
	let mut writer = encoder.write_header()?;
	writer.write_image_data(&rgba)?;
	Ok(())
}

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "tiff", "gif"];

pub fn has_supported_extension(path: impl AsRef<Path>) -> bool {
	path.as_ref()
		.extension()
		.and_then(|e| e.to_str())
		.map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_a_solid_image() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("solid.png");
		let w = 8;
		let h = 8;
		let rgb: Vec<u8> = (0..w * h * 3).map(|i| (i % 256) as u8).collect();
		save_rgb_as_png(&path, &rgb, w, h).unwrap();
		let (loaded, lw, lh) = load_rgb(&path).unwrap();
		assert_eq!((lw, lh), (w, h));
		assert_eq!(loaded, rgb);
	}

	#[test]
	fn extension_filter_is_case_insensitive() {
		assert!(has_supported_extension("photo.PNG"));
		assert!(has_supported_extension("photo.JpG"));
		assert!(!has_supported_extension("photo.txt"));
	}
}
