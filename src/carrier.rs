//! Carrier selection: scan a directory of candidate images and pick one
//! that has room for the payload, either the largest-capacity one or the
//! most texture-rich one (by downscaled Laplacian score).

use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, GenericImageView};

use crate::error::{Result, StegoError};
use crate::frame::max_capacity;
use crate::imageio;

struct Candidate {
	path: PathBuf,
	capacity: i64,
	score: f64,
}

/// Scans `carrier_dir` (non-recursively) for an image whose capacity covers
/// `required_bytes`. When `prefer_largest` is true the highest-capacity
/// candidate wins; otherwise the most texture-rich one does.
pub fn select_carrier_image(
	carrier_dir: impl AsRef<Path>,
	required_bytes: i64,
	prefer_largest: bool,
) -> Result<PathBuf> {
	let carrier_dir = carrier_dir.as_ref();
	fs::create_dir_all(carrier_dir)?;

	let mut best: Option<Candidate> = None;
	for entry in fs::read_dir(carrier_dir)? {
		let entry = entry?;
		if entry.file_type()?.is_dir() {
			continue;
		}
		let path = entry.path();
		if !imageio::has_supported_extension(&path) {
			continue;
		}
		let Ok((width, height)) = imageio::probe_dimensions(&path) else {
			continue;
		};
		let capacity = max_capacity(width, height, false);
		if required_bytes > capacity {
			continue;
		}
		let score = if prefer_largest {
			0.0
		} else {
			quick_texture_score(&path, 256).unwrap_or(-1.0)
		};

		let candidate = Candidate {
			path,
			capacity,
			score,
		};
		best = Some(match best {
			None => candidate,
			Some(cur) => {
				let cur_wins = if prefer_largest {
					cur.capacity >= candidate.capacity
				} else {
					cur.score >= candidate.score
				};
				if cur_wins {
					cur
				} else {
					candidate
				}
			}
		});
	}

	best.map(|c| c.path).ok_or(StegoError::NoSuitableCarrier)
}

/// Downscales to `sample_size x sample_size` grayscale and averages the
/// absolute 4-neighbor Laplacian, with replicate (clamped) edges. Higher
/// scores mean noisier, more embed-friendly images.
fn quick_texture_score(path: &Path, sample_size: u32) -> Result<f64> {
	let img = image::open(path)?;
	let gray = img
		.resize_exact(sample_size, sample_size, FilterType::Triangle)
		.to_luma8();

	let (w, h) = gray.dimensions();
	let at = |x: i64, y: i64| -> i64 {
		let x = x.clamp(0, w as i64 - 1) as u32;
		let y = y.clamp(0, h as i64 - 1) as u32;
		gray.get_pixel(x, y)[0] as i64
	};

	let mut sum = 0.0f64;
	for y in 0..h as i64 {
		for x in 0..w as i64 {
			let c = at(x, y);
			let l = at(x - 1, y);
			let r = at(x + 1, y);
			let u = at(x, y - 1);
			let d = at(x, y + 1);
			let lap = l + r + u + d - 4 * c;
			sum += (lap as f64).abs();
		}
	}
	Ok(sum / (w * h) as f64)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_empty_directory() {
		let dir = tempfile::tempdir().unwrap();
		let result = select_carrier_image(dir.path(), 1000, true);
		assert!(matches!(result, Err(StegoError::NoSuitableCarrier)));
	}

	#[test]
	fn picks_the_larger_of_two_images_by_capacity() {
		let dir = tempfile::tempdir().unwrap();
		let small = vec![0u8; 16 * 16 * 3];
		let large = vec![0u8; 64 * 64 * 3];
		imageio::save_rgb_as_png(dir.path().join("small.png"), &small, 16, 16).unwrap();
		imageio::save_rgb_as_png(dir.path().join("large.png"), &large, 64, 64).unwrap();

		let picked = select_carrier_image(dir.path(), 500, true).unwrap();
		assert_eq!(picked.file_name().unwrap(), "large.png");
	}

	#[test]
	fn filters_out_images_below_required_capacity() {
		let dir = tempfile::tempdir().unwrap();
		let small = vec![0u8; 8 * 8 * 3];
		imageio::save_rgb_as_png(dir.path().join("tiny.png"), &small, 8, 8).unwrap();

		let result = select_carrier_image(dir.path(), 1_000_000, true);
		assert!(matches!(result, Err(StegoError::NoSuitableCarrier)));
	}
}
