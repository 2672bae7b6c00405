//! Cooperative cancellation, checked at coarse stage boundaries between
//! pipeline steps rather than inside tight inner loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, StegoError};

#[derive(Clone, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		CancellationToken {
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	/// Returns `Err(StegoError::Cancelled)` if cancellation was observed.
	/// Call this between pipeline stages, not inside inner loops.
	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() {
			Err(StegoError::Cancelled)
		} else {
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_uncancelled() {
		let token = CancellationToken::new();
		assert!(token.check().is_ok());
	}

	#[test]
	fn cancel_is_observed_by_clones() {
		let token = CancellationToken::new();
		let clone = token.clone();
		clone.cancel();
		assert!(token.check().is_err());
	}
}
