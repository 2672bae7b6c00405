//! Runs one operation per worker thread and owns its cancellation handle,
//! keyed by an opaque task id chosen by the caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread::JoinHandle;

use crate::cancel::CancellationToken;
use crate::error::StegoError;

pub struct TaskManager {
	cancels: Mutex<HashMap<String, CancellationToken>>,
}

impl Default for TaskManager {
	fn default() -> Self {
		Self::new()
	}
}

impl TaskManager {
	pub fn new() -> Self {
		TaskManager {
			cancels: Mutex::new(HashMap::new()),
		}
	}

	/// Spawns `work` on its own thread, giving it a fresh cancellation token
	/// registered under `id`. The entry is removed once `work` returns.
	pub fn start<F>(&self, id: impl Into<String>, work: F) -> JoinHandle<()>
	where
		F: FnOnce(CancellationToken) + Send + 'static,
	{
		let id = id.into();
		let token = CancellationToken::new();
		self.cancels.lock().unwrap().insert(id.clone(), token.clone());

		let cancels = self.cancels_handle();
		std::thread::spawn(move || {
			work(token);
			cancels.lock().unwrap().remove(&id);
		})
	}

	pub fn cancel(&self, id: &str) -> Result<(), StegoError> {
		let cancels = self.cancels.lock().unwrap();
		match cancels.get(id) {
			Some(token) => {
				token.cancel();
				Ok(())
			}
			None => Err(StegoError::TaskNotFound(id.to_string())),
		}
	}

	fn cancels_handle(&self) -> &Mutex<HashMap<String, CancellationToken>> {
		&self.cancels
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::Arc;
	use std::time::Duration;

	#[test]
	fn cancel_reaches_the_running_task() {
		let manager = TaskManager::new();
		let observed = Arc::new(AtomicBool::new(false));
		let observed_clone = observed.clone();

		let handle = manager.start("job-1", move |token| {
			while !token.is_cancelled() {
				std::thread::sleep(Duration::from_millis(5));
			}
			observed_clone.store(true, Ordering::SeqCst);
		});

		std::thread::sleep(Duration::from_millis(20));
		manager.cancel("job-1").unwrap();
		handle.join().unwrap();
		assert!(observed.load(Ordering::SeqCst));
	}

	#[test]
	fn cancelling_unknown_task_fails() {
		let manager = TaskManager::new();
		assert!(manager.cancel("missing").is_err());
	}
}
