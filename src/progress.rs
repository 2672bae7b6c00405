//! Progress event sink contract, plus a terminal implementation backed by
//! `indicatif`, the same crate the teacher CLI uses for its build progress
//! bars.

use indicatif::{ProgressBar, ProgressStyle};

/// One update in an operation's lifecycle. `error` and `done` are mutually
/// informative: `done` always accompanies either a final success or the
/// first error.
#[derive(Debug, Clone, Default)]
pub struct ProgressEvent {
	pub progress: u8,
	pub message: String,
	pub current: u64,
	pub total: u64,
	pub error: Option<String>,
	pub done: bool,
}

pub trait ProgressSink: Send {
	fn emit(&mut self, event: ProgressEvent);
}

/// Discards every event; used by library callers that don't want progress
/// reporting.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
	fn emit(&mut self, _event: ProgressEvent) {}
}

/// Drives a single indicatif bar from 0-100, finishing it on the first
/// `done` event.
pub struct TerminalProgressSink {
	bar: ProgressBar,
}

impl TerminalProgressSink {
	pub fn new() -> Self {
		let bar = ProgressBar::new(100);
		bar.set_style(
			ProgressStyle::default_bar()
				.template("{spinner:.green} [{bar:40.cyan/blue}] {percent}% {msg}")
				.expect("static template is valid"),
		);
		TerminalProgressSink { bar }
	}
}

impl Default for TerminalProgressSink {
	fn default() -> Self {
		Self::new()
	}
}

impl ProgressSink for TerminalProgressSink {
	fn emit(&mut self, event: ProgressEvent) {
		self.bar.set_position(event.progress as u64);
		if !event.message.is_empty() {
			self.bar.set_message(event.message);
		}
		if let Some(err) = event.error {
			self.bar.abandon_with_message(err);
		} else if event.done {
			self.bar.finish_with_message("done");
		}
	}
}
