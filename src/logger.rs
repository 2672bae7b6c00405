//! Logger contract, threaded explicitly into every pipeline call rather
//! than reached for as an ambient global, plus two implementations: one
//! backed by the append-only log store (§6.1), one that forwards to the
//! `log` crate macros for callers that don't want persistence.

pub use crate::logstore::LogLevel;

pub trait Logger: Send {
	fn log(&self, level: LogLevel, module: &str, message: &str, details: Option<&str>);
}

/// Discards every entry.
pub struct NullLogger;

impl Logger for NullLogger {
	fn log(&self, _level: LogLevel, _module: &str, _message: &str, _details: Option<&str>) {}
}

/// Forwards to the ambient `log` crate (and therefore whatever `env_logger`
/// or other subscriber the host process installed). Does not persist to
/// the append-only store; use `StoreLogger` when that's required.
pub struct EnvLogger;

impl Logger for EnvLogger {
	fn log(&self, level: LogLevel, module: &str, message: &str, details: Option<&str>) {
		let line = match details {
			Some(d) => format!("{module}: {message} ({d})"),
			None => format!("{module}: {message}"),
		};
		match level {
			LogLevel::Debug => log::debug!("{line}"),
			LogLevel::Info => log::info!("{line}"),
			LogLevel::Warn => log::warn!("{line}"),
			LogLevel::Error => log::error!("{line}"),
		}
	}
}

/// Persists every entry to the append-only log store. Failures to write
/// are swallowed - logging is fire-and-forget and must never fail the
/// operation it's observing.
pub struct StoreLogger {
	store: crate::logstore::Store,
}

impl StoreLogger {
	pub fn new(store: crate::logstore::Store) -> Self {
		StoreLogger { store }
	}
}

impl Logger for StoreLogger {
	fn log(&self, level: LogLevel, module: &str, message: &str, details: Option<&str>) {
		if let Err(e) = self.store.add(level.as_str(), module, message, details) {
			log::warn!("failed to persist log entry: {e}");
		}
	}
}
