/*!
# Magra: Reporting.

The engine narrates its search through the `log` facade — one debug line
per candidate, an info line for the winner, warnings for anything it
tolerated along the way. This module gives those events somewhere to land
(stderr), and prints the final size summary.
*/

use dactyl::{
	NicePercent,
	NiceU64,
};
use log::{
	Level,
	LevelFilter,
	Log,
	Metadata,
	Record,
};
use std::time::Duration;



/// # The Sink.
static LOGGER: Logger = Logger;

#[derive(Debug, Copy, Clone)]
/// # Stderr Logger.
struct Logger;

impl Log for Logger {
	fn enabled(&self, _metadata: &Metadata<'_>) -> bool { true }

	fn log(&self, record: &Record<'_>) {
		let prefix = match record.level() {
			Level::Error => "Error: ",
			Level::Warn => "Warning: ",
			_ => "",
		};
		eprintln!("{prefix}{}", record.args());
	}

	fn flush(&self) {}
}

/// # Hook Up Logging.
///
/// Quiet runs still surface warnings (tolerated CRC trouble and the like);
/// verbose runs get the per-candidate play-by-play too.
pub(super) fn init(verbose: bool) {
	let level =
		if verbose { LevelFilter::Debug }
		else { LevelFilter::Warn };

	if log::set_logger(&LOGGER).is_ok() { log::set_max_level(level); }
}

/// # Final Summary.
pub(super) fn summary(before: usize, after: usize, elapsed: Duration) {
	if after < before {
		let saved = (before - after) as u64;
		eprintln!(
			"Saved {} bytes ({}) in {:.1}s.",
			NiceU64::from(saved),
			NicePercent::from(saved as f64 / before as f64),
			elapsed.as_secs_f64(),
		);
	}
	else {
		eprintln!(
			"No savings were possible; kept the original {} bytes. ({:.1}s.)",
			NiceU64::from(before as u64),
			elapsed.as_secs_f64(),
		);
	}
}
