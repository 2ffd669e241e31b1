/*!
# Magra CLI

Magra losslessly recompresses PNG images *as much as possible*. It achieves
this through guided brute-force: the image is re-encoded under every
combination of color representation, interlace method, filter strategy, and
deflate level the settings allow, in parallel, and the smallest result wins.

If nothing beats the original file, the original bytes are kept — the
output is always a valid PNG decoding to the same pixels, and never larger
than the input.

For a list of options, run `magra --help`.
*/

#![deny(unsafe_code)]

#![warn(
	clippy::pedantic,
	clippy::perf,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	trivial_casts,
	trivial_numeric_casts,
	unused_import_braces,
)]

mod report;

use clap::Parser;
use magra_core::{
	DeflateLevel,
	FilterStrategy,
	MagraError,
	Settings,
};
use std::{
	error::Error,
	fmt,
	path::PathBuf,
	process::ExitCode,
	time::Instant,
};



#[derive(Debug, Parser)]
#[command(name = "magra", version, about = "Brute-force, lossless PNG recompression.")]
/// # CLI Arguments.
struct Args {
	/// Path to the source PNG.
	input: PathBuf,

	/// Path for the recompressed PNG.
	output: PathBuf,

	/// Keep plain 8-bit RGB(A) instead of walking the color-mode ladder.
	#[arg(long)]
	no_auto_color: bool,

	/// Add Adam7 output to the interlace axis. (Interlaced *input* is
	/// always supported; this only affects what may be written.)
	#[arg(long)]
	interlace: bool,

	/// Drop the PartitionOptimized strategy from the search.
	#[arg(long)]
	no_partition: bool,

	/// Comma-separated filter-strategy subset: SingleFilter,
	/// ScanlineAdaptive, WeightedContinuity, PartitionOptimized.
	#[arg(long, value_delimiter = ',', value_name = "CSV")]
	filters: Vec<String>,

	/// Comma-separated deflate-level subset: Fastest, Fast, Default,
	/// Maximum, Ultra.
	#[arg(long, value_delimiter = ',', value_name = "CSV")]
	deflate: Vec<String>,

	/// Limit parallelization to this many threads; zero gives each
	/// logical core its own candidate to work on.
	#[arg(short, long, default_value_t = 0, value_name = "NUM")]
	jobs: usize,

	/// Report every candidate as it lands, not just the winner.
	#[arg(short, long)]
	verbose: bool,
}



#[derive(Debug)]
/// # Deal-Breaking Errors.
enum CliError {
	/// # Unreadable Input.
	Read,

	/// # Unwritable Output.
	Write,

	/// # Unknown Strategy Name.
	BadStrategy(String),

	/// # Unknown Level Name.
	BadLevel(String),

	/// # Engine Trouble.
	Core(MagraError),
}

impl Error for CliError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		if let Self::Core(e) = self { Some(e) } else { None }
	}
}

impl fmt::Display for CliError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Read => f.write_str("unable to read the input file"),
			Self::Write => f.write_str("unable to write the output file"),
			Self::BadStrategy(s) => write!(f, "unknown filter strategy: {s}"),
			Self::BadLevel(s) => write!(f, "unknown deflate level: {s}"),
			Self::Core(e) => f.write_str(e.as_str()),
		}
	}
}

impl From<MagraError> for CliError {
	#[inline]
	fn from(err: MagraError) -> Self { Self::Core(err) }
}



fn main() -> ExitCode {
	let args = Args::parse();
	report::init(args.verbose);

	match run(&args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("Error: {e}");
			if args.verbose {
				let mut source = e.source();
				while let Some(cause) = source {
					eprintln!("  caused by: {cause}");
					source = cause.source();
				}
			}
			ExitCode::FAILURE
		},
	}
}

/// # Actually Do the Thing.
fn run(args: &Args) -> Result<(), CliError> {
	let settings = settings(args)?;

	let raw = std::fs::read(&args.input).map_err(|_| CliError::Read)?;
	let before = raw.len();

	let started = Instant::now();
	let out = magra_core::optimize(&raw, &settings)?;
	let after = out.as_ref().map_or(before, Vec::len);

	// Keep whichever is smaller; either way the output gets written.
	write_atomic::write_file(&args.output, out.as_deref().unwrap_or(&raw))
		.map_err(|_| CliError::Write)?;

	report::summary(before, after, started.elapsed());
	Ok(())
}

/// # Build the Engine Settings.
///
/// The CSV options parse against the same tables the engine falls back to
/// when they're omitted, so an empty list and a full list mean the same
/// thing.
fn settings(args: &Args) -> Result<Settings, CliError> {
	let mut strategies: Vec<FilterStrategy> = args.filters.iter()
		.filter(|s| ! s.trim().is_empty())
		.map(|s| FilterStrategy::from_str_loose(s).ok_or_else(|| CliError::BadStrategy(s.clone())))
		.collect::<Result<_, _>>()?;
	if strategies.is_empty() { strategies = magra_core::ALL_STRATEGIES.to_vec(); }
	if args.no_partition {
		strategies.retain(|s| ! matches!(s, FilterStrategy::PartitionOptimized));
	}

	let levels: Vec<DeflateLevel> = args.deflate.iter()
		.filter(|s| ! s.trim().is_empty())
		.map(|s| DeflateLevel::from_str_loose(s).ok_or_else(|| CliError::BadLevel(s.clone())))
		.collect::<Result<_, _>>()?;

	Ok(Settings {
		auto_color: ! args.no_auto_color,
		interlace: args.interlace,
		strategies,
		levels,
		jobs: args.jobs,
	})
}



#[cfg(test)]
mod test {
	use super::*;

	fn args(extra: &[&str]) -> Args {
		let mut base = vec!["magra", "in.png", "out.png"];
		base.extend_from_slice(extra);
		Args::parse_from(base)
	}

	#[test]
	fn t_settings_defaults() {
		let s = settings(&args(&[])).unwrap();
		assert!(s.auto_color);
		assert!(! s.interlace);
		assert_eq!(s.strategies.len(), 4);
		assert!(s.levels.is_empty()); // engine fills in all five
		assert_eq!(s.jobs, 0);
	}

	#[test]
	fn t_settings_csv() {
		let s = settings(&args(&["--filters", "single,weighted", "--deflate", "ultra"])).unwrap();
		assert_eq!(
			s.strategies,
			vec![FilterStrategy::SingleFilter, FilterStrategy::WeightedContinuity],
		);
		assert_eq!(s.levels, vec![DeflateLevel::Ultra]);

		assert!(settings(&args(&["--filters", "sideways"])).is_err());
		assert!(settings(&args(&["--deflate", "eleven"])).is_err());
	}

	#[test]
	fn t_settings_no_partition() {
		let s = settings(&args(&["--no-partition"])).unwrap();
		assert_eq!(s.strategies.len(), 3);
		assert!(! s.strategies.contains(&FilterStrategy::PartitionOptimized));
	}
}
