/*!
# Magra: The Search Driver.

Enumerates the combination space, races the candidates across a bounded
worker pool, and keeps the smallest. Everything here is deterministic:
enumeration order is fixed, ties go to the first-enumerated candidate, and
thread scheduling can only change *when* results arrive, never *which* one
wins.
*/

use crate::{
	BitDepth,
	CandidateError,
	ColorMode,
	DeflateLevel,
	encode::{
		self,
		OptimizationCombo,
		OptimizationResult,
	},
	FilterStrategy,
	image::RawImage,
	ImageBuffer,
	ImageStats,
	InterlaceMethod,
	MagraError,
	zlib::ALL_LEVELS,
	strategy::ALL_STRATEGIES,
};
use std::thread;



/// # Biggest Palette.
const MAX_PALETTE_COLORS: usize = 256;



#[derive(Debug, Clone)]
/// # Search Settings.
pub struct Settings {
	/// # Walk the Color-Mode Ladder?
	pub auto_color: bool,

	/// # Try Adam7 Output Too?
	pub interlace: bool,

	/// # Strategies to Race.
	pub strategies: Vec<FilterStrategy>,

	/// # Deflate Levels to Race.
	pub levels: Vec<DeflateLevel>,

	/// # Worker Cap (Zero = Logical Cores).
	pub jobs: usize,
}

impl Default for Settings {
	#[inline]
	fn default() -> Self {
		Self {
			auto_color: true,
			interlace: false,
			strategies: ALL_STRATEGIES.to_vec(),
			levels: ALL_LEVELS.to_vec(),
			jobs: 0,
		}
	}
}

impl Settings {
	/// # Resolved Worker Count.
	fn workers(&self) -> usize {
		if self.jobs == 0 {
			thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
		}
		else { self.jobs }
	}

	/// # Effective Strategy/Level Sets.
	///
	/// Empty lists fall back to the full defaults; the option parser and
	/// this method consult the same table, so there is nothing to drift.
	fn axes(&self) -> (Vec<FilterStrategy>, Vec<DeflateLevel>) {
		(
			if self.strategies.is_empty() { ALL_STRATEGIES.to_vec() }
			else { self.strategies.clone() },
			if self.levels.is_empty() { ALL_LEVELS.to_vec() }
			else { self.levels.clone() },
		)
	}
}



/// # Search From the Shared Raster.
///
/// Builds the full combination set — color ladder × interlace × strategy ×
/// level — and returns the smallest surviving candidate.
///
/// ## Errors
///
/// Returns an error only if every candidate failed.
pub fn search_raster(
	img: &ImageBuffer,
	stats: &ImageStats,
	settings: &Settings,
) -> Result<OptimizationResult, MagraError> {
	let combos = enumerate(stats, settings);
	run(&combos, settings.workers(), |combo| encode::encode_raster(img, combo))
}

/// # Search a Fixed Representation.
///
/// The recompression flavor: color mode and depth are whatever the source
/// file already uses, interlacing is off, and only strategy × level vary.
///
/// ## Errors
///
/// Returns an error only if every candidate failed.
pub(crate) fn search_raw(
	raw: &RawImage,
	settings: &Settings,
) -> Result<OptimizationResult, MagraError> {
	let (strategies, levels) = settings.axes();
	let mut combos: Vec<OptimizationCombo> = Vec::with_capacity(strategies.len() * levels.len());
	for &strategy in &strategies {
		for &level in &levels {
			combos.push(OptimizationCombo {
				color: raw.color,
				depth: raw.depth,
				interlace: InterlaceMethod::None,
				strategy,
				level,
			});
		}
	}

	run(&combos, settings.workers(), |combo| encode::encode_candidate(raw, combo))
}



/// # Enumerate the Full Combination Set.
///
/// The color/depth ladder comes from the one-pass image analysis: gray
/// images climb the grayscale depths, colorful ones pick up palette rungs
/// when the color count allows, and translucent ones keep their alpha
/// channel. With `auto_color` off, it's plain eight-bit RGB(A) and nothing
/// else.
fn enumerate(stats: &ImageStats, settings: &Settings) -> Vec<OptimizationCombo> {
	let mut modes: Vec<(ColorMode, BitDepth)> = Vec::new();

	if ! settings.auto_color {
		modes.push((
			if stats.has_alpha { ColorMode::Rgba } else { ColorMode::Rgb },
			BitDepth::Eight,
		));
	}
	else if stats.is_grayscale {
		if stats.has_alpha { modes.push((ColorMode::GrayscaleAlpha, BitDepth::Eight)); }
		else {
			modes.push((ColorMode::Grayscale, BitDepth::Eight));
			for (depth, cap) in [(BitDepth::Four, 16_usize), (BitDepth::Two, 4), (BitDepth::One, 2)] {
				if stats.unique_colors <= cap { modes.push((ColorMode::Grayscale, depth)); }
			}
		}
	}
	else {
		if stats.has_alpha { modes.push((ColorMode::Rgba, BitDepth::Eight)); }
		else {
			modes.push((ColorMode::Rgb, BitDepth::Eight));

			// Palette drops alpha, so only opaque images may take the
			// indexed rungs.
			if stats.unique_colors <= MAX_PALETTE_COLORS {
				modes.push((ColorMode::Palette, BitDepth::Eight));
				for (depth, cap) in [(BitDepth::Four, 16_usize), (BitDepth::Two, 4), (BitDepth::One, 2)] {
					if stats.unique_colors <= cap { modes.push((ColorMode::Palette, depth)); }
				}
			}
		}
	}

	let interlaces: &[InterlaceMethod] =
		if settings.interlace { &[InterlaceMethod::None, InterlaceMethod::Adam7] }
		else { &[InterlaceMethod::None] };
	let (strategies, levels) = settings.axes();

	let mut out: Vec<OptimizationCombo> = Vec::with_capacity(
		modes.len() * interlaces.len() * strategies.len() * levels.len()
	);
	for &(color, depth) in &modes {
		for &interlace in interlaces {
			for &strategy in &strategies {
				for &level in &levels {
					out.push(OptimizationCombo { color, depth, interlace, strategy, level });
				}
			}
		}
	}
	out
}

/// # Race the Candidates.
///
/// A bounded pool pulls combinations off a shared queue; each worker
/// evaluates its candidate in full isolation and posts the result. The
/// reduction happens after everything joins: smallest size wins, ties go
/// to the earliest enumeration index. Failed candidates simply drop out —
/// the search *is* the retry space.
///
/// ## Errors
///
/// Returns [`MagraError::AllCandidatesFailed`] if nothing survived.
fn run<F>(combos: &[OptimizationCombo], workers: usize, encode: F)
-> Result<OptimizationResult, MagraError>
where F: Fn(OptimizationCombo) -> Result<OptimizationResult, CandidateError> + Sync {
	if combos.is_empty() { return Err(MagraError::AllCandidatesFailed); }
	let workers = workers.max(1).min(combos.len());

	let (work_tx, work_rx) = crossbeam_channel::bounded::<(usize, OptimizationCombo)>(combos.len());
	for pair in combos.iter().copied().enumerate() { let _res = work_tx.send(pair); }
	drop(work_tx);

	let (res_tx, res_rx) = crossbeam_channel::unbounded::<(usize, Result<OptimizationResult, CandidateError>)>();
	let encode = &encode;

	thread::scope(|s| {
		for _ in 0..workers {
			let work_rx = work_rx.clone();
			let res_tx = res_tx.clone();
			s.spawn(move || {
				while let Ok((idx, combo)) = work_rx.recv() {
					let _res = res_tx.send((idx, encode(combo)));
				}
			});
		}
	});
	drop(res_tx);

	// Reduce. (The channel is fully buffered by now; the scope join saw
	// to that.)
	let mut best: Option<(usize, OptimizationResult)> = None;
	let mut results: Vec<(usize, Result<OptimizationResult, CandidateError>)> = res_rx.iter().collect();
	results.sort_by_key(|(idx, _)| *idx);

	for (idx, result) in results {
		match result {
			Ok(candidate) => {
				log::debug!(
					"candidate {}: {} bytes in {:?}",
					candidate.combo, candidate.size(), candidate.elapsed,
				);
				let better = best.as_ref().map_or(
					true,
					|(_, incumbent)| candidate.size() < incumbent.size()
				);
				if better { best.replace((idx, candidate)); }
			},
			Err(e) => {
				log::debug!("candidate {idx} dropped: {e}");
			},
		}
	}

	if let Some((_, winner)) = &best {
		log::info!(
			"winner {}: {} bytes, {} filter transition(s), {:?}",
			winner.combo, winner.size(), winner.transitions(), winner.elapsed,
		);
	}

	best.map(|(_, result)| result).ok_or(MagraError::AllCandidatesFailed)
}
