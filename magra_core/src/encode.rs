/*!
# Magra: Candidate Encoding.

One [`OptimizationCombo`] in, one fully-framed PNG out. Candidates own all
their working buffers; the only thing they share is the (immutable) source
image, which is what lets the search driver race them freely.
*/

use crate::{
	adam7,
	BitDepth,
	CandidateError,
	chunk::{
		self,
		Chunk,
	},
	ColorMode,
	DeflateLevel,
	FilterStrategy,
	FilterType,
	image::RawImage,
	ImageBuffer,
	InterlaceMethod,
	strategy,
	zlib,
};
use std::{
	fmt,
	time::{
		Duration,
		Instant,
	},
};



#[derive(Debug, Copy, Clone, Eq, PartialEq)]
/// # One Point in the Search Space.
pub struct OptimizationCombo {
	/// # Color Mode.
	pub color: ColorMode,

	/// # Bit Depth.
	pub depth: BitDepth,

	/// # Interlace Method.
	pub interlace: InterlaceMethod,

	/// # Filter Strategy.
	pub strategy: FilterStrategy,

	/// # Deflate Level.
	pub level: DeflateLevel,
}

impl fmt::Display for OptimizationCombo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}/{}{} {} {}",
			self.color.as_str(),
			self.depth.get(),
			if matches!(self.interlace, InterlaceMethod::Adam7) { " adam7" } else { "" },
			self.strategy.as_str(),
			self.level.as_str(),
		)
	}
}



#[derive(Debug, Clone)]
/// # A Fully-Evaluated Candidate.
pub struct OptimizationResult {
	/// # The Combination.
	pub combo: OptimizationCombo,

	/// # The Framed PNG.
	pub bytes: Vec<u8>,

	/// # Per-Row Filter Choices.
	///
	/// For interlaced output, pass rows in pass order.
	pub filters: Vec<FilterType>,

	/// # Wall Time Spent.
	pub elapsed: Duration,
}

impl OptimizationResult {
	#[must_use]
	/// # Compressed Size (Bytes).
	pub fn size(&self) -> usize { self.bytes.len() }

	#[must_use]
	/// # Filter Transitions.
	///
	/// The number of row boundaries where the filter choice changes; a
	/// rough proxy for how much context-resetting the deflate stream had
	/// to absorb.
	pub fn transitions(&self) -> usize {
		self.filters.windows(2).filter(|w| w[0] != w[1]).count()
	}
}



/// # Encode From the Shared Raster.
///
/// Converts the BGRA source into the combination's representation, then
/// hands off to [`encode_candidate`].
///
/// ## Errors
///
/// Returns an error if the combination is infeasible for this image or a
/// stage fails internally.
pub(crate) fn encode_raster(img: &ImageBuffer, combo: OptimizationCombo)
-> Result<OptimizationResult, CandidateError> {
	let started = Instant::now();
	check_combo(combo)?;
	let raw = img.convert(combo.color, combo.depth)?;
	encode_inner(&raw, combo, started)
}

/// # Encode a Wire-Format Raster.
///
/// The recompression path lands here directly: the representation is fixed
/// by the source file, so only strategy and level vary.
///
/// ## Errors
///
/// Returns an error if the combination is infeasible or a stage fails
/// internally.
pub(crate) fn encode_candidate(raw: &RawImage, combo: OptimizationCombo)
-> Result<OptimizationResult, CandidateError> {
	let started = Instant::now();
	check_combo(combo)?;
	encode_inner(raw, combo, started)
}

/// # Filter + Compress.
///
/// Produces the (single) IDAT payload for the raster under the given axes,
/// along with the per-row filter picks. Interlaced output filters each
/// Adam7 pass independently — fresh previous-row chain, pass-local stride —
/// and concatenates the filtered passes before compression.
///
/// ## Errors
///
/// Returns an error if compression fails.
pub(crate) fn compress_image(
	raw: &RawImage,
	interlace: InterlaceMethod,
	strategy_kind: FilterStrategy,
	level: DeflateLevel,
) -> Result<(Vec<u8>, Vec<FilterType>), CandidateError> {
	let force_none = matches!(raw.color, ColorMode::Palette) ||
		(matches!(raw.color, ColorMode::Grayscale) && raw.depth.get() < 8);
	let bpp = raw.bpp();

	let mut filtered: Vec<u8> = Vec::with_capacity(raw.pixels.len() + raw.height as usize);
	let mut filters: Vec<FilterType> = Vec::with_capacity(raw.height as usize);

	match interlace {
		InterlaceMethod::None => strategy::filter_rows(
			&raw.pixels, raw.stride(), bpp, force_none, strategy_kind,
			&mut filtered, &mut filters,
		),
		InterlaceMethod::Adam7 => {
			let ihdr = raw.ihdr(InterlaceMethod::Adam7);
			for pass in adam7::split_passes(&raw.pixels, &ihdr) {
				let pass_stride = crate::ihdr::stride_for(pass.width, raw.color, raw.depth);
				strategy::filter_rows(
					&pass.pixels, pass_stride, bpp, force_none, strategy_kind,
					&mut filtered, &mut filters,
				);
			}
		},
	}

	let idat = zlib::deflate(&filtered, level)?;
	Ok((idat, filters))
}

/// # Shared Tail: Filter, Compress, Frame.
fn encode_inner(raw: &RawImage, combo: OptimizationCombo, started: Instant)
-> Result<OptimizationResult, CandidateError> {
	let (idat, filters) = compress_image(raw, combo.interlace, combo.strategy, combo.level)?;

	let mut chunks: Vec<Chunk> = Vec::with_capacity(4);
	chunks.push(Chunk::new(chunk::IHDR, raw.ihdr(combo.interlace).serialize().to_vec()));
	if let Some(plte) = raw.palette.as_ref() {
		chunks.push(Chunk::new(chunk::PLTE, plte.clone()));
	}
	chunks.push(Chunk::new(chunk::IDAT, idat));
	chunks.push(Chunk::new(chunk::IEND, Vec::new()));

	Ok(OptimizationResult {
		combo,
		bytes: chunk::write_all(&chunks),
		filters,
		elapsed: started.elapsed(),
	})
}

/// # Combination Sanity.
///
/// Per-row filter selection is disallowed for sub-byte palette rows (the
/// policy layer forces `None` there anyway, and multiple strategies would
/// just re-discover the same plan at full price).
const fn check_combo(combo: OptimizationCombo) -> Result<(), CandidateError> {
	if
		matches!(combo.color, ColorMode::Palette) &&
		combo.depth.get() < 8 &&
		! matches!(combo.strategy, FilterStrategy::SingleFilter)
	{
		Err(CandidateError::Infeasible)
	}
	else { Ok(()) }
}
