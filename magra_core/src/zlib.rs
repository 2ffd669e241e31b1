/*!
# Magra: Zlib.

IDAT payloads are plain zlib frames. Inflation always goes through `flate2`;
deflation is dialed by [`DeflateLevel`], whose top setting trades `flate2`
for the much slower, much stingier `zopfli`.
*/

use crate::{
	CandidateError,
	MagraError,
};
use flate2::Compression;
use std::{
	io::{
		Read,
		Write,
	},
	num::NonZeroU64,
};



#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// # Deflate Level.
///
/// An implementation-independent dial. The library mapping is part of the
/// contract:
///
/// | Level | Backend |
/// |---|---|
/// | `Fastest` | `flate2` level 0 (stored) |
/// | `Fast` | `flate2` level 1 |
/// | `Default` | `flate2` level 6 |
/// | `Maximum` | `flate2` level 9 |
/// | `Ultra` | `zopfli`, fifteen iterations, dynamic blocks |
pub enum DeflateLevel {
	/// # Store Only.
	Fastest,

	/// # Cheapest Real Compression.
	Fast,

	/// # Library Default.
	Default,

	/// # Strongest flate2.
	Maximum,

	/// # Zopfli.
	Ultra,
}

/// # All Levels, Weakest First.
pub const ALL_LEVELS: [DeflateLevel; 5] = [
	DeflateLevel::Fastest,
	DeflateLevel::Fast,
	DeflateLevel::Default,
	DeflateLevel::Maximum,
	DeflateLevel::Ultra,
];

impl DeflateLevel {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Fastest => "fastest",
			Self::Fast => "fast",
			Self::Default => "default",
			Self::Maximum => "maximum",
			Self::Ultra => "ultra",
		}
	}

	#[must_use]
	/// # From Str (Case-Insensitive).
	pub fn from_str_loose(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"fastest" => Some(Self::Fastest),
			"fast" => Some(Self::Fast),
			"default" => Some(Self::Default),
			"maximum" => Some(Self::Maximum),
			"ultra" => Some(Self::Ultra),
			_ => None,
		}
	}

	/// # flate2 Equivalent.
	const fn flate(self) -> Compression {
		match self {
			Self::Fastest => Compression::none(),
			Self::Fast => Compression::new(1),
			Self::Default => Compression::new(6),
			Self::Maximum | Self::Ultra => Compression::new(9),
		}
	}
}



/// # Decode a Zlib Frame.
///
/// ## Errors
///
/// Returns [`MagraError::CorruptZlib`] if the frame is malformed, or if a
/// non-empty frame decodes to nothing.
pub(crate) fn inflate(src: &[u8]) -> Result<Vec<u8>, MagraError> {
	let mut out: Vec<u8> = Vec::with_capacity(src.len() * 3);
	flate2::read::ZlibDecoder::new(src)
		.read_to_end(&mut out)
		.map_err(|_| MagraError::CorruptZlib)?;

	if out.is_empty() && ! src.is_empty() { Err(MagraError::CorruptZlib) }
	else { Ok(out) }
}

/// # Encode a Zlib Frame.
///
/// ## Errors
///
/// Compression failures are scoped to the candidate that asked for them,
/// hence the [`CandidateError`].
pub(crate) fn deflate(src: &[u8], level: DeflateLevel) -> Result<Vec<u8>, CandidateError> {
	if matches!(level, DeflateLevel::Ultra) { deflate_zopfli(src) }
	else {
		let mut enc = flate2::write::ZlibEncoder::new(
			Vec::with_capacity(src.len() / 2 + 64),
			level.flate(),
		);
		enc.write_all(src).map_err(|_| CandidateError::Internal)?;
		enc.finish().map_err(|_| CandidateError::Internal)
	}
}

/// # Encode a Zlib Frame the Hard Way.
///
/// Fifteen iterations matches the strongest profile anybody sane ships;
/// beyond that the returns shrink to a byte here and there while the
/// runtimes blow up.
fn deflate_zopfli(src: &[u8]) -> Result<Vec<u8>, CandidateError> {
	let opts = zopfli::Options {
		iteration_count: NonZeroU64::new(15).unwrap(),
		..zopfli::Options::default()
	};

	let mut out: Vec<u8> = Vec::with_capacity(src.len() / 2 + 64);
	zopfli::compress(opts, zopfli::Format::Zlib, src, &mut out)
		.map_err(|_| CandidateError::Internal)?;
	Ok(out)
}
