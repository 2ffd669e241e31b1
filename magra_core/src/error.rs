/*!
# Magra: Errors.
*/

use std::{
	error::Error,
	fmt,
};



#[derive(Debug, Copy, Clone, Eq, PartialEq)]
/// # Deal-Breaking Errors.
///
/// Any of these ends the run for the image in question; they all surface a
/// one-line diagnostic and exit code `1` at the program boundary.
pub enum MagraError {
	/// # Not a PNG.
	BadSignature,

	/// # Truncated Stream.
	PrematureEof,

	/// # Chunk Length Overflow.
	LengthOverflow,

	/// # Critical Chunk CRC Mismatch.
	CrcMismatch,

	/// # No IHDR Chunk.
	MissingIhdr,

	/// # No IDAT Chunk.
	MissingIdat,

	/// # Trailing Chunks After IEND.
	IendNotLast,

	/// # Invalid IHDR Payload.
	InvalidIhdr,

	/// # Bad Zlib Stream.
	CorruptZlib,

	/// # Unsupported Feature.
	Unsupported,

	/// # Every Candidate Failed.
	AllCandidatesFailed,
}

impl AsRef<str> for MagraError {
	#[inline]
	fn as_ref(&self) -> &str { self.as_str() }
}

impl Error for MagraError {}

impl fmt::Display for MagraError {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl MagraError {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::BadSignature => "invalid PNG signature",
			Self::PrematureEof => "unexpected end of stream",
			Self::LengthOverflow => "chunk length overflows the stream",
			Self::CrcMismatch => "critical chunk failed its CRC check",
			Self::MissingIhdr => "missing IHDR chunk",
			Self::MissingIdat => "missing IDAT chunk",
			Self::IendNotLast => "data present after IEND",
			Self::InvalidIhdr => "invalid IHDR payload",
			Self::CorruptZlib => "corrupt zlib stream",
			Self::Unsupported => "unsupported PNG feature",
			Self::AllCandidatesFailed => "no encoding candidate survived",
		}
	}
}



#[derive(Debug, Copy, Clone, Eq, PartialEq)]
/// # Candidate Errors.
///
/// These are local to a single point in the search space. The driver drops
/// the candidate (treating its size as infinite) and carries on; only if
/// *every* candidate fails does the run end, with
/// [`MagraError::AllCandidatesFailed`].
pub enum CandidateError {
	/// # Infeasible Combination.
	///
	/// The combination is contradictory by policy, e.g. sub-byte palette
	/// rows with a per-row filter strategy.
	Infeasible,

	/// # Internal Failure.
	Internal,
}

impl AsRef<str> for CandidateError {
	#[inline]
	fn as_ref(&self) -> &str { self.as_str() }
}

impl Error for CandidateError {}

impl fmt::Display for CandidateError {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl CandidateError {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Infeasible => "infeasible combination",
			Self::Internal => "candidate failed internally",
		}
	}
}
