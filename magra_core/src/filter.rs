/*!
# Magra: Row Filters.

The five PNG prediction filters, forward and inverse. Filters operate on
*bytes*, not pixels; `bpp` is the byte distance to the neighbor on the left
(clamped to one for sub-byte modes).

Both the straight and Adam7 paths funnel through these two kernels, so the
arithmetic lives in exactly one place.
*/

use crate::bytes;



#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
/// # Filter Type.
pub enum FilterType {
	/// # None.
	None = 0,

	/// # Sub (Left Neighbor).
	Sub = 1,

	/// # Up (Previous Row).
	Up = 2,

	/// # Average (Left+Up).
	Average = 3,

	/// # Paeth.
	Paeth = 4,
}

/// # All Filters, Tag Order.
pub const ALL_FILTERS: [FilterType; 5] = [
	FilterType::None,
	FilterType::Sub,
	FilterType::Up,
	FilterType::Average,
	FilterType::Paeth,
];

impl FilterType {
	#[must_use]
	/// # From Wire Value.
	pub const fn from_u8(raw: u8) -> Option<Self> {
		match raw {
			0 => Some(Self::None),
			1 => Some(Self::Sub),
			2 => Some(Self::Up),
			3 => Some(Self::Average),
			4 => Some(Self::Paeth),
			_ => None,
		}
	}

	#[must_use]
	/// # As u8.
	pub const fn get(self) -> u8 { self as u8 }

	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "None",
			Self::Sub => "Sub",
			Self::Up => "Up",
			Self::Average => "Average",
			Self::Paeth => "Paeth",
		}
	}
}



/// # Filter a Scanline (Forward).
///
/// `cur` holds the raw bytes, `prev` the raw bytes of the row above (empty
/// for the first row of an image or interlace pass), and `out` receives the
/// filtered bytes. The caller provides `out` so hot loops can recycle one
/// scratch buffer instead of allocating per row.
pub(crate) fn apply(
	filter: FilterType,
	cur: &[u8],
	prev: &[u8],
	bpp: usize,
	out: &mut [u8],
) {
	debug_assert_eq!(cur.len(), out.len(), "BUG: scratch row size mismatch");
	debug_assert!(prev.is_empty() || prev.len() == cur.len(), "BUG: previous row size mismatch");

	match filter {
		FilterType::None => { out.copy_from_slice(cur); },
		FilterType::Sub => for i in 0..cur.len() {
			let a = if i < bpp { 0 } else { cur[i - bpp] };
			out[i] = bytes::sub8(cur[i], a);
		},
		FilterType::Up => for i in 0..cur.len() {
			let b = prev.get(i).copied().unwrap_or(0);
			out[i] = bytes::sub8(cur[i], b);
		},
		FilterType::Average => for i in 0..cur.len() {
			let a = if i < bpp { 0 } else { cur[i - bpp] };
			let b = prev.get(i).copied().unwrap_or(0);
			out[i] = bytes::sub8(cur[i], bytes::avg8(a, b));
		},
		FilterType::Paeth => for i in 0..cur.len() {
			let a = if i < bpp { 0 } else { cur[i - bpp] };
			let b = prev.get(i).copied().unwrap_or(0);
			let c = if i < bpp { 0 } else { prev.get(i - bpp).copied().unwrap_or(0) };
			out[i] = bytes::sub8(cur[i], bytes::paeth(a, b, c));
		},
	}
}

/// # Unfilter a Scanline (In Place).
///
/// `row` holds the filtered bytes and is rewritten with the reconstructed
/// ones; `prev` is the *reconstructed* row above (empty at the top).
pub(crate) fn unapply(
	filter: FilterType,
	row: &mut [u8],
	prev: &[u8],
	bpp: usize,
) {
	debug_assert!(prev.is_empty() || prev.len() == row.len(), "BUG: previous row size mismatch");

	match filter {
		FilterType::None => {},
		FilterType::Sub => for i in bpp..row.len() {
			row[i] = bytes::add8(row[i], row[i - bpp]);
		},
		FilterType::Up => for i in 0..row.len() {
			let b = prev.get(i).copied().unwrap_or(0);
			row[i] = bytes::add8(row[i], b);
		},
		FilterType::Average => for i in 0..row.len() {
			let a = if i < bpp { 0 } else { row[i - bpp] };
			let b = prev.get(i).copied().unwrap_or(0);
			row[i] = bytes::add8(row[i], bytes::avg8(a, b));
		},
		FilterType::Paeth => for i in 0..row.len() {
			let a = if i < bpp { 0 } else { row[i - bpp] };
			let b = prev.get(i).copied().unwrap_or(0);
			let c = if i < bpp { 0 } else { prev.get(i - bpp).copied().unwrap_or(0) };
			row[i] = bytes::add8(row[i], bytes::paeth(a, b, c));
		},
	}
}

#[must_use]
/// # Row Cost.
///
/// The selection heuristic scores a filtered row by summing the magnitudes
/// of its successive byte deltas — a proxy for how twitchy the filtered
/// signal is, which tracks deflate's dislike of it. The first byte of the
/// row participates in no pair.
///
/// (This is *not* the classic `Σ|signed(F[i])|` heuristic.)
pub(crate) fn volatility(filtered: &[u8]) -> u64 {
	if filtered.len() < 3 { return 0; }
	filtered[1..].windows(2)
		.map(|pair| pair[0].abs_diff(pair[1]) as u64)
		.sum()
}



#[cfg(test)]
mod test {
	use super::*;

	/// # Forward/Inverse Agreement.
	fn roundtrip(cur: &[u8], prev: &[u8], bpp: usize) {
		let mut filtered = vec![0_u8; cur.len()];
		for filter in ALL_FILTERS {
			apply(filter, cur, prev, bpp, &mut filtered);
			let mut rebuilt = filtered.clone();
			unapply(filter, &mut rebuilt, prev, bpp);
			assert_eq!(rebuilt, cur, "roundtrip failed for {}", filter.as_str());
		}
	}

	#[test]
	fn t_roundtrip() {
		// A noisy-ish row pair, tried at several strides, with and without
		// a previous row.
		let cur: Vec<u8> = (0_u16..48).map(|i| (i * 37 % 256) as u8).collect();
		let prev: Vec<u8> = (0_u16..48).map(|i| (i * 11 + 5).wrapping_mul(3) as u8).collect();

		for bpp in [1, 2, 3, 4, 6, 8] {
			roundtrip(&cur, &prev, bpp);
			roundtrip(&cur, &[], bpp);
		}

		// Single-byte rows are as small as it gets.
		roundtrip(&[200], &[100], 1);
		roundtrip(&[200], &[], 1);
	}

	#[test]
	fn t_apply_known() {
		// Gradient row, grayscale: Sub leaves a constant signal.
		let cur = [0_u8, 64, 128, 192];
		let mut out = [0_u8; 4];
		apply(FilterType::Sub, &cur, &[], 1, &mut out);
		assert_eq!(out, [0, 64, 64, 64]);

		// Second row tracking the first: Up leaves the delta.
		let row0 = [10_u8, 20, 30];
		let row1 = [12_u8, 22, 32];
		let mut out = [0_u8; 3];
		apply(FilterType::Up, &row1, &row0, 3, &mut out);
		assert_eq!(out, [2, 2, 2]);
	}

	#[test]
	fn t_volatility() {
		// The first byte never pairs up.
		assert_eq!(volatility(&[0, 64, 64, 64]), 0);
		assert_eq!(volatility(&[0, 64, 128, 192]), 128);
		assert_eq!(volatility(&[5]), 0);
		assert_eq!(volatility(&[]), 0);
		assert_eq!(volatility(&[255, 0, 255]), 255);
	}
}
