/*!
# Magra: Image Buffers.

[`ImageBuffer`] is the shared, read-only source of truth for the search: a
packed 8-bit BGRA raster (the host bitmap layout) plus one-pass analysis.
Each candidate converts it into a [`RawImage`] — the scanline-oriented,
wire-format representation its header calls for — and works from there.
*/

use crate::{
	BitDepth,
	CandidateError,
	ColorMode,
	ihdr::stride_for,
	IhdrData,
	InterlaceMethod,
	MagraError,
};
use std::collections::{
	HashMap,
	HashSet,
};



#[derive(Debug, Copy, Clone, Eq, PartialEq)]
/// # One-Pass Image Analysis.
pub struct ImageStats {
	/// # Distinct Pixel Values.
	pub unique_colors: usize,

	/// # Any Non-Opaque Pixels?
	pub has_alpha: bool,

	/// # All Pixels Gray?
	pub is_grayscale: bool,
}



#[derive(Debug, Clone)]
/// # Source Raster.
///
/// Pixels are packed BGRA, four bytes apiece, row-major, no padding.
pub struct ImageBuffer {
	/// # Width (Pixels).
	width: u32,

	/// # Height (Pixels).
	height: u32,

	/// # Packed BGRA.
	px: Vec<u8>,
}

impl ImageBuffer {
	/// # From a Host Bitmap.
	///
	/// The host hands over `{width, height, stride, BGRA bytes}`; rows may
	/// carry padding (`stride ≥ 4·width`), which is dropped here.
	///
	/// ## Errors
	///
	/// Returns an error if the dimensions are zero or the buffer is too
	/// small for them.
	pub fn from_bgra(width: u32, height: u32, stride: usize, raw: &[u8])
	-> Result<Self, MagraError> {
		let row = (width as usize) * 4;
		if width == 0 || height == 0 || stride < row {
			return Err(MagraError::InvalidIhdr);
		}
		if raw.len() < stride * (height as usize - 1) + row {
			return Err(MagraError::PrematureEof);
		}

		let mut px: Vec<u8> = Vec::with_capacity(row * height as usize);
		for y in 0..height as usize {
			px.extend_from_slice(&raw[y * stride..y * stride + row]);
		}

		Ok(Self { width, height, px })
	}

	/// # From Tightly-Packed BGRA.
	pub(crate) const fn from_parts(width: u32, height: u32, px: Vec<u8>) -> Self {
		Self { width, height, px }
	}

	#[must_use]
	/// # Width.
	pub const fn width(&self) -> u32 { self.width }

	#[must_use]
	/// # Height.
	pub const fn height(&self) -> u32 { self.height }

	#[must_use]
	/// # Packed BGRA Bytes.
	pub fn bgra(&self) -> &[u8] { &self.px }

	/// # Iterate Pixels (as `[b, g, r, a]`).
	pub(crate) fn pixels(&self) -> impl Iterator<Item = &[u8]> {
		self.px.chunks_exact(4)
	}

	#[must_use]
	/// # Analyze.
	///
	/// One pass over the pixels: distinct colors, alpha presence,
	/// grayscale-ness. The search driver consults this to prune the
	/// color-mode ladder before any candidate spins up.
	pub fn stats(&self) -> ImageStats {
		let mut seen: HashSet<u32> = HashSet::new();
		let mut has_alpha = false;
		let mut is_grayscale = true;

		for p in self.pixels() {
			let (b, g, r, a) = (p[0], p[1], p[2], p[3]);
			seen.insert(u32::from_be_bytes([r, g, b, a]));
			if a != 255 { has_alpha = true; }
			if r != g || g != b { is_grayscale = false; }
		}

		ImageStats {
			unique_colors: seen.len(),
			has_alpha,
			is_grayscale,
		}
	}
}



#[derive(Debug, Clone, PartialEq)]
/// # Wire-Format Raster.
///
/// Unfiltered scanlines in the exact representation a PNG of this header
/// would carry, plus the PLTE payload when indexed.
pub(crate) struct RawImage {
	/// # Width (Pixels).
	pub(crate) width: u32,

	/// # Height (Pixels).
	pub(crate) height: u32,

	/// # Color Mode.
	pub(crate) color: ColorMode,

	/// # Bit Depth.
	pub(crate) depth: BitDepth,

	/// # PLTE Payload (RGB Triplets).
	pub(crate) palette: Option<Vec<u8>>,

	/// # Raw Scanlines (height × stride).
	pub(crate) pixels: Vec<u8>,
}

impl RawImage {
	#[must_use]
	/// # Bytes Per Scanline.
	pub(crate) const fn stride(&self) -> usize {
		stride_for(self.width, self.color, self.depth)
	}

	#[must_use]
	/// # Filter Stride.
	pub(crate) const fn bpp(&self) -> usize {
		let bits = self.color.samples() * self.depth.get() as usize;
		if bits < 8 { 1 } else { bits / 8 }
	}

	#[must_use]
	/// # Matching Header.
	pub(crate) const fn ihdr(&self, interlace: InterlaceMethod) -> IhdrData {
		IhdrData {
			width: self.width,
			height: self.height,
			depth: self.depth,
			color: self.color,
			interlace,
		}
	}
}



impl ImageBuffer {
	/// # Convert to a Target Representation.
	///
	/// Every conversion here is lossless for the inputs the search driver
	/// pairs it with; a pairing that would have to round (a gray level with
	/// no exact sub-byte encoding, a palette overflow) fails instead so the
	/// driver can drop the combination.
	///
	/// ## Errors
	///
	/// Returns [`CandidateError::Infeasible`] when the target cannot
	/// represent this image exactly.
	pub(crate) fn convert(&self, color: ColorMode, depth: BitDepth)
	-> Result<RawImage, CandidateError> {
		// The raster side of the house is strictly 8-bit.
		if matches!(depth, BitDepth::Sixteen) { return Err(CandidateError::Infeasible); }

		let pixels = match (color, depth) {
			(ColorMode::Rgb, BitDepth::Eight) => self.px.chunks_exact(4)
				.flat_map(|p| [p[2], p[1], p[0]])
				.collect(),
			(ColorMode::Rgba, BitDepth::Eight) => self.px.chunks_exact(4)
				.flat_map(|p| [p[2], p[1], p[0], p[3]])
				.collect(),
			(ColorMode::GrayscaleAlpha, BitDepth::Eight) => self.px.chunks_exact(4)
				.flat_map(|p| [luma(p[2], p[1], p[0]), p[3]])
				.collect(),
			(ColorMode::Grayscale, _) => self.convert_gray(depth)?,
			(ColorMode::Palette, _) => return self.convert_palette(depth),
			_ => return Err(CandidateError::Infeasible),
		};

		Ok(RawImage {
			width: self.width,
			height: self.height,
			color,
			depth,
			palette: None,
			pixels,
		})
	}

	/// # Grayscale Scanlines.
	///
	/// Eight-bit output is a straight luma pass. Sub-byte output rescales
	/// each level by `(2^d − 1) / 255`, which is only exact — only
	/// lossless — when every level is a multiple of `255 / (2^d − 1)`.
	fn convert_gray(&self, depth: BitDepth) -> Result<Vec<u8>, CandidateError> {
		let levels: Vec<u8> = self.px.chunks_exact(4)
			.map(|p| luma(p[2], p[1], p[0]))
			.collect();
		if matches!(depth, BitDepth::Eight) { return Ok(levels); }

		let max = (1_u16 << depth.get()) - 1;
		let mut scaled: Vec<u8> = Vec::with_capacity(levels.len());
		for y in levels {
			let v = u16::from(y) * max;
			if v % 255 != 0 { return Err(CandidateError::Infeasible); }
			scaled.push((v / 255) as u8);
		}

		Ok(self.pack_rows(&scaled, depth))
	}

	/// # Palette Scanlines.
	///
	/// Two passes, per the book: collect up to `2^d` colors in first-seen
	/// order, then write indices, snapping any stragglers to their nearest
	/// palette entry by squared RGB distance (lowest index wins ties).
	/// Alpha does not exist in this representation.
	fn convert_palette(&self, depth: BitDepth) -> Result<RawImage, CandidateError> {
		let max_colors = 1_usize << depth.get().min(8);

		// Pass one: build the palette.
		let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(max_colors);
		let mut palette: Vec<u8> = Vec::with_capacity(max_colors * 3);
		for p in self.pixels() {
			let key = (u32::from(p[2]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[0]);
			if ! lookup.contains_key(&key) && lookup.len() < max_colors {
				lookup.insert(key, (lookup.len()) as u8);
				palette.extend_from_slice(&[p[2], p[1], p[0]]);
			}
		}

		// Pass two: write the indices.
		let mut indices: Vec<u8> = Vec::with_capacity(self.px.len() / 4);
		for p in self.pixels() {
			let key = (u32::from(p[2]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[0]);
			let idx = lookup.get(&key).copied()
				.unwrap_or_else(|| nearest_entry(&palette, p[2], p[1], p[0]));
			indices.push(idx);
		}

		let pixels =
			if matches!(depth, BitDepth::Eight) { indices }
			else { self.pack_rows(&indices, depth) };

		Ok(RawImage {
			width: self.width,
			height: self.height,
			color: ColorMode::Palette,
			depth,
			palette: Some(palette),
			pixels,
		})
	}

	/// # Pack Sub-Byte Samples.
	///
	/// One value per pixel in, MSB-first packed scanlines out. Each row
	/// starts a fresh byte; trailing slack bits stay zero.
	fn pack_rows(&self, values: &[u8], depth: BitDepth) -> Vec<u8> {
		let d = depth.get() as usize;
		let width = self.width as usize;
		let stride = (width * d).div_ceil(8);
		let mut out: Vec<u8> = Vec::with_capacity(stride * self.height as usize);

		for row in values.chunks_exact(width) {
			let mut acc: u8 = 0;
			let mut used: usize = 0;
			for &v in row {
				acc |= v << (8 - d - used);
				used += d;
				if used == 8 {
					out.push(acc);
					acc = 0;
					used = 0;
				}
			}
			if used != 0 { out.push(acc); }
		}

		out
	}
}

#[inline]
#[must_use]
/// # Luma.
///
/// The usual BT.601 weights, rounded. The weights sum to one, so gray
/// inputs (`R == G == B`) pass through exactly.
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
	((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b) + 500) / 1000) as u8
}

/// # Nearest Palette Entry.
///
/// Squared euclidean distance in RGB; ties break toward the lowest index.
fn nearest_entry(palette: &[u8], r: u8, g: u8, b: u8) -> u8 {
	let mut best: u8 = 0;
	let mut best_d = u32::MAX;
	for (idx, entry) in palette.chunks_exact(3).enumerate() {
		let dr = u32::from(entry[0].abs_diff(r));
		let dg = u32::from(entry[1].abs_diff(g));
		let db = u32::from(entry[2].abs_diff(b));
		let d = dr * dr + dg * dg + db * db;
		if d < best_d {
			best_d = d;
			best = idx as u8;
		}
	}
	best
}



#[cfg(test)]
mod test {
	use super::*;

	/// # Buffer From RGBA Tuples.
	fn buf(width: u32, height: u32, px: &[[u8; 4]]) -> ImageBuffer {
		let raw: Vec<u8> = px.iter()
			.flat_map(|p| [p[2], p[1], p[0], p[3]]) // to BGRA
			.collect();
		ImageBuffer::from_bgra(width, height, width as usize * 4, &raw).unwrap()
	}

	#[test]
	fn t_stats() {
		let img = buf(2, 2, &[
			[255, 0, 0, 255],
			[0, 255, 0, 255],
			[255, 0, 0, 255],
			[0, 0, 255, 128],
		]);
		let stats = img.stats();
		assert_eq!(stats.unique_colors, 3);
		assert!(stats.has_alpha);
		assert!(! stats.is_grayscale);

		let gray = buf(1, 2, &[[7, 7, 7, 255], [9, 9, 9, 255]]);
		let stats = gray.stats();
		assert_eq!(stats.unique_colors, 2);
		assert!(! stats.has_alpha);
		assert!(stats.is_grayscale);
	}

	#[test]
	fn t_stride_padding() {
		// Eight bytes per row claimed, four used.
		let raw = [1, 2, 3, 4, 0xAA, 0xAA, 0xAA, 0xAA, 5, 6, 7, 8, 0xAA, 0xAA, 0xAA, 0xAA];
		let img = ImageBuffer::from_bgra(1, 2, 8, &raw).unwrap();
		let px: Vec<&[u8]> = img.pixels().collect();
		assert_eq!(px, vec![&[1, 2, 3, 4][..], &[5, 6, 7, 8][..]]);
	}

	#[test]
	fn t_convert_rgb() {
		let img = buf(1, 1, &[[255, 0, 10, 255]]);
		let raw = img.convert(ColorMode::Rgb, BitDepth::Eight).unwrap();
		assert_eq!(raw.pixels, vec![255, 0, 10]);
		assert_eq!(raw.stride(), 3);
		assert_eq!(raw.bpp(), 3);

		let raw = img.convert(ColorMode::Rgba, BitDepth::Eight).unwrap();
		assert_eq!(raw.pixels, vec![255, 0, 10, 255]);
	}

	#[test]
	fn t_convert_gray() {
		// Gray inputs survive luma untouched.
		let img = buf(4, 1, &[
			[0, 0, 0, 255],
			[64, 64, 64, 255],
			[128, 128, 128, 255],
			[192, 192, 192, 255],
		]);
		let raw = img.convert(ColorMode::Grayscale, BitDepth::Eight).unwrap();
		assert_eq!(raw.pixels, vec![0, 64, 128, 192]);

		// 64 is not a multiple of 17, so four-bit gray has no exact slot.
		assert_eq!(
			img.convert(ColorMode::Grayscale, BitDepth::Four),
			Err(CandidateError::Infeasible),
		);

		// Pure black/white packs down to single bits.
		let bw = buf(2, 2, &[
			[0, 0, 0, 255],
			[255, 255, 255, 255],
			[255, 255, 255, 255],
			[0, 0, 0, 255],
		]);
		let raw = bw.convert(ColorMode::Grayscale, BitDepth::One).unwrap();
		assert_eq!(raw.pixels, vec![0b0100_0000, 0b1000_0000]);
		assert_eq!(raw.stride(), 1);
	}

	#[test]
	fn t_convert_palette() {
		let img = buf(2, 2, &[
			[0, 0, 0, 255],
			[255, 255, 255, 255],
			[255, 255, 255, 255],
			[0, 0, 0, 255],
		]);
		let raw = img.convert(ColorMode::Palette, BitDepth::One).unwrap();

		// First-seen order: black then white.
		assert_eq!(raw.palette.as_deref(), Some(&[0, 0, 0, 255, 255, 255][..]));
		assert_eq!(raw.pixels, vec![0b0100_0000, 0b1000_0000]);

		let raw = img.convert(ColorMode::Palette, BitDepth::Eight).unwrap();
		assert_eq!(raw.pixels, vec![0, 1, 1, 0]);
	}

	#[test]
	fn t_luma() {
		assert_eq!(luma(255, 255, 255), 255);
		assert_eq!(luma(0, 0, 0), 0);
		assert_eq!(luma(100, 100, 100), 100);
		assert_eq!(luma(255, 0, 0), 76);
	}

	#[test]
	fn t_nearest() {
		let palette = [0, 0, 0, 255, 255, 255, 128, 0, 0];
		assert_eq!(nearest_entry(&palette, 10, 10, 10), 0);
		assert_eq!(nearest_entry(&palette, 200, 220, 250), 1);
		assert_eq!(nearest_entry(&palette, 120, 10, 0), 2);
	}
}
