/*!
# Magra: Adam7.

Seven-pass interlace geometry. Each pass is a little image of its own — its
own stride, its own previous-row chain for filtering — whose pixels scatter
into (or gather from) the final raster on an 8×8 grid.
*/

use crate::{
	filter,
	FilterType,
	ihdr::stride_for,
	IhdrData,
	MagraError,
};



#[derive(Debug, Copy, Clone)]
/// # One Interlace Pass.
struct Pass {
	/// # First Row.
	row: usize,

	/// # First Column.
	col: usize,

	/// # Row Increment.
	row_step: usize,

	/// # Column Increment.
	col_step: usize,
}

/// # The Seven Passes.
const PASSES: [Pass; 7] = [
	Pass { row: 0, col: 0, row_step: 8, col_step: 8 },
	Pass { row: 0, col: 4, row_step: 8, col_step: 8 },
	Pass { row: 4, col: 0, row_step: 8, col_step: 4 },
	Pass { row: 0, col: 2, row_step: 4, col_step: 4 },
	Pass { row: 2, col: 0, row_step: 4, col_step: 2 },
	Pass { row: 0, col: 1, row_step: 2, col_step: 2 },
	Pass { row: 1, col: 0, row_step: 2, col_step: 1 },
];

impl Pass {
	/// # Sub-Image Dimensions.
	///
	/// Either dimension can come up zero for small rasters, in which case
	/// the pass contributes no bytes at all (not even filter tags).
	const fn dimensions(self, width: u32, height: u32) -> (usize, usize) {
		(
			(width as usize).saturating_sub(self.col).div_ceil(self.col_step),
			(height as usize).saturating_sub(self.row).div_ceil(self.row_step),
		)
	}
}



#[derive(Debug, Clone)]
/// # An Extracted Pass Image.
pub(crate) struct PassImage {
	/// # Width (Pixels).
	pub(crate) width: u32,

	/// # Height (Pixels).
	pub(crate) height: u32,

	/// # Raw Pixels (height × stride).
	pub(crate) pixels: Vec<u8>,
}

/// # Split a Raster Into Pass Images.
///
/// Returns the non-empty passes in order, ready for independent filtering.
pub(crate) fn split_passes(raster: &[u8], ihdr: &IhdrData) -> Vec<PassImage> {
	let stride = ihdr.stride();
	let bits = ihdr.color.samples() * ihdr.depth.get() as usize;
	let mut out: Vec<PassImage> = Vec::with_capacity(7);

	for pass in PASSES {
		let (pw, ph) = pass.dimensions(ihdr.width, ihdr.height);
		if pw == 0 || ph == 0 { continue; }

		let pass_stride = stride_for(pw as u32, ihdr.color, ihdr.depth);
		let mut pixels: Vec<u8> = vec![0; pass_stride * ph];
		for py in 0..ph {
			let src = &raster[(pass.row + py * pass.row_step) * stride..][..stride];
			let dst = &mut pixels[py * pass_stride..][..pass_stride];
			for px in 0..pw {
				copy_px(src, pass.col + px * pass.col_step, dst, px, bits);
			}
		}

		out.push(PassImage { width: pw as u32, height: ph as u32, pixels });
	}

	out
}

/// # Deinterlace.
///
/// `raw` is the inflated IDAT payload of an Adam7 image: for each non-empty
/// pass in order, `passH` rows of one filter tag plus `passW` pixels' worth
/// of bytes. Each pass unfilters against its own previous row (the chain
/// resets between passes), and the reconstructed pixels scatter to their
/// final positions.
///
/// Returns the full-size progressive raster.
///
/// ## Errors
///
/// Returns an error if the payload size disagrees with the pass geometry
/// or a filter tag is out of range.
pub(crate) fn deinterlace(raw: &[u8], ihdr: &IhdrData) -> Result<Vec<u8>, MagraError> {
	let stride = ihdr.stride();
	let bits = ihdr.color.samples() * ihdr.depth.get() as usize;
	let bpp = ihdr.bpp();
	let mut raster: Vec<u8> = vec![0; stride * ihdr.height as usize];

	let mut pos: usize = 0;
	let mut prev: Vec<u8> = Vec::new();
	let mut cur: Vec<u8> = Vec::new();

	for pass in PASSES {
		let (pw, ph) = pass.dimensions(ihdr.width, ihdr.height);
		if pw == 0 || ph == 0 { continue; }

		let pass_stride = stride_for(pw as u32, ihdr.color, ihdr.depth);
		prev.clear();

		for py in 0..ph {
			let line = raw.get(pos..pos + 1 + pass_stride)
				.ok_or(MagraError::CorruptZlib)?;
			pos += 1 + pass_stride;

			let tag = FilterType::from_u8(line[0]).ok_or(MagraError::Unsupported)?;
			cur.clear();
			cur.extend_from_slice(&line[1..]);
			filter::unapply(tag, &mut cur, &prev, bpp);

			// Scatter the reconstructed pixels home.
			let dst = &mut raster[(pass.row + py * pass.row_step) * stride..][..stride];
			for px in 0..pw {
				copy_px(&cur, px, dst, pass.col + px * pass.col_step, bits);
			}

			std::mem::swap(&mut prev, &mut cur);
		}
	}

	// The payload should be spent exactly.
	if pos == raw.len() { Ok(raster) }
	else { Err(MagraError::CorruptZlib) }
}

/// # Copy One Pixel Between Packed Rows.
///
/// Whole-byte pixels move byte-wise; sub-byte pixels (`bits` of 1, 2, or 4)
/// shift in and out of their MSB-first slots.
fn copy_px(src: &[u8], sx: usize, dst: &mut [u8], dx: usize, bits: usize) {
	if bits % 8 == 0 {
		let n = bits / 8;
		dst[dx * n..dx * n + n].copy_from_slice(&src[sx * n..sx * n + n]);
	}
	else {
		let mask = (1_u8 << bits) - 1;
		let v = (src[sx * bits / 8] >> (8 - bits - (sx * bits) % 8)) & mask;
		let shift = 8 - bits - (dx * bits) % 8;
		let byte = &mut dst[dx * bits / 8];
		*byte = (*byte & ! (mask << shift)) | (v << shift);
	}
}
