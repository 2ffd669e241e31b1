/*!
# Magra: Decoding.

Reading an existing PNG back to pixels: chunk walk, IDAT inflation,
unfiltering (straight or Adam7), and — when the representation allows it
losslessly — expansion to the shared BGRA buffer the full search runs on.
*/

use crate::{
	adam7,
	BitDepth,
	chunk::{
		self,
		Chunk,
	},
	ColorMode,
	filter,
	FilterType,
	IhdrData,
	image::RawImage,
	ImageBuffer,
	InterlaceMethod,
	MagraError,
	zlib,
};



#[derive(Debug, Clone)]
/// # A Decoded PNG.
///
/// Holds both the original chunk list (for the chunk-preserving rebuild)
/// and the reconstructed raster in its native representation.
pub struct DecodedPng {
	/// # Original Chunks.
	chunks: Vec<Chunk>,

	/// # Image Header.
	pub ihdr: IhdrData,

	/// # Native Raster (Unfiltered, Non-Interlaced).
	raw: RawImage,
}

impl DecodedPng {
	/// # Parse and Reconstruct.
	///
	/// Walks the container, inflates the IDAT stream, and unfilters (or
	/// deinterlaces) back to raw scanlines.
	///
	/// ## Errors
	///
	/// Any container or stream defect listed in [`MagraError`] is fatal
	/// here, with one exception: ancillary chunks with bad CRCs are
	/// tolerated (and logged) during the chunk walk.
	pub fn parse(src: &[u8]) -> Result<Self, MagraError> {
		let chunks = chunk::read_all(src)?;
		let ihdr = IhdrData::parse(chunks[0].data())?;

		let compressed = chunk::concat_idat(&chunks);
		let raw_filtered = zlib::inflate(&compressed)?;

		let pixels = match ihdr.interlace {
			InterlaceMethod::None => unfilter(&raw_filtered, &ihdr)?,
			InterlaceMethod::Adam7 => adam7::deinterlace(&raw_filtered, &ihdr)?,
		};

		// Indexed images need their palette; anything else can ignore it.
		let palette = chunks.iter()
			.find(|c| c.is(chunk::PLTE))
			.map(|c| c.data().to_vec());
		if matches!(ihdr.color, ColorMode::Palette) {
			let ok = palette.as_ref().is_some_and(|p|
				! p.is_empty() && p.len() % 3 == 0 && p.len() / 3 <= 256
			);
			if ! ok { return Err(MagraError::InvalidIhdr); }
		}

		Ok(Self {
			chunks,
			ihdr,
			raw: RawImage {
				width: ihdr.width,
				height: ihdr.height,
				color: ihdr.color,
				depth: ihdr.depth,
				palette,
				pixels,
			},
		})
	}

	#[must_use]
	/// # Native Raster Bytes.
	pub fn raster(&self) -> &[u8] { &self.raw.pixels }

	#[must_use]
	/// # Native Raster.
	pub(crate) const fn raw(&self) -> &RawImage { &self.raw }

	#[must_use]
	/// # Carries a tRNS Chunk?
	///
	/// Transparency-by-sidecar can't be expressed in the plain BGRA
	/// expansion, so its presence forces the representation-preserving
	/// pipeline.
	pub fn has_trns(&self) -> bool {
		self.chunks.iter().any(|c| c.is(chunk::TRNS))
	}

	/// # Expand to BGRA.
	///
	/// Lossless for every 8-bits-and-under representation; sixteen-bit
	/// channels would have to round, so they refuse instead.
	///
	/// ## Errors
	///
	/// Returns an error for 16-bit depths or out-of-range palette indices.
	pub fn to_image_buffer(&self) -> Result<ImageBuffer, MagraError> {
		if matches!(self.ihdr.depth, BitDepth::Sixteen) {
			return Err(MagraError::Unsupported);
		}

		let width = self.ihdr.width as usize;
		let stride = self.ihdr.stride();
		let mut px: Vec<u8> = Vec::with_capacity(width * self.ihdr.height as usize * 4);

		for row in self.raw.pixels.chunks_exact(stride) {
			match self.ihdr.color {
				ColorMode::Grayscale => {
					let scale = 255 / ((1_u16 << self.ihdr.depth.get()) - 1) as u8;
					for x in 0..width {
						let y = unpack(row, x, self.ihdr.depth.get() as usize) * scale;
						px.extend_from_slice(&[y, y, y, 255]);
					}
				},
				ColorMode::GrayscaleAlpha => for p in row.chunks_exact(2) {
					px.extend_from_slice(&[p[0], p[0], p[0], p[1]]);
				},
				ColorMode::Rgb => for p in row.chunks_exact(3) {
					px.extend_from_slice(&[p[2], p[1], p[0], 255]);
				},
				ColorMode::Rgba => for p in row.chunks_exact(4) {
					px.extend_from_slice(&[p[2], p[1], p[0], p[3]]);
				},
				ColorMode::Palette => {
					let palette = self.raw.palette.as_deref().ok_or(MagraError::InvalidIhdr)?;
					for x in 0..width {
						let idx = unpack(row, x, self.ihdr.depth.get() as usize) as usize;
						let rgb = palette.get(idx * 3..idx * 3 + 3)
							.ok_or(MagraError::Unsupported)?;
						px.extend_from_slice(&[rgb[2], rgb[1], rgb[0], 255]);
					}
				},
			}
		}

		Ok(ImageBuffer::from_parts(self.ihdr.width, self.ihdr.height, px))
	}

	#[must_use]
	/// # Rebuild Around a New IDAT.
	///
	/// Every chunk that isn't IHDR/IDAT rides along unchanged, in its
	/// original order; the IHDR is re-issued non-interlaced; the (possibly
	/// many) IDATs collapse into one at the position of the first; IEND
	/// stays last, because the parse guaranteed it already was.
	pub(crate) fn rebuild(&self, idat: Vec<u8>) -> Vec<u8> {
		let mut out: Vec<Chunk> = Vec::with_capacity(self.chunks.len());
		let mut idat = Some(idat);

		for c in &self.chunks {
			if c.is(chunk::IHDR) {
				out.push(Chunk::new(chunk::IHDR, self.ihdr.deinterlaced().serialize().to_vec()));
			}
			else if c.is(chunk::IDAT) {
				if let Some(data) = idat.take() {
					out.push(Chunk::new(chunk::IDAT, data));
				}
			}
			else { out.push(c.clone()); }
		}

		chunk::write_all(&out)
	}
}

/// # Unfilter a Progressive Payload.
///
/// Rows are one tag byte plus `stride` data bytes; each unfilters against
/// the reconstructed row above.
///
/// ## Errors
///
/// Returns an error if the payload size disagrees with the header geometry
/// or a filter tag is out of range.
fn unfilter(raw: &[u8], ihdr: &IhdrData) -> Result<Vec<u8>, MagraError> {
	let stride = ihdr.stride();
	let height = ihdr.height as usize;
	let bpp = ihdr.bpp();
	if raw.len() != height * (stride + 1) { return Err(MagraError::CorruptZlib); }

	let mut out: Vec<u8> = vec![0; height * stride];
	for (y, line) in raw.chunks_exact(stride + 1).enumerate() {
		let tag = FilterType::from_u8(line[0]).ok_or(MagraError::Unsupported)?;

		let (done, rest) = out.split_at_mut(y * stride);
		let cur = &mut rest[..stride];
		cur.copy_from_slice(&line[1..]);

		let prev =
			if y == 0 { &[] }
			else { &done[(y - 1) * stride..] };
		filter::unapply(tag, cur, prev, bpp);
	}

	Ok(out)
}

/// # Unpack One Sample.
///
/// Pulls pixel `x` out of a packed row at one, two, four, or eight bits,
/// MSB-first.
fn unpack(row: &[u8], x: usize, bits: usize) -> u8 {
	if bits == 8 { row[x] }
	else {
		let mask = (1_u8 << bits) - 1;
		(row[x * bits / 8] >> (8 - bits - (x * bits) % 8)) & mask
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		DeflateLevel,
		encode::{
			encode_raster,
			OptimizationCombo,
		},
		FilterStrategy,
	};

	/// # Encode a Checkerboard the Boring Way.
	fn sample(color: ColorMode, depth: BitDepth) -> (ImageBuffer, Vec<u8>) {
		let img = ImageBuffer::from_bgra(2, 2, 8, &[
			0, 0, 0, 255,       255, 255, 255, 255,
			255, 255, 255, 255, 0, 0, 0, 255,
		]).unwrap();
		let result = encode_raster(&img, OptimizationCombo {
			color,
			depth,
			interlace: InterlaceMethod::None,
			strategy: FilterStrategy::SingleFilter,
			level: DeflateLevel::Default,
		}).expect("encode failed");
		(img, result.bytes)
	}

	#[test]
	fn t_decode_roundtrip() {
		for (color, depth) in [
			(ColorMode::Rgb, BitDepth::Eight),
			(ColorMode::Rgba, BitDepth::Eight),
			(ColorMode::Grayscale, BitDepth::Eight),
			(ColorMode::Grayscale, BitDepth::One),
			(ColorMode::Palette, BitDepth::One),
			(ColorMode::Palette, BitDepth::Eight),
		] {
			let (img, bytes) = sample(color, depth);
			let decoded = DecodedPng::parse(&bytes).expect("parse failed");
			assert_eq!(decoded.ihdr.color, color);
			assert_eq!(decoded.ihdr.depth, depth);

			// Whatever the wire representation, the pixels must come back
			// byte-identical.
			let back = decoded.to_image_buffer().expect("expand failed");
			assert_eq!(
				back.pixels().collect::<Vec<_>>(),
				img.pixels().collect::<Vec<_>>(),
				"pixels drifted through {}/{}", color.as_str(), depth.get(),
			);
		}
	}

	#[test]
	fn t_unfilter_geometry() {
		let ihdr = IhdrData::new(
			2, 2, BitDepth::Eight, ColorMode::Grayscale, InterlaceMethod::None,
		).unwrap();

		// Row two leans on row one via Up.
		let wire = [
			0_u8, 10, 20,
			2, 5, 5,
		];
		assert_eq!(unfilter(&wire, &ihdr).unwrap(), vec![10, 20, 15, 25]);

		// Short payloads don't fly.
		assert!(unfilter(&wire[..5], &ihdr).is_err());

		// Neither do filter tags from the future.
		let wire = [9_u8, 10, 20, 0, 5, 5];
		assert_eq!(unfilter(&wire, &ihdr), Err(MagraError::Unsupported));
	}

	#[test]
	fn t_rebuild_preserves() {
		let (_, bytes) = sample(ColorMode::Rgb, BitDepth::Eight);

		// Wedge an ancillary chunk between IHDR and IDAT.
		let mut chunks = chunk::read_all(&bytes).unwrap();
		chunks.insert(1, Chunk::new(*b"tEXt", b"Comment\0magra".to_vec()));
		let bytes = chunk::write_all(&chunks);

		let decoded = DecodedPng::parse(&bytes).expect("parse failed");
		let rebuilt = decoded.rebuild(vec![1, 2, 3]);
		let back = chunk::read_all(&rebuilt).expect("reparse failed");

		assert_eq!(back.len(), 4);
		assert!(back[0].is(chunk::IHDR));
		assert!(back[1].is(*b"tEXt"));
		assert_eq!(back[2].data(), &[1, 2, 3]);
		assert!(back[3].is(chunk::IEND));
	}

	#[test]
	fn t_unpack() {
		let row = [0b1011_0001_u8, 0b0100_0000];
		assert_eq!(unpack(&row, 0, 1), 1);
		assert_eq!(unpack(&row, 1, 1), 0);
		assert_eq!(unpack(&row, 9, 1), 1);
		assert_eq!(unpack(&row, 0, 4), 0b1011);
		assert_eq!(unpack(&row, 1, 4), 0b0001);
		assert_eq!(unpack(&row, 0, 2), 0b10);
		assert_eq!(unpack(&row, 3, 2), 0b01);
	}
}
