/*!
# Magra: IHDR.

The 13-byte image header payload and the little enums living inside it.
*/

use crate::MagraError;



#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
/// # Color Mode.
///
/// The PNG color types, minus nothing: all five are supported on both ends
/// of the pipeline.
pub enum ColorMode {
	/// # Grayscale.
	Grayscale = 0,

	/// # Truecolor.
	Rgb = 2,

	/// # Indexed.
	Palette = 3,

	/// # Grayscale w/ Alpha.
	GrayscaleAlpha = 4,

	/// # Truecolor w/ Alpha.
	Rgba = 6,
}

impl ColorMode {
	#[must_use]
	/// # From Wire Value.
	pub const fn from_u8(raw: u8) -> Option<Self> {
		match raw {
			0 => Some(Self::Grayscale),
			2 => Some(Self::Rgb),
			3 => Some(Self::Palette),
			4 => Some(Self::GrayscaleAlpha),
			6 => Some(Self::Rgba),
			_ => None,
		}
	}

	#[must_use]
	/// # Samples Per Pixel.
	///
	/// Palette pixels count as one sample (the index stream).
	pub const fn samples(self) -> usize {
		match self {
			Self::Grayscale | Self::Palette => 1,
			Self::GrayscaleAlpha => 2,
			Self::Rgb => 3,
			Self::Rgba => 4,
		}
	}

	#[must_use]
	/// # Is the Bit Depth Legal for This Mode?
	pub const fn supports_depth(self, depth: BitDepth) -> bool {
		match self {
			Self::Grayscale => true,
			Self::Palette => ! matches!(depth, BitDepth::Sixteen),
			Self::Rgb | Self::GrayscaleAlpha | Self::Rgba =>
				matches!(depth, BitDepth::Eight | BitDepth::Sixteen),
		}
	}

	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Grayscale => "grayscale",
			Self::Rgb => "RGB",
			Self::Palette => "palette",
			Self::GrayscaleAlpha => "grayscale+alpha",
			Self::Rgba => "RGBA",
		}
	}
}



#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
/// # Bit Depth.
pub enum BitDepth {
	/// # One Bit.
	One = 1,

	/// # Two Bits.
	Two = 2,

	/// # Four Bits.
	Four = 4,

	/// # Eight Bits.
	Eight = 8,

	/// # Sixteen Bits.
	Sixteen = 16,
}

impl BitDepth {
	#[must_use]
	/// # From Wire Value.
	pub const fn from_u8(raw: u8) -> Option<Self> {
		match raw {
			1 => Some(Self::One),
			2 => Some(Self::Two),
			4 => Some(Self::Four),
			8 => Some(Self::Eight),
			16 => Some(Self::Sixteen),
			_ => None,
		}
	}

	#[must_use]
	/// # As u8.
	pub const fn get(self) -> u8 { self as u8 }

	#[must_use]
	/// # Smallest Depth Covering `n` Palette Entries.
	pub const fn for_colors(n: usize) -> Self {
		if n <= 2 { Self::One }
		else if n <= 4 { Self::Two }
		else if n <= 16 { Self::Four }
		else { Self::Eight }
	}
}



#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
/// # Interlace Method.
pub enum InterlaceMethod {
	/// # Progressive (None).
	None = 0,

	/// # Adam7.
	Adam7 = 1,
}



#[derive(Debug, Copy, Clone, Eq, PartialEq)]
/// # IHDR Payload.
///
/// Compression and filter methods have exactly one legal value apiece (zero)
/// so aren't stored; parsing rejects anything else.
pub struct IhdrData {
	/// # Width (Pixels).
	pub width: u32,

	/// # Height (Pixels).
	pub height: u32,

	/// # Bit Depth.
	pub depth: BitDepth,

	/// # Color Mode.
	pub color: ColorMode,

	/// # Interlace Method.
	pub interlace: InterlaceMethod,
}

impl IhdrData {
	/// # New (Validated).
	///
	/// ## Errors
	///
	/// Returns an error for zero dimensions or an illegal mode/depth pair.
	pub const fn new(
		width: u32,
		height: u32,
		depth: BitDepth,
		color: ColorMode,
		interlace: InterlaceMethod,
	) -> Result<Self, MagraError> {
		if width == 0 || height == 0 || ! color.supports_depth(depth) {
			Err(MagraError::InvalidIhdr)
		}
		else {
			Ok(Self { width, height, depth, color, interlace })
		}
	}

	/// # Parse the 13-Byte Payload.
	///
	/// ## Errors
	///
	/// Returns an error if the payload is the wrong size, the dimensions
	/// are zero, the mode/depth pair is illegal, or the compression,
	/// filter, or interlace bytes hold anything unexpected.
	pub fn parse(raw: &[u8]) -> Result<Self, MagraError> {
		let raw: &[u8; 13] = raw.try_into().map_err(|_| MagraError::InvalidIhdr)?;

		let width = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
		let height = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
		let depth = BitDepth::from_u8(raw[8]).ok_or(MagraError::InvalidIhdr)?;
		let color = ColorMode::from_u8(raw[9]).ok_or(MagraError::Unsupported)?;

		// Only compression zero and filter zero have ever been defined.
		if raw[10] != 0 || raw[11] != 0 { return Err(MagraError::InvalidIhdr); }

		let interlace = match raw[12] {
			0 => InterlaceMethod::None,
			1 => InterlaceMethod::Adam7,
			_ => return Err(MagraError::InvalidIhdr),
		};

		Self::new(width, height, depth, color, interlace)
	}

	#[must_use]
	/// # Serialize the 13-Byte Payload.
	pub fn serialize(&self) -> [u8; 13] {
		let mut out = [0_u8; 13];
		out[..4].copy_from_slice(&self.width.to_be_bytes());
		out[4..8].copy_from_slice(&self.height.to_be_bytes());
		out[8] = self.depth.get();
		out[9] = self.color as u8;
		out[12] = self.interlace as u8;
		out
	}

	#[must_use]
	/// # Non-Interlaced Clone.
	///
	/// Deinterlaced output reuses the source header with the interlace
	/// byte flipped off.
	pub const fn deinterlaced(&self) -> Self {
		Self {
			width: self.width,
			height: self.height,
			depth: self.depth,
			color: self.color,
			interlace: InterlaceMethod::None,
		}
	}

	#[must_use]
	/// # Bytes Per Scanline (Unfiltered).
	pub const fn stride(&self) -> usize {
		stride_for(self.width, self.color, self.depth)
	}

	#[must_use]
	/// # Filter Stride (Bytes Per Pixel).
	///
	/// Sub-byte modes clamp to one whole byte, per the filter rules.
	pub const fn bpp(&self) -> usize {
		let bits = self.color.samples() * self.depth.get() as usize;
		if bits < 8 { 1 } else { bits / 8 }
	}
}

#[must_use]
/// # Bytes Per Scanline for Arbitrary Geometry.
///
/// Sub-byte pixels pack MSB-first, so partially-filled trailing bytes
/// round up.
pub(crate) const fn stride_for(width: u32, color: ColorMode, depth: BitDepth) -> usize {
	(width as usize * color.samples() * depth.get() as usize).div_ceil(8)
}
