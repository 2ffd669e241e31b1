/*!
# Magra: Chunks.

PNG container framing: the eight-byte signature followed by chunks of
`length (u32 BE) | type (4 ASCII letters) | data | crc32 (u32 BE)`, where
the CRC covers `type ∥ data`.
*/

use crate::MagraError;



/// # PNG Signature.
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// # IHDR Type.
pub const IHDR: [u8; 4] = *b"IHDR";

/// # PLTE Type.
pub const PLTE: [u8; 4] = *b"PLTE";

/// # IDAT Type.
pub const IDAT: [u8; 4] = *b"IDAT";

/// # IEND Type.
pub const IEND: [u8; 4] = *b"IEND";

/// # tRNS Type.
pub const TRNS: [u8; 4] = *b"tRNS";



#[derive(Debug, Clone, Eq, PartialEq)]
/// # A Single Chunk.
///
/// Length and CRC are implied; both are (re)derived on write, so a `Chunk`
/// held in memory is always internally consistent.
pub struct Chunk {
	/// # Chunk Type.
	kind: [u8; 4],

	/// # Chunk Data.
	data: Vec<u8>,
}

impl Chunk {
	#[must_use]
	/// # New.
	pub const fn new(kind: [u8; 4], data: Vec<u8>) -> Self {
		Self { kind, data }
	}

	#[must_use]
	/// # Chunk Type.
	pub const fn kind(&self) -> [u8; 4] { self.kind }

	#[must_use]
	/// # Chunk Data.
	pub fn data(&self) -> &[u8] { &self.data }

	#[must_use]
	/// # Consume, Returning the Data.
	pub fn into_data(self) -> Vec<u8> { self.data }

	#[must_use]
	/// # Is It This Type?
	pub fn is(&self, kind: [u8; 4]) -> bool { self.kind == kind }

	#[must_use]
	/// # Critical Chunk?
	///
	/// Chunk types with an uppercase first letter (IHDR, PLTE, IDAT, IEND)
	/// are critical; everything else is ancillary.
	pub const fn is_critical(&self) -> bool { self.kind[0].is_ascii_uppercase() }

	#[must_use]
	/// # CRC-32 (of `type ∥ data`).
	pub fn crc(&self) -> u32 {
		let mut hasher = crc32fast::Hasher::new();
		hasher.update(&self.kind);
		hasher.update(&self.data);
		hasher.finalize()
	}

	/// # Serialize Into a Buffer.
	pub fn write_into(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
		out.extend_from_slice(&self.kind);
		out.extend_from_slice(&self.data);
		out.extend_from_slice(&self.crc().to_be_bytes());
	}
}



/// # Parse a Whole PNG Into Chunks.
///
/// This verifies the signature, then walks `length | type | data | crc`
/// frames until IEND. CRC failures on critical chunks are fatal; on
/// ancillary chunks (`gAMA`, `cHRM`, creative text nobody proofread…) they
/// are logged and tolerated.
///
/// ## Errors
///
/// Returns an error if the signature is wrong, the stream ends early, a
/// declared length runs past the buffer, IHDR isn't first, IDAT is absent,
/// a critical CRC fails, or bytes trail the IEND chunk.
pub fn read_all(src: &[u8]) -> Result<Vec<Chunk>, MagraError> {
	let src = src.strip_prefix(SIGNATURE.as_slice())
		.ok_or(MagraError::BadSignature)?;

	let mut out: Vec<Chunk> = Vec::with_capacity(8);
	let mut pos: usize = 0;
	let mut seen_idat = false;

	loop {
		// Each frame needs at least length + type + crc.
		let header = src.get(pos..pos + 8).ok_or(MagraError::PrematureEof)?;
		let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
		let kind: [u8; 4] = [header[4], header[5], header[6], header[7]];
		if ! kind.iter().all(u8::is_ascii_alphabetic) {
			return Err(MagraError::Unsupported);
		}

		let data_start = pos + 8;
		let data_end = data_start.checked_add(len)
			.filter(|&end| end.checked_add(4).is_some_and(|end| end <= src.len()))
			.ok_or(MagraError::LengthOverflow)?;

		let chunk = Chunk::new(kind, src[data_start..data_end].to_vec());
		let crc = u32::from_be_bytes([
			src[data_end], src[data_end + 1], src[data_end + 2], src[data_end + 3],
		]);

		// Verify the checksum.
		if crc != chunk.crc() {
			if chunk.is_critical() { return Err(MagraError::CrcMismatch); }
			log::warn!(
				"ignoring CRC mismatch on ancillary {} chunk",
				String::from_utf8_lossy(&kind),
			);
		}

		if kind == IDAT { seen_idat = true; }
		pos = data_end + 4;
		let done = kind == IEND;
		out.push(chunk);

		if done {
			// Nothing may follow IEND.
			if pos != src.len() { return Err(MagraError::IendNotLast); }
			break;
		}
	}

	// IHDR leads, IDAT shows up somewhere.
	if ! out.first().is_some_and(|c| c.is(IHDR)) { return Err(MagraError::MissingIhdr); }
	if ! seen_idat { return Err(MagraError::MissingIdat); }

	Ok(out)
}

#[must_use]
/// # Serialize Signature + Chunks.
pub fn write_all(chunks: &[Chunk]) -> Vec<u8> {
	let len = 8 + chunks.iter().map(|c| c.data().len() + 12).sum::<usize>();
	let mut out: Vec<u8> = Vec::with_capacity(len);
	out.extend_from_slice(&SIGNATURE);
	for chunk in chunks { chunk.write_into(&mut out); }
	out
}

#[must_use]
/// # Concatenated IDAT Payload.
///
/// All IDAT chunks together hold one contiguous zlib stream; this glues
/// their payloads back together in file order.
pub fn concat_idat(chunks: &[Chunk]) -> Vec<u8> {
	let len = chunks.iter()
		.filter(|c| c.is(IDAT))
		.map(|c| c.data().len())
		.sum();
	let mut out: Vec<u8> = Vec::with_capacity(len);
	for chunk in chunks.iter().filter(|c| c.is(IDAT)) {
		out.extend_from_slice(chunk.data());
	}
	out
}
