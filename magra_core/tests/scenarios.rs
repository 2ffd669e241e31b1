/*!
# Magra: End-to-End Scenarios.

Each test feeds a small, hand-checkable image through the public surface
and pins the behaviors that matter: winning combinations, per-row filter
picks, losslessness across representations, and determinism.
*/

use flate2::{
	Compression,
	write::ZlibEncoder,
};
use magra_core::{
	BitDepth,
	chunk::{
		self,
		Chunk,
	},
	ColorMode,
	DecodedPng,
	DeflateLevel,
	FilterStrategy,
	FilterType,
	ImageBuffer,
	InterlaceMethod,
	search_raster,
	Settings,
};
use std::io::Write;



/// # Build a Buffer From RGBA Tuples.
fn buf(width: u32, height: u32, px: &[[u8; 4]]) -> ImageBuffer {
	assert_eq!(px.len(), (width * height) as usize);
	let raw: Vec<u8> = px.iter()
		.flat_map(|p| [p[2], p[1], p[0], p[3]]) // BGRA
		.collect();
	ImageBuffer::from_bgra(width, height, width as usize * 4, &raw).unwrap()
}

/// # Quick Settings.
fn settings(strategies: &[FilterStrategy], levels: &[DeflateLevel]) -> Settings {
	Settings {
		strategies: strategies.to_vec(),
		levels: levels.to_vec(),
		..Settings::default()
	}
}



#[test]
/// # S1: 1×1 Opaque Red.
fn t_one_red_pixel() {
	let img = buf(1, 1, &[[255, 0, 0, 255]]);

	let stats = img.stats();
	assert_eq!(stats.unique_colors, 1);
	assert!(! stats.has_alpha);
	assert!(! stats.is_grayscale);

	let winner = search_raster(&img, &stats, &Settings::default()).expect("search failed");
	assert_eq!(winner.combo.color, ColorMode::Rgb);
	assert_eq!(winner.combo.depth, BitDepth::Eight);
	assert_eq!(winner.combo.interlace, InterlaceMethod::None);
	assert_eq!(winner.combo.strategy, FilterStrategy::SingleFilter);
	assert_eq!(winner.filters, vec![FilterType::None]);

	// And it must decode right back.
	let decoded = DecodedPng::parse(&winner.bytes).expect("reparse failed");
	assert_eq!(
		decoded.to_image_buffer().expect("expand failed").bgra(),
		img.bgra(),
	);
}

#[test]
/// # S2: 2×2 Two-Color Checkerboard.
fn t_checkerboard_palette() {
	let img = buf(2, 2, &[
		[0, 0, 0, 255],
		[255, 255, 255, 255],
		[255, 255, 255, 255],
		[0, 0, 0, 255],
	]);
	let stats = img.stats();
	assert_eq!(stats.unique_colors, 2);

	// The full search can't do worse than the naive baseline.
	let naive = search_raster(
		&img,
		&stats,
		&Settings {
			auto_color: false,
			..settings(&[FilterStrategy::SingleFilter], &[DeflateLevel::Fastest])
		},
	).expect("baseline failed");
	assert_eq!(naive.combo.color, ColorMode::Rgb);

	let winner = search_raster(&img, &stats, &Settings::default()).expect("search failed");
	assert!(winner.size() <= naive.size());

	// Losslessness, whatever representation won.
	let decoded = DecodedPng::parse(&winner.bytes).expect("reparse failed");
	assert_eq!(
		decoded.to_image_buffer().expect("expand failed").bgra(),
		img.bgra(),
	);
}

#[test]
/// # S3: 4×1 Horizontal Gradient.
fn t_gradient_prefers_sub() {
	let img = buf(4, 1, &[
		[0, 0, 0, 255],
		[64, 64, 64, 255],
		[128, 128, 128, 255],
		[192, 192, 192, 255],
	]);
	let stats = img.stats();
	assert!(stats.is_grayscale);

	let winner = search_raster(
		&img,
		&stats,
		&settings(&[FilterStrategy::ScanlineAdaptive], &[DeflateLevel::Default]),
	).expect("search failed");

	assert_eq!(winner.combo.color, ColorMode::Grayscale);
	assert_eq!(winner.filters, vec![FilterType::Sub]);
}

#[test]
/// # S4: 1×2 Dependent Rows.
fn t_dependent_rows_prefer_up() {
	let img = buf(1, 2, &[
		[10, 20, 30, 255],
		[12, 22, 32, 255],
	]);
	let stats = img.stats();

	let winner = search_raster(
		&img,
		&stats,
		&Settings {
			auto_color: false,
			..settings(&[FilterStrategy::ScanlineAdaptive], &[DeflateLevel::Default])
		},
	).expect("search failed");

	assert_eq!(winner.combo.color, ColorMode::Rgb);
	assert_eq!(winner.filters[1], FilterType::Up);
}

#[test]
/// # S6: Recompress an Interlaced Source.
fn t_deinterlace_lossless() {
	let raster: Vec<u8> = (0..81_usize).map(|i| (i * 13 + 7) as u8).collect();
	let src = interlaced_gray_png(9, 9, &raster);

	// Parsing alone must reproduce the raster.
	let decoded = DecodedPng::parse(&src).expect("parse failed");
	assert_eq!(decoded.ihdr.interlace, InterlaceMethod::Adam7);
	assert_eq!(decoded.raster(), raster.as_slice());

	// Optimizing must emit a progressive PNG with the same pixels. (The
	// stored-deflate source is a pushover, so savings are guaranteed.)
	let out = magra_core::optimize(
		&src,
		&settings(
			&[FilterStrategy::SingleFilter, FilterStrategy::ScanlineAdaptive],
			&[DeflateLevel::Default, DeflateLevel::Maximum],
		),
	)
		.expect("optimize failed")
		.expect("no savings over a stored source?");

	assert!(out.len() < src.len());
	let redecoded = DecodedPng::parse(&out).expect("reparse failed");
	assert_eq!(redecoded.ihdr.interlace, InterlaceMethod::None);
	assert_eq!(
		redecoded.to_image_buffer().expect("expand failed").bgra(),
		decoded.to_image_buffer().expect("expand failed").bgra(),
	);
}

#[test]
/// # Determinism.
fn t_determinism() {
	let px: Vec<[u8; 4]> = (0..64_u16)
		.map(|i| [
			(i * 7 % 256) as u8,
			(i * 13 % 256) as u8,
			(i * 29 % 256) as u8,
			255,
		])
		.collect();
	let img = buf(8, 8, &px);
	let stats = img.stats();

	let settings = settings(
		&[FilterStrategy::ScanlineAdaptive, FilterStrategy::PartitionOptimized],
		&[DeflateLevel::Fast, DeflateLevel::Maximum],
	);
	let a = search_raster(&img, &stats, &settings).expect("search failed");
	let b = search_raster(&img, &stats, &settings).expect("search failed");
	assert_eq!(a.bytes, b.bytes);
	assert_eq!(a.combo, b.combo);
}

#[test]
/// # Sixteen-Bit Sources Keep Their Channels.
fn t_sixteen_bit_preserved() {
	// 2×2, grayscale, sixteen bits: values chosen so the high and low
	// bytes differ (a depth reduction would be visible).
	let raster: Vec<u8> = vec![
		0x12, 0x34, 0x56, 0x78,
		0x9A, 0xBC, 0xDE, 0xF0,
	];
	let src = gray16_png_with_text(2, 2, &raster);

	let out = magra_core::optimize(
		&src,
		&settings(&[FilterStrategy::ScanlineAdaptive], &[DeflateLevel::Maximum]),
	).expect("optimize failed");

	// Whether or not it shrank, the surviving bytes must hold the same
	// sixteen-bit raster and the ancillary chunk.
	let survivor = out.unwrap_or(src);
	let decoded = DecodedPng::parse(&survivor).expect("reparse failed");
	assert_eq!(decoded.ihdr.depth, BitDepth::Sixteen);
	assert_eq!(decoded.raster(), raster.as_slice());

	let chunks = chunk::read_all(&survivor).expect("chunk walk failed");
	assert!(chunks.iter().any(|c| c.is(*b"tEXt")));
}



/// # Hand-Rolled Adam7 Grayscale-8 PNG.
///
/// Independent of the library's own pass logic: the geometry table below
/// comes straight from the format documents, every row uses filter `None`,
/// and the zlib frame is plain `flate2`.
fn interlaced_gray_png(width: usize, height: usize, raster: &[u8]) -> Vec<u8> {
	const PASSES: [(usize, usize, usize, usize); 7] = [
		(0, 0, 8, 8), (0, 4, 8, 8), (4, 0, 8, 4), (0, 2, 4, 4),
		(2, 0, 4, 2), (0, 1, 2, 2), (1, 0, 2, 1),
	];

	let mut filtered: Vec<u8> = Vec::new();
	for (row0, col0, rstep, cstep) in PASSES {
		let pw = width.saturating_sub(col0).div_ceil(cstep);
		let ph = height.saturating_sub(row0).div_ceil(rstep);
		if pw == 0 || ph == 0 { continue; }

		for py in 0..ph {
			filtered.push(0); // filter tag
			for px in 0..pw {
				filtered.push(raster[(row0 + py * rstep) * width + col0 + px * cstep]);
			}
		}
	}

	let ihdr = [
		(width as u32).to_be_bytes(), (height as u32).to_be_bytes(),
	].concat().into_iter()
		.chain([8, 0, 0, 0, 1]) // depth 8, gray, zip, filter, adam7
		.collect();

	chunk::write_all(&[
		Chunk::new(*b"IHDR", ihdr),
		Chunk::new(*b"IDAT", zlib_stored(&filtered)),
		Chunk::new(*b"IEND", Vec::new()),
	])
}

/// # Hand-Rolled 16-Bit Grayscale PNG With a tEXt Chunk.
fn gray16_png_with_text(width: usize, height: usize, raster: &[u8]) -> Vec<u8> {
	let stride = width * 2;
	let mut filtered: Vec<u8> = Vec::new();
	for row in raster.chunks_exact(stride) {
		filtered.push(0);
		filtered.extend_from_slice(row);
	}

	let ihdr = [
		(width as u32).to_be_bytes(), (height as u32).to_be_bytes(),
	].concat().into_iter()
		.chain([16, 0, 0, 0, 0])
		.collect();

	chunk::write_all(&[
		Chunk::new(*b"IHDR", ihdr),
		Chunk::new(*b"tEXt", b"Software\0magra test rig".to_vec()),
		Chunk::new(*b"IDAT", zlib_stored(&filtered)),
		Chunk::new(*b"IEND", Vec::new()),
	])
}

/// # Deflate (Stored) for Test Fixtures.
fn zlib_stored(raw: &[u8]) -> Vec<u8> {
	let mut enc = ZlibEncoder::new(Vec::new(), Compression::none());
	enc.write_all(raw).unwrap();
	enc.finish().unwrap()
}
