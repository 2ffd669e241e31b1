/*!
# Magra Core.

This library is the engine behind the `magra` CLI: a brute-force, lossless
PNG recompressor. Given an existing PNG — or a raw BGRA raster from the
host — it enumerates a space of encoding combinations (color
representation × interlace × filter strategy × deflate level), races them
across a bounded worker pool, and keeps whichever candidate produced the
fewest bytes.

The search is deterministic: same bytes and settings in, same bytes out,
regardless of core count or scheduling.
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::cast_possible_truncation,
	clippy::cast_precision_loss,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod adam7;
mod bytes;
pub mod chunk;
mod decode;
mod encode;
mod error;
mod filter;
mod ihdr;
mod image;
mod search;
mod strategy;
mod zlib;

pub use decode::DecodedPng;
pub use encode::{
	OptimizationCombo,
	OptimizationResult,
};
pub use error::{
	CandidateError,
	MagraError,
};
pub use filter::{
	ALL_FILTERS,
	FilterType,
};
pub use ihdr::{
	BitDepth,
	ColorMode,
	IhdrData,
	InterlaceMethod,
};
pub use image::{
	ImageBuffer,
	ImageStats,
};
pub use search::{
	search_raster,
	Settings,
};
pub use strategy::{
	ALL_STRATEGIES,
	FilterStrategy,
	PartitioningParams,
};
pub use zlib::{
	ALL_LEVELS,
	DeflateLevel,
};



/// # Optimize a PNG!
///
/// Decode `src`, search the combination space, and return the smallest
/// re-encoding — or `None` when nothing beat the original size, in which
/// case the caller should keep the bytes it already has (they're a valid
/// PNG of the same raster, after all).
///
/// Two pipelines hide behind this:
/// * Images that expand losslessly to 8-bit BGRA (depth ≤ 8, no `tRNS`)
///   get the full treatment — color-mode ladder, optional re-interlacing,
///   minimal chunk set out.
/// * Everything else keeps its native representation and ancillary chunks;
///   only the filter strategy and deflate level are searched, and Adam7
///   sources come out non-interlaced.
///
/// ## Errors
///
/// Returns an error if `src` can't be decoded, or if every candidate in
/// the search failed.
pub fn optimize(src: &[u8], settings: &Settings) -> Result<Option<Vec<u8>>, MagraError> {
	let decoded = DecodedPng::parse(src)?;

	let out: Vec<u8> =
		if matches!(decoded.ihdr.depth, BitDepth::Sixteen) || decoded.has_trns() {
			// Representation-preserving pipeline.
			let winner = search::search_raw(decoded.raw(), settings)?;
			let idat = chunk::concat_idat(&chunk::read_all(&winner.bytes)?);
			decoded.rebuild(idat)
		}
		else {
			let img = decoded.to_image_buffer()?;
			let stats = img.stats();
			search_raster(&img, &stats, settings)?.bytes
		};

	if out.len() < src.len() { Ok(Some(out)) }
	else { Ok(None) }
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_optimize_garbage() {
		assert_eq!(
			optimize(b"definitely not a png", &Settings::default()),
			Err(MagraError::BadSignature),
		);
	}
}
