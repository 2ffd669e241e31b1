/*!
# Magra: Filter Strategies.

Choosing *which* filter each scanline gets is where the interesting money
is. Four strategies ship, from "one filter fits all" to a cost-matrix walk
with look-ahead and hysteresis; the search driver races them against each
other and keeps whatever deflates smallest.
*/

use crate::{
	filter::{
		self,
		ALL_FILTERS,
	},
	FilterType,
};



#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// # Filter Strategy.
pub enum FilterStrategy {
	/// # One Filter, Whole Image.
	SingleFilter,

	/// # Cheapest Filter Per Row.
	ScanlineAdaptive,

	/// # Cheapest Per Row, Sticky.
	///
	/// Same as adaptive, but the previously-chosen filter gets a 10%
	/// discount so the plan doesn't flap between near-equal options.
	WeightedContinuity,

	/// # Cost-Matrix Partitioning.
	///
	/// Switches filters only where several upcoming rows agree the switch
	/// pays for itself.
	PartitionOptimized,
}

/// # All Strategies, Enumeration Order.
pub const ALL_STRATEGIES: [FilterStrategy; 4] = [
	FilterStrategy::SingleFilter,
	FilterStrategy::ScanlineAdaptive,
	FilterStrategy::WeightedContinuity,
	FilterStrategy::PartitionOptimized,
];

impl FilterStrategy {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::SingleFilter => "SingleFilter",
			Self::ScanlineAdaptive => "ScanlineAdaptive",
			Self::WeightedContinuity => "WeightedContinuity",
			Self::PartitionOptimized => "PartitionOptimized",
		}
	}

	#[must_use]
	/// # From Str (Case-Insensitive).
	pub fn from_str_loose(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"singlefilter" | "single" => Some(Self::SingleFilter),
			"scanlineadaptive" | "adaptive" => Some(Self::ScanlineAdaptive),
			"weightedcontinuity" | "weighted" => Some(Self::WeightedContinuity),
			"partitionoptimized" | "partition" => Some(Self::PartitionOptimized),
			_ => None,
		}
	}
}



#[derive(Debug, Copy, Clone)]
/// # Partition Tuning.
///
/// A switch goes through when at least `min_rows_strong` of the next
/// `min_rows_minor` rows clear `strong_threshold`, or all of them clear
/// `minor_threshold`.
pub struct PartitioningParams {
	/// # Look-Ahead Window (Rows).
	pub min_rows_minor: usize,

	/// # Strong Votes Needed.
	pub min_rows_strong: usize,

	/// # Minor Improvement Ratio.
	pub minor_threshold: f64,

	/// # Strong Improvement Ratio.
	pub strong_threshold: f64,
}

impl Default for PartitioningParams {
	fn default() -> Self {
		Self {
			min_rows_minor: 5,
			min_rows_strong: 2,
			minor_threshold: 1.10,
			strong_threshold: 1.30,
		}
	}
}



/// # Continuity Discount.
const CONTINUITY_WEIGHT: f64 = 0.9;

/// # Filter a Sub-Image.
///
/// Runs `strategy` over the rows of `pixels` (an unfiltered raster of
/// `stride`-byte scanlines — the whole image, or one Adam7 pass), appending
/// each row's one-byte tag plus filtered payload to `out` and its chosen
/// filter to `filters`. The previous-row chain starts empty, so passes
/// stay independent.
///
/// `force_none` is the policy override for palette and sub-byte grayscale
/// images; it wins over everything.
pub(crate) fn filter_rows(
	pixels: &[u8],
	stride: usize,
	bpp: usize,
	force_none: bool,
	strategy: FilterStrategy,
	out: &mut Vec<u8>,
	filters: &mut Vec<FilterType>,
) {
	let height = pixels.len() / stride;
	debug_assert_eq!(height * stride, pixels.len(), "BUG: ragged raster");

	// Policy first: indexed and sub-byte gray rows are never filtered.
	let plan: Vec<FilterType> =
		if force_none { vec![FilterType::None; height] }
		else {
			match strategy {
				FilterStrategy::SingleFilter => {
					let totals = cost_matrix(pixels, stride, bpp).into_iter()
						.fold([0_u64; 5], |mut acc, row| {
							for (t, c) in acc.iter_mut().zip(row) { *t = t.saturating_add(c); }
							acc
						});
					vec![argmin(&totals); height]
				},
				FilterStrategy::ScanlineAdaptive => cost_matrix(pixels, stride, bpp)
					.iter()
					.map(|row| argmin(row))
					.collect(),
				FilterStrategy::WeightedContinuity => {
					let mut last = FilterType::None;
					cost_matrix(pixels, stride, bpp).iter()
						.map(|row| {
							last = argmin_weighted(row, last);
							last
						})
						.collect()
				},
				FilterStrategy::PartitionOptimized => partition_plan(
					&cost_matrix(pixels, stride, bpp),
					&PartitioningParams::default(),
				),
			}
		};

	// Apply the plan.
	let mut scratch = vec![0_u8; stride];
	let mut prev: &[u8] = &[];
	for (cur, tag) in pixels.chunks_exact(stride).zip(&plan) {
		filter::apply(*tag, cur, prev, bpp, &mut scratch);
		out.push(tag.get());
		out.extend_from_slice(&scratch);
		prev = cur;
	}

	filters.extend_from_slice(&plan);
}

/// # Per-Row, Per-Filter Costs.
///
/// Scores every row under all five filters in one sweep. The matrix is the
/// raw material for every strategy, so it's computed once and shared.
fn cost_matrix(pixels: &[u8], stride: usize, bpp: usize) -> Vec<[u64; 5]> {
	let mut out: Vec<[u64; 5]> = Vec::with_capacity(pixels.len() / stride);
	let mut scratch = vec![0_u8; stride];
	let mut prev: &[u8] = &[];

	for cur in pixels.chunks_exact(stride) {
		let mut row = [0_u64; 5];
		for (slot, tag) in row.iter_mut().zip(ALL_FILTERS) {
			filter::apply(tag, cur, prev, bpp, &mut scratch);
			*slot = filter::volatility(&scratch);
		}
		out.push(row);
		prev = cur;
	}

	out
}

/// # Cheapest Filter.
///
/// Strict comparison keeps the earliest (lowest-tag) filter on ties.
fn argmin(costs: &[u64; 5]) -> FilterType {
	let mut best = 0;
	for (i, &c) in costs.iter().enumerate().skip(1) {
		if c < costs[best] { best = i; }
	}
	ALL_FILTERS[best]
}

/// # Cheapest Filter, With Incumbent Discount.
fn argmin_weighted(costs: &[u64; 5], last: FilterType) -> FilterType {
	let mut best = 0;
	let mut best_cost = f64::INFINITY;
	for (i, (&c, tag)) in costs.iter().zip(ALL_FILTERS).enumerate() {
		let mut c = c as f64;
		if tag == last { c *= CONTINUITY_WEIGHT; }
		if c < best_cost {
			best_cost = c;
			best = i;
		}
	}
	ALL_FILTERS[best]
}

/// # Partitioned Plan.
///
/// Walk the rows with a current filter (initially `None`), switching to a
/// row's cheapest filter only when the look-ahead window shows sustained
/// improvement: deflate pays for every filter transition, so flapping
/// between near-equals costs more than it saves.
fn partition_plan(scores: &[[u64; 5]], params: &PartitioningParams) -> Vec<FilterType> {
	let height = scores.len();
	let mut out: Vec<FilterType> = Vec::with_capacity(height);
	let mut current = FilterType::None;

	for y in 0..height {
		// No more changes near the tail.
		if y + params.min_rows_minor > height {
			out.push(current);
			continue;
		}

		let best = argmin(&scores[y]);
		if best != current {
			let mut strong = 0_usize;
			let mut minor = 0_usize;
			for k in 0..params.min_rows_minor {
				let Some(row) = scores.get(y + k) else { break; };
				let ratio = row[current as usize] as f64 / row[best as usize] as f64;
				if ratio >= params.strong_threshold { strong += 1; }
				if ratio >= params.minor_threshold { minor += 1; }
			}

			if strong >= params.min_rows_strong || minor >= params.min_rows_minor {
				current = best;
			}
		}

		out.push(current);
	}

	out
}
