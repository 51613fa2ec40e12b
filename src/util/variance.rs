#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;

use anyhow::Result;

use crate::{
    filter::{self, FilterScratch},
    params::FilterKind,
    util::BlockView,
};

/// Distortion of a prediction: the sum of squared errors and the variance of the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Variance {
    pub sse: u32,
    pub variance: u32,
}

impl Variance {
    /// Score of a candidate nothing could be computed for.
    pub const MAX: Variance = Variance {
        sse: u32::MAX,
        variance: u32::MAX,
    };
}

/// Computes the error variance between two 8-bit blocks:
/// `sse - sum(diff)^2 / (width * height)`.
#[must_use]
pub fn get_variance(
    width: NonZeroUsize,
    height: NonZeroUsize,
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
) -> Variance {
    let width = width.get();
    let height = height.get();
    let mut sum = 0i64;
    let mut sse = 0u64;
    for y in 0..height {
        let src_row = &src[y * src_pitch.get()..][..width];
        let ref_row = &ref_[y * ref_pitch.get()..][..width];
        for (&s, &r) in src_row.iter().zip(ref_row) {
            let diff = s as i64 - r as i64;
            sum += diff;
            sse += (diff * diff) as u64;
        }
    }

    let mean_sq = (sum * sum) as u64 / (width * height) as u64;
    Variance {
        sse: sse as u32,
        variance: (sse - mean_sq) as u32,
    }
}

/// Interpolates `reference` at eighth-pixel phase (`x_phase`, `y_phase`) and computes
/// the variance of `src` against the result.
///
/// `reference`'s origin is the whole-pixel position of the block; the filter reads its
/// own context around it, and fails if that context starts before the plane.
pub fn get_subpel_variance(
    kind: FilterKind,
    width: NonZeroUsize,
    height: NonZeroUsize,
    reference: BlockView<'_>,
    x_phase: usize,
    y_phase: usize,
    src: &[u8],
    src_pitch: NonZeroUsize,
    scratch: &mut FilterScratch,
) -> Result<Variance> {
    let mut predicted = [0u8; 16 * 16];
    filter::interpolate(
        kind,
        width.get(),
        height.get(),
        reference,
        x_phase,
        y_phase,
        &mut predicted,
        width,
        scratch,
    )?;
    Ok(get_variance(width, height, src, src_pitch, &predicted, width))
}
