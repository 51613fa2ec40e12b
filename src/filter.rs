mod rust;

#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;

use anyhow::{Context, Result};

use crate::{
    params::{BlockSize, FilterKind},
    util::BlockView,
};

pub(crate) use rust::{
    bilinear_first_pass,
    bilinear_second_pass,
    sixtap_first_pass,
    sixtap_second_pass,
};

/// Fixed-point weight every filter's taps sum to.
pub const FILTER_WEIGHT: i32 = 128;
/// Shift that normalizes a filtered sum back to pixel range.
pub const FILTER_SHIFT: u32 = 7;

/// Six-tap interpolation kernels for each eighth-pixel phase.
///
/// Taps apply to samples at offsets -2..=3 around the target. Phase 0 is the
/// identity, phase 4 is the half-pel kernel, phases 2 and 6 the quarter-pel
/// kernels. Odd phases follow a bicubic with alpha -0.5.
pub const SIXTAP_FILTERS: [[i32; 6]; 8] = [
    [0, 0, 128, 0, 0, 0],
    [0, -6, 123, 12, -1, 0],
    [2, -11, 108, 36, -8, 1],
    [0, -9, 93, 50, -6, 0],
    [3, -16, 77, 77, -16, 3],
    [0, -6, 50, 93, -9, 0],
    [1, -8, 36, 108, -11, 2],
    [0, -1, 12, 123, -6, 0],
];

/// Two-tap interpolation kernels for each eighth-pixel phase.
pub const BILINEAR_FILTERS: [[i32; 2]; 8] = [
    [128, 0],
    [112, 16],
    [96, 32],
    [80, 48],
    [64, 64],
    [48, 80],
    [32, 96],
    [16, 112],
];

/// Rows of horizontal context the six-tap filter needs above and below a block, beyond
/// the block itself: two above and three below.
pub const SIXTAP_EXTRA_ROWS: usize = 5;

const MAX_WIDTH: usize = 16;
const MAX_HEIGHT: usize = 16;
const SIXTAP_SCRATCH_LEN: usize = MAX_WIDTH * (MAX_HEIGHT + SIXTAP_EXTRA_ROWS);
const BILINEAR_SCRATCH_LEN: usize = MAX_WIDTH * (MAX_HEIGHT + 1);

/// Intermediate buffers for the two-pass filters, sized once for a 16x16 block.
///
/// Each caller owns its own scratch, so blocks may be filtered in parallel.
#[derive(Debug, Clone)]
pub struct FilterScratch {
    pub(crate) sixtap: [i32; SIXTAP_SCRATCH_LEN],
    pub(crate) bilinear: [u16; BILINEAR_SCRATCH_LEN],
}

impl FilterScratch {
    #[must_use]
    pub fn new() -> Self {
        FilterScratch {
            sixtap: [0; SIXTAP_SCRATCH_LEN],
            bilinear: [0; BILINEAR_SCRATCH_LEN],
        }
    }
}

impl Default for FilterScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces the predicted block at eighth-pixel phase (`x_phase`, `y_phase`) from the
/// reference block whose whole-pixel position is `src`'s origin.
///
/// The six-tap filter reads two rows and columns before the origin and three after
/// the block, so `src` must have that much context inside its plane.
///
/// # Parameters
/// - `kind`: Interpolation kernel family
/// - `block`: Shape of the predicted block
/// - `src`: Reference view positioned at the block's whole-pixel origin
/// - `x_phase`, `y_phase`: Eighth-pixel phases, 0-7
/// - `dst`, `dst_stride`: Output block and its row stride
/// - `scratch`: Reusable intermediate buffer
///
/// # Errors
/// If the six-tap context above or left of `src` lies outside its plane.
///
/// # Panics
/// If either phase is above 7.
pub fn predict(
    kind: FilterKind,
    block: BlockSize,
    src: BlockView<'_>,
    x_phase: usize,
    y_phase: usize,
    dst: &mut [u8],
    dst_stride: NonZeroUsize,
    scratch: &mut FilterScratch,
) -> Result<()> {
    interpolate(
        kind,
        block.width(),
        block.height(),
        src,
        x_phase,
        y_phase,
        dst,
        dst_stride,
        scratch,
    )
}

/// Two-pass six-tap interpolation of one block.
///
/// The horizontal pass filters `height + 5` rows, starting two rows above the block,
/// into a 32-bit intermediate buffer. The vertical pass then filters that buffer
/// starting at its third row. Both passes round with `+64 >> 7` and clamp to 0..=255.
pub fn sixtap_predict(
    block: BlockSize,
    src: BlockView<'_>,
    x_phase: usize,
    y_phase: usize,
    dst: &mut [u8],
    dst_stride: NonZeroUsize,
    scratch: &mut FilterScratch,
) -> Result<()> {
    predict(
        FilterKind::SixTap,
        block,
        src,
        x_phase,
        y_phase,
        dst,
        dst_stride,
        scratch,
    )
}

/// Two-pass bilinear interpolation of one block.
///
/// The horizontal pass covers `height + 1` rows so the vertical pass has a row below
/// the block to blend with.
pub fn bilinear_predict(
    block: BlockSize,
    src: BlockView<'_>,
    x_phase: usize,
    y_phase: usize,
    dst: &mut [u8],
    dst_stride: NonZeroUsize,
    scratch: &mut FilterScratch,
) -> Result<()> {
    predict(
        FilterKind::Bilinear,
        block,
        src,
        x_phase,
        y_phase,
        dst,
        dst_stride,
        scratch,
    )
}

/// Number of intermediate rows the first pass of `kind` produces for a block of `height`.
#[must_use]
pub(crate) fn first_pass_rows(kind: FilterKind, height: usize, y_phase: usize) -> usize {
    match kind {
        FilterKind::SixTap => height + SIXTAP_EXTRA_ROWS,
        FilterKind::Bilinear if BILINEAR_FILTERS[y_phase][1] == 0 => height,
        FilterKind::Bilinear => height + 1,
    }
}

/// Interpolates any block up to 16x16, such as the 16x8 and 8x16 partitions the
/// variance metrics work on.
pub(crate) fn interpolate(
    kind: FilterKind,
    width: usize,
    height: usize,
    src: BlockView<'_>,
    x_phase: usize,
    y_phase: usize,
    dst: &mut [u8],
    dst_stride: NonZeroUsize,
    scratch: &mut FilterScratch,
) -> Result<()> {
    debug_assert!(width <= MAX_WIDTH && height <= MAX_HEIGHT);
    let rows = first_pass_rows(kind, height, y_phase);

    match kind {
        FilterKind::SixTap => {
            let buf = &mut scratch.sixtap[..rows * width];
            let context = src
                .window(-2, -2)
                .context("six-tap context starts before the reference plane")?;
            sixtap_first_pass(
                context,
                src.stride(),
                buf,
                width,
                rows,
                &SIXTAP_FILTERS[x_phase],
            );
            sixtap_second_pass(buf, dst, dst_stride, width, height, &SIXTAP_FILTERS[y_phase]);
        }
        FilterKind::Bilinear => {
            let buf = &mut scratch.bilinear[..rows * width];
            bilinear_first_pass(
                src.pixels(),
                src.stride(),
                buf,
                width,
                rows,
                &BILINEAR_FILTERS[x_phase],
            );
            bilinear_second_pass(
                buf,
                dst,
                dst_stride,
                width,
                height,
                &BILINEAR_FILTERS[y_phase],
            );
        }
    }
    Ok(())
}

macro_rules! block_entry_points {
    ($($sixtap:ident, $bilinear:ident => $block:expr;)*) => {
        $(
            pub fn $sixtap(
                src: BlockView<'_>,
                x_phase: usize,
                y_phase: usize,
                dst: &mut [u8],
                dst_stride: NonZeroUsize,
                scratch: &mut FilterScratch,
            ) -> Result<()> {
                sixtap_predict($block, src, x_phase, y_phase, dst, dst_stride, scratch)
            }

            pub fn $bilinear(
                src: BlockView<'_>,
                x_phase: usize,
                y_phase: usize,
                dst: &mut [u8],
                dst_stride: NonZeroUsize,
                scratch: &mut FilterScratch,
            ) -> Result<()> {
                bilinear_predict($block, src, x_phase, y_phase, dst, dst_stride, scratch)
            }
        )*
    };
}

block_entry_points! {
    sixtap_predict4x4, bilinear_predict4x4 => BlockSize::B4x4;
    sixtap_predict8x4, bilinear_predict8x4 => BlockSize::B8x4;
    sixtap_predict8x8, bilinear_predict8x8 => BlockSize::B8x8;
    sixtap_predict16x16, bilinear_predict16x16 => BlockSize::B16x16;
}

/// Sums of absolute horizontal and vertical neighbor differences over the 4x4 block
/// at `src`'s origin, as `(horizontal, vertical)`.
///
/// Reads one column right of and one row below the block.
#[must_use]
pub fn block_variation(src: BlockView<'_>) -> (u32, u32) {
    let mut h_var = 0;
    let mut v_var = 0;
    for y in 0..4 {
        let row = src.row(y, 5);
        let below = src.row(y + 1, 4);
        for x in 0..4 {
            h_var += row[x].abs_diff(row[x + 1]) as u32;
            v_var += row[x].abs_diff(below[x]) as u32;
        }
    }
    (h_var, v_var)
}
