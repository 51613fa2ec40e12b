use std::num::NonZeroUsize;

use super::{FILTER_SHIFT, FILTER_WEIGHT};

const ROUNDING: i32 = FILTER_WEIGHT / 2;

#[inline(always)]
fn round_clamp(sum: i32) -> i32 {
    ((sum + ROUNDING) >> FILTER_SHIFT).clamp(0, 255)
}

/// Horizontal six-tap pass.
///
/// `src` starts at the top-left of the filter context, two rows above and two columns
/// left of the block. Writes `rows * width` values to `out`, packed with stride `width`.
pub(crate) fn sixtap_first_pass(
    src: &[u8],
    src_stride: NonZeroUsize,
    out: &mut [i32],
    width: usize,
    rows: usize,
    taps: &[i32; 6],
) {
    let src_stride = src_stride.get();
    for (r, out_row) in out.chunks_exact_mut(width).take(rows).enumerate() {
        let src_row = &src[r * src_stride..][..width + 5];
        for (c, out_px) in out_row.iter_mut().enumerate() {
            let sum = src_row[c..c + 6]
                .iter()
                .zip(taps)
                .fold(0, |acc, (&px, &tap)| acc + px as i32 * tap);
            *out_px = round_clamp(sum);
        }
    }
}

/// Vertical six-tap pass over the output of [`sixtap_first_pass`].
///
/// Output row `r` reads intermediate rows `r..r + 6`, so the block's first row lines
/// up with the third intermediate row.
pub(crate) fn sixtap_second_pass(
    src: &[i32],
    dst: &mut [u8],
    dst_stride: NonZeroUsize,
    width: usize,
    height: usize,
    taps: &[i32; 6],
) {
    let dst_stride = dst_stride.get();
    for r in 0..height {
        let dst_row = &mut dst[r * dst_stride..][..width];
        for (c, dst_px) in dst_row.iter_mut().enumerate() {
            let sum = taps
                .iter()
                .enumerate()
                .fold(0, |acc, (k, &tap)| acc + src[(r + k) * width + c] * tap);
            *dst_px = round_clamp(sum) as u8;
        }
    }
}

/// Horizontal bilinear pass. `src` starts at the block origin and the pass reads one
/// column past the block's right edge unless the phase is whole-pixel.
pub(crate) fn bilinear_first_pass(
    src: &[u8],
    src_stride: NonZeroUsize,
    out: &mut [u16],
    width: usize,
    rows: usize,
    taps: &[i32; 2],
) {
    let src_stride = src_stride.get();
    for (r, out_row) in out.chunks_exact_mut(width).take(rows).enumerate() {
        if taps[1] == 0 {
            let src_row = &src[r * src_stride..][..width];
            for (out_px, &px) in out_row.iter_mut().zip(src_row) {
                *out_px = px as u16;
            }
            continue;
        }

        let src_row = &src[r * src_stride..][..width + 1];
        for (c, out_px) in out_row.iter_mut().enumerate() {
            let sum = src_row[c] as i32 * taps[0] + src_row[c + 1] as i32 * taps[1];
            *out_px = ((sum + ROUNDING) >> FILTER_SHIFT) as u16;
        }
    }
}

/// Vertical bilinear pass over the output of [`bilinear_first_pass`].
pub(crate) fn bilinear_second_pass(
    src: &[u16],
    dst: &mut [u8],
    dst_stride: NonZeroUsize,
    width: usize,
    height: usize,
    taps: &[i32; 2],
) {
    let dst_stride = dst_stride.get();
    for r in 0..height {
        let top = &src[r * width..][..width];
        let dst_row = &mut dst[r * dst_stride..][..width];
        if taps[1] == 0 {
            for (dst_px, &px) in dst_row.iter_mut().zip(top) {
                *dst_px = px as u8;
            }
            continue;
        }

        let bottom = &src[(r + 1) * width..][..width];
        for ((dst_px, &a), &b) in dst_row.iter_mut().zip(top).zip(bottom) {
            let sum = a as i32 * taps[0] + b as i32 * taps[1];
            *dst_px = ((sum + ROUNDING) >> FILTER_SHIFT) as u8;
        }
    }
}
