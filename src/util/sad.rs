#[cfg(target_arch = "x86_64")]
mod avx2;
mod rust;


use cfg_if::cfg_if;
use std::num::NonZeroUsize;

/// Computes the sum of absolute differences between two 8-bit blocks.
///
/// The scan may stop early once the running sum exceeds `early_out`. A value above
/// `early_out` is therefore only a lower bound and must not be used except to
/// reject the candidate. Pass `u32::MAX` for an exact sum.
///
/// # Parameters
/// - `width`, `height`: Block dimensions, one of the supported prediction block shapes
/// - `src`, `src_pitch`: Source block and its row stride
/// - `ref_`, `ref_pitch`: Candidate reference block and its row stride
/// - `early_out`: Bound above which the scan may stop
///
/// # Panics
/// If the block size is not one of 16x16, 16x8, 8x16, 8x8, 8x4 or 4x4.
#[must_use]
pub fn get_sad(
    width: NonZeroUsize,
    height: NonZeroUsize,
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
    early_out: u32,
) -> u32 {
    cfg_if! {
        if #[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))] {
            if crate::util::has_avx2() && matches!(width.get(), 8 | 16) {
                // SAFETY: We check for AVX2 first
                return unsafe {
                    avx2::get_sad(width, height, src, src_pitch, ref_, ref_pitch, early_out)
                };
            }
        }
    }

    rust::get_sad(width, height, src, src_pitch, ref_, ref_pitch, early_out)
}

/// Computes exact SADs of one source block against `N` candidate blocks sharing a stride.
///
/// Every result equals what [`get_sad`] returns for the same candidate with an
/// unbounded early-out. The candidates are walked together row by row, so the
/// source rows are read once.
#[must_use]
pub fn get_sad_multi<const N: usize>(
    width: NonZeroUsize,
    height: NonZeroUsize,
    src: &[u8],
    src_pitch: NonZeroUsize,
    refs: [&[u8]; N],
    ref_pitch: NonZeroUsize,
) -> [u32; N] {
    rust::get_sad_multi(width, height, src, src_pitch, refs, ref_pitch)
}
