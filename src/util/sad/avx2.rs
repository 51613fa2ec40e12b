#![allow(clippy::undocumented_unsafe_blocks)]

use std::{arch::x86_64::*, num::NonZeroUsize};

#[target_feature(enable = "avx2")]
pub(super) fn get_sad(
    width: NonZeroUsize,
    height: NonZeroUsize,
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
    early_out: u32,
) -> u32 {
    match width.get() {
        16 => get_sad_16(height.get(), src, src_pitch.get(), ref_, ref_pitch.get()),
        8 => get_sad_8(height.get(), src, src_pitch.get(), ref_, ref_pitch.get()),
        _ => super::rust::get_sad(width, height, src, src_pitch, ref_, ref_pitch, early_out),
    }
}

/// Adds the four 64-bit lanes of `acc`.
#[target_feature(enable = "avx2")]
#[allow(unused_unsafe)]
fn hsum_epi64(acc: __m256i) -> u32 {
    unsafe {
        let sum = _mm_add_epi64(
            _mm256_castsi256_si128(acc),
            _mm256_extracti128_si256::<1>(acc),
        );
        _mm_cvtsi128_si64(_mm_add_epi64(sum, _mm_unpackhi_epi64(sum, sum))) as u32
    }
}

/// Two rows per 256-bit SAD.
#[target_feature(enable = "avx2")]
#[allow(unused_unsafe)]
fn get_sad_16(height: usize, src: &[u8], src_pitch: usize, ref_: &[u8], ref_pitch: usize) -> u32 {
    let row = |buf: &[u8], pitch: usize, y: usize| unsafe {
        _mm_loadu_si128(buf[y * pitch..][..16].as_ptr() as *const __m128i)
    };

    unsafe {
        let mut acc = _mm256_setzero_si256();
        let mut y = 0;
        while y + 2 <= height {
            let sv = _mm256_set_m128i(row(src, src_pitch, y + 1), row(src, src_pitch, y));
            let rv = _mm256_set_m128i(row(ref_, ref_pitch, y + 1), row(ref_, ref_pitch, y));
            acc = _mm256_add_epi64(acc, _mm256_sad_epu8(sv, rv));
            y += 2;
        }
        if y < height {
            let tail = _mm_sad_epu8(row(src, src_pitch, y), row(ref_, ref_pitch, y));
            acc = _mm256_add_epi64(acc, _mm256_zextsi128_si256(tail));
        }
        hsum_epi64(acc)
    }
}

/// Four rows per 256-bit SAD, one in each 64-bit lane.
#[target_feature(enable = "avx2")]
#[allow(unused_unsafe)]
fn get_sad_8(height: usize, src: &[u8], src_pitch: usize, ref_: &[u8], ref_pitch: usize) -> u32 {
    let row = |buf: &[u8], pitch: usize, y: usize| unsafe {
        _mm_loadl_epi64(buf[y * pitch..][..8].as_ptr() as *const __m128i)
    };
    let pair = |buf: &[u8], pitch: usize, y: usize| unsafe {
        _mm_unpacklo_epi64(row(buf, pitch, y), row(buf, pitch, y + 1))
    };

    unsafe {
        let mut acc = _mm256_setzero_si256();
        let mut y = 0;
        while y + 4 <= height {
            let sv = _mm256_set_m128i(pair(src, src_pitch, y + 2), pair(src, src_pitch, y));
            let rv = _mm256_set_m128i(pair(ref_, ref_pitch, y + 2), pair(ref_, ref_pitch, y));
            acc = _mm256_add_epi64(acc, _mm256_sad_epu8(sv, rv));
            y += 4;
        }
        while y < height {
            let tail = _mm_sad_epu8(row(src, src_pitch, y), row(ref_, ref_pitch, y));
            acc = _mm256_add_epi64(acc, _mm256_zextsi128_si256(tail));
            y += 1;
        }
        hsum_epi64(acc)
    }
}
