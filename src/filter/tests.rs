#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

use super::*;

const STRIDE: usize = 32;
const BLOCKS: [BlockSize; 4] = [
    BlockSize::B4x4,
    BlockSize::B8x4,
    BlockSize::B8x8,
    BlockSize::B16x16,
];

fn random_plane() -> Vec<u8> {
    let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
    (0..STRIDE * STRIDE).map(|_| rng.random()).collect()
}

fn stride() -> NonZeroUsize {
    NonZeroUsize::new(STRIDE).unwrap()
}

fn filtered(kind: FilterKind, block: BlockSize, plane: &[u8], x_phase: usize, y_phase: usize) -> Vec<u8> {
    let src = BlockView::at_position(plane, stride(), 4, 4).unwrap();
    let mut dst = vec![0u8; block.area()];
    let mut scratch = FilterScratch::new();
    predict(
        kind,
        block,
        src,
        x_phase,
        y_phase,
        &mut dst,
        NonZeroUsize::new(block.width()).unwrap(),
        &mut scratch,
    )
    .unwrap();
    dst
}

fn block_at_origin(plane: &[u8], block: BlockSize) -> Vec<u8> {
    let mut out = Vec::with_capacity(block.area());
    for y in 0..block.height() {
        out.extend_from_slice(&plane[(4 + y) * STRIDE + 4..][..block.width()]);
    }
    out
}

#[test]
fn test_taps_sum_to_weight() {
    for taps in SIXTAP_FILTERS {
        assert_eq!(taps.iter().sum::<i32>(), FILTER_WEIGHT);
    }
    for taps in BILINEAR_FILTERS {
        assert_eq!(taps.iter().sum::<i32>(), FILTER_WEIGHT);
    }
}

#[test]
fn test_sixtap_phase_zero_reproduces_input() {
    let plane = random_plane();
    for block in BLOCKS {
        let out = filtered(FilterKind::SixTap, block, &plane, 0, 0);
        assert_eq!(out, block_at_origin(&plane, block), "failed at {block:?}");
    }
}

#[test]
fn test_bilinear_phase_zero_reproduces_input() {
    let plane = random_plane();
    for block in BLOCKS {
        let out = filtered(FilterKind::Bilinear, block, &plane, 0, 0);
        assert_eq!(out, block_at_origin(&plane, block), "failed at {block:?}");
    }
}

#[test]
fn test_flat_plane_stays_flat() {
    let plane = vec![77u8; STRIDE * STRIDE];
    for kind in [FilterKind::SixTap, FilterKind::Bilinear] {
        for x_phase in 0..8 {
            for y_phase in 0..8 {
                let out = filtered(kind, BlockSize::B8x8, &plane, x_phase, y_phase);
                assert!(out.iter().all(|&px| px == 77), "{kind:?} ({x_phase}, {y_phase})");
            }
        }
    }
}

#[test]
fn test_half_pel_on_ramp_lands_between_samples() {
    // Each row is 10, 12, 14, ... so the half-pixel sample is the odd value between.
    let plane: Vec<u8> = (0..STRIDE * STRIDE)
        .map(|i| (10 + 2 * (i % STRIDE)) as u8)
        .collect();
    for kind in [FilterKind::SixTap, FilterKind::Bilinear] {
        let out = filtered(kind, BlockSize::B4x4, &plane, 4, 0);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(out[y * 4 + x] as usize, 10 + 2 * (4 + x) + 1, "{kind:?}");
            }
        }
    }
}

#[test]
fn test_vertical_half_pel_bilinear_averages_rows() {
    let plane: Vec<u8> = (0..STRIDE * STRIDE)
        .map(|i| (4 * (i / STRIDE)) as u8)
        .collect();
    let out = filtered(FilterKind::Bilinear, BlockSize::B4x4, &plane, 0, 4);
    for y in 0..4 {
        assert!(out[y * 4..][..4].iter().all(|&px| px as usize == 4 * (4 + y) + 2));
    }
}

#[test]
fn test_sixtap_clamps_overshoot() {
    // A hard edge makes the negative taps ring past the pixel range.
    let plane: Vec<u8> = (0..STRIDE * STRIDE)
        .map(|i| if i % STRIDE < 6 { 0 } else { 255 })
        .collect();
    let out = filtered(FilterKind::SixTap, BlockSize::B4x4, &plane, 2, 0);
    assert_eq!(out[0], 0);
    assert_eq!(out[2], 255);
}

#[test]
fn test_size_entry_points_match_generic_predict() {
    let plane = random_plane();
    let src = BlockView::at_position(&plane, stride(), 4, 4).unwrap();
    let mut scratch = FilterScratch::new();

    let mut expected = vec![0u8; 64];
    let mut actual = vec![0u8; 64];
    let dst_stride = NonZeroUsize::new(8).unwrap();

    sixtap_predict(BlockSize::B8x8, src, 3, 5, &mut expected, dst_stride, &mut scratch).unwrap();
    sixtap_predict8x8(src, 3, 5, &mut actual, dst_stride, &mut scratch).unwrap();
    assert_eq!(expected, actual);

    bilinear_predict(BlockSize::B8x8, src, 6, 1, &mut expected, dst_stride, &mut scratch).unwrap();
    bilinear_predict8x8(src, 6, 1, &mut actual, dst_stride, &mut scratch).unwrap();
    assert_eq!(expected, actual);
}

#[test]
fn test_sixtap_without_context_above_fails() {
    let plane = random_plane();
    let top = BlockView::at_position(&plane, stride(), 1, 4).unwrap();
    let mut dst = vec![0u8; 16];
    let mut scratch = FilterScratch::new();
    let dst_stride = NonZeroUsize::new(4).unwrap();

    assert!(sixtap_predict4x4(top, 2, 2, &mut dst, dst_stride, &mut scratch).is_err());
    assert!(bilinear_predict4x4(top, 2, 2, &mut dst, dst_stride, &mut scratch).is_ok());
}

#[test]
fn test_block_variation() {
    // Columns alternate 0/10 and rows alternate 0/3 on top of that.
    let plane: Vec<u8> = (0..STRIDE * STRIDE)
        .map(|i| {
            let col = i % STRIDE;
            let row = i / STRIDE;
            (if col % 2 == 0 { 0 } else { 10 } + if row % 2 == 0 { 0 } else { 3 }) as u8
        })
        .collect();
    let src = BlockView::at_position(&plane, stride(), 0, 0).unwrap();
    let (h_var, v_var) = block_variation(src);
    assert_eq!(h_var, 16 * 10);
    assert_eq!(v_var, 16 * 3);
}

#[test]
fn test_block_variation_flat_is_zero() {
    let plane = vec![5u8; STRIDE * STRIDE];
    let src = BlockView::at_position(&plane, stride(), 3, 3).unwrap();
    assert_eq!(block_variation(src), (0, 0));
}
