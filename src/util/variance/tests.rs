#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

use super::*;

fn nz(v: usize) -> NonZeroUsize {
    NonZeroUsize::new(v).unwrap()
}

#[test]
fn test_identical_blocks_have_no_error() {
    let block = (0..64).map(|i| (i * 3) as u8).collect::<Vec<_>>();
    let v = get_variance(nz(8), nz(8), &block, nz(8), &block, nz(8));
    assert_eq!(v, Variance::default());
}

#[test]
fn test_constant_offset_has_zero_variance() {
    let src = vec![50u8; 256];
    let ref_ = vec![45u8; 256];
    let v = get_variance(nz(16), nz(16), &src, nz(16), &ref_, nz(16));
    assert_eq!(v.sse, 25 * 256);
    assert_eq!(v.variance, 0);
}

#[test]
fn test_known_variance() {
    // Differences alternate +2 and -2 so the mean is zero.
    let src = vec![10u8; 16];
    let ref_ = (0..16).map(|i| if i % 2 == 0 { 8 } else { 12 }).collect::<Vec<u8>>();
    let v = get_variance(nz(4), nz(4), &src, nz(4), &ref_, nz(4));
    assert_eq!(v.sse, 64);
    assert_eq!(v.variance, 64);
}

#[test]
fn test_respects_pitch() {
    let src = vec![9u8; 8 * 4];
    let mut ref_ = vec![200u8; 8 * 4];
    for y in 0..4 {
        ref_[y * 8..y * 8 + 4].fill(9);
    }
    let v = get_variance(nz(4), nz(4), &src, nz(8), &ref_, nz(8));
    assert_eq!(v, Variance::default());
}

#[test]
fn test_subpel_variance_at_whole_pel_matches_plain_variance() {
    let stride = nz(32);
    let plane = (0..32 * 32).map(|i| ((i * 7) % 256) as u8).collect::<Vec<_>>();
    let src = vec![128u8; 64];
    let reference = BlockView::at_position(&plane, stride, 8, 8).unwrap();
    let mut scratch = FilterScratch::new();

    for kind in [FilterKind::SixTap, FilterKind::Bilinear] {
        let subpel = get_subpel_variance(
            kind,
            nz(8),
            nz(8),
            reference,
            0,
            0,
            &src,
            nz(8),
            &mut scratch,
        )
        .unwrap();
        let plain = get_variance(nz(8), nz(8), &src, nz(8), reference.pixels(), stride);
        assert_eq!(subpel, plain, "{kind:?}");
    }
}

#[test]
fn test_subpel_variance_needs_context_inside_plane() {
    let stride = nz(32);
    let plane = vec![128u8; 32 * 32];
    let src = vec![128u8; 64];
    let corner = BlockView::at_position(&plane, stride, 1, 1).unwrap();
    let mut scratch = FilterScratch::new();

    let sixtap = get_subpel_variance(
        FilterKind::SixTap,
        nz(8),
        nz(8),
        corner,
        3,
        3,
        &src,
        nz(8),
        &mut scratch,
    );
    assert!(sixtap.is_err());

    // Bilinear reads nothing above or left of the block.
    let bilinear = get_subpel_variance(
        FilterKind::Bilinear,
        nz(8),
        nz(8),
        corner,
        3,
        3,
        &src,
        nz(8),
        &mut scratch,
    );
    assert_eq!(bilinear.unwrap(), Variance::default());
}

#[quickcheck]
fn variance_never_exceeds_sse(src: Vec<u8>, ref_: Vec<u8>) -> TestResult {
    if src.len() < 16 || ref_.len() < 16 {
        return TestResult::discard();
    }
    let v = get_variance(nz(4), nz(4), &src, nz(4), &ref_, nz(4));
    TestResult::from_bool(v.variance <= v.sse)
}
