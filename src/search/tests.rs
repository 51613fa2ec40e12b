#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

use super::*;
use crate::{
    cost::MvCostTables,
    lattice::SearchLattice,
    oracle::{BatchedOracle, ReferenceOracle},
    params::SiteLayout,
};

const STRIDE: usize = 160;
const ORIGIN: usize = 64;
const BLOCK: usize = 16;

fn nz(v: usize) -> NonZeroUsize {
    NonZeroUsize::new(v).unwrap()
}

struct Fixture {
    reference: Vec<u8>,
    source: Vec<u8>,
    stride: NonZeroUsize,
    origin: usize,
    costs: MvCostTables,
}

impl Fixture {
    fn from_plane(reference: Vec<u8>, stride: usize, origin: usize, shift: MotionVector) -> Self {
        let mut source = vec![0u8; BLOCK * BLOCK];
        let row = (origin as i32 + shift.row) as usize;
        let col = (origin as i32 + shift.col) as usize;
        for y in 0..BLOCK {
            source[y * BLOCK..][..BLOCK]
                .copy_from_slice(&reference[(row + y) * stride + col..][..BLOCK]);
        }
        Fixture {
            reference,
            source,
            stride: nz(stride),
            origin,
            costs: MvCostTables::linear(16, 4),
        }
    }

    fn textured(seed: &[u8; 16], shift: MotionVector) -> Self {
        let mut rng = Xoshiro128StarStar::from_seed(*seed);
        let plane = (0..STRIDE * STRIDE).map(|_| rng.random()).collect();
        Fixture::from_plane(plane, STRIDE, ORIGIN, shift)
    }

    fn smooth(shift: MotionVector) -> Self {
        let plane = (0..STRIDE * STRIDE)
            .map(|i| {
                let r = (i / STRIDE) as f64;
                let c = (i % STRIDE) as f64;
                ((r / 9.0).sin() * 60.0 + (c / 7.0).cos() * 60.0 + 128.0) as u8
            })
            .collect();
        Fixture::from_plane(plane, STRIDE, ORIGIN, shift)
    }

    fn ctx(&self, range: LegalRange) -> SearchContext<'_> {
        SearchContext::new(
            BlockView::new(&self.source, nz(BLOCK), 0).unwrap(),
            BlockView::at_position(&self.reference, self.stride, self.origin, self.origin).unwrap(),
            range,
            &self.costs,
            MotionVector::zero(),
            64,
            64,
        )
    }

    fn lattice(&self, layout: SiteLayout) -> SearchLattice {
        SearchLattice::new(layout, self.stride)
    }
}

fn oracle() -> ReferenceOracle {
    ReferenceOracle::new(BLOCK, BLOCK).unwrap()
}

/// Runs every integer search from `start` (whole pixels).
fn all_searches(fixture: &Fixture, range: LegalRange, start: MotionVector) -> Vec<SearchResult> {
    let ctx = fixture.ctx(range);
    let oracle = oracle();
    let eighth = start.to_eighth_pel();
    let mut results = vec![
        full_search(&ctx, &oracle, start, 64),
        hex_search(&ctx, &oracle, eighth),
        refining_search(&ctx, &oracle, start, 16),
    ];
    for layout in [SiteLayout::Diamond, SiteLayout::ThreeStep] {
        let lattice = fixture.lattice(layout);
        for search_param in [0, 3, 6] {
            results.push(diamond_search(&ctx, &oracle, &lattice, eighth, search_param).result);
        }
    }
    results
}

#[test]
fn test_flat_planes_stay_at_origin() {
    // A 16-pixel-wide plane: column displacements wrap into neighboring rows, which
    // are just as flat.
    let plane = vec![90u8; 16 * 112];
    let fixture = Fixture {
        source: vec![90u8; BLOCK * BLOCK],
        reference: plane,
        stride: nz(16),
        origin: 0,
        costs: MvCostTables::linear(16, 4),
    };
    let ctx = SearchContext::new(
        BlockView::new(&fixture.source, nz(16), 0).unwrap(),
        BlockView::at_position(&fixture.reference, nz(16), 48, 0).unwrap(),
        LegalRange::symmetric(32),
        &fixture.costs,
        MotionVector::zero(),
        64,
        64,
    );
    let oracle = oracle();
    let lattice = fixture.lattice(SiteLayout::Diamond);

    let results = [
        full_search(&ctx, &oracle, MotionVector::zero(), 16),
        full_search_x8(&ctx, &oracle, MotionVector::zero(), 16),
        hex_search(&ctx, &oracle, MotionVector::zero()),
        refining_search(&ctx, &oracle, MotionVector::zero(), 16),
        refining_search_x4(&ctx, &oracle, MotionVector::zero(), 16),
        diamond_search(&ctx, &oracle, &lattice, MotionVector::zero(), 0).result,
        diamond_search_x4(&ctx, &oracle, &lattice, MotionVector::zero(), 0).result,
    ];
    for result in results {
        assert_eq!(result.mv, MotionVector::zero());
        assert_eq!(result.distortion, 0);
        assert_eq!(result.cost, 0);
    }
}

#[test]
fn test_diamond_counts_zero_moves() {
    let fixture = Fixture {
        source: vec![7u8; BLOCK * BLOCK],
        reference: vec![7u8; STRIDE * STRIDE],
        stride: nz(STRIDE),
        origin: ORIGIN,
        costs: MvCostTables::linear(16, 4),
    };
    let ctx = fixture.ctx(LegalRange::symmetric(40));
    let lattice = fixture.lattice(SiteLayout::ThreeStep);
    for search_param in 0..8 {
        let outcome = diamond_search(&ctx, &oracle(), &lattice, MotionVector::zero(), search_param);
        assert_eq!(outcome.num00, 8 - search_param);
    }
}

#[test]
fn test_full_search_recovers_known_shift() {
    for (i, shift) in [
        MotionVector::new(3, -5),
        MotionVector::new(-7, 2),
        MotionVector::new(0, 9),
        MotionVector::new(-12, -12),
    ]
    .into_iter()
    .enumerate()
    {
        let mut seed = *b"deadbeeflolcakes";
        seed[0] = i as u8;
        let fixture = Fixture::textured(&seed, shift);
        let ctx = fixture.ctx(LegalRange::symmetric(32));
        let result = full_search(&ctx, &oracle(), MotionVector::zero(), 16);
        assert_eq!(result.mv, shift);
        assert_eq!(result.distortion, 0);
        assert_eq!(result.sse, 0);
    }
}

#[test]
fn test_local_searches_follow_column_ramp() {
    // Every column step away from the match costs 256 in SAD, while row steps only
    // add vector cost, so each local search can walk straight to the match.
    let plane = (0..STRIDE * STRIDE).map(|i| (i % STRIDE + 40) as u8).collect();
    let shift = MotionVector::new(0, -3);
    let fixture = Fixture::from_plane(plane, STRIDE, ORIGIN, shift);
    let ctx = fixture.ctx(LegalRange::symmetric(32));
    let oracle = oracle();
    let lattice = fixture.lattice(SiteLayout::Diamond);

    assert_eq!(refining_search(&ctx, &oracle, MotionVector::zero(), 16).mv, shift);
    assert_eq!(hex_search(&ctx, &oracle, MotionVector::zero()).mv, shift);
    let diamond = diamond_search(&ctx, &oracle, &lattice, MotionVector::zero(), 5);
    assert_eq!(diamond.result.mv, shift);
    assert_eq!(diamond.result.distortion, 0);
}

#[test]
fn test_results_stay_in_range() {
    let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
    let fixture = Fixture::smooth(MotionVector::new(6, 4));
    let range = LegalRange::new(-20, 12, -9, 25);
    for _ in 0..16 {
        let start = MotionVector::new(rng.random_range(-19..12), rng.random_range(-8..25));
        for result in all_searches(&fixture, range, start) {
            assert!(result.is_feasible());
            assert!(range.contains(result.mv), "{:?} from {start:?}", result.mv);
        }
    }
}

#[test]
fn test_out_of_range_starts_are_clamped() {
    let fixture = Fixture::smooth(MotionVector::zero());
    let range = LegalRange::symmetric(8);
    let ctx = fixture.ctx(range);
    let far = MotionVector::new(30, -30);

    let hex = hex_search(&ctx, &oracle(), far.to_eighth_pel());
    assert!(range.contains(hex.mv));
    let refined = refining_search(&ctx, &oracle(), far, 4);
    assert!(range.contains(refined.mv));
}

#[test]
fn test_diamond_start_on_edge_without_legal_sites_is_infeasible() {
    let fixture = Fixture::smooth(MotionVector::zero());
    let ctx = fixture.ctx(LegalRange::symmetric(4));
    let lattice = fixture.lattice(SiteLayout::Diamond);
    let start = MotionVector::new(4, 4);

    let outcome = diamond_search(&ctx, &oracle(), &lattice, start.to_eighth_pel(), 0);
    assert!(!outcome.result.is_feasible());
    assert_eq!(outcome.result.cost, MAX_COST);
    assert_eq!(outcome.result.mv, start);

    // The full search window still holds legal candidates.
    assert!(full_search(&ctx, &oracle(), start, 4).is_feasible());
}

#[test]
fn test_full_search_scores_no_worse_than_local_searches() {
    let range = LegalRange::symmetric(16);
    // The full search window excludes its maximum row and column, so widen it by one
    // to cover every vector the local searches may reach.
    let mut covering = range;
    covering.row_max += 1;
    covering.col_max += 1;

    for fixture in [
        Fixture::smooth(MotionVector::new(5, -3)),
        Fixture::textured(b"deadbeeflolcakes", MotionVector::new(-9, 11)),
    ] {
        let full = full_search(&fixture.ctx(covering), &oracle(), MotionVector::zero(), 64);
        let ctx = fixture.ctx(range);
        let oracle = oracle();
        let lattice = fixture.lattice(SiteLayout::ThreeStep);
        let locals = [
            hex_search(&ctx, &oracle, MotionVector::new(16, 8)),
            refining_search(&ctx, &oracle, MotionVector::new(-1, 3), 16),
            diamond_search(&ctx, &oracle, &lattice, MotionVector::zero(), 2).result,
        ];
        for local in locals {
            assert!(full.sad_score <= local.sad_score, "{full:?} vs {local:?}");
        }
    }
}

#[test]
fn test_batched_variants_match_scalar() {
    let scalar = oracle();
    let batched = BatchedOracle::new(scalar.clone());
    let range = LegalRange::new(-14, 10, -11, 13);

    for (i, fixture) in [
        Fixture::smooth(MotionVector::new(2, 3)),
        Fixture::textured(b"deadbeeflolcakes", MotionVector::new(-4, 7)),
    ]
    .iter()
    .enumerate()
    {
        let ctx = fixture.ctx(range);
        // Starts near the edges exercise the per-site bounds checks.
        for start in [
            MotionVector::zero(),
            MotionVector::new(-13, 12),
            MotionVector::new(9, -10),
        ] {
            for distance in [3, 7, 16] {
                let expected = full_search(&ctx, &scalar, start, distance);
                for result in [
                    full_search_x3(&ctx, &scalar, start, distance),
                    full_search_x3(&ctx, &batched, start, distance),
                    full_search_x4(&ctx, &batched, start, distance),
                    full_search_x8(&ctx, &batched, start, distance),
                    full_search_x8(&ctx, &scalar, start, distance),
                ] {
                    assert_eq!(result, expected, "fixture {i} start {start:?} distance {distance}");
                }
            }

            for layout in [SiteLayout::Diamond, SiteLayout::ThreeStep] {
                let lattice = fixture.lattice(layout);
                for search_param in [0, 4, 7] {
                    let eighth = start.to_eighth_pel();
                    let expected = diamond_search(&ctx, &scalar, &lattice, eighth, search_param);
                    let actual = diamond_search_x4(&ctx, &batched, &lattice, eighth, search_param);
                    assert_eq!(actual, expected, "fixture {i} {layout:?} start {start:?}");
                }
            }

            assert_eq!(
                refining_search_x4(&ctx, &batched, start, 16),
                refining_search(&ctx, &scalar, start, 16)
            );
        }
    }
}

#[test]
fn test_candidates_outside_plane_are_skipped() {
    let shift = MotionVector::new(-5, 3);
    let fixture = Fixture::textured(b"deadbeeflolcakes", shift);
    // The range reaches far above the top of the plane.
    let range = LegalRange::new(-100, 16, -16, 16);

    for result in all_searches(&fixture, range, shift) {
        assert_eq!(result.mv, shift);
        assert_eq!(result.distortion, 0);
    }

    // A start clamped to a corner above the plane has nothing it could be scored by.
    let ctx = fixture.ctx(range);
    let above = MotionVector::new(-120, 0);
    assert!(!hex_search(&ctx, &oracle(), above.to_eighth_pel()).is_feasible());
    assert!(!refining_search(&ctx, &oracle(), above, 4).is_feasible());
}
