use super::{SearchContext, SearchResult};
use crate::{mv::MotionVector, oracle::VarianceOracle};

const HEX: [MotionVector; 6] = [
    MotionVector::new(-1, -2),
    MotionVector::new(1, -2),
    MotionVector::new(2, 0),
    MotionVector::new(1, 2),
    MotionVector::new(-1, 2),
    MotionVector::new(-2, 0),
];

/// After moving to hexagon point `k`, the three points of the hexagon around the new
/// center that were not already covered by the previous one.
const NEXT_CHECKPOINTS: [[MotionVector; 3]; 6] = [
    [HEX[5], HEX[0], HEX[1]],
    [HEX[0], HEX[1], HEX[2]],
    [HEX[1], HEX[2], HEX[3]],
    [HEX[2], HEX[3], HEX[4]],
    [HEX[3], HEX[4], HEX[5]],
    [HEX[4], HEX[5], HEX[0]],
];

const NEIGHBORS: [MotionVector; 4] = [
    MotionVector::new(0, -1),
    MotionVector::new(-1, 0),
    MotionVector::new(1, 0),
    MotionVector::new(0, 1),
];

const MAX_HEX_STEPS: usize = 127;
const MAX_NEIGHBOR_STEPS: usize = 32;

/// Hexagon pattern search from `ref_mv` (eighth pixels), finished by a one-pixel
/// cross refinement.
///
/// The start is clamped into the legal range and always evaluated. Candidates on
/// the range's edges are allowed. Each move keeps the hexagon's direction, so only
/// the three points not already checked are evaluated after the first step.
pub fn hex_search<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    ref_mv: MotionVector,
) -> SearchResult {
    let mut best = ctx.range.clamp(ref_mv.to_full_pel());
    let mut best_sad = ctx.score_start(oracle, best);

    if let Some(first) = check_pattern(ctx, oracle, best, &HEX, 2, &mut best_sad) {
        best = best + HEX[first];
        let mut k = first;
        for _ in 1..MAX_HEX_STEPS {
            let pattern = &NEXT_CHECKPOINTS[k];
            let Some(site) = check_pattern(ctx, oracle, best, pattern, 2, &mut best_sad) else {
                break;
            };
            best = best + pattern[site];
            k = (k + 5 + site) % 6;
        }
    }

    for _ in 0..MAX_NEIGHBOR_STEPS {
        let Some(site) = check_pattern(ctx, oracle, best, &NEIGHBORS, 1, &mut best_sad) else {
            break;
        };
        best = best + NEIGHBORS[site];
    }

    ctx.conclude(oracle, best, best_sad)
}

/// Evaluates `center + delta` for each delta of `pattern` and returns the index of
/// the best improvement, if any.
///
/// When the square of `reach` around `center` lies inside the legal range every
/// point is evaluated, otherwise points outside the range are skipped.
fn check_pattern<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    center: MotionVector,
    pattern: &[MotionVector],
    reach: i32,
    best_sad: &mut u32,
) -> Option<usize> {
    let all_in = ctx.range.contains_square(center, reach);
    let mut best_site = None;
    for (i, &delta) in pattern.iter().enumerate() {
        let mv = center + delta;
        if !all_in && !ctx.range.contains(mv) {
            continue;
        }
        let sad = ctx.sad_at(oracle, mv, *best_sad);
        if let Some(score) = ctx.improves(sad, mv, *best_sad) {
            *best_sad = score;
            best_site = Some(i);
        }
    }
    best_site
}
