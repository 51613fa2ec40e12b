use super::{SearchContext, SearchResult};
use crate::{mv::MotionVector, oracle::VarianceOracle};

const NEIGHBORS: [MotionVector; 4] = [
    MotionVector::new(-1, 0),
    MotionVector::new(0, -1),
    MotionVector::new(0, 1),
    MotionVector::new(1, 0),
];

/// One-pixel hill climb from the whole-pixel vector `start`, for at most
/// `search_range` moves.
///
/// The start is clamped into the legal range and always evaluated. Neighbors are
/// only evaluated strictly inside the range.
pub fn refining_search<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    start: MotionVector,
    search_range: usize,
) -> SearchResult {
    climb(ctx, oracle, start, search_range, |best, best_sad| {
        scan_neighbors(ctx, oracle, best, best_sad)
    })
}

/// [`refining_search`] computing all four neighbors at once whenever they all lie
/// strictly inside the legal range.
pub fn refining_search_x4<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    start: MotionVector,
    search_range: usize,
) -> SearchResult {
    climb(ctx, oracle, start, search_range, |best, best_sad| {
        let range = &ctx.range;
        let all_in = best.row - 1 > range.row_min
            && best.row + 1 < range.row_max
            && best.col - 1 > range.col_min
            && best.col + 1 < range.col_max;
        if !all_in {
            return scan_neighbors(ctx, oracle, best, best_sad);
        }

        let Some(views) = ctx.candidates(NEIGHBORS.map(|delta| best + delta)) else {
            return scan_neighbors(ctx, oracle, best, best_sad);
        };
        let sads = oracle.sad_x4(ctx.src, views);
        let mut best_site = None;
        for (j, sad) in sads.into_iter().enumerate() {
            if let Some(score) = ctx.improves(sad, best + NEIGHBORS[j], *best_sad) {
                *best_sad = score;
                best_site = Some(j);
            }
        }
        best_site
    })
}

fn climb<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    start: MotionVector,
    search_range: usize,
    mut step: impl FnMut(MotionVector, &mut u32) -> Option<usize>,
) -> SearchResult {
    let mut best = ctx.range.clamp(start);
    let mut best_sad = ctx.score_start(oracle, best);

    for _ in 0..search_range {
        let Some(site) = step(best, &mut best_sad) else {
            break;
        };
        best = best + NEIGHBORS[site];
    }

    ctx.conclude(oracle, best, best_sad)
}

fn scan_neighbors<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    best: MotionVector,
    best_sad: &mut u32,
) -> Option<usize> {
    let mut best_site = None;
    for (j, &delta) in NEIGHBORS.iter().enumerate() {
        let mv = best + delta;
        if !ctx.range.contains_strict(mv) {
            continue;
        }
        let sad = ctx.sad_at(oracle, mv, *best_sad);
        if let Some(score) = ctx.improves(sad, mv, *best_sad) {
            *best_sad = score;
            best_site = Some(j);
        }
    }
    best_site
}
