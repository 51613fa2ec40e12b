
use crate::{
    mv::{LegalRange, MotionVector},
    oracle::{Variance, VarianceOracle},
    params::{MAX_COST, MAX_FULL_PEL_VAL, MV_LONG_WIDTH},
    search::{SearchContext, SearchResult},
};

const HALF_PEL: i32 = 4;
const QUARTER_PEL: i32 = 2;
const HALF_PEL_ITERATIONS: usize = 4;
const QUARTER_PEL_ITERATIONS: usize = 4;

/// Raises the whole-pixel winner `best_mv` of an integer search to half-pixel
/// precision, checking its four half-pixel neighbors and all four half-pixel
/// diagonals.
///
/// The result's vector is in eighth pixels. Candidates lie within one pixel of
/// `best_mv`, so the reference plane must carry that much border plus the filter's
/// context beyond the legal range.
pub fn find_best_half_pixel_step<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    best_mv: MotionVector,
) -> SearchResult {
    let Some(mut refine) = Refinement::start(ctx, oracle, best_mv, None) else {
        return SearchResult::infeasible(best_mv.to_eighth_pel());
    };

    let start = refine.best;
    refine.check_cross(start, HALF_PEL);
    for (dr, dc) in [(-1, -1), (-1, 1), (1, -1), (1, 1)] {
        refine.check(start + MotionVector::new(dr * HALF_PEL, dc * HALF_PEL));
    }
    refine.finish()
}

/// Raises the whole-pixel winner `best_mv` of an integer search to quarter-pixel
/// precision in two fixed stages.
///
/// Each stage checks the four neighbors at its step and the one diagonal between
/// the better horizontal and the better vertical neighbor. The quarter-pixel stage
/// is centered on the half-pixel winner.
pub fn find_best_sub_pixel_step<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    best_mv: MotionVector,
) -> SearchResult {
    let Some(mut refine) = Refinement::start(ctx, oracle, best_mv, None) else {
        return SearchResult::infeasible(best_mv.to_eighth_pel());
    };

    refine.stage(refine.best, HALF_PEL);
    refine.stage(refine.best, QUARTER_PEL);
    refine.finish()
}

/// Raises the whole-pixel winner `best_mv` of an integer search to quarter-pixel
/// precision by hill climbing, first in half-pixel then in quarter-pixel steps.
///
/// Unlike the fixed-stage refiners every candidate is checked against the legal
/// range and against the longest codable vector component, and one that falls
/// outside either scores [`MAX_COST`].
pub fn find_best_sub_pixel_step_iteratively<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    best_mv: MotionVector,
) -> SearchResult {
    let bounds = codable_bounds(ctx.range, ctx.center_mv);
    let Some(mut refine) = Refinement::start(ctx, oracle, best_mv, Some(bounds)) else {
        return SearchResult::infeasible(best_mv.to_eighth_pel());
    };

    for (step, iterations) in [
        (HALF_PEL, HALF_PEL_ITERATIONS),
        (QUARTER_PEL, QUARTER_PEL_ITERATIONS),
    ] {
        for _ in 0..iterations {
            let center = refine.best;
            refine.stage(center, step);
            if refine.best == center {
                break;
            }
        }
    }

    if !is_codable(refine.best, ctx.center_mv) {
        return SearchResult::infeasible(refine.best);
    }
    refine.finish()
}

/// Eighth-pixel vectors the iterative refiner may visit: the legal range, further
/// limited to components the long vector code can express relative to `center_mv`.
fn codable_bounds(range: LegalRange, center_mv: MotionVector) -> LegalRange {
    // The long code works in quarter pixels, so each limit is rounded down to one.
    let reach = (1 << MV_LONG_WIDTH) - 1;
    let row = center_mv.row >> 1;
    let col = center_mv.col >> 1;
    let quarter = LegalRange::new(
        (range.row_min << 2).max(row - reach),
        (range.row_max << 2).min(row + reach),
        (range.col_min << 2).max(col - reach),
        (range.col_max << 2).min(col + reach),
    );
    LegalRange::new(
        quarter.row_min << 1,
        quarter.row_max << 1,
        quarter.col_min << 1,
        quarter.col_max << 1,
    )
}

fn is_codable(mv: MotionVector, center_mv: MotionVector) -> bool {
    (mv.row - center_mv.row).abs() <= MAX_FULL_PEL_VAL
        && (mv.col - center_mv.col).abs() <= MAX_FULL_PEL_VAL
}

/// The best eighth-pixel candidate found so far, with the distortion it was scored by.
struct Refinement<'c, 'a, O: ?Sized> {
    ctx: &'c SearchContext<'a>,
    oracle: &'c O,
    bounds: Option<LegalRange>,
    best: MotionVector,
    cost: u32,
    distortion: Variance,
}

impl<'c, 'a, O: VarianceOracle + ?Sized> Refinement<'c, 'a, O> {
    /// Scores the unrefined whole-pixel start, or returns `None` without evaluating
    /// anything if no vector near it could be coded or it points outside the plane.
    fn start(
        ctx: &'c SearchContext<'a>,
        oracle: &'c O,
        best_mv: MotionVector,
        bounds: Option<LegalRange>,
    ) -> Option<Self> {
        let best = best_mv.to_eighth_pel();
        if !is_codable(best, ctx.center_mv) {
            return None;
        }

        let distortion = oracle.variance(ctx.src, ctx.candidate(best_mv)?);
        Some(Refinement {
            ctx,
            oracle,
            bounds,
            best,
            cost: distortion.variance.saturating_add(ctx.err_cost(best)),
            distortion,
        })
    }

    /// Scores the eighth-pixel candidate `mv`, keeping it if it is strictly better.
    fn check(&mut self, mv: MotionVector) -> u32 {
        if self.bounds.is_some_and(|bounds| !bounds.contains(mv)) {
            return MAX_COST;
        }

        let Some(reference) = self.ctx.candidate(mv.to_full_pel()) else {
            return MAX_COST;
        };
        let src = self.ctx.src;
        let v = match ((mv.col & 7) as usize, (mv.row & 7) as usize) {
            (4, 0) => self.oracle.half_pixel_variance_h(reference, src),
            (0, 4) => self.oracle.half_pixel_variance_v(reference, src),
            (4, 4) => self.oracle.half_pixel_variance_hv(reference, src),
            (x, y) => self.oracle.subpel_variance(reference, x, y, src),
        };

        let score = v.variance.saturating_add(self.ctx.err_cost(mv));
        if score < self.cost {
            self.best = mv;
            self.cost = score;
            self.distortion = v;
        }
        score
    }

    /// Checks the left, right, up and down neighbors of `center` at `step` and
    /// returns their scores in that order.
    fn check_cross(&mut self, center: MotionVector, step: i32) -> [u32; 4] {
        [
            self.check(center + MotionVector::new(0, -step)),
            self.check(center + MotionVector::new(0, step)),
            self.check(center + MotionVector::new(-step, 0)),
            self.check(center + MotionVector::new(step, 0)),
        ]
    }

    /// Checks the cross around `center`, then the diagonal the cross points to.
    fn stage(&mut self, center: MotionVector, step: i32) {
        let [left, right, up, down] = self.check_cross(center, step);
        let dc = if left < right { -step } else { step };
        let dr = if up < down { -step } else { step };
        self.check(center + MotionVector::new(dr, dc));
    }

    fn finish(self) -> SearchResult {
        SearchResult {
            mv: self.best,
            cost: self.cost,
            distortion: self.distortion.variance,
            sse: self.distortion.sse,
            sad_score: MAX_COST,
        }
    }
}
