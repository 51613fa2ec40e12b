use std::array;

use super::{SearchContext, SearchResult};
use crate::{
    mv::{LegalRange, MotionVector},
    oracle::VarianceOracle,
    params::{MAX_COST, SadBatch},
    util::BlockView,
};

/// Exhaustive search of every vector within `distance` of `ref_mv`.
///
/// `ref_mv` is in whole pixels. The window is clamped to the legal range and scanned
/// in raster order, excluding its bottom row and right column. The starting vector
/// only seeds the best score if it lies strictly inside the legal range.
pub fn full_search<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    ref_mv: MotionVector,
    distance: usize,
) -> SearchResult {
    FullScan::new(ctx, oracle, ref_mv).run(distance, SadBatch::empty())
}

/// [`full_search`] computing three adjacent candidates at a time.
pub fn full_search_x3<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    ref_mv: MotionVector,
    distance: usize,
) -> SearchResult {
    FullScan::new(ctx, oracle, ref_mv).run(distance, SadBatch::X3)
}

/// [`full_search`] computing four adjacent candidates at a time.
pub fn full_search_x4<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    ref_mv: MotionVector,
    distance: usize,
) -> SearchResult {
    FullScan::new(ctx, oracle, ref_mv).run(distance, SadBatch::X4)
}

/// [`full_search`] computing eight adjacent candidates at a time, then three.
pub fn full_search_x8<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    ref_mv: MotionVector,
    distance: usize,
) -> SearchResult {
    FullScan::new(ctx, oracle, ref_mv).run(distance, SadBatch::X8 | SadBatch::X3)
}

struct FullScan<'c, 'a, O: ?Sized> {
    ctx: &'c SearchContext<'a>,
    oracle: &'c O,
    start: MotionVector,
    best_mv: MotionVector,
    best_sad: u32,
}

impl<'c, 'a, O: VarianceOracle + ?Sized> FullScan<'c, 'a, O> {
    fn new(ctx: &'c SearchContext<'a>, oracle: &'c O, start: MotionVector) -> Self {
        let best_sad = if ctx.range.contains_strict(start) {
            ctx.score_start(oracle, start)
        } else {
            MAX_COST
        };
        FullScan {
            ctx,
            oracle,
            start,
            best_mv: start,
            best_sad,
        }
    }

    fn run(mut self, distance: usize, batches: SadBatch) -> SearchResult {
        let distance = distance.min(i32::MAX as usize) as i32;
        let window = LegalRange::new(
            self.start.row.saturating_sub(distance),
            self.start.row.saturating_add(distance),
            self.start.col.saturating_sub(distance),
            self.start.col.saturating_add(distance),
        )
        .intersect(&self.ctx.range);

        for row in window.row_min..window.row_max {
            let mut col = window.col_min;
            if batches.contains(SadBatch::X8) {
                while col + 7 < window.col_max {
                    let sads =
                        self.group_sads(row, col, |views| self.oracle.sad_x8(self.ctx.src, views));
                    self.consider_group(row, col, sads);
                    col += 8;
                }
            }
            if batches.contains(SadBatch::X4) {
                while col + 3 < window.col_max {
                    let sads =
                        self.group_sads(row, col, |views| self.oracle.sad_x4(self.ctx.src, views));
                    self.consider_group(row, col, sads);
                    col += 4;
                }
            }
            if batches.contains(SadBatch::X3) {
                while col + 2 < window.col_max {
                    let sads =
                        self.group_sads(row, col, |views| self.oracle.sad_x3(self.ctx.src, views));
                    self.consider_group(row, col, sads);
                    col += 3;
                }
            }
            while col < window.col_max {
                let mv = MotionVector::new(row, col);
                let sad = self.ctx.sad_at(self.oracle, mv, self.best_sad);
                self.consider(mv, sad);
                col += 1;
            }
        }

        self.ctx.conclude(self.oracle, self.best_mv, self.best_sad)
    }

    /// SADs of the `N` candidates starting at (`row`, `col`), computed by `batch` unless
    /// one of them leaves the reference plane.
    fn group_sads<const N: usize>(
        &self,
        row: i32,
        col: i32,
        batch: impl FnOnce([BlockView<'a>; N]) -> [u32; N],
    ) -> [u32; N] {
        let mvs = array::from_fn(|i| MotionVector::new(row, col + i as i32));
        match self.ctx.candidates(mvs) {
            Some(views) => batch(views),
            None => mvs.map(|mv| self.ctx.sad_at(self.oracle, mv, u32::MAX)),
        }
    }

    fn consider_group<const N: usize>(&mut self, row: i32, col: i32, sads: [u32; N]) {
        for (i, sad) in sads.into_iter().enumerate() {
            self.consider(MotionVector::new(row, col + i as i32), sad);
        }
    }

    fn consider(&mut self, mv: MotionVector, sad: u32) {
        if let Some(score) = self.ctx.improves(sad, mv, self.best_sad) {
            self.best_sad = score;
            self.best_mv = mv;
        }
    }
}
