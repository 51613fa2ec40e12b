mod diamond;
mod full;
mod hex;
mod refining;

#[cfg(test)]
mod tests;

pub use diamond::{DiamondResult, diamond_search, diamond_search_x4};
pub use full::{full_search, full_search_x3, full_search_x4, full_search_x8};
pub use hex::hex_search;
pub use refining::{refining_search, refining_search_x4};

use crate::{
    cost::{MvCostTables, mv_err_cost, mvsad_err_cost},
    mv::{LegalRange, MotionVector},
    oracle::VarianceOracle,
    params::MAX_COST,
    util::BlockView,
};

/// Everything about one block that stays fixed while its vector is searched.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    /// The source block being predicted.
    pub src: BlockView<'a>,
    /// The reference plane, positioned at the source block's own location.
    pub reference: BlockView<'a>,
    /// Whole-pixel vectors the block may use without reading past the plane border.
    pub range: LegalRange,
    pub costs: &'a MvCostTables,
    /// The predictor vectors are coded against, in eighth pixels.
    pub center_mv: MotionVector,
    /// Weight of vector bits during the integer walk.
    pub sad_per_bit: i32,
    /// Weight of vector bits in the final rate-distortion cost.
    pub error_per_bit: i32,
}

impl<'a> SearchContext<'a> {
    #[must_use]
    pub fn new(
        src: BlockView<'a>,
        reference: BlockView<'a>,
        range: LegalRange,
        costs: &'a MvCostTables,
        center_mv: MotionVector,
        sad_per_bit: i32,
        error_per_bit: i32,
    ) -> Self {
        SearchContext {
            src,
            reference,
            range,
            costs,
            center_mv,
            sad_per_bit,
            error_per_bit,
        }
    }

    /// The reference block a whole-pixel vector points at, or `None` if the vector
    /// leaves the reference plane.
    #[must_use]
    pub fn candidate(&self, mv: MotionVector) -> Option<BlockView<'a>> {
        self.reference.displaced(mv)
    }

    /// The reference blocks of several candidates, or `None` if any of them leaves the
    /// reference plane.
    pub(crate) fn candidates<const N: usize>(
        &self,
        mvs: [MotionVector; N],
    ) -> Option<[BlockView<'a>; N]> {
        let mut views = [self.reference; N];
        for (view, mv) in views.iter_mut().zip(mvs) {
            *view = self.candidate(mv)?;
        }
        Some(views)
    }

    /// SAD of a whole-pixel candidate. One outside the reference plane scores
    /// [`MAX_COST`] and so never improves on anything.
    pub(crate) fn sad_at<O: VarianceOracle + ?Sized>(
        &self,
        oracle: &O,
        mv: MotionVector,
        early_out: u32,
    ) -> u32 {
        self.candidate(mv)
            .map_or(MAX_COST, |reference| oracle.sad(self.src, reference, early_out))
    }

    /// Vector cost of a whole-pixel candidate during the integer walk.
    #[must_use]
    pub fn sad_cost(&self, mv: MotionVector) -> u32 {
        mvsad_err_cost(mv, self.center_mv.to_full_pel(), self.costs, self.sad_per_bit)
    }

    /// Rate cost of an eighth-pixel vector in the final score.
    #[must_use]
    pub fn err_cost(&self, mv: MotionVector) -> u32 {
        mv_err_cost(mv, self.center_mv, self.costs, self.error_per_bit)
    }

    /// Scores a candidate against the best so far.
    ///
    /// The SAD alone must beat `best` before the vector cost is added, and the sum
    /// must still beat it. Returns the new best score on improvement.
    #[must_use]
    pub(crate) fn improves(&self, sad: u32, mv: MotionVector, best: u32) -> Option<u32> {
        if sad >= best {
            return None;
        }
        let score = sad.saturating_add(self.sad_cost(mv));
        (score < best).then_some(score)
    }

    /// SAD plus vector cost of the starting candidate.
    pub(crate) fn score_start<O: VarianceOracle + ?Sized>(
        &self,
        oracle: &O,
        mv: MotionVector,
    ) -> u32 {
        self.sad_at(oracle, mv, MAX_COST)
            .saturating_add(self.sad_cost(mv))
    }

    /// Turns the winner of an integer search into its final rate-distortion result.
    pub(crate) fn conclude<O: VarianceOracle + ?Sized>(
        &self,
        oracle: &O,
        best: MotionVector,
        best_sad: u32,
    ) -> SearchResult {
        if best_sad == MAX_COST {
            return SearchResult::infeasible(best);
        }
        let Some(reference) = self.candidate(best) else {
            return SearchResult::infeasible(best);
        };

        let v = oracle.variance(self.src, reference);
        SearchResult {
            mv: best,
            cost: v.variance.saturating_add(self.err_cost(best.to_eighth_pel())),
            distortion: v.variance,
            sse: v.sse,
            sad_score: best_sad,
        }
    }
}

/// The outcome of a search or refinement.
///
/// Integer searches report `mv` in whole pixels, refiners in eighth pixels.
/// A `cost` of [`MAX_COST`] means no candidate could be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub mv: MotionVector,
    /// Distortion plus rate cost.
    pub cost: u32,
    /// Prediction error the search minimized.
    pub distortion: u32,
    pub sse: u32,
    /// Best SAD-plus-vector-cost score seen by an integer search. Refiners, which
    /// never compute SADs, leave it at [`MAX_COST`].
    pub sad_score: u32,
}

impl SearchResult {
    #[must_use]
    pub fn infeasible(mv: MotionVector) -> Self {
        SearchResult {
            mv,
            cost: MAX_COST,
            distortion: MAX_COST,
            sse: MAX_COST,
            sad_score: MAX_COST,
        }
    }

    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.cost != MAX_COST
    }
}
