
use std::num::NonZeroUsize;

use crate::{
    lattice::SearchLattice,
    mv::MotionVector,
    oracle::VarianceOracle,
    params::{SadBatch, SearchMethod, SearchParams, SubpelMethod},
    search::{
        DiamondResult, SearchContext, SearchResult, diamond_search, diamond_search_x4,
        full_search, full_search_x3, full_search_x4, full_search_x8, hex_search,
        refining_search, refining_search_x4,
    },
    subpel::{
        find_best_half_pixel_step, find_best_sub_pixel_step,
        find_best_sub_pixel_step_iteratively,
    },
};

/// The vectors found for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    /// Winner of the integer search, in whole pixels.
    pub integer: SearchResult,
    /// The integer winner raised to sub-pixel precision, in eighth pixels.
    pub refined: SearchResult,
}

/// Runs the configured integer search and sub-pixel refiner for one block at a time.
///
/// Owns the diamond search lattice for the session and rebuilds it whenever a block
/// arrives on a plane with a different stride.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    params: SearchParams,
    lattice: SearchLattice,
}

impl MotionEstimator {
    #[must_use]
    pub fn new(params: SearchParams, stride: NonZeroUsize) -> Self {
        MotionEstimator {
            lattice: SearchLattice::new(params.layout, stride),
            params,
        }
    }

    #[must_use]
    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    #[must_use]
    pub fn lattice(&self) -> &SearchLattice {
        &self.lattice
    }

    /// Searches for the best vector of the block described by `ctx`, starting from
    /// `ref_mv` in eighth pixels.
    ///
    /// Batched search variants are used for whichever SAD widths `oracle`
    /// advertises. If the integer search finds nothing feasible the refiner is
    /// skipped and both results carry the [`crate::params::MAX_COST`] sentinel.
    pub fn estimate<O: VarianceOracle + ?Sized>(
        &mut self,
        ctx: &SearchContext<'_>,
        oracle: &O,
        ref_mv: MotionVector,
    ) -> Estimate {
        self.lattice.ensure_stride(ctx.reference.stride());

        let integer = self.integer_search(ctx, oracle, ref_mv);
        let refined = if integer.is_feasible() {
            match self.params.subpel {
                SubpelMethod::HalfPel => find_best_half_pixel_step(ctx, oracle, integer.mv),
                SubpelMethod::Step => find_best_sub_pixel_step(ctx, oracle, integer.mv),
                SubpelMethod::Iterative => {
                    find_best_sub_pixel_step_iteratively(ctx, oracle, integer.mv)
                }
            }
        } else {
            SearchResult::infeasible(integer.mv.to_eighth_pel())
        };

        log::trace!(
            "{:?} search from {:?}: integer {:?} cost {}, {:?} refined {:?} cost {}",
            self.params.method,
            ref_mv,
            integer.mv,
            integer.cost,
            self.params.subpel,
            refined.mv,
            refined.cost
        );

        Estimate { integer, refined }
    }

    fn integer_search<O: VarianceOracle + ?Sized>(
        &self,
        ctx: &SearchContext<'_>,
        oracle: &O,
        ref_mv: MotionVector,
    ) -> SearchResult {
        let batches = oracle.batch_support();
        let start = ref_mv.to_full_pel();
        match self.params.method {
            SearchMethod::Full => {
                let distance = self.params.distance.get();
                if batches.contains(SadBatch::X8 | SadBatch::X3) {
                    full_search_x8(ctx, oracle, start, distance)
                } else if batches.contains(SadBatch::X4) {
                    full_search_x4(ctx, oracle, start, distance)
                } else if batches.contains(SadBatch::X3) {
                    full_search_x3(ctx, oracle, start, distance)
                } else {
                    full_search(ctx, oracle, start, distance)
                }
            }
            SearchMethod::Diamond => {
                self.stepped_diamond(ctx, oracle, ref_mv, batches.contains(SadBatch::X4))
            }
            SearchMethod::Hex => hex_search(ctx, oracle, ref_mv),
            SearchMethod::Refining => {
                let range = self.params.search_range.get();
                if batches.contains(SadBatch::X4) {
                    refining_search_x4(ctx, oracle, start, range)
                } else {
                    refining_search(ctx, oracle, start, range)
                }
            }
        }
    }

    /// Diamond search from the configured first ring, repeated from each finer ring
    /// that the previous searches did not already cover with zero moves.
    fn stepped_diamond<O: VarianceOracle + ?Sized>(
        &self,
        ctx: &SearchContext<'_>,
        oracle: &O,
        ref_mv: MotionVector,
        batched: bool,
    ) -> SearchResult {
        let diamond = |search_param| -> DiamondResult {
            if batched {
                diamond_search_x4(ctx, oracle, &self.lattice, ref_mv, search_param)
            } else {
                diamond_search(ctx, oracle, &self.lattice, ref_mv, search_param)
            }
        };

        let step_param = self.params.step_param;
        let further_steps = self.lattice.ring_count().saturating_sub(step_param + 1);

        let first = diamond(step_param);
        let mut best = first.result;
        // Rings the first search stayed at its start for need no search of their own.
        let mut n = first.num00;
        let mut skip = 0;
        while n < further_steps {
            n += 1;
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let next = diamond(step_param + n);
            skip = next.num00;
            if next.result.cost < best.cost {
                best = next.result;
            }
        }
        best
    }
}
