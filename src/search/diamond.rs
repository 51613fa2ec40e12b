use super::{SearchContext, SearchResult};
use crate::{
    lattice::SearchLattice,
    mv::MotionVector,
    oracle::VarianceOracle,
    params::MAX_COST,
    util::BlockView,
};

/// A diamond search result together with its zero-move count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiamondResult {
    pub result: SearchResult,
    /// Steps that neither moved nor left the starting vector. Callers use this to
    /// skip later searches that would start with the same, already failed, rings.
    pub num00: usize,
}

/// Coarse-to-fine search over the rings of `lattice`, starting at `ref_mv` (eighth
/// pixels) and skipping the first `search_param` rings.
///
/// Every step moves to the best improving site of its ring, earliest site winning
/// ties. Candidates, the start included, are only evaluated strictly inside the
/// legal range.
pub fn diamond_search<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    lattice: &SearchLattice,
    ref_mv: MotionVector,
    search_param: usize,
) -> DiamondResult {
    let mut walk = DiamondWalk::new(ctx, oracle, lattice, ref_mv, search_param);
    for _ in 0..walk.steps {
        walk.scan_sites(walk.per_step);
        walk.end_step();
    }
    walk.conclude()
}

/// [`diamond_search`] computing four sites at a time whenever the whole ring lies
/// strictly inside the legal range.
pub fn diamond_search_x4<O: VarianceOracle + ?Sized>(
    ctx: &SearchContext<'_>,
    oracle: &O,
    lattice: &SearchLattice,
    ref_mv: MotionVector,
    search_param: usize,
) -> DiamondResult {
    let mut walk = DiamondWalk::new(ctx, oracle, lattice, ref_mv, search_param);
    for _ in 0..walk.steps {
        if walk.ring_inside() {
            for _ in 0..walk.per_step / 4 {
                walk.scan_four();
            }
        } else {
            walk.scan_sites(walk.per_step);
        }
        walk.end_step();
    }
    walk.conclude()
}

struct DiamondWalk<'c, 'a, O: ?Sized> {
    ctx: &'c SearchContext<'a>,
    oracle: &'c O,
    lattice: &'c SearchLattice,
    /// Index of the first site of the first ring searched, minus one.
    base: usize,
    per_step: usize,
    steps: usize,
    start: MotionVector,
    best_mv: MotionVector,
    best_offset: isize,
    best_sad: u32,
    /// Next site to evaluate, relative to `base`.
    next: usize,
    best_site: usize,
    last_site: usize,
    num00: usize,
}

impl<'c, 'a, O: VarianceOracle + ?Sized> DiamondWalk<'c, 'a, O> {
    fn new(
        ctx: &'c SearchContext<'a>,
        oracle: &'c O,
        lattice: &'c SearchLattice,
        ref_mv: MotionVector,
        search_param: usize,
    ) -> Self {
        debug_assert_eq!(lattice.stride(), ctx.reference.stride());

        let start = ref_mv.to_full_pel();
        let best_sad = if ctx.range.contains_strict(start) {
            ctx.score_start(oracle, start)
        } else {
            MAX_COST
        };
        let per_step = lattice.sites_per_step();

        DiamondWalk {
            ctx,
            oracle,
            lattice,
            base: search_param * per_step,
            per_step,
            steps: lattice.ring_count().saturating_sub(search_param),
            start,
            best_mv: start,
            best_offset: ctx.reference.offset_of(start.row, start.col),
            best_sad,
            next: 1,
            best_site: 0,
            last_site: 0,
            num00: 0,
        }
    }

    fn site_mv(&self, i: usize) -> MotionVector {
        self.best_mv + self.lattice.sites()[self.base + i].mv
    }

    fn site_view(&self, i: usize) -> Option<BlockView<'a>> {
        self.ctx
            .reference
            .shifted(self.best_offset + self.lattice.sites()[self.base + i].offset)
    }

    fn consider(&mut self, i: usize, sad: u32) {
        if let Some(score) = self.ctx.improves(sad, self.site_mv(i), self.best_sad) {
            self.best_sad = score;
            self.best_site = i;
        }
    }

    fn scan_sites(&mut self, count: usize) {
        for _ in 0..count {
            let i = self.next;
            if self.ctx.range.contains_strict(self.site_mv(i)) {
                let sad = self.site_view(i).map_or(MAX_COST, |view| {
                    self.oracle.sad(self.ctx.src, view, self.best_sad)
                });
                self.consider(i, sad);
            }
            self.next += 1;
        }
    }

    /// Whether the ring's up, down, left and right sites, and so every site of the
    /// ring, lie strictly inside the legal range.
    fn ring_inside(&self) -> bool {
        let range = &self.ctx.range;
        let i = self.next;
        self.site_mv(i).row > range.row_min
            && self.site_mv(i + 1).row < range.row_max
            && self.site_mv(i + 2).col > range.col_min
            && self.site_mv(i + 3).col < range.col_max
    }

    fn scan_four(&mut self) {
        let first = self.next;
        let mut views = [self.ctx.reference; 4];
        for (t, view) in views.iter_mut().enumerate() {
            let Some(site) = self.site_view(first + t) else {
                self.scan_sites(4);
                return;
            };
            *view = site;
        }
        let sads = self.oracle.sad_x4(self.ctx.src, views);
        for (t, sad) in sads.into_iter().enumerate() {
            self.consider(first + t, sad);
        }
        self.next += 4;
    }

    fn end_step(&mut self) {
        if self.best_site != self.last_site {
            let site = self.lattice.sites()[self.base + self.best_site];
            self.best_mv = self.best_mv + site.mv;
            self.best_offset += site.offset;
            self.last_site = self.best_site;
        } else if self.best_mv == self.start {
            self.num00 += 1;
        }
    }

    fn conclude(self) -> DiamondResult {
        DiamondResult {
            result: self.ctx.conclude(self.oracle, self.best_mv, self.best_sad),
            num00: self.num00,
        }
    }
}
