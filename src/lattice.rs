
use std::num::NonZeroUsize;

use smallvec::SmallVec;

use crate::{
    mv::MotionVector,
    params::{LATTICE_RINGS, MAX_FIRST_STEP, SiteLayout},
};

/// One candidate displacement of a diamond search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSite {
    pub mv: MotionVector,
    /// `mv.row * stride + mv.col` for the stride the lattice was built for.
    pub offset: isize,
}

/// Inline capacity for the larger three-step layout: a center plus eight sites per ring.
const MAX_SITES: usize = 1 + 8 * LATTICE_RINGS;

/// Concentric rings of search sites, coarsest first.
///
/// Site 0 is the center. Ring `k` (counting from 0) occupies sites
/// `1 + k * sites_per_step ..= (k + 1) * sites_per_step` and steps by
/// `MAX_FIRST_STEP >> k` pixels. Offsets depend only on the plane stride,
/// so a lattice lives as long as the stride does.
#[derive(Debug, Clone)]
pub struct SearchLattice {
    sites: SmallVec<[SearchSite; MAX_SITES]>,
    layout: SiteLayout,
    stride: NonZeroUsize,
}

impl SearchLattice {
    #[must_use]
    pub fn new(layout: SiteLayout, stride: NonZeroUsize) -> Self {
        let stride_i = stride.get() as isize;
        let site = |row: i32, col: i32| SearchSite {
            mv: MotionVector::new(row, col),
            offset: row as isize * stride_i + col as isize,
        };

        let mut sites = SmallVec::new();
        sites.push(site(0, 0));

        let mut len = MAX_FIRST_STEP;
        while len > 0 {
            sites.push(site(-len, 0));
            sites.push(site(len, 0));
            sites.push(site(0, -len));
            sites.push(site(0, len));

            if layout == SiteLayout::ThreeStep {
                sites.push(site(-len, -len));
                sites.push(site(-len, len));
                sites.push(site(len, -len));
                sites.push(site(len, len));
            }

            len /= 2;
        }

        SearchLattice {
            sites,
            layout,
            stride,
        }
    }

    /// Builds a diamond lattice with four sites per ring.
    #[must_use]
    pub fn diamond(stride: NonZeroUsize) -> Self {
        SearchLattice::new(SiteLayout::Diamond, stride)
    }

    /// Builds a three-step lattice with eight sites per ring.
    #[must_use]
    pub fn three_step(stride: NonZeroUsize) -> Self {
        SearchLattice::new(SiteLayout::ThreeStep, stride)
    }

    /// Rebuilds the offsets if the plane stride changed.
    pub fn ensure_stride(&mut self, stride: NonZeroUsize) {
        if stride != self.stride {
            log::debug!(
                "rebuilding {:?} search lattice for stride {} (was {})",
                self.layout,
                stride,
                self.stride
            );
            *self = SearchLattice::new(self.layout, stride);
        }
    }

    #[must_use]
    pub fn sites(&self) -> &[SearchSite] {
        &self.sites
    }

    /// Total site count, including the center.
    #[must_use]
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn sites_per_step(&self) -> usize {
        self.layout.sites_per_step()
    }

    /// Number of step rings, excluding the center.
    #[must_use]
    pub fn ring_count(&self) -> usize {
        self.site_count() / self.sites_per_step()
    }

    #[must_use]
    pub fn layout(&self) -> SiteLayout {
        self.layout
    }

    #[must_use]
    pub fn stride(&self) -> NonZeroUsize {
        self.stride
    }
}
