
use std::{cell::RefCell, num::NonZeroUsize};

use anyhow::{Result, bail};

use crate::{
    accel::{Accelerator, FilterJob},
    filter::FilterScratch,
    params::{BlockSize, FilterKind, Plane, SadBatch},
    util::{
        BlockView,
        sad::{get_sad, get_sad_multi},
        variance::{get_subpel_variance, get_variance},
    },
};

pub use crate::util::variance::Variance;

/// The distortion metrics a motion search is scored with, for one block shape.
///
/// `src` views always point at the source block and `reference` views at the
/// candidate's whole-pixel position in the reference plane. Batched SADs default to
/// repeated scalar calls; an implementation that computes them natively advertises
/// so through [`VarianceOracle::batch_support`].
pub trait VarianceOracle {
    fn block_width(&self) -> NonZeroUsize;
    fn block_height(&self) -> NonZeroUsize;

    /// Sum of absolute differences. The result may stop growing once it exceeds
    /// `early_out`, in which case it is only good for rejecting the candidate.
    fn sad(&self, src: BlockView<'_>, reference: BlockView<'_>, early_out: u32) -> u32;

    fn sad_x3(&self, src: BlockView<'_>, refs: [BlockView<'_>; 3]) -> [u32; 3] {
        refs.map(|r| self.sad(src, r, u32::MAX))
    }

    fn sad_x4(&self, src: BlockView<'_>, refs: [BlockView<'_>; 4]) -> [u32; 4] {
        refs.map(|r| self.sad(src, r, u32::MAX))
    }

    fn sad_x8(&self, src: BlockView<'_>, refs: [BlockView<'_>; 8]) -> [u32; 8] {
        refs.map(|r| self.sad(src, r, u32::MAX))
    }

    fn variance(&self, src: BlockView<'_>, reference: BlockView<'_>) -> Variance;

    /// Variance of `src` against `reference` interpolated at eighth-pixel phase
    /// (`x_phase`, `y_phase`). Phases must be below 8.
    fn subpel_variance(
        &self,
        reference: BlockView<'_>,
        x_phase: usize,
        y_phase: usize,
        src: BlockView<'_>,
    ) -> Variance;

    fn half_pixel_variance_h(&self, reference: BlockView<'_>, src: BlockView<'_>) -> Variance {
        self.subpel_variance(reference, 4, 0, src)
    }

    fn half_pixel_variance_v(&self, reference: BlockView<'_>, src: BlockView<'_>) -> Variance {
        self.subpel_variance(reference, 0, 4, src)
    }

    fn half_pixel_variance_hv(&self, reference: BlockView<'_>, src: BlockView<'_>) -> Variance {
        self.subpel_variance(reference, 4, 4, src)
    }

    /// Batched SAD widths computed natively rather than by repeated scalar calls.
    fn batch_support(&self) -> SadBatch {
        SadBatch::empty()
    }
}

const SAD_SIZES: [(usize, usize); 6] = [(4, 4), (8, 4), (8, 8), (8, 16), (16, 8), (16, 16)];

/// Scalar metrics for one block shape.
///
/// Owns the intermediate buffer its sub-pixel variance filters through, so an oracle
/// serves one search at a time. Clone it to search blocks in parallel.
#[derive(Debug, Clone)]
pub struct ReferenceOracle {
    width: NonZeroUsize,
    height: NonZeroUsize,
    filter: FilterKind,
    scratch: RefCell<FilterScratch>,
}

impl ReferenceOracle {
    /// Sub-pixel variance uses the bilinear filter, as the encoder's variance
    /// metrics traditionally do. See [`ReferenceOracle::with_filter`].
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if !SAD_SIZES.contains(&(width, height)) {
            bail!("Unsupported block size {width}x{height}, must be one of 16x16, 16x8, 8x16, 8x8, 8x4 or 4x4.");
        }
        Ok(ReferenceOracle {
            // SAFETY: every supported size is non-zero
            width: unsafe { NonZeroUsize::new_unchecked(width) },
            // SAFETY: every supported size is non-zero
            height: unsafe { NonZeroUsize::new_unchecked(height) },
            filter: FilterKind::Bilinear,
            scratch: RefCell::new(FilterScratch::new()),
        })
    }

    pub fn for_block(block: BlockSize) -> Self {
        ReferenceOracle::new(block.width(), block.height())
            .expect("every prediction block shape has a SAD kernel")
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterKind) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn filter(&self) -> FilterKind {
        self.filter
    }
}

impl VarianceOracle for ReferenceOracle {
    fn block_width(&self) -> NonZeroUsize {
        self.width
    }

    fn block_height(&self) -> NonZeroUsize {
        self.height
    }

    fn sad(&self, src: BlockView<'_>, reference: BlockView<'_>, early_out: u32) -> u32 {
        get_sad(
            self.width,
            self.height,
            src.pixels(),
            src.stride(),
            reference.pixels(),
            reference.stride(),
            early_out,
        )
    }

    fn variance(&self, src: BlockView<'_>, reference: BlockView<'_>) -> Variance {
        get_variance(
            self.width,
            self.height,
            src.pixels(),
            src.stride(),
            reference.pixels(),
            reference.stride(),
        )
    }

    fn subpel_variance(
        &self,
        reference: BlockView<'_>,
        x_phase: usize,
        y_phase: usize,
        src: BlockView<'_>,
    ) -> Variance {
        // A candidate whose filter context leaves the plane can never be chosen.
        get_subpel_variance(
            self.filter,
            self.width,
            self.height,
            reference,
            x_phase,
            y_phase,
            src.pixels(),
            src.stride(),
            &mut self.scratch.borrow_mut(),
        )
        .unwrap_or(Variance::MAX)
    }
}

/// Scalar metrics plus SAD kernels that walk several candidates in one pass.
#[derive(Debug, Clone)]
pub struct BatchedOracle {
    inner: ReferenceOracle,
}

impl BatchedOracle {
    #[must_use]
    pub fn new(inner: ReferenceOracle) -> Self {
        BatchedOracle { inner }
    }

    fn sad_multi<const N: usize>(&self, src: BlockView<'_>, refs: [BlockView<'_>; N]) -> [u32; N] {
        let ref_pitch = refs[0].stride();
        get_sad_multi(
            self.inner.width,
            self.inner.height,
            src.pixels(),
            src.stride(),
            refs.map(|r| r.pixels()),
            ref_pitch,
        )
    }
}

impl VarianceOracle for BatchedOracle {
    fn block_width(&self) -> NonZeroUsize {
        self.inner.width
    }

    fn block_height(&self) -> NonZeroUsize {
        self.inner.height
    }

    fn sad(&self, src: BlockView<'_>, reference: BlockView<'_>, early_out: u32) -> u32 {
        self.inner.sad(src, reference, early_out)
    }

    fn sad_x3(&self, src: BlockView<'_>, refs: [BlockView<'_>; 3]) -> [u32; 3] {
        self.sad_multi(src, refs)
    }

    fn sad_x4(&self, src: BlockView<'_>, refs: [BlockView<'_>; 4]) -> [u32; 4] {
        self.sad_multi(src, refs)
    }

    fn sad_x8(&self, src: BlockView<'_>, refs: [BlockView<'_>; 8]) -> [u32; 8] {
        self.sad_multi(src, refs)
    }

    fn variance(&self, src: BlockView<'_>, reference: BlockView<'_>) -> Variance {
        self.inner.variance(src, reference)
    }

    fn subpel_variance(
        &self,
        reference: BlockView<'_>,
        x_phase: usize,
        y_phase: usize,
        src: BlockView<'_>,
    ) -> Variance {
        self.inner.subpel_variance(reference, x_phase, y_phase, src)
    }

    fn batch_support(&self) -> SadBatch {
        SadBatch::all()
    }
}

/// Scalar metrics whose sub-pixel interpolation runs on one plane's accelerator queue.
///
/// Falls back to the scalar path whenever the accelerator cannot take or finish the
/// job, which also disables it for the rest of the session.
#[derive(Debug)]
pub struct AcceleratedOracle<'a> {
    inner: ReferenceOracle,
    accel: &'a Accelerator,
    plane: Plane,
}

impl<'a> AcceleratedOracle<'a> {
    #[must_use]
    pub fn new(inner: ReferenceOracle, accel: &'a Accelerator, plane: Plane) -> Self {
        AcceleratedOracle {
            inner,
            accel,
            plane,
        }
    }

    fn offload(
        &self,
        reference: BlockView<'_>,
        x_phase: usize,
        y_phase: usize,
        src: BlockView<'_>,
    ) -> Option<Variance> {
        if !self.accel.is_available() {
            return None;
        }

        let job = match FilterJob::new(
            self.inner.filter,
            self.inner.width.get(),
            self.inner.height.get(),
            reference,
            x_phase,
            y_phase,
        ) {
            Ok(job) => job,
            Err(e) => {
                self.accel.disable(&e);
                return None;
            }
        };
        let predicted = self.accel.submit(self.plane, job)?.wait()?;
        Some(get_variance(
            self.inner.width,
            self.inner.height,
            src.pixels(),
            src.stride(),
            &predicted,
            self.inner.width,
        ))
    }
}

impl VarianceOracle for AcceleratedOracle<'_> {
    fn block_width(&self) -> NonZeroUsize {
        self.inner.width
    }

    fn block_height(&self) -> NonZeroUsize {
        self.inner.height
    }

    fn sad(&self, src: BlockView<'_>, reference: BlockView<'_>, early_out: u32) -> u32 {
        self.inner.sad(src, reference, early_out)
    }

    fn variance(&self, src: BlockView<'_>, reference: BlockView<'_>) -> Variance {
        self.inner.variance(src, reference)
    }

    fn subpel_variance(
        &self,
        reference: BlockView<'_>,
        x_phase: usize,
        y_phase: usize,
        src: BlockView<'_>,
    ) -> Variance {
        self.offload(reference, x_phase, y_phase, src)
            .unwrap_or_else(|| self.inner.subpel_variance(reference, x_phase, y_phase, src))
    }
}
