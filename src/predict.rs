
use std::num::NonZeroUsize;

use anyhow::{Context, Result};

use crate::{
    accel::{Accelerator, FilterJob, PendingBlock},
    filter::{self, FilterScratch},
    mv::MotionVector,
    params::{BlockSize, FilterKind, Plane, SearchParams},
    util::{BlockView, copy_block},
};

/// Builds predicted blocks from a reference plane and an eighth-pixel motion vector.
///
/// Whole-pixel vectors are copied. Fractional vectors are interpolated, on the
/// accelerator when one is running and otherwise on the CPU with a scratch buffer
/// owned by the predictor.
#[derive(Debug)]
pub struct InterPredictor {
    filter: FilterKind,
    scratch: FilterScratch,
    accel: Option<Accelerator>,
    /// Planes whose queue may still hold blocks the caller has not waited for.
    in_flight: [bool; 3],
}

impl InterPredictor {
    /// Creates a predictor, starting the accelerator if requested.
    ///
    /// An accelerator that fails to start is logged and left out; prediction
    /// then runs on the CPU for the whole session.
    #[must_use]
    pub fn new(filter: FilterKind, use_accelerator: bool) -> Self {
        let accel = if use_accelerator {
            match Accelerator::new() {
                Ok(accel) => Some(accel),
                Err(e) => {
                    log::warn!("accelerator unavailable, filtering on the CPU: {e:#}");
                    None
                }
            }
        } else {
            None
        };

        InterPredictor {
            filter,
            scratch: FilterScratch::new(),
            accel,
            in_flight: [false; 3],
        }
    }

    /// Creates a predictor with the session's filter and accelerator settings.
    #[must_use]
    pub fn from_params(params: &SearchParams) -> Self {
        InterPredictor::new(params.filter, params.use_accelerator)
    }

    #[must_use]
    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    /// The running accelerator, if any, even if it has since been disabled.
    #[must_use]
    pub fn accelerator(&self) -> Option<&Accelerator> {
        self.accel.as_ref()
    }

    /// Whether fractional blocks are currently being offloaded.
    #[must_use]
    pub fn is_accelerated(&self) -> bool {
        self.accel.as_ref().is_some_and(Accelerator::is_available)
    }

    /// Writes the prediction of `block` displaced by `mv` into `dst`.
    ///
    /// `reference` must sit at the block's own position in the reference plane, and
    /// `mv` is in eighth pixels.
    ///
    /// # Errors
    /// If `mv`, or the filter context around it, points outside the reference plane.
    pub fn predict(
        &mut self,
        plane: Plane,
        block: BlockSize,
        reference: BlockView<'_>,
        mv: MotionVector,
        dst: &mut [u8],
        dst_stride: NonZeroUsize,
    ) -> Result<()> {
        let base = reference
            .displaced(mv.to_full_pel())
            .with_context(|| format!("motion vector {mv:?} points outside the reference plane"))?;
        let x_phase = (mv.col & 7) as usize;
        let y_phase = (mv.row & 7) as usize;

        if x_phase == 0 && y_phase == 0 {
            self.copy_whole_pel(plane, block, base, dst, dst_stride);
            return Ok(());
        }

        if let Some(pending) = self.submit(plane, block, base, x_phase, y_phase) {
            if let Some(pixels) = pending.wait() {
                copy_block(
                    dst,
                    dst_stride,
                    &pixels,
                    block_width(block),
                    block_width(block),
                    block_height(block),
                );
                return Ok(());
            }
        }

        filter::predict(
            self.filter,
            block,
            base,
            x_phase,
            y_phase,
            dst,
            dst_stride,
            &mut self.scratch,
        )
    }

    /// Queues a fractional prediction without waiting for it.
    ///
    /// Returns `None` for whole-pixel vectors, vectors outside the reference plane, and
    /// whenever the accelerator is not available, in which case the caller should use
    /// [`InterPredictor::predict`].
    /// Results are guaranteed ready after [`InterPredictor::finish`] on the same plane.
    pub fn predict_deferred(
        &mut self,
        plane: Plane,
        block: BlockSize,
        reference: BlockView<'_>,
        mv: MotionVector,
    ) -> Option<PendingBlock> {
        let x_phase = (mv.col & 7) as usize;
        let y_phase = (mv.row & 7) as usize;
        if x_phase == 0 && y_phase == 0 {
            return None;
        }
        let base = reference.displaced(mv.to_full_pel())?;
        self.submit(plane, block, base, x_phase, y_phase)
    }

    /// Waits for every block queued on `plane`. Returns `false` if queued blocks may
    /// have been lost to an accelerator failure.
    pub fn finish(&mut self, plane: Plane) -> bool {
        let drained = match &self.accel {
            Some(accel) if self.in_flight[plane as usize] => accel.finish(plane),
            _ => true,
        };
        self.in_flight[plane as usize] = false;
        drained
    }

    fn submit(
        &mut self,
        plane: Plane,
        block: BlockSize,
        base: BlockView<'_>,
        x_phase: usize,
        y_phase: usize,
    ) -> Option<PendingBlock> {
        let accel = self.accel.as_ref().filter(|a| a.is_available())?;
        let job = FilterJob::new(
            self.filter,
            block.width(),
            block.height(),
            base,
            x_phase,
            y_phase,
        )
        .inspect_err(|e| accel.disable(e))
        .ok()?;
        let pending = accel.submit(plane, job)?;
        self.in_flight[plane as usize] = true;
        Some(pending)
    }

    fn copy_whole_pel(
        &mut self,
        plane: Plane,
        block: BlockSize,
        base: BlockView<'_>,
        dst: &mut [u8],
        dst_stride: NonZeroUsize,
    ) {
        // Whole-pixel blocks complete after everything already queued for the plane.
        if self.in_flight[plane as usize] {
            self.finish(plane);
        }
        copy_block(
            dst,
            dst_stride,
            base.pixels(),
            base.stride(),
            block_width(block),
            block_height(block),
        );
    }
}

fn block_width(block: BlockSize) -> NonZeroUsize {
    NonZeroUsize::new(block.width()).expect("block widths are non-zero")
}

fn block_height(block: BlockSize) -> NonZeroUsize {
    NonZeroUsize::new(block.height()).expect("block heights are non-zero")
}
