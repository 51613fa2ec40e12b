pub mod sad;
pub mod variance;


use anyhow::{Result, bail, ensure};
use std::num::NonZeroUsize;

use crate::mv::MotionVector;

#[cfg(target_arch = "x86_64")]
cpufeatures::new!(cpuid_avx2, "avx2");

#[cfg(target_arch = "x86_64")]
pub use cpuid_avx2::get as has_avx2;

/// A borrowed window into an 8-bit plane: the plane's pixels, its stride, and the
/// index of the pixel that acts as the block's top-left corner.
///
/// Views are cheap to copy. Moving a view never copies pixel data, it only
/// recomputes the origin, so a search can step through candidate positions by
/// adding precomputed linear offsets.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    data: &'a [u8],
    stride: NonZeroUsize,
    origin: usize,
}

impl<'a> BlockView<'a> {
    pub fn new(data: &'a [u8], stride: NonZeroUsize, origin: usize) -> Result<Self> {
        ensure!(
            origin < data.len(),
            "block origin {origin} lies outside a plane of {} pixels",
            data.len()
        );
        Ok(BlockView {
            data,
            stride,
            origin,
        })
    }

    /// A view whose origin sits at (`row`, `col`) of a plane with the given stride.
    pub fn at_position(
        data: &'a [u8],
        stride: NonZeroUsize,
        row: usize,
        col: usize,
    ) -> Result<Self> {
        BlockView::new(data, stride, row * stride.get() + col)
    }

    #[must_use]
    pub fn stride(&self) -> NonZeroUsize {
        self.stride
    }

    #[must_use]
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// The plane's pixels from the origin onward.
    #[must_use]
    pub fn pixels(&self) -> &'a [u8] {
        &self.data[self.origin..]
    }

    /// Linear offset of a (`row`, `col`) displacement.
    #[must_use]
    pub fn offset_of(&self, row: i32, col: i32) -> isize {
        row as isize * self.stride.get() as isize + col as isize
    }

    /// Moves the origin by a linear offset, or returns `None` if the new origin would
    /// fall outside the plane.
    #[must_use]
    pub fn shifted(&self, offset: isize) -> Option<BlockView<'a>> {
        let origin = self
            .origin
            .checked_add_signed(offset)
            .filter(|&origin| origin < self.data.len())?;
        Some(BlockView {
            data: self.data,
            stride: self.stride,
            origin,
        })
    }

    /// Moves the origin by a whole-pixel displacement, or returns `None` if it would
    /// leave the plane.
    #[must_use]
    pub fn displaced(&self, mv: MotionVector) -> Option<BlockView<'a>> {
        self.shifted(self.offset_of(mv.row, mv.col))
    }

    /// `width` pixels of row `y` below the origin.
    #[must_use]
    pub fn row(&self, y: usize, width: usize) -> &'a [u8] {
        &self.data[self.origin + y * self.stride.get()..][..width]
    }

    /// The pixels starting `rows` rows and `cols` columns from the origin. Either may
    /// be negative to reach filter context above or left of the block.
    #[must_use]
    pub fn window(&self, rows: isize, cols: isize) -> Option<&'a [u8]> {
        self.shifted(rows * self.stride.get() as isize + cols)
            .map(|view| view.pixels())
    }

    /// The `height` x `width` rectangle whose top-left corner is `rows` rows and `cols`
    /// columns from the origin, as a slice that starts at that corner and ends after
    /// the last pixel of its bottom row.
    pub fn region(
        &self,
        rows: isize,
        cols: isize,
        width: usize,
        height: usize,
    ) -> Result<&'a [u8]> {
        let stride = self.stride.get();
        let start = rows * stride as isize + cols;
        let Some(start) = self.origin.checked_add_signed(start) else {
            bail!("region at ({rows}, {cols}) starts before the plane");
        };
        let len = (height.max(1) - 1) * stride + width;
        ensure!(
            start + len <= self.data.len(),
            "region of {width}x{height} at ({rows}, {cols}) runs past the end of the plane"
        );
        Ok(&self.data[start..start + len])
    }
}

/// Copies a `row_size` x `height` rectangle between strided 8-bit buffers.
///
/// # Performance
/// - **Fast path**: When `src_stride == dest_stride == row_size`, uses single bulk copy
/// - **Standard path**: Copies row by row when strides differ, handling padding correctly
pub fn copy_block(
    dest: &mut [u8],
    dest_stride: NonZeroUsize,
    src: &[u8],
    src_stride: NonZeroUsize,
    row_size: NonZeroUsize,
    height: NonZeroUsize,
) {
    let height = height.get();
    let row_size = row_size.get();
    let src_stride = src_stride.get();
    let dest_stride = dest_stride.get();

    if src_stride == dest_stride && src_stride == row_size {
        dest[..row_size * height].copy_from_slice(&src[..row_size * height]);
    } else {
        for i in 0..height {
            let src_start = i * src_stride;
            let dest_start = i * dest_stride;
            dest[dest_start..dest_start + row_size]
                .copy_from_slice(&src[src_start..src_start + row_size]);
        }
    }
}
