use std::num::NonZeroUsize;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;
use vp8_motion::{
    BlockView, LegalRange, MotionVector, MvCostTables, SearchContext,
    filter::{FilterScratch, predict},
    params::{BlockSize, FilterKind},
};

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 64;
pub const BORDER: usize = 32;
pub const STRIDE: usize = WIDTH + 2 * BORDER;
pub const MB: usize = 16;

/// A random reference plane with a border on every side, and a source block.
pub struct Frame {
    pub reference: Vec<u8>,
    pub source: Vec<u8>,
    pub costs: MvCostTables,
}

impl Frame {
    pub fn new(seed_byte: u8) -> Self {
        let mut seed = *b"deadbeeflolcakes";
        seed[0] = seed_byte;
        let mut rng = Xoshiro128StarStar::from_seed(seed);
        Frame {
            reference: (0..STRIDE * (HEIGHT + 2 * BORDER)).map(|_| rng.random()).collect(),
            source: vec![0u8; MB * MB],
            costs: MvCostTables::linear(16, 4),
        }
    }

    pub fn stride() -> NonZeroUsize {
        NonZeroUsize::new(STRIDE).unwrap()
    }

    /// The reference plane at the top-left pixel of macroblock (`mb_row`, `mb_col`).
    pub fn reference_at(&self, mb_row: usize, mb_col: usize) -> BlockView<'_> {
        BlockView::at_position(
            &self.reference,
            Frame::stride(),
            BORDER + mb_row * MB,
            BORDER + mb_col * MB,
        )
        .unwrap()
    }

    /// Makes the source block the prediction of macroblock (`mb_row`, `mb_col`) at
    /// the eighth-pixel vector `mv`.
    pub fn set_source(
        &mut self,
        mb_row: usize,
        mb_col: usize,
        mv: MotionVector,
        filter: FilterKind,
    ) {
        let base = self
            .reference_at(mb_row, mb_col)
            .displaced(mv.to_full_pel())
            .unwrap();
        let mut source = vec![0u8; MB * MB];
        predict(
            filter,
            BlockSize::B16x16,
            base,
            (mv.col & 7) as usize,
            (mv.row & 7) as usize,
            &mut source,
            NonZeroUsize::new(MB).unwrap(),
            &mut FilterScratch::new(),
        )
        .unwrap();
        self.source = source;
    }

    /// Vectors that keep macroblock (`mb_row`, `mb_col`) and its filter context
    /// inside the bordered plane.
    pub fn legal_range(mb_row: usize, mb_col: usize) -> LegalRange {
        let reach = (BORDER - MB) as i32;
        let rows = (HEIGHT / MB) as i32;
        let cols = (WIDTH / MB) as i32;
        LegalRange::new(
            -(mb_row as i32 * MB as i32) - reach,
            (rows - 1 - mb_row as i32) * MB as i32 + reach,
            -(mb_col as i32 * MB as i32) - reach,
            (cols - 1 - mb_col as i32) * MB as i32 + reach,
        )
    }

    pub fn ctx(&self, mb_row: usize, mb_col: usize) -> SearchContext<'_> {
        SearchContext::new(
            BlockView::new(&self.source, NonZeroUsize::new(MB).unwrap(), 0).unwrap(),
            self.reference_at(mb_row, mb_col),
            Frame::legal_range(mb_row, mb_col),
            &self.costs,
            MotionVector::zero(),
            64,
            64,
        )
    }
}
