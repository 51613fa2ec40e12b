
use bitflags::bitflags;
use std::num::NonZeroUsize;

use anyhow::{Result, bail};

/// The number of halvings a step search may take from its largest first step.
pub const MAX_MVSEARCH_STEPS: u32 = 8;
/// The first step length, in whole pixels, of the lattice used by diamond search.
pub const MAX_FIRST_STEP: i32 = 1 << (MAX_MVSEARCH_STEPS - 1);
/// The largest codable distance of a vector from its predictor, in eighth pixels.
pub const MAX_FULL_PEL_VAL: i32 = (1 << (MAX_MVSEARCH_STEPS + 3)) - 8;
/// Width in bits of the long motion vector component code.
pub const MV_LONG_WIDTH: u32 = 10;
/// Cost returned for a vector or search that has no feasible candidate.
pub const MAX_COST: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    Full = 0,
    Diamond = 1,
    Hex = 2,
    Refining = 3,
}

impl TryFrom<i64> for SearchMethod {
    type Error = anyhow::Error;

    fn try_from(val: i64) -> Result<Self> {
        Ok(match val {
            0 => Self::Full,
            1 => Self::Diamond,
            2 => Self::Hex,
            3 => Self::Refining,
            _ => bail!("Invalid value for 'search', must be 0-3, got {val}."),
        })
    }
}

/// Shape of each ring of the diamond search lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteLayout {
    /// Four axis-aligned sites per ring.
    Diamond = 0,
    /// Axis-aligned sites followed by the four diagonals.
    ThreeStep = 1,
}

impl SiteLayout {
    #[must_use]
    pub const fn sites_per_step(self) -> usize {
        match self {
            SiteLayout::Diamond => 4,
            SiteLayout::ThreeStep => 8,
        }
    }
}

impl TryFrom<i64> for SiteLayout {
    type Error = anyhow::Error;

    fn try_from(val: i64) -> Result<Self> {
        Ok(match val {
            0 => Self::Diamond,
            1 => Self::ThreeStep,
            _ => bail!("Invalid value for 'lattice', must be 0 or 1, got {val}."),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpelMethod {
    /// Half-pixel neighbors and diagonals only.
    HalfPel = 0,
    /// Half-pixel stage followed by one quarter-pixel stage.
    Step = 1,
    /// Repeated half- then quarter-pixel hill climbing.
    Iterative = 2,
}

impl TryFrom<i64> for SubpelMethod {
    type Error = anyhow::Error;

    fn try_from(val: i64) -> Result<Self> {
        Ok(match val {
            0 => Self::HalfPel,
            1 => Self::Step,
            2 => Self::Iterative,
            _ => bail!("Invalid value for 'subpel', must be 0-2, got {val}."),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    SixTap = 0,
    Bilinear = 1,
}

impl TryFrom<i64> for FilterKind {
    type Error = anyhow::Error;

    fn try_from(val: i64) -> Result<Self> {
        Ok(match val {
            0 => Self::SixTap,
            1 => Self::Bilinear,
            _ => bail!("Invalid value for 'filter', must be 0 or 1, got {val}."),
        })
    }
}

/// The prediction block shapes supported by the interpolation filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSize {
    B4x4,
    B8x4,
    B8x8,
    B16x16,
}

impl BlockSize {
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            BlockSize::B4x4 => 4,
            BlockSize::B8x4 | BlockSize::B8x8 => 8,
            BlockSize::B16x16 => 16,
        }
    }

    #[must_use]
    pub const fn height(self) -> usize {
        match self {
            BlockSize::B4x4 | BlockSize::B8x4 => 4,
            BlockSize::B8x8 => 8,
            BlockSize::B16x16 => 16,
        }
    }

    #[must_use]
    pub const fn area(self) -> usize {
        self.width() * self.height()
    }
}

impl TryFrom<(usize, usize)> for BlockSize {
    type Error = anyhow::Error;

    fn try_from((width, height): (usize, usize)) -> Result<Self> {
        Ok(match (width, height) {
            (4, 4) => Self::B4x4,
            (8, 4) => Self::B8x4,
            (8, 8) => Self::B8x8,
            (16, 16) => Self::B16x16,
            _ => bail!("Unsupported block size {width}x{height}."),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Y = 0,
    U = 1,
    V = 2,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Y, Plane::U, Plane::V];
}

bitflags! {
    /// Batched SAD widths an oracle computes natively.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SadBatch: u8 {
        const X3 = 1 << 0;
        const X4 = 1 << 1;
        const X8 = 1 << 2;
    }
}

/// Per-session motion search configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub method: SearchMethod,
    pub layout: SiteLayout,
    /// Number of coarse lattice rings diamond search skips.
    pub step_param: usize,
    /// Half-width of the full search window.
    pub distance: NonZeroUsize,
    /// Iteration cap of the refining search.
    pub search_range: NonZeroUsize,
    pub subpel: SubpelMethod,
    /// Interpolation filter of predicted blocks. See [`crate::predict::InterPredictor::from_params`].
    pub filter: FilterKind,
    pub sad_per_bit: i32,
    pub error_per_bit: i32,
    /// Whether predicted blocks are interpolated on the accelerator queues.
    pub use_accelerator: bool,
}

/// Number of rings in a lattice built from [`MAX_FIRST_STEP`].
pub const LATTICE_RINGS: usize = MAX_MVSEARCH_STEPS as usize;

impl SearchParams {
    pub fn new(
        method: Option<i64>,
        layout: Option<i64>,
        step_param: Option<i64>,
        distance: Option<i64>,
        search_range: Option<i64>,
        subpel: Option<i64>,
        filter: Option<i64>,
        sad_per_bit: Option<i64>,
        error_per_bit: Option<i64>,
        use_accelerator: Option<i64>,
    ) -> Result<Self> {
        let method = SearchMethod::try_from(method.unwrap_or(1))?;
        let layout = SiteLayout::try_from(layout.unwrap_or(0))?;
        let step_param = step_param.unwrap_or(0);
        if step_param < 0 || step_param >= LATTICE_RINGS as i64 {
            bail!(
                "Invalid value for 'step_param', must be 0-{}, got {step_param}.",
                LATTICE_RINGS - 1
            );
        }

        let distance = distance.unwrap_or(16);
        if !(1..=MAX_FIRST_STEP as i64).contains(&distance) {
            bail!("Invalid value for 'distance', must be 1-{MAX_FIRST_STEP}, got {distance}.");
        }

        let search_range = search_range.unwrap_or(16);
        if !(1..=64).contains(&search_range) {
            bail!("Invalid value for 'search_range', must be 1-64, got {search_range}.");
        }

        let subpel = SubpelMethod::try_from(subpel.unwrap_or(1))?;
        let filter = FilterKind::try_from(filter.unwrap_or(0))?;

        let sad_per_bit = sad_per_bit.unwrap_or(64);
        if !(0..=i32::MAX as i64).contains(&sad_per_bit) {
            bail!("Invalid value for 'sad_per_bit', must be non-negative, got {sad_per_bit}.");
        }
        let error_per_bit = error_per_bit.unwrap_or(64);
        if !(0..=i32::MAX as i64).contains(&error_per_bit) {
            bail!("Invalid value for 'error_per_bit', must be non-negative, got {error_per_bit}.");
        }

        let use_accelerator = use_accelerator.unwrap_or(0);
        if !(0..=1).contains(&use_accelerator) {
            bail!("Invalid value for 'accelerator', must be 0 or 1, got {use_accelerator}.");
        }

        Ok(SearchParams {
            method,
            layout,
            step_param: step_param as usize,
            // SAFETY: checked to be at least 1 above
            distance: unsafe { NonZeroUsize::new_unchecked(distance as usize) },
            // SAFETY: checked to be at least 1 above
            search_range: unsafe { NonZeroUsize::new_unchecked(search_range as usize) },
            subpel,
            filter,
            sad_per_bit: sad_per_bit as i32,
            error_per_bit: error_per_bit as i32,
            use_accelerator: use_accelerator == 1,
        })
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            method: SearchMethod::Diamond,
            layout: SiteLayout::Diamond,
            step_param: 0,
            distance: NonZeroUsize::new(16).expect("non-zero literal"),
            search_range: NonZeroUsize::new(16).expect("non-zero literal"),
            subpel: SubpelMethod::Step,
            filter: FilterKind::SixTap,
            sad_per_bit: 64,
            error_per_bit: 64,
            use_accelerator: false,
        }
    }
}
