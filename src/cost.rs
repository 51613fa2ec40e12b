
use anyhow::{Result, ensure};

use crate::mv::MotionVector;

/// Per-axis cost lookup, indexed by a signed component delta.
///
/// The table is stored flat with `center` marking the entry for a zero delta.
/// Deltas beyond the table's reach saturate to the outermost entry.
#[derive(Debug, Clone)]
pub struct AxisCosts {
    costs: Box<[u32]>,
    center: usize,
}

impl AxisCosts {
    /// Builds a table covering deltas `-reach..=reach`.
    pub fn new(costs: Vec<u32>, reach: usize) -> Result<Self> {
        ensure!(
            costs.len() == 2 * reach + 1,
            "cost table for reach {reach} needs {} entries, got {}",
            2 * reach + 1,
            costs.len()
        );
        Ok(AxisCosts {
            costs: costs.into_boxed_slice(),
            center: reach,
        })
    }

    /// Builds a table from a function of the signed delta.
    pub fn from_fn(reach: usize, f: impl Fn(i32) -> u32) -> Self {
        let reach_i = reach as i32;
        AxisCosts {
            costs: (-reach_i..=reach_i).map(f).collect(),
            center: reach,
        }
    }

    #[must_use]
    pub fn reach(&self) -> usize {
        self.center
    }

    #[must_use]
    pub fn get(&self, delta: i32) -> u32 {
        let idx = (self.center as i64 + delta as i64).clamp(0, self.costs.len() as i64 - 1);
        self.costs[idx as usize]
    }
}

/// Entropy-derived motion vector cost tables for one frame.
///
/// `mvcost` is indexed by quarter-pixel deltas (eighth-pixel deltas shifted by one),
/// `mvsadcost` by whole-pixel deltas. Index 0 of each pair is the row axis.
/// Tables are refreshed between frames and read-only during search.
#[derive(Debug, Clone)]
pub struct MvCostTables {
    pub mvcost: [AxisCosts; 2],
    pub mvsadcost: [AxisCosts; 2],
}

/// Reach of the quarter-pixel `mvcost` tables.
pub const MV_COST_REACH: usize = 1023;
/// Reach of the whole-pixel `mvsadcost` tables.
pub const MV_SAD_COST_REACH: usize = 255;

impl MvCostTables {
    #[must_use]
    pub fn new(mvcost: [AxisCosts; 2], mvsadcost: [AxisCosts; 2]) -> Self {
        MvCostTables { mvcost, mvsadcost }
    }

    /// Tables where each delta costs a fixed amount per unit of magnitude, plus `base`
    /// for any non-zero delta.
    ///
    /// This is only an approximation of entropy-derived costs, useful before the
    /// first frame's statistics are known.
    #[must_use]
    pub fn linear(base: u32, per_unit: u32) -> Self {
        let axis = |reach| {
            AxisCosts::from_fn(reach, |d| {
                if d == 0 {
                    0
                } else {
                    base + per_unit * d.unsigned_abs()
                }
            })
        };
        MvCostTables {
            mvcost: [axis(MV_COST_REACH), axis(MV_COST_REACH)],
            mvsadcost: [axis(MV_SAD_COST_REACH), axis(MV_SAD_COST_REACH)],
        }
    }

    /// Tables that price every vector at zero, leaving pure distortion.
    #[must_use]
    pub fn zero() -> Self {
        MvCostTables::linear(0, 0)
    }
}

/// Weighted bit cost of coding `mv` against the predictor `ref_mv`, both in eighth pixels.
#[must_use]
pub fn mv_bit_cost(
    mv: MotionVector,
    ref_mv: MotionVector,
    tables: &MvCostTables,
    weight: i32,
) -> u32 {
    let bits = tables.mvcost[0].get((mv.row - ref_mv.row) >> 1) as i64
        + tables.mvcost[1].get((mv.col - ref_mv.col) >> 1) as i64;
    ((bits * weight as i64) >> 7).max(0) as u32
}

/// Rate cost of `mv` against `ref_mv` (eighth pixels), scaled into distortion units.
#[must_use]
pub fn mv_err_cost(
    mv: MotionVector,
    ref_mv: MotionVector,
    tables: &MvCostTables,
    error_per_bit: i32,
) -> u32 {
    let bits = tables.mvcost[0].get((mv.row - ref_mv.row) >> 1) as i64
        + tables.mvcost[1].get((mv.col - ref_mv.col) >> 1) as i64;
    ((bits * error_per_bit as i64 + 128) >> 8).max(0) as u32
}

/// Rate cost of a whole-pixel `mv` against a whole-pixel `ref_mv`, scaled into SAD units.
#[must_use]
pub fn mvsad_err_cost(
    mv: MotionVector,
    ref_mv: MotionVector,
    tables: &MvCostTables,
    sad_per_bit: i32,
) -> u32 {
    let bits = tables.mvsadcost[0].get(mv.row - ref_mv.row) as i64
        + tables.mvsadcost[1].get(mv.col - ref_mv.col) as i64;
    ((bits * sad_per_bit as i64 + 128) >> 8).max(0) as u32
}
