
use std::ops::{Add, Sub};

/// A displacement of a block relative to its reference frame.
///
/// The unit depends on the stage that produced it: integer searches work in whole
/// pixels, while cost evaluation and sub-pixel refinement work in eighths of a pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MotionVector {
    pub row: i32,
    pub col: i32,
}

impl MotionVector {
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        MotionVector { row, col }
    }

    #[must_use]
    pub const fn zero() -> Self {
        MotionVector { row: 0, col: 0 }
    }

    /// Converts a whole-pixel vector to eighth-pixel units.
    #[must_use]
    pub const fn to_eighth_pel(self) -> Self {
        MotionVector {
            row: self.row << 3,
            col: self.col << 3,
        }
    }

    /// Converts an eighth-pixel vector to whole pixels, rounding toward negative infinity.
    #[must_use]
    pub const fn to_full_pel(self) -> Self {
        MotionVector {
            row: self.row >> 3,
            col: self.col >> 3,
        }
    }
}

impl Add for MotionVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        MotionVector {
            row: self.row + rhs.row,
            col: self.col + rhs.col,
        }
    }
}

impl Sub for MotionVector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        MotionVector {
            row: self.row - rhs.row,
            col: self.col - rhs.col,
        }
    }
}

impl From<(i32, i32)> for MotionVector {
    fn from((row, col): (i32, i32)) -> Self {
        MotionVector { row, col }
    }
}

/// The whole-pixel box of vectors a block may use without addressing memory
/// outside the reference plane's border.
///
/// Both ends are part of the range. Some searches only evaluate candidates strictly
/// inside it, which is a narrower test provided by [`LegalRange::contains_strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalRange {
    pub row_min: i32,
    pub row_max: i32,
    pub col_min: i32,
    pub col_max: i32,
}

impl LegalRange {
    #[must_use]
    pub const fn new(row_min: i32, row_max: i32, col_min: i32, col_max: i32) -> Self {
        LegalRange {
            row_min,
            row_max,
            col_min,
            col_max,
        }
    }

    /// A range spanning `-radius..=radius` on both axes.
    #[must_use]
    pub const fn symmetric(radius: i32) -> Self {
        LegalRange::new(-radius, radius, -radius, radius)
    }

    #[must_use]
    pub const fn contains(&self, mv: MotionVector) -> bool {
        mv.row >= self.row_min
            && mv.row <= self.row_max
            && mv.col >= self.col_min
            && mv.col <= self.col_max
    }

    #[must_use]
    pub const fn contains_strict(&self, mv: MotionVector) -> bool {
        mv.row > self.row_min
            && mv.row < self.row_max
            && mv.col > self.col_min
            && mv.col < self.col_max
    }

    /// Whether every vector within `radius` of `center` on both axes is inside the range.
    #[must_use]
    pub const fn contains_square(&self, center: MotionVector, radius: i32) -> bool {
        center.row - radius >= self.row_min
            && center.row + radius <= self.row_max
            && center.col - radius >= self.col_min
            && center.col + radius <= self.col_max
    }

    #[must_use]
    pub fn clamp(&self, mv: MotionVector) -> MotionVector {
        MotionVector {
            row: mv.row.max(self.row_min).min(self.row_max),
            col: mv.col.max(self.col_min).min(self.col_max),
        }
    }

    /// Intersects this range with `other`.
    #[must_use]
    pub fn intersect(&self, other: &LegalRange) -> LegalRange {
        LegalRange {
            row_min: self.row_min.max(other.row_min),
            row_max: self.row_max.min(other.row_max),
            col_min: self.col_min.max(other.col_min),
            col_max: self.col_max.min(other.col_max),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.row_min > self.row_max || self.col_min > self.col_max
    }
}
