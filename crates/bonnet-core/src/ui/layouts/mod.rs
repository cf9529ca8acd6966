// src/ui/layouts/mod.rs
//! Container elements and the alignment vocabulary they share.

pub mod linear;
pub mod table;

pub use linear::LinearLayout;
pub use table::TableLayout;

/// Main-axis direction of a linear layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Left to right
    Horizontal,
    /// Top to bottom
    Vertical,
}

impl Orientation {
    /// Split a width/height pair into (main, cross).
    #[inline]
    pub(crate) fn split<T>(self, w: T, h: T) -> (T, T) {
        match self {
            Orientation::Horizontal => (w, h),
            Orientation::Vertical => (h, w),
        }
    }

    /// Inverse of [`split`](Self::split).
    #[inline]
    pub(crate) fn join<T>(self, main: T, cross: T) -> (T, T) {
        self.split(main, cross)
    }
}

/// Which of the three child groups of a linear layout a child joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Flush to the start of the main axis
    Leading,
    /// Centered in the gap between the leading and trailing groups
    Center,
    /// Flush to the end of the main axis
    Trailing,
}

impl Placement {
    /// Trailing children claim space before centered ones.
    pub(crate) const MEASURE_ORDER: [Placement; 3] =
        [Placement::Leading, Placement::Trailing, Placement::Center];

    pub(crate) fn index(self) -> usize {
        match self {
            Placement::Leading => 0,
            Placement::Center => 1,
            Placement::Trailing => 2,
        }
    }
}

/// Position of a child within extra space along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    /// Left for horizontal, top for vertical
    Start,
    #[default]
    Center,
    /// Right for horizontal, bottom for vertical
    End,
}

impl Gravity {
    /// Offset of a child that leaves `leftover` pixels unused.
    pub fn offset(self, leftover: u32) -> u32 {
        match self {
            Gravity::Start => 0,
            Gravity::Center => leftover / 2,
            Gravity::End => leftover,
        }
    }
}

/// Two-axis gravity used by table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    NorthWest,
    North,
    NorthEast,
    West,
    #[default]
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Align {
    pub fn horizontal(self) -> Gravity {
        match self {
            Align::NorthWest | Align::West | Align::SouthWest => Gravity::Start,
            Align::North | Align::Center | Align::South => Gravity::Center,
            Align::NorthEast | Align::East | Align::SouthEast => Gravity::End,
        }
    }

    pub fn vertical(self) -> Gravity {
        match self {
            Align::NorthWest | Align::North | Align::NorthEast => Gravity::Start,
            Align::West | Align::Center | Align::East => Gravity::Center,
            Align::SouthWest | Align::South | Align::SouthEast => Gravity::End,
        }
    }
}
