//! Static board topology: 11 named cells and their adjacency graph.
//!
//! The board is two triangular "home" clusters joined by a diamond-shaped
//! hub with a center cell:
//!
//! ```text
//!   L1                CT                R1
//!     \             /    \             /
//!   L2 - CL - CM - CR - R2
//!     /             \    /             \
//!   L3                CB                R3
//! ```
//!
//! Blue starts on `L1 L2 L3` and wins by occupying `R1 R2 R3`; Red is the
//! mirror image. The graph is fixed for the lifetime of the process - there
//! is no runtime board construction.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// One of the two sides. Serialized lowercase (`"blue"` / `"red"`) to match
/// the wire format and the board snapshot strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Red,
}

impl Color {
    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Self::Blue => Self::Red,
            Self::Red => Self::Blue,
        }
    }

    /// Lowercase name, as used in board snapshot strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Red => "red",
        }
    }

    /// The home cluster this color starts in.
    pub fn home(self) -> &'static [Cell; 3] {
        match self {
            Self::Blue => &BLUE_HOME,
            Self::Red => &RED_HOME,
        }
    }

    /// The opposing home cluster - this color's win target.
    pub fn target(self) -> &'static [Cell; 3] {
        self.opponent().home()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One of the 11 board cells.
///
/// `L*` is the Blue home triangle, `R*` the Red home triangle, and
/// `CL CT CM CB CR` the five hub cells (west gate, top, center, bottom,
/// east gate). Serialized as the uppercase cell name (`"CL"`, `"L2"`, …).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum Cell {
    L1,
    L2,
    L3,
    #[serde(rename = "CL")]
    Cl,
    #[serde(rename = "CT")]
    Ct,
    #[serde(rename = "CM")]
    Cm,
    #[serde(rename = "CB")]
    Cb,
    #[serde(rename = "CR")]
    Cr,
    R1,
    R2,
    R3,
}

/// Blue's starting cluster.
pub const BLUE_HOME: [Cell; 3] = [Cell::L1, Cell::L2, Cell::L3];

/// Red's starting cluster.
pub const RED_HOME: [Cell; 3] = [Cell::R1, Cell::R2, Cell::R3];

/// The five shared central cells.
pub const HUB: [Cell; 5] = [Cell::Cl, Cell::Ct, Cell::Cm, Cell::Cb, Cell::Cr];

/// Every cell, in declaration order.
pub const ALL_CELLS: [Cell; 11] = [
    Cell::L1,
    Cell::L2,
    Cell::L3,
    Cell::Cl,
    Cell::Ct,
    Cell::Cm,
    Cell::Cb,
    Cell::Cr,
    Cell::R1,
    Cell::R2,
    Cell::R3,
];

impl Cell {
    /// Uppercase cell name, as used in board snapshot strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::Cl => "CL",
            Self::Ct => "CT",
            Self::Cm => "CM",
            Self::Cb => "CB",
            Self::Cr => "CR",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
        }
    }

    /// The cells adjacent to this one. The graph is undirected: `b` is in
    /// `a.neighbors()` iff `a` is in `b.neighbors()`.
    pub fn neighbors(self) -> &'static [Cell] {
        match self {
            Self::L1 => &[Self::L2, Self::L3, Self::Cl],
            Self::L2 => &[Self::L1, Self::L3, Self::Cl],
            Self::L3 => &[Self::L1, Self::L2, Self::Cl],
            Self::Cl => &[
                Self::L1,
                Self::L2,
                Self::L3,
                Self::Ct,
                Self::Cm,
                Self::Cb,
            ],
            Self::Ct => &[Self::Cl, Self::Cm, Self::Cr],
            Self::Cm => &[Self::Cl, Self::Ct, Self::Cb, Self::Cr],
            Self::Cb => &[Self::Cl, Self::Cm, Self::Cr],
            Self::Cr => &[
                Self::Ct,
                Self::Cm,
                Self::Cb,
                Self::R1,
                Self::R2,
                Self::R3,
            ],
            Self::R1 => &[Self::R2, Self::R3, Self::Cr],
            Self::R2 => &[Self::R1, Self::R3, Self::Cr],
            Self::R3 => &[Self::R1, Self::R2, Self::Cr],
        }
    }

    /// Whether `other` is directly reachable from this cell.
    pub fn is_adjacent(self, other: Cell) -> bool {
        self.neighbors().contains(&other)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// Tests
// =========================================================================
