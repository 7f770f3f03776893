//! Tile edges, overlap masks and the margins they imply
//!
//! Border pixels of a tile are often overwritten by whichever neighbor was
//! rendered after it. The search can drop a band of pixels along any subset
//! of the four edges; [`OverlapMask`] records which edges were dropped.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::error::ShiftError;

/// One side of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    West,
    North,
    East,
    South,
}

impl Edge {
    /// All edges in bit order
    pub const ALL: [Edge; 4] = [Edge::West, Edge::North, Edge::East, Edge::South];

    pub fn bit(self) -> u8 {
        match self {
            Edge::West => 1 << 0,
            Edge::North => 1 << 1,
            Edge::East => 1 << 2,
            Edge::South => 1 << 3,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Edge::West => "W",
            Edge::North => "N",
            Edge::East => "E",
            Edge::South => "S",
        }
    }
}

/// Set of tile edges that had to be excluded to find a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlapMask(u8);

impl OverlapMask {
    pub const NONE: OverlapMask = OverlapMask(0);
    pub const WEST: OverlapMask = OverlapMask(1 << 0);
    pub const NORTH: OverlapMask = OverlapMask(1 << 1);
    pub const EAST: OverlapMask = OverlapMask(1 << 2);
    pub const SOUTH: OverlapMask = OverlapMask(1 << 3);
    pub const ALL: OverlapMask = OverlapMask(0b1111);

    /// Build a mask from raw bits, dropping anything above the four edge bits
    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, edge: Edge) -> bool {
        self.0 & edge.bit() != 0
    }

    /// Number of excluded edges
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn edges(self) -> impl Iterator<Item = Edge> {
        Edge::ALL.into_iter().filter(move |edge| self.contains(*edge))
    }
}

impl From<Edge> for OverlapMask {
    fn from(edge: Edge) -> Self {
        Self(edge.bit())
    }
}

impl<T: Into<OverlapMask>> BitOr<T> for OverlapMask {
    type Output = OverlapMask;

    fn bitor(self, rhs: T) -> OverlapMask {
        OverlapMask(self.0 | rhs.into().0)
    }
}

impl<T: Into<OverlapMask>> BitOrAssign<T> for OverlapMask {
    fn bitor_assign(&mut self, rhs: T) {
        self.0 |= rhs.into().0;
    }
}

impl BitOr for Edge {
    type Output = OverlapMask;

    fn bitor(self, rhs: Edge) -> OverlapMask {
        OverlapMask::from(self) | rhs
    }
}

impl FromIterator<Edge> for OverlapMask {
    fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
        iter.into_iter().fold(OverlapMask::NONE, |mask, edge| mask | edge)
    }
}

impl fmt::Display for OverlapMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.edges().map(Edge::short_name).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Order in which edge subsets are tried after the whole tile fails.
///
/// Fewer excluded edges first; subsets of equal size in lexicographic
/// West, North, East, South order (W|N, W|E, W|S, N|E, ...).
pub fn exclusion_order() -> Vec<OverlapMask> {
    let mut order = Vec::with_capacity(15);
    for size in 1..=Edge::ALL.len() {
        push_combinations(&Edge::ALL, size, OverlapMask::NONE, &mut order);
    }
    order
}

fn push_combinations(edges: &[Edge], size: usize, prefix: OverlapMask, out: &mut Vec<OverlapMask>) {
    if size == 0 {
        out.push(prefix);
        return;
    }
    for (i, edge) in edges.iter().enumerate() {
        if edges.len() - i < size {
            break;
        }
        push_combinations(&edges[i + 1..], size - 1, prefix | *edge, out);
    }
}

/// Pixel columns/rows excluded from each side of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margin {
    pub west: usize,
    pub north: usize,
    pub east: usize,
    pub south: usize,
}

impl Margin {
    pub const ZERO: Margin = Margin {
        west: 0,
        north: 0,
        east: 0,
        south: 0,
    };

    pub fn new(west: usize, north: usize, east: usize, south: usize) -> Self {
        Self {
            west,
            north,
            east,
            south,
        }
    }

    /// Margin that drops `skip_we` columns from each west/east edge in `mask`
    /// and `skip_ns` rows from each north/south edge in `mask`
    pub fn for_mask(mask: OverlapMask, skip_we: usize, skip_ns: usize) -> Self {
        let pick = |edge: Edge, skip: usize| if mask.contains(edge) { skip } else { 0 };
        Self {
            west: pick(Edge::West, skip_we),
            north: pick(Edge::North, skip_ns),
            east: pick(Edge::East, skip_we),
            south: pick(Edge::South, skip_ns),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Size of an `ncols` x `nrows` tile after trimming, or an error if
    /// nothing would be left
    pub fn trimmed_size(&self, ncols: usize, nrows: usize) -> Result<(usize, usize), ShiftError> {
        let cols = ncols.checked_sub(self.west + self.east).filter(|c| *c > 0);
        let rows = nrows.checked_sub(self.north + self.south).filter(|r| *r > 0);
        match (cols, rows) {
            (Some(cols), Some(rows)) => Ok((cols, rows)),
            _ => Err(ShiftError::InvalidMargin {
                west: self.west,
                north: self.north,
                east: self.east,
                south: self.south,
                ncols,
                nrows,
            }),
        }
    }
}
