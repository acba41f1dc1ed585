//! Packed buffer format.
//!
//! Memory layout (single buffer):
//! - Header: 8 bytes (magic, version + coordinate kind, `node_size`, `num_items`)
//! - Boxes: `num_nodes` * 4 coordinates, little-endian
//! - Node references: `num_nodes` * `u16` (fewer than 16384 nodes) or `u32`
//!
//! Leaf references hold item ids. Internal references hold the position of the
//! first child times four (box-array units), which keeps `u16` references in
//! range for every node count that selects them.

use crate::coord::{CoordKind, IndexCoord};
use crate::error::{IndexError, Result};

pub(crate) const MAGIC: u8 = 0xfb;
pub(crate) const VERSION: u8 = 3;
pub(crate) const HEADER_SIZE: usize = 8;
pub(crate) const DEFAULT_NODE_SIZE: usize = 16;
pub(crate) const MIN_NODE_SIZE: usize = 2;
pub(crate) const MAX_NODE_SIZE: usize = 65535;

/// Node counts below this use `u16` references.
const U16_NODE_LIMIT: usize = 16384;
/// Largest node count whose internal references still fit `u32`.
const MAX_NODES: usize = 1 << 30;

/// Decoded fixed header of a serialized index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexHeader {
    /// Numeric kind of the stored boxes.
    pub kind: CoordKind,
    /// Fanout used when packing.
    pub node_size: u16,
    /// Number of leaf items.
    pub num_items: u32,
}

impl IndexHeader {
    /// Parses and validates the first [`HEADER_SIZE`] bytes of `data`.
    ///
    /// # Errors
    /// Fails on short input, a wrong magic byte or version, an unknown
    /// coordinate kind, or a node size below 2.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(IndexError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[0] != MAGIC {
            return Err(IndexError::InvalidMagic(data[0]));
        }
        let version = data[1] >> 4;
        if version != VERSION {
            return Err(IndexError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }
        let kind = CoordKind::from_index(data[1] & 0x0f)?;
        let node_size = u16::from_le_bytes([data[2], data[3]]);
        if usize::from(node_size) < MIN_NODE_SIZE {
            return Err(IndexError::InvalidNodeSize(node_size));
        }
        let num_items = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        Ok(Self {
            kind,
            node_size,
            num_items,
        })
    }

    pub(crate) fn write(&self, out: &mut [u8]) {
        out[0] = MAGIC;
        out[1] = (VERSION << 4) | self.kind.index();
        out[2..4].copy_from_slice(&self.node_size.to_le_bytes());
        out[4..8].copy_from_slice(&self.num_items.to_le_bytes());
    }
}

/// Integer width of the node reference array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    pub(crate) fn for_nodes(num_nodes: usize) -> Self {
        if num_nodes < U16_NODE_LIMIT {
            Self::U16
        } else {
            Self::U32
        }
    }

    pub(crate) fn bytes(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Byte offsets and level structure derived from `num_items` and `node_size`.
#[derive(Clone, Debug)]
pub(crate) struct Layout {
    /// End position (exclusive) of each level, leaves first.
    pub(crate) level_bounds: Vec<usize>,
    pub(crate) num_nodes: usize,
    pub(crate) index_width: IndexWidth,
    pub(crate) box_bytes: usize,
    pub(crate) indices_start: usize,
    pub(crate) total_bytes: usize,
}

impl Layout {
    pub(crate) fn new<T: IndexCoord>(num_items: usize, node_size: usize) -> Result<Self> {
        if u32::try_from(num_items).is_err() {
            return Err(IndexError::CapacityExceeded(num_items));
        }
        let level_bounds = level_bounds(num_items, node_size);
        let num_nodes = level_bounds.last().copied().unwrap_or(0);
        if num_nodes > MAX_NODES {
            return Err(IndexError::CapacityExceeded(num_items));
        }
        let index_width = IndexWidth::for_nodes(num_nodes);
        let box_bytes = 4 * T::byte_width();
        let indices_start = HEADER_SIZE + num_nodes * box_bytes;
        let total_bytes = indices_start + num_nodes * index_width.bytes();
        Ok(Self {
            level_bounds,
            num_nodes,
            index_width,
            box_bytes,
            indices_start,
            total_bytes,
        })
    }
}

/// Cumulative node count per level, leaves first, root last.
///
/// An empty index has no levels beyond the (empty) leaf level.
pub(crate) fn level_bounds(num_items: usize, node_size: usize) -> Vec<usize> {
    let mut count = num_items;
    let mut num_nodes = num_items;
    let mut bounds = vec![num_nodes];
    if num_items == 0 {
        return bounds;
    }
    loop {
        count = count.div_ceil(node_size);
        num_nodes += count;
        bounds.push(num_nodes);
        if count <= 1 {
            break;
        }
    }
    bounds
}
