//! # hilbert_select - Packed Hilbert R-tree selection engine
//!
//! A static spatial index over axis-aligned boxes stored in one compact byte
//! buffer, and a selection engine on top of it that answers the interactive
//! queries of a chart: brushing a box, drawing a lasso, picking the closest mark.
//!
//! ## Features
//!
//! - **Packed Hilbert R-tree**: boxes sorted along a Hilbert curve and packed bottom-up
//! - **Numeric kinds**: `i8`, `u8`, `i16`, `u16`, `i32`, `u32`, `f32` and `f64` coordinates
//! - **Portable buffer**: export with `into_inner`, restore with `from_bytes`
//! - **Queries**: box search and k-nearest-neighbors, both with optional filters
//! - **Selections**: box, lasso and closest point over attributed records
//! - **Message router**: JSON requests and responses for an out-of-process host
//!
//! ## Quick Start
//!
//! ```rust
//! use hilbert_select::prelude::*;
//!
//! // Size the index up front, then add boxes (min_x, min_y, max_x, max_y)
//! let mut tree = HilbertRTree::<f64>::with_node_size(4, 2)?;
//! tree.add(0.0, 0.0, 2.0, 2.0)?;    // Box 0
//! tree.add(1.0, 1.0, 3.0, 3.0)?;    // Box 1: overlaps box 0
//! tree.add(5.0, 5.0, 6.0, 6.0)?;    // Box 2: distant
//! tree.add(1.5, 1.5, 2.5, 2.5)?;    // Box 3: inside the others
//!
//! // Pack the tree (required before querying)
//! tree.finish()?;
//!
//! let mut hits = tree.search(1.2, 1.2, 2.8, 2.8)?;
//! hits.sort_unstable();
//! assert_eq!(hits, vec![0, 1, 3]);
//!
//! // Closest boxes first
//! assert_eq!(tree.neighbors(5.5, 4.0, Some(1), None)?, vec![2]);
//!
//! // The buffer round-trips
//! let restored = HilbertRTree::<f64>::from_bytes(tree.into_inner()?)?;
//! assert_eq!(restored.search(4.0, 4.0, 7.0, 7.0)?, vec![2]);
//! # Ok::<(), IndexError>(())
//! ```
//!
//! ## How It Works
//!
//! Each box is keyed by the Hilbert curve index of its center on a 16-bit
//! grid spanning all items. Leaves are grouped into runs of `node_size` by that
//! key, and each parent level stores one bounding box per run of the level
//! below. Node boxes and child references sit in a single buffer behind an
//! 8-byte header, so the index can be handed to another process unchanged.

pub mod coord;
pub mod engine;
pub mod error;
pub mod format;
mod hilbert;
pub mod hilbert_rtree;
mod lasso;
pub mod prelude;
pub mod priority_queue;
pub mod router;

pub use coord::{CoordKind, IndexCoord, Rect};
pub use engine::{DataSource, EngineConfig, GeometryRecord, Schema, SelectionEngine};
pub use error::{IndexError, Result, RouterError};
pub use format::IndexHeader;
pub use hilbert_rtree::HilbertRTree;
pub use priority_queue::PriorityQueue;
pub use router::{Request, Response, Router};
