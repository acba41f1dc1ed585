//! Prelude module for convenient imports
//!
//! Re-exports the types needed to build, query and serve an index:
//!
//! ```
//! use hilbert_select::prelude::*;
//! ```

pub use crate::{
    CoordKind, DataSource, EngineConfig, GeometryRecord, HilbertRTree, IndexCoord, IndexError,
    PriorityQueue, Rect, Router, RouterError, SelectionEngine,
};
