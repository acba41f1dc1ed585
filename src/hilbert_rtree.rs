//! Packed Hilbert R-tree.
//!
//! The tree lives in a single byte buffer (see [`format`](crate::format)):
//! header, node boxes, node references. Leaf nodes occupy positions
//! `[0, num_items)`, parent nodes are appended after them level by level, and
//! the root is the last node. The buffer is the only storage, so exporting
//! and importing an index is a move of the `Vec<u8>`.

use crate::coord::{CoordKind, IndexCoord, Rect};
use crate::error::{IndexError, Result};
use crate::format::{
    DEFAULT_NODE_SIZE, HEADER_SIZE, IndexHeader, IndexWidth, Layout, MAX_NODE_SIZE,
    MIN_NODE_SIZE,
};
use crate::hilbert::hilbert_key;
use crate::priority_queue::PriorityQueue;

/// Static spatial index over a fixed number of axis-aligned boxes.
///
/// Build it by calling [`add`](Self::add) exactly `num_items` times followed by
/// [`finish`](Self::finish), or restore a finished one with
/// [`from_bytes`](Self::from_bytes). Queries are only valid once finished.
///
/// # Example
/// ```
/// use hilbert_select::HilbertRTree;
///
/// let mut tree = HilbertRTree::<f64>::new(3)?;
/// tree.add(0.0, 0.0, 2.0, 2.0)?;
/// tree.add(1.0, 1.0, 3.0, 3.0)?;
/// tree.add(5.0, 5.0, 6.0, 6.0)?;
/// tree.finish()?;
///
/// let mut hits = tree.search(1.5, 1.5, 2.5, 2.5)?;
/// hits.sort_unstable();
/// assert_eq!(hits, vec![0, 1]);
/// assert_eq!(tree.neighbors(6.0, 6.0, Some(1), None)?, vec![2]);
/// # Ok::<(), hilbert_select::IndexError>(())
/// ```
#[derive(Clone, Debug)]
pub struct HilbertRTree<T: IndexCoord = f64> {
    /// Single buffer: header + boxes + references
    data: Vec<u8>,
    /// End position of each tree level, leaves first
    level_bounds: Vec<usize>,
    node_size: usize,
    num_items: usize,
    num_nodes: usize,
    index_width: IndexWidth,
    box_bytes: usize,
    indices_start: usize,
    /// Next node position to be written
    position: usize,
    /// Bounding box of all items
    bounds: Rect<T>,
    finished: bool,
}

impl<T: IndexCoord> HilbertRTree<T> {
    /// Creates an index for exactly `num_items` boxes with the default fanout of 16.
    ///
    /// # Errors
    /// Returns [`IndexError::CapacityExceeded`] when `num_items` does not fit
    /// the packed format.
    pub fn new(num_items: usize) -> Result<Self> {
        Self::with_node_size(num_items, DEFAULT_NODE_SIZE)
    }

    /// Creates an index for exactly `num_items` boxes with the given fanout.
    ///
    /// `node_size` is clamped to `[2, 65535]`.
    ///
    /// # Errors
    /// Returns [`IndexError::CapacityExceeded`] when `num_items` does not fit
    /// the packed format.
    pub fn with_node_size(num_items: usize, node_size: usize) -> Result<Self> {
        let node_size = node_size.clamp(MIN_NODE_SIZE, MAX_NODE_SIZE);
        let layout = Layout::new::<T>(num_items, node_size)?;

        let mut data = vec![0_u8; layout.total_bytes];
        IndexHeader {
            kind: T::KIND,
            node_size: u16::try_from(node_size).unwrap_or(u16::MAX),
            num_items: u32::try_from(num_items)
                .map_err(|_| IndexError::CapacityExceeded(num_items))?,
        }
        .write(&mut data[..HEADER_SIZE]);

        Ok(Self::from_parts(data, layout, node_size, num_items))
    }

    fn from_parts(data: Vec<u8>, layout: Layout, node_size: usize, num_items: usize) -> Self {
        Self {
            data,
            level_bounds: layout.level_bounds,
            node_size,
            num_items,
            num_nodes: layout.num_nodes,
            index_width: layout.index_width,
            box_bytes: layout.box_bytes,
            indices_start: layout.indices_start,
            position: 0,
            bounds: Rect::empty(),
            finished: false,
        }
    }

    /// Restores a finished index from a buffer produced by
    /// [`into_inner`](Self::into_inner) or [`as_bytes`](Self::as_bytes).
    ///
    /// # Errors
    /// Fails when the header is invalid, when it names a coordinate kind other
    /// than `T`, or when the buffer is shorter than the layout it describes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let header = IndexHeader::parse(&data)?;
        if header.kind != T::KIND {
            return Err(IndexError::CoordKindMismatch {
                expected: T::KIND,
                found: header.kind,
            });
        }

        let node_size = usize::from(header.node_size);
        let num_items = header.num_items as usize;
        let layout = Layout::new::<T>(num_items, node_size)?;
        if data.len() < layout.total_bytes {
            return Err(IndexError::Truncated {
                expected: layout.total_bytes,
                actual: data.len(),
            });
        }

        let mut tree = Self::from_parts(data, layout, node_size, num_items);
        tree.position = tree.num_nodes;
        tree.finished = true;
        if num_items > 0 {
            tree.bounds = tree.get_box(tree.num_nodes - 1);
        }
        Ok(tree)
    }

    /// Adds a box and returns its item id (0-based insertion order).
    ///
    /// # Errors
    /// Returns [`IndexError::TooManyItems`] once `num_items` boxes were added
    /// and [`IndexError::AlreadyFinished`] after [`finish`](Self::finish).
    pub fn add(&mut self, min_x: T, min_y: T, max_x: T, max_y: T) -> Result<usize> {
        if self.finished {
            return Err(IndexError::AlreadyFinished);
        }
        if self.position >= self.num_items {
            return Err(IndexError::TooManyItems {
                expected: self.num_items,
            });
        }

        let id = self.position;
        let rect = Rect::new(min_x, min_y, max_x, max_y);
        self.set_index(id, id);
        self.set_box(id, &rect);
        self.bounds.extend(&rect);
        self.position += 1;
        Ok(id)
    }

    /// Packs the added boxes into the tree.
    ///
    /// Leaves are grouped by the Hilbert key of their centers into runs of
    /// `node_size`, then each level is built bottom-up from the one below.
    ///
    /// # Errors
    /// Returns [`IndexError::ItemCountMismatch`] unless exactly `num_items`
    /// boxes were added, and [`IndexError::AlreadyFinished`] on a second call.
    /// A failed call leaves the index unfinished.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(IndexError::AlreadyFinished);
        }
        if self.position != self.num_items {
            return Err(IndexError::ItemCountMismatch {
                added: self.position,
                expected: self.num_items,
            });
        }

        let num_items = self.num_items;
        let node_size = self.node_size;

        if num_items == 0 {
            self.finished = true;
            return Ok(());
        }

        // All items fit in one node: the root just bounds them
        if num_items <= node_size {
            let bounds = self.bounds;
            self.set_box(self.position, &bounds);
            self.set_index(self.position, 0);
            self.position += 1;
            self.finished = true;
            log::debug!("packed {num_items} items into a single root node");
            return Ok(());
        }

        let min_x = self.bounds.min_x.to_f64();
        let min_y = self.bounds.min_y.to_f64();
        let width = self.bounds.max_x.to_f64() - min_x;
        let height = self.bounds.max_y.to_f64() - min_y;

        let mut hilbert_values: Vec<u32> = (0..num_items)
            .map(|pos| {
                let leaf = self.get_box(pos);
                let center_x = (leaf.min_x.to_f64() + leaf.max_x.to_f64()) / 2.0;
                let center_y = (leaf.min_y.to_f64() + leaf.max_y.to_f64()) / 2.0;
                hilbert_key(center_x, center_y, min_x, min_y, width, height)
            })
            .collect();

        self.sort(&mut hilbert_values, 0, num_items - 1);

        // Build parent levels
        let mut pos = 0_usize;
        for level in 0..self.level_bounds.len() - 1 {
            let level_end = self.level_bounds[level];

            while pos < level_end {
                let first_child = pos;
                let mut node_box = Rect::empty();
                for _ in 0..node_size {
                    if pos >= level_end {
                        break;
                    }
                    node_box.extend(&self.get_box(pos));
                    pos += 1;
                }

                self.set_box(self.position, &node_box);
                self.set_index(self.position, first_child << 2);
                self.position += 1;
            }
        }

        self.finished = true;
        log::debug!(
            "packed {} items into {} nodes over {} levels (node size {})",
            num_items,
            self.num_nodes,
            self.level_bounds.len(),
            node_size
        );
        Ok(())
    }

    /// Ids of all boxes intersecting the query rectangle (edges inclusive).
    ///
    /// Ids come back in traversal order.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn search(&self, min_x: T, min_y: T, max_x: T, max_y: T) -> Result<Vec<usize>> {
        self.search_filtered(min_x, min_y, max_x, max_y, |_| true)
    }

    /// Like [`search`](Self::search), keeping only ids for which `filter` returns `true`.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn search_filtered<F>(
        &self,
        min_x: T,
        min_y: T,
        max_x: T,
        max_y: T,
        mut filter: F,
    ) -> Result<Vec<usize>>
    where
        F: FnMut(usize) -> bool,
    {
        self.ensure_finished()?;
        let mut results = Vec::new();
        if self.num_items == 0 {
            return Ok(results);
        }

        let query = Rect::new(min_x, min_y, max_x, max_y);
        let mut stack = Vec::with_capacity(self.level_bounds.len() * self.node_size);
        let mut next = Some(self.num_nodes - 1);

        while let Some(node_index) = next {
            let end = (node_index + self.node_size).min(self.upper_bound(node_index));

            for pos in node_index..end {
                if !query.intersects(&self.get_box(pos)) {
                    continue;
                }
                let index = self.get_index(pos);
                if node_index >= self.num_items {
                    stack.push(index >> 2);
                } else if filter(index) {
                    results.push(index);
                }
            }

            next = stack.pop();
        }

        Ok(results)
    }

    /// Ids of the boxes nearest to `(x, y)`, closest first.
    ///
    /// Distance is measured to the nearest point of each box (zero inside).
    /// `max_results` caps the count and `max_distance` excludes anything
    /// farther; `None` leaves either unbounded.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn neighbors(
        &self,
        x: f64,
        y: f64,
        max_results: Option<usize>,
        max_distance: Option<f64>,
    ) -> Result<Vec<usize>> {
        self.neighbors_filtered(x, y, max_results, max_distance, |_| true)
    }

    /// Like [`neighbors`](Self::neighbors), skipping items rejected by `filter`.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn neighbors_filtered<F>(
        &self,
        x: f64,
        y: f64,
        max_results: Option<usize>,
        max_distance: Option<f64>,
        filter: F,
    ) -> Result<Vec<usize>>
    where
        F: FnMut(usize) -> bool,
    {
        let mut queue = PriorityQueue::new();
        self.neighbors_with_queue(&mut queue, x, y, max_results, max_distance, filter)
    }

    /// Nearest-neighbor search using caller-owned scratch space.
    ///
    /// The queue is cleared on entry and exit; reusing one across calls avoids
    /// reallocating the search frontier. Each concurrent search needs its own.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn neighbors_with_queue<F>(
        &self,
        queue: &mut PriorityQueue,
        x: f64,
        y: f64,
        max_results: Option<usize>,
        max_distance: Option<f64>,
        mut filter: F,
    ) -> Result<Vec<usize>>
    where
        F: FnMut(usize) -> bool,
    {
        self.ensure_finished()?;
        queue.clear();
        let mut results = Vec::new();
        let max_results = max_results.unwrap_or(usize::MAX);
        if self.num_items == 0 || max_results == 0 {
            return Ok(results);
        }
        let max_dist_sq = max_distance.map_or(f64::INFINITY, |d| d * d);

        // Queue ids carry a tag bit: odd for items, even for nodes.
        let mut next = Some(self.num_nodes - 1);

        'search: while let Some(node_index) = next {
            let end = (node_index + self.node_size).min(self.upper_bound(node_index));

            for pos in node_index..end {
                let dist = self.get_box(pos).distance_sq(x, y);
                if dist > max_dist_sq {
                    continue;
                }
                let index = self.get_index(pos);
                if node_index >= self.num_items {
                    queue.push((index >> 2) << 1, dist);
                } else if filter(index) {
                    queue.push((index << 1) + 1, dist);
                }
            }

            // Items at the front are closer than anything still unexpanded
            while let (Some(id), Some(dist)) = (queue.peek(), queue.peek_value()) {
                if id & 1 == 0 {
                    break;
                }
                if dist > max_dist_sq {
                    break 'search;
                }
                queue.pop();
                results.push(id >> 1);
                if results.len() == max_results {
                    break 'search;
                }
            }

            next = queue.pop().map(|id| id >> 1);
        }

        queue.clear();
        Ok(results)
    }

    /// Number of items the index was sized for.
    pub fn len(&self) -> usize {
        self.num_items
    }

    /// Whether the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// Fanout used when packing.
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Total node count, leaves included.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// End position of each level, leaves first, root last.
    pub fn level_bounds(&self) -> &[usize] {
        &self.level_bounds
    }

    /// Whether [`finish`](Self::finish) has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Coordinate kind recorded in the header.
    pub fn coord_kind(&self) -> CoordKind {
        T::KIND
    }

    /// Bounding box of every added item, or `None` while nothing was added.
    pub fn bounds(&self) -> Option<Rect<T>> {
        (self.position > 0).then_some(self.bounds)
    }

    /// Box of the item with the given id, searching the leaf level.
    ///
    /// Returns `None` for ids that were never added.
    pub fn item_box(&self, id: usize) -> Option<Rect<T>> {
        let added = self.position.min(self.num_items);
        (0..added)
            .find(|&pos| self.get_index(pos) == id)
            .map(|pos| self.get_box(pos))
    }

    /// The packed buffer.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn as_bytes(&self) -> Result<&[u8]> {
        self.ensure_finished()?;
        Ok(&self.data)
    }

    /// Consumes the index and returns the packed buffer.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn into_inner(self) -> Result<Vec<u8>> {
        self.ensure_finished()?;
        Ok(self.data)
    }

    // --- Private helpers ---

    fn ensure_finished(&self) -> Result<()> {
        if self.finished {
            Ok(())
        } else {
            Err(IndexError::NotFinished)
        }
    }

    #[inline]
    pub(crate) fn get_box(&self, pos: usize) -> Rect<T> {
        let start = HEADER_SIZE + pos * self.box_bytes;
        Rect::read_le(&self.data[start..start + self.box_bytes])
    }

    #[inline]
    fn set_box(&mut self, pos: usize, rect: &Rect<T>) {
        let start = HEADER_SIZE + pos * self.box_bytes;
        rect.write_le(&mut self.data[start..start + self.box_bytes]);
    }

    #[inline]
    pub(crate) fn get_index(&self, pos: usize) -> usize {
        match self.index_width {
            IndexWidth::U16 => {
                let at = self.indices_start + pos * 2;
                usize::from(u16::from_le_bytes([self.data[at], self.data[at + 1]]))
            }
            IndexWidth::U32 => {
                let at = self.indices_start + pos * 4;
                let mut buf = [0_u8; 4];
                buf.copy_from_slice(&self.data[at..at + 4]);
                u32::from_le_bytes(buf) as usize
            }
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "the layout picks a width wide enough for every stored reference"
    )]
    #[inline]
    fn set_index(&mut self, pos: usize, value: usize) {
        match self.index_width {
            IndexWidth::U16 => {
                let at = self.indices_start + pos * 2;
                self.data[at..at + 2].copy_from_slice(&(value as u16).to_le_bytes());
            }
            IndexWidth::U32 => {
                let at = self.indices_start + pos * 4;
                self.data[at..at + 4].copy_from_slice(&(value as u32).to_le_bytes());
            }
        }
    }

    /// End of the level containing `node_index`.
    #[inline]
    fn upper_bound(&self, node_index: usize) -> usize {
        let level = self.level_bounds.partition_point(|&bound| bound <= node_index);
        self.level_bounds
            .get(level)
            .copied()
            .unwrap_or(self.num_nodes)
    }

    /// Quicksort by Hilbert value, reordering boxes and references with it.
    ///
    /// Stops as soon as a range lies inside a single `node_size` run, so
    /// leaves end up grouped per node but not ordered within a node.
    fn sort(&mut self, values: &mut [u32], left: usize, right: usize) {
        if left / self.node_size >= right / self.node_size {
            return;
        }

        let pivot = median_of_three(values, left, right);
        let mut i = left;
        let mut j = right;

        loop {
            while values[i] < pivot {
                i += 1;
            }
            while values[j] > pivot {
                j -= 1;
            }
            if i >= j {
                break;
            }
            self.swap_leaves(values, i, j);
            i += 1;
            j -= 1;
        }

        self.sort(values, left, j);
        self.sort(values, j + 1, right);
    }

    /// Swap two leaves: Hilbert value, box and reference.
    fn swap_leaves(&mut self, values: &mut [u32], a: usize, b: usize) {
        values.swap(a, b);

        let box_a = self.get_box(a);
        let box_b = self.get_box(b);
        self.set_box(a, &box_b);
        self.set_box(b, &box_a);

        let index_a = self.get_index(a);
        let index_b = self.get_index(b);
        self.set_index(a, index_b);
        self.set_index(b, index_a);
    }
}

/// Median of three for quicksort pivot selection
fn median_of_three(values: &[u32], left: usize, right: usize) -> u32 {
    let start = values[left];
    let mid = values[(left + right) >> 1];
    let end = values[right];

    let x = start.max(mid);
    if end > x {
        x
    } else if x == start {
        mid.max(end)
    } else if x == mid {
        start.max(end)
    } else {
        end
    }
}
