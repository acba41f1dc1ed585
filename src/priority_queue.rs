//! Binary min-heap used by nearest-neighbor search.
//!
//! Ids and keys live in two parallel arrays with a separate logical length,
//! so clearing is O(1) and a queue reused across searches stops allocating
//! once it has grown to the largest frontier seen.

/// Min-heap of `(id, key)` pairs ordered by `key`.
///
/// Ties between equal keys come out in no particular order.
///
/// # Example
/// ```
/// use hilbert_select::PriorityQueue;
/// let mut queue = PriorityQueue::new();
/// queue.push(7, 2.5);
/// queue.push(3, 0.5);
/// assert_eq!(queue.peek_value(), Some(0.5));
/// assert_eq!(queue.pop(), Some(3));
/// assert_eq!(queue.pop(), Some(7));
/// assert_eq!(queue.pop(), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct PriorityQueue {
    ids: Vec<usize>,
    values: Vec<f64>,
    length: usize,
}

impl PriorityQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            length: 0,
        }
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Drops every entry; the backing storage is kept for reuse.
    pub fn clear(&mut self) {
        self.length = 0;
    }

    /// Inserts `id` with priority `value`.
    pub fn push(&mut self, id: usize, value: f64) {
        let mut pos = self.length;
        self.length += 1;
        if pos == self.ids.len() {
            self.ids.push(id);
            self.values.push(value);
        }

        while pos > 0 {
            let parent = (pos - 1) >> 1;
            let parent_value = self.values[parent];
            if value >= parent_value {
                break;
            }
            self.ids[pos] = self.ids[parent];
            self.values[pos] = parent_value;
            pos = parent;
        }

        self.ids[pos] = id;
        self.values[pos] = value;
    }

    /// Removes and returns the id with the smallest key.
    pub fn pop(&mut self) -> Option<usize> {
        if self.length == 0 {
            return None;
        }

        let top = self.ids[0];
        self.length -= 1;

        if self.length > 0 {
            let length = self.length;
            let id = self.ids[length];
            let value = self.values[length];
            let half = length >> 1;
            let mut pos = 0;

            while pos < half {
                let left = (pos << 1) + 1;
                let right = left + 1;
                let child = if right < length && self.values[right] < self.values[left] {
                    right
                } else {
                    left
                };
                if self.values[child] >= value {
                    break;
                }
                self.ids[pos] = self.ids[child];
                self.values[pos] = self.values[child];
                pos = child;
            }

            self.ids[pos] = id;
            self.values[pos] = value;
        }

        Some(top)
    }

    /// Id with the smallest key, without removing it.
    pub fn peek(&self) -> Option<usize> {
        (self.length > 0).then(|| self.ids[0])
    }

    /// Smallest key, without removing it.
    pub fn peek_value(&self) -> Option<f64> {
        (self.length > 0).then(|| self.values[0])
    }
}
