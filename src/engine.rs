//! Selection engine: a finished index plus the records it was built from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::format::DEFAULT_NODE_SIZE;
use crate::hilbert_rtree::HilbertRTree;
use crate::lasso::{Lasso, bounding_box};
use crate::priority_queue::PriorityQueue;

/// One mark in drawing-space units plus the attributes of the row it came from.
///
/// Attributes are carried through untouched and returned with selections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    /// Anchor `[x, y]` of the mark.
    pub coordinates: [f64; 2],
    /// `[width, height]` of the mark.
    pub dimensions: [f64; 2],
    /// Remaining fields of the source row.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl GeometryRecord {
    /// Creates a record without attributes.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            coordinates: [x, y],
            dimensions: [width, height],
            attributes: Map::new(),
        }
    }

    /// Adds an attribute, builder style.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Anchor x.
    pub fn x(&self) -> f64 {
        self.coordinates[0]
    }

    /// Anchor y.
    pub fn y(&self) -> f64 {
        self.coordinates[1]
    }

    /// Box inserted into the index; empty extents are widened to `min_extent`.
    fn extent(&self, min_extent: f64) -> [f64; 4] {
        let [x, y] = self.coordinates;
        let [width, height] = self.dimensions;
        [x, y, x + width.max(min_extent), y + height.max(min_extent)]
    }
}

/// Records of one data source, already transformed into drawing space.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Optional label, only used in logs.
    #[serde(default)]
    pub name: Option<String>,
    /// The records of this source.
    pub values: Vec<GeometryRecord>,
}

/// Tuning for index construction and lasso refinement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Fanout of the packed tree.
    pub node_size: usize,
    /// Smallest width/height a record occupies in the index.
    pub min_extent: f64,
    /// Ramer-Douglas-Peucker tolerance applied to lasso polygons.
    pub lasso_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_size: DEFAULT_NODE_SIZE,
            min_extent: 1e-6,
            lasso_tolerance: 1.0,
        }
    }
}

/// Everything needed to build a [`SelectionEngine`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Data sources, indexed together in order.
    pub data: Vec<DataSource>,
    /// Engine tuning; defaults apply when omitted.
    #[serde(default)]
    pub config: EngineConfig,
}

/// Spatial selection over a fixed set of records.
///
/// # Example
/// ```
/// use hilbert_select::{DataSource, EngineConfig, GeometryRecord, SelectionEngine};
///
/// let source = DataSource {
///     name: Some("points".into()),
///     values: vec![
///         GeometryRecord::new(0.0, 0.0, 0.0, 0.0),
///         GeometryRecord::new(10.0, 10.0, 0.0, 0.0),
///     ],
/// };
/// let mut engine = SelectionEngine::build(vec![source], EngineConfig::default())?;
///
/// let hit = engine.closest_point([9.0, 9.0])?.expect("engine is not empty");
/// assert_eq!(hit.coordinates, [10.0, 10.0]);
/// assert_eq!(engine.select_box([-1.0, -1.0], [1.0, 1.0])?.len(), 1);
/// # Ok::<(), hilbert_select::IndexError>(())
/// ```
#[derive(Debug)]
pub struct SelectionEngine {
    index: HilbertRTree<f64>,
    records: Vec<GeometryRecord>,
    config: EngineConfig,
    queue: PriorityQueue,
}

impl SelectionEngine {
    /// Builds the engine from a [`Schema`].
    ///
    /// # Errors
    /// Propagates index construction failures.
    pub fn from_schema(schema: Schema) -> Result<Self> {
        Self::build(schema.data, schema.config)
    }

    /// Indexes every record of every source, in order, and finishes the index.
    ///
    /// # Errors
    /// Propagates index construction failures.
    pub fn build(sources: Vec<DataSource>, config: EngineConfig) -> Result<Self> {
        let total: usize = sources.iter().map(|source| source.values.len()).sum();
        let mut index = HilbertRTree::with_node_size(total, config.node_size)?;
        let mut records = Vec::with_capacity(total);

        for source in sources {
            log::debug!(
                "indexing {} records from {}",
                source.values.len(),
                source.name.as_deref().unwrap_or("unnamed source")
            );
            for record in source.values {
                let [min_x, min_y, max_x, max_y] = record.extent(config.min_extent);
                let id = index.add(min_x, min_y, max_x, max_y)?;
                debug_assert_eq!(id, records.len(), "ids follow insertion order");
                records.push(record);
            }
        }
        index.finish()?;

        Ok(Self {
            index,
            records,
            config,
            queue: PriorityQueue::new(),
        })
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were indexed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in id order.
    pub fn records(&self) -> &[GeometryRecord] {
        &self.records
    }

    /// The underlying index.
    pub fn index(&self) -> &HilbertRTree<f64> {
        &self.index
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record whose box is nearest to `point`, if any.
    ///
    /// # Errors
    /// Propagates index query failures.
    pub fn closest_point(&mut self, point: [f64; 2]) -> Result<Option<&GeometryRecord>> {
        let [x, y] = point;
        let ids = self
            .index
            .neighbors_with_queue(&mut self.queue, x, y, Some(1), None, |_| true)?;
        Ok(ids.first().and_then(|&id| self.records.get(id)))
    }

    /// Records whose boxes intersect the rectangle spanned by two arbitrary corners.
    ///
    /// # Errors
    /// Propagates index query failures.
    pub fn select_box(&self, corner1: [f64; 2], corner2: [f64; 2]) -> Result<Vec<&GeometryRecord>> {
        let (min_x, max_x) = ordered(corner1[0], corner2[0]);
        let (min_y, max_y) = ordered(corner1[1], corner2[1]);
        let ids = self.index.search(min_x, min_y, max_x, max_y)?;
        Ok(self.resolve(&ids))
    }

    /// Records whose anchor lies inside the lasso drawn through `vertices`.
    ///
    /// Candidates come from a box search over the lasso's bounds; each is then
    /// tested against the closed, simplified polygon.
    ///
    /// # Errors
    /// Propagates index query failures.
    pub fn select_lasso(&self, vertices: &[[f64; 2]]) -> Result<Vec<&GeometryRecord>> {
        let Some((min, max)) = bounding_box(vertices) else {
            return Ok(Vec::new());
        };
        let candidates = self.select_box(min, max)?;
        let Some(lasso) = Lasso::new(vertices, self.config.lasso_tolerance) else {
            return Ok(Vec::new());
        };
        Ok(candidates
            .into_iter()
            .filter(|record| lasso.contains(record.x(), record.y()))
            .collect())
    }

    fn resolve(&self, ids: &[usize]) -> Vec<&GeometryRecord> {
        ids.iter().filter_map(|&id| self.records.get(id)).collect()
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}
