//! Lasso polygons: closing, simplification and containment.

use geo::algorithm::intersects::Intersects;
use geo::algorithm::simplify::Simplify;
use geo::{LineString, Point, Polygon};

/// A closed, simplified lasso ready for containment tests.
#[derive(Clone, Debug)]
pub(crate) struct Lasso {
    polygon: Polygon<f64>,
}

impl Lasso {
    /// Closes the ring drawn through `vertices` and simplifies it with
    /// Ramer-Douglas-Peucker at `tolerance`.
    ///
    /// Returns `None` when fewer than three vertices enclose no area.
    pub(crate) fn new(vertices: &[[f64; 2]], tolerance: f64) -> Option<Self> {
        let (first, last) = (vertices.first()?, vertices.last()?);
        let mut ring = vertices.to_vec();
        if first != last {
            ring.push(*first);
        }
        // A closed ring needs three distinct corners plus the closing vertex.
        if ring.len() < 4 {
            return None;
        }

        let polygon = Polygon::new(LineString::from(ring), vec![]).simplify(&tolerance);
        Some(Self { polygon })
    }

    /// Point-in-polygon test; points on the boundary count as inside.
    pub(crate) fn contains(&self, x: f64, y: f64) -> bool {
        self.polygon.intersects(&Point::new(x, y))
    }

    #[cfg(test)]
    pub(crate) fn vertex_count(&self) -> usize {
        self.polygon.exterior().0.len()
    }
}

/// Axis-aligned bounds of a vertex list as `(min corner, max corner)`.
pub(crate) fn bounding_box(vertices: &[[f64; 2]]) -> Option<([f64; 2], [f64; 2])> {
    let (&[x0, y0], rest) = vertices.split_first()?;
    let bounds = rest.iter().fold(([x0, y0], [x0, y0]), |(min, max), &[x, y]| {
        ([min[0].min(x), min[1].min(y)], [max[0].max(x), max[1].max(y)])
    });
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: [[f64; 2]; 4] = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];

    #[test]
    fn open_ring_is_closed() {
        let lasso = Lasso::new(&SQUARE, 0.0).expect("square encloses area");
        assert_eq!(lasso.vertex_count(), 5, "closing vertex appended");
    }

    #[test]
    fn closed_ring_is_not_doubled() {
        let mut ring = SQUARE.to_vec();
        ring.push(SQUARE[0]);
        let lasso = Lasso::new(&ring, 0.0).expect("square encloses area");
        assert_eq!(lasso.vertex_count(), 5);
    }

    #[test]
    fn too_few_vertices_select_nothing() {
        assert!(Lasso::new(&[], 1.0).is_none());
        assert!(Lasso::new(&[[0.0, 0.0], [5.0, 5.0]], 1.0).is_none());
        assert!(Lasso::new(&[[0.0, 0.0], [5.0, 5.0], [0.0, 0.0]], 1.0).is_none());
    }

    #[test]
    fn containment_includes_boundary() {
        let lasso = Lasso::new(&SQUARE, 0.0).expect("square encloses area");
        assert!(lasso.contains(5.0, 5.0));
        assert!(lasso.contains(10.0, 5.0), "edge point is inside");
        assert!(!lasso.contains(10.5, 5.0));
    }

    #[test]
    fn simplification_drops_collinear_jitter() {
        let ring = [
            [0.0, 0.0],
            [5.0, 0.1],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
        ];
        let lasso = Lasso::new(&ring, 1.0).expect("ring encloses area");
        assert_eq!(lasso.vertex_count(), 5, "jitter vertex removed");
        assert!(lasso.contains(5.0, 0.05), "simplified edge moves outward");
    }

    #[test]
    fn bounding_box_of_vertices() {
        let triangle = [[3.0, -1.0], [-2.0, 4.0], [1.0, 7.5]];
        assert_eq!(bounding_box(&triangle), Some(([-2.0, -1.0], [3.0, 7.5])));
        assert_eq!(bounding_box(&[]), None);
    }
}
