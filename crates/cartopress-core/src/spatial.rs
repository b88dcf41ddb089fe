use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::BBox;

/// An entry in the R-tree, referencing a feature of a `GeometrySet` by index.
#[derive(Debug, Clone)]
pub struct FeatureEntry {
    /// Index into the set's feature vector.
    pub feature_index: usize,
    /// Bounding box of the feature.
    pub bbox: BBox,
}

impl RTreeObject for FeatureEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Spatial index used to pre-cull features before geometric clipping.
pub struct SpatialIndex {
    tree: RTree<FeatureEntry>,
}

impl SpatialIndex {
    /// Build the index from a list of feature bounding boxes.
    pub fn build(entries: Vec<FeatureEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Find all entries whose bounding box intersects the given box.
    pub fn query_bbox(&self, bbox: &BBox) -> Vec<&FeatureEntry> {
        let envelope = AABB::from_corners(
            [bbox.min.x, bbox.min.y],
            [bbox.max.x, bbox.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_bbox_query() {
        let entries = vec![
            FeatureEntry {
                feature_index: 0,
                bbox: BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
            },
            FeatureEntry {
                feature_index: 1,
                bbox: BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0)),
            },
        ];
        let index = SpatialIndex::build(entries);
        assert_eq!(index.len(), 2);

        let hits = index.query_bbox(&BBox::from_bounds(-5.0, -5.0, 15.0, 15.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].feature_index, 0);
    }
}
