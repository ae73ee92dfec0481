use crate::types::GeoFeature;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};

// Wrapper for RTree indexing
pub struct FeatureEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Spatial index over feature bounding boxes, in longitude/latitude.
pub struct HitIndex {
    tree: RTree<FeatureEnvelope>,
}

impl HitIndex {
    pub fn build(features: &[GeoFeature]) -> Self {
        let items: Vec<FeatureEnvelope> = features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                let rect = feature.geometry.as_ref()?.bounding_rect()?;
                Some(FeatureEnvelope {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Index of the feature containing (lon, lat). Later features are drawn
    /// on top, so the highest matching index wins.
    pub fn locate(&self, features: &[GeoFeature], lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .filter(|candidate| {
                features
                    .get(candidate.index)
                    .and_then(|f| f.geometry.as_ref())
                    .is_some_and(|g| g.contains(&point))
            })
            .map(|candidate| candidate.index)
            .max()
    }
}
