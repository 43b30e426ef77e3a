/// Point cloud coordinate bounds tracking
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl PointCloudBounds {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    /// Update bounds with a new point
    pub fn update(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    /// Grow these bounds to cover another set of bounds
    pub fn extend(&mut self, other: &PointCloudBounds) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_z = self.max_z.max(other.max_z);
    }

    /// True once at least one point has been recorded
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite() && self.max_x.is_finite()
    }

    /// Flatten to a GeoJSON-style [min_x, min_y, min_z, max_x, max_y, max_z]
    pub fn to_bbox(&self) -> [f64; 6] {
        [
            self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z,
        ]
    }

    /// Rebuild from a GeoJSON-style bounding box
    pub fn from_bbox(bbox: [f64; 6]) -> Self {
        Self {
            min_x: bbox[0],
            min_y: bbox[1],
            min_z: bbox[2],
            max_x: bbox[3],
            max_y: bbox[4],
            max_z: bbox[5],
        }
    }
}

impl Default for PointCloudBounds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_update_tracks_extremes() {
        let mut bounds = PointCloudBounds::new();
        assert!(!bounds.is_finite());

        bounds.update(1.0, 2.0, 3.0);
        bounds.update(-1.0, 5.0, 0.5);

        assert!(bounds.is_finite());
        assert_eq!(bounds.min_x, -1.0);
        assert_eq!(bounds.max_x, 1.0);
        assert_eq!(bounds.min_y, 2.0);
        assert_eq!(bounds.max_y, 5.0);
        assert_eq!(bounds.min_z, 0.5);
        assert_eq!(bounds.max_z, 3.0);
    }

    #[test]
    fn test_bounds_extend_merges() {
        let mut a = PointCloudBounds::new();
        a.update(0.0, 0.0, 0.0);
        let mut b = PointCloudBounds::new();
        b.update(10.0, -10.0, 4.0);

        a.extend(&b);
        assert_eq!(a.to_bbox(), [0.0, -10.0, 0.0, 10.0, 0.0, 4.0]);
    }
}
