use nalgebra::Vector3;

/// World-space axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AxisAlignedBoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Default for AxisAlignedBoundingBox {
    #[inline]
    fn default() -> Self {
        Self {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }
}

impl AxisAlignedBoundingBox {
    #[inline]
    pub const fn from_min_max(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        (self.max + self.min).scale(0.5)
    }

    #[inline]
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    #[inline]
    pub fn half_extents(&self) -> Vector3<f32> {
        (self.max - self.min).scale(0.5)
    }

    #[inline]
    pub fn corners(&self) -> [Vector3<f32>; 8] {
        [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
        ]
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        #[inline(always)]
        fn is_finite(v: &Vector3<f32>) -> bool {
            v.iter().all(|e| e.is_finite())
        }

        self.max.x >= self.min.x
            && self.max.y >= self.min.y
            && self.max.z >= self.min.z
            && is_finite(&self.min)
            && is_finite(&self.max)
    }

    #[inline]
    pub fn is_contains_point(&self, point: Vector3<f32>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Returns the squared distance from the given point to the closest point of
    /// the box, which is zero if the point is inside.
    #[inline]
    pub fn squared_distance(&self, point: Vector3<f32>) -> f32 {
        let mut dmin = 0.0;

        if point.x < self.min.x {
            dmin += (point.x - self.min.x).powi(2);
        } else if point.x > self.max.x {
            dmin += (point.x - self.max.x).powi(2);
        }

        if point.y < self.min.y {
            dmin += (point.y - self.min.y).powi(2);
        } else if point.y > self.max.y {
            dmin += (point.y - self.max.y).powi(2);
        }

        if point.z < self.min.z {
            dmin += (point.z - self.min.z).powi(2);
        } else if point.z > self.max.z {
            dmin += (point.z - self.max.z).powi(2);
        }

        dmin
    }

    /// A sphere touching the box counts as intersecting.
    #[inline]
    pub fn is_intersects_sphere(&self, position: Vector3<f32>, radius: f32) -> bool {
        self.squared_distance(position) <= radius.powi(2)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::from_min_max(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        )
    }

    #[test]
    fn center_and_extents() {
        let aabb = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(4.0, 2.0, 8.0),
        );
        assert_eq!(aabb.center(), Vector3::new(2.0, 1.0, 4.0));
        assert_eq!(aabb.size(), Vector3::new(4.0, 2.0, 8.0));
        assert_eq!(aabb.half_extents(), Vector3::new(2.0, 1.0, 4.0));
    }

    #[test]
    fn default_is_inverted() {
        let aabb = AxisAlignedBoundingBox::default();
        assert!(!aabb.is_valid());
    }

    #[test]
    fn squared_distance_inside_is_zero() {
        assert_eq!(unit_box().squared_distance(Vector3::new(0.5, -0.5, 0.0)), 0.0);
    }

    #[test]
    fn squared_distance_outside() {
        let aabb = unit_box();
        assert_relative_eq!(aabb.squared_distance(Vector3::new(3.0, 0.0, 0.0)), 4.0);
        // Corner distance accumulates all three axes.
        assert_relative_eq!(aabb.squared_distance(Vector3::new(2.0, 2.0, 2.0)), 3.0);
    }

    #[test]
    fn sphere_intersection_is_inclusive() {
        let aabb = unit_box();
        assert!(aabb.is_intersects_sphere(Vector3::new(3.0, 0.0, 0.0), 2.0));
        assert!(!aabb.is_intersects_sphere(Vector3::new(3.0, 0.0, 0.0), 1.9));
        assert!(aabb.is_intersects_sphere(Vector3::new(0.0, 0.0, 0.0), 0.1));
    }

    #[test]
    fn contains_point_is_inclusive() {
        let aabb = unit_box();
        assert!(aabb.is_contains_point(Vector3::new(1.0, 1.0, 1.0)));
        assert!(!aabb.is_contains_point(Vector3::new(1.0001, 0.0, 0.0)));
    }
}
