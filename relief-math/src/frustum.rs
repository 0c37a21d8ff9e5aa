//! The camera view frustum expressed in the camera's own orthonormal basis
//! ("radar" approach, <http://www.lighthouse3d.com/tutorials/view-frustum-culling/>).
//! Tests project the vector from the camera to the probe onto the basis instead
//! of evaluating six plane equations.

use crate::aabb::AxisAlignedBoundingBox;
use nalgebra::Vector3;

/// Result of testing a shape against the view frustum.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Containment {
    Outside,
    Intersects,
    Inside,
}

/// Camera position plus reference vectors and precomputed factors for rapid
/// intersection tests in world space.
#[derive(Copy, Clone, Debug)]
pub struct ViewFrustum {
    position: Vector3<f32>,
    // Frustum orientation vectors, unit length.
    x: Vector3<f32>,
    y: Vector3<f32>,
    z: Vector3<f32>,
    near: f32,
    far: f32,
    // Vertical field of view in radians.
    angle: f32,
    tangent: f32,
    aspect: f32,
    // Precomputed compensation factors for the sphere test.
    sphere_factor_x: f32,
    sphere_factor_y: f32,
}

impl ViewFrustum {
    /// Creates a frustum from look-at style camera vectors and perspective
    /// parameters. `angle` is the vertical field of view in radians.
    pub fn new(
        position: Vector3<f32>,
        target: Vector3<f32>,
        up: Vector3<f32>,
        angle: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut frustum = Self {
            position: Vector3::default(),
            x: Vector3::x(),
            y: Vector3::y(),
            z: Vector3::z(),
            near,
            far,
            angle,
            tangent: 0.0,
            aspect,
            sphere_factor_x: 0.0,
            sphere_factor_y: 0.0,
        };
        frustum.set_perspective(angle, aspect, near, far);
        frustum.set_camera_vectors(position, target, up);
        frustum
    }

    /// Must be called every time the perspective parameters change, e.g. on
    /// zoom factor or clip plane change.
    pub fn set_perspective(&mut self, angle: f32, aspect: f32, near: f32, far: f32) {
        self.angle = angle;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.tangent = (angle * 0.5).tan();
        self.sphere_factor_y = 1.0 / (angle * 0.5).cos();
        self.sphere_factor_x = 1.0 / (self.tangent * aspect).atan().cos();
    }

    /// Must be called every time the camera position or orientation changes,
    /// i.e. every frame. Takes unnormalized vectors just like a look-at matrix.
    pub fn set_camera_vectors(
        &mut self,
        position: Vector3<f32>,
        target: Vector3<f32>,
        up: Vector3<f32>,
    ) {
        self.position = position;
        self.z = (target - position).normalize();
        self.x = self.z.cross(&up).normalize();
        self.y = self.x.cross(&self.z);
    }

    #[inline]
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    #[inline]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[inline]
    pub fn far(&self) -> f32 {
        self.far
    }

    /// A point exactly on a frustum boundary is inside.
    pub fn contains_point(&self, point: Vector3<f32>) -> Containment {
        let v = point - self.position;

        let pz = v.dot(&self.z);
        if pz > self.far || pz < self.near {
            return Containment::Outside;
        }

        let py = v.dot(&self.y);
        let mut aux = pz * self.tangent;
        if py > aux || py < -aux {
            return Containment::Outside;
        }

        let px = v.dot(&self.x);
        aux *= self.aspect;
        if px > aux || px < -aux {
            return Containment::Outside;
        }

        Containment::Inside
    }

    pub fn contains_sphere(&self, center: Vector3<f32>, radius: f32) -> Containment {
        let mut result = Containment::Inside;
        let v = center - self.position;

        let mut az = v.dot(&self.z);
        if az > self.far + radius || az < self.near - radius {
            return Containment::Outside;
        }
        if az > self.far - radius || az < self.near + radius {
            result = Containment::Intersects;
        }

        let ay = v.dot(&self.y);
        let mut d = self.sphere_factor_y * radius;
        az *= self.tangent;
        if ay > az + d || ay < -az - d {
            return Containment::Outside;
        }
        if ay > az - d || ay < -az + d {
            result = Containment::Intersects;
        }

        let ax = v.dot(&self.x);
        az *= self.aspect;
        d = self.sphere_factor_x * radius;
        if ax > az + d || ax < -az - d {
            return Containment::Outside;
        }
        if ax > az - d || ax < -az + d {
            result = Containment::Intersects;
        }

        result
    }

    /// Approximates the box by its bounding sphere.
    pub fn contains_aabb(&self, aabb: &AxisAlignedBoundingBox) -> Containment {
        self.contains_sphere(aabb.center(), aabb.half_extents().norm())
    }
}
