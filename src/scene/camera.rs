// scene/camera.rs
use glam::{Mat4, Vec2, Vec3};

/// Physically parameterized pinhole camera: an orthonormal basis plus sensor
/// size and focal length (same units, typically meters).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    right: Vec3,
    pub sensor_size: Vec2,
    pub focal_length: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Build a camera looking from `position` towards `at`, re-orthonormalized
    /// around `up`.
    pub fn look_at(position: Vec3, at: Vec3, up: Vec3) -> Self {
        let forward = (at - position).normalize();
        let right = forward.cross(up.normalize()).normalize();
        let up = right.cross(forward);
        Self {
            position,
            forward,
            up,
            right,
            // 36x24mm full frame sensor, 35mm lens
            sensor_size: Vec2::new(0.036, 0.024),
            focal_length: 0.035,
            near: 0.01,
            far: 10_000.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn proj(&self) -> Mat4 {
        let fov_y = 2.0 * (self.sensor_size.y / (2.0 * self.focal_length)).atan();
        let aspect = self.sensor_size.x / self.sensor_size.y;
        Mat4::perspective_rh(fov_y, aspect, self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y)
    }
}
