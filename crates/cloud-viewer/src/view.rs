//! Rotation state and transforms for the viewer.
//!
//! The original immediate-mode matrix stack is replaced by explicit
//! matrix values computed per frame: `ViewState` holds the three
//! slider-controlled angles, `Projection` holds the perspective
//! matrix, and `model_matrix` composes the fixed transform chain.

use glam::{Mat4, Vec3};

/// Distance the scene is pushed away from the camera so it lands
/// inside the projection frustum.
pub const CAMERA_DEPTH: f32 = 50.0;

/// Vertical field of view in degrees.
pub const FOV_Y_DEG: f32 = 45.0;

/// Near and far clip plane distances.
pub const Z_NEAR: f32 = 1.0;
pub const Z_FAR: f32 = 100.0;

/// Identifies one of the three rotation axes a slider controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// The three user-controlled rotation angles, in degrees.
///
/// Written only by slider callbacks, read only by the frame render;
/// both run on the single GUI event loop so no locking is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewState {
    rot_deg: [f32; 3],
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites one rotation angle. Values are unbounded degrees;
    /// no clamping, no side effects.
    #[inline]
    pub fn set_rotation(&mut self, axis: Axis, degrees: f32) {
        self.rot_deg[axis as usize] = degrees;
    }

    #[inline]
    pub fn rotation(&self, axis: Axis) -> f32 {
        self.rot_deg[axis as usize]
    }

    /// Composes the per-frame model matrix. Fixed order: push the
    /// scene to `CAMERA_DEPTH`, rotate about X, then Y, then Z, and
    /// recenter the cloud on its bounding-box center. The recentring
    /// translate is the last factor so it applies to the geometry
    /// first.
    pub fn model_matrix(&self, center: Vec3) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DEPTH))
            * Mat4::from_rotation_x(self.rot_deg[0].to_radians())
            * Mat4::from_rotation_y(self.rot_deg[1].to_radians())
            * Mat4::from_rotation_z(self.rot_deg[2].to_radians())
            * Mat4::from_translation(-center)
    }
}

/// Perspective projection, rebuilt whenever the surface is resized.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub matrix: Mat4,
}

impl Projection {
    pub fn new(width: u32, height: u32) -> Self {
        let mut projection = Self {
            matrix: Mat4::IDENTITY,
        };
        projection.resize(width, height);
        projection
    }

    /// Recomputes the projection for new pixel dimensions.
    /// glam's `perspective_rh` already produces wgpu's 0..1 depth.
    pub fn resize(&mut self, width: u32, height: u32) {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        self.matrix = Mat4::perspective_rh(FOV_Y_DEG.to_radians(), aspect, Z_NEAR, Z_FAR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_angles_are_zero() {
        let view = ViewState::new();
        assert_eq!(view.rotation(Axis::X), 0.0);
        assert_eq!(view.rotation(Axis::Y), 0.0);
        assert_eq!(view.rotation(Axis::Z), 0.0);
    }

    #[test]
    fn set_rotation_overwrites_without_clamping() {
        let mut view = ViewState::new();
        view.set_rotation(Axis::Y, 540.0);
        assert_eq!(view.rotation(Axis::Y), 540.0);
        view.set_rotation(Axis::Y, -90.0);
        assert_eq!(view.rotation(Axis::Y), -90.0);
        assert_eq!(view.rotation(Axis::X), 0.0);
    }

    #[test]
    fn default_matrix_is_depth_then_recenter() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let got = ViewState::new().model_matrix(center);
        let expected = Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DEPTH))
            * Mat4::from_translation(-center);
        assert!(got.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn x90_rotation_sits_between_depth_and_recenter() {
        let mut view = ViewState::new();
        view.set_rotation(Axis::X, 90.0);

        let center = Vec3::new(4.0, -2.0, 7.5);
        let got = view.model_matrix(center);
        let expected = Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DEPTH))
            * Mat4::from_rotation_x(90f32.to_radians())
            * Mat4::from_translation(-center);
        assert!(got.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn frame_uses_exactly_the_last_set_angle() {
        let mut view = ViewState::new();
        view.set_rotation(Axis::Z, 30.0);
        view.set_rotation(Axis::Z, 45.0);

        let got = view.model_matrix(Vec3::ZERO);
        let expected = Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DEPTH))
            * Mat4::from_rotation_z(45f32.to_radians());
        assert!(got.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn rotation_order_is_x_then_y_then_z() {
        let mut view = ViewState::new();
        view.set_rotation(Axis::X, 10.0);
        view.set_rotation(Axis::Y, 20.0);
        view.set_rotation(Axis::Z, 30.0);

        let got = view.model_matrix(Vec3::ZERO);
        let expected = Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DEPTH))
            * Mat4::from_rotation_x(10f32.to_radians())
            * Mat4::from_rotation_y(20f32.to_radians())
            * Mat4::from_rotation_z(30f32.to_radians());
        assert!(got.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn projection_aspect_tracks_resize() {
        // For perspective_rh, m00 = f / aspect where f = 1/tan(fov/2),
        // so m11 / m00 recovers the aspect ratio exactly.
        let mut projection = Projection::new(800, 600);
        let aspect = projection.matrix.y_axis.y / projection.matrix.x_axis.x;
        assert!((aspect - 800.0 / 600.0).abs() < 1e-6);

        projection.resize(1920, 1080);
        let aspect = projection.matrix.y_axis.y / projection.matrix.x_axis.x;
        assert!((aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn projection_ignores_zero_height() {
        // Degenerate dimensions are floored at one pixel rather than
        // producing a NaN matrix.
        let projection = Projection::new(640, 0);
        assert!(projection.matrix.is_finite());
    }
}
