use crate::{Mat4, Vec3};

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// Fixed viewer camera: eye on -Z at distance 5 looking at the origin.
    /// The vertical field of view matches a frustum of half-height 1 at depth 3.
    pub fn viewer(aspect: f32) -> Self {
        Self::new_perspective(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::ZERO,
            Vec3::Y,
            2.0 * (1.0f32 / 3.0).atan(),
            0.5,
            50.0,
            aspect,
        )
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth range [0, 1], matching wgpu clip space.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Aspect ratio for a surface size; zero-height surfaces count as square.
    pub fn aspect_for(width: u32, height: u32) -> f32 {
        if height == 0 {
            1.0
        } else {
            width.max(1) as f32 / height as f32
        }
    }
}
