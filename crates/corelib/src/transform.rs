use std::str::FromStr;

use crate::{
    Mat4, Vec2, Vec3,
    camera::Camera,
    error::{CoreError, CoreResult},
};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;

/// Attitude pushed by the orientation feed, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Orientation {
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// Parses one feed sample: `roll,pitch,yaw` (commas and/or whitespace).
impl FromStr for Orientation {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let fields: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 3 {
            return Err(CoreError::OrientationArity(fields.len()));
        }
        let mut deg = [0.0f32; 3];
        for (slot, field) in deg.iter_mut().zip(&fields) {
            *slot = field
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CoreError::OrientationValue((*field).to_owned()))?;
        }
        Ok(Self::new(deg[0], deg[1], deg[2]))
    }
}

/// User-controlled part of the model transform: zoom and pan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureTransform {
    /// Always within `[MIN_SCALE, MAX_SCALE]`.
    pub scale: f32,
    /// Normalized view units; a full view width/height is 2.0.
    pub pan: Vec2,
}

impl GestureTransform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        pan: Vec2::ZERO,
    };

    /// Multiply the scale by `ratio` and clamp.
    pub fn scaled_by(self, ratio: f32) -> Self {
        Self {
            scale: (self.scale * ratio).clamp(MIN_SCALE, MAX_SCALE),
            ..self
        }
    }

    pub fn panned_by(self, delta: Vec2) -> Self {
        Self {
            pan: self.pan + delta,
            ..self
        }
    }
}

impl Default for GestureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Everything the render loop needs from the viewport for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportTransform {
    pub orientation: Orientation,
    pub gesture: GestureTransform,
}

impl ViewportTransform {
    /// translate(pan) * scale * rotX(roll) * rotY(pitch) * rotZ(yaw).
    pub fn model_matrix(&self) -> Mat4 {
        let Orientation { roll, pitch, yaw } = self.orientation;
        let GestureTransform { scale, pan } = self.gesture;
        Mat4::from_translation(pan.extend(0.0))
            * Mat4::from_scale(Vec3::splat(scale))
            * Mat4::from_rotation_x(roll.to_radians())
            * Mat4::from_rotation_y(pitch.to_radians())
            * Mat4::from_rotation_z(yaw.to_radians())
    }

    /// `projection * view * model`.
    pub fn mvp(&self, camera: &Camera) -> Mat4 {
        camera.proj_view() * self.model_matrix()
    }
}

/// Recenter and uniformly scale an axis-aligned box so it fits a sphere of `radius`.
///
/// Degenerate boxes (a single point) are only recentered.
pub fn fit_matrix(min: Vec3, max: Vec3, radius: f32) -> Mat4 {
    let center = (min + max) * 0.5;
    let half_diag = (max - min).length() * 0.5;
    let scale = if half_diag > f32::EPSILON {
        radius / half_diag
    } else {
        1.0
    };
    Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(-center)
}
