//! Core types: math re-exports, camera, viewport state and transform composition.

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4, vec3};

pub mod camera;
pub mod error;
pub mod shared;
pub mod transform;
pub mod viewport;

pub use error::{CoreError, CoreResult};
pub use shared::ViewportShared;
pub use transform::{GestureTransform, Orientation, ViewportTransform};
pub use viewport::{GestureMode, ViewportController, ViewportEvent};
