//! Cross-thread viewport state.
//!
//! The event-loop thread publishes what the `ViewportController` settled on.
//! [`Orientation`] and [`GestureTransform`] are each stored as a whole snapshot,
//! so the render side never observes a mix of old and new components. Nothing
//! here blocks.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::atomic::AtomicCell;

use crate::transform::{GestureTransform, Orientation, ViewportTransform};

#[derive(Debug)]
pub struct ViewportShared {
    orientation: AtomicCell<Orientation>,
    gesture: AtomicCell<GestureTransform>,
    dirty: AtomicBool,
}

impl ViewportShared {
    pub fn new() -> Self {
        Self {
            orientation: AtomicCell::new(Orientation::default()),
            gesture: AtomicCell::new(GestureTransform::IDENTITY),
            // first frame always renders
            dirty: AtomicBool::new(true),
        }
    }

    /// Replace the orientation alone. Last write wins.
    pub fn set_orientation(&self, roll: f32, pitch: f32, yaw: f32) {
        self.orientation.store(Orientation::new(roll, pitch, yaw));
        self.mark_dirty();
    }

    /// Publish a full controller state.
    pub fn publish(&self, transform: ViewportTransform) {
        self.orientation.store(transform.orientation);
        self.gesture.store(transform.gesture);
        self.mark_dirty();
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Returns whether a frame was requested since the last call, and clears the flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Latest published values, read once at the start of a frame.
    pub fn snapshot(&self) -> ViewportTransform {
        ViewportTransform {
            orientation: self.orientation.load(),
            gesture: self.gesture.load(),
        }
    }
}

impl Default for ViewportShared {
    fn default() -> Self {
        Self::new()
    }
}
