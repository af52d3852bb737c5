//! Gesture state machine: pinch scales, drag pans, orientation overwrites.

use crate::{
    Vec2,
    transform::{GestureTransform, Orientation, ViewportTransform},
};

/// What the user is currently doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureMode {
    #[default]
    Idle,
    Scaling,
    Panning,
}

/// Input delivered to [`ViewportController::apply`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewportEvent {
    PinchBegin,
    /// Incremental ratio since the previous update.
    PinchUpdate {
        scale_ratio: f32,
    },
    PinchEnd,
    DragBegin,
    /// Pointer movement in pixels plus the current view size.
    DragUpdate {
        dx: f32,
        dy: f32,
        view_width: f32,
        view_height: f32,
    },
    DragEnd,
    DragCancel,
    /// Accepted in every mode; last value wins.
    Orientation(Orientation),
    /// Back to unit scale and no pan.
    Reset,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportController {
    mode: GestureMode,
    gesture: GestureTransform,
    orientation: Orientation,
}

impl ViewportController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn gesture(&self) -> GestureTransform {
        self.gesture
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn transform(&self) -> ViewportTransform {
        ViewportTransform {
            orientation: self.orientation,
            gesture: self.gesture,
        }
    }

    /// Feed one event. Returns `true` when the visible transform changed.
    pub fn apply(&mut self, event: ViewportEvent) -> bool {
        use GestureMode::*;
        use ViewportEvent as E;

        match (self.mode, event) {
            (_, E::Orientation(o)) => {
                let changed = self.orientation != o;
                self.orientation = o;
                changed
            }
            (_, E::Reset) => {
                let changed = self.gesture != GestureTransform::IDENTITY;
                self.gesture = GestureTransform::IDENTITY;
                self.mode = Idle;
                changed
            }

            // pinch wins over an in-progress drag
            (Idle | Panning, E::PinchBegin) => {
                self.mode = Scaling;
                false
            }
            (Scaling, E::PinchUpdate { scale_ratio }) => {
                if !scale_ratio.is_finite() || scale_ratio <= 0.0 {
                    return false;
                }
                let next = self.gesture.scaled_by(scale_ratio);
                let changed = next != self.gesture;
                self.gesture = next;
                changed
            }
            (Scaling, E::PinchEnd) => {
                self.mode = Idle;
                false
            }

            (Idle, E::DragBegin) => {
                self.mode = Panning;
                false
            }
            (
                Panning,
                E::DragUpdate {
                    dx,
                    dy,
                    view_width,
                    view_height,
                },
            ) => {
                if view_width <= 0.0 || view_height <= 0.0 {
                    return false;
                }
                let delta = Vec2::new(dx / view_width * 2.0, -dy / view_height * 2.0);
                if !delta.is_finite() || delta == Vec2::ZERO {
                    return false;
                }
                self.gesture = self.gesture.panned_by(delta);
                true
            }
            (Panning, E::DragEnd | E::DragCancel) => {
                self.mode = Idle;
                false
            }

            // Everything else is out of order for the current mode.
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{MAX_SCALE, MIN_SCALE};

    fn pinch(c: &mut ViewportController, ratio: f32) -> bool {
        c.apply(ViewportEvent::PinchUpdate { scale_ratio: ratio })
    }

    #[test]
    fn pinch_cycle_scales_and_returns_to_idle() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::PinchBegin);
        assert_eq!(c.mode(), GestureMode::Scaling);
        assert!(pinch(&mut c, 2.0));
        assert!(pinch(&mut c, 1.5));
        assert!((c.gesture().scale - 3.0).abs() < 1e-6);
        c.apply(ViewportEvent::PinchEnd);
        assert_eq!(c.mode(), GestureMode::Idle);
    }

    #[test]
    fn scale_never_leaves_bounds() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::PinchBegin);
        for _ in 0..50 {
            pinch(&mut c, 10.0);
            assert!(c.gesture().scale <= MAX_SCALE);
        }
        assert_eq!(c.gesture().scale, MAX_SCALE);
        // saturated: nothing changes any more
        assert!(!pinch(&mut c, 10.0));

        for _ in 0..50 {
            pinch(&mut c, 0.01);
            assert!(c.gesture().scale >= MIN_SCALE);
        }
        assert_eq!(c.gesture().scale, MIN_SCALE);
    }

    #[test]
    fn bogus_ratios_are_ignored() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::PinchBegin);
        for r in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(!pinch(&mut c, r));
        }
        assert_eq!(c.gesture().scale, 1.0);
    }

    #[test]
    fn pinch_update_outside_scaling_is_ignored() {
        let mut c = ViewportController::new();
        assert!(!pinch(&mut c, 2.0));
        assert_eq!(c.gesture().scale, 1.0);
    }

    #[test]
    fn drag_pans_in_normalized_units_with_y_up() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::DragBegin);
        assert_eq!(c.mode(), GestureMode::Panning);
        let moved = c.apply(ViewportEvent::DragUpdate {
            dx: 100.0,
            dy: 50.0,
            view_width: 400.0,
            view_height: 200.0,
        });
        assert!(moved);
        assert_eq!(c.gesture().pan, Vec2::new(0.5, -0.5));
        c.apply(ViewportEvent::DragCancel);
        assert_eq!(c.mode(), GestureMode::Idle);
    }

    #[test]
    fn drag_begin_while_scaling_is_ignored() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::PinchBegin);
        c.apply(ViewportEvent::DragBegin);
        assert_eq!(c.mode(), GestureMode::Scaling);
        let moved = c.apply(ViewportEvent::DragUpdate {
            dx: 10.0,
            dy: 10.0,
            view_width: 100.0,
            view_height: 100.0,
        });
        assert!(!moved);
        assert_eq!(c.gesture().pan, Vec2::ZERO);
    }

    #[test]
    fn pinch_interrupts_drag() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::DragBegin);
        c.apply(ViewportEvent::PinchBegin);
        assert_eq!(c.mode(), GestureMode::Scaling);
    }

    #[test]
    fn zero_sized_view_does_not_pan() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::DragBegin);
        let moved = c.apply(ViewportEvent::DragUpdate {
            dx: 10.0,
            dy: 10.0,
            view_width: 0.0,
            view_height: 100.0,
        });
        assert!(!moved);
    }

    #[test]
    fn orientation_overwrites_in_any_mode() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::PinchBegin);
        c.apply(ViewportEvent::Orientation(Orientation::new(1.0, 2.0, 3.0)));
        c.apply(ViewportEvent::Orientation(Orientation::new(-4.0, 5.0, 0.0)));
        assert_eq!(c.orientation(), Orientation::new(-4.0, 5.0, 0.0));
        assert_eq!(c.mode(), GestureMode::Scaling);
    }

    #[test]
    fn reset_restores_identity_gesture() {
        let mut c = ViewportController::new();
        c.apply(ViewportEvent::PinchBegin);
        pinch(&mut c, 3.0);
        assert!(c.apply(ViewportEvent::Reset));
        assert_eq!(c.gesture(), GestureTransform::IDENTITY);
        assert_eq!(c.mode(), GestureMode::Idle);
        assert!(!c.apply(ViewportEvent::Reset));
    }
}
