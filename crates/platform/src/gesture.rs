//! Translate raw pointer/wheel input into [`ViewportEvent`]s.

use corelib::ViewportEvent;
use winit::{
    dpi::PhysicalPosition,
    event::{MouseScrollDelta, TouchPhase},
};

/// Zoom per wheel notch.
const WHEEL_STEP: f32 = 1.1;
/// Pixels of touchpad scroll that count as one notch.
const PIXELS_PER_LINE: f64 = 40.0;

/// Pinch ratio for one wheel event; wheel up zooms in.
pub fn wheel_ratio(delta: MouseScrollDelta) -> f32 {
    let lines = match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32,
    };
    WHEEL_STEP.powf(lines)
}

/// Touchpad pinch: winit reports the incremental magnification delta.
pub fn pinch_events(delta: f64, phase: TouchPhase) -> Vec<ViewportEvent> {
    match phase {
        TouchPhase::Started => vec![ViewportEvent::PinchBegin],
        TouchPhase::Moved => vec![ViewportEvent::PinchUpdate {
            scale_ratio: (1.0 + delta) as f32,
        }],
        TouchPhase::Ended | TouchPhase::Cancelled => vec![ViewportEvent::PinchEnd],
    }
}

/// Left-button drag tracking. Cursor positions arrive independently of button state.
#[derive(Debug, Default)]
pub struct PointerTracker {
    last: Option<PhysicalPosition<f64>>,
    dragging: bool,
}

impl PointerTracker {
    pub fn press(&mut self) -> Option<ViewportEvent> {
        if self.dragging {
            return None;
        }
        self.dragging = true;
        Some(ViewportEvent::DragBegin)
    }

    pub fn release(&mut self) -> Option<ViewportEvent> {
        std::mem::take(&mut self.dragging).then_some(ViewportEvent::DragEnd)
    }

    pub fn leave(&mut self) -> Option<ViewportEvent> {
        self.last = None;
        std::mem::take(&mut self.dragging).then_some(ViewportEvent::DragCancel)
    }

    /// Record a cursor position; yields a drag update when the button is held.
    pub fn moved(
        &mut self,
        position: PhysicalPosition<f64>,
        view_width: u32,
        view_height: u32,
    ) -> Option<ViewportEvent> {
        let previous = self.last.replace(position);
        if !self.dragging {
            return None;
        }
        let previous = previous?;
        Some(ViewportEvent::DragUpdate {
            dx: (position.x - previous.x) as f32,
            dy: (position.y - previous.y) as f32,
            view_width: view_width as f32,
            view_height: view_height as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_notches_compound() {
        assert!((wheel_ratio(MouseScrollDelta::LineDelta(0.0, 1.0)) - 1.1).abs() < 1e-6);
        assert!((wheel_ratio(MouseScrollDelta::LineDelta(0.0, -1.0)) - 1.0 / 1.1).abs() < 1e-6);
        let px = wheel_ratio(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0)));
        assert!((px - 1.21).abs() < 1e-5);
    }

    #[test]
    fn pinch_phases_map_to_begin_update_end() {
        assert_eq!(pinch_events(0.0, TouchPhase::Started), vec![ViewportEvent::PinchBegin]);
        assert_eq!(
            pinch_events(0.25, TouchPhase::Moved),
            vec![ViewportEvent::PinchUpdate { scale_ratio: 1.25 }]
        );
        assert_eq!(pinch_events(0.0, TouchPhase::Cancelled), vec![ViewportEvent::PinchEnd]);
    }

    #[test]
    fn drag_reports_pixel_deltas_only_while_pressed() {
        let mut p = PointerTracker::default();
        assert_eq!(p.moved(PhysicalPosition::new(10.0, 10.0), 100, 50), None);
        assert_eq!(p.press(), Some(ViewportEvent::DragBegin));
        assert_eq!(p.press(), None);
        assert_eq!(
            p.moved(PhysicalPosition::new(15.0, 30.0), 100, 50),
            Some(ViewportEvent::DragUpdate {
                dx: 5.0,
                dy: 20.0,
                view_width: 100.0,
                view_height: 50.0,
            })
        );
        assert_eq!(p.release(), Some(ViewportEvent::DragEnd));
        assert_eq!(p.release(), None);
    }

    #[test]
    fn leaving_the_window_cancels_the_drag() {
        let mut p = PointerTracker::default();
        p.press();
        assert_eq!(p.leave(), Some(ViewportEvent::DragCancel));
        // no stale position after re-entry
        p.press();
        assert_eq!(p.moved(PhysicalPosition::new(1.0, 1.0), 10, 10), None);
    }
}
