use std::collections::VecDeque;

use crate::config::DeckConfig;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl std::ops::Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }
}

/// One sample of a pan gesture. Translations are cumulative since the gesture
/// started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanSample {
    Move { translation: Vector },
    Release { translation: Vector, velocity: Vector },
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragState {
    pub offset_x: f64,
    pub offset_y: f64,
    pub active: bool,
}

impl DragState {
    pub fn offset(&self) -> Vector {
        Vector::new(self.offset_x, self.offset_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub translation: Vector,
    pub velocity: Vector,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutput {
    Dragged(DragState),
    Released(Release),
    Cancelled,
}

/// Passes pan samples straight through to a drag offset. No smoothing here,
/// the animator's spring takes care of that.
#[derive(Debug, Default)]
pub struct GestureInterpreter {
    drag: DragState,
}

impl GestureInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn is_active(&self) -> bool {
        self.drag.active
    }

    pub fn handle(&mut self, sample: PanSample) -> GestureOutput {
        match sample {
            PanSample::Move { translation } => {
                self.drag = DragState {
                    offset_x: translation.x,
                    offset_y: translation.y,
                    active: true,
                };
                GestureOutput::Dragged(self.drag)
            }
            PanSample::Release {
                translation,
                velocity,
            } => {
                self.reset();
                GestureOutput::Released(Release {
                    translation,
                    velocity,
                })
            }
            PanSample::Cancel => {
                self.reset();
                GestureOutput::Cancelled
            }
        }
    }

    pub fn reset(&mut self) {
        self.drag = DragState::default();
    }
}

/// What a finished pointer sequence turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEnd {
    /// Short press that never left the slop radius, in client coordinates.
    Tap { x: f64, y: f64 },
    Pan(PanSample),
    /// Long press without movement, or a pointer we were not tracking.
    Nothing,
}

#[derive(Debug, Clone, Copy)]
struct TrackedPointer {
    pointer_id: i32,
    start: Vector,
    started_at: f64,
    panning: bool,
}

/// Turns raw pointer events into pan samples and taps, and estimates the
/// release velocity from the most recent samples.
#[derive(Debug)]
pub struct PointerTracker {
    tap_slop: f64,
    tap_max_ms: f64,
    velocity_window_ms: f64,
    pointer: Option<TrackedPointer>,
    history: VecDeque<(f64, Vector)>,
}

impl PointerTracker {
    pub fn new(config: &DeckConfig) -> Self {
        Self {
            tap_slop: config.tap_slop_px,
            tap_max_ms: config.tap_max_ms,
            velocity_window_ms: config.velocity_window_ms,
            pointer: None,
            history: VecDeque::new(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.pointer.is_some()
    }

    /// Returns false when another pointer is already being tracked.
    pub fn down(&mut self, pointer_id: i32, x: f64, y: f64, timestamp_ms: f64) -> bool {
        if self.pointer.is_some() {
            return false;
        }
        self.pointer = Some(TrackedPointer {
            pointer_id,
            start: Vector::new(x, y),
            started_at: timestamp_ms,
            panning: false,
        });
        self.history.clear();
        self.history.push_back((timestamp_ms, Vector::new(x, y)));
        true
    }

    pub fn move_to(&mut self, pointer_id: i32, x: f64, y: f64, timestamp_ms: f64) -> Option<PanSample> {
        let pointer = self.pointer.as_mut().filter(|p| p.pointer_id == pointer_id)?;
        let translation = Vector::new(x, y) - pointer.start;
        if !pointer.panning {
            if translation.length() <= self.tap_slop {
                return None;
            }
            // Translation is measured from where the slop was crossed.
            pointer.panning = true;
            pointer.start = Vector::new(x, y);
        }
        let translation = Vector::new(x, y) - pointer.start;
        self.record(timestamp_ms, Vector::new(x, y));
        Some(PanSample::Move { translation })
    }

    pub fn up(&mut self, pointer_id: i32, x: f64, y: f64, timestamp_ms: f64) -> PointerEnd {
        let Some(pointer) = self.pointer.filter(|p| p.pointer_id == pointer_id) else {
            return PointerEnd::Nothing;
        };
        self.record(timestamp_ms, Vector::new(x, y));
        let velocity = self.velocity();
        self.pointer = None;
        self.history.clear();

        let translation = Vector::new(x, y) - pointer.start;
        if pointer.panning || translation.length() > self.tap_slop {
            PointerEnd::Pan(PanSample::Release {
                translation,
                velocity,
            })
        } else if timestamp_ms - pointer.started_at <= self.tap_max_ms {
            PointerEnd::Tap { x, y }
        } else {
            PointerEnd::Nothing
        }
    }

    /// A cancelled pan still has to be reported so the card does not stay
    /// off-centre; a cancelled tap candidate is just dropped.
    pub fn cancel(&mut self, pointer_id: i32) -> Option<PanSample> {
        let pointer = self.pointer.filter(|p| p.pointer_id == pointer_id)?;
        self.pointer = None;
        self.history.clear();
        pointer.panning.then_some(PanSample::Cancel)
    }

    fn record(&mut self, timestamp_ms: f64, position: Vector) {
        self.history.push_back((timestamp_ms, position));
        while let Some(&(oldest, _)) = self.history.front() {
            if timestamp_ms - oldest > self.velocity_window_ms && self.history.len() > 2 {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// px/s across the retained window.
    fn velocity(&self) -> Vector {
        let (Some(&(t0, p0)), Some(&(t1, p1))) = (self.history.front(), self.history.back()) else {
            return Vector::ZERO;
        };
        let dt = t1 - t0;
        if dt <= f64::EPSILON {
            return Vector::ZERO;
        }
        Vector::new((p1.x - p0.x) / dt * 1000.0, (p1.y - p0.y) / dt * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_pass_through_unfiltered() {
        let mut interpreter = GestureInterpreter::new();
        let output = interpreter.handle(PanSample::Move {
            translation: Vector::new(37.5, -4.0),
        });
        assert_eq!(
            output,
            GestureOutput::Dragged(DragState {
                offset_x: 37.5,
                offset_y: -4.0,
                active: true
            })
        );
    }

    #[test]
    fn release_and_cancel_clear_drag() {
        let mut interpreter = GestureInterpreter::new();
        interpreter.handle(PanSample::Move {
            translation: Vector::new(80.0, 10.0),
        });
        let output = interpreter.handle(PanSample::Release {
            translation: Vector::new(90.0, 12.0),
            velocity: Vector::new(300.0, 0.0),
        });
        assert!(matches!(output, GestureOutput::Released(r) if r.translation.x == 90.0));
        assert_eq!(interpreter.drag(), DragState::default());

        interpreter.handle(PanSample::Move {
            translation: Vector::new(-50.0, 0.0),
        });
        assert_eq!(interpreter.handle(PanSample::Cancel), GestureOutput::Cancelled);
        assert_eq!(interpreter.drag().offset(), Vector::ZERO);
        assert!(!interpreter.is_active());
    }

    #[test]
    fn short_still_press_is_a_tap() {
        let mut tracker = PointerTracker::new(&DeckConfig::default());
        assert!(tracker.down(1, 300.0, 200.0, 0.0));
        assert_eq!(tracker.move_to(1, 303.0, 201.0, 40.0), None);
        assert_eq!(
            tracker.up(1, 303.0, 201.0, 120.0),
            PointerEnd::Tap { x: 303.0, y: 201.0 }
        );
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn long_still_press_is_nothing() {
        let mut tracker = PointerTracker::new(&DeckConfig::default());
        tracker.down(1, 0.0, 0.0, 0.0);
        assert_eq!(tracker.up(1, 0.0, 0.0, 900.0), PointerEnd::Nothing);
    }

    #[test]
    fn pan_reports_cumulative_translation_and_velocity() {
        let mut tracker = PointerTracker::new(&DeckConfig::default());
        tracker.down(7, 100.0, 100.0, 0.0);
        assert_eq!(
            tracker.move_to(7, 130.0, 100.0, 16.0),
            Some(PanSample::Move {
                translation: Vector::ZERO
            })
        );
        assert_eq!(
            tracker.move_to(7, 160.0, 100.0, 32.0),
            Some(PanSample::Move {
                translation: Vector::new(30.0, 0.0)
            })
        );
        let end = tracker.up(7, 190.0, 100.0, 48.0);
        let PointerEnd::Pan(PanSample::Release {
            translation,
            velocity,
        }) = end
        else {
            panic!("expected release, got {end:?}");
        };
        assert_eq!(translation, Vector::new(60.0, 0.0));
        assert!((velocity.x - 1875.0).abs() < 1e-6);
    }

    #[test]
    fn pan_starts_at_slop_crossing_without_a_jump() {
        let mut tracker = PointerTracker::new(&DeckConfig::default());
        tracker.down(1, 0.0, 0.0, 0.0);
        assert_eq!(tracker.move_to(1, 8.0, 0.0, 8.0), None);
        assert_eq!(
            tracker.move_to(1, 11.0, 0.0, 16.0),
            Some(PanSample::Move {
                translation: Vector::ZERO
            })
        );
        assert_eq!(
            tracker.move_to(1, 14.0, 0.0, 24.0),
            Some(PanSample::Move {
                translation: Vector::new(3.0, 0.0)
            })
        );
    }

    #[test]
    fn flick_without_moves_still_releases() {
        let mut tracker = PointerTracker::new(&DeckConfig::default());
        tracker.down(1, 100.0, 300.0, 0.0);
        let end = tracker.up(1, 260.0, 300.0, 40.0);
        let PointerEnd::Pan(PanSample::Release {
            translation,
            velocity,
        }) = end
        else {
            panic!("expected release, got {end:?}");
        };
        assert_eq!(translation, Vector::new(160.0, 0.0));
        assert!((velocity.x - 4000.0).abs() < 1e-6);
    }

    #[test]
    fn other_pointers_are_ignored() {
        let mut tracker = PointerTracker::new(&DeckConfig::default());
        tracker.down(1, 0.0, 0.0, 0.0);
        assert!(!tracker.down(2, 10.0, 10.0, 5.0));
        assert_eq!(tracker.move_to(2, 80.0, 0.0, 10.0), None);
        assert_eq!(tracker.up(2, 80.0, 0.0, 20.0), PointerEnd::Nothing);
        assert!(tracker.is_tracking());
    }

    #[test]
    fn cancel_reports_only_started_pans() {
        let mut tracker = PointerTracker::new(&DeckConfig::default());
        tracker.down(1, 0.0, 0.0, 0.0);
        assert_eq!(tracker.cancel(1), None);

        tracker.down(1, 0.0, 0.0, 0.0);
        tracker.move_to(1, 50.0, 0.0, 16.0);
        assert_eq!(tracker.cancel(1), Some(PanSample::Cancel));
        assert!(!tracker.is_tracking());
    }
}
