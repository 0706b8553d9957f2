use crate::config::DeckConfig;
use crate::decision::SwipeOutcome;
use crate::gesture::Vector;

const SPRING_STEP_MS: f64 = 4.0;
const REST_DISTANCE: f64 = 0.5;
const REST_SPEED: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorPhase {
    Idle,
    Dragging,
    SettlingBack,
    ExitingOffscreen,
    /// Exit tween finished; the card is waiting to be recycled.
    Exited,
}

/// What the host applies to a card element each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotate_deg: f64,
    pub scale: f64,
}

impl CardTransform {
    pub const REST: CardTransform = CardTransform {
        translate_x: 0.0,
        translate_y: 0.0,
        rotate_deg: 0.0,
        scale: 1.0,
    };

    pub fn depth(scale: f64) -> Self {
        Self {
            scale,
            ..Self::REST
        }
    }

    pub fn css(&self) -> String {
        format!(
            "translate({:.1}px, {:.1}px) rotate({:.2}deg) scale({:.3})",
            self.translate_x, self.translate_y, self.rotate_deg, self.scale
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorEvent {
    Settled,
    Exited(SwipeOutcome),
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    stiffness: f64,
    damping: f64,
    mass: f64,
}

impl Spring {
    /// Semi-implicit Euler towards zero.
    fn step(&self, position: &mut f64, velocity: &mut f64, dt_s: f64) {
        let force = -self.stiffness * *position - self.damping * *velocity;
        *velocity += force / self.mass * dt_s;
        *position += *velocity * dt_s;
    }
}

#[derive(Debug, Clone, Copy)]
struct ExitTween {
    outcome: SwipeOutcome,
    from: Vector,
    to: Vector,
    elapsed_ms: f64,
}

fn ease_out_cubic(progress: f64) -> f64 {
    1.0 - (1.0 - progress).powi(3)
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Transform state for the interactive card.
#[derive(Debug)]
pub struct CardAnimator {
    spring: Spring,
    max_rotation_deg: f64,
    drag_min_scale: f64,
    exit_distance_ratio: f64,
    exit_duration_ms: f64,
    pulse_scale: f64,
    pulse_duration_ms: f64,
    screen_width: f64,

    phase: AnimatorPhase,
    offset: Vector,
    velocity: Vector,
    exit: Option<ExitTween>,
    pulse_elapsed_ms: Option<f64>,
}

impl CardAnimator {
    pub fn new(config: &DeckConfig, screen_width: f64) -> Self {
        Self {
            spring: Spring {
                stiffness: config.spring_stiffness,
                damping: config.spring_damping,
                mass: config.spring_mass.max(f64::EPSILON),
            },
            max_rotation_deg: config.max_rotation_deg,
            drag_min_scale: config.drag_min_scale,
            exit_distance_ratio: config.exit_distance_ratio,
            exit_duration_ms: config.exit_duration_ms,
            pulse_scale: config.pulse_scale,
            pulse_duration_ms: config.pulse_duration_ms,
            screen_width,
            phase: AnimatorPhase::Idle,
            offset: Vector::ZERO,
            velocity: Vector::ZERO,
            exit: None,
            pulse_elapsed_ms: None,
        }
    }

    pub fn phase(&self) -> AnimatorPhase {
        self.phase
    }

    pub fn offset(&self) -> Vector {
        self.offset
    }

    pub fn set_screen_width(&mut self, screen_width: f64) {
        if screen_width > 0.0 {
            self.screen_width = screen_width;
        }
    }

    /// A settling card can be grabbed again; a leaving one cannot.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self.phase,
            AnimatorPhase::Idle | AnimatorPhase::Dragging | AnimatorPhase::SettlingBack
        )
    }

    pub fn is_animating(&self) -> bool {
        matches!(
            self.phase,
            AnimatorPhase::SettlingBack | AnimatorPhase::ExitingOffscreen
        ) || self.pulse_elapsed_ms.is_some()
    }

    pub fn begin_drag(&mut self) -> bool {
        if !self.is_interactive() {
            return false;
        }
        self.phase = AnimatorPhase::Dragging;
        self.velocity = Vector::ZERO;
        true
    }

    pub fn drag_to(&mut self, offset: Vector) {
        if self.phase == AnimatorPhase::Dragging {
            self.offset = offset;
        }
    }

    pub fn release(&mut self, outcome: SwipeOutcome, velocity: Vector) {
        if self.phase != AnimatorPhase::Dragging {
            return;
        }
        if outcome.is_terminal() {
            self.phase = AnimatorPhase::ExitingOffscreen;
            self.exit = Some(ExitTween {
                outcome,
                from: self.offset,
                to: Vector::new(
                    outcome.sign() * self.exit_distance_ratio * self.screen_width,
                    self.offset.y,
                ),
                elapsed_ms: 0.0,
            });
        } else {
            self.phase = AnimatorPhase::SettlingBack;
            self.velocity = velocity;
        }
    }

    pub fn cancel(&mut self) {
        if self.phase == AnimatorPhase::Dragging {
            self.phase = AnimatorPhase::SettlingBack;
            self.velocity = Vector::ZERO;
        }
    }

    pub fn pulse(&mut self) {
        if self.is_interactive() && self.phase != AnimatorPhase::Dragging {
            self.pulse_elapsed_ms = Some(0.0);
        }
    }

    /// Back to rest for the next card.
    pub fn reset(&mut self) {
        self.phase = AnimatorPhase::Idle;
        self.offset = Vector::ZERO;
        self.velocity = Vector::ZERO;
        self.exit = None;
        self.pulse_elapsed_ms = None;
    }

    pub fn tick(&mut self, dt_ms: f64) -> Option<AnimatorEvent> {
        if dt_ms <= 0.0 {
            return None;
        }

        if let Some(elapsed) = self.pulse_elapsed_ms.as_mut() {
            *elapsed += dt_ms;
            if *elapsed >= self.pulse_duration_ms {
                self.pulse_elapsed_ms = None;
            }
        }

        match self.phase {
            AnimatorPhase::SettlingBack => self.tick_spring(dt_ms),
            AnimatorPhase::ExitingOffscreen => self.tick_exit(dt_ms),
            _ => None,
        }
    }

    fn tick_spring(&mut self, dt_ms: f64) -> Option<AnimatorEvent> {
        let mut remaining = dt_ms;
        while remaining > 0.0 {
            let step = remaining.min(SPRING_STEP_MS);
            let dt_s = step / 1000.0;
            self.spring.step(&mut self.offset.x, &mut self.velocity.x, dt_s);
            self.spring.step(&mut self.offset.y, &mut self.velocity.y, dt_s);
            remaining -= step;
        }

        let at_rest = self.offset.x.abs() < REST_DISTANCE
            && self.offset.y.abs() < REST_DISTANCE
            && self.velocity.x.abs() < REST_SPEED
            && self.velocity.y.abs() < REST_SPEED;
        if at_rest {
            self.offset = Vector::ZERO;
            self.velocity = Vector::ZERO;
            self.phase = AnimatorPhase::Idle;
            Some(AnimatorEvent::Settled)
        } else {
            None
        }
    }

    fn tick_exit(&mut self, dt_ms: f64) -> Option<AnimatorEvent> {
        let exit = self.exit.as_mut()?;
        exit.elapsed_ms += dt_ms;
        let progress = if self.exit_duration_ms <= 0.0 {
            1.0
        } else {
            (exit.elapsed_ms / self.exit_duration_ms).min(1.0)
        };
        let eased = ease_out_cubic(progress);
        self.offset = Vector::new(
            lerp(exit.from.x, exit.to.x, eased),
            lerp(exit.from.y, exit.to.y, eased),
        );

        if progress >= 1.0 {
            let outcome = exit.outcome;
            self.exit = None;
            self.phase = AnimatorPhase::Exited;
            Some(AnimatorEvent::Exited(outcome))
        } else {
            None
        }
    }

    pub fn rotation_deg(&self) -> f64 {
        let half = self.screen_width / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        (self.offset.x / half * self.max_rotation_deg)
            .clamp(-self.max_rotation_deg, self.max_rotation_deg)
    }

    pub fn scale(&self) -> f64 {
        let half = self.screen_width / 2.0;
        let travel = if half > 0.0 {
            (self.offset.x.abs() / half).min(1.0)
        } else {
            0.0
        };
        let drag_scale = 1.0 - (1.0 - self.drag_min_scale) * travel;
        let pulse = match self.pulse_elapsed_ms {
            Some(elapsed) if self.pulse_duration_ms > 0.0 => {
                let progress = (elapsed / self.pulse_duration_ms).min(1.0);
                lerp(self.pulse_scale, 1.0, progress)
            }
            _ => 1.0,
        };
        drag_scale * pulse
    }

    pub fn transform(&self) -> CardTransform {
        CardTransform {
            translate_x: self.offset.x,
            translate_y: self.offset.y,
            rotate_deg: self.rotation_deg(),
            scale: self.scale(),
        }
    }
}
