use crate::config::DeckConfig;

const SWIPE_THRESHOLD_RATIO: f64 = 0.25;
const FLICK_VELOCITY: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeOutcome {
    None,
    Left,
    Right,
}

impl SwipeOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SwipeOutcome::None)
    }

    /// +1 for right, -1 for left, 0 for none.
    pub fn sign(self) -> f64 {
        match self {
            SwipeOutcome::None => 0.0,
            SwipeOutcome::Left => -1.0,
            SwipeOutcome::Right => 1.0,
        }
    }
}

/// Release heuristic: a swipe registers on distance or on speed, and the sign
/// of the offset picks the side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipePolicy {
    pub threshold_ratio: f64,
    pub flick_velocity: f64,
}

impl Default for SwipePolicy {
    fn default() -> Self {
        Self {
            threshold_ratio: SWIPE_THRESHOLD_RATIO,
            flick_velocity: FLICK_VELOCITY,
        }
    }
}

impl SwipePolicy {
    pub fn from_config(config: &DeckConfig) -> Self {
        Self {
            threshold_ratio: config.swipe_threshold_ratio,
            flick_velocity: config.flick_velocity,
        }
    }

    pub fn threshold(&self, screen_width: f64) -> f64 {
        screen_width * self.threshold_ratio
    }

    pub fn decide(&self, offset_x: f64, velocity_x: f64, screen_width: f64) -> SwipeOutcome {
        let threshold = self.threshold(screen_width);
        let flicked = velocity_x.abs() > self.flick_velocity;

        if offset_x > threshold || (offset_x > 0.0 && flicked) {
            SwipeOutcome::Right
        } else if offset_x < -threshold || (offset_x < 0.0 && flicked) {
            SwipeOutcome::Left
        } else {
            SwipeOutcome::None
        }
    }
}

pub fn decide(offset_x: f64, velocity_x: f64, screen_width: f64) -> SwipeOutcome {
    SwipePolicy::default().decide(offset_x, velocity_x, screen_width)
}
