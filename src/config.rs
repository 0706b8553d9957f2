use serde::{Deserialize, Serialize};

/// Tunables for the deck. Every field can be overridden from storage, missing
/// fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub api_base_url: String,
    pub placeholder_image: String,
    pub log_level: String,

    /// Fraction of the screen width a card must travel to count as a swipe.
    pub swipe_threshold_ratio: f64,
    /// Horizontal release speed (px/s) above which any offset counts.
    pub flick_velocity: f64,

    pub visible_window: usize,
    pub depth_scale: f64,
    pub depth_opacity: f64,

    pub max_rotation_deg: f64,
    pub drag_min_scale: f64,
    pub exit_distance_ratio: f64,
    pub exit_duration_ms: f64,
    pub spring_stiffness: f64,
    pub spring_damping: f64,
    pub spring_mass: f64,
    pub pulse_scale: f64,
    pub pulse_duration_ms: f64,

    pub crossfade_ms: f64,

    pub tap_slop_px: f64,
    pub tap_max_ms: f64,
    pub velocity_window_ms: f64,

    pub celebration_ms: f64,
    pub particles_per_burst: usize,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            api_base_url: "/api".to_string(),
            placeholder_image: "assets/placeholder.svg".to_string(),
            log_level: "info".to_string(),
            swipe_threshold_ratio: 0.25,
            flick_velocity: 800.0,
            visible_window: 3,
            depth_scale: 0.92,
            depth_opacity: 0.75,
            max_rotation_deg: 15.0,
            drag_min_scale: 0.95,
            exit_distance_ratio: 1.5,
            exit_duration_ms: 300.0,
            spring_stiffness: 100.0,
            spring_damping: 10.0,
            spring_mass: 1.0,
            pulse_scale: 0.97,
            pulse_duration_ms: 150.0,
            crossfade_ms: 350.0,
            tap_slop_px: 10.0,
            tap_max_ms: 250.0,
            velocity_window_ms: 100.0,
            celebration_ms: 900.0,
            particles_per_burst: 24,
        }
    }
}

impl DeckConfig {
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }

    pub fn candidates_url(&self) -> String {
        format!("{}/candidates", self.api_base_url.trim_end_matches('/'))
    }

    pub fn swipes_url(&self) -> String {
        format!("{}/swipes", self.api_base_url.trim_end_matches('/'))
    }
}
