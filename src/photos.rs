use std::collections::HashMap;

use crate::data::CandidateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapZone {
    Left,
    Right,
}

impl TapZone {
    /// `x` is relative to the card's left edge.
    pub fn from_position(x: f64, card_width: f64) -> Self {
        if x < card_width / 2.0 {
            TapZone::Left
        } else {
            TapZone::Right
        }
    }
}

/// Two concurrent opacity tweens: the outgoing photo fades out while the
/// incoming one fades in over the same window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossfade {
    pub from: usize,
    pub to: usize,
    elapsed_ms: f64,
    duration_ms: f64,
}

impl Crossfade {
    fn progress(&self) -> f64 {
        if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        }
    }

    pub fn outgoing_opacity(&self) -> f64 {
        1.0 - self.progress()
    }

    pub fn incoming_opacity(&self) -> f64 {
        self.progress()
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Photo index for the top card, driven by taps and reset whenever a
/// different candidate reaches the top.
#[derive(Debug)]
pub struct ImageIndexController {
    candidate: Option<CandidateId>,
    photo_count: usize,
    index: usize,
    crossfade: Option<Crossfade>,
    crossfade_ms: f64,
}

impl ImageIndexController {
    pub fn new(crossfade_ms: f64) -> Self {
        Self {
            candidate: None,
            photo_count: 0,
            index: 0,
            crossfade: None,
            crossfade_ms,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn candidate(&self) -> Option<&CandidateId> {
        self.candidate.as_ref()
    }

    pub fn crossfade(&self) -> Option<&Crossfade> {
        self.crossfade.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.crossfade.is_some()
    }

    /// Returns true when the top candidate changed and the index was reset.
    pub fn sync_top(&mut self, top: Option<(&CandidateId, usize)>) -> bool {
        let changed = self.candidate.as_ref() != top.map(|(id, _)| id);
        if changed {
            self.candidate = top.map(|(id, _)| id.clone());
            self.index = 0;
            self.crossfade = None;
        }
        self.photo_count = top.map(|(_, count)| count).unwrap_or(0);
        if self.index >= self.photo_count {
            self.index = 0;
        }
        changed
    }

    pub fn tap(&mut self, zone: TapZone) -> bool {
        if self.photo_count < 2 {
            return false;
        }
        let previous = self.index;
        self.index = match zone {
            TapZone::Left => (self.index + self.photo_count - 1) % self.photo_count,
            TapZone::Right => (self.index + 1) % self.photo_count,
        };
        self.crossfade = Some(Crossfade {
            from: previous,
            to: self.index,
            elapsed_ms: 0.0,
            duration_ms: self.crossfade_ms,
        });
        true
    }

    pub fn tick(&mut self, dt_ms: f64) {
        if let Some(fade) = self.crossfade.as_mut() {
            fade.elapsed_ms += dt_ms.max(0.0);
            if fade.is_finished() {
                self.crossfade = None;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLoadState {
    Loading,
    Loaded,
    Failed,
}

/// How the host should present a photo right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub url: String,
    pub blurred: bool,
}

#[derive(Debug, Default)]
pub struct ImageLoadTracker {
    states: HashMap<String, ImageLoadState>,
}

impl ImageLoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, url: &str) -> ImageLoadState {
        self.states
            .get(url)
            .copied()
            .unwrap_or(ImageLoadState::Loading)
    }

    pub fn mark_loaded(&mut self, url: &str) {
        self.states.insert(url.to_string(), ImageLoadState::Loaded);
    }

    pub fn mark_failed(&mut self, url: &str) {
        log::debug!("photo failed to load, using placeholder: {url}");
        self.states.insert(url.to_string(), ImageLoadState::Failed);
    }

    pub fn source(&self, url: Option<&str>, placeholder: &str) -> ImageSource {
        match url {
            Some(url) => match self.state(url) {
                ImageLoadState::Failed => ImageSource {
                    url: placeholder.to_string(),
                    blurred: false,
                },
                state => ImageSource {
                    url: url.to_string(),
                    blurred: state == ImageLoadState::Loading,
                },
            },
            None => ImageSource {
                url: placeholder.to_string(),
                blurred: false,
            },
        }
    }
}
