use std::rc::Rc;

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use wasm_bindgen_futures::spawn_local;

use crate::config::DeckConfig;
use crate::data::{post_decision, CandidateId, DecisionRecord, Direction};
use crate::decision::SwipeOutcome;
use crate::deck::CardDeck;

/// Receives committed swipe decisions. Implementations must return
/// immediately; delivery happens in the background.
pub trait DecisionSink {
    fn dispatch(&self, record: DecisionRecord);
}

/// Posts decisions to the backend. Failures are logged and dropped, the card
/// is already gone by the time a response could arrive.
#[derive(Debug, Clone)]
pub struct HttpDecisionSink {
    url: String,
}

impl HttpDecisionSink {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl DecisionSink for HttpDecisionSink {
    fn dispatch(&self, record: DecisionRecord) {
        let url = self.url.clone();
        spawn_local(async move {
            match post_decision(&url, &record).await {
                Ok(()) => debug!(
                    "delivered {:?} for {}",
                    record.direction, record.candidate_id
                ),
                Err(err) => warn!(
                    "swipe decision for {} was not delivered: {}",
                    record.candidate_id, err
                ),
            }
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub angle_rad: f64,
    pub distance: f64,
    pub size: f64,
    pub hue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleFrame {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub hue: f64,
    pub opacity: f64,
}

/// One burst per right swipe. Removes itself once its time is up.
#[derive(Debug, Clone, PartialEq)]
pub struct Celebration {
    pub id: u64,
    particles: Vec<Particle>,
    elapsed_ms: f64,
    duration_ms: f64,
}

impl Celebration {
    fn progress(&self) -> f64 {
        if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    pub fn particles(&self) -> impl Iterator<Item = ParticleFrame> + '_ {
        let progress = self.progress();
        let travel = 1.0 - (1.0 - progress).powi(2);
        self.particles.iter().map(move |particle| ParticleFrame {
            x: particle.angle_rad.cos() * particle.distance * travel,
            y: particle.angle_rad.sin() * particle.distance * travel,
            size: particle.size,
            hue: particle.hue,
            opacity: 1.0 - progress,
        })
    }
}

pub struct SwipeEffectsCoordinator {
    sink: Rc<dyn DecisionSink>,
    celebrations: Vec<Celebration>,
    next_celebration: u64,
    celebration_ms: f64,
    particles_per_burst: usize,
    rng: SmallRng,
}

impl SwipeEffectsCoordinator {
    pub fn new(config: &DeckConfig, sink: Rc<dyn DecisionSink>) -> Self {
        Self {
            sink,
            celebrations: Vec::new(),
            next_celebration: 0,
            celebration_ms: config.celebration_ms,
            particles_per_burst: config.particles_per_burst,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn celebrations(&self) -> &[Celebration] {
        &self.celebrations
    }

    pub fn is_animating(&self) -> bool {
        !self.celebrations.is_empty()
    }

    /// Runs once a card has left the screen. Returns false when the outcome
    /// is not terminal or the candidate was already removed, in which case
    /// nothing else happens.
    pub fn on_exit_complete(
        &mut self,
        deck: &mut CardDeck,
        id: &CandidateId,
        outcome: SwipeOutcome,
    ) -> bool {
        let Some(direction) = Direction::from_outcome(outcome) else {
            return false;
        };
        if !deck.remove_candidate(id) {
            debug!("ignoring repeated completion for {id}");
            return false;
        }

        self.sink.dispatch(DecisionRecord {
            candidate_id: id.clone(),
            direction,
        });

        if outcome == SwipeOutcome::Right {
            self.celebrate();
        }
        true
    }

    fn celebrate(&mut self) {
        let particles = (0..self.particles_per_burst)
            .map(|_| Particle {
                angle_rad: self.rng.gen_range(0.0..std::f64::consts::TAU),
                distance: self.rng.gen_range(60.0..180.0),
                size: self.rng.gen_range(6.0..14.0),
                hue: self.rng.gen_range(320.0..380.0) % 360.0,
            })
            .collect();
        self.celebrations.push(Celebration {
            id: self.next_celebration,
            particles,
            elapsed_ms: 0.0,
            duration_ms: self.celebration_ms,
        });
        self.next_celebration += 1;
    }

    pub fn tick(&mut self, dt_ms: f64) {
        for celebration in &mut self.celebrations {
            celebration.elapsed_ms += dt_ms.max(0.0);
        }
        self.celebrations.retain(|celebration| !celebration.is_finished());
    }
}
