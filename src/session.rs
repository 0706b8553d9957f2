use std::rc::Rc;

use log::{debug, info};

use crate::animator::{AnimatorEvent, AnimatorPhase, CardAnimator, CardTransform};
use crate::config::DeckConfig;
use crate::data::{Candidate, CandidateId};
use crate::decision::{SwipeOutcome, SwipePolicy};
use crate::deck::CardDeck;
use crate::effects::{Celebration, DecisionSink, SwipeEffectsCoordinator};
use crate::gesture::{
    GestureInterpreter, GestureOutput, PanSample, PointerEnd, PointerTracker, Vector,
};
use crate::photos::{Crossfade, ImageIndexController, ImageLoadTracker, ImageSource, TapZone};
use crate::storage::StoredSessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Outcome decided at release; the card is leaving.
    Committed {
        id: CandidateId,
        outcome: SwipeOutcome,
    },
    /// Card finished leaving and is out of the deck.
    Removed {
        id: CandidateId,
        outcome: SwipeOutcome,
    },
    Exhausted,
}

/// Render state of one visible card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFrame {
    pub candidate_id: CandidateId,
    pub depth: usize,
    pub interactive: bool,
    pub transform: CardTransform,
    pub opacity: f64,
    pub photo_index: usize,
    pub crossfade: Option<Crossfade>,
}

/// The swipe deck engine: pointer input in, card frames out.
pub struct SwipeSession {
    config: DeckConfig,
    policy: SwipePolicy,
    screen_width: f64,
    deck: CardDeck,
    interpreter: GestureInterpreter,
    tracker: PointerTracker,
    animator: CardAnimator,
    /// Animator offset when the current drag began; pan translations are
    /// added to it.
    drag_baseline: Vector,
    committed: Option<(CandidateId, SwipeOutcome)>,
    photos: ImageIndexController,
    images: ImageLoadTracker,
    effects: SwipeEffectsCoordinator,
    ledger: StoredSessionState,
    events: Vec<SessionEvent>,
}

impl SwipeSession {
    pub fn new(
        config: DeckConfig,
        screen_width: f64,
        sink: Rc<dyn DecisionSink>,
        ledger: StoredSessionState,
        candidates: Vec<Candidate>,
    ) -> Self {
        let deck = CardDeck::with_window(ledger.undecided(candidates), config.visible_window);
        let mut session = Self {
            policy: SwipePolicy::from_config(&config),
            screen_width,
            deck,
            interpreter: GestureInterpreter::new(),
            tracker: PointerTracker::new(&config),
            animator: CardAnimator::new(&config, screen_width),
            drag_baseline: Vector::ZERO,
            committed: None,
            photos: ImageIndexController::new(config.crossfade_ms),
            images: ImageLoadTracker::new(),
            effects: SwipeEffectsCoordinator::new(&config, sink),
            ledger,
            events: Vec::new(),
            config,
        };
        info!("deck loaded with {} candidates", session.deck.len());
        session.sync_top();
        session.check_exhausted();
        session
    }

    pub fn deck(&self) -> &CardDeck {
        &self.deck
    }

    pub fn ledger(&self) -> &StoredSessionState {
        &self.ledger
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub fn animator_phase(&self) -> AnimatorPhase {
        self.animator.phase()
    }

    pub fn photo_index(&self) -> usize {
        self.photos.index()
    }

    pub fn celebrations(&self) -> &[Celebration] {
        self.effects.celebrations()
    }

    pub fn images_mut(&mut self) -> &mut ImageLoadTracker {
        &mut self.images
    }

    pub fn photo_source(&self, candidate: &Candidate, index: usize) -> ImageSource {
        self.images
            .source(candidate.photo(index), &self.config.placeholder_image)
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating() || self.photos.is_animating() || self.effects.is_animating()
    }

    pub fn set_screen_width(&mut self, screen_width: f64) {
        if screen_width > 0.0 {
            self.screen_width = screen_width;
            self.animator.set_screen_width(screen_width);
        }
    }

    /// Adds a fresh batch from the candidate source, skipping anything
    /// decided earlier in the session.
    pub fn refill(&mut self, candidates: Vec<Candidate>) -> usize {
        let added = self.deck.extend(self.ledger.undecided(candidates));
        info!("refill added {added} candidates");
        self.sync_top();
        if added == 0 && self.deck.is_empty() {
            self.events.push(SessionEvent::Exhausted);
        }
        added
    }

    fn top_accepts_input(&self) -> bool {
        self.deck.top().is_some() && self.committed.is_none() && self.animator.is_interactive()
    }

    pub fn pointer_down(&mut self, pointer_id: i32, x: f64, y: f64, timestamp_ms: f64) -> bool {
        if !self.top_accepts_input() {
            return false;
        }
        self.tracker.down(pointer_id, x, y, timestamp_ms)
    }

    pub fn pointer_move(&mut self, pointer_id: i32, x: f64, y: f64, timestamp_ms: f64) {
        if let Some(sample) = self.tracker.move_to(pointer_id, x, y, timestamp_ms) {
            self.apply_pan(sample);
        }
    }

    /// `card_left` and `card_width` locate the top card so a tap can be
    /// mapped to a half.
    pub fn pointer_up(
        &mut self,
        pointer_id: i32,
        x: f64,
        y: f64,
        timestamp_ms: f64,
        card_left: f64,
        card_width: f64,
    ) {
        match self.tracker.up(pointer_id, x, y, timestamp_ms) {
            PointerEnd::Tap { x, .. } => self.tap(TapZone::from_position(x - card_left, card_width)),
            PointerEnd::Pan(sample) => self.apply_pan(sample),
            PointerEnd::Nothing => {}
        }
    }

    pub fn pointer_cancel(&mut self, pointer_id: i32) {
        if let Some(sample) = self.tracker.cancel(pointer_id) {
            self.apply_pan(sample);
        }
    }

    pub fn apply_pan(&mut self, sample: PanSample) {
        match self.interpreter.handle(sample) {
            GestureOutput::Dragged(drag) => {
                if !self.ensure_dragging() {
                    self.interpreter.reset();
                    return;
                }
                self.animator.drag_to(self.drag_baseline + drag.offset());
            }
            GestureOutput::Released(release) => {
                // A quick flick can end before any move sample arrived.
                if !self.ensure_dragging() {
                    return;
                }
                let offset = self.drag_baseline + release.translation;
                self.animator.drag_to(offset);
                let outcome = self
                    .policy
                    .decide(offset.x, release.velocity.x, self.screen_width);
                self.animator.release(outcome, release.velocity);
                if outcome.is_terminal() {
                    self.commit(outcome);
                }
            }
            GestureOutput::Cancelled => self.animator.cancel(),
        }
    }

    fn ensure_dragging(&mut self) -> bool {
        if self.animator.phase() == AnimatorPhase::Dragging {
            return true;
        }
        if !self.top_accepts_input() || !self.animator.begin_drag() {
            return false;
        }
        self.drag_baseline = self.animator.offset();
        true
    }

    pub fn tap(&mut self, zone: TapZone) {
        if !self.top_accepts_input() || self.animator.phase() == AnimatorPhase::Dragging {
            return;
        }
        self.animator.pulse();
        if self.photos.tap(zone) {
            debug!("photo index now {}", self.photos.index());
        }
    }

    fn commit(&mut self, outcome: SwipeOutcome) {
        let Some(top) = self.deck.top() else {
            return;
        };
        let id = top.id.clone();
        debug!("committed {outcome:?} for {id}");
        self.ledger.record_decision(&id);
        self.events.push(SessionEvent::Committed {
            id: id.clone(),
            outcome,
        });
        self.committed = Some((id, outcome));
    }

    pub fn tick(&mut self, dt_ms: f64) {
        if let Some(AnimatorEvent::Exited(outcome)) = self.animator.tick(dt_ms) {
            if let Some((id, committed_outcome)) = self.committed.take() {
                debug_assert_eq!(outcome, committed_outcome);
                if self.effects.on_exit_complete(&mut self.deck, &id, committed_outcome) {
                    self.events.push(SessionEvent::Removed {
                        id,
                        outcome: committed_outcome,
                    });
                }
            }
            self.animator.reset();
            self.sync_top();
            self.check_exhausted();
        }
        self.photos.tick(dt_ms);
        self.effects.tick(dt_ms);
    }

    fn sync_top(&mut self) {
        let top = self.deck.top().map(|c| (&c.id, c.photos.len()));
        if self.photos.sync_top(top) {
            self.animator.reset();
            self.drag_baseline = Vector::ZERO;
            self.interpreter.reset();
        }
    }

    fn check_exhausted(&mut self) {
        if self.deck.take_exhausted() {
            info!("deck exhausted");
            self.events.push(SessionEvent::Exhausted);
        }
    }

    /// Visible cards, topmost first. The host draws them in reverse.
    pub fn frames(&self) -> Vec<CardFrame> {
        self.deck
            .visible()
            .iter()
            .enumerate()
            .map(|(depth, candidate)| {
                if depth == 0 {
                    CardFrame {
                        candidate_id: candidate.id.clone(),
                        depth,
                        interactive: self.top_accepts_input(),
                        transform: self.animator.transform(),
                        opacity: 1.0,
                        photo_index: self.photos.index(),
                        crossfade: self.photos.crossfade().copied(),
                    }
                } else {
                    CardFrame {
                        candidate_id: candidate.id.clone(),
                        depth,
                        interactive: false,
                        transform: CardTransform::depth(self.config.depth_scale),
                        opacity: self.config.depth_opacity.powi(depth as i32),
                        photo_index: 0,
                        crossfade: None,
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::candidate;
    use crate::data::Direction;
    use crate::effects::tests::RecordingSink;

    const WIDTH: f64 = 400.0;

    fn session_with(candidates: Vec<Candidate>) -> (SwipeSession, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::default());
        let session = SwipeSession::new(
            DeckConfig::default(),
            WIDTH,
            sink.clone(),
            StoredSessionState::default(),
            candidates,
        );
        (session, sink)
    }

    fn abc() -> Vec<Candidate> {
        vec![candidate("a", 3), candidate("b", 2), candidate("c", 1)]
    }

    fn drag_release(session: &mut SwipeSession, x: f64, velocity_x: f64) {
        session.apply_pan(PanSample::Move {
            translation: Vector::new(x, 0.0),
        });
        session.apply_pan(PanSample::Release {
            translation: Vector::new(x, 0.0),
            velocity: Vector::new(velocity_x, 0.0),
        });
    }

    fn run(session: &mut SwipeSession, total_ms: f64) {
        let mut elapsed = 0.0;
        while elapsed < total_ms {
            session.tick(16.0);
            elapsed += 16.0;
        }
    }

    fn ids(session: &SwipeSession) -> Vec<&str> {
        session
            .deck()
            .candidates()
            .iter()
            .map(|c| c.id.as_str())
            .collect()
    }

    fn tap_at(session: &mut SwipeSession, x: f64, at: f64) {
        session.pointer_down(1, x, 300.0, at);
        session.pointer_up(1, x, 300.0, at + 60.0, 0.0, WIDTH);
    }

    #[test]
    fn drag_past_threshold_exits_right_and_promotes_next() {
        let (mut session, sink) = session_with(abc());
        drag_release(&mut session, 150.0, 0.0);

        assert_eq!(session.animator_phase(), AnimatorPhase::ExitingOffscreen);
        assert_eq!(
            session.drain_events(),
            vec![SessionEvent::Committed {
                id: CandidateId::from("a"),
                outcome: SwipeOutcome::Right
            }]
        );
        assert!(session.ledger().is_decided(&CandidateId::from("a")));
        assert!(!session.frames()[0].interactive);

        run(&mut session, 320.0);
        assert_eq!(ids(&session), vec!["b", "c"]);
        assert_eq!(
            session.drain_events(),
            vec![SessionEvent::Removed {
                id: CandidateId::from("a"),
                outcome: SwipeOutcome::Right
            }]
        );
        let frames = session.frames();
        assert_eq!(frames[0].candidate_id.as_str(), "b");
        assert!(frames[0].interactive);
        assert_eq!(frames[0].transform, CardTransform::REST);
        assert_eq!(sink.records.borrow()[0].direction, Direction::Like);
        assert_eq!(session.celebrations().len(), 1);
    }

    #[test]
    fn short_slow_drag_settles_back() {
        let (mut session, sink) = session_with(vec![candidate("a", 1)]);
        drag_release(&mut session, 50.0, 0.0);
        assert_eq!(session.animator_phase(), AnimatorPhase::SettlingBack);

        run(&mut session, 3000.0);
        assert_eq!(session.animator_phase(), AnimatorPhase::Idle);
        assert_eq!(ids(&session), vec!["a"]);
        assert!(session.drain_events().is_empty());
        assert!(sink.records.borrow().is_empty());
    }

    #[test]
    fn flick_left_exits_without_celebration() {
        let (mut session, sink) = session_with(abc());
        drag_release(&mut session, -5.0, -1200.0);
        run(&mut session, 320.0);
        assert_eq!(ids(&session), vec!["b", "c"]);
        assert_eq!(sink.records.borrow()[0].direction, Direction::Dislike);
        assert!(session.celebrations().is_empty());
    }

    #[test]
    fn empty_deck_is_exhausted_once_and_renders_nothing() {
        let (mut session, _sink) = session_with(Vec::new());
        assert!(session.frames().is_empty());
        assert_eq!(session.drain_events(), vec![SessionEvent::Exhausted]);
        session.tick(16.0);
        assert!(session.drain_events().is_empty());
        assert!(!session.pointer_down(1, 10.0, 10.0, 0.0));
    }

    #[test]
    fn swiping_last_card_exhausts_deck() {
        let (mut session, _sink) = session_with(vec![candidate("a", 1)]);
        drag_release(&mut session, 200.0, 0.0);
        run(&mut session, 320.0);
        let events = session.drain_events();
        assert_eq!(events.last(), Some(&SessionEvent::Exhausted));
        assert!(session.frames().is_empty());
    }

    #[test]
    fn tapping_right_half_cycles_photos() {
        let (mut session, _sink) = session_with(abc());
        tap_at(&mut session, 300.0, 0.0);
        tap_at(&mut session, 300.0, 500.0);
        assert_eq!(session.photo_index(), 2);
        tap_at(&mut session, 300.0, 1000.0);
        assert_eq!(session.photo_index(), 0);
        tap_at(&mut session, 50.0, 1500.0);
        assert_eq!(session.photo_index(), 2);
        assert_eq!(session.animator_phase(), AnimatorPhase::Idle);
    }

    #[test]
    fn next_card_starts_on_first_photo() {
        let (mut session, _sink) = session_with(abc());
        session.tap(TapZone::Right);
        session.tap(TapZone::Right);
        assert_eq!(session.photo_index(), 2);

        drag_release(&mut session, -150.0, 0.0);
        run(&mut session, 320.0);
        assert_eq!(session.frames()[0].candidate_id.as_str(), "b");
        assert_eq!(session.photo_index(), 0);
        assert_eq!(session.frames()[0].photo_index, 0);
    }

    #[test]
    fn taps_while_leaving_are_ignored() {
        let (mut session, _sink) = session_with(abc());
        drag_release(&mut session, 150.0, 0.0);
        session.tap(TapZone::Right);
        assert!(!session.pointer_down(1, 300.0, 300.0, 0.0));
        drag_release(&mut session, -300.0, 0.0);
        assert_eq!(session.photo_index(), 0);
        assert_eq!(session.drain_events().len(), 1);
        run(&mut session, 320.0);
        assert_eq!(ids(&session), vec!["b", "c"]);
    }

    #[test]
    fn cancelled_pointer_settles_card() {
        let (mut session, _sink) = session_with(abc());
        session.pointer_down(3, 200.0, 300.0, 0.0);
        session.pointer_move(3, 215.0, 300.0, 16.0);
        session.pointer_move(3, 335.0, 310.0, 32.0);
        assert_eq!(session.animator_phase(), AnimatorPhase::Dragging);
        assert_eq!(session.frames()[0].transform.translate_x, 120.0);

        session.pointer_cancel(3);
        assert_eq!(session.animator_phase(), AnimatorPhase::SettlingBack);
        run(&mut session, 3000.0);
        assert_eq!(session.frames()[0].transform, CardTransform::REST);
        assert_eq!(ids(&session), vec!["a", "b", "c"]);
    }

    #[test]
    fn pointer_flick_uses_estimated_velocity() {
        let (mut session, _sink) = session_with(abc());
        session.pointer_down(1, 200.0, 300.0, 0.0);
        session.pointer_move(1, 215.0, 300.0, 8.0);
        session.pointer_up(1, 230.0, 300.0, 16.0, 0.0, WIDTH);
        assert_eq!(session.animator_phase(), AnimatorPhase::ExitingOffscreen);
    }

    #[test]
    fn flick_without_moves_exits() {
        let (mut session, sink) = session_with(abc());
        assert!(session.pointer_down(1, 100.0, 300.0, 0.0));
        session.pointer_up(1, 260.0, 300.0, 40.0, 0.0, WIDTH);
        assert_eq!(session.animator_phase(), AnimatorPhase::ExitingOffscreen);

        run(&mut session, 320.0);
        assert_eq!(ids(&session), vec!["b", "c"]);
        assert_eq!(sink.records.borrow()[0].direction, Direction::Like);
    }

    #[test]
    fn grabbing_a_settling_card_continues_from_its_position() {
        let (mut session, _sink) = session_with(abc());
        drag_release(&mut session, 50.0, 0.0);
        session.tick(16.0);
        assert_eq!(session.animator_phase(), AnimatorPhase::SettlingBack);
        let settling_x = session.frames()[0].transform.translate_x;
        assert!(settling_x > 0.0 && settling_x < 50.0);

        assert!(session.pointer_down(2, 200.0, 300.0, 100.0));
        session.pointer_move(2, 215.0, 300.0, 116.0);
        assert_eq!(session.animator_phase(), AnimatorPhase::Dragging);
        assert_eq!(session.frames()[0].transform.translate_x, settling_x);

        session.pointer_move(2, 235.0, 300.0, 132.0);
        assert_eq!(session.frames()[0].transform.translate_x, settling_x + 20.0);
    }

    #[test]
    fn background_cards_are_passive_and_dimmed() {
        let (session, _sink) = session_with(abc());
        let frames = session.frames();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].interactive);
        for frame in &frames[1..] {
            assert!(!frame.interactive);
            assert_eq!(frame.transform.scale, 0.92);
            assert!(frame.opacity < 1.0);
        }
    }

    #[test]
    fn refill_never_reoffers_decided_candidates() {
        let (mut session, _sink) = session_with(vec![candidate("a", 1)]);
        drag_release(&mut session, 150.0, 0.0);
        run(&mut session, 320.0);
        session.drain_events();

        let added = session.refill(vec![candidate("a", 1), candidate("d", 1)]);
        assert_eq!(added, 1);
        assert_eq!(ids(&session), vec!["d"]);
        assert!(session.frames()[0].interactive);

        let (mut empty, _sink) = session_with(Vec::new());
        empty.drain_events();
        assert_eq!(empty.refill(Vec::new()), 0);
        assert_eq!(empty.drain_events(), vec![SessionEvent::Exhausted]);
    }

    #[test]
    fn failed_photo_uses_placeholder() {
        let (mut session, _sink) = session_with(abc());
        let top = session.deck().top().cloned().unwrap();
        session.images_mut().mark_failed("a/p0.jpg");
        assert_eq!(
            session.photo_source(&top, 0).url,
            DeckConfig::default().placeholder_image
        );
        assert_eq!(session.photo_source(&top, 1).url, "a/p1.jpg");
    }
}
