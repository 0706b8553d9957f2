pub mod animator;
pub mod config;
pub mod data;
pub mod deck;
pub mod decision;
pub mod effects;
pub mod gesture;
pub mod photos;
pub mod session;
pub mod storage;

use std::cell::RefCell;
use std::rc::Rc;

use config::DeckConfig;
use data::{fetch_candidates, Candidate};
use effects::HttpDecisionSink;
use gloo_render::{request_animation_frame, AnimationFrame};
use log::{debug, info, warn};
use photos::ImageSource;
use session::{CardFrame, SessionEvent, SwipeSession};
use storage::{load_config, load_session, save_session};
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::window;
use yew::prelude::*;

const FALLBACK_SCREEN_WIDTH: f64 = 400.0;
const MAX_FRAME_MS: f64 = 64.0;

#[derive(PartialEq, Clone)]
enum FetchStatus {
    Idle,
    Loading,
    Error(String),
}

#[derive(Clone, PartialEq)]
struct PhotoLayer {
    source: ImageSource,
    /// The real photo URL when `source` is not the placeholder.
    photo_url: Option<String>,
    opacity: f64,
}

#[derive(Clone, PartialEq)]
struct CardView {
    frame: CardFrame,
    title: String,
    tags: Vec<String>,
    photo_count: usize,
    layers: Vec<PhotoLayer>,
}

#[derive(Clone, PartialEq)]
struct ParticleView {
    x: f64,
    y: f64,
    size: f64,
    hue: f64,
    opacity: f64,
}

#[derive(Clone, PartialEq, Default)]
struct DeckView {
    loaded: bool,
    cards: Vec<CardView>,
    celebrations: Vec<(u64, Vec<ParticleView>)>,
    threshold: f64,
}

fn photo_layer(session: &SwipeSession, candidate: &Candidate, index: usize, opacity: f64) -> PhotoLayer {
    let source = session.photo_source(candidate, index);
    let photo_url = candidate
        .photo(index)
        .filter(|url| *url == source.url)
        .map(str::to_string);
    PhotoLayer {
        source,
        photo_url,
        opacity,
    }
}

fn build_view(session: &SwipeSession, screen_width: f64) -> DeckView {
    let cards = session
        .frames()
        .into_iter()
        .zip(session.deck().visible())
        .map(|(frame, candidate)| {
            let layers = match frame.crossfade {
                Some(fade) => vec![
                    photo_layer(session, candidate, fade.from, fade.outgoing_opacity()),
                    photo_layer(session, candidate, fade.to, fade.incoming_opacity()),
                ],
                None => vec![photo_layer(session, candidate, frame.photo_index, 1.0)],
            };
            CardView {
                title: candidate.title(),
                tags: candidate.tags.clone(),
                photo_count: candidate.photos.len(),
                layers,
                frame,
            }
        })
        .collect();

    let celebrations = session
        .celebrations()
        .iter()
        .map(|celebration| {
            let particles = celebration
                .particles()
                .map(|p| ParticleView {
                    x: p.x,
                    y: p.y,
                    size: p.size,
                    hue: p.hue,
                    opacity: p.opacity,
                })
                .collect();
            (celebration.id, particles)
        })
        .collect();

    DeckView {
        loaded: true,
        cards,
        celebrations,
        threshold: screen_width * session.config().swipe_threshold_ratio,
    }
}

fn screen_width() -> f64 {
    window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|width| width.as_f64())
        .filter(|width| *width > 0.0)
        .unwrap_or(FALLBACK_SCREEN_WIDTH)
}

/// Shared handles the callbacks and the frame loop use to reach the session.
#[derive(Clone)]
struct DeckHandles {
    session: Rc<RefCell<Option<SwipeSession>>>,
    view: UseStateHandle<DeckView>,
    exhausted: UseStateHandle<bool>,
    frame: Rc<RefCell<Option<AnimationFrame>>>,
}

impl DeckHandles {
    fn load(&self, config: DeckConfig, candidates: Vec<Candidate>) {
        {
            let mut guard = self.session.borrow_mut();
            if let Some(session) = guard.as_mut() {
                session.refill(candidates);
            } else {
                let sink = Rc::new(HttpDecisionSink::new(config.swipes_url()));
                *guard = Some(SwipeSession::new(
                    config,
                    screen_width(),
                    sink,
                    load_session(),
                    candidates,
                ));
            }
        }
        self.with_session(|_| ());
    }

    fn with_session(&self, action: impl FnOnce(&mut SwipeSession)) {
        let animating = {
            let mut guard = self.session.borrow_mut();
            let Some(session) = guard.as_mut() else {
                return;
            };
            action(session);
            self.publish(session);
            session.is_animating()
        };
        if animating {
            self.ensure_frame_loop();
        }
    }

    fn publish(&self, session: &mut SwipeSession) {
        for event in session.drain_events() {
            match event {
                SessionEvent::Committed { id, outcome } => {
                    info!("{outcome:?} on {id}");
                    save_session(session.ledger());
                }
                SessionEvent::Removed { id, .. } => debug!("{id} left the deck"),
                SessionEvent::Exhausted => self.exhausted.set(true),
            }
        }
        if !session.deck().is_empty() {
            self.exhausted.set(false);
        }
        self.view.set(build_view(session, screen_width()));
    }

    fn ensure_frame_loop(&self) {
        if self.frame.borrow().is_none() {
            schedule_frame(self.clone(), None);
        }
    }
}

fn schedule_frame(handles: DeckHandles, last_timestamp: Option<f64>) {
    let next = handles.clone();
    let frame = request_animation_frame(move |timestamp| {
        let dt = last_timestamp
            .map(|last| (timestamp - last).clamp(0.0, MAX_FRAME_MS))
            .unwrap_or(16.0);
        let animating = {
            let mut guard = next.session.borrow_mut();
            match guard.as_mut() {
                Some(session) => {
                    session.tick(dt);
                    next.publish(session);
                    session.is_animating()
                }
                None => false,
            }
        };
        if animating {
            schedule_frame(next, Some(timestamp));
        } else {
            next.frame.borrow_mut().take();
        }
    });
    *handles.frame.borrow_mut() = Some(frame);
}

#[function_component(App)]
fn app() -> Html {
    let config = use_state(load_config);
    let status = use_state(|| FetchStatus::Loading);
    let reload = use_state(|| 0u32);
    let view = use_state(DeckView::default);
    let exhausted = use_state(|| false);
    let session = use_mut_ref(|| None::<SwipeSession>);
    let frame = use_mut_ref(|| None::<AnimationFrame>);
    let card_ref = use_node_ref();

    let handles = DeckHandles {
        session,
        view: view.clone(),
        exhausted: exhausted.clone(),
        frame,
    };

    {
        let handles = handles.clone();
        let status = status.clone();
        let config = config.clone();

        use_effect_with_deps(
            move |_: &u32| {
                status.set(FetchStatus::Loading);

                let status = status.clone();
                let config = (*config).clone();

                spawn_local(async move {
                    match fetch_candidates(&config.candidates_url()).await {
                        Ok(candidates) => {
                            handles.load(config, candidates);
                            status.set(FetchStatus::Idle);
                        }
                        Err(err) => {
                            warn!("Could not load candidates: {}", err);
                            status.set(FetchStatus::Error(err.to_string()));
                        }
                    }
                });

                || ()
            },
            *reload,
        );
    }

    {
        let top_offset = view.cards.first().map(|card| card.frame.transform.translate_x);
        let threshold = view.threshold;
        use_effect_with_deps(
            move |offset: &Option<f64>| {
                let background = offset.and_then(|delta| body_background_for_delta(delta, threshold));
                if let Some(window) = window() {
                    if let Some(document) = window.document() {
                        if let Some(body) = document.body() {
                            let style = body.style();
                            match background {
                                Some(gradient) => {
                                    let _ = style.set_property("background", &gradient);
                                    let _ = style.set_property("background-image", &gradient);
                                }
                                None => {
                                    let _ = style.remove_property("background");
                                    let _ = style.remove_property("background-image");
                                }
                            }
                        }
                    }
                }
                || ()
            },
            top_offset,
        );
    }

    let on_refill = {
        let reload = reload.clone();
        Callback::from(move |_: MouseEvent| {
            reload.set(*reload + 1);
        })
    };

    let card_handlers = CardHandlers::new(&handles, &card_ref);

    html! {
        <div class="app-container">
            <main class="content single-column">
                { render_deck_area(&status, &view, *exhausted, &card_handlers, &card_ref, on_refill) }
            </main>
        </div>
    }
}

#[derive(Clone)]
struct CardHandlers {
    pointer_down: Callback<PointerEvent>,
    pointer_move: Callback<PointerEvent>,
    pointer_up: Callback<PointerEvent>,
    pointer_cancel: Callback<PointerEvent>,
    image_loaded: Callback<String>,
    image_failed: Callback<String>,
}

impl CardHandlers {
    fn new(handles: &DeckHandles, card_ref: &NodeRef) -> Self {
        let pointer_down = {
            let handles = handles.clone();
            Callback::from(move |event: PointerEvent| {
                event.prevent_default();
                let pointer_id = event.pointer_id();
                let mut accepted = false;
                handles.with_session(|session| {
                    session.set_screen_width(screen_width());
                    accepted = session.pointer_down(
                        pointer_id,
                        event.client_x() as f64,
                        event.client_y() as f64,
                        event.time_stamp(),
                    );
                });
                if accepted {
                    if let Some(target) = event
                        .target()
                        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
                    {
                        let _ = target.set_pointer_capture(pointer_id);
                    }
                }
            })
        };

        let pointer_move = {
            let handles = handles.clone();
            Callback::from(move |event: PointerEvent| {
                event.prevent_default();
                handles.with_session(|session| {
                    session.pointer_move(
                        event.pointer_id(),
                        event.client_x() as f64,
                        event.client_y() as f64,
                        event.time_stamp(),
                    );
                });
            })
        };

        let pointer_up = {
            let handles = handles.clone();
            let card_ref = card_ref.clone();
            Callback::from(move |event: PointerEvent| {
                release_capture(&event);
                let (card_left, card_width) = card_ref
                    .cast::<web_sys::Element>()
                    .map(|element| {
                        let rect = element.get_bounding_client_rect();
                        (rect.left(), rect.width())
                    })
                    .unwrap_or((0.0, screen_width()));
                handles.with_session(|session| {
                    session.pointer_up(
                        event.pointer_id(),
                        event.client_x() as f64,
                        event.client_y() as f64,
                        event.time_stamp(),
                        card_left,
                        card_width,
                    );
                });
            })
        };

        let pointer_cancel = {
            let handles = handles.clone();
            Callback::from(move |event: PointerEvent| {
                release_capture(&event);
                handles.with_session(|session| session.pointer_cancel(event.pointer_id()));
            })
        };

        let image_loaded = {
            let handles = handles.clone();
            Callback::from(move |url: String| {
                handles.with_session(|session| session.images_mut().mark_loaded(&url));
            })
        };

        let image_failed = {
            let handles = handles.clone();
            Callback::from(move |url: String| {
                handles.with_session(|session| session.images_mut().mark_failed(&url));
            })
        };

        Self {
            pointer_down,
            pointer_move,
            pointer_up,
            pointer_cancel,
            image_loaded,
            image_failed,
        }
    }
}

fn release_capture(event: &PointerEvent) {
    if let Some(target) = event
        .target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
    {
        let _ = target.release_pointer_capture(event.pointer_id());
    }
}

fn render_deck_area(
    status: &UseStateHandle<FetchStatus>,
    view: &UseStateHandle<DeckView>,
    exhausted: bool,
    handlers: &CardHandlers,
    card_ref: &NodeRef,
    on_refill: Callback<MouseEvent>,
) -> Html {
    let refill_button = html! {
        <button class="refill-button" onclick={on_refill}>{ "Look again" }</button>
    };

    match &**status {
        FetchStatus::Loading if !view.loaded => html! { <p>{ "Finding people near you…" }</p> },
        FetchStatus::Error(message) => html! {
            <div class="deck-empty">
                <p class="error">{ message }</p>
                { refill_button }
            </div>
        },
        _ if exhausted || view.cards.is_empty() => html! {
            <>
                <div class="deck-empty">
                    <p>{ "You're all caught up. Check back soon for new people." }</p>
                    { refill_button }
                </div>
                { render_celebrations(view) }
            </>
        },
        _ => {
            let total = view.cards.len();
            html! {
                <div class="card-stack">
                    { for view.cards.iter().rev().map(|card| {
                        render_card(card, total, view.threshold, handlers, card_ref)
                    }) }
                    { render_celebrations(view) }
                </div>
            }
        }
    }
}

/// Bursts outlive the card that triggered them, including the last one.
fn render_celebrations(view: &DeckView) -> Html {
    html! {
        <div class="celebrations">
            { for view.celebrations.iter().map(|(id, particles)| render_celebration(*id, particles)) }
        </div>
    }
}

fn render_card(
    card: &CardView,
    total: usize,
    threshold: f64,
    handlers: &CardHandlers,
    card_ref: &NodeRef,
) -> Html {
    let frame = &card.frame;
    let style = format!(
        "transform: {}; opacity: {:.3}; z-index: {};",
        frame.transform.css(),
        frame.opacity,
        total - frame.depth
    );
    let classes = classes!(
        "card",
        if frame.interactive { Some("interactive") } else { None },
        if frame.depth > 0 { Some("passive") } else { None }
    );

    let layers = card.layers.iter().map(|layer| render_photo(layer, handlers));
    let dots = (card.photo_count > 1).then(|| {
        html! {
            <div class="photo-dots">
                { for (0..card.photo_count).map(|i| html! {
                    <span class={classes!("dot", (i == frame.photo_index).then_some("active"))}></span>
                }) }
            </div>
        }
    });

    let stamp_strength = if threshold > 0.0 {
        (frame.transform.translate_x / threshold).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let body = html! {
        <>
            { for layers }
            { for dots }
            <span class="stamp like" style={format!("opacity: {:.2};", stamp_strength.max(0.0))}>{ "LIKE" }</span>
            <span class="stamp nope" style={format!("opacity: {:.2};", (-stamp_strength).max(0.0))}>{ "NOPE" }</span>
            <div class="card-info">
                <p class="card-title">{ &card.title }</p>
                <div class="card-tags">
                    { for card.tags.iter().map(|tag| html! { <span class="tag">{ tag }</span> }) }
                </div>
            </div>
        </>
    };

    // Only the top card takes pointer input; every card reports image loads.
    if frame.depth == 0 {
        html! {
            <div class={classes}
                key={frame.candidate_id.to_string()}
                ref={card_ref.clone()}
                style={style}
                onpointerdown={handlers.pointer_down.clone()}
                onpointermove={handlers.pointer_move.clone()}
                onpointerup={handlers.pointer_up.clone()}
                onpointercancel={handlers.pointer_cancel.clone()}>
                { body }
            </div>
        }
    } else {
        html! {
            <div class={classes} key={frame.candidate_id.to_string()} style={style}>
                { body }
            </div>
        }
    }
}

fn render_photo(layer: &PhotoLayer, handlers: &CardHandlers) -> Html {
    let classes = classes!("photo", layer.source.blurred.then_some("blurred"));
    let style = format!("opacity: {:.3};", layer.opacity);

    let (onload, onerror) = match &layer.photo_url {
        Some(url) => {
            let loaded = {
                let url = url.clone();
                let image_loaded = handlers.image_loaded.clone();
                Callback::from(move |_: Event| image_loaded.emit(url.clone()))
            };
            let failed = {
                let url = url.clone();
                let image_failed = handlers.image_failed.clone();
                Callback::from(move |_: Event| image_failed.emit(url.clone()))
            };
            (Some(loaded), Some(failed))
        }
        None => (None, None),
    };

    html! {
        <img class={classes}
            src={layer.source.url.clone()}
            style={style}
            draggable="false"
            onload={onload}
            onerror={onerror} />
    }
}

fn render_celebration(id: u64, particles: &[ParticleView]) -> Html {
    html! {
        <div class="celebration" key={id}>
            { for particles.iter().map(|p| {
                let style = format!(
                    "transform: translate({:.1}px, {:.1}px); width: {:.1}px; height: {:.1}px; \
                     background: hsl({:.0}, 90%, 60%); opacity: {:.3};",
                    p.x, p.y, p.size, p.size, p.hue, p.opacity
                );
                html! { <span class="particle" style={style}></span> }
            }) }
        </div>
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    let config = load_config();
    wasm_logger::init(wasm_logger::Config::new(config.log_level()));
    yew::Renderer::<App>::new().render();
}

fn body_background_for_delta(delta: f64, threshold: f64) -> Option<String> {
    if threshold <= 0.0 {
        return None;
    }
    let normalized = (delta / threshold).clamp(-1.0, 1.0);
    if normalized.abs() < 0.01 {
        return None;
    }

    let strength = normalized.abs();
    let start_alpha = 0.18 * strength;
    let end_alpha = 0.38 * strength + 0.02;
    if normalized < 0.0 {
        Some(format!(
            "radial-gradient(circle at top, rgba(230, 57, 70, {:.3}), rgba(96, 12, 24, {:.3}))",
            start_alpha, end_alpha
        ))
    } else {
        Some(format!(
            "radial-gradient(circle at top, rgba(46, 204, 113, {:.3}), rgba(8, 84, 44, {:.3}))",
            start_alpha, end_alpha
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::candidate;
    use crate::effects::tests::RecordingSink;
    use crate::gesture::{PanSample, Vector};
    use crate::storage::StoredSessionState;

    fn session_with(candidates: Vec<Candidate>) -> SwipeSession {
        SwipeSession::new(
            DeckConfig::default(),
            FALLBACK_SCREEN_WIDTH,
            Rc::new(RecordingSink::default()),
            StoredSessionState::default(),
            candidates,
        )
    }

    fn swipe_right(session: &mut SwipeSession) {
        session.apply_pan(PanSample::Move {
            translation: Vector::new(200.0, 0.0),
        });
        session.apply_pan(PanSample::Release {
            translation: Vector::new(200.0, 0.0),
            velocity: Vector::ZERO,
        });
        for _ in 0..25 {
            session.tick(16.0);
        }
    }

    #[test]
    fn background_photos_load_before_promotion() {
        let mut session = session_with(vec![candidate("a", 1), candidate("b", 2)]);
        let view = build_view(&session, FALLBACK_SCREEN_WIDTH);
        assert_eq!(view.cards.len(), 2);
        for card in &view.cards {
            assert!(card.layers[0].photo_url.is_some());
            assert!(card.layers[0].source.blurred);
        }

        session.images_mut().mark_loaded("b/p0.jpg");
        swipe_right(&mut session);
        let view = build_view(&session, FALLBACK_SCREEN_WIDTH);
        assert_eq!(view.cards[0].frame.candidate_id.as_str(), "b");
        assert!(!view.cards[0].layers[0].source.blurred);
    }

    #[test]
    fn last_card_celebration_survives_empty_deck() {
        let mut session = session_with(vec![candidate("a", 1)]);
        swipe_right(&mut session);
        let view = build_view(&session, FALLBACK_SCREEN_WIDTH);
        assert!(view.cards.is_empty());
        assert_eq!(view.celebrations.len(), 1);
        assert!(!view.celebrations[0].1.is_empty());
    }

    #[test]
    fn background_tint_follows_drag_side() {
        assert_eq!(body_background_for_delta(0.0, 100.0), None);
        assert!(body_background_for_delta(50.0, 100.0)
            .unwrap()
            .contains("46, 204, 113"));
        assert!(body_background_for_delta(-150.0, 100.0)
            .unwrap()
            .contains("rgba(230, 57, 70, 0.180)"));
        assert_eq!(body_background_for_delta(50.0, 0.0), None);
    }
}
