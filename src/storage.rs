use gloo_storage::{LocalStorage, SessionStorage, Storage};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::DeckConfig;
use crate::data::{Candidate, CandidateId};

const CONFIG_KEY: &str = "swipe_deck_config";
const SESSION_KEY: &str = "swipe_deck_session";

/// Per-session record of decided candidates. A decision is final for the
/// session, so refills are filtered against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredSessionState {
    pub decided: BTreeSet<CandidateId>,
}

impl StoredSessionState {
    /// Returns false if the id was already decided.
    pub fn record_decision(&mut self, id: &CandidateId) -> bool {
        self.decided.insert(id.clone())
    }

    pub fn is_decided(&self, id: &CandidateId) -> bool {
        self.decided.contains(id)
    }

    pub fn undecided(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|candidate| !self.is_decided(&candidate.id))
            .collect()
    }
}

pub fn load_config() -> DeckConfig {
    match LocalStorage::get::<DeckConfig>(CONFIG_KEY) {
        Ok(config) => config,
        Err(gloo_storage::errors::StorageError::KeyNotFound(_)) => DeckConfig::default(),
        Err(err) => {
            warn!("Falling back to default deck config: {}", err);
            DeckConfig::default()
        }
    }
}

pub fn load_session() -> StoredSessionState {
    match SessionStorage::get::<StoredSessionState>(SESSION_KEY) {
        Ok(state) => state,
        Err(gloo_storage::errors::StorageError::KeyNotFound(_)) => StoredSessionState::default(),
        Err(err) => {
            warn!("Falling back to empty session state: {}", err);
            StoredSessionState::default()
        }
    }
}

pub fn save_session(state: &StoredSessionState) {
    if let Err(err) = SessionStorage::set(SESSION_KEY, state) {
        warn!("Failed to persist session state: {}", err);
    }
}
