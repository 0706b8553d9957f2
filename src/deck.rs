use std::collections::HashSet;

use crate::data::{Candidate, CandidateId};

pub const DEFAULT_WINDOW: usize = 3;

/// Ordered queue of undecided candidates. Only the first `window` entries
/// are rendered, index 0 on top.
#[derive(Debug, Clone)]
pub struct CardDeck {
    candidates: Vec<Candidate>,
    window: usize,
    exhausted_pending: bool,
}

impl CardDeck {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self::with_window(candidates, DEFAULT_WINDOW)
    }

    pub fn with_window(candidates: Vec<Candidate>, window: usize) -> Self {
        let mut deck = Self {
            candidates: Vec::new(),
            window: window.max(1),
            exhausted_pending: false,
        };
        deck.extend(candidates);
        deck.exhausted_pending = deck.candidates.is_empty();
        deck
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.candidates.iter().any(|candidate| &candidate.id == id)
    }

    /// Back-to-front order is the reverse of this slice.
    pub fn visible(&self) -> &[Candidate] {
        let end = self.window.min(self.candidates.len());
        &self.candidates[..end]
    }

    /// Removing an absent id is a no-op. Returns whether the deck changed.
    pub fn remove_candidate(&mut self, id: &CandidateId) -> bool {
        let Some(position) = self.candidates.iter().position(|c| &c.id == id) else {
            return false;
        };
        self.candidates.remove(position);
        if self.candidates.is_empty() {
            self.exhausted_pending = true;
        }
        true
    }

    /// Appends candidates not already queued. Returns how many were added.
    pub fn extend(&mut self, candidates: Vec<Candidate>) -> usize {
        let mut seen: HashSet<CandidateId> =
            self.candidates.iter().map(|c| c.id.clone()).collect();
        let before = self.candidates.len();
        for candidate in candidates {
            if seen.insert(candidate.id.clone()) {
                self.candidates.push(candidate);
            }
        }
        let added = self.candidates.len() - before;
        if added > 0 {
            self.exhausted_pending = false;
        }
        added
    }

    /// Yields the exhausted signal once per transition to empty.
    pub fn take_exhausted(&mut self) -> bool {
        std::mem::take(&mut self.exhausted_pending)
    }
}
