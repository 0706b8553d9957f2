use gloo_net::http::Request;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::decision::SwipeOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub display_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Candidate {
    pub fn photo(&self, index: usize) -> Option<&str> {
        self.photos.get(index).map(String::as_str)
    }

    pub fn title(&self) -> String {
        match self.age {
            Some(age) => format!("{}, {}", self.display_name, age),
            None => self.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Like,
    Dislike,
}

impl Direction {
    pub fn from_outcome(outcome: SwipeOutcome) -> Option<Self> {
        match outcome {
            SwipeOutcome::Right => Some(Direction::Like),
            SwipeOutcome::Left => Some(Direction::Dislike),
            SwipeOutcome::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub candidate_id: CandidateId,
    pub direction: Direction,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("could not parse response: {0}")]
    Parse(String),
    #[error("could not encode request: {0}")]
    Encode(String),
}

impl DataError {
    fn network<E: fmt::Display>(err: E) -> Self {
        Self::Network(err.to_string())
    }

    fn parse<E: fmt::Display>(err: E) -> Self {
        Self::Parse(err.to_string())
    }
}

pub async fn fetch_candidates(url: &str) -> Result<Vec<Candidate>, DataError> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(DataError::network)?;

    if response.status() == 404 {
        return Err(DataError::NotFound(url.to_owned()));
    }

    if !response.ok() {
        return Err(DataError::Network(format!(
            "HTTP {} while fetching {}",
            response.status(),
            url
        )));
    }

    let text = response.text().await.map_err(DataError::network)?;
    parse_candidates(&text)
}

pub async fn post_decision(url: &str, record: &DecisionRecord) -> Result<(), DataError> {
    let request = Request::post(url)
        .json(record)
        .map_err(|err| DataError::Encode(err.to_string()))?;
    let response = request.send().await.map_err(DataError::network)?;

    if !response.ok() {
        return Err(DataError::Network(format!(
            "HTTP {} while posting decision for {}",
            response.status(),
            record.candidate_id
        )));
    }
    Ok(())
}

/// Keeps server order; a repeated id keeps its first occurrence.
pub fn parse_candidates(text: &str) -> Result<Vec<Candidate>, DataError> {
    let raw: Vec<Candidate> = serde_json::from_str(text).map_err(DataError::parse)?;
    Ok(dedup_by_id(raw))
}

pub fn dedup_by_id(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if seen.insert(candidate.id.clone()) {
            unique.push(candidate);
        } else {
            log::debug!("dropping duplicate candidate {}", candidate.id);
        }
    }
    unique
}

#[cfg(test)]
pub(crate) fn candidate(id: &str, photos: usize) -> Candidate {
    Candidate {
        id: CandidateId::from(id),
        display_name: id.to_uppercase(),
        age: Some(30),
        photos: (0..photos).map(|i| format!("{id}/p{i}.jpg")).collect(),
        tags: Vec::new(),
    }
}
