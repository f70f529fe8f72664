//! High score leaderboard system
//!
//! Persisted through a `Storage` backend, tracks the top 10 scores.

use serde::{Deserialize, Serialize};

use crate::persistence::{self, Storage};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Maximum initials length
pub const MAX_INITIALS: usize = 3;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Up to three uppercase characters
    pub initials: String,
    /// Player's score
    pub score: u64,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// High score leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "astro_drift_highscores";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The board a fresh install starts with
    pub fn seeded() -> Self {
        let defaults = [("ACE", 10_000), ("NOV", 7_500), ("RKT", 5_000), ("ZIP", 2_500), ("DUD", 1_000)];
        Self {
            entries: defaults
                .iter()
                .map(|&(initials, score)| HighScoreEntry {
                    initials: initials.to_string(),
                    score,
                    timestamp: 0.0,
                })
                .collect(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a new score to the leaderboard (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_score(&mut self, initials: &str, score: u64, timestamp: f64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        self.entries.push(HighScoreEntry {
            initials: sanitize_initials(initials),
            score,
            timestamp,
        });
        // Stable sort keeps older entries ahead of equal newcomers
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HIGH_SCORES);

        self.entries
            .iter()
            .position(|e| e.score == score && e.timestamp == timestamp)
            .map(|i| i + 1)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load the board; absent or corrupt data seeds the defaults
    pub fn load(storage: &dyn Storage) -> Self {
        match persistence::load_json::<HighScores>(storage, Self::STORAGE_KEY) {
            Ok(Some(mut scores)) => {
                scores.normalize();
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Ok(None) => {
                log::info!("No high scores found, seeding defaults");
                Self::seeded()
            }
            Err(e) => {
                log::warn!("High scores unreadable ({e}), seeding defaults");
                Self::seeded()
            }
        }
    }

    /// Save the board, replacing whatever was stored
    pub fn save(&self, storage: &mut dyn Storage) {
        match persistence::save_json(storage, Self::STORAGE_KEY, self) {
            Ok(()) => log::info!("High scores saved ({} entries)", self.entries.len()),
            Err(e) => log::warn!("Failed to save high scores: {e}"),
        }
    }

    /// Re-establish ordering and limits on data from outside
    fn normalize(&mut self) {
        for entry in &mut self.entries {
            entry.initials = sanitize_initials(&entry.initials);
        }
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HIGH_SCORES);
    }
}

/// Uppercase alphanumerics only, at most three; blank input becomes "AAA"
pub fn sanitize_initials(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .take(MAX_INITIALS)
        .collect();
    if cleaned.is_empty() {
        "AAA".to_string()
    } else {
        cleaned
    }
}
