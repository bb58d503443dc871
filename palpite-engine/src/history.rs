use std::collections::HashMap;

use anyhow::Result;
use palpite_db::db::{fetch_all_results, fetch_frequencies, fetch_recent_results};
use palpite_db::models::{count_frequencies, DrawResult, FrequencyEntry};
use palpite_db::rusqlite::Connection;

/// Lecture seule de l'historique d'un jeu. Les résultats sont rendus du plus récent au plus ancien.
pub trait DrawHistory {
    fn frequencies(&self, game_id: &str) -> Result<Vec<FrequencyEntry>>;
    fn all_results(&self, game_id: &str) -> Result<Vec<DrawResult>>;
    fn recent_results(&self, game_id: &str, limit: u32) -> Result<Vec<DrawResult>>;
}

pub struct SqliteHistory<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteHistory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DrawHistory for SqliteHistory<'_> {
    fn frequencies(&self, game_id: &str) -> Result<Vec<FrequencyEntry>> {
        fetch_frequencies(self.conn, game_id)
    }

    fn all_results(&self, game_id: &str) -> Result<Vec<DrawResult>> {
        fetch_all_results(self.conn, game_id)
    }

    fn recent_results(&self, game_id: &str, limit: u32) -> Result<Vec<DrawResult>> {
        fetch_recent_results(self.conn, game_id, limit)
    }
}

/// Instantané en mémoire, partageable entre threads.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    results: HashMap<String, Vec<DrawResult>>,
    frequencies: HashMap<String, Vec<FrequencyEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre les tirages d'un jeu et en déduit la table des fréquences.
    pub fn with_results(mut self, game_id: &str, max_number: u8, mut results: Vec<DrawResult>) -> Self {
        results.sort_by(|a, b| b.contest_number.cmp(&a.contest_number));
        self.frequencies.insert(game_id.to_string(), count_frequencies(max_number, &results));
        self.results.insert(game_id.to_string(), results);
        self
    }

    /// Remplace la table des fréquences (sans toucher aux tirages).
    pub fn with_frequencies(mut self, game_id: &str, frequencies: Vec<FrequencyEntry>) -> Self {
        self.frequencies.insert(game_id.to_string(), frequencies);
        self
    }
}

impl DrawHistory for MemoryHistory {
    fn frequencies(&self, game_id: &str) -> Result<Vec<FrequencyEntry>> {
        Ok(self.frequencies.get(game_id).cloned().unwrap_or_default())
    }

    fn all_results(&self, game_id: &str) -> Result<Vec<DrawResult>> {
        Ok(self.results.get(game_id).cloned().unwrap_or_default())
    }

    fn recent_results(&self, game_id: &str, limit: u32) -> Result<Vec<DrawResult>> {
        Ok(self
            .results
            .get(game_id)
            .map(|r| r.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}
