use std::collections::{HashMap, HashSet};

use palpite_db::models::{default_games, Combination, DrawResult, Game};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::history::DrawHistory;
use crate::scoring::{base_scores, PairCounts};
use crate::selection::{AttemptBudget, Picker};
use crate::specials::generate_specials;

/// Préférences de génération. Les trois drapeaux sont toujours présents (défaut `false`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationPreferences {
    pub use_hot: bool,
    pub use_cold: bool,
    pub use_mixed: bool,
}

impl GenerationPreferences {
    pub fn any(&self) -> bool {
        self.use_hot || self.use_cold || self.use_mixed
    }
}

/// Jeux connus du moteur, indexés par identifiant.
#[derive(Debug, Clone)]
pub struct GameCatalog {
    games: HashMap<String, Game>,
}

impl GameCatalog {
    pub fn new(games: Vec<Game>) -> Self {
        Self {
            games: games.into_iter().map(|g| (g.id.clone(), g)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Game> {
        self.games.get(id)
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }
}

impl Default for GameCatalog {
    fn default() -> Self {
        Self::new(default_games())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub combination: Combination,
    /// La grille reproduit un tirage passé malgré les essais.
    pub repeats_history: bool,
    /// Classification impossible faute de données : sélection uniforme.
    pub degraded: bool,
    pub attempts: usize,
}

pub struct NumberSelectionEngine<H> {
    catalog: GameCatalog,
    history: H,
    config: EngineConfig,
}

impl<H: DrawHistory> NumberSelectionEngine<H> {
    pub fn new(catalog: GameCatalog, history: H) -> Self {
        Self::with_config(catalog, history, EngineConfig::default())
    }

    pub fn with_config(catalog: GameCatalog, history: H, config: EngineConfig) -> Self {
        Self { catalog, history, config }
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn game(&self, game_id: &str) -> Result<&Game, EngineError> {
        self.catalog
            .get(game_id)
            .ok_or_else(|| EngineError::InvalidGame(game_id.to_string()))
    }

    /// `count` numéros distincts de `[1, max_number]`, triés.
    pub fn generate<R: Rng>(
        &self,
        game_id: &str,
        count: usize,
        preferences: GenerationPreferences,
        rng: &mut R,
    ) -> Result<Combination, EngineError> {
        Ok(self.generate_detailed(game_id, count, preferences, rng)?.combination)
    }

    pub fn generate_detailed<R: Rng>(
        &self,
        game_id: &str,
        count: usize,
        preferences: GenerationPreferences,
        rng: &mut R,
    ) -> Result<Generation, EngineError> {
        let game = self.game(game_id)?;
        let max_number = game.max_number;
        if count == 0 || count > max_number as usize {
            return Err(EngineError::InvalidCount { count, max: max_number as usize });
        }

        let all_results = self.history.all_results(game_id).map_err(EngineError::History)?;
        let past: HashSet<Combination> = all_results.iter().map(DrawResult::combination).collect();

        let (picker, degraded) = self.build_picker(game, &all_results, &preferences)?;
        let mut budget = AttemptBudget::new(self.config.max_attempts);

        let mut selected = Vec::with_capacity(count);
        picker.fill(max_number, &mut selected, count, &mut budget, rng);

        // Anti-répétition : on remplace le dernier numéro tant que la grille existe déjà
        let mut repeats_history = past.contains(&Combination::new(selected.clone()));
        let mut rejected: Vec<u8> = Vec::new();
        while repeats_history && budget.try_consume() {
            let Some(dropped) = selected.pop() else { break };
            rejected.push(dropped);
            match picker.pick_one(max_number, &selected, &rejected, rng) {
                Some(replacement) => selected.push(replacement),
                None => {
                    selected.push(dropped);
                    break;
                }
            }
            repeats_history = past.contains(&Combination::new(selected.clone()));
        }

        if repeats_history {
            warn!(game = %game.id, attempts = budget.used(), "grille identique à un tirage passé, renvoyée telle quelle");
        }
        debug!(game = %game.id, count, attempts = budget.used(), degraded, "grille générée");

        Ok(Generation {
            combination: Combination::new(selected),
            repeats_history,
            degraded,
            attempts: budget.used(),
        })
    }

    fn build_picker(
        &self,
        game: &Game,
        all_results: &[DrawResult],
        preferences: &GenerationPreferences,
    ) -> Result<(Picker<'_>, bool), EngineError> {
        if !preferences.any() {
            return Ok((Picker::Uniform, false));
        }

        let frequencies = self.history.frequencies(&game.id).map_err(EngineError::History)?;
        let classification = classify(game.max_number, &frequencies, &self.config);
        if classification.degraded {
            warn!(
                game = %game.id,
                entries = frequencies.iter().filter(|e| e.frequency > 0).count(),
                "données de fréquence insuffisantes, sélection uniforme"
            );
            return Ok((Picker::Uniform, true));
        }

        let window = u32::try_from(self.config.recency_window).unwrap_or(u32::MAX);
        let recent = self
            .history
            .recent_results(&game.id, window)
            .map_err(EngineError::History)?;

        let base = base_scores(game.max_number, &classification, preferences, &recent, &self.config);
        let pairs = PairCounts::from_results(game.max_number, all_results);

        Ok((Picker::Weighted { base, pairs, config: &self.config }, false))
    }

    /// Numéros auxiliaires du jeu (ex: trèfles), tirés indépendamment de la grille principale.
    pub fn generate_game_specials<R: Rng>(&self, game_id: &str, rng: &mut R) -> Result<Combination, EngineError> {
        let game = self.game(game_id)?;
        let pool = game
            .special
            .ok_or_else(|| EngineError::InvalidGame(game_id.to_string()))?;
        generate_specials(pool.count as usize, pool.max, rng)
    }
}
