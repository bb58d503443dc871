//! Frontière appelant → moteur : requête et réponse de prédiction (JSON camelCase).
//!
//! La validation du nombre de numéros contre les bornes du jeu se fait ici,
//! avant l'appel au moteur.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{GenerationPreferences, NumberSelectionEngine};
use crate::error::EngineError;
use crate::history::DrawHistory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub lottery_id: String,
    pub count: usize,
    #[serde(default)]
    pub preferences: GenerationPreferences,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub numbers: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specials: Vec<u8>,
    #[serde(default)]
    pub repeats_history: bool,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{game} accepte entre {min} et {max} numéros, reçu {count}")]
    CountOutOfRange { game: String, count: usize, min: u8, max: u8 },
}

impl ApiError {
    /// Code HTTP équivalent.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Engine(EngineError::InvalidGame(_)) => 404,
            ApiError::Engine(EngineError::InvalidCount { .. }) | ApiError::CountOutOfRange { .. } => 400,
            ApiError::Engine(EngineError::History(_)) => 500,
        }
    }
}

pub fn handle_predict<H: DrawHistory, R: Rng>(
    engine: &NumberSelectionEngine<H>,
    request: &PredictRequest,
    rng: &mut R,
) -> Result<PredictResponse, ApiError> {
    let game = engine.game(&request.lottery_id)?;
    if !game.accepts_pick_count(request.count) {
        return Err(ApiError::CountOutOfRange {
            game: game.name.clone(),
            count: request.count,
            min: game.min_numbers,
            max: game.max_numbers,
        });
    }

    let generation = engine.generate_detailed(&request.lottery_id, request.count, request.preferences, rng)?;
    let specials = match game.special {
        Some(_) => engine.generate_game_specials(&request.lottery_id, rng)?.into_vec(),
        None => Vec::new(),
    };

    Ok(PredictResponse {
        numbers: generation.combination.into_vec(),
        specials,
        repeats_history: generation.repeats_history,
    })
}
