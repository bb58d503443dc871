use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("jeu inconnu : {0}")]
    InvalidGame(String),

    #[error("nombre de numéros invalide : {count} (attendu entre 1 et {max})")]
    InvalidCount { count: usize, max: usize },

    /// L'historique injecté n'a pas pu être lu (base indisponible).
    #[error("lecture de l'historique impossible : {0:#}")]
    History(anyhow::Error),
}
