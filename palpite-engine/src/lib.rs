pub mod api;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod scoring;
pub mod selection;
pub mod specials;

pub use engine::{GameCatalog, Generation, GenerationPreferences, NumberSelectionEngine};
pub use error::EngineError;
