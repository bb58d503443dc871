use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Constantes heuristiques du moteur. Toutes surchargeables par fichier JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hot_bonus: f64,
    pub cold_bonus: f64,
    /// Bonus de participation, appliqué à tous les numéros quand `use_mixed`.
    pub mixed_bonus: f64,
    pub hot_fraction: f64,
    pub cold_fraction: f64,
    /// En dessous, pas de classification (données insuffisantes).
    pub min_classified: usize,

    pub recency_window: usize,
    pub absence_bonus_cap: f64,
    pub recent_draws: usize,
    pub recent_penalty: f64,

    pub prime_bonus: f64,
    pub balanced_bonus: f64,
    pub edge_margin: u8,
    pub edge_penalty: f64,
    pub distribution_bonus: f64,

    pub pair_threshold: u32,
    pub pair_penalty_factor: f64,

    /// Budget partagé entre la sélection pondérée et l'anti-répétition.
    pub max_attempts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hot_bonus: 30.0,
            cold_bonus: 25.0,
            mixed_bonus: 20.0,
            hot_fraction: 0.3,
            cold_fraction: 0.3,
            min_classified: 3,
            recency_window: 50,
            absence_bonus_cap: 25.0,
            recent_draws: 5,
            recent_penalty: 10.0,
            prime_bonus: 5.0,
            balanced_bonus: 3.0,
            edge_margin: 3,
            edge_penalty: 2.0,
            distribution_bonus: 10.0,
            pair_threshold: 10,
            pair_penalty_factor: 0.1,
            max_attempts: 1000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, fraction) in [("hot_fraction", self.hot_fraction), ("cold_fraction", self.cold_fraction)] {
            if !(0.0..=1.0).contains(&fraction) {
                bail!("{} doit être dans [0, 1], reçu {}", name, fraction);
            }
        }
        if self.hot_fraction + self.cold_fraction > 1.0 {
            bail!(
                "hot_fraction + cold_fraction dépasse 1 ({} + {})",
                self.hot_fraction, self.cold_fraction
            );
        }
        if self.max_attempts == 0 {
            bail!("max_attempts doit être strictement positif");
        }
        let weights = [
            self.hot_bonus,
            self.cold_bonus,
            self.mixed_bonus,
            self.absence_bonus_cap,
            self.recent_penalty,
            self.prime_bonus,
            self.balanced_bonus,
            self.edge_penalty,
            self.distribution_bonus,
            self.pair_penalty_factor,
        ];
        if weights.iter().any(|w| !w.is_finite()) {
            bail!("Poids non fini dans la configuration");
        }
        Ok(())
    }
}

pub fn save_config(config: &EngineConfig, path: &std::path::Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)
        .with_context(|| format!("Impossible d'écrire {:?}", path))?;
    Ok(())
}

pub fn load_config(path: &std::path::Path) -> Result<EngineConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {:?}", path))?;
    let config: EngineConfig = serde_json::from_str(&json)
        .with_context(|| format!("Configuration invalide dans {:?}", path))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attempts, 1000);
        assert_eq!(config.recency_window, 50);
        assert!((config.hot_bonus - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"hot_bonus": 50.0}"#).unwrap();
        assert!((config.hot_bonus - 50.0).abs() < 1e-10);
        assert!((config.cold_bonus - 25.0).abs() < 1e-10);
        assert_eq!(config.pair_threshold, 10);
    }

    #[test]
    fn test_invalid_fractions() {
        let config = EngineConfig { hot_fraction: 1.5, ..Default::default() };
        assert!(config.validate().is_err());

        let config = EngineConfig { hot_fraction: 0.6, cold_fraction: 0.6, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = EngineConfig { max_attempts: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("palpite-config-{}.json", std::process::id()));
        let config = EngineConfig { distribution_bonus: 12.5, ..Default::default() };
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
