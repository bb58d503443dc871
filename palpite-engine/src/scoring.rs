use palpite_db::models::DrawResult;

use crate::classify::{Category, Classification};
use crate::config::EngineConfig;
use crate::engine::GenerationPreferences;

pub fn is_prime(n: u8) -> bool {
    if n < 2 {
        return false;
    }
    let n = n as u32;
    (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

/// Sous-plage (tiers) d'un numéro : 0, 1 ou 2.
pub fn third_of(number: u8, max_number: u8) -> usize {
    let max = max_number.max(1) as usize;
    (((number as usize).saturating_sub(1)) * 3 / max).min(2)
}

/// Co-occurrences historiques de chaque paire de numéros.
#[derive(Debug, Clone)]
pub struct PairCounts {
    size: usize,
    counts: Vec<u32>,
}

impl PairCounts {
    pub fn from_results(max_number: u8, results: &[DrawResult]) -> Self {
        let size = max_number as usize;
        let mut counts = vec![0u32; size * size];
        for draw in results {
            let numbers: Vec<usize> = draw
                .numbers
                .iter()
                .map(|&n| (n as usize).wrapping_sub(1))
                .filter(|&idx| idx < size)
                .collect();
            for (i, &a) in numbers.iter().enumerate() {
                for &b in &numbers[i + 1..] {
                    counts[a * size + b] += 1;
                    counts[b * size + a] += 1;
                }
            }
        }
        Self { size, counts }
    }

    pub fn get(&self, a: u8, b: u8) -> u32 {
        let (a, b) = ((a as usize).wrapping_sub(1), (b as usize).wrapping_sub(1));
        if a < self.size && b < self.size {
            self.counts[a * self.size + b]
        } else {
            0
        }
    }
}

/// Partie du score indépendante de la grille en construction.
///
/// `recent` : tirages du plus récent au plus ancien, déjà tronqués à la fenêtre de récence.
pub fn base_scores(
    max_number: u8,
    classification: &Classification,
    preferences: &GenerationPreferences,
    recent: &[DrawResult],
    config: &EngineConfig,
) -> Vec<f64> {
    let window = recent.len().min(config.recency_window);
    let recent = &recent[..window];

    let mut gaps = vec![window; max_number as usize];
    for (t, draw) in recent.iter().enumerate() {
        for &n in &draw.numbers {
            let idx = (n as usize).wrapping_sub(1);
            if idx < gaps.len() && gaps[idx] == window {
                gaps[idx] = t;
            }
        }
    }

    (1..=max_number)
        .map(|n| {
            let mut score = 0.0;

            // Préférences
            match classification.category(n) {
                Category::Hot if preferences.use_hot => score += config.hot_bonus,
                Category::Cold if preferences.use_cold => score += config.cold_bonus,
                _ => {}
            }
            if preferences.use_mixed {
                score += config.mixed_bonus;
            }

            // Retard
            if window > 0 {
                let gap = gaps[(n - 1) as usize];
                score += config.absence_bonus_cap * gap as f64 / window as f64;
                if gap < window && gap < config.recent_draws {
                    score -= config.recent_penalty;
                }
            }

            score + structural_bonus(n, max_number, config)
        })
        .collect()
}

fn structural_bonus(n: u8, max_number: u8, config: &EngineConfig) -> f64 {
    let mut bonus = 0.0;
    if is_prime(n) {
        bonus += config.prime_bonus;
    }

    let position = n as f64;
    let max = max_number as f64;
    if position > max * 0.2 && position <= max * 0.8 {
        bonus += config.balanced_bonus;
    }

    let margin = config.edge_margin as u16;
    if (n as u16) <= margin || (n as u16) + margin > max_number as u16 {
        bonus -= config.edge_penalty;
    }
    bonus
}

/// Ajustement recalculé à chaque tour : répartition par tiers et paires trop fréquentes.
pub fn round_adjustment(
    n: u8,
    selected: &[u8],
    max_number: u8,
    pairs: &PairCounts,
    config: &EngineConfig,
) -> f64 {
    let mut adjustment = 0.0;

    let third = third_of(n, max_number);
    if !selected.iter().any(|&s| third_of(s, max_number) == third) {
        adjustment += config.distribution_bonus;
    }

    for &s in selected {
        let count = pairs.get(n, s);
        if count > config.pair_threshold {
            adjustment -= count as f64 * config.pair_penalty_factor;
        }
    }

    adjustment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use palpite_db::models::FrequencyEntry;

    fn draw(contest: u32, numbers: Vec<u8>) -> DrawResult {
        DrawResult {
            game_id: "t".to_string(),
            contest_number: contest,
            date: String::new(),
            numbers,
            specials: vec![],
        }
    }

    fn all_mixed(max_number: u8) -> Classification {
        classify(max_number, &[], &EngineConfig::default())
    }

    #[test]
    fn test_is_prime() {
        let primes: Vec<u8> = (0..=30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(is_prime(251));
        assert!(!is_prime(255));
    }

    #[test]
    fn test_third_of() {
        assert_eq!(third_of(1, 60), 0);
        assert_eq!(third_of(20, 60), 0);
        assert_eq!(third_of(21, 60), 1);
        assert_eq!(third_of(41, 60), 2);
        assert_eq!(third_of(60, 60), 2);
        assert_eq!(third_of(25, 25), 2);
    }

    #[test]
    fn test_pair_counts() {
        let results = vec![draw(1, vec![1, 2, 3]), draw(2, vec![1, 2, 9]), draw(3, vec![4, 5, 6])];
        let pairs = PairCounts::from_results(10, &results);
        assert_eq!(pairs.get(1, 2), 2);
        assert_eq!(pairs.get(2, 1), 2);
        assert_eq!(pairs.get(1, 3), 1);
        assert_eq!(pairs.get(1, 4), 0);
        assert_eq!(pairs.get(1, 11), 0);
    }

    #[test]
    fn test_structural_bonus() {
        let config = EngineConfig::default();
        // 1 : bord, ni premier ni central
        assert!((structural_bonus(1, 60, &config) + 2.0).abs() < 1e-10);
        // 31 : premier et central
        assert!((structural_bonus(31, 60, &config) - 8.0).abs() < 1e-10);
        // 30 : central seulement
        assert!((structural_bonus(30, 60, &config) - 3.0).abs() < 1e-10);
        // 59 : premier mais au bord
        assert!((structural_bonus(59, 60, &config) - 3.0).abs() < 1e-10);
        assert!((structural_bonus(58, 60, &config) + 2.0).abs() < 1e-10);
        assert!((structural_bonus(57, 60, &config) - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_preference_bonuses() {
        let config = EngineConfig::default();
        let freqs: Vec<FrequencyEntry> = (1..=10).map(|n| FrequencyEntry { number: n, frequency: n as u32 }).collect();
        let classification = classify(10, &freqs, &config);

        let none = GenerationPreferences::default();
        let hot = GenerationPreferences { use_hot: true, ..Default::default() };
        let cold = GenerationPreferences { use_cold: true, ..Default::default() };
        let mixed = GenerationPreferences { use_mixed: true, ..Default::default() };

        let base = base_scores(10, &classification, &none, &[], &config);
        let with_hot = base_scores(10, &classification, &hot, &[], &config);
        let with_cold = base_scores(10, &classification, &cold, &[], &config);
        let with_mixed = base_scores(10, &classification, &mixed, &[], &config);

        // 10 est chaud, 1 est froid, 5 est mixte
        assert!((with_hot[9] - base[9] - 30.0).abs() < 1e-10);
        assert!((with_hot[0] - base[0]).abs() < 1e-10);
        assert!((with_cold[0] - base[0] - 25.0).abs() < 1e-10);
        assert!((with_cold[9] - base[9]).abs() < 1e-10);
        for i in 0..10 {
            assert!((with_mixed[i] - base[i] - 20.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_recency_bonus_and_penalty() {
        let config = EngineConfig::default();
        let prefs = GenerationPreferences::default();
        // 10 tirages ; 1 sort au dernier, 2 au 7e plus récent, 3 jamais
        let mut recent: Vec<DrawResult> = (0..10).map(|t| draw(100 - t, vec![50])).collect();
        recent[0].numbers.push(1);
        recent[6].numbers.push(2);

        let scores = base_scores(60, &all_mixed(60), &prefs, &recent, &config);
        let structural = |n: u8| structural_bonus(n, 60, &config);

        assert!((scores[0] - structural(1) - (0.0 - 10.0)).abs() < 1e-10);
        assert!((scores[1] - structural(2) - 25.0 * 6.0 / 10.0).abs() < 1e-10);
        assert!((scores[2] - structural(3) - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_recency_window_capped() {
        let config = EngineConfig { recency_window: 4, ..Default::default() };
        let prefs = GenerationPreferences::default();
        let mut recent: Vec<DrawResult> = (0..10).map(|t| draw(100 - t, vec![50])).collect();
        recent[8].numbers.push(7);

        // 7 hors fenêtre : traité comme absent
        let scores = base_scores(60, &all_mixed(60), &prefs, &recent, &config);
        assert!((scores[6] - structural_bonus(7, 60, &config) - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_round_adjustment_distribution() {
        let config = EngineConfig::default();
        let pairs = PairCounts::from_results(60, &[]);
        assert!((round_adjustment(5, &[], 60, &pairs, &config) - 10.0).abs() < 1e-10);
        assert!((round_adjustment(5, &[10], 60, &pairs, &config) - 0.0).abs() < 1e-10);
        assert!((round_adjustment(45, &[10], 60, &pairs, &config) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_round_adjustment_pair_penalty() {
        let config = EngineConfig::default();
        let results: Vec<DrawResult> = (0..12).map(|t| draw(t, vec![1, 2])).collect();
        let pairs = PairCounts::from_results(60, &results);

        // 12 co-occurrences > 10 : pénalité 12 × 0.1
        let adj = round_adjustment(2, &[1], 60, &pairs, &config);
        assert!((adj + 1.2).abs() < 1e-10, "adj = {}", adj);

        let few: Vec<DrawResult> = (0..10).map(|t| draw(t, vec![1, 2])).collect();
        let pairs = PairCounts::from_results(60, &few);
        assert!((round_adjustment(2, &[1], 60, &pairs, &config) - 0.0).abs() < 1e-10);
    }
}
