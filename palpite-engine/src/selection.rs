use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::config::EngineConfig;
use crate::scoring::{round_adjustment, PairCounts};

/// Compteur d'essais partagé entre remplissage et anti-répétition.
#[derive(Debug, Clone)]
pub struct AttemptBudget {
    used: usize,
    max: usize,
}

impl AttemptBudget {
    pub fn new(max: usize) -> Self {
        Self { used: 0, max }
    }

    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.max {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> usize {
        self.used
    }
}

pub enum Picker<'a> {
    Uniform,
    Weighted {
        base: Vec<f64>,
        pairs: PairCounts,
        config: &'a EngineConfig,
    },
}

fn available(max_number: u8, selected: &[u8], excluded: &[u8]) -> Vec<u8> {
    (1..=max_number)
        .filter(|n| !selected.contains(n) && !excluded.contains(n))
        .collect()
}

pub fn pick_uniform<R: Rng>(max_number: u8, selected: &[u8], excluded: &[u8], rng: &mut R) -> Option<u8> {
    let pool = available(max_number, selected, excluded);
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.random_range(0..pool.len())])
}

impl Picker<'_> {
    /// Tirage pondéré d'un numéro. `None` si aucun poids n'est positif ou si le pool est vide.
    fn pick_weighted<R: Rng>(&self, max_number: u8, selected: &[u8], excluded: &[u8], rng: &mut R) -> Option<u8> {
        let Picker::Weighted { base, pairs, config } = self else {
            return None;
        };
        let pool = available(max_number, selected, excluded);
        let weights: Vec<f64> = pool
            .iter()
            .map(|&n| {
                let score = base[(n - 1) as usize] + round_adjustment(n, selected, max_number, pairs, config);
                if score.is_finite() { score.max(0.0) } else { 0.0 }
            })
            .collect();
        let dist = WeightedIndex::new(&weights).ok()?;
        Some(pool[dist.sample(rng)])
    }

    /// Un numéro de plus. Retombe sur l'uniforme quand le pondéré échoue.
    pub fn pick_one<R: Rng>(&self, max_number: u8, selected: &[u8], excluded: &[u8], rng: &mut R) -> Option<u8> {
        match self {
            Picker::Uniform => pick_uniform(max_number, selected, excluded, rng),
            Picker::Weighted { .. } => self
                .pick_weighted(max_number, selected, excluded, rng)
                .or_else(|| pick_uniform(max_number, selected, excluded, rng)),
        }
    }

    /// Complète `selected` jusqu'à `count`. Chaque tirage pondéré consomme un essai ;
    /// budget épuisé ou poids tous nuls ⇒ le reste est tiré uniformément.
    pub fn fill<R: Rng>(&self, max_number: u8, selected: &mut Vec<u8>, count: usize, budget: &mut AttemptBudget, rng: &mut R) {
        let mut uniform_only = matches!(self, Picker::Uniform);
        while selected.len() < count {
            let next = if !uniform_only && budget.try_consume() {
                match self.pick_weighted(max_number, selected, &[], rng) {
                    Some(n) => Some(n),
                    None => {
                        uniform_only = true;
                        pick_uniform(max_number, selected, &[], rng)
                    }
                }
            } else {
                uniform_only = true;
                pick_uniform(max_number, selected, &[], rng)
            };
            match next {
                Some(n) => selected.push(n),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_budget() {
        let mut budget = AttemptBudget::new(2);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(budget.used(), 2);
    }

    #[test]
    fn test_pick_uniform_respects_exclusions() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let n = pick_uniform(5, &[1, 2], &[3, 4], &mut rng).unwrap();
            assert_eq!(n, 5);
        }
        assert_eq!(pick_uniform(3, &[1, 2], &[3], &mut rng), None);
    }

    #[test]
    fn test_weighted_favors_positive_scores() {
        let config = EngineConfig { distribution_bonus: 0.0, ..Default::default() };
        let mut base = vec![0.0; 10];
        base[6] = 100.0;
        let picker = Picker::Weighted { base, pairs: PairCounts::from_results(10, &[]), config: &config };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(picker.pick_one(10, &[], &[], &mut rng), Some(7));
        }
    }

    #[test]
    fn test_weighted_all_zero_falls_back_to_uniform() {
        let config = EngineConfig { distribution_bonus: 0.0, ..Default::default() };
        let picker = Picker::Weighted { base: vec![-5.0; 10], pairs: PairCounts::from_results(10, &[]), config: &config };
        let mut rng = StdRng::seed_from_u64(3);

        let mut selected = Vec::new();
        let mut budget = AttemptBudget::new(1000);
        picker.fill(10, &mut selected, 10, &mut budget, &mut rng);
        selected.sort();
        assert_eq!(selected, (1..=10).collect::<Vec<u8>>());
        assert_eq!(budget.used(), 1);
    }

    #[test]
    fn test_fill_stops_consuming_when_budget_exhausted() {
        let config = EngineConfig::default();
        let picker = Picker::Weighted { base: vec![1.0; 20], pairs: PairCounts::from_results(20, &[]), config: &config };
        let mut rng = StdRng::seed_from_u64(11);

        let mut selected = Vec::new();
        let mut budget = AttemptBudget::new(3);
        picker.fill(20, &mut selected, 8, &mut budget, &mut rng);

        assert_eq!(selected.len(), 8);
        assert_eq!(budget.used(), 3);
        let mut unique = selected.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);
    }
}
