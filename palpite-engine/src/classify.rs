use palpite_db::models::{DrawResult, FrequencyEntry};
use serde::Serialize;

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Hot,
    Cold,
    Mixed,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Hot => write!(f, "HOT"),
            Category::Cold => write!(f, "COLD"),
            Category::Mixed => write!(f, "MIXED"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    /// categories[n - 1] = catégorie du numéro n
    pub categories: Vec<Category>,
    pub mean_frequency: f64,
    /// Moins de `min_classified` numéros avec des données : tout est `Mixed`.
    pub degraded: bool,
}

impl Classification {
    pub fn category(&self, number: u8) -> Category {
        self.categories
            .get((number as usize).wrapping_sub(1))
            .copied()
            .unwrap_or(Category::Mixed)
    }

    pub fn numbers_in(&self, category: Category) -> Vec<u8> {
        self.categories
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == category)
            .map(|(i, _)| (i + 1) as u8)
            .collect()
    }
}

fn share(fraction: f64, n: usize) -> usize {
    // epsilon : 0.3 * 10 ne doit pas donner 4
    ((fraction * n as f64 - 1e-9).ceil().max(1.0)) as usize
}

/// Répartit `1..=max_number` en chauds / froids / mixtes selon la fréquence.
pub fn classify(max_number: u8, frequencies: &[FrequencyEntry], config: &EngineConfig) -> Classification {
    let n = max_number as usize;
    let mut freqs = vec![0u32; n];
    for entry in frequencies {
        let idx = (entry.number as usize).wrapping_sub(1);
        if idx < n {
            freqs[idx] = entry.frequency;
        }
    }

    let mean_frequency = if n > 0 {
        freqs.iter().map(|&f| f as f64).sum::<f64>() / n as f64
    } else {
        0.0
    };

    let with_data = freqs.iter().filter(|&&f| f > 0).count();
    if with_data < config.min_classified {
        return Classification {
            categories: vec![Category::Mixed; n],
            mean_frequency,
            degraded: true,
        };
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| freqs[b].cmp(&freqs[a]).then(a.cmp(&b)));

    let hot_len = share(config.hot_fraction, n).min(n);
    let cold_len = share(config.cold_fraction, n).min(n - hot_len);

    let mut categories = vec![Category::Mixed; n];
    for &idx in order.iter().take(hot_len) {
        categories[idx] = Category::Hot;
    }
    for &idx in order.iter().rev().take(cold_len) {
        categories[idx] = Category::Cold;
    }

    Classification {
        categories,
        mean_frequency,
        degraded: false,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatEntry {
    pub number: u8,
    pub frequency: u32,
    /// Nombre de tirages depuis la dernière apparition.
    pub gap: u32,
    pub category: Category,
}

/// Carte de chaleur : fréquence, retard et catégorie de chaque numéro.
/// `results` du plus récent au plus ancien.
pub fn heat_map(
    max_number: u8,
    frequencies: &[FrequencyEntry],
    results: &[DrawResult],
    config: &EngineConfig,
) -> Vec<HeatEntry> {
    let classification = classify(max_number, frequencies, config);

    let mut gaps = vec![results.len() as u32; max_number as usize];
    for (t, draw) in results.iter().enumerate() {
        for &n in &draw.numbers {
            let idx = (n as usize).wrapping_sub(1);
            if idx < gaps.len() && gaps[idx] == results.len() as u32 {
                gaps[idx] = t as u32;
            }
        }
    }

    (1..=max_number)
        .map(|number| {
            let frequency = frequencies
                .iter()
                .find(|e| e.number == number)
                .map(|e| e.frequency)
                .unwrap_or(0);
            HeatEntry {
                number,
                frequency,
                gap: gaps[(number - 1) as usize],
                category: classification.category(number),
            }
        })
        .collect()
}
