use palpite_db::models::Combination;
use rand::seq::index::sample;
use rand::Rng;

use crate::error::EngineError;

/// `k` numéros distincts uniformes dans `[1, small_max]`, sans score ni anti-répétition.
pub fn generate_specials<R: Rng>(k: usize, small_max: u8, rng: &mut R) -> Result<Combination, EngineError> {
    if k == 0 || k > small_max as usize {
        return Err(EngineError::InvalidCount { count: k, max: small_max as usize });
    }
    let picked = sample(rng, small_max as usize, k)
        .into_iter()
        .map(|i| (i + 1) as u8)
        .collect();
    Ok(Combination::new(picked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_two_of_six() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let c = generate_specials(2, 6, &mut rng).unwrap();
            let n = c.numbers();
            assert_eq!(n.len(), 2);
            assert!(n[0] < n[1]);
            assert!(n[0] >= 1 && n[1] <= 6);
        }
    }

    #[test]
    fn test_full_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let c = generate_specials(6, 6, &mut rng).unwrap();
        assert_eq!(c.numbers(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_every_value_reachable() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = [false; 6];
        for _ in 0..200 {
            for &n in generate_specials(1, 6, &mut rng).unwrap().numbers() {
                seen[(n - 1) as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_invalid_k() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(generate_specials(0, 6, &mut rng), Err(EngineError::InvalidCount { count: 0, max: 6 })));
        assert!(matches!(generate_specials(7, 6, &mut rng), Err(EngineError::InvalidCount { count: 7, max: 6 })));
    }
}
