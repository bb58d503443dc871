use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Numéros auxiliaires tirés à part (ex: les deux trèfles de +Milionária).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialPool {
    pub count: u8,
    pub max: u8,
}

/// Une modalité de loterie. Immuable une fois créée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub max_number: u8,
    /// Bornes du nombre de numéros qu'un joueur peut cocher.
    pub min_numbers: u8,
    pub max_numbers: u8,
    /// Taille du tirage officiel (indépendante des bornes joueur).
    pub draw_size: u8,
    pub special: Option<SpecialPool>,
}

impl Game {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("Identifiant de jeu vide");
        }
        if self.min_numbers < 1 || self.min_numbers > self.max_numbers {
            bail!(
                "Bornes de sélection invalides pour {} : {}..{}",
                self.id, self.min_numbers, self.max_numbers
            );
        }
        if self.max_numbers > self.max_number {
            bail!(
                "{} : max_numbers ({}) dépasse max_number ({})",
                self.id, self.max_numbers, self.max_number
            );
        }
        if self.draw_size < 1 || self.draw_size > self.max_number {
            bail!("{} : taille de tirage {} invalide", self.id, self.draw_size);
        }
        if let Some(special) = self.special {
            if special.count < 1 || special.count > special.max {
                bail!(
                    "{} : numéros spéciaux invalides ({} parmi {})",
                    self.id, special.count, special.max
                );
            }
        }
        Ok(())
    }

    pub fn accepts_pick_count(&self, count: usize) -> bool {
        count >= self.min_numbers as usize && count <= self.max_numbers as usize
    }
}

pub fn default_games() -> Vec<Game> {
    let game = |id: &str, name: &str, max_number: u8, min_numbers: u8, max_numbers: u8, draw_size: u8| Game {
        id: id.to_string(),
        name: name.to_string(),
        max_number,
        min_numbers,
        max_numbers,
        draw_size,
        special: None,
    };

    vec![
        game("megasena", "Mega-Sena", 60, 6, 15, 6),
        game("lotofacil", "Lotofácil", 25, 15, 20, 15),
        game("quina", "Quina", 80, 5, 15, 5),
        game("duplasena", "Dupla Sena", 50, 6, 15, 6),
        game("diadesorte", "Dia de Sorte", 31, 7, 15, 7),
        Game {
            special: Some(SpecialPool { count: 2, max: 6 }),
            ..game("maismilionaria", "+Milionária", 50, 6, 12, 6)
        },
    ]
}

/// Ensemble trié de numéros distincts. Deux combinaisons sont égales si leurs ensembles le sont.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct Combination(Vec<u8>);

impl Combination {
    pub fn new(mut numbers: Vec<u8>) -> Self {
        numbers.sort_unstable();
        numbers.dedup();
        Self(numbers)
    }

    pub fn numbers(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, number: u8) -> bool {
        self.0.binary_search(&number).is_ok()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Combination {
    fn from(numbers: Vec<u8>) -> Self {
        Self::new(numbers)
    }
}

impl From<Combination> for Vec<u8> {
    fn from(combination: Combination) -> Self {
        combination.0
    }
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| format!("{:02}", n)).collect();
        write!(f, "{}", parts.join(" - "))
    }
}

/// Un tirage officiel. Jamais modifié après insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub game_id: String,
    pub contest_number: u32,
    pub date: String,
    pub numbers: Vec<u8>,
    pub specials: Vec<u8>,
}

impl DrawResult {
    pub fn combination(&self) -> Combination {
        Combination::new(self.numbers.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub number: u8,
    pub frequency: u32,
}

/// Comptage des apparitions de chaque numéro de `1..=max_number` dans `draws`.
pub fn count_frequencies(max_number: u8, draws: &[DrawResult]) -> Vec<FrequencyEntry> {
    let mut counts = vec![0u32; max_number as usize];
    for draw in draws {
        for &n in &draw.numbers {
            let idx = (n as usize).wrapping_sub(1);
            if idx < counts.len() {
                counts[idx] += 1;
            }
        }
    }
    counts
        .iter()
        .enumerate()
        .map(|(i, &frequency)| FrequencyEntry { number: (i + 1) as u8, frequency })
        .collect()
}

/// Grille soumise par un joueur, suivie contre les tirages officiels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGame {
    pub id: i64,
    pub game_id: String,
    pub numbers: Combination,
    /// Concours visé ; `None` = comparer au dernier tirage connu.
    pub contest_number: Option<u32>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCheck {
    pub contest_number: u32,
    pub hits: usize,
    pub matched: Vec<u8>,
}

pub fn check_user_game(user_game: &UserGame, result: &DrawResult) -> GameCheck {
    let drawn = result.combination();
    let matched: Vec<u8> = user_game
        .numbers
        .numbers()
        .iter()
        .copied()
        .filter(|&n| drawn.contains(n))
        .collect();
    GameCheck {
        contest_number: result.contest_number,
        hits: matched.len(),
        matched,
    }
}

fn validate_numbers(game: &Game, numbers: &[u8], what: &str) -> Result<()> {
    for &n in numbers {
        if n < 1 || n > game.max_number {
            bail!("{} {} hors limites (1-{})", what, n, game.max_number);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("{} en double : {}", what, numbers[i]);
            }
        }
    }
    Ok(())
}

pub fn validate_result(game: &Game, numbers: &[u8], specials: &[u8]) -> Result<()> {
    if numbers.len() != game.draw_size as usize {
        bail!(
            "{} attend {} numéros par tirage, reçu {}",
            game.name,
            game.draw_size,
            numbers.len()
        );
    }
    validate_numbers(game, numbers, "Numéro")?;

    match game.special {
        Some(pool) => {
            if specials.len() != pool.count as usize {
                bail!("{} attend {} numéros spéciaux, reçu {}", game.name, pool.count, specials.len());
            }
            for &s in specials {
                if s < 1 || s > pool.max {
                    bail!("Numéro spécial {} hors limites (1-{})", s, pool.max);
                }
            }
            if Combination::new(specials.to_vec()).len() != specials.len() {
                bail!("Numéros spéciaux en double");
            }
        }
        None if !specials.is_empty() => bail!("{} n'a pas de numéros spéciaux", game.name),
        None => {}
    }
    Ok(())
}

pub fn validate_user_numbers(game: &Game, numbers: &[u8]) -> Result<()> {
    if !game.accepts_pick_count(numbers.len()) {
        bail!(
            "{} accepte {} à {} numéros, reçu {}",
            game.name, game.min_numbers, game.max_numbers, numbers.len()
        );
    }
    validate_numbers(game, numbers, "Numéro")
}
