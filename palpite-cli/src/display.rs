use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::import::ImportResult;
use palpite_db::models::{Combination, DrawResult, FrequencyEntry, Game, GameCheck, UserGame};
use palpite_engine::classify::{Category, HeatEntry};
use palpite_engine::Generation;

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_games(games: &[Game]) {
    let mut table = new_table(vec!["Id", "Jeu", "Numéros", "Grille", "Tirage", "Spéciaux"]);
    for game in games {
        let special = game
            .special
            .map(|s| format!("{} parmi 1-{}", s.count, s.max))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            game.id.clone(),
            game.name.clone(),
            format!("1-{}", game.max_number),
            format!("{} à {}", game.min_numbers, game.max_numbers),
            game.draw_size.to_string(),
            special,
        ]);
    }
    println!("{table}");
}

pub fn display_results(results: &[DrawResult]) {
    if results.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Concours", "Date", "Numéros", "Spéciaux"]);
    for result in results {
        let specials = if result.specials.is_empty() {
            "-".to_string()
        } else {
            join_numbers(&result.specials)
        };
        table.add_row(vec![
            result.contest_number.to_string(),
            result.date.clone(),
            result.combination().to_string(),
            specials,
        ]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_frequencies(game: &Game, entries: &[FrequencyEntry], window: Option<u32>) {
    let scope = match window {
        Some(w) => format!("{} derniers tirages", w),
        None => "tout l'historique".to_string(),
    };
    let total: u32 = entries.iter().map(|e| e.frequency).sum();
    println!(
        "Fréquences recalculées pour {} ({}) : {} numéros, {} apparitions.",
        game.name, scope, entries.len(), total
    );
}

pub fn display_heat_map(game: &Game, entries: &[HeatEntry], n_results: u32) {
    println!("\n📊 Carte de chaleur {} ({} tirages)\n", game.name, n_results);

    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));

    let mut table = new_table(vec!["Numéro", "Fréquence", "Retard", "Tag"]);
    for entry in &sorted {
        let color = match entry.category {
            Category::Hot => Color::Red,
            Category::Cold => Color::Blue,
            Category::Mixed => Color::White,
        };
        table.add_row(vec![
            Cell::new(format!("{:02}", entry.number)),
            Cell::new(entry.frequency.to_string()),
            Cell::new(entry.gap.to_string()),
            Cell::new(entry.category.to_string()).fg(color),
        ]);
    }
    println!("{table}");
}

pub fn display_generations(game: &Game, generations: &[(Generation, Option<Combination>)]) {
    println!("\n🎲 Suggestions {}\n", game.name);

    let mut table = new_table(vec!["#", "Numéros", "Spéciaux", "Remarque"]);
    for (i, (generation, specials)) in generations.iter().enumerate() {
        let specials = specials
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let note = match (generation.repeats_history, generation.degraded) {
            (true, _) => Cell::new("déjà tirée").fg(Color::Yellow),
            (false, true) => Cell::new("données insuffisantes").fg(Color::Yellow),
            (false, false) => Cell::new(""),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(generation.combination.to_string()),
            Cell::new(specials),
            note,
        ]);
    }
    println!("{table}");
}

pub fn display_user_games(games: &[UserGame]) {
    if games.is_empty() {
        println!("Aucune grille enregistrée.");
        return;
    }
    let mut table = new_table(vec!["Id", "Numéros", "Concours", "Créée le"]);
    for game in games {
        table.add_row(vec![
            game.id.to_string(),
            game.numbers.to_string(),
            game.contest_number.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            game.created_at.clone(),
        ]);
    }
    println!("{table}");
}

pub fn display_checks(checks: &[(UserGame, GameCheck)]) {
    if checks.is_empty() {
        println!("Aucune grille à vérifier.");
        return;
    }
    let mut table = new_table(vec!["Id", "Numéros", "Concours", "Points", "Trouvés"]);
    for (game, check) in checks {
        let hits = Cell::new(check.hits);
        let hits = if check.hits > 0 { hits.fg(Color::Green) } else { hits };
        table.add_row(vec![
            Cell::new(game.id),
            Cell::new(game.numbers.to_string()),
            Cell::new(check.contest_number),
            hits,
            Cell::new(join_numbers(&check.matched)),
        ]);
    }
    println!("{table}");
}
