mod display;
mod import;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use palpite_db::db::{
    count_results, db_path, fetch_all_results, fetch_frequencies, fetch_game, fetch_games,
    fetch_recent_results, fetch_result, fetch_user_games, insert_result, insert_user_game, migrate,
    open_db, recompute_frequencies, seed_default_games,
};
use palpite_db::models::{Combination, DrawResult, Game, check_user_game, validate_result, validate_user_numbers};
use palpite_db::rusqlite::Connection;
use palpite_engine::api::{PredictRequest, handle_predict};
use palpite_engine::classify::heat_map;
use palpite_engine::config::{EngineConfig, load_config, save_config};
use palpite_engine::history::SqliteHistory;
use palpite_engine::specials::generate_specials;
use palpite_engine::{GameCatalog, GenerationPreferences, NumberSelectionEngine};

#[derive(Parser)]
#[command(name = "palpite", about = "Suggestions de grilles pour les loteries brésiliennes")]
struct Cli {
    /// Chemin de la base SQLite (défaut: data/palpite.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Fichier de configuration du moteur (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Filtre de logs (ex: warn, info, palpite_engine=debug)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lister les jeux connus
    Games,

    /// Importer des tirages depuis un fichier CSV
    Import {
        #[arg(short, long)]
        game: String,

        /// Chemin vers le fichier CSV (concours;date;numéros...)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        #[arg(short, long)]
        game: String,

        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Ajouter un tirage manuellement
    Add {
        #[arg(short, long)]
        game: String,
    },

    /// Recalculer la table des fréquences
    Frequencies {
        #[arg(short, long)]
        game: String,

        /// Fenêtre de calcul (nombre de tirages, défaut: tout l'historique)
        #[arg(short, long)]
        window: Option<u32>,
    },

    /// Carte de chaleur : fréquences, retards, chauds / froids
    Stats {
        #[arg(short, long)]
        game: String,
    },

    /// Générer des grilles
    Predict {
        #[arg(short, long)]
        game: String,

        /// Nombre de numéros par grille (défaut: minimum du jeu)
        #[arg(short, long)]
        count: Option<usize>,

        /// Favoriser les numéros chauds
        #[arg(long)]
        hot: bool,

        /// Favoriser les numéros froids
        #[arg(long)]
        cold: bool,

        /// Bonus de participation pour tous les numéros
        #[arg(long)]
        mixed: bool,

        /// Nombre de grilles à générer
        #[arg(long, default_value = "3")]
        grids: usize,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,

        /// Sortie JSON ({"numbers": [...]})
        #[arg(long)]
        json: bool,
    },

    /// Tirer des numéros spéciaux (ex: trèfles)
    Specials {
        #[arg(short, long, default_value = "2")]
        count: usize,

        #[arg(short, long, default_value = "6")]
        max: u8,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Enregistrer une grille jouée
    Bet {
        #[arg(short, long)]
        game: String,

        /// Concours visé (défaut: le prochain tirage importé)
        #[arg(long)]
        contest: Option<u32>,

        numbers: Vec<u8>,
    },

    /// Vérifier les grilles enregistrées contre les tirages
    Check {
        #[arg(short, long)]
        game: String,

        /// Concours à vérifier (défaut: concours de la grille, sinon le dernier tirage)
        #[arg(long)]
        contest: Option<u32>,
    },

    /// Écrire la configuration par défaut du moteur
    InitConfig {
        #[arg(short, long, default_value = "palpite.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    let path = cli.db.clone().unwrap_or_else(db_path);
    let conn = open_db(&path)?;
    migrate(&conn)?;
    seed_default_games(&conn)?;

    let config = match &cli.config {
        Some(p) => load_config(p)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Games => {
            display::display_games(&fetch_games(&conn)?);
            Ok(())
        }
        Command::Import { game, file } => cmd_import(&conn, &game, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { game, last } => cmd_list(&conn, &game, last),
        Command::Add { game } => cmd_add(&conn, &game),
        Command::Frequencies { game, window } => cmd_frequencies(&conn, &game, window),
        Command::Stats { game } => cmd_stats(&conn, &game, &config),
        Command::Predict { game, count, hot, cold, mixed, grids, seed, json } => {
            let preferences = GenerationPreferences { use_hot: hot, use_cold: cold, use_mixed: mixed };
            cmd_predict(&conn, config, &game, count, preferences, grids, seed, json)
        }
        Command::Specials { count, max, seed } => {
            let mut rng = make_rng(seed);
            let specials = generate_specials(count, max, &mut rng)?;
            println!("{specials}");
            Ok(())
        }
        Command::Bet { game, contest, numbers } => cmd_bet(&conn, &game, contest, &numbers),
        Command::Check { game, contest } => cmd_check(&conn, &game, contest),
        Command::InitConfig { output } => {
            save_config(&EngineConfig::default(), &output)?;
            println!("Configuration écrite dans : {}", output.display());
            Ok(())
        }
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

fn require_game(conn: &Connection, id: &str) -> Result<Game> {
    fetch_game(conn, id)?
        .with_context(|| format!("Jeu inconnu : {}. Lancez : palpite games", id))
}

fn require_results(conn: &Connection, game: &Game) -> Result<u32> {
    let n = count_results(conn, &game.id)?;
    if n == 0 {
        bail!("Aucun tirage pour {}. Lancez d'abord : palpite import --game {}", game.name, game.id);
    }
    Ok(n)
}

/// Recalcule les fréquences si la table est vide alors que des tirages existent.
fn ensure_frequencies(conn: &Connection, game: &Game) -> Result<()> {
    let stored = fetch_frequencies(conn, &game.id)?;
    if stored.iter().all(|e| e.frequency == 0) && count_results(conn, &game.id)? > 0 {
        info!(game = %game.id, "table des fréquences vide, recalcul");
        recompute_frequencies(conn, game, None)?;
    }
    Ok(())
}

fn cmd_import(conn: &Connection, game_id: &str, file: &Path) -> Result<()> {
    let game = require_game(conn, game_id)?;
    let result = import::import_csv(conn, &game, file)?;
    info!(game = %game.id, inserted = result.inserted, "import terminé");
    display::display_import_summary(&result);

    if result.inserted > 0 {
        let entries = recompute_frequencies(conn, &game, None)?;
        display::display_frequencies(&game, &entries, None);
    }
    Ok(())
}

fn cmd_list(conn: &Connection, game_id: &str, last: u32) -> Result<()> {
    let game = require_game(conn, game_id)?;
    require_results(conn, &game)?;
    display::display_results(&fetch_recent_results(conn, &game.id, last)?);
    Ok(())
}

fn cmd_frequencies(conn: &Connection, game_id: &str, window: Option<u32>) -> Result<()> {
    let game = require_game(conn, game_id)?;
    require_results(conn, &game)?;
    let entries = recompute_frequencies(conn, &game, window)?;
    display::display_frequencies(&game, &entries, window);
    Ok(())
}

fn cmd_stats(conn: &Connection, game_id: &str, config: &EngineConfig) -> Result<()> {
    let game = require_game(conn, game_id)?;
    let n = require_results(conn, &game)?;
    ensure_frequencies(conn, &game)?;

    let frequencies = fetch_frequencies(conn, &game.id)?;
    let results = fetch_all_results(conn, &game.id)?;
    let entries = heat_map(game.max_number, &frequencies, &results, config);
    display::display_heat_map(&game, &entries, n);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_predict(
    conn: &Connection,
    config: EngineConfig,
    game_id: &str,
    count: Option<usize>,
    preferences: GenerationPreferences,
    grids: usize,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let game = require_game(conn, game_id)?;
    ensure_frequencies(conn, &game)?;

    let engine = NumberSelectionEngine::with_config(
        GameCatalog::new(fetch_games(conn)?),
        SqliteHistory::new(conn),
        config,
    );
    let count = count.unwrap_or(game.min_numbers as usize);
    let mut rng = make_rng(seed);

    if json {
        let request = PredictRequest {
            lottery_id: game.id.clone(),
            count,
            preferences,
        };
        let responses = (0..grids.max(1))
            .map(|_| handle_predict(&engine, &request, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;
        let output = if responses.len() == 1 {
            serde_json::to_string_pretty(&responses[0])?
        } else {
            serde_json::to_string_pretty(&responses)?
        };
        println!("{output}");
        return Ok(());
    }

    if !game.accepts_pick_count(count) {
        bail!(
            "{} accepte entre {} et {} numéros, reçu {}",
            game.name, game.min_numbers, game.max_numbers, count
        );
    }

    let mut generations = Vec::with_capacity(grids);
    for _ in 0..grids {
        let generation = engine.generate_detailed(&game.id, count, preferences, &mut rng)?;
        let specials = match game.special {
            Some(_) => Some(engine.generate_game_specials(&game.id, &mut rng)?),
            None => None,
        };
        generations.push((generation, specials));
    }
    display::display_generations(&game, &generations);
    Ok(())
}

fn cmd_bet(conn: &Connection, game_id: &str, contest: Option<u32>, numbers: &[u8]) -> Result<()> {
    let game = require_game(conn, game_id)?;
    validate_user_numbers(&game, numbers)?;

    let saved = insert_user_game(conn, &game.id, &Combination::new(numbers.to_vec()), contest)?;
    println!("Grille n°{} enregistrée : {}", saved.id, saved.numbers);
    Ok(())
}

fn cmd_check(conn: &Connection, game_id: &str, contest: Option<u32>) -> Result<()> {
    let game = require_game(conn, game_id)?;
    require_results(conn, &game)?;

    let user_games = fetch_user_games(conn, &game.id)?;
    if user_games.is_empty() {
        display::display_user_games(&user_games);
        return Ok(());
    }

    let latest = fetch_recent_results(conn, &game.id, 1)?.into_iter().next();

    let mut checks = Vec::new();
    for user_game in user_games {
        let target = contest.or(user_game.contest_number);
        let result = match target {
            Some(c) => fetch_result(conn, &game.id, c)?,
            None => latest.clone(),
        };
        match result {
            Some(result) => {
                let check = check_user_game(&user_game, &result);
                checks.push((user_game, check));
            }
            None => println!(
                "Grille n°{} : concours {} pas encore importé.",
                user_game.id,
                target.map(|c| c.to_string()).unwrap_or_default()
            ),
        }
    }
    display::display_checks(&checks);
    Ok(())
}

fn cmd_add(conn: &Connection, game_id: &str) -> Result<()> {
    let game = require_game(conn, game_id)?;
    println!("Ajout d'un tirage {} manuellement\n", game.name);

    let contest_raw = prompt("Numéro du concours (ex: 2700) : ")?;
    let contest_number: u32 = contest_raw
        .parse()
        .with_context(|| format!("Numéro de concours invalide : '{}'", contest_raw))?;
    let date = import::parse_date(&prompt("Date (JJ/MM/AAAA) : ")?)?;

    let numbers = prompt_numbers(
        &format!("{} numéros (séparés par des espaces, 1-{}) : ", game.draw_size, game.max_number),
        game.draw_size as usize,
    )?;
    let specials = match game.special {
        Some(pool) => prompt_numbers(
            &format!("{} numéros spéciaux (1-{}) : ", pool.count, pool.max),
            pool.count as usize,
        )?,
        None => Vec::new(),
    };

    validate_result(&game, &numbers, &specials)?;

    let draw = DrawResult {
        game_id: game.id.clone(),
        contest_number,
        date,
        numbers,
        specials,
    };

    println!("\nTirage à insérer :");
    display::display_results(&[draw.clone()]);

    let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.trim().to_lowercase() == "o" {
        let inserted = insert_result(conn, &draw)?;
        if inserted {
            recompute_frequencies(conn, &game, None)?;
            println!("Tirage inséré avec succès.");
        } else {
            println!("Ce concours existe déjà (doublon ignoré).");
        }
    } else {
        println!("Insertion annulée.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}

fn prompt_numbers(msg: &str, expected: usize) -> Result<Vec<u8>> {
    loop {
        let input = prompt(msg)?;
        let nums: Result<Vec<u8>, _> = input.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(v) if v.len() == expected => return Ok(v),
            _ => println!("Entrez exactement {} numéros. Réessayez.", expected),
        }
    }
}
