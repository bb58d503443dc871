use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::models::{count_frequencies, default_games, Combination, DrawResult, FrequencyEntry, Game, SpecialPool, UserGame};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS games (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    max_number    INTEGER NOT NULL,
    min_numbers   INTEGER NOT NULL,
    max_numbers   INTEGER NOT NULL,
    draw_size     INTEGER NOT NULL,
    special_count INTEGER,
    special_max   INTEGER
);

CREATE TABLE IF NOT EXISTS results (
    game_id         TEXT NOT NULL REFERENCES games(id),
    contest_number  INTEGER NOT NULL,
    date            TEXT NOT NULL,
    numbers         TEXT NOT NULL,
    specials        TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (game_id, contest_number)
);

CREATE TABLE IF NOT EXISTS frequencies (
    game_id    TEXT NOT NULL REFERENCES games(id),
    number     INTEGER NOT NULL,
    frequency  INTEGER NOT NULL,
    PRIMARY KEY (game_id, number)
);

CREATE TABLE IF NOT EXISTS user_games (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id         TEXT NOT NULL REFERENCES games(id),
    numbers         TEXT NOT NULL,
    contest_number  INTEGER,
    created_at      TEXT NOT NULL
);
";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("palpite.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn upsert_game(conn: &Connection, game: &Game) -> Result<()> {
    game.validate()?;
    conn.execute(
        "INSERT INTO games (id, name, max_number, min_numbers, max_numbers, draw_size, special_count, special_max)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            max_number = excluded.max_number,
            min_numbers = excluded.min_numbers,
            max_numbers = excluded.max_numbers,
            draw_size = excluded.draw_size,
            special_count = excluded.special_count,
            special_max = excluded.special_max",
        rusqlite::params![
            game.id,
            game.name,
            game.max_number,
            game.min_numbers,
            game.max_numbers,
            game.draw_size,
            game.special.map(|s| s.count),
            game.special.map(|s| s.max),
        ],
    ).with_context(|| format!("Échec de l'enregistrement du jeu {}", game.id))?;
    Ok(())
}

pub fn seed_default_games(conn: &Connection) -> Result<()> {
    for game in default_games() {
        upsert_game(conn, &game)?;
    }
    Ok(())
}

fn game_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Game> {
    let special_count: Option<u8> = row.get(6)?;
    let special_max: Option<u8> = row.get(7)?;
    Ok(Game {
        id: row.get(0)?,
        name: row.get(1)?,
        max_number: row.get(2)?,
        min_numbers: row.get(3)?,
        max_numbers: row.get(4)?,
        draw_size: row.get(5)?,
        special: match (special_count, special_max) {
            (Some(count), Some(max)) => Some(SpecialPool { count, max }),
            _ => None,
        },
    })
}

pub fn fetch_game(conn: &Connection, id: &str) -> Result<Option<Game>> {
    let game = conn
        .query_row(
            "SELECT id, name, max_number, min_numbers, max_numbers, draw_size, special_count, special_max
             FROM games WHERE id = ?1",
            [id],
            game_from_row,
        )
        .optional()?;
    Ok(game)
}

pub fn fetch_games(conn: &Connection) -> Result<Vec<Game>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, max_number, min_numbers, max_numbers, draw_size, special_count, special_max
         FROM games ORDER BY id"
    )?;
    let games = stmt.query_map([], game_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(games)
}

pub fn insert_result(conn: &Connection, result: &DrawResult) -> Result<bool> {
    let numbers = serde_json::to_string(&result.numbers)?;
    let specials = serde_json::to_string(&result.specials)?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO results (game_id, contest_number, date, numbers, specials)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![result.game_id, result.contest_number, result.date, numbers, specials],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

fn parse_numbers(raw: &str) -> Result<Vec<u8>> {
    serde_json::from_str(raw).with_context(|| format!("Liste de numéros illisible : '{}'", raw))
}

fn query_results(conn: &Connection, game_id: &str, limit: Option<u32>) -> Result<Vec<DrawResult>> {
    let mut stmt = conn.prepare(
        "SELECT game_id, contest_number, date, numbers, specials
         FROM results WHERE game_id = ?1 ORDER BY contest_number DESC LIMIT ?2"
    )?;
    // LIMIT -1 = pas de limite pour SQLite
    let limit: i64 = limit.map(i64::from).unwrap_or(-1);
    let rows = stmt.query_map(rusqlite::params![game_id, limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, u32>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(game_id, contest_number, date, numbers, specials)| {
            Ok(DrawResult {
                game_id,
                contest_number,
                date,
                numbers: parse_numbers(&numbers)?,
                specials: parse_numbers(&specials)?,
            })
        })
        .collect()
}

/// Tous les tirages d'un jeu, le plus récent en premier.
pub fn fetch_all_results(conn: &Connection, game_id: &str) -> Result<Vec<DrawResult>> {
    query_results(conn, game_id, None)
}

pub fn fetch_recent_results(conn: &Connection, game_id: &str, limit: u32) -> Result<Vec<DrawResult>> {
    query_results(conn, game_id, Some(limit))
}

pub fn fetch_result(conn: &Connection, game_id: &str, contest_number: u32) -> Result<Option<DrawResult>> {
    let row = conn
        .query_row(
            "SELECT date, numbers, specials FROM results WHERE game_id = ?1 AND contest_number = ?2",
            rusqlite::params![game_id, contest_number],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )
        .optional()?;
    match row {
        Some((date, numbers, specials)) => Ok(Some(DrawResult {
            game_id: game_id.to_string(),
            contest_number,
            date,
            numbers: parse_numbers(&numbers)?,
            specials: parse_numbers(&specials)?,
        })),
        None => Ok(None),
    }
}

pub fn count_results(conn: &Connection, game_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM results WHERE game_id = ?1",
        [game_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Recalcule entièrement la table des fréquences d'un jeu depuis `results`.
/// `window` limite le calcul aux N derniers tirages.
pub fn recompute_frequencies(conn: &Connection, game: &Game, window: Option<u32>) -> Result<Vec<FrequencyEntry>> {
    let draws = query_results(conn, &game.id, window)?;
    let entries = count_frequencies(game.max_number, &draws);

    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;
    tx.execute("DELETE FROM frequencies WHERE game_id = ?1", [&game.id])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO frequencies (game_id, number, frequency) VALUES (?1, ?2, ?3)"
        )?;
        for entry in &entries {
            stmt.execute(rusqlite::params![game.id, entry.number, entry.frequency])?;
        }
    }
    tx.commit().context("Échec du commit")?;

    Ok(entries)
}

pub fn fetch_frequencies(conn: &Connection, game_id: &str) -> Result<Vec<FrequencyEntry>> {
    let mut stmt = conn.prepare(
        "SELECT number, frequency FROM frequencies WHERE game_id = ?1 ORDER BY number"
    )?;
    let entries = stmt.query_map([game_id], |row| {
        Ok(FrequencyEntry {
            number: row.get(0)?,
            frequency: row.get(1)?,
        })
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

pub fn insert_user_game(conn: &Connection, game_id: &str, numbers: &Combination, contest_number: Option<u32>) -> Result<UserGame> {
    let created_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    conn.execute(
        "INSERT INTO user_games (game_id, numbers, contest_number, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![game_id, serde_json::to_string(numbers)?, contest_number, created_at],
    ).context("Échec de l'enregistrement de la grille")?;

    Ok(UserGame {
        id: conn.last_insert_rowid(),
        game_id: game_id.to_string(),
        numbers: numbers.clone(),
        contest_number,
        created_at,
    })
}

pub fn fetch_user_games(conn: &Connection, game_id: &str) -> Result<Vec<UserGame>> {
    let mut stmt = conn.prepare(
        "SELECT id, game_id, numbers, contest_number, created_at
         FROM user_games WHERE game_id = ?1 ORDER BY id"
    )?;
    let rows = stmt.query_map([game_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<u32>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, game_id, numbers, contest_number, created_at)| {
            Ok(UserGame {
                id,
                game_id,
                numbers: Combination::new(parse_numbers(&numbers)?),
                contest_number,
                created_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        seed_default_games(&conn).unwrap();
        conn
    }

    fn test_result(contest: u32, numbers: Vec<u8>) -> DrawResult {
        DrawResult {
            game_id: "megasena".to_string(),
            contest_number: contest,
            date: format!("2024-01-{:02}", contest % 28 + 1),
            numbers,
            specials: vec![],
        }
    }

    #[test]
    fn test_seed_and_fetch_games() {
        let conn = setup();
        let games = fetch_games(&conn).unwrap();
        assert_eq!(games.len(), default_games().len());

        let game = fetch_game(&conn, "maismilionaria").unwrap().unwrap();
        assert_eq!(game.special, Some(SpecialPool { count: 2, max: 6 }));
        assert!(fetch_game(&conn, "inconnu").unwrap().is_none());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let conn = setup();
        seed_default_games(&conn).unwrap();
        assert_eq!(fetch_games(&conn).unwrap().len(), default_games().len());
    }

    #[test]
    fn test_insert_and_count() {
        let conn = setup();
        assert_eq!(count_results(&conn, "megasena").unwrap(), 0);

        insert_result(&conn, &test_result(1, vec![1, 2, 3, 4, 5, 6])).unwrap();
        assert_eq!(count_results(&conn, "megasena").unwrap(), 1);
        assert_eq!(count_results(&conn, "quina").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = setup();

        let inserted = insert_result(&conn, &test_result(1, vec![1, 2, 3, 4, 5, 6])).unwrap();
        assert!(inserted);
        let inserted = insert_result(&conn, &test_result(1, vec![7, 8, 9, 10, 11, 12])).unwrap();
        assert!(!inserted);
        assert_eq!(count_results(&conn, "megasena").unwrap(), 1);
    }

    #[test]
    fn test_fetch_order_and_limit() {
        let conn = setup();

        insert_result(&conn, &test_result(1, vec![1, 2, 3, 4, 5, 6])).unwrap();
        insert_result(&conn, &test_result(3, vec![7, 8, 9, 10, 11, 12])).unwrap();
        insert_result(&conn, &test_result(2, vec![13, 14, 15, 16, 17, 18])).unwrap();

        let all = fetch_all_results(&conn, "megasena").unwrap();
        let contests: Vec<u32> = all.iter().map(|r| r.contest_number).collect();
        assert_eq!(contests, vec![3, 2, 1]);
        assert_eq!(all[0].numbers, vec![7, 8, 9, 10, 11, 12]);

        let recent = fetch_recent_results(&conn, "megasena", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].contest_number, 2);
    }

    #[test]
    fn test_fetch_result() {
        let conn = setup();
        insert_result(&conn, &test_result(7, vec![1, 2, 3, 4, 5, 6])).unwrap();
        let found = fetch_result(&conn, "megasena", 7).unwrap().unwrap();
        assert_eq!(found.numbers, vec![1, 2, 3, 4, 5, 6]);
        assert!(fetch_result(&conn, "megasena", 8).unwrap().is_none());
    }

    #[test]
    fn test_recompute_frequencies() {
        let conn = setup();
        let game = fetch_game(&conn, "megasena").unwrap().unwrap();

        insert_result(&conn, &test_result(1, vec![1, 2, 3, 4, 5, 6])).unwrap();
        insert_result(&conn, &test_result(2, vec![1, 2, 3, 7, 8, 9])).unwrap();
        insert_result(&conn, &test_result(3, vec![1, 10, 11, 12, 13, 14])).unwrap();

        let entries = recompute_frequencies(&conn, &game, None).unwrap();
        assert_eq!(entries.len(), 60);
        assert_eq!(entries[0], FrequencyEntry { number: 1, frequency: 3 });
        assert_eq!(entries[1].frequency, 2);
        assert_eq!(entries[59].frequency, 0);

        let stored = fetch_frequencies(&conn, "megasena").unwrap();
        assert_eq!(stored, entries);
    }

    #[test]
    fn test_recompute_frequencies_window_replaces() {
        let conn = setup();
        let game = fetch_game(&conn, "megasena").unwrap().unwrap();

        insert_result(&conn, &test_result(1, vec![1, 2, 3, 4, 5, 6])).unwrap();
        insert_result(&conn, &test_result(2, vec![7, 8, 9, 10, 11, 12])).unwrap();

        recompute_frequencies(&conn, &game, None).unwrap();
        let windowed = recompute_frequencies(&conn, &game, Some(1)).unwrap();
        assert_eq!(windowed[0].frequency, 0);
        assert_eq!(windowed[6].frequency, 1);

        let stored = fetch_frequencies(&conn, "megasena").unwrap();
        assert_eq!(stored.len(), 60);
        assert_eq!(stored[0].frequency, 0);
    }

    #[test]
    fn test_user_games() {
        let conn = setup();
        let numbers = Combination::new(vec![6, 5, 4, 3, 2, 1]);
        let saved = insert_user_game(&conn, "megasena", &numbers, Some(10)).unwrap();
        insert_user_game(&conn, "megasena", &Combination::new(vec![10, 20, 30, 40, 50, 60]), None).unwrap();

        let games = fetch_user_games(&conn, "megasena").unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, saved.id);
        assert_eq!(games[0].numbers.numbers(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(games[0].contest_number, Some(10));
        assert_eq!(games[1].contest_number, None);
        assert!(fetch_user_games(&conn, "quina").unwrap().is_empty());
    }
}
