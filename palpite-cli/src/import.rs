use anyhow::{Context, Result, bail};
use palpite_db::rusqlite::Connection;
use std::path::Path;
use tracing::warn;

use palpite_db::db::insert_result;
use palpite_db::models::{DrawResult, Game, validate_result};

/// Ligne attendue : `concours;date;n1;...;nk[;s1;...]`, date en JJ/MM/AAAA ou AAAA-MM-JJ.
fn parse_record(record: &csv::StringRecord, game: &Game) -> Result<DrawResult> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let contest_raw = get(0)?;
    let contest_number: u32 = contest_raw
        .parse()
        .with_context(|| format!("Numéro de concours invalide : '{}'", contest_raw))?;
    let date = parse_date(&get(1)?)?;

    let draw_size = game.draw_size as usize;
    let numbers = (2..2 + draw_size).map(|idx| get_u8(idx)).collect::<Result<Vec<_>>>()?;

    let specials = match game.special {
        Some(pool) => (2 + draw_size..2 + draw_size + pool.count as usize)
            .map(|idx| get_u8(idx))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    validate_result(game, &numbers, &specials)?;

    Ok(DrawResult {
        game_id: game.id.clone(),
        contest_number,
        date,
        numbers,
        specials,
    })
}

pub fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.contains('-') && raw.len() == 10 {
        return Ok(raw.to_string());
    }
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        bail!("Format de date invalide: '{}'", raw);
    }
    Ok(format!("{}-{}-{}", parts[2], parts[1], parts[0]))
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, game: &Game, path: &Path) -> Result<ImportResult> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;
    import_records(conn, game, reader)
}

fn import_records<R: std::io::Read>(conn: &Connection, game: &Game, mut reader: csv::Reader<R>) -> Result<ImportResult> {
    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => {
                match parse_record(&record, game) {
                    Ok(draw) => {
                        match insert_result(&tx, &draw) {
                            Ok(true) => result.inserted += 1,
                            Ok(false) => result.skipped += 1,
                            Err(e) => {
                                warn!(line = result.total_records, "insertion du tirage impossible : {:#}", e);
                                result.errors += 1;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(line = result.total_records, "ligne illisible : {:#}", e);
                        result.errors += 1;
                    }
                }
            }
            Err(e) => {
                warn!(line = result.total_records, "lecture impossible : {}", e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Échec du commit")?;
    Ok(result)
}
