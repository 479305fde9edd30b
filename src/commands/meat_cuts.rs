use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{MeatCut, SaveMeatCut};
use crate::validation;

const ANIMALS: &[&str] = &["bovino", "suino", "caprino", "frango"];

fn cut_from_row(row: &Row<'_>) -> rusqlite::Result<MeatCut> {
    Ok(MeatCut {
        id: row.get(0)?,
        name: row.get(1)?,
        animal: row.get(2)?,
        price_per_kg: row.get(3)?,
        stock_kg: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn select_cut(conn: &Connection, id: i64) -> AppResult<MeatCut> {
    conn.query_row(
        "SELECT id, name, animal, price_per_kg, stock_kg, created_at FROM meat_cuts WHERE id = ?1",
        [id],
        cut_from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Meat cut", id))
}

fn validate(cut: &SaveMeatCut) -> AppResult<()> {
    validation::min_len("Cut name", &cut.name, 2)?;
    validation::non_negative("Price per kg", cut.price_per_kg)?;
    validation::non_negative("Stock (kg)", cut.stock_kg)?;
    if !ANIMALS.contains(&cut.animal.as_str()) {
        return Err(AppError::validation(format!(
            "Animal must be one of {}",
            ANIMALS.join(", ")
        )));
    }
    Ok(())
}

pub fn get_meat_cuts(db: &Database) -> AppResult<Vec<MeatCut>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, name, animal, price_per_kg, stock_kg, created_at
         FROM meat_cuts
         ORDER BY animal, name",
    )?;
    let cuts = stmt
        .query_map([], cut_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(cuts)
}

pub fn get_meat_cut(db: &Database, id: i64) -> AppResult<MeatCut> {
    let conn = db.lock()?;
    select_cut(&conn, id)
}

pub fn create_meat_cut(db: &Database, cut: SaveMeatCut) -> AppResult<MeatCut> {
    validate(&cut)?;

    let conn = db.lock()?;
    conn.execute(
        "INSERT INTO meat_cuts (name, animal, price_per_kg, stock_kg) VALUES (?1, ?2, ?3, ?4)",
        params![cut.name.trim(), cut.animal, cut.price_per_kg, cut.stock_kg],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, "meat cut created");
    select_cut(&conn, id)
}

pub fn update_meat_cut(db: &Database, id: i64, cut: SaveMeatCut) -> AppResult<MeatCut> {
    validate(&cut)?;

    let conn = db.lock()?;
    let changed = conn.execute(
        "UPDATE meat_cuts SET name = ?1, animal = ?2, price_per_kg = ?3, stock_kg = ?4 WHERE id = ?5",
        params![cut.name.trim(), cut.animal, cut.price_per_kg, cut.stock_kg, id],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("Meat cut", id));
    }

    select_cut(&conn, id)
}

pub fn delete_meat_cut(db: &Database, id: i64) -> AppResult<()> {
    let conn = db.lock()?;

    let deleted = conn.execute("DELETE FROM meat_cuts WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(AppError::not_found("Meat cut", id));
    }

    tracing::info!(id, "meat cut deleted");
    Ok(())
}

/// Price of `weight_kg` of a cut, rounded to whole kwanzas.
pub fn price_for_weight(cut: &MeatCut, weight_kg: f64) -> f64 {
    (cut.price_per_kg * weight_kg).round()
}
