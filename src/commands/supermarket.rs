use chrono::{Duration, Local};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{SaveSupermarketProduct, SupermarketProduct};
use crate::validation;

const UNITS: &[&str] = &["un", "kg", "cx", "l"];

const SELECT_ITEM: &str =
    "SELECT id, barcode, name, brand, unit, price, stock, expiry_date, created_at FROM supermarket_products";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<SupermarketProduct> {
    Ok(SupermarketProduct {
        id: row.get(0)?,
        barcode: row.get(1)?,
        name: row.get(2)?,
        brand: row.get(3)?,
        unit: row.get(4)?,
        price: row.get(5)?,
        stock: row.get(6)?,
        expiry_date: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn select_item(conn: &Connection, id: i64) -> AppResult<SupermarketProduct> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_ITEM), [id], item_from_row)
        .optional()?
        .ok_or_else(|| AppError::not_found("Supermarket product", id))
}

fn validate(item: &SaveSupermarketProduct) -> AppResult<()> {
    validation::min_len("Product name", &item.name, 2)?;
    validation::non_negative("Price", item.price)?;
    validation::non_negative("Stock", item.stock)?;
    if !UNITS.contains(&item.unit.as_str()) {
        return Err(AppError::validation(format!(
            "Unit must be one of {}",
            UNITS.join(", ")
        )));
    }
    if let Some(date) = &item.expiry_date {
        validation::date("Expiry date", date)?;
    }
    Ok(())
}

pub fn get_supermarket_products(db: &Database) -> AppResult<Vec<SupermarketProduct>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!("{} ORDER BY name", SELECT_ITEM))?;
    let items = stmt
        .query_map([], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}

pub fn create_supermarket_product(
    db: &Database,
    item: SaveSupermarketProduct,
) -> AppResult<SupermarketProduct> {
    validate(&item)?;

    let conn = db.lock()?;
    conn.execute(
        "INSERT INTO supermarket_products (barcode, name, brand, unit, price, stock, expiry_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            validation::optional_text(item.barcode),
            item.name.trim(),
            validation::optional_text(item.brand),
            item.unit,
            item.price,
            item.stock,
            item.expiry_date
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, "supermarket product created");
    select_item(&conn, id)
}

pub fn update_supermarket_product(
    db: &Database,
    id: i64,
    item: SaveSupermarketProduct,
) -> AppResult<SupermarketProduct> {
    validate(&item)?;

    let conn = db.lock()?;
    let changed = conn.execute(
        "UPDATE supermarket_products
         SET barcode = ?1, name = ?2, brand = ?3, unit = ?4, price = ?5, stock = ?6, expiry_date = ?7
         WHERE id = ?8",
        params![
            validation::optional_text(item.barcode),
            item.name.trim(),
            validation::optional_text(item.brand),
            item.unit,
            item.price,
            item.stock,
            item.expiry_date,
            id
        ],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("Supermarket product", id));
    }

    tracing::info!(id, "supermarket product updated");
    select_item(&conn, id)
}

pub fn delete_supermarket_product(db: &Database, id: i64) -> AppResult<()> {
    let conn = db.lock()?;

    let deleted = conn.execute("DELETE FROM supermarket_products WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(AppError::not_found("Supermarket product", id));
    }

    tracing::info!(id, "supermarket product deleted");
    Ok(())
}

/// Products whose expiry date falls within the next `days` days (already
/// expired ones included), soonest first.
pub fn get_expiring_within(db: &Database, days: i64) -> AppResult<Vec<SupermarketProduct>> {
    let limit = (Local::now().date_naive() + Duration::days(days.max(0)))
        .format("%Y-%m-%d")
        .to_string();

    let conn = db.lock()?;
    let mut stmt = conn.prepare(&format!(
        "{} WHERE expiry_date IS NOT NULL AND expiry_date <= ?1 ORDER BY expiry_date ASC",
        SELECT_ITEM
    ))?;
    let items = stmt
        .query_map([&limit], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}
