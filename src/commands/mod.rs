pub mod categories;
pub mod credit_notes;
pub mod expenses;
pub mod meat_cuts;
pub mod offline;
pub mod products;
pub mod profiles;
pub mod reports;
pub mod sales;
pub mod supermarket;

use chrono::Local;
use rusqlite::{params, Connection};

use crate::error::AppResult;

/// Today's local date as stored in `YYYY-MM-DD` columns.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Rounds a money amount to cêntimos.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Next document number of the day, e.g. `VD-20240315-0007`.
///
/// The sequence restarts every local day and continues from the highest
/// number on file.
pub(crate) fn next_document_number(
    conn: &Connection,
    table: &str,
    column: &str,
    prefix: &str,
) -> AppResult<String> {
    let day_prefix = format!("{}-{}-", prefix, Local::now().format("%Y%m%d"));

    // Numeric max: past 9999 the text order no longer matches
    let last: Option<i64> = conn.query_row(
        &format!(
            "SELECT MAX(CAST(substr({column}, ?2) AS INTEGER)) FROM {table} WHERE {column} LIKE ?1"
        ),
        params![format!("{}%", day_prefix), day_prefix.len() as i64 + 1],
        |row| row.get(0),
    )?;
    let next = last.unwrap_or(0) + 1;

    Ok(format!("{}{:04}", day_prefix, next))
}
