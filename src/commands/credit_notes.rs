use rusqlite::{params, Row};

use crate::commands::{next_document_number, round_money};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{CreateCreditNote, CreditNote};
use crate::validation;

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<CreditNote> {
    Ok(CreditNote {
        id: row.get(0)?,
        sale_id: row.get(1)?,
        note_number: row.get(2)?,
        reason: row.get(3)?,
        amount: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Issues a credit note; the sum credited on a sale never exceeds its total.
pub fn create_credit_note(db: &Database, note: CreateCreditNote) -> AppResult<CreditNote> {
    let reason = note.reason.trim().to_string();
    validation::min_len("Reason", &reason, 3)?;
    validation::positive("Amount", note.amount)?;
    let amount = round_money(note.amount);

    let conn = db.lock()?;

    let sale_total: f64 = conn
        .query_row("SELECT total FROM sales WHERE id = ?1", [note.sale_id], |row| {
            row.get(0)
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::not_found("Sale", note.sale_id),
            other => other.into(),
        })?;
    let credited: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM credit_notes WHERE sale_id = ?1",
        [note.sale_id],
        |row| row.get(0),
    )?;

    let available = round_money(sale_total - credited);
    if amount > available + 1e-9 {
        return Err(AppError::validation(format!(
            "Credit amount ({:.2}) exceeds what is left to credit on the sale ({:.2})",
            amount, available
        )));
    }

    let note_number = next_document_number(&conn, "credit_notes", "note_number", "NC")?;
    conn.execute(
        "INSERT INTO credit_notes (sale_id, note_number, reason, amount) VALUES (?1, ?2, ?3, ?4)",
        params![note.sale_id, note_number, reason, amount],
    )?;
    let id = conn.last_insert_rowid();

    tracing::info!(id, sale_id = note.sale_id, amount, "credit note issued");

    let created = conn.query_row(
        "SELECT id, sale_id, note_number, reason, amount, created_at FROM credit_notes WHERE id = ?1",
        [id],
        note_from_row,
    )?;
    Ok(created)
}

pub fn get_credit_notes_for_sale(db: &Database, sale_id: i64) -> AppResult<Vec<CreditNote>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, sale_id, note_number, reason, amount, created_at
         FROM credit_notes
         WHERE sale_id = ?1
         ORDER BY id",
    )?;
    let notes = stmt
        .query_map([sale_id], note_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(notes)
}

pub fn get_credit_note(db: &Database, id: i64) -> AppResult<CreditNote> {
    let conn = db.lock()?;

    conn.query_row(
        "SELECT id, sale_id, note_number, reason, amount, created_at FROM credit_notes WHERE id = ?1",
        [id],
        note_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found("Credit note", id),
        other => other.into(),
    })
}

pub fn delete_credit_note(db: &Database, id: i64) -> AppResult<()> {
    let conn = db.lock()?;

    let deleted = conn.execute("DELETE FROM credit_notes WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(AppError::not_found("Credit note", id));
    }

    tracing::info!(id, "credit note deleted");
    Ok(())
}
