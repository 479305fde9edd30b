use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::commands::today;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Expense, SaveExpense};
use crate::validation;

pub const DEFAULT_CATEGORY: &str = "geral";

const SELECT_EXPENSE: &str =
    "SELECT id, description, category, amount, expense_date, notes, created_at FROM expenses";

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        description: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        expense_date: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn select_expense(conn: &Connection, id: i64) -> AppResult<Expense> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_EXPENSE), [id], expense_from_row)
        .optional()?
        .ok_or_else(|| AppError::not_found("Expense", id))
}

/// Validates and fills defaults (category, date).
fn prepare(expense: SaveExpense) -> AppResult<(String, String, f64, String, Option<String>)> {
    let description = expense.description.trim().to_string();
    validation::min_len("Description", &description, 2)?;
    validation::positive("Amount", expense.amount)?;

    let date = expense.expense_date.unwrap_or_else(today);
    validation::date("Expense date", &date)?;

    let category = validation::optional_text(Some(expense.category))
        .map(|c| c.to_lowercase())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    Ok((
        description,
        category,
        expense.amount,
        date,
        validation::optional_text(expense.notes),
    ))
}

/// Expenses dated within `[from, to]`, newest first.
pub fn get_expenses(db: &Database, from: &str, to: &str) -> AppResult<Vec<Expense>> {
    validation::date("From", from)?;
    validation::date("To", to)?;

    let conn = db.lock()?;
    let mut stmt = conn.prepare(&format!(
        "{} WHERE expense_date BETWEEN ?1 AND ?2 ORDER BY expense_date DESC, id DESC",
        SELECT_EXPENSE
    ))?;
    let expenses = stmt
        .query_map([from, to], expense_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expenses)
}

pub fn create_expense(db: &Database, expense: SaveExpense) -> AppResult<Expense> {
    let (description, category, amount, date, notes) = prepare(expense)?;

    let conn = db.lock()?;
    conn.execute(
        "INSERT INTO expenses (description, category, amount, expense_date, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![description, category, amount, date, notes],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, amount, %category, "expense recorded");
    select_expense(&conn, id)
}

pub fn update_expense(db: &Database, id: i64, expense: SaveExpense) -> AppResult<Expense> {
    let (description, category, amount, date, notes) = prepare(expense)?;

    let conn = db.lock()?;
    let changed = conn.execute(
        "UPDATE expenses SET description = ?1, category = ?2, amount = ?3, expense_date = ?4, notes = ?5
         WHERE id = ?6",
        params![description, category, amount, date, notes, id],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("Expense", id));
    }

    select_expense(&conn, id)
}

pub fn delete_expense(db: &Database, id: i64) -> AppResult<()> {
    let conn = db.lock()?;

    let deleted = conn.execute("DELETE FROM expenses WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(AppError::not_found("Expense", id));
    }

    tracing::info!(id, "expense deleted");
    Ok(())
}
