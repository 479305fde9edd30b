use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::commands::{next_document_number, round_money};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{NewSale, NewSaleItem, Sale, SaleItem, SaleWithItems};
use crate::validation;

const SELECT_SALE: &str =
    "SELECT id, sale_number, subtotal, discount, total, payment_method, amount_received, change_given,
            customer_name, customer_nif, created_at
     FROM sales";

fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: row.get(0)?,
        sale_number: row.get(1)?,
        subtotal: row.get(2)?,
        discount: row.get(3)?,
        total: row.get(4)?,
        payment_method: row.get(5)?,
        amount_received: row.get(6)?,
        change: row.get(7)?,
        customer_name: row.get(8)?,
        customer_nif: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn select_items(conn: &Connection, sale_id: i64) -> AppResult<Vec<SaleItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, sale_id, product_id, meat_cut_id, description, quantity, unit_price, subtotal
         FROM sale_items
         WHERE sale_id = ?1
         ORDER BY id",
    )?;

    let items = stmt
        .query_map([sale_id], |row| {
            Ok(SaleItem {
                id: row.get(0)?,
                sale_id: row.get(1)?,
                product_id: row.get(2)?,
                meat_cut_id: row.get(3)?,
                description: row.get(4)?,
                quantity: row.get(5)?,
                unit_price: row.get(6)?,
                subtotal: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}

pub(crate) fn select_sale(conn: &Connection, id: i64) -> AppResult<SaleWithItems> {
    let sale = conn
        .query_row(&format!("{} WHERE id = ?1", SELECT_SALE), [id], sale_from_row)
        .optional()?
        .ok_or_else(|| AppError::not_found("Sale", id))?;
    let items = select_items(conn, id)?;
    Ok(SaleWithItems { sale, items })
}

fn validate(sale: &NewSale) -> AppResult<()> {
    if sale.items.is_empty() {
        return Err(AppError::validation("A sale needs at least one item"));
    }
    for item in &sale.items {
        validation::min_len("Item description", &item.description, 1)?;
        validation::positive("Quantity", item.quantity)?;
        validation::non_negative("Unit price", item.unit_price)?;
        if item.product_id.is_some() && item.meat_cut_id.is_some() {
            return Err(AppError::validation(
                "An item is either a product or a meat cut, not both",
            ));
        }
    }
    validation::non_negative("Discount", sale.discount)?;
    if let Some(received) = sale.amount_received {
        validation::non_negative("Amount received", received)?;
    }
    Ok(())
}

/// Total requested per id; the same product or cut may repeat across lines.
fn requested_by_id(
    sale: &NewSale,
    id_of: impl Fn(&NewSaleItem) -> Option<i64>,
) -> HashMap<i64, f64> {
    let mut requested: HashMap<i64, f64> = HashMap::new();
    for item in &sale.items {
        if let Some(id) = id_of(item) {
            *requested.entry(id).or_insert(0.0) += item.quantity;
        }
    }
    requested
}

/// Checks `requested` against a stock column. `table` and `column` are
/// fixed identifiers.
fn check_stock(
    conn: &Connection,
    table: &str,
    column: &str,
    entity: &'static str,
    requested: &HashMap<i64, f64>,
) -> AppResult<()> {
    for (id, quantity) in requested {
        let (name, stock): (String, f64) = conn
            .query_row(
                &format!("SELECT name, {column} FROM {table} WHERE id = ?1"),
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| AppError::not_found(entity, id))?;

        if stock + 1e-9 < *quantity {
            return Err(AppError::InsufficientStock {
                product: name,
                requested: *quantity,
                available: stock,
            });
        }
    }
    Ok(())
}

/// Records a sale, deducting stock of catalogue items and meat cuts in one
/// transaction.
pub fn create_sale(db: &Database, sale: NewSale) -> AppResult<SaleWithItems> {
    validate(&sale)?;

    let subtotal = round_money(
        sale.items
            .iter()
            .map(|item| item.quantity * item.unit_price)
            .sum(),
    );
    if sale.discount > subtotal {
        return Err(AppError::validation("Discount cannot exceed the subtotal"));
    }
    let total = round_money(subtotal - sale.discount);
    let amount_received = sale.amount_received.unwrap_or(total);
    if amount_received + 1e-9 < total {
        return Err(AppError::validation(format!(
            "Amount received ({:.2}) is less than the total ({:.2})",
            amount_received, total
        )));
    }
    let change = round_money(amount_received - total);

    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let products = requested_by_id(&sale, |item| item.product_id);
    let cuts = requested_by_id(&sale, |item| item.meat_cut_id);
    check_stock(&tx, "products", "stock", "Product", &products)?;
    check_stock(&tx, "meat_cuts", "stock_kg", "Meat cut", &cuts)?;

    let sale_number = next_document_number(&tx, "sales", "sale_number", "VD")?;
    tx.execute(
        "INSERT INTO sales (sale_number, subtotal, discount, total, payment_method, amount_received,
                            change_given, customer_name, customer_nif)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            sale_number,
            subtotal,
            sale.discount,
            total,
            sale.payment_method,
            amount_received,
            change,
            validation::optional_text(sale.customer_name.clone()),
            validation::optional_text(sale.customer_nif.clone()),
        ],
    )?;
    let sale_id = tx.last_insert_rowid();

    // Create sale items and deduct inventory
    for item in &sale.items {
        tx.execute(
            "INSERT INTO sale_items (sale_id, product_id, meat_cut_id, description, quantity, unit_price, subtotal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sale_id,
                item.product_id,
                item.meat_cut_id,
                item.description.trim(),
                item.quantity,
                item.unit_price,
                round_money(item.quantity * item.unit_price)
            ],
        )?;
    }
    for (product_id, quantity) in &products {
        tx.execute(
            "UPDATE products SET stock = stock - ?1 WHERE id = ?2",
            params![quantity, product_id],
        )?;
    }
    for (cut_id, weight) in &cuts {
        tx.execute(
            "UPDATE meat_cuts SET stock_kg = stock_kg - ?1 WHERE id = ?2",
            params![weight, cut_id],
        )?;
    }

    tx.commit()?;
    tracing::info!(sale_id, %sale_number, total, "sale recorded");

    select_sale(&conn, sale_id)
}

pub fn get_sale(db: &Database, id: i64) -> AppResult<SaleWithItems> {
    let conn = db.lock()?;
    select_sale(&conn, id)
}

/// Sales whose local date falls in `[from, to]` (`YYYY-MM-DD`), newest first.
pub fn get_sales(db: &Database, from: &str, to: &str) -> AppResult<Vec<Sale>> {
    validation::date("From", from)?;
    validation::date("To", to)?;

    let conn = db.lock()?;
    let mut stmt = conn.prepare(&format!(
        "{} WHERE date(created_at, 'localtime') BETWEEN ?1 AND ?2 ORDER BY created_at DESC, id DESC",
        SELECT_SALE
    ))?;
    let sales = stmt
        .query_map([from, to], sale_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(count = sales.len(), from, to, "loaded sales");
    Ok(sales)
}

/// Deletes a sale and puts its products and meat cuts back in stock.
pub fn delete_sale(db: &Database, id: i64) -> AppResult<()> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let items = select_items(&tx, id)?;
    let deleted = tx.execute("DELETE FROM sales WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(AppError::not_found("Sale", id));
    }

    for item in &items {
        if let Some(product_id) = item.product_id {
            tx.execute(
                "UPDATE products SET stock = stock + ?1 WHERE id = ?2",
                params![item.quantity, product_id],
            )?;
        }
        if let Some(cut_id) = item.meat_cut_id {
            tx.execute(
                "UPDATE meat_cuts SET stock_kg = stock_kg + ?1 WHERE id = ?2",
                params![item.quantity, cut_id],
            )?;
        }
    }
    // Cascades do the rest; delete explicitly for databases without FK enforcement
    tx.execute("DELETE FROM sale_items WHERE sale_id = ?1", [id])?;
    tx.execute("DELETE FROM credit_notes WHERE sale_id = ?1", [id])?;

    tx.commit()?;
    tracing::info!(id, restored_items = items.len(), "sale deleted");
    Ok(())
}
