use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::config::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{CreateProduct, Product, UpdateProduct};
use crate::validation;

const SELECT_PRODUCT: &str =
    "SELECT p.id, p.code, p.name, p.category_id, c.name, p.price, p.cost_price, p.stock, p.min_stock, p.created_at
     FROM products p
     LEFT JOIN categories c ON p.category_id = c.id";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        category_id: row.get(3)?,
        category_name: row.get(4)?,
        price: row.get(5)?,
        cost_price: row.get(6)?,
        stock: row.get(7)?,
        min_stock: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub(crate) fn select_product(conn: &Connection, id: i64) -> AppResult<Product> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", SELECT_PRODUCT),
        [id],
        product_from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Product", id))
}

fn validate(name: &str, price: f64, cost_price: f64, stock: f64, min_stock: f64) -> AppResult<()> {
    validation::min_len("Product name", name, 2)?;
    validation::non_negative("Price", price)?;
    validation::non_negative("Cost price", cost_price)?;
    validation::non_negative("Stock", stock)?;
    validation::non_negative("Minimum stock", min_stock)?;
    Ok(())
}

pub fn get_products(db: &Database) -> AppResult<Vec<Product>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!("{} ORDER BY p.name", SELECT_PRODUCT))?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(count = products.len(), "loaded products");
    Ok(products)
}

pub fn get_product(db: &Database, id: i64) -> AppResult<Product> {
    let conn = db.lock()?;
    select_product(&conn, id)
}

/// Looks a product up by its code (typed or scanned from a QR/barcode).
pub fn find_by_code(db: &Database, code: &str) -> AppResult<Option<Product>> {
    let conn = db.lock()?;

    let product = conn
        .query_row(
            &format!("{} WHERE p.code = ?1", SELECT_PRODUCT),
            [code.trim()],
            product_from_row,
        )
        .optional()?;

    Ok(product)
}

pub fn create_product(db: &Database, product: CreateProduct) -> AppResult<Product> {
    let cost_price = product.cost_price.unwrap_or(0.0);
    let min_stock = product.min_stock.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let name = product.name.trim().to_string();
    validate(&name, product.price, cost_price, product.stock, min_stock)?;

    let conn = db.lock()?;
    conn.execute(
        "INSERT INTO products (code, name, category_id, price, cost_price, stock, min_stock)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            validation::optional_text(product.code),
            name,
            product.category_id,
            product.price,
            cost_price,
            product.stock,
            min_stock
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, %name, "product created");

    select_product(&conn, id)
}

pub fn update_product(db: &Database, product: UpdateProduct) -> AppResult<Product> {
    let name = product.name.trim().to_string();
    validate(
        &name,
        product.price,
        product.cost_price,
        product.stock,
        product.min_stock,
    )?;

    let conn = db.lock()?;
    let changed = conn.execute(
        "UPDATE products SET code = ?1, name = ?2, category_id = ?3, price = ?4, cost_price = ?5, stock = ?6, min_stock = ?7
         WHERE id = ?8",
        params![
            validation::optional_text(product.code),
            name,
            product.category_id,
            product.price,
            product.cost_price,
            product.stock,
            product.min_stock,
            product.id
        ],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("Product", product.id));
    }

    tracing::info!(id = product.id, "product updated");
    select_product(&conn, product.id)
}

pub fn delete_product(db: &Database, id: i64) -> AppResult<()> {
    let conn = db.lock()?;

    let deleted = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(AppError::not_found("Product", id));
    }

    tracing::info!(id, "product deleted");
    Ok(())
}

/// Adds `delta` (negative to remove) to a product's stock.
pub fn adjust_stock(db: &Database, id: i64, delta: f64) -> AppResult<Product> {
    let conn = db.lock()?;

    let product = select_product(&conn, id)?;
    let new_stock = product.stock + delta;
    if new_stock < 0.0 {
        return Err(AppError::InsufficientStock {
            product: product.name,
            requested: -delta,
            available: product.stock,
        });
    }

    conn.execute(
        "UPDATE products SET stock = ?1 WHERE id = ?2",
        params![new_stock, id],
    )?;

    tracing::info!(id, delta, new_stock, "stock adjusted");
    select_product(&conn, id)
}

pub fn get_low_stock(db: &Database) -> AppResult<Vec<Product>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.stock <= p.min_stock ORDER BY p.stock ASC",
        SELECT_PRODUCT
    ))?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(products)
}
