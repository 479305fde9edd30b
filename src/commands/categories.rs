use crate::db::Database;
use crate::error::AppResult;
use crate::models::Category;
use crate::validation;

pub fn get_categories(db: &Database) -> AppResult<Vec<Category>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;

    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(categories)
}

pub fn create_category(db: &Database, name: &str) -> AppResult<Category> {
    let name = name.trim().to_string();
    validation::min_len("Category name", &name, 2)?;

    let conn = db.lock()?;
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [&name])?;
    let id = conn.last_insert_rowid();

    tracing::info!(id, %name, "category created");
    Ok(Category { id, name })
}

pub fn delete_category(db: &Database, id: i64) -> AppResult<()> {
    let conn = db.lock()?;

    // Set category_id to NULL for products in this category
    conn.execute(
        "UPDATE products SET category_id = NULL WHERE category_id = ?1",
        [id],
    )?;
    conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;

    tracing::info!(id, "category deleted");
    Ok(())
}
