use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::AppResult;

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened database");

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let db = Database {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.initialize()?;
        Ok(db)
    }

    pub fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }

    pub fn initialize(&self) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            -- Owner profile and business type
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                business_name TEXT NOT NULL,
                business_module TEXT NOT NULL DEFAULT 'supermarket',
                nif TEXT,
                phone TEXT,
                address TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Product categories
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            -- Products with inventory
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT UNIQUE,
                name TEXT NOT NULL,
                category_id INTEGER,
                price REAL NOT NULL,
                cost_price REAL NOT NULL DEFAULT 0,
                stock REAL NOT NULL DEFAULT 0,
                min_stock REAL NOT NULL DEFAULT 5,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            );

            -- Supermarket catalogue
            CREATE TABLE IF NOT EXISTS supermarket_products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                barcode TEXT UNIQUE,
                name TEXT NOT NULL,
                brand TEXT,
                unit TEXT NOT NULL DEFAULT 'un',
                price REAL NOT NULL,
                stock REAL NOT NULL DEFAULT 0,
                expiry_date DATE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Butcher cuts sold by weight
            CREATE TABLE IF NOT EXISTS meat_cuts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                animal TEXT NOT NULL,
                price_per_kg REAL NOT NULL,
                stock_kg REAL NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Sales
            CREATE TABLE IF NOT EXISTS sales (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sale_number TEXT NOT NULL UNIQUE,
                subtotal REAL NOT NULL,
                discount REAL NOT NULL DEFAULT 0,
                total REAL NOT NULL,
                payment_method TEXT NOT NULL DEFAULT 'cash',
                amount_received REAL NOT NULL,
                change_given REAL NOT NULL DEFAULT 0,
                customer_name TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Sale lines
            CREATE TABLE IF NOT EXISTS sale_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sale_id INTEGER NOT NULL,
                product_id INTEGER,
                meat_cut_id INTEGER,
                description TEXT NOT NULL,
                quantity REAL NOT NULL,
                unit_price REAL NOT NULL,
                subtotal REAL NOT NULL,
                FOREIGN KEY (sale_id) REFERENCES sales(id) ON DELETE CASCADE,
                FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE SET NULL,
                FOREIGN KEY (meat_cut_id) REFERENCES meat_cuts(id) ON DELETE SET NULL
            );

            -- Expenses
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'geral',
                amount REAL NOT NULL,
                expense_date DATE NOT NULL,
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Credit notes issued against sales
            CREATE TABLE IF NOT EXISTS credit_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sale_id INTEGER NOT NULL,
                note_number TEXT NOT NULL UNIQUE,
                reason TEXT NOT NULL,
                amount REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (sale_id) REFERENCES sales(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sales_created_at ON sales(created_at);
            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(expense_date);
            ",
        )?;

        // Run migrations for existing databases (pass connection to avoid deadlock)
        Self::migrate_conn(&conn)?;

        Ok(())
    }

    fn migrate_conn(conn: &Connection) -> Result<()> {
        let columns = table_columns(conn, "sales")?;
        if !columns.contains(&"customer_nif".to_string()) {
            conn.execute("ALTER TABLE sales ADD COLUMN customer_nif TEXT", [])?;
        }

        let columns = table_columns(conn, "sale_items")?;
        if !columns.contains(&"meat_cut_id".to_string()) {
            conn.execute(
                "ALTER TABLE sale_items ADD COLUMN meat_cut_id INTEGER REFERENCES meat_cuts(id) ON DELETE SET NULL",
                [],
            )?;
        }

        let columns = table_columns(conn, "products")?;
        if !columns.contains(&"cost_price".to_string()) {
            conn.execute(
                "ALTER TABLE products ADD COLUMN cost_price REAL NOT NULL DEFAULT 0",
                [],
            )?;
        }

        Ok(())
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let columns = conn
        .prepare(&format!("PRAGMA table_info({})", table))?
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(columns)
}
