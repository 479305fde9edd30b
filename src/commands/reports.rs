use crate::commands::round_money;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    CategoryTotal, DailyRevenue, DashboardSummary, PaymentBreakdown, PaymentMethod, TopProduct,
};
use crate::validation;

pub const DEFAULT_TOP_PRODUCTS: usize = 5;

/// Aggregates sales, credits and expenses for the dashboard over `[from, to]`.
pub fn get_dashboard(
    db: &Database,
    from: &str,
    to: &str,
    top_n: usize,
) -> AppResult<DashboardSummary> {
    validation::date("From", from)?;
    validation::date("To", to)?;
    if from > to {
        return Err(AppError::validation("The start date is after the end date"));
    }

    let conn = db.lock()?;

    let (revenue, sales_count): (f64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(total), 0), COUNT(*)
         FROM sales
         WHERE date(created_at, 'localtime') BETWEEN ?1 AND ?2",
        [from, to],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut by_payment_method = PaymentBreakdown::default();
    {
        let mut stmt = conn.prepare(
            "SELECT payment_method, COALESCE(SUM(total), 0)
             FROM sales
             WHERE date(created_at, 'localtime') BETWEEN ?1 AND ?2
             GROUP BY payment_method",
        )?;
        let rows = stmt
            .query_map([from, to], |row| {
                Ok((row.get::<_, PaymentMethod>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (method, total) in rows {
            match method {
                PaymentMethod::Cash => by_payment_method.cash = round_money(total),
                PaymentMethod::Multicaixa => by_payment_method.multicaixa = round_money(total),
                PaymentMethod::Transfer => by_payment_method.transfer = round_money(total),
            }
        }
    }

    let daily = {
        let mut stmt = conn.prepare(
            "SELECT date(created_at, 'localtime') AS day, COALESCE(SUM(total), 0), COUNT(*)
             FROM sales
             WHERE date(created_at, 'localtime') BETWEEN ?1 AND ?2
             GROUP BY day
             ORDER BY day",
        )?;
        let rows = stmt
            .query_map([from, to], |row| {
                Ok(DailyRevenue {
                    date: row.get(0)?,
                    revenue: row.get(1)?,
                    sales: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let top_products = {
        let mut stmt = conn.prepare(
            "SELECT si.description, SUM(si.quantity) AS qty, SUM(si.subtotal)
             FROM sale_items si
             JOIN sales s ON si.sale_id = s.id
             WHERE date(s.created_at, 'localtime') BETWEEN ?1 AND ?2
             GROUP BY si.description
             ORDER BY qty DESC, si.description
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![from, to, top_n as i64], |row| {
                Ok(TopProduct {
                    description: row.get(0)?,
                    quantity: row.get(1)?,
                    revenue: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let credited: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0)
         FROM credit_notes
         WHERE date(created_at, 'localtime') BETWEEN ?1 AND ?2",
        [from, to],
        |row| row.get(0),
    )?;

    let expenses_by_category = {
        let mut stmt = conn.prepare(
            "SELECT category, SUM(amount) AS total
             FROM expenses
             WHERE expense_date BETWEEN ?1 AND ?2
             GROUP BY category
             ORDER BY total DESC",
        )?;
        let rows = stmt
            .query_map([from, to], |row| {
                Ok(CategoryTotal {
                    category: row.get(0)?,
                    total: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    let expenses: f64 = expenses_by_category.iter().map(|c| c.total).sum();

    let low_stock_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE stock <= min_stock",
        [],
        |row| row.get(0),
    )?;

    let average_ticket = if sales_count > 0 {
        round_money(revenue / sales_count as f64)
    } else {
        0.0
    };

    tracing::debug!(from, to, sales_count, "dashboard computed");

    Ok(DashboardSummary {
        from: from.to_string(),
        to: to.to_string(),
        revenue: round_money(revenue),
        sales_count,
        average_ticket,
        expenses: round_money(expenses),
        credited: round_money(credited),
        net: round_money(revenue - credited - expenses),
        by_payment_method,
        daily,
        top_products,
        expenses_by_category,
        low_stock_count,
    })
}
