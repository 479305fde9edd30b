use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Business type of a profile; selects the navigation set a user sees.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BusinessModule {
    Supermarket,
    Butcher,
}

impl BusinessModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessModule::Supermarket => "supermarket",
            BusinessModule::Butcher => "butcher",
        }
    }

    /// Screens available to a business of this type.
    pub fn nav_items(&self) -> &'static [&'static str] {
        match self {
            BusinessModule::Supermarket => &[
                "dashboard",
                "pos",
                "products",
                "supermarket_products",
                "sales",
                "expenses",
                "credit_notes",
                "reports",
                "voice",
            ],
            BusinessModule::Butcher => &[
                "dashboard",
                "pos",
                "meat_cuts",
                "sales",
                "expenses",
                "credit_notes",
                "reports",
                "voice",
            ],
        }
    }
}

impl FromStr for BusinessModule {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "supermarket" | "supermercado" => Ok(BusinessModule::Supermarket),
            "butcher" | "talho" | "acougue" => Ok(BusinessModule::Butcher),
            other => Err(AppError::validation(format!("Unknown business module: {}", other))),
        }
    }
}

impl fmt::Display for BusinessModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    pub id: i64,
    pub full_name: String,
    pub business_name: String,
    pub business_module: BusinessModule,
    pub nif: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpsertProfile {
    pub full_name: String,
    pub business_name: String,
    pub business_module: BusinessModule,
    pub nif: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub price: f64,
    pub cost_price: f64,
    pub stock: f64,
    pub min_stock: f64,
    pub created_at: String,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CreateProduct {
    pub code: Option<String>,
    pub name: String,
    pub category_id: Option<i64>,
    pub price: f64,
    pub cost_price: Option<f64>,
    pub stock: f64,
    pub min_stock: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpdateProduct {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub category_id: Option<i64>,
    pub price: f64,
    pub cost_price: f64,
    pub stock: f64,
    pub min_stock: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SupermarketProduct {
    pub id: i64,
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub unit: String,
    pub price: f64,
    pub stock: f64,
    pub expiry_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SaveSupermarketProduct {
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub unit: String,
    pub price: f64,
    pub stock: f64,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeatCut {
    pub id: i64,
    pub name: String,
    pub animal: String,
    pub price_per_kg: f64,
    pub stock_kg: f64,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SaveMeatCut {
    pub name: String,
    pub animal: String,
    pub price_per_kg: f64,
    pub stock_kg: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Multicaixa,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Multicaixa => "multicaixa",
            PaymentMethod::Transfer => "transfer",
        }
    }

    /// Label printed on receipts.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Numerário",
            PaymentMethod::Multicaixa => "Multicaixa",
            PaymentMethod::Transfer => "Transferência",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "dinheiro" | "numerario" => Ok(PaymentMethod::Cash),
            "multicaixa" | "tpa" | "card" => Ok(PaymentMethod::Multicaixa),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            other => Err(AppError::validation(format!("Unknown payment method: {}", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Sale {
    pub id: i64,
    pub sale_number: String,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub amount_received: f64,
    pub change: f64,
    pub customer_name: Option<String>,
    pub customer_nif: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: Option<i64>,
    pub meat_cut_id: Option<i64>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewSaleItem {
    /// Catalogue product; `None` for free-text lines (voice entries).
    pub product_id: Option<i64>,
    /// Meat cut sold by weight; `quantity` is then in kg.
    #[serde(default)]
    pub meat_cut_id: Option<i64>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewSale {
    pub items: Vec<NewSaleItem>,
    pub discount: f64,
    pub payment_method: PaymentMethod,
    /// Defaults to the total (exact payment) when absent.
    pub amount_received: Option<f64>,
    pub customer_name: Option<String>,
    pub customer_nif: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub expense_date: String,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SaveExpense {
    pub description: String,
    pub category: String,
    pub amount: f64,
    /// `YYYY-MM-DD`; today when absent.
    pub expense_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreditNote {
    pub id: i64,
    pub sale_id: i64,
    pub note_number: String,
    pub reason: String,
    pub amount: f64,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateCreditNote {
    pub sale_id: i64,
    pub reason: String,
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Sale,
    Expense,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Sale => "sale",
            RecordKind::Expense => "expense",
        }
    }
}

impl FromStr for RecordKind {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "sale" => Ok(RecordKind::Sale),
            "expense" => Ok(RecordKind::Expense),
            other => Err(AppError::validation(format!("Unknown record kind: {}", other))),
        }
    }
}

/// A voice-entered transaction waiting in the offline queue.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OfflineRecord {
    pub id: String,
    pub kind: RecordKind,
    pub transcript: String,
    pub description: String,
    pub amount: f64,
    pub quantity: f64,
    pub created_at: String,
    pub synced: bool,
    pub synced_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewOfflineRecord {
    pub kind: RecordKind,
    pub transcript: String,
    pub description: String,
    pub amount: f64,
    pub quantity: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PaymentBreakdown {
    pub cash: f64,
    pub multicaixa: f64,
    pub transfer: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DailyRevenue {
    pub date: String,
    pub revenue: f64,
    pub sales: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TopProduct {
    pub description: String,
    pub quantity: f64,
    pub revenue: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DashboardSummary {
    pub from: String,
    pub to: String,
    pub revenue: f64,
    pub sales_count: i64,
    pub average_ticket: f64,
    pub expenses: f64,
    pub credited: f64,
    pub net: f64,
    pub by_payment_method: PaymentBreakdown,
    pub daily: Vec<DailyRevenue>,
    pub top_products: Vec<TopProduct>,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub low_stock_count: i64,
}

/// Stores a text-backed enum through its `as_str`/`FromStr` pair.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

sql_text_enum!(BusinessModule);
sql_text_enum!(PaymentMethod);
sql_text_enum!(RecordKind);
