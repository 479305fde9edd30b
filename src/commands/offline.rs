use crate::commands::{expenses, sales};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    NewSale, NewSaleItem, OfflineRecord, PaymentMethod, RecordKind, SaveExpense,
};
use crate::offline::{sync_pending, OfflineStore, SyncReport};
use crate::voice;

/// Expense category used for voice-entered expenses.
pub const VOICE_EXPENSE_CATEGORY: &str = "voz";

/// Parses a transcript and queues it locally.
pub fn record_transcript(store: &OfflineStore, transcript: &str) -> AppResult<OfflineRecord> {
    let transaction = voice::parse_transaction(transcript).ok_or_else(|| {
        AppError::validation(format!("Could not understand transcript: {:?}", transcript))
    })?;
    store.save_record(transaction.into_new_record())
}

/// Writes one queued record into the main store.
pub fn push_record(db: &Database, record: &OfflineRecord) -> AppResult<()> {
    match record.kind {
        RecordKind::Sale => {
            let quantity = if record.quantity > 0.0 { record.quantity } else { 1.0 };
            sales::create_sale(
                db,
                NewSale {
                    items: vec![NewSaleItem {
                        product_id: None,
                        meat_cut_id: None,
                        description: record.description.clone(),
                        quantity,
                        unit_price: record.amount / quantity,
                    }],
                    discount: 0.0,
                    payment_method: PaymentMethod::Cash,
                    amount_received: None,
                    customer_name: None,
                    customer_nif: None,
                },
            )?;
        }
        RecordKind::Expense => {
            let expense_date = record.created_at.get(..10).map(str::to_string);
            expenses::create_expense(
                db,
                SaveExpense {
                    description: record.description.clone(),
                    category: VOICE_EXPENSE_CATEGORY.to_string(),
                    amount: record.amount,
                    expense_date,
                    notes: Some(record.transcript.clone()),
                },
            )?;
        }
    }
    Ok(())
}

/// One best-effort pass pushing every unsynced record into `db`.
pub fn sync_to_database(store: &OfflineStore, db: &Database) -> AppResult<SyncReport> {
    sync_pending(store, |record| push_record(db, record))
}
