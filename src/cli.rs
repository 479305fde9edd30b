//! `caixa` command line: the POS operations without the web front-end.
//!
//! ```bash
//! caixa product add --name "Arroz 1kg" --price 850 --stock 40
//! caixa product search "arroz"
//! caixa sale create --item 1:2 --custom "Saco:50:1" --received 2.000
//! caixa sale create --cut 4:1,5 --received 15.000
//! caixa sale receipt 1
//! caixa voice record vendi 3 quilos de picanha por dois mil e quinhentos
//! caixa offline sync
//! caixa report dashboard --from 2024-03-01 --to 2024-03-31
//! ```

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::cart::Cart;
use crate::commands::{
    categories, credit_notes, expenses, meat_cuts, offline as offline_cmd, products, profiles,
    reports, sales, supermarket, today,
};
use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::logging::setup_tracing;
use crate::models::{
    BusinessModule, CreateCreditNote, CreateProduct, PaymentMethod, SaveExpense, SaveMeatCut,
    SaveSupermarketProduct, UpdateProduct, UpsertProfile,
};
use crate::offline::OfflineStore;
use crate::ptnumber::{normalize_thousands_in_text, parse_pt_money, parse_pt_number_flexible};
use crate::receipt::{render_credit_note, render_receipt, DEFAULT_WIDTH};
use crate::search::ProductBrowser;
use crate::voice;

#[derive(Parser)]
#[command(
    name = "caixa",
    about = "Point of sale and inventory for small retailers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Main database path (overrides CAIXA_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Offline queue path (overrides CAIXA_OFFLINE_DB_PATH)
    #[arg(long, global = true)]
    offline_db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Product catalogue and stock
    Product {
        #[command(subcommand)]
        action: ProductCommand,
    },
    /// Product categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Supermarket catalogue (barcodes, expiry dates)
    Supermarket {
        #[command(subcommand)]
        action: SupermarketCommand,
    },
    /// Butcher cuts sold by weight
    Meat {
        #[command(subcommand)]
        action: MeatCommand,
    },
    /// Checkout and sales history
    Sale {
        #[command(subcommand)]
        action: SaleCommand,
    },
    /// Expense tracking
    Expense {
        #[command(subcommand)]
        action: ExpenseCommand,
    },
    /// Credit notes against sales
    CreditNote {
        #[command(subcommand)]
        action: CreditNoteCommand,
    },
    /// Dashboards
    Report {
        #[command(subcommand)]
        action: ReportCommand,
    },
    /// Owner profile and business module
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Voice-entered transactions
    Voice {
        #[command(subcommand)]
        action: VoiceCommand,
    },
    /// Offline queue
    Offline {
        #[command(subcommand)]
        action: OfflineCommand,
    },
    /// Rewrite spoken/separated thousands in a sentence as digits
    Normalize { text: Vec<String> },
}

#[derive(Subcommand)]
enum ProductCommand {
    List,
    Search {
        query: Vec<String>,
        /// Pages of results to show
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    Add(ProductArgs),
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProductUpdateArgs,
    },
    Delete {
        id: i64,
    },
    LowStock,
    /// Add (or with a negative value remove) stock
    Stock {
        id: i64,
        #[arg(allow_hyphen_values = true, value_parser = parse_amount)]
        delta: f64,
    },
}

#[derive(Args)]
struct ProductArgs {
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_money)]
    price: f64,
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    category_id: Option<i64>,
    #[arg(long, value_parser = parse_money)]
    cost: Option<f64>,
    #[arg(long, default_value_t = 0.0, value_parser = parse_amount)]
    stock: f64,
    #[arg(long, value_parser = parse_amount)]
    min_stock: Option<f64>,
}

#[derive(Args)]
struct ProductUpdateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_parser = parse_money)]
    price: Option<f64>,
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    category_id: Option<i64>,
    #[arg(long, value_parser = parse_money)]
    cost: Option<f64>,
    #[arg(long, value_parser = parse_amount)]
    stock: Option<f64>,
    #[arg(long, value_parser = parse_amount)]
    min_stock: Option<f64>,
}

#[derive(Subcommand)]
enum CategoryCommand {
    List,
    Add { name: String },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum SupermarketCommand {
    List,
    Add(SupermarketArgs),
    Update {
        id: i64,
        #[command(flatten)]
        fields: SupermarketArgs,
    },
    Delete {
        id: i64,
    },
    /// Products expiring within the next days
    Expiring {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

#[derive(Args)]
struct SupermarketArgs {
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_money)]
    price: f64,
    #[arg(long)]
    barcode: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long, default_value = "un")]
    unit: String,
    #[arg(long, default_value_t = 0.0, value_parser = parse_amount)]
    stock: f64,
    /// YYYY-MM-DD
    #[arg(long)]
    expiry: Option<String>,
}

#[derive(Subcommand)]
enum MeatCommand {
    List,
    Add(MeatArgs),
    Update {
        id: i64,
        #[command(flatten)]
        fields: MeatArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args)]
struct MeatArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    animal: String,
    #[arg(long, value_parser = parse_money)]
    price_per_kg: f64,
    #[arg(long, default_value_t = 0.0, value_parser = parse_amount)]
    stock_kg: f64,
}

#[derive(Subcommand)]
enum SaleCommand {
    Create {
        /// Catalogue item as PRODUCT_ID:QUANTITY
        #[arg(long = "item")]
        items: Vec<String>,
        /// Meat cut by weight as CUT_ID:KG
        #[arg(long = "cut")]
        cuts: Vec<String>,
        /// Free line as DESCRIPTION:UNIT_PRICE[:QUANTITY]
        #[arg(long = "custom")]
        custom: Vec<String>,
        #[arg(long, default_value = "cash")]
        payment: String,
        #[arg(long, value_parser = parse_money)]
        received: Option<f64>,
        #[arg(long, default_value_t = 0.0, value_parser = parse_money)]
        discount: f64,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        nif: Option<String>,
    },
    Show {
        id: i64,
    },
    List(DateRange),
    Delete {
        id: i64,
    },
    Receipt {
        id: i64,
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: usize,
    },
}

#[derive(Args)]
struct DateRange {
    /// YYYY-MM-DD, defaults to today
    #[arg(long)]
    from: Option<String>,
    /// YYYY-MM-DD, defaults to today
    #[arg(long)]
    to: Option<String>,
}

impl DateRange {
    fn resolve(&self) -> (String, String) {
        let today = today();
        (
            self.from.clone().unwrap_or_else(|| today.clone()),
            self.to.clone().unwrap_or(today),
        )
    }
}

#[derive(Subcommand)]
enum ExpenseCommand {
    List(DateRange),
    Add {
        #[arg(long)]
        description: String,
        #[arg(long, value_parser = parse_money)]
        amount: f64,
        #[arg(long, default_value = "")]
        category: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum CreditNoteCommand {
    Add {
        #[arg(long)]
        sale: i64,
        #[arg(long, value_parser = parse_money)]
        amount: f64,
        #[arg(long)]
        reason: String,
    },
    List {
        #[arg(long)]
        sale: i64,
    },
    Print {
        id: i64,
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: usize,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum ReportCommand {
    Dashboard {
        #[command(flatten)]
        range: DateRange,
        #[arg(long, default_value_t = reports::DEFAULT_TOP_PRODUCTS)]
        top: usize,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        business_name: String,
        /// supermarket or butcher
        #[arg(long, default_value = "supermarket")]
        module: String,
        #[arg(long)]
        nif: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
}

#[derive(Subcommand)]
enum VoiceCommand {
    /// Show how a transcript would be read, without saving it
    Parse { text: Vec<String> },
    /// Queue a transcript in the offline store
    Record { text: Vec<String> },
}

#[derive(Subcommand)]
enum OfflineCommand {
    List {
        /// Include records already synced
        #[arg(long)]
        all: bool,
    },
    Sync,
    /// Remove records that were already synced
    Clear,
}

/// Accepts quantities as typed in Angola (`1.500`, `2,5`).
fn parse_amount(raw: &str) -> Result<f64, String> {
    parse_pt_number_flexible(raw).ok_or_else(|| format!("not a number: {:?}", raw))
}

/// Money in kwanzas, cêntimos kept (`1.234,56`).
fn parse_money(raw: &str) -> Result<f64, String> {
    parse_pt_money(raw).ok_or_else(|| format!("not an amount: {:?}", raw))
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Splits `a:b:c` arguments. Descriptions cannot contain a colon.
fn split_spec(spec: &str) -> Vec<&str> {
    spec.split(':').map(str::trim).collect()
}

/// `ID[:QUANTITY]`, quantity defaulting to 1.
fn parse_item(spec: &str) -> AppResult<(i64, f64)> {
    let parts = split_spec(spec);
    let invalid = || AppError::validation(format!("Invalid item {:?}, expected ID:QUANTITY", spec));
    match parts.as_slice() {
        [id] => Ok((id.parse().map_err(|_| invalid())?, 1.0)),
        [id, qty] => Ok((
            id.parse().map_err(|_| invalid())?,
            parse_pt_number_flexible(qty).ok_or_else(invalid)?,
        )),
        _ => Err(invalid()),
    }
}

/// `DESCRIPTION:UNIT_PRICE[:QUANTITY]` as (description, unit price, quantity).
fn parse_custom(spec: &str) -> AppResult<(String, f64, f64)> {
    let parts = split_spec(spec);
    let invalid = || {
        AppError::validation(format!(
            "Invalid line {:?}, expected DESCRIPTION:UNIT_PRICE[:QUANTITY]",
            spec
        ))
    };
    let (description, price, quantity) = match parts.as_slice() {
        [d, p] => (d, p, "1"),
        [d, p, q] => (d, p, *q),
        _ => return Err(invalid()),
    };
    Ok((
        description.to_string(),
        parse_pt_money(price).ok_or_else(invalid)?,
        parse_pt_number_flexible(quantity).ok_or_else(invalid)?,
    ))
}

struct Context {
    config: Config,
}

impl Context {
    fn db(&self) -> AppResult<Database> {
        Database::open(&self.config.db_path)
    }

    fn offline(&self) -> AppResult<OfflineStore> {
        OfflineStore::open(&self.config.offline_db_path)
    }
}

fn run_product(ctx: &Context, action: ProductCommand) -> AppResult<()> {
    let db = ctx.db()?;
    match action {
        ProductCommand::List => print_json(&products::get_products(&db)?),
        ProductCommand::Search { query, pages } => {
            let mut browser = ProductBrowser::new(
                products::get_products(&db)?,
                ctx.config.page_size * pages.max(1),
                ctx.config.search_debounce,
            );
            // One-shot query: fire as if the user stopped typing
            let now = Instant::now();
            browser.type_query(query.join(" "), now);
            browser.tick(now + ctx.config.search_debounce);
            print_json(&browser.visible())?;
            if browser.has_more() {
                eprintln!(
                    "{} results in total; use --pages {} to see more",
                    browser.matching().len(),
                    pages.max(1) + 1
                );
            }
            Ok(())
        }
        ProductCommand::Add(args) => {
            let min_stock = args.min_stock.unwrap_or(ctx.config.low_stock_threshold);
            print_json(&products::create_product(
                &db,
                CreateProduct {
                    code: args.code,
                    name: args.name,
                    category_id: args.category_id,
                    price: args.price,
                    cost_price: args.cost,
                    stock: args.stock,
                    min_stock: Some(min_stock),
                },
            )?)
        }
        ProductCommand::Update { id, fields } => {
            let current = products::get_product(&db, id)?;
            print_json(&products::update_product(
                &db,
                UpdateProduct {
                    id,
                    code: fields.code.or(current.code),
                    name: fields.name.unwrap_or(current.name),
                    category_id: fields.category_id.or(current.category_id),
                    price: fields.price.unwrap_or(current.price),
                    cost_price: fields.cost.unwrap_or(current.cost_price),
                    stock: fields.stock.unwrap_or(current.stock),
                    min_stock: fields.min_stock.unwrap_or(current.min_stock),
                },
            )?)
        }
        ProductCommand::Delete { id } => products::delete_product(&db, id),
        ProductCommand::LowStock => print_json(&products::get_low_stock(&db)?),
        ProductCommand::Stock { id, delta } => print_json(&products::adjust_stock(&db, id, delta)?),
    }
}

fn run_sale(ctx: &Context, action: SaleCommand) -> AppResult<()> {
    let db = ctx.db()?;
    match action {
        SaleCommand::Create {
            items,
            cuts,
            custom,
            payment,
            received,
            discount,
            customer,
            nif,
        } => {
            let mut cart = Cart::new();
            for spec in &items {
                let (product_id, quantity) = parse_item(spec)?;
                cart.add_product(&products::get_product(&db, product_id)?, quantity)?;
            }
            for spec in &cuts {
                let (cut_id, weight_kg) = parse_item(spec)?;
                cart.add_meat_cut(&meat_cuts::get_meat_cut(&db, cut_id)?, weight_kg)?;
            }
            for spec in &custom {
                let (description, unit_price, quantity) = parse_custom(spec)?;
                cart.add_custom(&description, unit_price, quantity)?;
            }
            cart.apply_discount(discount)?;

            let new_sale = cart.to_new_sale(
                payment.parse::<PaymentMethod>()?,
                received,
                customer,
                nif,
            )?;
            let sale = sales::create_sale(&db, new_sale)?;
            print_json(&sale)
        }
        SaleCommand::Show { id } => print_json(&sales::get_sale(&db, id)?),
        SaleCommand::List(range) => {
            let (from, to) = range.resolve();
            print_json(&sales::get_sales(&db, &from, &to)?)
        }
        SaleCommand::Delete { id } => sales::delete_sale(&db, id),
        SaleCommand::Receipt { id, width } => {
            let sale = sales::get_sale(&db, id)?;
            let profile = profiles::get_profile(&db)?;
            print!("{}", render_receipt(profile.as_ref(), &sale, width));
            Ok(())
        }
    }
}

fn run_command(ctx: &Context, command: Command) -> AppResult<()> {
    match command {
        Command::Product { action } => run_product(ctx, action),
        Command::Category { action } => {
            let db = ctx.db()?;
            match action {
                CategoryCommand::List => print_json(&categories::get_categories(&db)?),
                CategoryCommand::Add { name } => {
                    print_json(&categories::create_category(&db, &name)?)
                }
                CategoryCommand::Delete { id } => categories::delete_category(&db, id),
            }
        }
        Command::Supermarket { action } => {
            let db = ctx.db()?;
            let to_save = |args: SupermarketArgs| SaveSupermarketProduct {
                barcode: args.barcode,
                name: args.name,
                brand: args.brand,
                unit: args.unit,
                price: args.price,
                stock: args.stock,
                expiry_date: args.expiry,
            };
            match action {
                SupermarketCommand::List => print_json(&supermarket::get_supermarket_products(&db)?),
                SupermarketCommand::Add(args) => print_json(
                    &supermarket::create_supermarket_product(&db, to_save(args))?,
                ),
                SupermarketCommand::Update { id, fields } => print_json(
                    &supermarket::update_supermarket_product(&db, id, to_save(fields))?,
                ),
                SupermarketCommand::Delete { id } => {
                    supermarket::delete_supermarket_product(&db, id)
                }
                SupermarketCommand::Expiring { days } => {
                    print_json(&supermarket::get_expiring_within(&db, days)?)
                }
            }
        }
        Command::Meat { action } => {
            let db = ctx.db()?;
            let to_save = |args: MeatArgs| SaveMeatCut {
                name: args.name,
                animal: args.animal.to_lowercase(),
                price_per_kg: args.price_per_kg,
                stock_kg: args.stock_kg,
            };
            match action {
                MeatCommand::List => print_json(&meat_cuts::get_meat_cuts(&db)?),
                MeatCommand::Add(args) => {
                    print_json(&meat_cuts::create_meat_cut(&db, to_save(args))?)
                }
                MeatCommand::Update { id, fields } => {
                    print_json(&meat_cuts::update_meat_cut(&db, id, to_save(fields))?)
                }
                MeatCommand::Delete { id } => meat_cuts::delete_meat_cut(&db, id),
            }
        }
        Command::Sale { action } => run_sale(ctx, action),
        Command::Expense { action } => {
            let db = ctx.db()?;
            match action {
                ExpenseCommand::List(range) => {
                    let (from, to) = range.resolve();
                    print_json(&expenses::get_expenses(&db, &from, &to)?)
                }
                ExpenseCommand::Add {
                    description,
                    amount,
                    category,
                    date,
                    notes,
                } => print_json(&expenses::create_expense(
                    &db,
                    SaveExpense {
                        description,
                        category,
                        amount,
                        expense_date: date,
                        notes,
                    },
                )?),
                ExpenseCommand::Delete { id } => expenses::delete_expense(&db, id),
            }
        }
        Command::CreditNote { action } => {
            let db = ctx.db()?;
            match action {
                CreditNoteCommand::Add {
                    sale,
                    amount,
                    reason,
                } => print_json(&credit_notes::create_credit_note(
                    &db,
                    CreateCreditNote {
                        sale_id: sale,
                        reason,
                        amount,
                    },
                )?),
                CreditNoteCommand::List { sale } => {
                    print_json(&credit_notes::get_credit_notes_for_sale(&db, sale)?)
                }
                CreditNoteCommand::Print { id, width } => {
                    let note = credit_notes::get_credit_note(&db, id)?;
                    let sale = sales::get_sale(&db, note.sale_id)?;
                    let profile = profiles::get_profile(&db)?;
                    print!("{}", render_credit_note(profile.as_ref(), &note, &sale, width));
                    Ok(())
                }
                CreditNoteCommand::Delete { id } => credit_notes::delete_credit_note(&db, id),
            }
        }
        Command::Report { action } => {
            let db = ctx.db()?;
            match action {
                ReportCommand::Dashboard { range, top } => {
                    let (from, to) = range.resolve();
                    print_json(&reports::get_dashboard(&db, &from, &to, top)?)
                }
            }
        }
        Command::Profile { action } => {
            let db = ctx.db()?;
            match action {
                ProfileCommand::Show => match profiles::get_profile(&db)? {
                    Some(profile) => {
                        print_json(&profile)?;
                        eprintln!(
                            "Screens: {}",
                            profile.business_module.nav_items().join(", ")
                        );
                        Ok(())
                    }
                    None => Err(AppError::not_found("Profile", "owner")),
                },
                ProfileCommand::Set {
                    full_name,
                    business_name,
                    module,
                    nif,
                    phone,
                    address,
                } => print_json(&profiles::upsert_profile(
                    &db,
                    UpsertProfile {
                        full_name,
                        business_name,
                        business_module: module.parse::<BusinessModule>()?,
                        nif,
                        phone,
                        address,
                    },
                )?),
            }
        }
        Command::Voice { action } => match action {
            VoiceCommand::Parse { text } => {
                let transcript = text.join(" ");
                match voice::parse_transaction(&transcript) {
                    Some(transaction) => print_json(&transaction),
                    None => Err(AppError::validation(format!(
                        "Could not understand transcript: {:?}",
                        transcript
                    ))),
                }
            }
            VoiceCommand::Record { text } => {
                let store = ctx.offline()?;
                print_json(&offline_cmd::record_transcript(&store, &text.join(" "))?)
            }
        },
        Command::Offline { action } => {
            let store = ctx.offline()?;
            match action {
                OfflineCommand::List { all } => {
                    let records = if all {
                        store.get_all_records()?
                    } else {
                        store.get_unsynced_records()?
                    };
                    print_json(&records)
                }
                OfflineCommand::Sync => {
                    let db = ctx.db()?;
                    let report = offline_cmd::sync_to_database(&store, &db)?;
                    println!("{} synced, {} failed", report.pushed, report.failed);
                    Ok(())
                }
                OfflineCommand::Clear => {
                    let removed = store.clear_synced()?;
                    println!("{} records removed", removed);
                    Ok(())
                }
            }
        }
        Command::Normalize { text } => {
            println!("{}", normalize_thousands_in_text(&text.join(" ")));
            Ok(())
        }
    }
}

/// Entry point of the `caixa` binary; returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("Erro: {}", e);
            return 2;
        }
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(offline_db) = cli.offline_db {
        config.offline_db_path = offline_db;
    }

    let ctx = Context { config };
    match run_command(&ctx, cli.command) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Erro: {}", e);
            1
        }
    }
}
