pub mod cart;
mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod offline;
pub mod ptnumber;
pub mod receipt;
pub mod search;
pub mod validation;
pub mod voice;


pub use cli::run;
pub use db::Database;
pub use error::{AppError, AppResult};
