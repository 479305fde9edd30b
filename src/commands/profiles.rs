use rusqlite::{params, OptionalExtension};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Profile, UpsertProfile};
use crate::validation;

/// The store holds a single owner profile.
pub fn get_profile(db: &Database) -> AppResult<Option<Profile>> {
    let conn = db.lock()?;

    let profile = conn
        .query_row(
            "SELECT id, full_name, business_name, business_module, nif, phone, address, created_at
             FROM profiles ORDER BY id LIMIT 1",
            [],
            |row| {
                Ok(Profile {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    business_name: row.get(2)?,
                    business_module: row.get(3)?,
                    nif: row.get(4)?,
                    phone: row.get(5)?,
                    address: row.get(6)?,
                    created_at: row.get(7)?,
                })
            },
        )
        .optional()?;

    Ok(profile)
}

pub fn upsert_profile(db: &Database, profile: UpsertProfile) -> AppResult<Profile> {
    validation::min_len("Full name", &profile.full_name, 2)?;
    validation::min_len("Business name", &profile.business_name, 2)?;

    let existing = get_profile(db)?;

    let full_name = profile.full_name.trim().to_string();
    let business_name = profile.business_name.trim().to_string();
    let nif = validation::optional_text(profile.nif);
    let phone = validation::optional_text(profile.phone);
    let address = validation::optional_text(profile.address);

    {
        let conn = db.lock()?;
        match &existing {
            Some(current) => {
                conn.execute(
                    "UPDATE profiles SET full_name = ?1, business_name = ?2, business_module = ?3,
                     nif = ?4, phone = ?5, address = ?6 WHERE id = ?7",
                    params![
                        full_name,
                        business_name,
                        profile.business_module,
                        nif,
                        phone,
                        address,
                        current.id
                    ],
                )?;
            }
            None => {
                conn.execute(
                    "INSERT INTO profiles (full_name, business_name, business_module, nif, phone, address)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        full_name,
                        business_name,
                        profile.business_module,
                        nif,
                        phone,
                        address
                    ],
                )?;
            }
        }
    }

    tracing::info!(module = %profile.business_module, "profile saved");
    let saved = get_profile(db)?;
    saved.ok_or_else(|| AppError::not_found("Profile", "owner"))
}
