//! Mentee profile repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use super::{decode_tags, encode_tags};

/// Stored mentee profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mentee {
    pub id: i64,
    /// Unique user reference (normalized phone number for USSD sign-ups)
    pub user_ref: String,
    pub name: String,
    pub age: u32,
    pub county: String,
    pub language: String,
    pub device: String,
    pub interests: Vec<String>,
    pub communication_preference: String,
}

/// Fields written when a mentee registers or re-registers
#[derive(Debug, Clone)]
pub struct NewMentee {
    pub user_ref: String,
    pub name: String,
    pub age: u32,
    pub county: String,
    pub device: String,
    pub interests: Vec<String>,
    pub communication_preference: String,
}

fn mentee_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Mentee> {
    let interests: String = row.try_get("interests")?;
    Ok(Mentee {
        id: row.try_get("id")?,
        user_ref: row.try_get("user_ref")?,
        name: row.try_get("name")?,
        age: row.try_get::<i64, _>("age")? as u32,
        county: row.try_get("county")?,
        language: row.try_get("language")?,
        device: row.try_get("device")?,
        interests: decode_tags(&interests)?,
        communication_preference: row.try_get("communication_preference")?,
    })
}

/// Insert a mentee or update the existing profile with the same user reference.
/// Language is left untouched on update. Returns the mentee id.
pub async fn upsert_mentee(pool: &SqlitePool, mentee: &NewMentee) -> Result<i64> {
    let now = Utc::now();
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO mentees (
            user_ref, name, age, county, device, interests,
            communication_preference, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_ref) DO UPDATE SET
            name = excluded.name,
            age = excluded.age,
            county = excluded.county,
            device = excluded.device,
            interests = excluded.interests,
            communication_preference = excluded.communication_preference,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(&mentee.user_ref)
    .bind(&mentee.name)
    .bind(mentee.age as i64)
    .bind(&mentee.county)
    .bind(&mentee.device)
    .bind(encode_tags(&mentee.interests)?)
    .bind(&mentee.communication_preference)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to upsert mentee")?;

    Ok(id)
}

pub async fn get_mentee(pool: &SqlitePool, id: i64) -> Result<Option<Mentee>> {
    let row = sqlx::query("SELECT * FROM mentees WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get mentee")?;

    row.as_ref().map(mentee_from_row).transpose()
}

#[cfg(test)]
pub(crate) async fn get_mentee_by_ref(pool: &SqlitePool, user_ref: &str) -> Result<Option<Mentee>> {
    let row = sqlx::query("SELECT * FROM mentees WHERE user_ref = ?")
        .bind(user_ref)
        .fetch_optional(pool)
        .await
        .context("Failed to get mentee by reference")?;

    row.as_ref().map(mentee_from_row).transpose()
}

/// Set the preferred language of an existing mentee.
/// Returns false when no mentee has this user reference.
pub async fn set_language(pool: &SqlitePool, user_ref: &str, language: &str) -> Result<bool> {
    let now: DateTime<Utc> = Utc::now();
    let result = sqlx::query("UPDATE mentees SET language = ?, updated_at = ? WHERE user_ref = ?")
        .bind(language)
        .bind(now)
        .bind(user_ref)
        .execute(pool)
        .await
        .context("Failed to set mentee language")?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) fn sample(user_ref: &str, county: &str, interests: &[&str]) -> NewMentee {
    NewMentee {
        user_ref: user_ref.to_string(),
        name: format!("Mentee {}", user_ref),
        age: 19,
        county: county.to_string(),
        device: "phone".to_string(),
        interests: interests.iter().map(|i| i.to_string()).collect(),
        communication_preference: "ussd".to_string(),
    }
}
