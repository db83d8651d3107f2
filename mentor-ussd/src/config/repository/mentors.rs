//! Mentor profile repository
//!
//! `mentees_count` is only ever raised through [`try_reserve_slot`], which the
//! matching engine calls inside the same transaction that records the mentorship.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{decode_tags, encode_tags};

/// Stored mentor profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mentor {
    pub id: i64,
    pub user_ref: String,
    pub name: String,
    /// Interest categories the mentor can cover
    pub expertise: Vec<String>,
    pub language_preference: String,
    /// Locations the mentor serves
    pub counties: Vec<String>,
    /// Capacity
    pub max_mentees: u32,
    /// Current load, never above `max_mentees`
    pub mentees_count: u32,
    pub visibility: String,
}

impl Mentor {
    pub fn has_capacity(&self) -> bool {
        self.mentees_count < self.max_mentees
    }
}

#[derive(Debug, Clone)]
pub struct NewMentor {
    pub user_ref: String,
    pub name: String,
    pub expertise: Vec<String>,
    pub language_preference: String,
    pub counties: Vec<String>,
    pub max_mentees: u32,
    pub visibility: String,
}

fn mentor_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Mentor> {
    let expertise: String = row.try_get("expertise")?;
    let counties: String = row.try_get("counties")?;
    Ok(Mentor {
        id: row.try_get("id")?,
        user_ref: row.try_get("user_ref")?,
        name: row.try_get("name")?,
        expertise: decode_tags(&expertise)?,
        language_preference: row.try_get("language_preference")?,
        counties: decode_tags(&counties)?,
        max_mentees: row.try_get::<i64, _>("max_mentees")? as u32,
        mentees_count: row.try_get::<i64, _>("mentees_count")? as u32,
        visibility: row.try_get("visibility")?,
    })
}

/// Add a mentor with an empty load. Returns the mentor id.
pub async fn add_mentor(pool: &SqlitePool, mentor: &NewMentor) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO mentors (
            user_ref, name, expertise, language_preference, counties,
            max_mentees, mentees_count, visibility, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&mentor.user_ref)
    .bind(&mentor.name)
    .bind(encode_tags(&mentor.expertise)?)
    .bind(&mentor.language_preference)
    .bind(encode_tags(&mentor.counties)?)
    .bind(mentor.max_mentees as i64)
    .bind(&mentor.visibility)
    .bind(Utc::now())
    .execute(pool)
    .await
    .with_context(|| format!("Failed to add mentor {}", mentor.user_ref))?;

    Ok(result.last_insert_rowid())
}

#[cfg(test)]
pub(crate) async fn get_mentor(pool: &SqlitePool, id: i64) -> Result<Option<Mentor>> {
    let row = sqlx::query("SELECT * FROM mentors WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get mentor")?;

    row.as_ref().map(mentor_from_row).transpose()
}

pub async fn list_mentors(pool: &SqlitePool) -> Result<Vec<Mentor>> {
    let rows = sqlx::query("SELECT * FROM mentors ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to list mentors")?;

    rows.iter().map(mentor_from_row).collect()
}

/// Mentors whose load is below capacity
pub async fn list_available_mentors(pool: &SqlitePool) -> Result<Vec<Mentor>> {
    let rows = sqlx::query("SELECT * FROM mentors WHERE mentees_count < max_mentees ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list available mentors")?;

    rows.iter().map(mentor_from_row).collect()
}

/// Compare-and-increment the mentor's load.
/// Returns false, changing nothing, when the mentor is already at capacity or gone.
pub async fn try_reserve_slot(conn: &mut SqliteConnection, mentor_id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE mentors
        SET mentees_count = mentees_count + 1
        WHERE id = ? AND mentees_count < max_mentees
        "#,
    )
    .bind(mentor_id)
    .execute(conn)
    .await
    .context("Failed to reserve mentor slot")?;

    Ok(result.rows_affected() == 1)
}

/// Remove a mentor. Their mentorships go with them; their resources lose the creator link.
pub async fn delete_mentor(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM mentors WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete mentor")?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) fn sample(
    user_ref: &str,
    counties: &[&str],
    expertise: &[&str],
    capacity: u32,
) -> NewMentor {
    NewMentor {
        user_ref: user_ref.to_string(),
        name: format!("Mentor {}", user_ref),
        expertise: expertise.iter().map(|e| e.to_string()).collect(),
        language_preference: "en".to_string(),
        counties: counties.iter().map(|c| c.to_string()).collect(),
        max_mentees: capacity,
        visibility: "visible".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::repository::connect_in_memory;

    #[tokio::test]
    async fn test_add_and_get_mentor() {
        let pool = connect_in_memory().await.unwrap();
        let id = add_mentor(&pool, &sample("m1", &["Nairobi", "Kisumu"], &["Coding"], 2))
            .await
            .unwrap();

        let mentor = get_mentor(&pool, id).await.unwrap().unwrap();
        assert_eq!(mentor.counties, vec!["Nairobi", "Kisumu"]);
        assert_eq!(mentor.expertise, vec!["Coding"]);
        assert_eq!(mentor.max_mentees, 2);
        assert_eq!(mentor.mentees_count, 0);
        assert!(mentor.has_capacity());
    }

    #[tokio::test]
    async fn test_duplicate_user_ref_rejected() {
        let pool = connect_in_memory().await.unwrap();
        add_mentor(&pool, &sample("m1", &["Nairobi"], &["Coding"], 1)).await.unwrap();
        assert!(add_mentor(&pool, &sample("m1", &["Busia"], &["Design"], 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_reserve_slot_stops_at_capacity() {
        let pool = connect_in_memory().await.unwrap();
        let id = add_mentor(&pool, &sample("m1", &["Nairobi"], &["Coding"], 2))
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(try_reserve_slot(&mut conn, id).await.unwrap());
        assert!(try_reserve_slot(&mut conn, id).await.unwrap());
        assert!(!try_reserve_slot(&mut conn, id).await.unwrap());
        assert!(!try_reserve_slot(&mut conn, id + 100).await.unwrap());
        drop(conn);

        let mentor = get_mentor(&pool, id).await.unwrap().unwrap();
        assert_eq!(mentor.mentees_count, 2);
        assert!(list_available_mentors(&pool).await.unwrap().is_empty());
        assert_eq!(list_mentors(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_mentor_never_available() {
        let pool = connect_in_memory().await.unwrap();
        add_mentor(&pool, &sample("m0", &["Nairobi"], &["Coding"], 0)).await.unwrap();
        assert!(list_available_mentors(&pool).await.unwrap().is_empty());
    }
}
