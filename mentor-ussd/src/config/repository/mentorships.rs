//! Mentorship relation repository

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentorshipStatus {
    Active,
    Completed,
}

impl MentorshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorshipStatus::Active => "active",
            MentorshipStatus::Completed => "completed",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(MentorshipStatus::Active),
            "completed" => Ok(MentorshipStatus::Completed),
            other => bail!("Unknown mentorship status: {}", other),
        }
    }
}

/// One mentee paired with one mentor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mentorship {
    pub id: Uuid,
    pub mentee_id: i64,
    pub mentor_id: i64,
    pub status: MentorshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn mentorship_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Mentorship> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(Mentorship {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid mentorship id: {}", id))?,
        mentee_id: row.try_get("mentee_id")?,
        mentor_id: row.try_get("mentor_id")?,
        status: MentorshipStatus::parse(&status)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Record an active mentorship. Only the matching engine calls this, inside the
/// transaction that reserved the mentor's slot.
pub async fn insert_mentorship(
    conn: &mut SqliteConnection,
    mentee_id: i64,
    mentor_id: i64,
) -> Result<Mentorship> {
    let now = Utc::now();
    let mentorship = Mentorship {
        id: Uuid::new_v4(),
        mentee_id,
        mentor_id,
        status: MentorshipStatus::Active,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO mentorships (id, mentee_id, mentor_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(mentorship.id.to_string())
    .bind(mentee_id)
    .bind(mentor_id)
    .bind(mentorship.status.as_str())
    .bind(now)
    .bind(now)
    .execute(conn)
    .await
    .context("Failed to insert mentorship")?;

    Ok(mentorship)
}

pub async fn get_mentorship(pool: &SqlitePool, id: Uuid) -> Result<Option<Mentorship>> {
    let row = sqlx::query("SELECT * FROM mentorships WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
        .context("Failed to get mentorship")?;

    row.as_ref().map(mentorship_from_row).transpose()
}

/// The mentee's active mentorship, read on the caller's connection so a
/// matching transaction sees its own view
pub async fn active_for_mentee(
    conn: &mut SqliteConnection,
    mentee_id: i64,
) -> Result<Option<Mentorship>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM mentorships
        WHERE mentee_id = ? AND status = 'active'
        ORDER BY created_at
        LIMIT 1
        "#,
    )
    .bind(mentee_id)
    .fetch_optional(conn)
    .await
    .context("Failed to look up active mentorship")?;

    row.as_ref().map(mentorship_from_row).transpose()
}

pub async fn list_for_mentor(pool: &SqlitePool, mentor_id: i64) -> Result<Vec<Mentorship>> {
    let rows = sqlx::query("SELECT * FROM mentorships WHERE mentor_id = ? ORDER BY created_at")
        .bind(mentor_id)
        .fetch_all(pool)
        .await
        .context("Failed to list mentorships")?;

    rows.iter().map(mentorship_from_row).collect()
}

#[cfg(test)]
pub(crate) async fn count_for_mentor(pool: &SqlitePool, mentor_id: i64) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mentorships WHERE mentor_id = ?")
        .bind(mentor_id)
        .fetch_one(pool)
        .await
        .context("Failed to count mentorships")?;

    Ok(count)
}

/// Mark a mentorship completed. Mentee, mentor and the mentor's load are unchanged.
pub async fn complete_mentorship(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE mentorships SET status = 'completed', updated_at = ? WHERE id = ? AND status = 'active'",
    )
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await
    .context("Failed to complete mentorship")?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::repository::{connect_in_memory, mentees, mentors};

    #[tokio::test]
    async fn test_insert_list_and_complete() {
        let pool = connect_in_memory().await.unwrap();
        let mentee = mentees::sample("+2547", "Nairobi", &["Coding"]);
        let mentee_id = mentees::upsert_mentee(&pool, &mentee).await.unwrap();
        let mentor = mentors::sample("m1", &["Nairobi"], &["Coding"], 3);
        let mentor_id = mentors::add_mentor(&pool, &mentor).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let created = insert_mentorship(&mut conn, mentee_id, mentor_id).await.unwrap();
        drop(conn);

        assert_eq!(count_for_mentor(&pool, mentor_id).await.unwrap(), 1);
        let listed = list_for_mentor(&pool, mentor_id).await.unwrap();
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].status, MentorshipStatus::Active);

        assert!(complete_mentorship(&pool, created.id).await.unwrap());
        assert!(!complete_mentorship(&pool, created.id).await.unwrap());

        let stored = get_mentorship(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MentorshipStatus::Completed);
        assert_eq!(stored.mentee_id, mentee_id);
        assert_eq!(stored.mentor_id, mentor_id);
    }

    #[tokio::test]
    async fn test_active_for_mentee_ignores_completed() {
        let pool = connect_in_memory().await.unwrap();
        let mentee_id = mentees::upsert_mentee(&pool, &mentees::sample("+2547", "Nairobi", &[]))
            .await
            .unwrap();
        let mentor_id = mentors::add_mentor(&pool, &mentors::sample("m1", &["Nairobi"], &[], 2))
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(active_for_mentee(&mut conn, mentee_id).await.unwrap().is_none());
        let created = insert_mentorship(&mut conn, mentee_id, mentor_id).await.unwrap();
        let active = active_for_mentee(&mut conn, mentee_id).await.unwrap().unwrap();
        assert_eq!(active.id, created.id);
        drop(conn);

        complete_mentorship(&pool, created.id).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        assert!(active_for_mentee(&mut conn, mentee_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mentor_removal_cascades() {
        let pool = connect_in_memory().await.unwrap();
        let mentee_id = mentees::upsert_mentee(&pool, &mentees::sample("+2547", "Nairobi", &[]))
            .await
            .unwrap();
        let mentor_id = mentors::add_mentor(&pool, &mentors::sample("m1", &["Nairobi"], &[], 1))
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let created = insert_mentorship(&mut conn, mentee_id, mentor_id).await.unwrap();
        drop(conn);

        assert!(mentors::delete_mentor(&pool, mentor_id).await.unwrap());
        assert!(get_mentorship(&pool, created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_requires_existing_profiles() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        assert!(insert_mentorship(&mut conn, 41, 42).await.is_err());
    }
}
