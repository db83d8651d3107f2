//! Learning resource repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{decode_tags, encode_tags};

/// Tagged learning content uploaded by a mentor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub link: Option<String>,
    /// Short text for USSD/SMS callers
    pub sms_text: Option<String>,
    /// Uploading mentor; cleared if the mentor is removed
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Characters of the description used when no SMS text was written
pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

impl Resource {
    /// Line shown on a USSD screen: the SMS text, else the start of the
    /// description, else the title
    pub fn ussd_line(&self) -> String {
        if let Some(text) = self.sms_text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return text.to_string();
        }
        let description = self.description.trim();
        if description.is_empty() {
            return self.title.clone();
        }
        description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub link: Option<String>,
    pub sms_text: Option<String>,
    pub created_by: Option<i64>,
}

fn resource_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Resource> {
    let id: String = row.try_get("id")?;
    let tags: String = row.try_get("tags")?;
    Ok(Resource {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid resource id: {}", id))?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        tags: decode_tags(&tags)?,
        link: row.try_get("link")?,
        sms_text: row.try_get("sms_text")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn add_resource(pool: &SqlitePool, resource: &NewResource) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO resources (id, title, description, tags, link, sms_text, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&resource.title)
    .bind(&resource.description)
    .bind(encode_tags(&resource.tags)?)
    .bind(&resource.link)
    .bind(&resource.sms_text)
    .bind(resource.created_by)
    .bind(Utc::now())
    .execute(pool)
    .await
    .with_context(|| format!("Failed to add resource {}", resource.title))?;

    Ok(id)
}

/// All resources, oldest first
pub async fn list_resources(pool: &SqlitePool) -> Result<Vec<Resource>> {
    let rows = sqlx::query("SELECT * FROM resources ORDER BY created_at, title")
        .fetch_all(pool)
        .await
        .context("Failed to list resources")?;

    rows.iter().map(resource_from_row).collect()
}

/// Resources carrying `tag` (case-insensitive), oldest first
pub async fn list_by_tag(pool: &SqlitePool, tag: &str) -> Result<Vec<Resource>> {
    let wanted = tag.trim().to_lowercase();
    let resources = list_resources(pool).await?;
    Ok(resources
        .into_iter()
        .filter(|r| r.tags.iter().any(|t| t.trim().to_lowercase() == wanted))
        .collect())
}
