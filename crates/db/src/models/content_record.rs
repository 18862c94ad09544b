use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool, Type, types::Json};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// A section of the marketing site with independently editable content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize, TS, EnumString, Display,
)]
#[sqlx(type_name = "content_section", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContentSection {
    Hero,
    Testimonials,
    Footer,
    Services,
    Jobs,
    Applications,
}

impl ContentSection {
    /// Storage bucket holding this section's uploaded media.
    pub fn bucket(&self) -> &'static str {
        match self {
            Self::Hero => "hero-images",
            Self::Testimonials => "testimonial-images",
            Self::Footer => "footer-assets",
            Self::Services => "service-images",
            Self::Jobs => "job-images",
            Self::Applications => "application-files",
        }
    }

    /// MIME types accepted for uploads into this section.
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        const IMAGES: &[&str] = &[
            "image/jpeg",
            "image/png",
            "image/webp",
            "image/svg+xml",
            "image/gif",
        ];
        match self {
            // Applications carry resumes alongside images.
            Self::Applications => &[
                "image/jpeg",
                "image/png",
                "image/webp",
                "application/pdf",
            ],
            _ => IMAGES,
        }
    }

    /// Field paths that must be non-empty before the section can be saved.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Hero => &["title"],
            Self::Testimonials => &[],
            Self::Footer => &["copyright"],
            Self::Services => &["title"],
            Self::Jobs => &["title"],
            Self::Applications => &[],
        }
    }
}

/// One persisted row of section content.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ContentRecord {
    pub id: Uuid,
    pub section: ContentSection,
    #[ts(type = "unknown")]
    pub payload: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const RECORD_COLUMNS: &str = "id, section, payload, created_at, updated_at";

impl ContentRecord {
    /// The authoritative row for a section, newest first. The schema keeps
    /// one row per section; callers still tolerate zero-or-one results.
    pub async fn find_latest_by_section(
        pool: &SqlitePool,
        section: ContentSection,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {RECORD_COLUMNS} FROM content_records
             WHERE section = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(section)
        .fetch_optional(pool)
        .await
    }

    /// Replace the payload of an existing row.
    pub async fn update_payload(
        pool: &SqlitePool,
        id: Uuid,
        payload: &Value,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE content_records
             SET payload = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(payload))
        .fetch_one(pool)
        .await
    }

    /// Insert the section's row, or replace its payload when one exists.
    pub async fn upsert_payload(
        pool: &SqlitePool,
        section: ContentSection,
        payload: &Value,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO content_records (id, section, payload) VALUES ($1, $2, $3)
             ON CONFLICT(section) DO UPDATE SET
                 payload = excluded.payload,
                 updated_at = datetime('now', 'subsec')
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(id)
        .bind(section)
        .bind(Json(payload))
        .fetch_one(pool)
        .await
    }
}
