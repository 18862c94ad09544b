//! Row-level persistence seam and section publishing.

use async_trait::async_trait;
use db::models::content_record::{ContentRecord, ContentSection};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use utils::json_path;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

/// A per-field validation failure, reported next to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Check that every required field path holds a non-empty value.
pub fn validate_required(payload: &Value, required: &[&str]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for field in required {
        let Ok(path) = json_path::parse_path(field) else {
            errors.push(FieldError {
                field: field.to_string(),
                message: "invalid field path".to_string(),
            });
            continue;
        };
        let present = match json_path::get_value(payload, &path) {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        if !present {
            errors.push(FieldError {
                field: field.to_string(),
                message: "this field is required".to_string(),
            });
        }
    }
    errors
}

/// Row operations the editing logic needs from the backing database.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_current(
        &self,
        section: ContentSection,
    ) -> Result<Option<ContentRecord>, ContentError>;

    async fn update_payload(&self, id: Uuid, payload: &Value)
    -> Result<ContentRecord, ContentError>;

    async fn upsert_payload(
        &self,
        section: ContentSection,
        payload: &Value,
    ) -> Result<ContentRecord, ContentError>;
}

/// The real store, backed by the content_records table.
#[derive(Clone)]
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn fetch_current(
        &self,
        section: ContentSection,
    ) -> Result<Option<ContentRecord>, ContentError> {
        Ok(ContentRecord::find_latest_by_section(&self.pool, section).await?)
    }

    async fn update_payload(
        &self,
        id: Uuid,
        payload: &Value,
    ) -> Result<ContentRecord, ContentError> {
        Ok(ContentRecord::update_payload(&self.pool, id, payload).await?)
    }

    async fn upsert_payload(
        &self,
        section: ContentSection,
        payload: &Value,
    ) -> Result<ContentRecord, ContentError> {
        Ok(ContentRecord::upsert_payload(&self.pool, section, payload).await?)
    }
}

/// Thin facade used by the HTTP routes.
pub struct ContentService;

impl ContentService {
    /// The section's current published payload, if any.
    pub async fn current(
        store: &dyn ContentStore,
        section: ContentSection,
    ) -> Result<Option<ContentRecord>, ContentError> {
        store.fetch_current(section).await
    }

    /// Validate and persist a full payload for a section.
    pub async fn publish(
        store: &dyn ContentStore,
        section: ContentSection,
        payload: Value,
    ) -> Result<ContentRecord, ContentError> {
        let errors = validate_required(&payload, section.required_fields());
        if !errors.is_empty() {
            return Err(ContentError::Validation(errors));
        }
        store.upsert_payload(section, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::services::test_support::test_pool;

    #[test]
    fn test_validate_required_flags_missing_and_empty() {
        let payload = json!({"title": "", "cta": {"label": "Go"}});
        let errors = validate_required(&payload, &["title", "subtitle", "cta.label"]);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "subtitle"]);
    }

    #[test]
    fn test_validate_required_accepts_non_string_values() {
        let payload = json!({"items": [1, 2]});
        assert!(validate_required(&payload, &["items"]).is_empty());
    }

    #[tokio::test]
    async fn test_publish_rejects_invalid_payload_without_persisting() {
        let pool = test_pool().await;
        let store = SqliteContentStore::new(pool.clone());

        let result =
            ContentService::publish(&store, ContentSection::Hero, json!({"subtitle": "x"})).await;
        assert!(matches!(result, Err(ContentError::Validation(_))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_publish_then_current_round_trip() {
        let pool = test_pool().await;
        let store = SqliteContentStore::new(pool);

        let payload = json!({"title": "Welcome", "image": "hero.png"});
        let record = ContentService::publish(&store, ContentSection::Hero, payload.clone())
            .await
            .unwrap();
        assert_eq!(record.payload.0, payload);

        let current = ContentService::current(&store, ContentSection::Hero)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.id, record.id);
        assert_eq!(current.payload.0, payload);
    }
}
