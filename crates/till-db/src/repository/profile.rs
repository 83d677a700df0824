//! # Profile Repository
//!
//! Storage for POS profile settings documents. The documents themselves are
//! produced by the versioned field configuration in till-core; this
//! repository only persists them alongside the version that wrote them.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for profile settings.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    /// Creates a new ProfileRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProfileRepository { pool }
    }

    /// Writes (or replaces) a profile's settings document.
    pub async fn upsert_settings(&self, name: &str, settings: &str, version: u32) -> DbResult<()> {
        debug!(profile = %name, version, "writing profile settings");

        sqlx::query(
            "INSERT INTO pos_profiles (name, settings, settings_version) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (name) DO UPDATE SET settings = ?2, settings_version = ?3",
        )
        .bind(name)
        .bind(settings)
        .bind(version as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// A profile's settings document and the version that wrote it.
    pub async fn get_settings(&self, name: &str) -> DbResult<Option<(String, u32)>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT settings, settings_version FROM pos_profiles WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(settings, version)| (settings, version as u32)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::{json, Map, Value};
    use till_core::fields::FieldConfig;

    async fn test_db() -> Database {
        Database::open(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = test_db().await;
        let repo = db.profiles();

        repo.upsert_settings("Main Store", r#"{"default_customer":"Walk-in Customer"}"#, 2)
            .await
            .unwrap();

        let (settings, version) = repo.get_settings("Main Store").await.unwrap().unwrap();
        assert!(settings.contains("Walk-in Customer"));
        assert_eq!(version, 2);

        repo.upsert_settings("Main Store", "{}", 3).await.unwrap();
        let (settings, version) = repo.get_settings("Main Store").await.unwrap().unwrap();
        assert_eq!(settings, "{}");
        assert_eq!(version, 3);
    }

    #[tokio::test]
    async fn test_merged_settings_round_trip() {
        let db = test_db().await;
        let repo = db.profiles();

        // A legacy-shaped document: the merge keeps only enumerated fields.
        let legacy: Map<String, Value> = serde_json::from_value(json!({
            "default_customer": "Walk-in Customer",
            "server_cache_ttl_secs": 900,
            "legacy_theme": "dark",
        }))
        .unwrap();

        let config = FieldConfig::current();
        let mut settings = Map::new();
        config.merge_settings(&mut settings, &legacy);

        repo.upsert_settings(
            "Main Store",
            &Value::Object(settings).to_string(),
            config.version(),
        )
        .await
        .unwrap();

        let (stored, version) = repo.get_settings("Main Store").await.unwrap().unwrap();
        assert_eq!(version, config.version());
        let parsed: Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed["server_cache_ttl_secs"], 900);
        assert!(parsed.get("legacy_theme").is_none());
    }
}
