//! # Versioned Field Configuration
//!
//! Explicit, versioned enumeration of the profile-settings fields this
//! backend knows how to carry across schema versions.
//!
//! ## Why Not Reflection
//! Earlier generations of this system enumerated custom fields by walking a
//! live schema at runtime, which made migrations depend on whatever happened
//! to be installed. Here the field set is static data, versioned in code:
//! merging settings between profile documents copies exactly the fields the
//! requested version enumerates, and nothing else. The highest version is
//! authoritative.
//!
//! ## Usage
//! ```rust
//! use serde_json::json;
//! use till_core::fields::FieldConfig;
//!
//! let config = FieldConfig::current();
//! let mut target = json!({}).as_object().unwrap().clone();
//! let source = json!({
//!     "allow_return_without_original": 1,
//!     "server_cache_ttl_secs": 900,
//!     "unrelated_key": "dropped",
//! })
//! .as_object()
//! .unwrap()
//! .clone();
//!
//! config.merge_settings(&mut target, &source);
//! assert!(target.contains_key("server_cache_ttl_secs"));
//! assert!(!target.contains_key("unrelated_key"));
//! ```

use serde_json::{Map, Value};

// =============================================================================
// Field Specs
// =============================================================================

/// Data kind of a settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-form text.
    Text,
    /// 0/1 flag.
    Check,
    /// Integer value.
    Int,
}

/// One settings field the backend carries.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name as it appears in settings documents.
    pub name: &'static str,

    /// Expected kind; merge drops values of the wrong kind rather than
    /// propagating garbage into a newer document.
    pub kind: FieldKind,

    /// Config version that introduced the field.
    pub since: u32,
}

/// Current configuration version.
pub const CURRENT_VERSION: u32 = 2;

/// All fields ever enumerated, in introduction order.
const FIELDS: &[FieldSpec] = &[
    // v1: original profile settings
    FieldSpec { name: "default_customer", kind: FieldKind::Text, since: 1 },
    FieldSpec { name: "allow_return_without_original", kind: FieldKind::Check, since: 1 },
    FieldSpec { name: "allow_partial_payment", kind: FieldKind::Check, since: 1 },
    FieldSpec { name: "max_discount_percent", kind: FieldKind::Int, since: 1 },
    // v2: server-side token cache controls
    FieldSpec { name: "use_server_cache", kind: FieldKind::Check, since: 2 },
    FieldSpec { name: "server_cache_ttl_secs", kind: FieldKind::Int, since: 2 },
];

// =============================================================================
// Field Config
// =============================================================================

/// The set of settings fields valid at one configuration version.
#[derive(Debug, Clone, Copy)]
pub struct FieldConfig {
    version: u32,
}

impl FieldConfig {
    /// Configuration at the current (highest, authoritative) version.
    pub fn current() -> Self {
        FieldConfig {
            version: CURRENT_VERSION,
        }
    }

    /// Configuration as of a given version. Versions above the current one
    /// are clamped; version 0 enumerates nothing.
    pub fn at_version(version: u32) -> Self {
        FieldConfig {
            version: version.min(CURRENT_VERSION),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Fields enumerated at this version.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        let version = self.version;
        FIELDS.iter().filter(move |f| f.since <= version)
    }

    /// Copies the enumerated fields from `source` into `target`.
    ///
    /// Only fields this version knows are copied; values of the wrong kind
    /// are skipped. Existing target values are overwritten (the source is
    /// the newer document). Returns the number of fields copied.
    pub fn merge_settings(
        &self,
        target: &mut Map<String, Value>,
        source: &Map<String, Value>,
    ) -> usize {
        let mut copied = 0;

        for spec in self.fields() {
            let Some(value) = source.get(spec.name) else {
                continue;
            };
            if !kind_matches(spec.kind, value) {
                continue;
            }
            target.insert(spec.name.to_string(), value.clone());
            copied += 1;
        }

        copied
    }
}

fn kind_matches(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Text => value.is_string(),
        // Flags arrive as 0/1 integers or as booleans, depending on source
        FieldKind::Check => value.is_boolean() || value.is_i64() || value.is_u64(),
        FieldKind::Int => value.is_i64() || value.is_u64(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_version_gating() {
        let v1 = FieldConfig::at_version(1);
        assert!(v1.fields().all(|f| f.since <= 1));
        assert!(v1.fields().any(|f| f.name == "default_customer"));
        assert!(!v1.fields().any(|f| f.name == "server_cache_ttl_secs"));

        let v2 = FieldConfig::current();
        assert!(v2.fields().any(|f| f.name == "server_cache_ttl_secs"));
    }

    #[test]
    fn test_merge_copies_only_enumerated_fields() {
        let config = FieldConfig::current();
        let mut target = Map::new();
        let source = obj(json!({
            "default_customer": "Walk-in Customer",
            "server_cache_ttl_secs": 900,
            "stray": "not ours",
        }));

        let copied = config.merge_settings(&mut target, &source);
        assert_eq!(copied, 2);
        assert_eq!(target.get("default_customer"), Some(&json!("Walk-in Customer")));
        assert!(!target.contains_key("stray"));
    }

    #[test]
    fn test_merge_respects_version() {
        let config = FieldConfig::at_version(1);
        let mut target = Map::new();
        let source = obj(json!({ "server_cache_ttl_secs": 900 }));

        assert_eq!(config.merge_settings(&mut target, &source), 0);
        assert!(target.is_empty());
    }

    #[test]
    fn test_merge_skips_wrong_kind() {
        let config = FieldConfig::current();
        let mut target = Map::new();
        let source = obj(json!({ "max_discount_percent": "ten" }));

        assert_eq!(config.merge_settings(&mut target, &source), 0);
    }

    #[test]
    fn test_merge_overwrites_target() {
        let config = FieldConfig::current();
        let mut target = obj(json!({ "allow_partial_payment": 0 }));
        let source = obj(json!({ "allow_partial_payment": 1 }));

        config.merge_settings(&mut target, &source);
        assert_eq!(target.get("allow_partial_payment"), Some(&json!(1)));
    }

    #[test]
    fn test_future_version_clamped() {
        let config = FieldConfig::at_version(99);
        assert_eq!(config.version(), CURRENT_VERSION);
    }
}
