//! Artifact extraction and registry
//!
//! Tool results coming back from the agent are loosely structured text: a
//! given result may be genuine JSON or a Python-dict style repr with single
//! quotes, and either may be truncated or otherwise malformed. Extraction
//! runs strict JSON parsing first and only falls back to a permissive
//! pattern scan when parsing fails, so well-formed payloads are handled
//! exactly and the tolerant path stays explicit.

use once_cell::sync::Lazy;
use regex::Regex;

/// Key whose quoted value is a downloadable artifact reference
const DOWNLOAD_URL_KEY: &str = "download_url";

/// Scan one tool result for artifact references.
///
/// Returns every `download_url` value found, left to right, duplicates
/// included. Never fails: malformed input or absence of the key yields an
/// empty vec.
pub fn extract_artifacts(result_text: &str) -> Vec<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(result_text) {
        let mut found = Vec::new();
        walk_json(&value, &mut found);
        return found;
    }

    scan_loose_text(result_text)
}

/// Collect `download_url` string values from parsed JSON in document order
fn walk_json(value: &serde_json::Value, found: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                if key == DOWNLOAD_URL_KEY {
                    if let Some(s) = val.as_str() {
                        found.push(s.to_string());
                    }
                }
                walk_json(val, found);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                walk_json(item, found);
            }
        }
        _ => {}
    }
}

/// Permissive fallback for non-JSON text (Python-dict reprs, truncated
/// payloads). Accepts single- or double-quoted keys and values.
fn scan_loose_text(text: &str) -> Vec<String> {
    static DOWNLOAD_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"["']download_url["']\s*:\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid download_url regex")
    });

    DOWNLOAD_URL_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Session-scoped set of artifact references.
///
/// Membership is exact string equality; no path or URL normalization.
/// Entries keep first-insertion order. The registry is a derived view of
/// the conversation log: [`ArtifactRegistry::from_results`] rebuilds it
/// from scratch, and incremental [`merge`](ArtifactRegistry::merge) calls
/// must always agree with that rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactRegistry {
    entries: Vec<String>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry as the union over a sequence of tool result
    /// texts. This is the authoritative definition of registry content.
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut registry = Self::new();
        for result in results {
            registry.merge(extract_artifacts(result));
        }
        registry
    }

    /// Insert one reference. Returns true if it was new.
    pub fn insert(&mut self, reference: impl Into<String>) -> bool {
        let reference = reference.into();
        if self.contains(&reference) {
            return false;
        }
        self.entries.push(reference);
        true
    }

    /// Union a batch of references into the registry. Returns how many
    /// were new.
    pub fn merge<I>(&mut self, references: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = 0;
        for reference in references {
            if self.insert(reference) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.iter().any(|e| e == reference)
    }

    /// Entries in first-insertion order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_python_dict_repr() {
        let text = "{'download_url': '/api/download/s1/chart.png'}";
        assert_eq!(
            extract_artifacts(text),
            vec!["/api/download/s1/chart.png".to_string()]
        );
    }

    #[test]
    fn test_extract_from_genuine_json() {
        let text = r#"{"download_url": "/x/y.png"}"#;
        assert_eq!(extract_artifacts(text), vec!["/x/y.png".to_string()]);
    }

    #[test]
    fn test_extract_no_artifact() {
        assert!(extract_artifacts("no artifact here").is_empty());
    }

    #[test]
    fn test_extract_empty_input() {
        assert!(extract_artifacts("").is_empty());
    }

    #[test]
    fn test_extract_json_string_without_key() {
        // Valid JSON that simply carries no artifact
        assert!(extract_artifacts(r#""all done""#).is_empty());
    }

    #[test]
    fn test_extract_multiple_preserves_order() {
        let text = r#"[{"download_url": "/a.png"}, {"download_url": "/b.png"}]"#;
        assert_eq!(
            extract_artifacts(text),
            vec!["/a.png".to_string(), "/b.png".to_string()]
        );
    }

    #[test]
    fn test_extract_object_keys_in_document_order() {
        let text = r#"{"zeta": {"download_url": "/z.png"}, "alpha": {"download_url": "/a.png"}}"#;
        assert_eq!(
            extract_artifacts(text),
            vec!["/z.png".to_string(), "/a.png".to_string()]
        );
    }

    #[test]
    fn test_extract_nested_json() {
        let text = r#"{"status": "ok", "files": [{"name": "acwr", "download_url": "/api/download/s1/acwr.png"}]}"#;
        assert_eq!(
            extract_artifacts(text),
            vec!["/api/download/s1/acwr.png".to_string()]
        );
    }

    #[test]
    fn test_extract_duplicates_kept_by_extractor() {
        let text = "{'download_url': '/a.png', 'other': 1, 'download_url': '/a.png'}";
        // Python reprs can repeat keys; dedup is the registry's job
        assert_eq!(
            extract_artifacts(text),
            vec!["/a.png".to_string(), "/a.png".to_string()]
        );
    }

    #[test]
    fn test_extract_from_truncated_payload() {
        let text = "{'status': 'ok', 'download_url': '/api/download/s1/weekly.png', 'rows";
        assert_eq!(
            extract_artifacts(text),
            vec!["/api/download/s1/weekly.png".to_string()]
        );
    }

    #[test]
    fn test_extract_mixed_quoting() {
        let text = r#"{'download_url': "/api/download/s1/a.png"}"#;
        assert_eq!(
            extract_artifacts(text),
            vec!["/api/download/s1/a.png".to_string()]
        );
    }

    #[test]
    fn test_extract_non_string_value_ignored() {
        assert!(extract_artifacts(r#"{"download_url": 42}"#).is_empty());
    }

    #[test]
    fn test_extract_loose_multiple_in_order() {
        let text = "first {'download_url': '/1.png'} then {'download_url': '/2.png'}";
        assert_eq!(
            extract_artifacts(text),
            vec!["/1.png".to_string(), "/2.png".to_string()]
        );
    }

    #[test]
    fn test_registry_dedup() {
        let mut registry = ArtifactRegistry::new();
        assert!(registry.insert("/a.png"));
        assert!(!registry.insert("/a.png"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_exact_string_equality() {
        let mut registry = ArtifactRegistry::new();
        registry.insert("/a.png");
        // No normalization: different spellings are different entries
        assert!(registry.insert("/A.png"));
        assert!(registry.insert("/a.png/"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_registry_first_insertion_order() {
        let mut registry = ArtifactRegistry::new();
        registry.merge(vec!["/b.png".to_string(), "/a.png".to_string()]);
        registry.merge(vec!["/a.png".to_string(), "/c.png".to_string()]);
        assert_eq!(registry.entries(), &["/b.png", "/a.png", "/c.png"]);
    }

    #[test]
    fn test_registry_merge_counts_new_only() {
        let mut registry = ArtifactRegistry::new();
        let added = registry.merge(vec![
            "/a.png".to_string(),
            "/b.png".to_string(),
            "/a.png".to_string(),
        ]);
        assert_eq!(added, 2);
    }

    #[test]
    fn test_registry_rebuild_matches_incremental() {
        let results = [
            "{'download_url': '/a.png'}",
            "no artifact here",
            r#"{"files": [{"download_url": "/b.png"}, {"download_url": "/a.png"}]}"#,
        ];

        let mut incremental = ArtifactRegistry::new();
        for result in &results {
            incremental.merge(extract_artifacts(result));
        }

        let rebuilt = ArtifactRegistry::from_results(results.iter().copied());
        assert_eq!(incremental, rebuilt);
        assert_eq!(rebuilt.entries(), &["/a.png", "/b.png"]);
    }

    #[test]
    fn test_registry_clear() {
        let mut registry = ArtifactRegistry::from_results(["{'download_url': '/a.png'}"]);
        assert!(!registry.is_empty());
        registry.clear();
        assert!(registry.is_empty());
    }
}
