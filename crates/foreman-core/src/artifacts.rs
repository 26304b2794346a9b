//! Task artifacts and fenced-code extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Matches a fenced code block with an optional language tag.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+-]*)[ \t]*\n(.*?)```").expect("static regex")
});

/// A file-like deliverable produced by a worker or written by the admin.
///
/// Owned by the task that produced it; never mutated in place — overwriting
/// is a new write with the same id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique artifact id.
    pub id: String,
    /// Kind of artifact ("markdown", "python", "code", ...).
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Display title.
    pub title: String,
    /// Full content.
    pub content: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// Open metadata map.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Artifact {
    /// Create a new artifact with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(
        artifact_type: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("art-{}", uuid::Uuid::now_v7()),
            artifact_type: artifact_type.into(),
            title: title.into(),
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            metadata: Map::new(),
        }
    }
}

/// Materialize every fenced code block in `text` as an artifact.
///
/// The language tag becomes the artifact type (`code` when untagged).
/// Blocks with no content are skipped.
#[must_use]
pub fn extract_code_artifacts(text: &str) -> Vec<Artifact> {
    CODE_FENCE
        .captures_iter(text)
        .filter_map(|cap| {
            let content = cap.get(2).map_or("", |m| m.as_str());
            if content.trim().is_empty() {
                return None;
            }
            let lang = cap.get(1).map_or("", |m| m.as_str());
            let artifact_type = if lang.is_empty() { "code" } else { lang };
            Some((artifact_type.to_string(), content.to_string()))
        })
        .enumerate()
        .map(|(i, (artifact_type, content))| {
            let title = format!("Code block {} ({artifact_type})", i + 1);
            Artifact::new(artifact_type, title, content)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tagged_block() {
        let artifacts = extract_code_artifacts("before\n```python\nprint(1)\n```\nafter");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].artifact_type, "python");
        assert_eq!(artifacts[0].content, "print(1)\n");
    }

    #[test]
    fn untagged_block_is_code() {
        let artifacts = extract_code_artifacts("```\nx = 1\n```");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].artifact_type, "code");
    }

    #[test]
    fn multiple_blocks_numbered() {
        let text = "```rust\nfn a() {}\n```\ntext\n```sql\nSELECT 1;\n```";
        let artifacts = extract_code_artifacts(text);
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].artifact_type, "rust");
        assert_eq!(artifacts[1].artifact_type, "sql");
        assert!(artifacts[1].title.starts_with("Code block 2"));
    }

    #[test]
    fn empty_block_skipped() {
        assert!(extract_code_artifacts("```\n\n```").is_empty());
        assert!(extract_code_artifacts("no code here").is_empty());
    }

    #[test]
    fn artifact_ids_unique() {
        let a = Artifact::new("markdown", "t", "c");
        let b = Artifact::new("markdown", "t", "c");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_type_field() {
        let v = serde_json::to_value(Artifact::new("markdown", "t", "c")).unwrap();
        assert_eq!(v["type"], "markdown");
        assert!(v["createdAt"].is_string());
    }
}
