use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of publishable content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
  #[default]
  Blog,
  Project,
}

impl std::str::FromStr for ContentKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "blog" => Ok(ContentKind::Blog),
      "project" => Ok(ContentKind::Project),
      other => Err(format!("unknown content kind '{}' (expected blog or project)", other)),
    }
  }
}

/// One normalized unit of publishable content, as written to the
/// generated JSON artifact and read back by consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
  /// Author-supplied opaque identifier
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(rename = "type", default)]
  pub kind: ContentKind,
  pub title: String,
  /// URL-safe unique key, derived from the filename unless overridden
  pub slug: String,
  pub date: NaiveDate,
  #[serde(default)]
  pub summary: String,
  /// Rendered body, trimmed of leading/trailing whitespace
  pub content_html: String,
  #[serde(default)]
  pub cover_image: String,
  #[serde(default)]
  pub tags: Vec<String>,
  /// False hides the record from client display
  #[serde(default = "default_active")]
  pub active: bool,
}

fn default_active() -> bool {
  true
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serializes_with_client_field_names() {
    let record = ContentRecord {
      id: None,
      kind: ContentKind::Project,
      title: "Demo".to_string(),
      slug: "demo".to_string(),
      date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      summary: String::new(),
      content_html: "<p>hi</p>".to_string(),
      cover_image: String::new(),
      tags: vec!["rust".to_string()],
      active: true,
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "project");
    assert_eq!(json["contentHtml"], "<p>hi</p>");
    assert_eq!(json["coverImage"], "");
    assert_eq!(json["date"], "2024-03-01");
    // Absent id is omitted entirely
    assert!(json.get("id").is_none());
  }

  #[test]
  fn missing_optional_fields_take_defaults_on_parse() {
    let json = r#"{
      "title": "Hello",
      "slug": "hello",
      "date": "2024-01-05",
      "contentHtml": "<p>x</p>"
    }"#;

    let record: ContentRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.kind, ContentKind::Blog);
    assert_eq!(record.summary, "");
    assert_eq!(record.cover_image, "");
    assert!(record.tags.is_empty());
    assert!(record.active);
  }
}
