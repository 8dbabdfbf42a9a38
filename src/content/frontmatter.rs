//! Metadata header parsing for source documents.
//!
//! A document starts with a line containing only `---`, followed by a
//! YAML metadata block, another `---` line, and then the Markdown body.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_yaml::Value;

use super::error::DocumentError;
use super::record::ContentKind;

/// Metadata fields recognized in a document header.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(rename = "type", default)]
  pub kind: Option<ContentKind>,
  pub title: String,
  #[serde(default)]
  pub slug: Option<String>,
  pub date: NaiveDate,
  #[serde(default)]
  pub summary: Option<String>,
  #[serde(default)]
  pub cover_image: Option<String>,
  #[serde(default)]
  pub tags: Option<Vec<String>>,
  /// Accepts a YAML boolean or any scalar; see [`Frontmatter::is_active`]
  #[serde(default)]
  pub active: Option<Value>,
}

impl Frontmatter {
  /// A record is active unless the field is a YAML `false` or a string
  /// spelling "false" in any casing. Every other value means active.
  pub fn is_active(&self) -> bool {
    match &self.active {
      None | Some(Value::Null) => true,
      Some(Value::Bool(b)) => *b,
      Some(Value::String(s)) => !s.eq_ignore_ascii_case("false"),
      Some(_) => true,
    }
  }
}

/// Split raw document text into the metadata block and the body.
pub fn split(raw: &str) -> Result<(&str, &str), DocumentError> {
  let mut offset = 0usize;
  let mut block_start = None;

  for line in raw.split_inclusive('\n') {
    let trimmed = line.trim_end_matches(['\r', '\n']);

    match block_start {
      None => {
        if trimmed != "---" {
          return Err(DocumentError::MalformedDocument);
        }
        block_start = Some(offset + line.len());
      }
      Some(start) => {
        if trimmed == "---" {
          let metadata = &raw[start..offset];
          let body = &raw[offset + line.len()..];
          return Ok((metadata, body));
        }
      }
    }

    offset += line.len();
  }

  Err(DocumentError::MalformedDocument)
}

/// Parse the metadata block as YAML.
pub fn parse(block: &str) -> Result<Frontmatter, DocumentError> {
  Ok(serde_yaml::from_str(block)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  const DOC: &str = "---\ntitle: Hello\ndate: 2024-01-05\n---\n# Body\n";

  #[test]
  fn splits_metadata_and_body() {
    let (metadata, body) = split(DOC).unwrap();
    assert_eq!(metadata, "title: Hello\ndate: 2024-01-05\n");
    assert_eq!(body, "# Body\n");
  }

  #[test]
  fn missing_opening_delimiter_is_malformed() {
    let err = split("title: Hello\n---\n").unwrap_err();
    assert!(matches!(err, DocumentError::MalformedDocument));
  }

  #[test]
  fn unterminated_delimiter_is_malformed() {
    let err = split("---\ntitle: Hello\n# Body\n").unwrap_err();
    assert!(matches!(err, DocumentError::MalformedDocument));
  }

  #[test]
  fn closing_delimiter_may_be_the_last_line() {
    let (metadata, body) = split("---\ntitle: T\ndate: 2024-01-05\n---").unwrap();
    assert_eq!(metadata, "title: T\ndate: 2024-01-05\n");
    assert_eq!(body, "");
  }

  #[test]
  fn crlf_delimiters_are_recognized() {
    let (metadata, body) = split("---\r\ntitle: T\r\ndate: 2024-01-05\r\n---\r\nbody\r\n").unwrap();
    assert!(metadata.contains("title: T"));
    assert_eq!(body, "body\r\n");
  }

  #[test]
  fn parses_all_recognized_fields() {
    let fm = parse(
      "id: abc\ntype: project\ntitle: T\nslug: custom\ndate: 2024-02-10\n\
       summary: s\ncoverImage: /img/x.png\ntags: [rust, web]\nactive: true\n",
    )
    .unwrap();

    assert_eq!(fm.id.as_deref(), Some("abc"));
    assert_eq!(fm.kind, Some(ContentKind::Project));
    assert_eq!(fm.slug.as_deref(), Some("custom"));
    assert_eq!(fm.date, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
    assert_eq!(fm.tags.as_deref(), Some(&["rust".to_string(), "web".to_string()][..]));
    assert!(fm.is_active());
  }

  #[test]
  fn active_only_false_spellings_disable() {
    let inactive = ["active: false", "active: \"false\"", "active: \"FALSE\"", "active: \"False\""];
    for case in inactive {
      let fm = parse(&format!("title: T\ndate: 2024-01-01\n{}", case)).unwrap();
      assert!(!fm.is_active(), "{} should be inactive", case);
    }

    let active = ["", "active: true", "active: \"no\"", "active: 0", "active: \"falsey\""];
    for case in active {
      let fm = parse(&format!("title: T\ndate: 2024-01-01\n{}", case)).unwrap();
      assert!(fm.is_active(), "{:?} should be active", case);
    }
  }

  #[test]
  fn missing_title_or_date_is_invalid_metadata() {
    assert!(matches!(
      parse("date: 2024-01-01\n").unwrap_err(),
      DocumentError::MalformedMetadata(_)
    ));
    assert!(matches!(
      parse("title: T\n").unwrap_err(),
      DocumentError::MalformedMetadata(_)
    ));
  }
}
