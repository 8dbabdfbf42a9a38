//! Pure selection and ordering of Content Records for list views.
//!
//! A view is described by an immutable [`PostQuery`]; what gets shown
//! is always `select_and_order(visible_records, &query)` with no state
//! held anywhere else.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use tracing::warn;

use super::record::{ContentKind, ContentRecord};

/// Year-month bucket used by the date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Month {
  pub year: i32,
  pub month: u32,
}

impl Month {
  pub fn of(date: &NaiveDate) -> Self {
    Self {
      year: date.year(),
      month: date.month(),
    }
  }

  pub fn contains(&self, date: &NaiveDate) -> bool {
    date.year() == self.year && date.month() == self.month
  }
}

impl std::fmt::Display for Month {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:04}-{:02}", self.year, self.month)
  }
}

impl std::str::FromStr for Month {
  type Err = String;

  /// Parses the dropdown value format, e.g. "2024-03".
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (year, month) = s
      .split_once('-')
      .ok_or_else(|| format!("invalid month '{}' (expected YYYY-MM)", s))?;
    let year: i32 = year
      .parse()
      .map_err(|_| format!("invalid month '{}' (expected YYYY-MM)", s))?;
    let month: u32 = month
      .parse()
      .map_err(|_| format!("invalid month '{}' (expected YYYY-MM)", s))?;
    if !(1..=12).contains(&month) {
      return Err(format!("invalid month '{}' (month out of range)", s));
    }
    Ok(Self { year, month })
  }
}

/// Sort order for list views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
  #[default]
  DateDesc,
  DateAsc,
  TitleAsc,
  TitleDesc,
}

impl std::str::FromStr for SortKey {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "date-desc" => Ok(SortKey::DateDesc),
      "date-asc" => Ok(SortKey::DateAsc),
      "title-asc" => Ok(SortKey::TitleAsc),
      "title-desc" => Ok(SortKey::TitleDesc),
      other => Err(format!(
        "unknown sort '{}' (expected date-desc, date-asc, title-asc or title-desc)",
        other
      )),
    }
  }
}

/// Immutable description of what a list view should show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostQuery {
  pub tag: Option<String>,
  pub month: Option<Month>,
  pub sort: SortKey,
}

/// Records of one kind that are visible to readers.
pub fn visible(records: &[ContentRecord], kind: ContentKind) -> Vec<ContentRecord> {
  records
    .iter()
    .filter(|r| r.kind == kind && r.active)
    .cloned()
    .collect()
}

/// Apply a query to a record list. The input is never mutated.
pub fn select_and_order(records: &[ContentRecord], query: &PostQuery) -> Vec<ContentRecord> {
  let mut selected: Vec<ContentRecord> = records
    .iter()
    .filter(|r| {
      query
        .tag
        .as_ref()
        .map_or(true, |tag| r.tags.iter().any(|t| t == tag))
    })
    .filter(|r| query.month.map_or(true, |m| m.contains(&r.date)))
    .cloned()
    .collect();

  // All sorts are stable, so equal keys keep artifact order
  match query.sort {
    SortKey::DateDesc => selected.sort_by(|a, b| b.date.cmp(&a.date)),
    SortKey::DateAsc => selected.sort_by(|a, b| a.date.cmp(&b.date)),
    SortKey::TitleAsc => selected.sort_by(|a, b| a.title.cmp(&b.title)),
    SortKey::TitleDesc => selected.sort_by(|a, b| b.title.cmp(&a.title)),
  }

  selected
}

/// Sorted unique tags, for the tag filter options.
pub fn tag_options(records: &[ContentRecord]) -> Vec<String> {
  let tags: BTreeSet<String> = records
    .iter()
    .flat_map(|r| r.tags.iter().cloned())
    .collect();
  tags.into_iter().collect()
}

/// Unique year-month buckets, newest first, for the date filter options.
pub fn month_options(records: &[ContentRecord]) -> Vec<Month> {
  let months: BTreeSet<Month> = records.iter().map(|r| Month::of(&r.date)).collect();
  months.into_iter().rev().collect()
}

/// Single-post lookup. Slugs are unique in a well-formed artifact.
pub fn find_by_slug<'a>(records: &'a [ContentRecord], slug: &str) -> Option<&'a ContentRecord> {
  records.iter().find(|r| r.slug == slug)
}

/// Parse the generated artifact the way page scripts do: any failure
/// degrades to an empty list with a diagnostic, never a hard error.
pub fn parse_records(raw: &[u8]) -> Vec<ContentRecord> {
  match serde_json::from_slice(raw) {
    Ok(records) => records,
    Err(e) => {
      warn!("failed to parse content records: {}", e);
      Vec::new()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(title: &str, date: &str, tags: &[&str]) -> ContentRecord {
    ContentRecord {
      id: None,
      kind: ContentKind::Blog,
      title: title.to_string(),
      slug: title.to_lowercase(),
      date: date.parse().unwrap(),
      summary: String::new(),
      content_html: String::new(),
      cover_image: String::new(),
      tags: tags.iter().map(|t| t.to_string()).collect(),
      active: true,
    }
  }

  fn sample() -> Vec<ContentRecord> {
    vec![
      record("Alpha", "2024-03-10", &["rust", "web"]),
      record("Beta", "2024-03-01", &["rust"]),
      record("Gamma", "2024-01-20", &["web"]),
      record("Delta", "2023-11-05", &[]),
    ]
  }

  #[test]
  fn default_query_sorts_date_descending() {
    let out = select_and_order(&sample(), &PostQuery::default());
    let titles: Vec<&str> = out.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Alpha", "Beta", "Gamma", "Delta"]);
  }

  #[test]
  fn tag_filter_keeps_only_tagged_records() {
    let query = PostQuery {
      tag: Some("web".to_string()),
      ..PostQuery::default()
    };
    let out = select_and_order(&sample(), &query);
    let titles: Vec<&str> = out.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Alpha", "Gamma"]);
  }

  #[test]
  fn month_filter_keeps_only_that_bucket() {
    let query = PostQuery {
      month: Some("2024-03".parse().unwrap()),
      ..PostQuery::default()
    };
    let out = select_and_order(&sample(), &query);
    let titles: Vec<&str> = out.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Alpha", "Beta"]);
  }

  #[test]
  fn title_sorts_are_lexicographic() {
    let asc = select_and_order(
      &sample(),
      &PostQuery {
        sort: SortKey::TitleAsc,
        ..PostQuery::default()
      },
    );
    assert_eq!(asc[0].title, "Alpha");
    assert_eq!(asc[3].title, "Gamma");

    let desc = select_and_order(
      &sample(),
      &PostQuery {
        sort: SortKey::TitleDesc,
        ..PostQuery::default()
      },
    );
    assert_eq!(desc[0].title, "Gamma");
  }

  #[test]
  fn equal_dates_keep_input_order() {
    let records = vec![
      record("First", "2024-01-01", &[]),
      record("Second", "2024-01-01", &[]),
      record("Third", "2024-01-01", &[]),
    ];
    let out = select_and_order(&records, &PostQuery::default());
    let titles: Vec<&str> = out.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["First", "Second", "Third"]);
  }

  #[test]
  fn visible_drops_inactive_and_other_kinds() {
    let mut records = sample();
    records[1].active = false;
    records[2].kind = ContentKind::Project;

    let blogs = visible(&records, ContentKind::Blog);
    let titles: Vec<&str> = blogs.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Alpha", "Delta"]);

    let projects = visible(&records, ContentKind::Project);
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].title, "Gamma");
  }

  #[test]
  fn filter_options_are_unique_and_ordered() {
    assert_eq!(tag_options(&sample()), ["rust", "web"]);

    let months: Vec<String> = month_options(&sample()).iter().map(Month::to_string).collect();
    assert_eq!(months, ["2024-03", "2024-01", "2023-11"]);
  }

  #[test]
  fn finds_post_by_slug() {
    let records = sample();
    assert_eq!(find_by_slug(&records, "beta").unwrap().title, "Beta");
    assert!(find_by_slug(&records, "missing").is_none());
  }

  #[test]
  fn month_round_trips_through_strings() {
    let month: Month = "2024-03".parse().unwrap();
    assert_eq!(month, Month { year: 2024, month: 3 });
    assert_eq!(month.to_string(), "2024-03");
    assert!("2024".parse::<Month>().is_err());
    assert!("2024-13".parse::<Month>().is_err());
  }

  #[test]
  fn unparseable_artifact_degrades_to_empty() {
    assert!(parse_records(b"not json").is_empty());
    assert!(parse_records(b"[]").is_empty());

    let records = parse_records(
      br#"[{"title":"T","slug":"t","date":"2024-01-01","contentHtml":""}]"#,
    );
    assert_eq!(records.len(), 1);
  }
}
