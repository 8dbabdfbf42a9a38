//! The build step: a directory of Markdown sources in, one ordered and
//! filtered JSON artifact out.

use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::error::DocumentError;
use super::frontmatter;
use super::markdown;
use super::record::ContentRecord;

/// Counters reported after a pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
  /// Matching source files discovered
  pub found: usize,
  /// Files dropped with a per-file error
  pub skipped: usize,
  /// Records excluded because their date is still in the future
  pub scheduled: usize,
  /// Records written to the output artifact
  pub written: usize,
}

/// Transform every Markdown document under `content_dir` into Content
/// Records and write them to `output` as a pretty-printed JSON array.
///
/// A missing source directory is created and the run ends successfully
/// without touching the output. Zero matching files also leaves any
/// prior output alone. Per-file failures are logged and skipped; only
/// directory enumeration and output write failures abort the run.
pub fn generate(content_dir: &Path, output: &Path) -> Result<RunSummary> {
  info!("scanning {} for markdown files", content_dir.display());

  if !content_dir.exists() {
    std::fs::create_dir_all(content_dir)
      .map_err(|e| eyre!("Failed to create content directory {}: {}", content_dir.display(), e))?;
    info!("content directory did not exist, created {}", content_dir.display());
    return Ok(RunSummary::default());
  }

  let mut files = markdown_files(content_dir)?;
  if files.is_empty() {
    info!("no markdown files in {}", content_dir.display());
    return Ok(RunSummary::default());
  }
  files.sort();

  let mut summary = RunSummary {
    found: files.len(),
    ..RunSummary::default()
  };

  let mut records: Vec<ContentRecord> = Vec::with_capacity(files.len());
  let mut seen_slugs: HashSet<String> = HashSet::new();

  for path in &files {
    let name = file_name(path);
    match process_file(path) {
      Ok(record) => {
        if !seen_slugs.insert(record.slug.clone()) {
          let err = DocumentError::DuplicateSlug(record.slug.clone());
          error!("skipping {}: {}", name, err);
          summary.skipped += 1;
          continue;
        }
        info!("processed {}", name);
        records.push(record);
      }
      Err(err) => {
        error!("skipping {}: {}", name, err);
        summary.skipped += 1;
      }
    }
  }

  // Scheduled publishing: anything dated after today stays out of the
  // artifact, whether or not the record is active.
  let today = Local::now().date_naive();
  let before = records.len();
  records.retain(|r| r.date <= today);
  summary.scheduled = before - records.len();
  if summary.scheduled > 0 {
    info!("{} post(s) scheduled for future publication", summary.scheduled);
  }

  // Stable sort, so equal dates keep filename order
  records.sort_by(|a, b| b.date.cmp(&a.date));

  if let Some(parent) = output.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create output directory {}: {}", parent.display(), e))?;
  }

  let json = serde_json::to_string_pretty(&records)
    .map_err(|e| eyre!("Failed to serialize records: {}", e))?;
  std::fs::write(output, json).map_err(|e| eyre!("Failed to write {}: {}", output.display(), e))?;

  summary.written = records.len();
  info!("wrote {} with {} record(s)", output.display(), summary.written);

  Ok(summary)
}

/// Process one source document into a Content Record.
fn process_file(path: &Path) -> Result<ContentRecord, DocumentError> {
  let raw = std::fs::read_to_string(path)?;
  let (metadata, body) = frontmatter::split(&raw)?;
  let fm = frontmatter::parse(metadata)?;

  let active = fm.is_active();
  let slug = fm.slug.unwrap_or_else(|| derived_slug(path));

  Ok(ContentRecord {
    id: fm.id,
    kind: fm.kind.unwrap_or_default(),
    title: fm.title,
    slug,
    date: fm.date,
    summary: fm.summary.unwrap_or_default(),
    content_html: markdown::render(body),
    cover_image: fm.cover_image.unwrap_or_default(),
    tags: fm.tags.unwrap_or_default(),
    active,
  })
}

/// Default identity: filename minus extension, lowercased.
fn derived_slug(path: &Path) -> String {
  path
    .file_stem()
    .and_then(|s| s.to_str())
    .unwrap_or_default()
    .to_lowercase()
}

fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let entries = std::fs::read_dir(dir)
    .map_err(|e| eyre!("Failed to read content directory {}: {}", dir.display(), e))?;

  let mut files = Vec::new();
  for entry in entries {
    let entry =
      entry.map_err(|e| eyre!("Failed to read content directory {}: {}", dir.display(), e))?;
    let path = entry.path();
    let is_markdown = path
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|e| e.eq_ignore_ascii_case("md"));
    if is_markdown && path.is_file() {
      files.push(path);
    }
  }

  Ok(files)
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("<unknown>")
    .to_string()
}
