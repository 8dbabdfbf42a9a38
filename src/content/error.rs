use thiserror::Error;

/// Failure of a single source document. The pipeline logs these with
/// the filename and continues with the remaining files.
#[derive(Debug, Error)]
pub enum DocumentError {
  /// The `---` delimiter pair around the metadata block is missing
  #[error("missing frontmatter delimiter pair")]
  MalformedDocument,

  /// The metadata block is not valid YAML or lacks required fields
  #[error("invalid frontmatter: {0}")]
  MalformedMetadata(#[from] serde_yaml::Error),

  /// Another document in the same run already produced this slug
  #[error("duplicate slug '{0}'")]
  DuplicateSlug(String),

  #[error("unreadable file: {0}")]
  Unreadable(#[from] std::io::Error),
}
