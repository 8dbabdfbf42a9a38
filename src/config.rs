use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub site: SiteConfig,
  pub content: ContentConfig,
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
  /// Origin the cache manifest paths resolve against
  pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
  /// Directory of Markdown source documents
  pub dir: PathBuf,
  /// Path of the generated JSON artifact
  pub output: PathBuf,
}

impl Default for ContentConfig {
  fn default() -> Self {
    Self {
      dir: PathBuf::from("posts"),
      output: PathBuf::from("data/posts.json"),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Generation version suffix; bumping it invalidates old caches
  pub version: String,
  /// Absolute site paths cached at install time
  pub precache: Vec<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: "v1".to_string(),
      precache: default_precache(),
    }
  }
}

fn default_precache() -> Vec<String> {
  [
    "/",
    "/index.html",
    "/about.html",
    "/blog.html",
    "/projects.html",
    "/post.html",
    "/assets/css/styles.css",
    "/assets/js/app.js",
    "/assets/img/logo.svg",
    "/data/posts.json",
    "/manifest.json",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./offpress.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/offpress/config.yaml
  ///
  /// Built-in defaults apply when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("offpress.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("offpress").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Site origin, required by the cache controller commands.
  pub fn base_url(&self) -> Result<Url> {
    let raw = self
      .site
      .base_url
      .as_deref()
      .ok_or_else(|| eyre!("No site.base_url configured. Set it in offpress.yaml."))?;

    Url::parse(raw).map_err(|e| eyre!("Invalid site.base_url {}: {}", raw, e))
  }

  /// The artifact's path on the site, e.g. "/data/posts.json".
  pub fn content_json_path(&self) -> String {
    let rel = self.content.output.to_string_lossy().replace('\\', "/");
    format!("/{}", rel.trim_start_matches('/'))
  }
}
