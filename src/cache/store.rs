//! Cache storage: responses keyed by URL, partitioned into named
//! generations. Includes an in-memory store and a SQLite store.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use url::Url;

use super::traits::{Response, ResponseKind};

/// Key-value store for cached responses with two roles: entry access
/// within one generation, and lifecycle control over whole generations.
/// Writes to the same key serialize with last write winning.
pub trait CacheStore: Send + Sync {
  /// Store a response under `url`, creating the generation if needed.
  fn put(&self, generation: &str, url: &Url, response: &Response) -> Result<()>;

  /// Look up `url` in one generation only.
  fn get(&self, generation: &str, url: &Url) -> Result<Option<Response>>;

  /// Look up `url` across all generations. Later-created generations
  /// shadow earlier ones, so a refreshed copy in the dynamic generation
  /// wins over the install-time one. With `ignore_search` the query
  /// string is dropped from both sides of the comparison.
  fn lookup(&self, url: &Url, ignore_search: bool) -> Result<Option<Response>>;

  /// Names of all generations, in creation order.
  fn generations(&self) -> Result<Vec<String>>;

  /// Delete a whole generation. Returns whether it existed.
  fn delete_generation(&self, name: &str) -> Result<bool>;
}

/// Full URL key with the fragment dropped.
fn entry_key(url: &Url) -> String {
  let mut url = url.clone();
  url.set_fragment(None);
  url.to_string()
}

/// Key with query string and fragment dropped, for ignore-search matches.
fn base_key(url: &Url) -> String {
  let mut url = url.clone();
  url.set_fragment(None);
  url.set_query(None);
  url.to_string()
}

// ============================================================================
// In-memory store
// ============================================================================

struct StoredEntry {
  base: String,
  response: Response,
}

struct MemoryGeneration {
  name: String,
  entries: BTreeMap<String, StoredEntry>,
}

/// In-memory store for tests and ephemeral runs. Generations live in a
/// Vec so creation order is preserved.
#[derive(Default)]
pub struct MemoryStore {
  generations: Mutex<Vec<MemoryGeneration>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for MemoryStore {
  fn put(&self, generation: &str, url: &Url, response: &Response) -> Result<()> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let entry = StoredEntry {
      base: base_key(url),
      response: response.clone(),
    };

    match generations.iter_mut().find(|g| g.name == generation) {
      Some(g) => {
        g.entries.insert(entry_key(url), entry);
      }
      None => {
        let mut entries = BTreeMap::new();
        entries.insert(entry_key(url), entry);
        generations.push(MemoryGeneration {
          name: generation.to_string(),
          entries,
        });
      }
    }

    Ok(())
  }

  fn get(&self, generation: &str, url: &Url) -> Result<Option<Response>> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(
      generations
        .iter()
        .find(|g| g.name == generation)
        .and_then(|g| g.entries.get(&entry_key(url)))
        .map(|e| e.response.clone()),
    )
  }

  fn lookup(&self, url: &Url, ignore_search: bool) -> Result<Option<Response>> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let key = entry_key(url);
    let base = base_key(url);

    for generation in generations.iter().rev() {
      if ignore_search {
        if let Some(entry) = generation.entries.values().find(|e| e.base == base) {
          return Ok(Some(entry.response.clone()));
        }
      } else if let Some(entry) = generation.entries.get(&key) {
        return Ok(Some(entry.response.clone()));
      }
    }

    Ok(None)
  }

  fn generations(&self) -> Result<Vec<String>> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(generations.iter().map(|g| g.name.clone()).collect())
  }

  fn delete_generation(&self, name: &str) -> Result<bool> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let before = generations.len();
    generations.retain(|g| g.name != name);
    Ok(generations.len() < before)
  }
}

// ============================================================================
// SQLite store
// ============================================================================

/// SQLite-backed store, persistent across runs.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    Self::open_at(&path)
  }

  /// Open the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Open a transient store for tests.
  pub fn in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open cache database: {}", e))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("offpress").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Generation registry; rowid preserves creation order
CREATE TABLE IF NOT EXISTS generations (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cached responses keyed by URL within a generation
CREATE TABLE IF NOT EXISTS response_cache (
    generation TEXT NOT NULL,
    url TEXT NOT NULL,
    url_base TEXT NOT NULL,
    status INTEGER NOT NULL,
    kind TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, url)
);

CREATE INDEX IF NOT EXISTS idx_response_cache_base
    ON response_cache(url_base);
"#;

fn decode_row(status: i64, kind: String, headers: String, body: Vec<u8>) -> Result<Response> {
  let kind =
    ResponseKind::parse(&kind).ok_or_else(|| eyre!("Unknown response kind '{}'", kind))?;
  let headers: Vec<(String, String)> =
    serde_json::from_str(&headers).map_err(|e| eyre!("Failed to parse stored headers: {}", e))?;

  Ok(Response {
    status: status as u16,
    kind,
    headers,
    body,
  })
}

impl CacheStore for SqliteStore {
  fn put(&self, generation: &str, url: &Url, response: &Response) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let headers = serde_json::to_string(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO generations (name) VALUES (?)",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to register generation: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO response_cache (generation, url, url_base, status, kind, headers, body, stored_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          generation,
          entry_key(url),
          base_key(url),
          response.status,
          response.kind.as_str(),
          headers,
          response.body
        ],
      )
      .map_err(|e| eyre!("Failed to store response: {}", e))?;

    Ok(())
  }

  fn get(&self, generation: &str, url: &Url) -> Result<Option<Response>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT status, kind, headers, body FROM response_cache
         WHERE generation = ? AND url = ?",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let row: Option<(i64, String, String, Vec<u8>)> = stmt
      .query_row(params![generation, entry_key(url)], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
      })
      .ok();

    match row {
      Some((status, kind, headers, body)) => Ok(Some(decode_row(status, kind, headers, body)?)),
      None => Ok(None),
    }
  }

  fn lookup(&self, url: &Url, ignore_search: bool) -> Result<Option<Response>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let sql = if ignore_search {
      "SELECT rc.status, rc.kind, rc.headers, rc.body FROM response_cache rc
       INNER JOIN generations g ON g.name = rc.generation
       WHERE rc.url_base = ?
       ORDER BY g.rowid DESC, rc.url
       LIMIT 1"
    } else {
      "SELECT rc.status, rc.kind, rc.headers, rc.body FROM response_cache rc
       INNER JOIN generations g ON g.name = rc.generation
       WHERE rc.url = ?
       ORDER BY g.rowid DESC
       LIMIT 1"
    };

    let key = if ignore_search {
      base_key(url)
    } else {
      entry_key(url)
    };

    let mut stmt = conn
      .prepare(sql)
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let row: Option<(i64, String, String, Vec<u8>)> = stmt
      .query_row(params![key], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
      })
      .ok();

    match row {
      Some((status, kind, headers, body)) => Ok(Some(decode_row(status, kind, headers, body)?)),
      None => Ok(None),
    }
  }

  fn generations(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM generations ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to list generations: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  fn delete_generation(&self, name: &str) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM response_cache WHERE generation = ?", params![name])
      .map_err(|e| eyre!("Failed to delete cached responses: {}", e))?;

    let deleted = conn
      .execute("DELETE FROM generations WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete generation: {}", e))?;

    Ok(deleted > 0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    s.parse().unwrap()
  }

  fn exercise_store<S: CacheStore>(store: S) {
    let page = url("https://example.org/blog.html");

    // Round trip, then last write wins
    store.put("static-v1", &page, &Response::new(200, "one")).unwrap();
    store.put("static-v1", &page, &Response::new(200, "two")).unwrap();
    let got = store.get("static-v1", &page).unwrap().unwrap();
    assert_eq!(got.body, b"two");

    // Exact lookup requires the query string to match
    let with_query = url("https://example.org/blog.html?slug=x");
    assert!(store.lookup(&with_query, false).unwrap().is_none());
    assert_eq!(store.lookup(&page, false).unwrap().unwrap().body, b"two");

    // Ignore-search matches across differing query strings
    assert_eq!(store.lookup(&with_query, true).unwrap().unwrap().body, b"two");

    // The later-created generation shadows the earlier one
    store
      .put("dynamic-v1", &page, &Response::new(200, "newer"))
      .unwrap();
    assert_eq!(store.lookup(&page, false).unwrap().unwrap().body, b"newer");
    assert_eq!(store.get("static-v1", &page).unwrap().unwrap().body, b"two");

    // Creation order is preserved
    assert_eq!(store.generations().unwrap(), ["static-v1", "dynamic-v1"]);

    // Deleting a generation removes its entries and its name
    assert!(store.delete_generation("dynamic-v1").unwrap());
    assert!(!store.delete_generation("dynamic-v1").unwrap());
    assert!(store.get("dynamic-v1", &page).unwrap().is_none());
    assert_eq!(store.lookup(&page, false).unwrap().unwrap().body, b"two");
    assert_eq!(store.generations().unwrap(), ["static-v1"]);
  }

  #[test]
  fn memory_store_behaves() {
    exercise_store(MemoryStore::new());
  }

  #[test]
  fn sqlite_store_behaves() {
    exercise_store(SqliteStore::in_memory().unwrap());
  }

  #[test]
  fn sqlite_store_persists_headers_and_kind() {
    let store = SqliteStore::in_memory().unwrap();
    let target = url("https://example.org/data/posts.json");

    let response = Response {
      status: 200,
      kind: ResponseKind::Basic,
      headers: vec![("content-type".to_string(), "application/json".to_string())],
      body: b"[]".to_vec(),
    };
    store.put("static-v1", &target, &response).unwrap();

    let got = store.get("static-v1", &target).unwrap().unwrap();
    assert_eq!(got, response);
  }

  #[test]
  fn fragments_never_distinguish_entries() {
    let store = MemoryStore::new();
    let plain = url("https://example.org/page.html");
    let fragment = url("https://example.org/page.html#section");

    store.put("static-v1", &plain, &Response::new(200, "x")).unwrap();
    assert!(store.lookup(&fragment, false).unwrap().is_some());
  }
}
