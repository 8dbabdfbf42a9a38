//! The offline cache controller: decides, per request, between cache,
//! network, and fallback, and manages generation lifecycle across
//! versions.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;

use super::store::CacheStore;
use super::traits::{Fetcher, Method, Request, Response, ResponseKind};

/// Fallback page for failed navigations to the single-post route.
const POST_PAGE: &str = "/post.html";
/// Fallback page for every other failed navigation.
const HOME_PAGE: &str = "/index.html";

/// Names of the two live cache generations for one version string.
/// Bumping the version is the invalidation mechanism: `activate`
/// deletes everything that matches neither name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationNames {
  pub static_name: String,
  pub dynamic_name: String,
}

impl GenerationNames {
  pub fn for_version(version: &str) -> Self {
    Self {
      static_name: format!("offpress-{}", version),
      dynamic_name: format!("offpress-dynamic-{}", version),
    }
  }
}

/// Cache controller with an injected store and network fetcher.
///
/// Lifecycle mirrors a background worker: `install` populates the
/// static generation from the asset manifest, `activate` prunes
/// superseded generations, and `handle` intercepts one GET at a time.
pub struct CacheController<S, F> {
  store: Arc<S>,
  fetcher: Arc<F>,
  names: GenerationNames,
  base_url: Url,
  precache: Vec<String>,
  content_json: String,
}

impl<S: CacheStore + 'static, F: Fetcher + 'static> CacheController<S, F> {
  pub fn new(store: S, fetcher: F, config: &Config) -> Result<Self> {
    Ok(Self {
      store: Arc::new(store),
      fetcher: Arc::new(fetcher),
      names: GenerationNames::for_version(&config.cache.version),
      base_url: config.base_url()?,
      precache: config.cache.precache.clone(),
      content_json: config.content_json_path(),
    })
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn names(&self) -> &GenerationNames {
    &self.names
  }

  /// Populate the static generation from the asset manifest.
  ///
  /// All-or-nothing: if any single asset fails to fetch or comes back
  /// with a non-200 status, the install fails and nothing is stored.
  pub async fn install(&self) -> Result<()> {
    let requests: Vec<Request> = self
      .precache
      .iter()
      .map(|path| {
        self
          .base_url
          .join(path)
          .map(Request::get)
          .map_err(|e| eyre!("Invalid precache path {}: {}", path, e))
      })
      .collect::<Result<_>>()?;

    let fetched: Vec<(Url, Response)> = try_join_all(requests.iter().map(|request| async move {
      let response = self.fetcher.fetch(request).await?;
      if response.status != 200 {
        return Err(eyre!(
          "Precache fetch for {} returned status {}",
          request.url,
          response.status
        ));
      }
      Ok((request.url.clone(), response))
    }))
    .await?;

    for (url, response) in &fetched {
      self.store.put(&self.names.static_name, url, response)?;
    }

    info!(
      "installed {} asset(s) into {}",
      fetched.len(),
      self.names.static_name
    );
    Ok(())
  }

  /// Delete every generation whose name is neither the current static
  /// nor the current dynamic name. Returns the pruned names.
  pub async fn activate(&self) -> Result<Vec<String>> {
    let mut pruned = Vec::new();

    for name in self.store.generations()? {
      if name != self.names.static_name && name != self.names.dynamic_name {
        info!("deleting old cache generation {}", name);
        self.store.delete_generation(&name)?;
        pruned.push(name);
      }
    }

    Ok(pruned)
  }

  /// Route one request through the cache decision table.
  ///
  /// Returns `None` when a subordinate resource can be neither fetched
  /// nor served from cache, which surfaces as a failed resource load.
  pub async fn handle(&self, request: &Request) -> Result<Option<Response>> {
    // Non-GET requests pass through untouched
    if request.method != Method::Get {
      return Ok(Some(self.fetcher.fetch(request).await?));
    }

    let is_document = request.is_document();

    // Cache lookup always precedes any network activity
    if let Some(cached) = self.store.lookup(&request.url, is_document)? {
      if request.url.path().ends_with(&self.content_json) {
        self.spawn_revalidate(request.clone());
      }
      return Ok(Some(cached));
    }

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        if response.status == 200 && response.kind != ResponseKind::Error {
          if let Err(e) = self
            .store
            .put(&self.names.dynamic_name, &request.url, &response)
          {
            warn!("failed to cache {}: {}", request.url, e);
          }
        }
        Ok(Some(response))
      }
      Err(e) => {
        if is_document {
          debug!("network failed for {} ({}), serving fallback", request.url, e);
          let page = if request.url.path().ends_with(POST_PAGE) {
            POST_PAGE
          } else {
            HOME_PAGE
          };
          let fallback = self
            .base_url
            .join(page)
            .map_err(|e| eyre!("Invalid fallback path {}: {}", page, e))?;
          Ok(self.store.lookup(&fallback, false)?)
        } else {
          debug!("network failed for {}: {}", request.url, e);
          Ok(None)
        }
      }
    }
  }

  /// Refresh the content artifact behind an already-returned cached
  /// response. Never blocks the caller; a failed fetch is dropped and
  /// the cached copy stands.
  fn spawn_revalidate(&self, request: Request) {
    let store = Arc::clone(&self.store);
    let fetcher = Arc::clone(&self.fetcher);
    let generation = self.names.dynamic_name.clone();

    tokio::spawn(async move {
      match fetcher.fetch(&request).await {
        Ok(response) if response.status == 200 => {
          if let Err(e) = store.put(&generation, &request.url, &response) {
            warn!("failed to refresh {}: {}", request.url, e);
          }
        }
        Ok(_) | Err(_) => {}
      }
    });
  }
}
