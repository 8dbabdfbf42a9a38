mod cache;
mod config;
mod content;
mod net;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use url::Url;

use cache::{CacheController, Request, SqliteStore};
use content::select::{self, Month, PostQuery, SortKey};
use content::ContentKind;
use net::HttpFetcher;

#[derive(Parser, Debug)]
#[command(name = "offpress")]
#[command(about = "Offline-first static content site toolkit")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./offpress.yaml or $XDG_CONFIG_HOME/offpress/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Build the content artifact from the Markdown sources
  Generate {
    /// Override the content directory
    #[arg(long)]
    content_dir: Option<PathBuf>,
    /// Override the output path
    #[arg(long)]
    output: Option<PathBuf>,
  },
  /// Install the precache manifest and prune superseded generations
  Precache,
  /// Route one GET through the offline cache and print the body
  Fetch {
    /// URL to fetch (absolute, or a path resolved against site.base_url)
    url: String,
    /// Treat the request as a top-level navigation
    #[arg(long)]
    navigate: bool,
  },
  /// List records from the generated artifact
  Posts {
    /// Content kind to list
    #[arg(long, default_value = "blog")]
    kind: ContentKind,
    /// Keep only records carrying this tag
    #[arg(long)]
    tag: Option<String>,
    /// Keep only records from this month (YYYY-MM)
    #[arg(long)]
    month: Option<Month>,
    /// Sort order: date-desc, date-asc, title-asc, title-desc
    #[arg(long, default_value = "date-desc")]
    sort: SortKey,
    /// Show a single record by slug instead of a list
    #[arg(long)]
    slug: Option<String>,
    /// List the available tag and month filter values instead
    #[arg(long)]
    filters: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  match args.command {
    Command::Generate { content_dir, output } => {
      let dir = content_dir.unwrap_or_else(|| config.content.dir.clone());
      let out = output.unwrap_or_else(|| config.content.output.clone());
      content::generate(&dir, &out)?;
    }

    Command::Precache => {
      let controller = controller(&config)?;
      controller.install().await?;
      let pruned = controller.activate().await?;
      if !pruned.is_empty() {
        info!("pruned {} old generation(s)", pruned.len());
      }
    }

    Command::Fetch { url, navigate } => {
      let controller = controller(&config)?;
      let target = resolve_url(&config, &url)?;
      let request = if navigate {
        Request::navigation(target)
      } else {
        Request::get(target)
      };

      match controller.handle(&request).await? {
        Some(response) => {
          info!("{} {}", response.status, request.url);
          std::io::stdout().write_all(&response.body)?;
        }
        None => return Err(eyre!("Resource unavailable offline: {}", request.url)),
      }
    }

    Command::Posts {
      kind,
      tag,
      month,
      sort,
      slug,
      filters,
    } => {
      let raw = std::fs::read(&config.content.output).unwrap_or_default();
      let records = select::parse_records(&raw);

      if filters {
        let visible = select::visible(&records, kind);
        println!("tags: {}", select::tag_options(&visible).join(", "));
        let months: Vec<String> = select::month_options(&visible)
          .iter()
          .map(Month::to_string)
          .collect();
        println!("months: {}", months.join(", "));
        return Ok(());
      }

      // Single-post lookup searches every record, like the post page
      if let Some(slug) = slug {
        match select::find_by_slug(&records, &slug) {
          Some(record) => {
            println!("{} ({})", record.title, record.date);
            if !record.tags.is_empty() {
              println!("tags: {}", record.tags.join(", "));
            }
            println!();
            println!("{}", record.content_html);
          }
          None => println!("Post not found."),
        }
        return Ok(());
      }

      let visible = select::visible(&records, kind);
      let query = PostQuery { tag, month, sort };
      let selected = select::select_and_order(&visible, &query);

      if selected.is_empty() {
        println!("No posts found.");
      } else {
        for record in &selected {
          println!("{}  {}  [{}]", record.date, record.title, record.slug);
        }
      }
    }
  }

  Ok(())
}

fn controller(config: &config::Config) -> Result<CacheController<SqliteStore, HttpFetcher>> {
  let store = SqliteStore::open()?;
  let fetcher = HttpFetcher::new()?;
  CacheController::new(store, fetcher, config)
}

/// Accept either an absolute URL or a site-relative path.
fn resolve_url(config: &config::Config, raw: &str) -> Result<Url> {
  match Url::parse(raw) {
    Ok(url) => Ok(url),
    Err(_) => config
      .base_url()?
      .join(raw)
      .map_err(|e| eyre!("Invalid URL {}: {}", raw, e)),
  }
}
