//! Core request/response model and the injected network seam.

use async_trait::async_trait;
use color_eyre::Result;
use url::Url;

/// Method of an intercepted request. Only GET participates in caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

/// How a request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  /// Top-level navigation
  Navigate,
  SameOrigin,
  NoCors,
  Cors,
}

/// What the requested resource will be used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
  Document,
  Script,
  Style,
  Image,
  Font,
  Manifest,
  /// Plain data fetches
  Empty,
}

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub mode: RequestMode,
  pub destination: Destination,
}

impl Request {
  /// A subresource GET (scripts, styles, data fetches).
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
      mode: RequestMode::NoCors,
      destination: Destination::Empty,
    }
  }

  /// A top-level navigation to a page.
  pub fn navigation(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
      mode: RequestMode::Navigate,
      destination: Destination::Document,
    }
  }

  /// Document requests match the cache ignoring the query string and
  /// fall back to a cached page when the network is down.
  pub fn is_document(&self) -> bool {
    self.mode == RequestMode::Navigate || self.destination == Destination::Document
  }
}

/// Classification of a response, deciding whether it may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
  Basic,
  Opaque,
  Error,
}

impl ResponseKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseKind::Basic => "basic",
      ResponseKind::Opaque => "opaque",
      ResponseKind::Error => "error",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(ResponseKind::Basic),
      "opaque" => Some(ResponseKind::Opaque),
      "error" => Some(ResponseKind::Error),
      _ => None,
    }
  }
}

/// A response body plus the headers and status it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  pub status: u16,
  pub kind: ResponseKind,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      kind: ResponseKind::Basic,
      headers: Vec::new(),
      body: body.into(),
    }
  }
}

/// Network seam. The controller never talks to the network directly,
/// so tests can substitute a scripted fetcher.
#[async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response>;
}
