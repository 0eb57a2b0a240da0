//! Widget asset discovery and relay.
//!
//! The widget bundle is built and hosted elsewhere with content-hashed
//! filenames. Its index page is the only stable entry point, so the
//! resolver reads the index, picks out the script and stylesheet names,
//! and relays their bytes under the fixed paths `/widget.js` and
//! `/widget.css`.
//!
//! # Expected Markup
//!
//! The index must reference the bundle with root-relative paths:
//!
//! ```html
//! <script type="module" src="/index-3f9a1c.js"></script>
//! <link rel="stylesheet" href="/index-77b0e2.css">
//! ```
//!
//! Unhashed names (`/index.js`) match as well. Anything else is invisible
//! to discovery.
//!
//! # Caching
//!
//! Discovered names are kept until the TTL elapses and both names are known.
//! A failed discovery keeps whatever was cached before; a failed relay is
//! never cached.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tokio::sync::Mutex;

use crate::error::AssetError;

/// Default time a discovered filename stays fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default timeout for requests to the widget origin.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static JS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src="/([\w-]+(?:-[0-9a-fA-F]+)?\.js)""#).expect("valid JS asset regex")
});

static CSS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="/([\w-]+(?:-[0-9a-fA-F]+)?\.css)""#).expect("valid CSS asset regex")
});

/// The two asset classes served by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// The widget script.
    Js,
    /// The widget stylesheet.
    Css,
}

impl AssetKind {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }

    /// `Content-Type` of the relayed asset.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Js => "application/javascript",
            Self::Css => "text/css",
        }
    }

    /// Placeholder body for an asset that has never been discovered.
    #[must_use]
    pub const fn not_found_body(self) -> &'static str {
        match self {
            Self::Js => "// Widget script not found\n",
            Self::Css => "/* Widget stylesheet not found */\n",
        }
    }

    /// Placeholder body for a failed upstream fetch.
    #[must_use]
    pub const fn error_body(self) -> &'static str {
        match self {
            Self::Js => "// Error loading widget script\n",
            Self::Css => "/* Error loading widget stylesheet */\n",
        }
    }
}

/// Filenames found in one index document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFiles {
    /// Script filename, if the index referenced one.
    pub js: Option<String>,
    /// Stylesheet filename, if the index referenced one.
    pub css: Option<String>,
}

/// Extracts the bundle filenames from an index document.
#[must_use]
pub fn extract_filenames(html: &str) -> DiscoveredFiles {
    let capture = |re: &Regex| {
        re.captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    DiscoveredFiles {
        js: capture(&JS_PATTERN),
        css: capture(&CSS_PATTERN),
    }
}

#[derive(Debug, Default)]
struct WidgetFileCache {
    js: Option<String>,
    css: Option<String>,
    last_fetch: Option<Instant>,
}

impl WidgetFileCache {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.js.is_some()
            && self.css.is_some()
            && self.last_fetch.is_some_and(|at| at.elapsed() < ttl)
    }

    fn filename(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Js => self.js.as_deref(),
            AssetKind::Css => self.css.as_deref(),
        }
    }
}

/// Discovers and relays widget assets from a remote origin.
#[derive(Debug)]
pub struct WidgetAssetResolver {
    client: reqwest::Client,
    origin: Option<String>,
    ttl: Duration,
    cache: Mutex<WidgetFileCache>,
}

impl WidgetAssetResolver {
    /// Creates a resolver for `origin`.
    ///
    /// With no origin every asset request answers "not found".
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        origin: Option<&str>,
        ttl: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            origin: origin.map(|o| o.trim_end_matches('/').to_string()),
            ttl,
            cache: Mutex::new(WidgetFileCache::default()),
        })
    }

    /// Returns the filename for `kind`, rediscovering when stale.
    ///
    /// A failed rediscovery keeps serving the cached name. It is only an
    /// error when there is no name to fall back on.
    async fn filename(
        &self,
        origin: &str,
        kind: AssetKind,
    ) -> Result<Option<String>, AssetError> {
        // Held across the fetch so a cold cache triggers one discovery.
        let mut cache = self.cache.lock().await;
        if !cache.is_fresh(self.ttl) {
            match self.discover(origin).await {
                Ok(found) => {
                    tracing::debug!(js = ?found.js, css = ?found.css, "Discovered widget files");
                    if found.js.is_some() {
                        cache.js = found.js;
                    }
                    if found.css.is_some() {
                        cache.css = found.css;
                    }
                    cache.last_fetch = Some(Instant::now());
                }
                Err(e) if cache.filename(kind).is_some() => {
                    tracing::warn!(error = %e, "Widget file discovery failed; keeping cached names");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(cache.filename(kind).map(str::to_string))
    }

    /// Fetches the bytes of the current `kind` asset.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotDiscovered`] if there is no origin or the
    /// index does not reference the asset, or an upstream error if
    /// discovery or the relay fetch fails.
    pub async fn fetch(&self, kind: AssetKind) -> Result<Vec<u8>, AssetError> {
        let not_discovered = || AssetError::NotDiscovered { kind: kind.name() };
        let origin = self.origin.as_deref().ok_or_else(not_discovered)?;
        let filename = self
            .filename(origin, kind)
            .await?
            .ok_or_else(not_discovered)?;

        let url = format!("{origin}/{filename}");
        let bytes = self.get(&url).await?.bytes().await.map_err(|source| {
            AssetError::Upstream {
                url: url.clone(),
                source,
            }
        })?;
        Ok(bytes.to_vec())
    }

    /// Serves `kind` as an HTTP response.
    pub async fn serve(&self, kind: AssetKind) -> Response {
        match self.fetch(kind).await {
            Ok(bytes) => asset_response(StatusCode::OK, kind, bytes),
            Err(AssetError::NotDiscovered { .. }) => {
                tracing::debug!(kind = kind.name(), "Widget asset not discovered");
                asset_response(StatusCode::NOT_FOUND, kind, kind.not_found_body())
            }
            Err(e) => {
                tracing::error!(kind = kind.name(), error = %e, "Failed to relay widget asset");
                asset_response(StatusCode::INTERNAL_SERVER_ERROR, kind, kind.error_body())
            }
        }
    }

    async fn discover(&self, origin: &str) -> Result<DiscoveredFiles, AssetError> {
        let url = format!("{origin}/");
        let html = self
            .get(&url)
            .await?
            .text()
            .await
            .map_err(|source| AssetError::Upstream { url, source })?;
        Ok(extract_filenames(&html))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, AssetError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| AssetError::Upstream {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn asset_response(status: StatusCode, kind: AssetKind, body: impl Into<axum::body::Body>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, kind.content_type())],
        body.into(),
    )
        .into_response()
}
