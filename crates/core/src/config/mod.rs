//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LAZARUS_*)
//! 2. TOML config file (if LAZARUS_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is immutable and handed to the router, the
//! orchestrator and both adapters at startup.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "LAZARUS_CONFIG_FILE";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "LAZARUS_";

/// When the headless browser considers navigation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitCondition {
    DomContentLoaded,
    Load,
    NetworkIdle,
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaitCondition::DomContentLoaded => "domcontentloaded",
            WaitCondition::Load => "load",
            WaitCondition::NetworkIdle => "networkidle",
        };
        f.write_str(s)
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LAZARUS_*)
/// 2. TOML config file (if LAZARUS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface to listen on.
    ///
    /// Set via LAZARUS_HOST environment variable.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port.
    ///
    /// Set via LAZARUS_PORT environment variable.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Canonical serving domain, used in `<link rel="canonical">`.
    ///
    /// Set via LAZARUS_DOMAIN environment variable.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Serve only local files and cache; never contact upstream.
    ///
    /// Set via LAZARUS_STATIC_ONLY environment variable.
    #[serde(default)]
    pub static_only: bool,

    /// Whether cache misses may be fetched from upstream.
    ///
    /// Set via LAZARUS_ALLOW_REMOTE_FETCH environment variable.
    #[serde(default = "default_true")]
    pub allow_remote_fetch: bool,

    /// Directory of hashed cache entries.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory mirroring the public path tree.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Directory holding `sitemap.xml` and `robots.txt`.
    #[serde(default = "default_seo_dir")]
    pub seo_dir: PathBuf,

    /// Host of the defunct site being mirrored.
    #[serde(default = "default_origin_host")]
    pub origin_host: String,

    /// Live host still serving the original content.
    #[serde(default = "default_mirror_host")]
    pub mirror_host: String,

    /// Asset host that every CDN reference is pointed at.
    #[serde(default = "default_asset_host")]
    pub asset_host: String,

    /// CDN hosts that no longer resolve and are rewritten to `asset_host`.
    ///
    /// Set via LAZARUS_LEGACY_ASSET_HOSTS as a TOML array, e.g. `[a.com, b.com]`.
    #[serde(default = "default_legacy_asset_hosts")]
    pub legacy_asset_hosts: Vec<String>,

    /// Host of the web archive serving snapshots.
    #[serde(default = "default_archive_host")]
    pub archive_host: String,

    /// Title used in the empty-shell fallback when the page has none.
    #[serde(default = "default_fallback_title")]
    pub fallback_title: String,

    /// Capture timestamp of the archive snapshot (14 digits).
    #[serde(default = "default_snapshot_timestamp")]
    pub snapshot_timestamp: String,

    /// Snapshot URL template with `{timestamp}` and `{url}` placeholders.
    #[serde(default = "default_archive_url_template")]
    pub archive_url_template: String,

    /// Archive request timeout in milliseconds.
    #[serde(default = "default_archive_timeout_ms")]
    pub archive_timeout_ms: u64,

    /// Skip TLS certificate verification for archive requests.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// User-Agent string for archive requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum archive response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Whether the headless renderer should be launched at startup.
    ///
    /// Set via LAZARUS_RENDER_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub render_enabled: bool,

    /// Navigation wait condition for the headless renderer.
    #[serde(default = "default_wait_until")]
    pub render_wait_until: WaitCondition,

    /// Hard navigation timeout in milliseconds.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Settle delay after navigation, in milliseconds.
    #[serde(default = "default_render_post_wait_ms")]
    pub render_post_wait_ms: u64,

    /// Upper bound on waiting for CSS-in-JS style tags, in milliseconds. 0 disables.
    #[serde(default = "default_render_style_wait_ms")]
    pub render_style_wait_ms: u64,

    /// Minimum serialized size for a rendered document to count as a page.
    #[serde(default = "default_render_min_bytes")]
    pub render_min_bytes: usize,

    /// Explicit Chrome/Chromium binary; autodetected when unset.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Join concurrent cold requests for the same path onto one upstream fetch.
    #[serde(default = "default_true")]
    pub dedupe_fetches: bool,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8000
}

fn default_domain() -> String {
    "localhost:8000".into()
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static_pages")
}

fn default_seo_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_origin_host() -> String {
    "hero.page".into()
}

fn default_mirror_host() -> String {
    "quibey.com".into()
}

fn default_asset_host() -> String {
    "cdn-2.quibey.com".into()
}

fn default_legacy_asset_hosts() -> Vec<String> {
    vec!["cdn-2.hero.com".into(), "cdn.hero.page".into()]
}

fn default_archive_host() -> String {
    "web.archive.org".into()
}

fn default_fallback_title() -> String {
    "Hero Page".into()
}

fn default_snapshot_timestamp() -> String {
    "20240419175536".into()
}

fn default_archive_url_template() -> String {
    "https://web.archive.org/web/{timestamp}id_/{url}".into()
}

fn default_archive_timeout_ms() -> u64 {
    45_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)".into()
}

fn default_max_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_wait_until() -> WaitCondition {
    WaitCondition::DomContentLoaded
}

fn default_render_timeout_ms() -> u64 {
    60_000
}

fn default_render_post_wait_ms() -> u64 {
    1_500
}

fn default_render_style_wait_ms() -> u64 {
    5_000
}

fn default_render_min_bytes() -> usize {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            domain: default_domain(),
            static_only: false,
            allow_remote_fetch: true,
            cache_dir: default_cache_dir(),
            static_dir: default_static_dir(),
            seo_dir: default_seo_dir(),
            origin_host: default_origin_host(),
            mirror_host: default_mirror_host(),
            asset_host: default_asset_host(),
            legacy_asset_hosts: default_legacy_asset_hosts(),
            archive_host: default_archive_host(),
            fallback_title: default_fallback_title(),
            snapshot_timestamp: default_snapshot_timestamp(),
            archive_url_template: default_archive_url_template(),
            archive_timeout_ms: default_archive_timeout_ms(),
            accept_invalid_certs: false,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            render_enabled: true,
            render_wait_until: default_wait_until(),
            render_timeout_ms: default_render_timeout_ms(),
            render_post_wait_ms: default_render_post_wait_ms(),
            render_style_wait_ms: default_render_style_wait_ms(),
            render_min_bytes: default_render_min_bytes(),
            chrome_executable: None,
            dedupe_fetches: true,
        }
    }
}

impl AppConfig {
    /// Whether cache misses may go upstream. Static-only mode always wins.
    pub fn remote_fetch_enabled(&self) -> bool {
        !self.static_only && self.allow_remote_fetch
    }

    /// Address the HTTP front end binds to.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self.host.parse().map_err(|_| ConfigError::Invalid {
            field: "host".into(),
            reason: format!("not an IP address: {}", self.host),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn post_wait(&self) -> Duration {
        Duration::from_millis(self.render_post_wait_ms)
    }

    pub fn style_wait(&self) -> Duration {
        Duration::from_millis(self.render_style_wait_ms)
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_millis(self.archive_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LAZARUS_`
    /// 2. TOML file from `LAZARUS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack, exposed so tests can extend it.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a configuration from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` on extraction errors and
    /// `ConfigError::Invalid` when validation rejects a value.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
