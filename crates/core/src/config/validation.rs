//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;
const MAX_BYTES_LIMIT: usize = 50 * 1024 * 1024;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value < MIN_TIMEOUT_MS {
        return Err(invalid(field, "must be at least 100ms"));
    }
    if value > MAX_TIMEOUT_MS {
        return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
    }
    Ok(())
}

fn check_host(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value.contains("://") || value.contains('/') {
        return Err(invalid(field, "must be a bare host without scheme or path"));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `port` is 0
    /// - `domain` or any host is empty or carries a scheme/path
    /// - a timeout is under 100ms or over 5 minutes
    /// - the style wait or post-load delay exceeds the render timeout
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - the archive template lacks `{timestamp}` or `{url}`
    /// - `snapshot_timestamp` is not all digits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid("port", "must be greater than 0"));
        }

        check_host("domain", &self.domain)?;
        check_host("origin_host", &self.origin_host)?;
        check_host("mirror_host", &self.mirror_host)?;
        check_host("asset_host", &self.asset_host)?;
        check_host("archive_host", &self.archive_host)?;
        for host in &self.legacy_asset_hosts {
            check_host("legacy_asset_hosts", host)?;
        }

        check_timeout("render_timeout_ms", self.render_timeout_ms)?;
        check_timeout("archive_timeout_ms", self.archive_timeout_ms)?;

        if self.render_style_wait_ms > self.render_timeout_ms {
            return Err(invalid("render_style_wait_ms", "must not exceed render_timeout_ms"));
        }
        if self.render_post_wait_ms > self.render_timeout_ms {
            return Err(invalid("render_post_wait_ms", "must not exceed render_timeout_ms"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > MAX_BYTES_LIMIT {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if !self.archive_url_template.contains("{timestamp}") || !self.archive_url_template.contains("{url}") {
            return Err(invalid("archive_url_template", "must contain {timestamp} and {url}"));
        }

        if self.snapshot_timestamp.is_empty() || !self.snapshot_timestamp.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("snapshot_timestamp", "must be a non-empty string of digits"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.static_only && self.allow_remote_fetch {
            tracing::debug!("static_only is set; allow_remote_fetch is ignored");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_port_zero() {
        let config = AppConfig { port: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("port"));
    }

    #[test]
    fn test_validate_domain_with_scheme() {
        let config = AppConfig { domain: "https://hero.page".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("domain"));
    }

    #[test]
    fn test_validate_empty_mirror_host() {
        let config = AppConfig { mirror_host: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("mirror_host"));
    }

    #[test]
    fn test_validate_render_timeout_bounds() {
        let config = AppConfig { render_timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("render_timeout_ms"));

        let config = AppConfig { render_timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("render_timeout_ms"));
    }

    #[test]
    fn test_validate_style_wait_exceeds_timeout() {
        let config = AppConfig { render_timeout_ms: 1_000, render_post_wait_ms: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("render_style_wait_ms"));
    }

    #[test]
    fn test_validate_style_wait_zero_is_allowed() {
        let config = AppConfig { render_style_wait_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));

        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_archive_template() {
        let config = AppConfig { archive_url_template: "https://web.archive.org/web/{url}".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("archive_url_template"));
    }

    #[test]
    fn test_validate_snapshot_timestamp() {
        let config = AppConfig { snapshot_timestamp: "2024-04-19".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("snapshot_timestamp"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            render_timeout_ms: 100,
            render_post_wait_ms: 100,
            render_style_wait_ms: 100,
            archive_timeout_ms: 300_000,
            max_bytes: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
