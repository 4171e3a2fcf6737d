use crate::config::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
///
/// Checks that at least one site is configured, that every base URL is an
/// absolute HTTP(S) URL with a host, and that the chunking parameters are
/// internally consistent (`min <= size`, `overlap < size`).
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] entry is required".to_string(),
        ));
    }

    for site in &config.sites {
        if site.code.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site code must not be empty".to_string(),
            ));
        }
        let parsed = Url::parse(&site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", site.base_url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: only HTTP and HTTPS base URLs are supported",
                site.base_url
            )));
        }
        if parsed.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: missing host",
                site.base_url
            )));
        }
    }

    if config.scrape.rate_limit_seconds < 0.0 {
        return Err(ConfigError::Validation(
            "rate-limit-seconds must not be negative".to_string(),
        ));
    }
    if config.scrape.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent must not be empty".to_string(),
        ));
    }

    let chunking = &config.chunking;
    if chunking.size_chars == 0 {
        return Err(ConfigError::Validation(
            "size-chars must be positive".to_string(),
        ));
    }
    if chunking.min_chars > chunking.size_chars {
        return Err(ConfigError::Validation(format!(
            "min-chars ({}) must not exceed size-chars ({})",
            chunking.min_chars, chunking.size_chars
        )));
    }
    if chunking.overlap_chars >= chunking.size_chars {
        return Err(ConfigError::Validation(format!(
            "overlap-chars ({}) must be smaller than size-chars ({})",
            chunking.overlap_chars, chunking.size_chars
        )));
    }

    Ok(())
}
