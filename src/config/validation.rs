use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, PolitenessConfig, ProxyConfig, SearchConfig,
    SessionConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_politeness_config(&config.politeness)?;
    validate_session_config(&config.sessions)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    for raw in config.start_urls.iter().chain(config.start_url.iter()) {
        validate_http_url(raw, "start URL")?;
    }
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 32, got {}",
            config.max_concurrency
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_http_url(&config.base_url, "base_url")?;

    Ok(())
}

fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.listing_requests_per_minute < 1 || config.detail_requests_per_minute < 1 {
        return Err(ConfigError::Validation(
            "requests-per-minute ceilings must be >= 1".to_string(),
        ));
    }

    for (name, [min, max]) in [
        ("listing_delay_ms", config.listing_delay_ms),
        ("detail_delay_ms", config.detail_delay_ms),
    ] {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "{} range is inverted: [{}, {}]",
                name, min, max
            )));
        }
    }

    if config.backoff_base_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_base_ms ({}) exceeds backoff_max_ms ({})",
            config.backoff_base_ms, config.backoff_max_ms
        )));
    }

    Ok(())
}

fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 {
        return Err(ConfigError::Validation(format!(
            "pool_size must be >= 1, got {}",
            config.pool_size
        )));
    }

    if config.max_usage < 1 || config.max_errors < 1 || config.ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "session max_usage, max_errors and ttl_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy url: {}", e)))?;

    if config.password.is_some() && config.username.is_none() {
        return Err(ConfigError::Validation(
            "proxy password given without a username".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.jsonl_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "jsonl_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Parses a URL and requires an HTTP(S) scheme
fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            what, raw
        )));
    }

    Ok(())
}
