use crate::config::types::Config;
use crate::config::validation::validate;
use crate::url::build_search_url;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use url::Url;

/// Loads and parses a configuration file from the given path
///
/// Counts such as `target` and `page-budget` are clamped to a minimum of 1
/// while deserializing; everything else is validated afterwards.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use vacancy_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Target: {}", config.crawler.target);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Stored with each run so harvested records can be traced back to the
/// settings that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

/// Resolves the listing URLs a run starts from
///
/// Explicit `start-urls` come first, then `start-url`. Only when neither is
/// given is a search URL built from the search parameters.
pub fn resolve_seed_urls(config: &Config) -> Result<Vec<Url>, ConfigError> {
    let mut seeds = Vec::new();

    let explicit = config
        .search
        .start_urls
        .iter()
        .chain(config.search.start_url.iter());

    for raw in explicit {
        let url = Url::parse(raw.trim())
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", raw, e)))?;
        seeds.push(url);
    }

    if seeds.is_empty() {
        let url = build_search_url(&config.crawler.base_url, &config.search).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Cannot build search URL from '{}': {}",
                config.crawler.base_url, e
            ))
        })?;
        seeds.push(url);
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[search]
text = "rust developer"
area = "2"

[crawler]
target = 25
page-budget = 3
collect-details = false
max-concurrency = 8

[sessions]
pool-size = 4

[output]
database-path = "./test.db"
jsonl-path = "./records.jsonl"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.search.text, "rust developer");
        assert_eq!(config.crawler.target, 25);
        assert_eq!(config.crawler.page_budget, 3);
        assert!(!config.crawler.collect_details);
        assert_eq!(config.crawler.max_concurrency, 8);
        assert_eq!(config.sessions.pool_size, 4);
        assert_eq!(config.output.jsonl_path.as_deref(), Some("./records.jsonl"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.crawler.target, 100);
        assert_eq!(config.crawler.page_budget, 999);
        assert!(config.crawler.collect_details);
        assert_eq!(config.search.area, "1");
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_zero_target_is_clamped() {
        let config = parse_config("[crawler]\ntarget = 0\npage-budget = -5\n").unwrap();
        assert_eq!(config.crawler.target, 1);
        assert_eq!(config.crawler.page_budget, 1);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\nmax-concurrency = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_load_config_with_hash_matches_file_hash() {
        let file = create_temp_config("[crawler]\ntarget = 5\n");
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.crawler.target, 5);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }

    #[test]
    fn test_seed_urls_from_search_parameters() {
        let config = parse_config("[search]\ntext = \"rust\"\nschedule = \"remote\"\n").unwrap();
        let seeds = resolve_seed_urls(&config).unwrap();

        assert_eq!(seeds.len(), 1);
        let seed = &seeds[0];
        assert_eq!(seed.path(), "/search/vacancy");
        let query: Vec<(String, String)> = seed.query_pairs().into_owned().collect();
        assert!(query.contains(&("text".to_string(), "rust".to_string())));
        assert!(query.contains(&("area".to_string(), "1".to_string())));
        assert!(query.contains(&("schedule".to_string(), "remote".to_string())));
    }

    #[test]
    fn test_explicit_seeds_take_precedence() {
        let config = parse_config(
            r#"
[search]
text = "ignored"
start-urls = ["https://hh.ru/search/vacancy?text=a", "https://hh.ru/search/vacancy?text=b"]
start-url = "https://hh.ru/search/vacancy?text=c"
"#,
        )
        .unwrap();

        let seeds = resolve_seed_urls(&config).unwrap();
        assert_eq!(seeds.len(), 3);
        assert!(seeds[2].as_str().ends_with("text=c"));
    }

    #[test]
    fn test_url_key_is_a_seed() {
        let config = parse_config(
            r#"
[search]
text = "ignored"
url = "https://hh.ru/search/vacancy?text=go"
"#,
        )
        .unwrap();

        let seeds = resolve_seed_urls(&config).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].as_str(), "https://hh.ru/search/vacancy?text=go");
    }
}
