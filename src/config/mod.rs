//! Configuration module for Vacancy-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; an empty file runs the default hh.ru search.
//!
//! # Example
//!
//! ```no_run
//! use vacancy_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting up to {} vacancies", config.crawler.target);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, PolitenessConfig, ProxyConfig, SearchConfig,
    SessionConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, resolve_seed_urls,
};
pub use validation::validate;
