//! Provider configuration.
//!
//! # Responsibility
//! - Hold the authority, content-kind strings, schema version and store
//!   location a provider is built from.
//! - Apply environment overrides for host processes and the CLI.
//!
//! # Invariants
//! - A validated config has a non-empty authority of `[A-Za-z0-9._-]`
//!   characters and a schema version of at least 1.

use crate::db::schema::DEFAULT_SCHEMA_VERSION;
use crate::db::StoreLocation;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_AUTHORITY: &str = "bookprovider.books";
pub const DEFAULT_DATABASE_NAME: &str = "books.db";
pub const COLLECTION_CONTENT_TYPE: &str = "vnd.cursor.dir/vnd.bookprovider.book";
pub const ITEM_CONTENT_TYPE: &str = "vnd.cursor.item/vnd.bookprovider.book";

pub const ENV_AUTHORITY: &str = "BOOKPROVIDER_AUTHORITY";
pub const ENV_DB_PATH: &str = "BOOKPROVIDER_DB_PATH";
pub const ENV_DB_VERSION: &str = "BOOKPROVIDER_DB_VERSION";

static AUTHORITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid authority regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidAuthority(String),
    InvalidSchemaVersion(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAuthority(value) => write!(f, "invalid provider authority `{value}`"),
            Self::InvalidSchemaVersion(value) => {
                write!(f, "invalid schema version `{value}`; expected an integer >= 1")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub authority: String,
    pub collection_content_type: String,
    pub item_content_type: String,
    pub schema_version: u32,
    pub location: StoreLocation,
}

impl Default for ProviderConfig {
    /// `books.db` in the system temp directory, schema version 1.
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            collection_content_type: COLLECTION_CONTENT_TYPE.to_string(),
            item_content_type: ITEM_CONTENT_TYPE.to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION,
            location: StoreLocation::File(std::env::temp_dir().join(DEFAULT_DATABASE_NAME)),
        }
    }
}

impl ProviderConfig {
    /// Default config backed by a private in-memory store.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            ..Self::default()
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_location(mut self, location: StoreLocation) -> Self {
        self.location = location;
        self
    }

    /// Defaults overlaid with `BOOKPROVIDER_*` environment variables.
    ///
    /// Blank variables are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(authority) = non_blank(ENV_AUTHORITY) {
            config.authority = authority;
        }
        if let Some(path) = non_blank(ENV_DB_PATH) {
            config.location = StoreLocation::File(PathBuf::from(path));
        }
        if let Some(version) = non_blank(ENV_DB_VERSION) {
            config.schema_version = version
                .parse()
                .map_err(|_| ConfigError::InvalidSchemaVersion(version.clone()))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !AUTHORITY_RE.is_match(&self.authority) {
            return Err(ConfigError::InvalidAuthority(self.authority.clone()));
        }
        if self.schema_version == 0 {
            return Err(ConfigError::InvalidSchemaVersion(
                self.schema_version.to_string(),
            ));
        }
        Ok(())
    }
}
