//! Construction descriptors for receivers and transformers.
//!
//! Components are configured by connection-string-like URIs, e.g.
//! `github://?secret=s33kret&ref=refs/heads/main`. The scheme selects the
//! component (see [`crate::registry`]); the query parameters configure it.
//!
//! Descriptors are parsed and validated exactly once, at construction time.
//! Unrecognized parameters and unparsable booleans are construction-time
//! errors, never deferred to request time.

use thiserror::Error;
use url::Url;

/// Errors produced while parsing or validating a descriptor.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The descriptor is not a valid URI.
    #[error("invalid descriptor URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// A boolean parameter did not parse as `true` or `false`.
    #[error("invalid boolean value '{value}' for parameter '{key}'")]
    InvalidBool { key: String, value: String },

    /// A parameter is not recognized by the component being constructed.
    #[error("unrecognized parameter '{key}'")]
    UnknownKey { key: String },

    /// No component is registered for the descriptor's scheme.
    #[error("unrecognized scheme '{scheme}'")]
    UnknownScheme { scheme: String },
}

/// A parsed component descriptor: a scheme plus query parameters.
#[derive(Debug, Clone)]
pub struct Descriptor {
    scheme: String,
    params: Vec<(String, String)>,
}

impl Descriptor {
    /// Parses a descriptor URI.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(uri)?;
        let params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Descriptor {
            scheme: url.scheme().to_string(),
            params,
        })
    }

    /// The descriptor's scheme, e.g. `github`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the first value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first non-empty value for `key`, if any.
    ///
    /// An empty value (`?key=` or `?key`) is treated the same as an absent
    /// parameter.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Parses a boolean flag parameter.
    ///
    /// Absent and empty values are `false`. Present values must be the
    /// literal `true` or `false`; anything else is a construction-time
    /// error.
    pub fn bool_flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get_non_empty(key) {
            None => Ok(false),
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidBool {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Rejects any parameter whose key is not in `allowed`.
    ///
    /// Unknown keys are an error rather than silently ignored, so a typo in
    /// a deployment config fails at startup instead of quietly changing
    /// behavior.
    pub fn check_keys(&self, allowed: &[&str]) -> Result<(), ConfigError> {
        for (key, _) in &self.params {
            if !allowed.contains(&key.as_str()) {
                return Err(ConfigError::UnknownKey { key: key.clone() });
            }
        }
        Ok(())
    }
}
