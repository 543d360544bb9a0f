//! Free-form key/value data attached to every entity.
//!
//! # Responsibility
//! - Hold the ordered string map stored in the `data` column.
//! - Keep structural fields (`id`, `owner`, `origin`, ...) out of the bag.
//! - Provide typed views with documented defaults.
//!
//! # Invariants
//! - Keys are never empty and never one of `RESERVED_KEYS`.
//! - Reserved keys found in stored rows are shadowed (dropped), not surfaced.

use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw ordered map as exchanged with the storage port.
pub type DataMap = BTreeMap<String, String>;

/// Keys owned by typed entity fields.
pub const RESERVED_KEYS: &[&str] = &["id", "name", "owner", "origin", "type"];

/// Key of the domain depth quota view.
pub const DEPTH_ALLOWED_KEY: &str = "depth_allowed";
/// Key of the domain self-registration view.
pub const USERS_CAN_REGISTER_KEY: &str = "users_can_register";

/// Data bag mutation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    EmptyKey,
    ReservedKey(String),
}

impl Display for AttributeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "data key must not be empty"),
            Self::ReservedKey(key) => write!(f, "data key is reserved: {key}"),
        }
    }
}

impl Error for AttributeError {}

/// Validated data bag. Serializes as a flat JSON object of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(DataMap);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from caller input, rejecting reserved or empty keys.
    pub fn try_from_map(map: DataMap) -> Result<Self, AttributeError> {
        for key in map.keys() {
            validate_key(key)?;
        }
        Ok(Self(map))
    }

    /// Builds a bag from a stored row, dropping keys that cannot live in it.
    pub(crate) fn from_stored(map: DataMap) -> Self {
        let mut clean = DataMap::new();
        for (key, value) in map {
            match validate_key(&key) {
                Ok(()) => {
                    clean.insert(key, value);
                }
                Err(err) => {
                    warn!("event=data_shadowed module=model status=skipped reason=\"{err}\"");
                }
            }
        }
        Self(clean)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Sets one value and returns the previous one.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, AttributeError> {
        let key = key.into();
        validate_key(&key)?;
        Ok(self.0.insert(key, value.into()))
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn as_map(&self) -> &DataMap {
        &self.0
    }

    /// Integer view; missing or unparsable values yield `default`.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(default)
    }

    /// Boolean view; missing or unrecognized values yield `default`.
    pub fn flag_or(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) => match value.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => default,
            },
            None => default,
        }
    }
}

fn validate_key(key: &str) -> Result<(), AttributeError> {
    if key.trim().is_empty() {
        return Err(AttributeError::EmptyKey);
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(AttributeError::ReservedKey(key.to_string()));
    }
    Ok(())
}
