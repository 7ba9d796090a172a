use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crux_kv::KeyValue;

use crate::event::Event;

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },
}

/// Validated storage key for the report cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        let invalid = |reason: &str| KvError::InvalidKey {
            key: key.chars().take(50).collect(),
            reason: reason.to_string(),
        };
        if key.trim().is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(invalid("key is too long"));
        }
        if key.contains('\0') {
            return Err(invalid("key cannot contain null bytes"));
        }
        Ok(Self(key))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn load(&self, kv: &KeyValue<Event>) {
        debug!(key = self.as_str(), "loading report cache");
        kv.get(self.0.clone(), |result| Event::CacheLoaded {
            result: result.map_err(|e| e.to_string()),
        });
    }

    pub fn persist(&self, kv: &KeyValue<Event>, bytes: Vec<u8>) -> Result<(), KvError> {
        if bytes.len() > MAX_VALUE_SIZE {
            warn!(size = bytes.len(), "report cache too large to persist");
            return Err(KvError::ValueTooLarge {
                size: bytes.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        kv.set(self.0.clone(), bytes, |result| Event::CachePersisted {
            result: result.map(|_| ()).map_err(|e| e.to_string()),
        });
        Ok(())
    }

    pub fn clear(&self, kv: &KeyValue<Event>) {
        kv.delete(self.0.clone(), |result| Event::CachePersisted {
            result: result.map(|_| ()).map_err(|e| e.to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key() {
        assert_eq!(CacheKey::new("crisisReports").unwrap().as_str(), "crisisReports");
    }

    #[test]
    fn test_invalid_keys() {
        assert!(CacheKey::new("").is_err());
        assert!(CacheKey::new("   ").is_err());
        assert!(CacheKey::new("a\0b").is_err());
        assert!(CacheKey::new("k".repeat(MAX_KEY_LENGTH + 1)).is_err());
    }
}
