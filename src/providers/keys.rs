use log::warn;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;

/// Round-robin pool of API keys for one provider
#[derive(Debug)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    current: AtomicUsize,
}

impl ApiKeyPool {
    /// Create a pool; at least one key is required
    pub fn new(keys: Vec<String>) -> Result<Self, ProviderError> {
        if keys.is_empty() {
            return Err(ProviderError::AuthenticationError("no API keys configured".to_string()));
        }
        Ok(Self {
            keys,
            current: AtomicUsize::new(0),
        })
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false, a pool holds at least one key
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the key in use
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::SeqCst) % self.keys.len()
    }

    /// The key in use
    pub fn current(&self) -> &str {
        &self.keys[self.current_index()]
    }

    /// Switch to the next key and return it
    pub fn rotate(&self) -> &str {
        let next = (self.current.fetch_add(1, Ordering::SeqCst) + 1) % self.keys.len();
        warn!("Switching to API key {}/{}", next + 1, self.keys.len());
        &self.keys[next]
    }
}
