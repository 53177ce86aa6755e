use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::AppError;

/// Round-robin pool of API keys shared by concurrent requests.
#[derive(Debug)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>) -> Result<Self, AppError> {
        if keys.is_empty() {
            return Err(AppError::Config(
                "credential pool needs at least one API key".to_string(),
            ));
        }
        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn next_key(&self) -> &str {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[idx]
    }
}
