// src/pairing.rs

use crate::error::ScanError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory registry of active pairing codes and the photos a paired
/// phone has ferried over so far. Photos keep their arrival order; the
/// capture boundary treats them exactly like local file uploads.
#[derive(Debug, Clone, Default)]
pub struct PairingRegistry {
    inner: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl PairingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh pairing code with an empty photo buffer.
    pub fn create(&self) -> String {
        let code = Uuid::new_v4().to_string();
        self.inner
            .lock()
            .expect("pairing registry lock")
            .insert(code.clone(), Vec::new());
        code
    }

    /// The link the desktop renders as a QR for the phone to open.
    pub fn link(base_url: &str, code: &str) -> String {
        format!("{}/mobile?code={}", base_url.trim_end_matches('/'), code)
    }

    /// Append a photo ferried from the phone. Returns the buffer size so
    /// the phone can show progress.
    pub fn push_image(&self, code: &str, data_uri: String) -> Result<usize, ScanError> {
        let mut inner = self.inner.lock().expect("pairing registry lock");
        let buffer = inner
            .get_mut(code)
            .ok_or_else(|| ScanError::UnknownPairingCode(code.to_string()))?;
        buffer.push(data_uri);
        Ok(buffer.len())
    }

    /// How many photos are waiting for the desktop to scan.
    pub fn pending(&self, code: &str) -> Result<usize, ScanError> {
        let inner = self.inner.lock().expect("pairing registry lock");
        inner
            .get(code)
            .map(|b| b.len())
            .ok_or_else(|| ScanError::UnknownPairingCode(code.to_string()))
    }

    /// Take every buffered photo, in arrival order, leaving the code
    /// active for further captures.
    pub fn drain(&self, code: &str) -> Result<Vec<String>, ScanError> {
        let mut inner = self.inner.lock().expect("pairing registry lock");
        let buffer = inner
            .get_mut(code)
            .ok_or_else(|| ScanError::UnknownPairingCode(code.to_string()))?;
        Ok(std::mem::take(buffer))
    }

    /// Forget a code entirely (the desktop ended the pairing).
    pub fn remove(&self, code: &str) {
        self.inner
            .lock()
            .expect("pairing registry lock")
            .remove(code);
    }
}
