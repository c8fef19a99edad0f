//! Recipient configuration: which key, name and city a session charges to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::key::{resolve_key, KeyHint, PixKey};
use crate::payload::PixPayloadBuilder;
use crate::{Error, Result};

/// Recipient record for one session (or the global default)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientConfig {
    /// Raw PIX key as entered in the configuration form
    pub pix_key: String,
    pub recipient_name: String,
    pub recipient_city: String,
}

impl RecipientConfig {
    pub fn new(
        pix_key: impl Into<String>,
        recipient_name: impl Into<String>,
        recipient_city: impl Into<String>,
    ) -> Self {
        Self {
            pix_key: pix_key.into(),
            recipient_name: recipient_name.into(),
            recipient_city: recipient_city.into(),
        }
    }

    /// Load a single recipient record from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Check that name and city are present and resolve the key.
    ///
    /// An ambiguous 11-digit key needs a `hint`.
    pub fn validate(&self, hint: Option<KeyHint>) -> Result<PixKey> {
        if self.recipient_name.trim().is_empty() {
            return Err(Error::Config("recipient_name is required".to_string()));
        }
        if self.recipient_city.trim().is_empty() {
            return Err(Error::Config("recipient_city is required".to_string()));
        }
        resolve_key(&self.pix_key, hint)
    }

    /// Start a payload for this recipient, charged to `key`
    pub fn payload_builder(&self, key: &PixKey) -> PixPayloadBuilder {
        PixPayloadBuilder::new(key, self.recipient_name.trim(), self.recipient_city.trim())
    }
}

/// Global recipient plus per-session overrides
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigSet {
    #[serde(default)]
    pub global: Option<RecipientConfig>,
    #[serde(default)]
    pub sessions: HashMap<String, RecipientConfig>,
}

impl ConfigSet {
    /// Load from a JSON file. A bare [`RecipientConfig`] is accepted as the
    /// global record.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(data)?;
        if value.get("pix_key").is_some() {
            let global: RecipientConfig = serde_json::from_value(value)?;
            return Ok(Self {
                global: Some(global),
                sessions: HashMap::new(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Session record if one exists, otherwise the global record
    pub fn resolve(&self, session_id: Option<&str>) -> Option<&RecipientConfig> {
        session_id
            .and_then(|id| self.sessions.get(id))
            .or(self.global.as_ref())
    }
}
