use serde::{Deserialize, Serialize};

/// Identifies a physical switch as described by a client.
///
/// Two descriptors with the same `(model, hostname)` refer to the same
/// device for locking purposes, regardless of any other field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchDescriptor {
    pub model: String,
    pub hostname: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub port: Option<u16>,
}

impl SwitchDescriptor {
    pub fn key(&self) -> SwitchKey {
        SwitchKey {
            model: self.model.to_lowercase(),
            hostname: self.hostname.clone(),
        }
    }
}

/// The `(model, hostname)` identity used to key per-switch mutual exclusion
/// and to route a hostname-addressed request to its open session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwitchKey {
    pub model: String,
    pub hostname: String,
}

impl SwitchKey {
    pub fn new(model: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            model: model.into().to_lowercase(),
            hostname: hostname.into(),
        }
    }
}
