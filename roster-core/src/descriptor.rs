//! Canonical, validated form of one incoming employee entry.

use serde::{Deserialize, Serialize};

/// One employee as described by the external system of record.
///
/// Built only by the sync preprocessor; strings are already trimmed, blanks
/// are `None`, and `email` is lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub external_ref: Option<String>,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub title: Option<String>,
    /// Legal-entity name.
    pub company: Option<String>,
    pub department: Option<String>,
    pub manager_external_ref: Option<String>,
    pub is_blocked_from_ad: Option<bool>,
    pub is_in_blocked_ou: Option<bool>,
    pub password_hash: Option<String>,
    /// The source object exactly as received.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl Descriptor {
    /// external_ref when present, email otherwise.
    pub fn identity_key(&self) -> &str {
        self.external_ref.as_deref().unwrap_or(&self.email)
    }

    /// The source marks this account as blocked or dismissed.
    pub fn is_blocked(&self) -> bool {
        self.is_blocked_from_ad == Some(true) || self.is_in_blocked_ou == Some(true)
    }

    /// Manager reference, unless it points back at this descriptor.
    pub fn manager_ref(&self) -> Option<&str> {
        let manager = self.manager_external_ref.as_deref()?;
        if self.external_ref.as_deref() == Some(manager) {
            return None;
        }
        Some(manager)
    }
}
