use serde::{Deserialize, Serialize};

use crate::ids::FormId;

/// Strategy for determining a notification's destination number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientMode {
    /// Use the globally configured default recipient.
    #[default]
    Default,
    /// Use a number entered directly on the form's settings.
    Manual,
    /// Derive the number from a submitted form field.
    Dynamic,
}

impl RecipientMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecipientMode::Default => "default",
            RecipientMode::Manual => "manual",
            RecipientMode::Dynamic => "dynamic",
        }
    }

    /// Parse a selector value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Some(RecipientMode::Default),
            "manual" => Some(RecipientMode::Manual),
            "dynamic" => Some(RecipientMode::Dynamic),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecipientMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last enabled-state a client confirmed for a form, forwarded across a page
/// transition through the single-use mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastKnownStatus {
    pub form_id: FormId,
    pub enabled: bool,
}

impl LastKnownStatus {
    #[must_use]
    pub fn new(form_id: FormId, enabled: bool) -> Self {
        Self { form_id, enabled }
    }
}
