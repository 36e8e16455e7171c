use serde::Serialize;

/// Current value of a single form control.
///
/// Serializes untagged so a snapshot renders text and choices as JSON strings
/// and flags as JSON booleans, which keeps canonical snapshots readable and
/// stable. Deliberately not `Deserialize`: untagged decoding could not tell
/// `Text` from `Choice`, and nothing reads values back from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free text input or textarea content.
    Text(String),
    /// Checkbox checked-state.
    Flag(bool),
    /// Selected option of a select control or radio group.
    Choice(String),
}

impl FieldValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn choice(value: impl Into<String>) -> Self {
        Self::Choice(value.into())
    }

    /// Text or choice content, if this is a string-carrying value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => Some(s),
            FieldValue::Flag(_) => None,
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            FieldValue::Text(_) | FieldValue::Choice(_) => None,
        }
    }

    /// True for empty text, the empty choice, and the `--` placeholder option.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Choice(s) => s.is_empty() || s == "--",
            FieldValue::Flag(_) => false,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
