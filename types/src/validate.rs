//! Pure field validators.
//!
//! Every validator maps raw input to a [`FieldValidationResult`] verdict; none
//! of them return errors or panic. The same functions run on blur for
//! immediate feedback and again at submit time, so feedback and enforcement
//! cannot drift apart.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Digits with at most one leading `+`.
static NUMBER_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]+$").expect("number regex is valid"));

/// `http(s)://host.tld[/path]` with a 2-6 character TLD.
static URL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://[\da-z.-]+\.[a-z.]{2,6}[/\w.-]*$").expect("url regex is valid")
});

/// Verdict of validating one field.
///
/// Invariants: an invalid verdict always carries a non-empty message, and
/// `formatted` is always populated (the trimmed input when validation did not
/// rewrite it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidationResult {
    is_valid: bool,
    message: String,
    formatted: String,
    is_warning: bool,
}

impl FieldValidationResult {
    #[must_use]
    pub fn valid(formatted: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: String::new(),
            formatted: formatted.into(),
            is_warning: false,
        }
    }

    /// Valid, but with an advisory message the caller should surface.
    #[must_use]
    pub fn valid_with_warning(formatted: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(!message.is_empty(), "warning verdicts must carry a message");
        Self {
            is_valid: true,
            message,
            formatted: formatted.into(),
            is_warning: true,
        }
    }

    #[must_use]
    pub fn invalid(formatted: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(!message.is_empty(), "invalid verdicts must carry a message");
        Self {
            is_valid: false,
            message,
            formatted: formatted.into(),
            is_warning: false,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.is_warning
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Normalized value; equal to the trimmed input unless validation rewrote it.
    #[must_use]
    pub fn formatted(&self) -> &str {
        &self.formatted
    }

    #[must_use]
    pub fn into_formatted(self) -> String {
        self.formatted
    }
}

/// Validate and normalize a WhatsApp number.
///
/// Accepts 10 to 15 digits with an optional leading `+`. A local
/// trunk-prefix `0` is replaced with the `+62` country calling code;
/// otherwise a missing `+` is prepended.
#[must_use]
pub fn validate_whatsapp_number(raw: &str) -> FieldValidationResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValidationResult::invalid(trimmed, "WhatsApp number is required.");
    }
    if !NUMBER_SHAPE.is_match(trimmed) {
        return FieldValidationResult::invalid(
            trimmed,
            "WhatsApp number may only contain digits and an optional leading +.",
        );
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    let digits = cleaned.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 10 {
        return FieldValidationResult::invalid(
            trimmed,
            "WhatsApp number is too short (minimum 10 digits).",
        );
    }
    if digits > 15 {
        return FieldValidationResult::invalid(
            trimmed,
            "WhatsApp number is too long (maximum 15 digits).",
        );
    }

    let formatted = if let Some(rest) = cleaned.strip_prefix('0') {
        format!("+62{rest}")
    } else if cleaned.starts_with('+') {
        cleaned
    } else {
        format!("+{cleaned}")
    };

    // Trunk-prefix replacement adds a digit; a 15-digit number starting with 0
    // would format to 16. Formatted values must re-validate unchanged.
    if formatted.chars().filter(|c| c.is_ascii_digit()).count() > 15 {
        return FieldValidationResult::invalid(
            trimmed,
            "WhatsApp number is too long (maximum 15 digits).",
        );
    }

    FieldValidationResult::valid(formatted)
}

/// Validate a service endpoint URL. Scheme is mandatory.
#[must_use]
pub fn validate_service_url(raw: &str) -> FieldValidationResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValidationResult::invalid(trimmed, "API URL is required.");
    }
    if !URL_SHAPE.is_match(trimmed) {
        return FieldValidationResult::invalid(
            trimmed,
            "Enter a valid URL including http:// or https://.",
        );
    }
    FieldValidationResult::valid(trimmed)
}

/// Validate a message template.
///
/// Templates without `{` and `}` are accepted but flagged with a warning:
/// placeholders are recommended, not mandatory.
#[must_use]
pub fn validate_message_template(raw: &str) -> FieldValidationResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValidationResult::invalid(trimmed, "Message template is required.");
    }
    if trimmed.chars().count() < 10 {
        return FieldValidationResult::invalid(
            trimmed,
            "Message template is too short (minimum 10 characters).",
        );
    }
    if !(trimmed.contains('{') && trimmed.contains('}')) {
        return FieldValidationResult::valid_with_warning(
            trimmed,
            "Template has no {field} placeholders; every notification will carry the same text.",
        );
    }
    FieldValidationResult::valid(trimmed)
}

/// Validate an access token: length only, no format constraint.
#[must_use]
pub fn validate_access_token(raw: &str) -> FieldValidationResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValidationResult::invalid(trimmed, "Access token is required.");
    }
    if trimmed.chars().count() < 6 {
        return FieldValidationResult::invalid(
            trimmed,
            "Access token must be at least 6 characters.",
        );
    }
    FieldValidationResult::valid(trimmed)
}
