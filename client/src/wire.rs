//! Request and response shapes for the admin endpoint.
//!
//! Requests carry an internally tagged `action` discriminator next to the
//! auth token. Responses are decoded permissively: unknown fields are
//! ignored and absent fields default, so older or richer servers both work.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use switchboard_types::{FormId, RecipientMode};

/// One admin operation, tagged with its wire name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminAction {
    SaveGeneralSettings {
        settings: GeneralSettingsPayload,
    },
    SaveFormSettings {
        form_id: FormId,
        settings: FormSettingsPayload,
    },
    /// Same payload as `SaveFormSettings`; a distinct action so the server
    /// can tell a user save from an automatic correction.
    AutoAdjustFormSettings {
        form_id: FormId,
        settings: FormSettingsPayload,
    },
    TestConnection,
    TestFormNotification {
        form_id: FormId,
        recipient_mode: RecipientMode,
    },
    ClearLogs,
    ToggleFormStatus {
        form_id: FormId,
        enabled: bool,
    },
    GetFormsStatus {
        form_ids: Vec<FormId>,
    },
    CheckConfiguration,
}

impl AdminAction {
    /// Wire name, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::SaveGeneralSettings { .. } => "save_general_settings",
            AdminAction::SaveFormSettings { .. } => "save_form_settings",
            AdminAction::AutoAdjustFormSettings { .. } => "auto_adjust_form_settings",
            AdminAction::TestConnection => "test_connection",
            AdminAction::TestFormNotification { .. } => "test_form_notification",
            AdminAction::ClearLogs => "clear_logs",
            AdminAction::ToggleFormStatus { .. } => "toggle_form_status",
            AdminAction::GetFormsStatus { .. } => "get_forms_status",
            AdminAction::CheckConfiguration => "check_configuration",
        }
    }
}

/// Complete request body: token plus the flattened action.
#[derive(Serialize)]
pub(crate) struct AdminRequest<'a> {
    pub(crate) token: &'a str,
    #[serde(flatten)]
    pub(crate) action: &'a AdminAction,
}

/// Global notifier settings as sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralSettingsPayload {
    pub api_url: String,
    pub access_token: String,
    /// Already normalized by validation; the server re-validates anyway.
    pub default_recipient: String,
    pub default_template: String,
    pub enable_logging: bool,
}

/// One form's notification settings as sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSettingsPayload {
    pub enabled: bool,
    pub recipient_mode: RecipientMode,
    pub recipient: String,
    pub recipient_field: String,
    pub message_template: String,
    /// Selected field ids, or the `["*"]` sentinel for "include everything".
    pub included_fields: Vec<String>,
}

impl FormSettingsPayload {
    /// The sentinel carried by `included_fields` when all fields are included.
    pub const INCLUDE_ALL: &'static str = "*";
}

/// Uniform server verdict.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(default)]
    pub data: ResponseData,
}

/// Action-specific response payload. Only the fields relevant to the
/// dispatched action are populated; everything else defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseData {
    /// User-facing outcome description.
    #[serde(default)]
    pub message: String,
    /// Per-field server-side validation errors on failed saves.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    /// Authoritative enabled-state after `toggle_form_status`.
    #[serde(default)]
    pub status: Option<bool>,
    /// Authoritative enabled-states for `get_forms_status`.
    #[serde(default)]
    pub statuses: BTreeMap<FormId, bool>,
    /// Completeness verdict for `check_configuration`.
    #[serde(default)]
    pub is_complete: Option<bool>,
    /// Per-field findings for `check_configuration`.
    #[serde(default)]
    pub validation_results: BTreeMap<String, ConfigFinding>,
}

/// One configuration field's completeness finding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigFinding {
    /// Human label for the field.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub message: String,
}
