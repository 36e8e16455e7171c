//! Models of the admin pages the engine manages.
//!
//! A [`PageModel`] describes what the server rendered: which page kind, which
//! forms with which field values, which status toggles and their initial
//! positions. The engine treats the rendered values as the opening baseline
//! and tracks divergence from there.

use std::collections::BTreeMap;

use switchboard_types::{FieldId, FieldValue, FormId, FormSnapshot};

/// Well-known field names, matching what the server renders.
pub mod fields {
    /// General settings page.
    pub const API_URL: &str = "api_url";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const DEFAULT_RECIPIENT: &str = "default_recipient";
    pub const DEFAULT_TEMPLATE: &str = "default_template";
    pub const ENABLE_LOGGING: &str = "enable_logging";

    /// Form detail page.
    pub const ENABLED: &str = "enabled";
    pub const RECIPIENT_MODE: &str = "recipient_mode";
    pub const RECIPIENT: &str = "recipient";
    pub const RECIPIENT_FIELD: &str = "recipient_field";
    pub const MESSAGE_TEMPLATE: &str = "message_template";
    pub const INCLUDE_ALL_FIELDS: &str = "include_all_fields";

    /// Per-field inclusion checkboxes carry this prefix plus the field name.
    pub const INCLUDE_PREFIX: &str = "include_";
}

/// Which admin page is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Plugin-wide settings: endpoint, token, defaults.
    Settings,
    /// The list of forms with status toggles.
    FormList,
    /// Notification settings for one form.
    FormDetail,
}

/// One form's tracked fields and their current values.
#[derive(Debug, Clone)]
pub struct FormModel {
    id: FormId,
    values: BTreeMap<FieldId, FieldValue>,
}

impl FormModel {
    pub fn new(id: FormId) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style field initialization for page construction.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<FieldId>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    pub fn set(&mut self, field: impl Into<FieldId>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Text content of a field, empty if absent or not textual.
    pub fn text(&self, field: &str) -> &str {
        self.values.get(field).and_then(FieldValue::as_str).unwrap_or("")
    }

    /// Checkbox state of a field, false if absent.
    pub fn flag(&self, field: &str) -> bool {
        self.values
            .get(field)
            .and_then(FieldValue::as_flag)
            .unwrap_or(false)
    }

    /// Names of fields ticked for inclusion, in stable order.
    pub fn included_field_names(&self) -> Vec<String> {
        self.values
            .iter()
            .filter_map(|(id, value)| {
                let name = id.as_str().strip_prefix(fields::INCLUDE_PREFIX)?;
                value.as_flag().unwrap_or(false).then(|| name.to_owned())
            })
            .collect()
    }

    /// Canonical snapshot of every tracked field at this moment.
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::capture(&self.values)
    }
}

/// Everything the engine knows about the loaded page.
#[derive(Debug, Clone)]
pub struct PageModel {
    kind: PageKind,
    forms: Vec<FormModel>,
    toggles: BTreeMap<FormId, bool>,
    dynamic_capable: bool,
}

impl PageModel {
    /// The general settings page carries exactly one tracked form.
    pub fn settings(general: FormModel) -> Self {
        Self {
            kind: PageKind::Settings,
            forms: vec![general],
            toggles: BTreeMap::new(),
            dynamic_capable: false,
        }
    }

    /// The form list renders one status toggle per form, at the position the
    /// server last knew.
    pub fn form_list(toggles: impl IntoIterator<Item = (FormId, bool)>) -> Self {
        Self {
            kind: PageKind::FormList,
            forms: Vec::new(),
            toggles: toggles.into_iter().collect(),
            dynamic_capable: false,
        }
    }

    /// A form detail page: the settings form, a header toggle mirroring the
    /// enabled flag, and whether the form has a phone-type field to draw
    /// dynamic recipients from.
    pub fn form_detail(form: FormModel, dynamic_capable: bool) -> Self {
        let form_id = form.id();
        let enabled = form.flag(fields::ENABLED);
        Self {
            kind: PageKind::FormDetail,
            forms: vec![form],
            toggles: BTreeMap::from([(form_id, enabled)]),
            dynamic_capable,
        }
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn forms(&self) -> &[FormModel] {
        &self.forms
    }

    pub fn form(&self, id: FormId) -> Option<&FormModel> {
        self.forms.iter().find(|form| form.id() == id)
    }

    pub fn form_mut(&mut self, id: FormId) -> Option<&mut FormModel> {
        self.forms.iter_mut().find(|form| form.id() == id)
    }

    /// Toggles rendered on this page with their initial positions.
    pub fn toggles(&self) -> &BTreeMap<FormId, bool> {
        &self.toggles
    }

    pub fn has_toggles(&self) -> bool {
        !self.toggles.is_empty()
    }

    pub fn dynamic_capable(&self) -> bool {
        self.dynamic_capable
    }
}
