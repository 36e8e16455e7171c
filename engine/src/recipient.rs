//! Recipient mode selection for a form's notifications.
//!
//! Three modes decide where a notification goes: the plugin-wide default
//! number, a manually entered number, or a number pulled from a submitted
//! form field. Dynamic mode only works when the form has a phone-type field;
//! without one the mode silently falls back to Default at page load and the
//! correction is persisted so the stored settings match what the user sees.

use switchboard_types::{FieldId, RecipientMode};

use crate::effects::FieldAnnotation;
use crate::page::{fields, FormModel};

/// What happened to the stored mode when the controller came up.
///
/// Transitions at init:
///
///   Default -> Default
///   Manual  -> Manual
///   Dynamic -> Dynamic   (form has a phone-type field)
///   Dynamic -> Default   (no phone-type field; persisted silently)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The stored mode is usable as-is.
    Kept(RecipientMode),
    /// Dynamic was stored but is impossible; the mode is now Default.
    Downgraded,
}

/// Verdict on a user's mode selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeChange {
    /// The selection took effect; show this mode's input panel.
    Applied(RecipientMode),
    /// The selection is impossible on this form; the selector must snap back.
    Rejected { reason: String },
}

/// Per-form recipient mode state.
#[derive(Debug)]
pub struct RecipientModeController {
    mode: RecipientMode,
    dynamic_capable: bool,
}

impl RecipientModeController {
    /// Build from the stored mode, downgrading an impossible Dynamic.
    pub fn new(stored: RecipientMode, dynamic_capable: bool) -> (Self, InitOutcome) {
        let outcome = if stored == RecipientMode::Dynamic && !dynamic_capable {
            InitOutcome::Downgraded
        } else {
            InitOutcome::Kept(stored)
        };
        let mode = match outcome {
            InitOutcome::Kept(mode) => mode,
            InitOutcome::Downgraded => RecipientMode::Default,
        };
        (
            Self {
                mode,
                dynamic_capable,
            },
            outcome,
        )
    }

    pub fn mode(&self) -> RecipientMode {
        self.mode
    }

    pub fn dynamic_capable(&self) -> bool {
        self.dynamic_capable
    }

    /// Apply a user selection from the mode selector.
    pub fn select(&mut self, requested: RecipientMode) -> ModeChange {
        if requested == RecipientMode::Dynamic && !self.dynamic_capable {
            return ModeChange::Rejected {
                reason: "This form has no phone-type field, so the recipient cannot be \
                         taken from a submission. Add a phone field to the form first."
                    .to_owned(),
            };
        }
        self.mode = requested;
        ModeChange::Applied(requested)
    }

    /// Mode-specific field checks that gate a save or a test send.
    ///
    /// Default mode needs nothing here; the default recipient lives in the
    /// plugin-wide settings and was validated when those were saved.
    pub fn validate(&self, form: &FormModel) -> Vec<(FieldId, FieldAnnotation)> {
        let mut issues = Vec::new();
        match self.mode {
            RecipientMode::Default => {}
            RecipientMode::Manual => {
                let verdict =
                    switchboard_types::validate_whatsapp_number(form.text(fields::RECIPIENT));
                if !verdict.is_valid() {
                    issues.push((
                        FieldId::from(fields::RECIPIENT),
                        FieldAnnotation::error(verdict.message()),
                    ));
                }
            }
            RecipientMode::Dynamic => {
                let unset = form
                    .get(fields::RECIPIENT_FIELD)
                    .is_none_or(switchboard_types::FieldValue::is_unset);
                if unset {
                    issues.push((
                        FieldId::from(fields::RECIPIENT_FIELD),
                        FieldAnnotation::error(
                            "Select the form field that contains the WhatsApp number.",
                        ),
                    ));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_types::{FieldValue, FormId};

    fn form_with(field: &str, value: FieldValue) -> FormModel {
        FormModel::new(FormId::new(1)).with_field(field, value)
    }

    #[test]
    fn stored_dynamic_survives_when_capable() {
        let (controller, outcome) = RecipientModeController::new(RecipientMode::Dynamic, true);
        assert_eq!(outcome, InitOutcome::Kept(RecipientMode::Dynamic));
        assert_eq!(controller.mode(), RecipientMode::Dynamic);
    }

    #[test]
    fn stored_dynamic_downgrades_without_phone_field() {
        let (controller, outcome) = RecipientModeController::new(RecipientMode::Dynamic, false);
        assert_eq!(outcome, InitOutcome::Downgraded);
        assert_eq!(controller.mode(), RecipientMode::Default);
    }

    #[test]
    fn selecting_dynamic_without_capability_is_rejected() {
        let (mut controller, _) = RecipientModeController::new(RecipientMode::Default, false);
        let change = controller.select(RecipientMode::Dynamic);
        assert!(matches!(change, ModeChange::Rejected { .. }));
        assert_eq!(controller.mode(), RecipientMode::Default);
    }

    #[test]
    fn selecting_manual_always_applies() {
        let (mut controller, _) = RecipientModeController::new(RecipientMode::Default, false);
        assert_eq!(
            controller.select(RecipientMode::Manual),
            ModeChange::Applied(RecipientMode::Manual)
        );
        assert_eq!(controller.mode(), RecipientMode::Manual);
    }

    #[test]
    fn manual_mode_requires_a_valid_number() {
        let (controller, _) = RecipientModeController::new(RecipientMode::Manual, false);

        let bad = form_with(fields::RECIPIENT, FieldValue::text("12ab"));
        let issues = controller.validate(&bad);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0.as_str(), fields::RECIPIENT);
        assert!(issues[0].1.is_blocking());

        let good = form_with(fields::RECIPIENT, FieldValue::text("+628123456789"));
        assert!(controller.validate(&good).is_empty());
    }

    #[test]
    fn dynamic_mode_requires_a_selected_field() {
        let (controller, _) = RecipientModeController::new(RecipientMode::Dynamic, true);

        let placeholder = form_with(fields::RECIPIENT_FIELD, FieldValue::choice("--"));
        let issues = controller.validate(&placeholder);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0.as_str(), fields::RECIPIENT_FIELD);

        let missing = FormModel::new(FormId::new(1));
        assert_eq!(controller.validate(&missing).len(), 1);

        let chosen = form_with(fields::RECIPIENT_FIELD, FieldValue::choice("phone_1"));
        assert!(controller.validate(&chosen).is_empty());
    }

    #[test]
    fn default_mode_has_no_form_level_requirements() {
        let (controller, _) = RecipientModeController::new(RecipientMode::Default, false);
        assert!(controller.validate(&FormModel::new(FormId::new(1))).is_empty());
    }
}
