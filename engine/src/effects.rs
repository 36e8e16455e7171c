//! UI effects emitted by the engine for the frontend to apply.
//!
//! The engine never touches rendered markup. Every handler reduces to a list
//! of [`UiEffect`] values describing the DOM-level mutations the frontend must
//! perform: show or dismiss a notice, annotate a field, move focus, flip a
//! toggle's displayed state. Frontends drain the queue after each event or
//! tick and apply the effects in order.
//!
//! Effects are plain data. Applying the same effect twice is harmless, and an
//! effect for an element the page does not render may be ignored.

use std::fmt;

use switchboard_types::{FieldId, FieldValue, FormId, RecipientMode};

use crate::gate::ConfigBanner;
use crate::notices::{Notice, NoticeId};

/// A single UI mutation the frontend must apply.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEffect {
    /// Render a transient notice.
    ShowNotice(Notice),
    /// Remove a notice, whether auto-expired or user-dismissed.
    DismissNotice(NoticeId),
    /// Update the unsaved-changes indicator for a form.
    SetDirtyIndicator { form_id: FormId, dirty: bool },
    /// Attach an inline error or warning to a field.
    SetFieldAnnotation {
        form_id: FormId,
        field: FieldId,
        annotation: FieldAnnotation,
    },
    /// Remove the inline annotation from a field.
    ClearFieldAnnotation { form_id: FormId, field: FieldId },
    /// Remove every inline annotation on a form.
    ClearFieldAnnotations { form_id: FormId },
    /// Move input focus to a field.
    FocusField { form_id: FormId, field: FieldId },
    /// Rewrite a field's displayed value, e.g. after number normalization.
    SetFieldValue {
        form_id: FormId,
        field: FieldId,
        value: FieldValue,
    },
    /// Show the input panel for one recipient mode and hide the others.
    ShowRecipientPanel { form_id: FormId, mode: RecipientMode },
    /// Update a status toggle's displayed state.
    SetToggleDisplay { form_id: FormId, display: ToggleDisplay },
    /// Mark a submit or test control as busy (or idle again).
    SetControlBusy { control: ControlKind, busy: bool },
    /// Render the persistent incomplete-configuration banner.
    ShowConfigBanner(ConfigBanner),
    /// Disable an action control, with a tooltip explaining why.
    DisableAction { action: GatedAction, reason: String },
    /// Ask the user to confirm before the engine proceeds.
    RequestConfirmation(ConfirmationRequest),
    /// Empty the rendered log panel.
    ClearLogPanel,
    /// Navigation is approved; the frontend should leave the page.
    ProceedNavigation(NavigationTarget),
}

/// An inline message attached to a single field.
///
/// Warnings advise without blocking; errors block submission until fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAnnotation {
    message: String,
    warning: bool,
}

impl FieldAnnotation {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warning: false,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warning: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_warning(&self) -> bool {
        self.warning
    }

    /// True when the annotation must block a submit.
    pub fn is_blocking(&self) -> bool {
        !self.warning
    }
}

/// Displayed state of a status toggle.
///
/// While a flip is awaiting its server verdict the control shows the
/// requested value with a transitional label and ignores further input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleDisplay {
    pub enabled: bool,
    pub pending: bool,
}

impl ToggleDisplay {
    pub fn settled(enabled: bool) -> Self {
        Self {
            enabled,
            pending: false,
        }
    }

    pub fn transitioning(enabled: bool) -> Self {
        Self {
            enabled,
            pending: true,
        }
    }

    pub fn label(&self) -> &'static str {
        match (self.enabled, self.pending) {
            (true, false) => "Active",
            (false, false) => "Inactive",
            (true, true) => "Activating...",
            (false, true) => "Deactivating...",
        }
    }
}

/// Controls that run one request at a time and show a busy state meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ControlKind {
    SaveGeneral,
    SaveForm,
    TestConnection,
    TestNotification,
    ClearLogs,
}

impl ControlKind {
    pub fn busy_label(self) -> &'static str {
        match self {
            Self::SaveGeneral | Self::SaveForm => "Saving...",
            Self::TestConnection => "Testing connection...",
            Self::TestNotification => "Sending test...",
            Self::ClearLogs => "Clearing...",
        }
    }
}

/// Actions the configuration gate may disable until setup is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedAction {
    TestNotification,
    ToggleForm(FormId),
}

/// Identifier for an outstanding confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConfirmId(u64);

impl ConfirmId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConfirmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confirm-{}", self.0)
    }
}

/// A yes/no prompt the frontend must put to the user.
///
/// The answer comes back as a `ConfirmationAnswered` event carrying the same
/// id. Unanswered prompts simply hold their action; nothing times out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub id: ConfirmId,
    pub prompt: String,
}

/// Where a navigation request is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Leaving the admin screens entirely.
    Away,
    /// From a form detail page back to the form list.
    BackToList,
}

/// Ordered queue of effects awaiting the frontend.
///
/// Handlers push as they go; the frontend drains with [`EffectQueue::take`]
/// after each event or tick. Order is preserved because later effects may
/// depend on earlier ones (a focus request after an annotation, say).
#[derive(Debug, Default)]
pub struct EffectQueue {
    pending: Vec<UiEffect>,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: UiEffect) {
        self.pending.push(effect);
    }

    pub fn extend(&mut self, effects: impl IntoIterator<Item = UiEffect>) {
        self.pending.extend(effects);
    }

    /// Drain all pending effects in emission order.
    pub fn take(&mut self) -> Vec<UiEffect> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_preserves_emission_order() {
        let mut queue = EffectQueue::new();
        queue.push(UiEffect::ClearLogPanel);
        queue.push(UiEffect::SetDirtyIndicator {
            form_id: FormId::new(3),
            dirty: true,
        });

        let drained = queue.take();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], UiEffect::ClearLogPanel);
        assert!(queue.is_empty());
    }

    #[test]
    fn take_on_empty_queue_yields_nothing() {
        let mut queue = EffectQueue::new();
        assert!(queue.take().is_empty());
    }

    #[test]
    fn toggle_display_labels_cover_all_states() {
        assert_eq!(ToggleDisplay::settled(true).label(), "Active");
        assert_eq!(ToggleDisplay::settled(false).label(), "Inactive");
        assert_eq!(ToggleDisplay::transitioning(true).label(), "Activating...");
        assert_eq!(
            ToggleDisplay::transitioning(false).label(),
            "Deactivating..."
        );
    }

    #[test]
    fn blocking_annotation_is_not_a_warning() {
        let error = FieldAnnotation::error("required");
        assert!(error.is_blocking());
        assert!(!error.is_warning());

        let warning = FieldAnnotation::warning("advisory");
        assert!(!warning.is_blocking());
        assert!(warning.is_warning());
    }
}
