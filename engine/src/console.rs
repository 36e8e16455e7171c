//! The console coordinator.
//!
//! One [`Console`] owns every piece of page state: form models, baselines,
//! the recipient mode controller, toggle states, the configuration gate, and
//! the notice stack. Frontends feed it [`UiEvent`] values and drain
//! [`UiEffect`](crate::effects::UiEffect) values back; nothing else crosses
//! the seam.
//!
//! Remote calls never block the interaction path. Each is spawned onto the
//! runtime and reports back over an mpsc channel; [`Console::tick`] applies
//! completions along with due debounce checks, notice expiry, and scheduled
//! reconciliation passes. Call [`Console::start`] once, inside a Tokio
//! runtime, after constructing.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use switchboard_client::wire::{AdminAction, AdminResponse, FormSettingsPayload, GeneralSettingsPayload};
use switchboard_client::{AdminClient, ClientError};
use switchboard_types::{
    FieldId, FieldValue, FormId, LastKnownStatus, RecipientMode, validate_access_token,
    validate_message_template, validate_service_url, validate_whatsapp_number,
    FieldValidationResult,
};

use crate::dirty::{DirtyTracker, SyncState};
use crate::effects::{
    ConfirmId, ConfirmationRequest, ControlKind, EffectQueue, FieldAnnotation, GatedAction,
    NavigationTarget, ToggleDisplay, UiEffect,
};
use crate::gate::ConfigurationGate;
use crate::notices::{NoticeId, NoticeLevel, NoticeStack};
use crate::page::{FormModel, PageKind, PageModel, fields};
use crate::recipient::{InitOutcome, ModeChange, RecipientModeController};
use crate::store::StatusStore;
use crate::toggles::{FlipOutcome, ToggleSynchronizer};

/// Delay before the standard post-load reconciliation pass.
pub const RECONCILE_INITIAL_DELAY: Duration = Duration::from_millis(300);
/// Delay of the extra pass after returning from a detail page.
pub const BACK_NAV_PASS_DELAY: Duration = Duration::from_millis(500);
/// Delay of the follow-up retry after returning from a detail page.
pub const BACK_NAV_RETRY_DELAY: Duration = Duration::from_secs(1);

const TRANSPORT_FAILURE_NOTICE: &str =
    "Could not reach the server. Check your connection and try again.";
const FIX_FIELDS_NOTICE: &str = "Please fix the highlighted fields first.";

/// An interaction reported by the frontend.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A tracked field changed value.
    FieldEdited {
        form_id: FormId,
        field: FieldId,
        value: FieldValue,
    },
    /// Focus left a validated field.
    FieldBlurred { form_id: FormId, field: FieldId },
    /// The recipient mode selector changed.
    ModeSelected { form_id: FormId, mode: RecipientMode },
    /// A status toggle was clicked.
    ToggleFlipped { form_id: FormId },
    /// The page's save control was activated.
    SubmitRequested { form_id: FormId },
    TestConnectionRequested,
    TestNotificationRequested { form_id: FormId },
    ClearLogsRequested,
    /// The user is trying to leave the page.
    NavigationRequested { target: NavigationTarget },
    /// Answer to an earlier confirmation request.
    ConfirmationAnswered { id: ConfirmId, confirmed: bool },
    /// The user closed a notice by hand.
    NoticeDismissed { id: NoticeId },
}

type CallResult = Result<AdminResponse, ClientError>;

/// Completion of a spawned remote call.
#[derive(Debug)]
enum RemoteOutcome {
    GeneralSave {
        result: CallResult,
    },
    FormSave {
        form_id: FormId,
        submitted_enabled: bool,
        result: CallResult,
    },
    AutoAdjust {
        form_id: FormId,
        result: CallResult,
    },
    Toggle {
        form_id: FormId,
        result: CallResult,
    },
    TestConnection {
        result: CallResult,
    },
    TestNotification {
        result: CallResult,
    },
    ClearLogs {
        result: CallResult,
    },
    StatusBatch {
        result: CallResult,
    },
    ConfigCheck {
        result: CallResult,
    },
}

/// Action held back until the user confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    Navigate(NavigationTarget),
    ClearLogs,
}

pub struct Console {
    client: AdminClient,
    page: PageModel,
    store: Box<dyn StatusStore + Send>,
    sync: SyncState,
    dirty: DirtyTracker,
    recipient: Option<RecipientModeController>,
    toggles: ToggleSynchronizer,
    gate: ConfigurationGate,
    notices: NoticeStack,
    effects: EffectQueue,
    busy: BTreeSet<ControlKind>,
    confirmations: Vec<(ConfirmId, PendingAction)>,
    next_confirm: u64,
    reconciles: Vec<Instant>,
    pending_remote: usize,
    outcome_tx: mpsc::UnboundedSender<RemoteOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<RemoteOutcome>,
}

impl Console {
    pub fn new(
        client: AdminClient,
        page: PageModel,
        store: Box<dyn StatusStore + Send>,
        settings_url: Option<String>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let toggles = ToggleSynchronizer::new(page.toggles().iter().map(|(id, on)| (*id, *on)));
        Self {
            client,
            page,
            store,
            sync: SyncState::default(),
            dirty: DirtyTracker::new(),
            recipient: None,
            toggles,
            gate: ConfigurationGate::new(settings_url),
            notices: NoticeStack::new(),
            effects: EffectQueue::new(),
            busy: BTreeSet::new(),
            confirmations: Vec::new(),
            next_confirm: 0,
            reconciles: Vec::new(),
            pending_remote: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Page-ready initialization: capture baselines, settle the recipient
    /// mode, kick off the configuration check, and schedule reconciliation.
    ///
    /// Must run inside a Tokio runtime; remote calls are spawned from here.
    pub fn start(&mut self) {
        let now = Instant::now();

        // Mode correction happens before baseline capture so a downgraded
        // mode is part of the baseline and never reads as an unsaved edit.
        self.init_recipient_mode(now);

        for form in self.page.forms() {
            self.dirty.track(form);
        }
        let form_ids: Vec<FormId> = self.page.forms().iter().map(FormModel::id).collect();
        for form_id in form_ids {
            self.effects.push(UiEffect::SetDirtyIndicator {
                form_id,
                dirty: false,
            });
        }

        if self.page.kind() != PageKind::Settings {
            self.spawn_call(AdminAction::CheckConfiguration, |result| {
                RemoteOutcome::ConfigCheck { result }
            });
        }

        self.schedule_reconciles(now);
    }

    /// Apply an interaction from the frontend.
    pub fn handle(&mut self, event: UiEvent) {
        let now = Instant::now();
        match event {
            UiEvent::FieldEdited {
                form_id,
                field,
                value,
            } => self.on_field_edited(form_id, &field, value, now),
            UiEvent::FieldBlurred { form_id, field } => self.on_field_blurred(form_id, &field, now),
            UiEvent::ModeSelected { form_id, mode } => self.on_mode_selected(form_id, mode, now),
            UiEvent::ToggleFlipped { form_id } => self.on_toggle_flipped(form_id, now),
            UiEvent::SubmitRequested { form_id } => match self.page.kind() {
                PageKind::Settings => self.submit_general(form_id, now),
                PageKind::FormDetail => self.submit_form(form_id, now),
                PageKind::FormList => {}
            },
            UiEvent::TestConnectionRequested => self.on_test_connection(),
            UiEvent::TestNotificationRequested { form_id } => {
                self.on_test_notification(form_id, now);
            }
            UiEvent::ClearLogsRequested => self.on_clear_logs(),
            UiEvent::NavigationRequested { target } => self.on_navigation(target),
            UiEvent::ConfirmationAnswered { id, confirmed } => self.on_confirmation(id, confirmed),
            UiEvent::NoticeDismissed { id } => {
                if self.notices.dismiss(id) {
                    self.effects.push(UiEffect::DismissNotice(id));
                }
            }
        }
    }

    /// Advance time-driven work: completions, debounce checks, notice
    /// expiry, and due reconciliation passes.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.drain_remote();
        self.run_due_dirty_checks(now);
        for id in self.notices.reap_expired(now) {
            self.effects.push(UiEffect::DismissNotice(id));
        }
        self.run_due_reconciles(now);
    }

    /// Apply every completion that has arrived so far.
    pub fn drain_remote(&mut self) {
        let now = Instant::now();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.pending_remote = self.pending_remote.saturating_sub(1);
            self.apply_outcome(outcome, now);
        }
    }

    /// Drain all pending effects in emission order.
    pub fn take_effects(&mut self) -> Vec<UiEffect> {
        self.effects.take()
    }

    pub fn page(&self) -> &PageModel {
        &self.page
    }

    pub fn is_dirty(&self) -> bool {
        self.sync.is_dirty()
    }

    pub fn recipient_mode(&self) -> Option<RecipientMode> {
        self.recipient.as_ref().map(RecipientModeController::mode)
    }

    pub fn displayed_status(&self, form_id: FormId) -> Option<bool> {
        self.toggles.displayed(form_id)
    }

    /// True when no remote call is in flight and no reconciliation pass is
    /// still scheduled. Debounce and notice deadlines do not count; they
    /// need no remote completion.
    pub fn idle(&self) -> bool {
        self.pending_remote == 0 && self.reconciles.is_empty()
    }

    /// Earliest instant at which `tick` has time-driven work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.dirty.next_deadline(),
            self.notices.next_deadline(),
            self.reconciles.iter().min().copied(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ---- event handlers ----

    fn on_field_edited(&mut self, form_id: FormId, field: &FieldId, value: FieldValue, now: Instant) {
        let Some(form) = self.page.form_mut(form_id) else {
            return;
        };
        form.set(field.clone(), value);
        self.dirty.note_edit(form_id, now);
        self.live_validate(form_id, field);
    }

    /// Real-time feedback for the active recipient mode's own field.
    fn live_validate(&mut self, form_id: FormId, field: &FieldId) {
        let Some(form) = self.page.form(form_id) else {
            return;
        };
        match field.as_str() {
            fields::RECIPIENT if self.recipient_mode() == Some(RecipientMode::Manual) => {
                let verdict = validate_whatsapp_number(form.text(fields::RECIPIENT));
                if verdict.is_valid() {
                    self.effects.push(UiEffect::ClearFieldAnnotation {
                        form_id,
                        field: field.clone(),
                    });
                } else {
                    self.effects.push(UiEffect::SetFieldAnnotation {
                        form_id,
                        field: field.clone(),
                        annotation: FieldAnnotation::error(verdict.message()),
                    });
                }
            }
            fields::RECIPIENT_FIELD if self.recipient_mode() == Some(RecipientMode::Dynamic) => {
                let unset = form
                    .get(fields::RECIPIENT_FIELD)
                    .is_none_or(FieldValue::is_unset);
                if unset {
                    self.effects.push(UiEffect::SetFieldAnnotation {
                        form_id,
                        field: field.clone(),
                        annotation: FieldAnnotation::error(
                            "Select the form field that contains the WhatsApp number.",
                        ),
                    });
                } else {
                    self.effects.push(UiEffect::ClearFieldAnnotation {
                        form_id,
                        field: field.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    fn on_field_blurred(&mut self, form_id: FormId, field: &FieldId, now: Instant) {
        let Some(form) = self.page.form(form_id) else {
            return;
        };
        let text = form.text(field.as_str()).to_owned();
        match field.as_str() {
            fields::API_URL => self.annotate_verdict(form_id, field, &validate_service_url(&text)),
            fields::ACCESS_TOKEN => {
                self.annotate_verdict(form_id, field, &validate_access_token(&text));
            }
            fields::DEFAULT_TEMPLATE | fields::MESSAGE_TEMPLATE => {
                self.annotate_verdict(form_id, field, &validate_message_template(&text));
            }
            fields::DEFAULT_RECIPIENT => self.blur_number(form_id, field, &text, now),
            fields::RECIPIENT if self.recipient_mode() == Some(RecipientMode::Manual) => {
                self.blur_number(form_id, field, &text, now);
            }
            _ => {}
        }
    }

    fn annotate_verdict(&mut self, form_id: FormId, field: &FieldId, verdict: &FieldValidationResult) {
        if !verdict.is_valid() {
            self.effects.push(UiEffect::SetFieldAnnotation {
                form_id,
                field: field.clone(),
                annotation: FieldAnnotation::error(verdict.message()),
            });
        } else if verdict.is_warning() {
            self.effects.push(UiEffect::SetFieldAnnotation {
                form_id,
                field: field.clone(),
                annotation: FieldAnnotation::warning(verdict.message()),
            });
        } else {
            self.effects.push(UiEffect::ClearFieldAnnotation {
                form_id,
                field: field.clone(),
            });
        }
    }

    /// Number blur: annotate, and rewrite a valid number into its
    /// international form.
    fn blur_number(&mut self, form_id: FormId, field: &FieldId, text: &str, now: Instant) {
        let verdict = validate_whatsapp_number(text);
        if !verdict.is_valid() {
            self.effects.push(UiEffect::SetFieldAnnotation {
                form_id,
                field: field.clone(),
                annotation: FieldAnnotation::error(verdict.message()),
            });
            return;
        }
        self.effects.push(UiEffect::ClearFieldAnnotation {
            form_id,
            field: field.clone(),
        });
        let formatted = verdict.into_formatted();
        if formatted != text {
            if let Some(form) = self.page.form_mut(form_id) {
                form.set(field.clone(), FieldValue::text(formatted.clone()));
            }
            self.dirty.note_edit(form_id, now);
            self.effects.push(UiEffect::SetFieldValue {
                form_id,
                field: field.clone(),
                value: FieldValue::text(formatted),
            });
            self.push_notice(
                NoticeLevel::Info,
                "The number was rewritten in international format.",
                now,
            );
        }
    }

    fn on_mode_selected(&mut self, form_id: FormId, mode: RecipientMode, now: Instant) {
        let Some(controller) = self.recipient.as_mut() else {
            return;
        };
        let change = controller.select(mode);
        let current = controller.mode();
        match change {
            ModeChange::Applied(mode) => {
                if let Some(form) = self.page.form_mut(form_id) {
                    form.set(fields::RECIPIENT_MODE, FieldValue::choice(mode.as_str()));
                }
                self.dirty.note_edit(form_id, now);
                self.effects.push(UiEffect::ShowRecipientPanel { form_id, mode });
                self.effects.push(UiEffect::ClearFieldAnnotations { form_id });
                // The entered mode's own field is checked right away; a bad
                // stored value must not wait for the next edit or submit.
                match mode {
                    RecipientMode::Manual => {
                        self.live_validate(form_id, &FieldId::from(fields::RECIPIENT));
                    }
                    RecipientMode::Dynamic => {
                        self.live_validate(form_id, &FieldId::from(fields::RECIPIENT_FIELD));
                    }
                    RecipientMode::Default => {}
                }
            }
            ModeChange::Rejected { reason } => {
                self.push_notice(NoticeLevel::Info, reason, now);
                // Snap the selector back to the mode that actually holds.
                self.effects.push(UiEffect::SetFieldValue {
                    form_id,
                    field: FieldId::from(fields::RECIPIENT_MODE),
                    value: FieldValue::choice(current.as_str()),
                });
            }
        }
    }

    fn on_toggle_flipped(&mut self, form_id: FormId, now: Instant) {
        if let Some(reason) = self.gate.blocked_reason() {
            self.push_notice(NoticeLevel::Error, reason, now);
            return;
        }
        match self.toggles.begin_flip(form_id) {
            FlipOutcome::Started { requested } => {
                self.effects.push(UiEffect::SetToggleDisplay {
                    form_id,
                    display: ToggleDisplay::transitioning(requested),
                });
                self.spawn_call(
                    AdminAction::ToggleFormStatus {
                        form_id,
                        enabled: requested,
                    },
                    move |result| RemoteOutcome::Toggle { form_id, result },
                );
            }
            FlipOutcome::AlreadyPending => {
                debug!(%form_id, "flip ignored, a verdict is still outstanding");
            }
            FlipOutcome::Unknown => warn!(%form_id, "flip for a toggle not on this page"),
        }
    }

    fn submit_general(&mut self, form_id: FormId, now: Instant) {
        if self.busy.contains(&ControlKind::SaveGeneral) {
            return;
        }
        let Some(form) = self.page.form(form_id) else {
            return;
        };
        let url = form.text(fields::API_URL).to_owned();
        let token = form.text(fields::ACCESS_TOKEN).to_owned();
        let recipient = form.text(fields::DEFAULT_RECIPIENT).to_owned();
        let template = form.text(fields::DEFAULT_TEMPLATE).to_owned();
        let enable_logging = form.flag(fields::ENABLE_LOGGING);

        self.effects.push(UiEffect::ClearFieldAnnotations { form_id });

        let mut issues: Vec<(FieldId, FieldAnnotation)> = Vec::new();
        let url_verdict = validate_service_url(&url);
        if !url_verdict.is_valid() {
            issues.push((
                FieldId::from(fields::API_URL),
                FieldAnnotation::error(url_verdict.message()),
            ));
        }
        let token_verdict = validate_access_token(&token);
        if !token_verdict.is_valid() {
            issues.push((
                FieldId::from(fields::ACCESS_TOKEN),
                FieldAnnotation::error(token_verdict.message()),
            ));
        }
        let number_verdict = validate_whatsapp_number(&recipient);
        if !number_verdict.is_valid() {
            issues.push((
                FieldId::from(fields::DEFAULT_RECIPIENT),
                FieldAnnotation::error(number_verdict.message()),
            ));
        }
        let template_verdict = validate_message_template(&template);
        if !template_verdict.is_valid() {
            issues.push((
                FieldId::from(fields::DEFAULT_TEMPLATE),
                FieldAnnotation::error(template_verdict.message()),
            ));
        } else if template_verdict.is_warning() {
            self.effects.push(UiEffect::SetFieldAnnotation {
                form_id,
                field: FieldId::from(fields::DEFAULT_TEMPLATE),
                annotation: FieldAnnotation::warning(template_verdict.message()),
            });
        }

        if !issues.is_empty() {
            self.reject_submit(form_id, issues, now);
            return;
        }

        let formatted = number_verdict.into_formatted();
        if formatted != recipient {
            if let Some(form) = self.page.form_mut(form_id) {
                form.set(fields::DEFAULT_RECIPIENT, FieldValue::text(formatted.clone()));
            }
            self.effects.push(UiEffect::SetFieldValue {
                form_id,
                field: FieldId::from(fields::DEFAULT_RECIPIENT),
                value: FieldValue::text(formatted.clone()),
            });
        }

        self.begin_busy(ControlKind::SaveGeneral);
        let settings = GeneralSettingsPayload {
            api_url: url,
            access_token: token,
            default_recipient: formatted,
            default_template: template,
            enable_logging,
        };
        self.spawn_call(AdminAction::SaveGeneralSettings { settings }, |result| {
            RemoteOutcome::GeneralSave { result }
        });
    }

    fn submit_form(&mut self, form_id: FormId, now: Instant) {
        if self.busy.contains(&ControlKind::SaveForm) {
            return;
        }
        let Some(controller) = self.recipient.as_ref() else {
            return;
        };
        let mode = controller.mode();
        let Some(form) = self.page.form(form_id) else {
            return;
        };

        let mut issues = controller.validate(form);
        let template = form.text(fields::MESSAGE_TEMPLATE).to_owned();
        let recipient_raw = form.text(fields::RECIPIENT).to_owned();
        let submitted_enabled = form.flag(fields::ENABLED);

        let template_verdict = validate_message_template(&template);
        let mut template_warning = None;
        if !template_verdict.is_valid() {
            issues.push((
                FieldId::from(fields::MESSAGE_TEMPLATE),
                FieldAnnotation::error(template_verdict.message()),
            ));
        } else if template_verdict.is_warning() {
            template_warning = Some(FieldAnnotation::warning(template_verdict.message()));
        }

        self.effects.push(UiEffect::ClearFieldAnnotations { form_id });
        if let Some(annotation) = template_warning {
            self.effects.push(UiEffect::SetFieldAnnotation {
                form_id,
                field: FieldId::from(fields::MESSAGE_TEMPLATE),
                annotation,
            });
        }
        if !issues.is_empty() {
            self.reject_submit(form_id, issues, now);
            return;
        }

        let recipient = if mode == RecipientMode::Manual {
            validate_whatsapp_number(&recipient_raw).into_formatted()
        } else {
            recipient_raw.clone()
        };
        if mode == RecipientMode::Manual && recipient != recipient_raw {
            if let Some(form) = self.page.form_mut(form_id) {
                form.set(fields::RECIPIENT, FieldValue::text(recipient.clone()));
            }
            self.effects.push(UiEffect::SetFieldValue {
                form_id,
                field: FieldId::from(fields::RECIPIENT),
                value: FieldValue::text(recipient.clone()),
            });
        }

        self.begin_busy(ControlKind::SaveForm);
        let settings = self
            .page
            .form(form_id)
            .map(|form| form_payload(form, mode, recipient));
        if let Some(settings) = settings {
            self.spawn_call(
                AdminAction::SaveFormSettings { form_id, settings },
                move |result| RemoteOutcome::FormSave {
                    form_id,
                    submitted_enabled,
                    result,
                },
            );
        }
    }

    fn reject_submit(
        &mut self,
        form_id: FormId,
        issues: Vec<(FieldId, FieldAnnotation)>,
        now: Instant,
    ) {
        let first = issues.first().map(|(field, _)| field.clone());
        for (field, annotation) in issues {
            self.effects.push(UiEffect::SetFieldAnnotation {
                form_id,
                field,
                annotation,
            });
        }
        if let Some(field) = first {
            self.effects.push(UiEffect::FocusField { form_id, field });
        }
        self.push_notice(NoticeLevel::Error, FIX_FIELDS_NOTICE, now);
    }

    fn on_test_connection(&mut self) {
        if self.busy.contains(&ControlKind::TestConnection) {
            return;
        }
        self.begin_busy(ControlKind::TestConnection);
        self.spawn_call(AdminAction::TestConnection, |result| {
            RemoteOutcome::TestConnection { result }
        });
    }

    fn on_test_notification(&mut self, form_id: FormId, now: Instant) {
        if let Some(reason) = self.gate.blocked_reason() {
            self.push_notice(NoticeLevel::Error, reason, now);
            return;
        }
        if self.busy.contains(&ControlKind::TestNotification) {
            return;
        }
        let Some(controller) = self.recipient.as_ref() else {
            return;
        };
        let mode = controller.mode();
        let issues = match self.page.form(form_id) {
            Some(form) => controller.validate(form),
            None => return,
        };
        if !issues.is_empty() {
            self.reject_submit(form_id, issues, now);
            return;
        }
        self.begin_busy(ControlKind::TestNotification);
        self.spawn_call(
            AdminAction::TestFormNotification {
                form_id,
                recipient_mode: mode,
            },
            |result| RemoteOutcome::TestNotification { result },
        );
    }

    fn on_clear_logs(&mut self) {
        if self.busy.contains(&ControlKind::ClearLogs) {
            return;
        }
        self.request_confirmation(
            PendingAction::ClearLogs,
            "Clear all notification logs? This cannot be undone.",
        );
    }

    fn on_navigation(&mut self, target: NavigationTarget) {
        if self.sync.is_dirty() {
            self.request_confirmation(
                PendingAction::Navigate(target),
                "You have unsaved changes. Leave this page and discard them?",
            );
        } else {
            self.proceed_navigation(target);
        }
    }

    fn on_confirmation(&mut self, id: ConfirmId, confirmed: bool) {
        let Some(pos) = self.confirmations.iter().position(|(cid, _)| *cid == id) else {
            return;
        };
        let (_, action) = self.confirmations.remove(pos);
        if !confirmed {
            return;
        }
        match action {
            PendingAction::Navigate(target) => {
                // The user chose to discard; the page is going away.
                self.sync.force_clean();
                self.proceed_navigation(target);
            }
            PendingAction::ClearLogs => {
                self.begin_busy(ControlKind::ClearLogs);
                self.spawn_call(AdminAction::ClearLogs, |result| RemoteOutcome::ClearLogs {
                    result,
                });
            }
        }
    }

    fn proceed_navigation(&mut self, target: NavigationTarget) {
        if target == NavigationTarget::BackToList && self.page.kind() == PageKind::FormDetail {
            if let Some(form_id) = self.detail_form_id() {
                let enabled = self
                    .toggles
                    .displayed(form_id)
                    .or_else(|| self.page.form(form_id).map(|form| form.flag(fields::ENABLED)))
                    .unwrap_or(false);
                self.record_last_status(LastKnownStatus::new(form_id, enabled));
                if let Err(err) = self.store.set_returning_from_detail() {
                    warn!(error = %err, "could not set the back-navigation marker");
                }
            }
        }
        self.effects.push(UiEffect::ProceedNavigation(target));
    }

    // ---- timers ----

    fn run_due_dirty_checks(&mut self, now: Instant) {
        for form_id in self.dirty.due(now) {
            let Some(form) = self.page.form(form_id) else {
                continue;
            };
            if let Some(dirty) = self.dirty.recheck(form, &mut self.sync) {
                self.effects.push(UiEffect::SetDirtyIndicator { form_id, dirty });
            }
        }
    }

    fn schedule_reconciles(&mut self, now: Instant) {
        if !self.page.has_toggles() {
            return;
        }
        self.reconciles.push(now + RECONCILE_INITIAL_DELAY);
        match self.store.take_returning_from_detail() {
            Ok(true) => {
                debug!("returning from a detail page, scheduling extra reconciliation");
                self.reconciles.push(now + BACK_NAV_PASS_DELAY);
                self.reconciles.push(now + BACK_NAV_RETRY_DELAY);
            }
            Ok(false) => {}
            Err(err) => warn!(error = %err, "could not read the back-navigation marker"),
        }
    }

    fn run_due_reconciles(&mut self, now: Instant) {
        if !self.reconciles.iter().any(|at| *at <= now) {
            return;
        }
        // Several due passes collapse into a single batch query.
        self.reconciles.retain(|at| *at > now);
        let form_ids: Vec<FormId> = self.page.toggles().keys().copied().collect();
        if form_ids.is_empty() {
            return;
        }
        debug!(count = form_ids.len(), "reconciling toggle statuses");
        self.spawn_call(AdminAction::GetFormsStatus { form_ids }, |result| {
            RemoteOutcome::StatusBatch { result }
        });
    }

    // ---- completions ----

    fn apply_outcome(&mut self, outcome: RemoteOutcome, now: Instant) {
        match outcome {
            RemoteOutcome::GeneralSave { result } => self.finish_general_save(result, now),
            RemoteOutcome::FormSave {
                form_id,
                submitted_enabled,
                result,
            } => self.finish_form_save(form_id, submitted_enabled, result, now),
            RemoteOutcome::AutoAdjust { form_id, result } => {
                self.finish_auto_adjust(form_id, result, now);
            }
            RemoteOutcome::Toggle { form_id, result } => self.finish_toggle(form_id, result, now),
            RemoteOutcome::TestConnection { result } => self.finish_plain(
                ControlKind::TestConnection,
                "test_connection",
                result,
                "Connection test passed.",
                "Connection test failed.",
                now,
            ),
            RemoteOutcome::TestNotification { result } => self.finish_plain(
                ControlKind::TestNotification,
                "test_form_notification",
                result,
                "Test notification sent.",
                "Test notification failed.",
                now,
            ),
            RemoteOutcome::ClearLogs { result } => self.finish_clear_logs(result, now),
            RemoteOutcome::StatusBatch { result } => self.finish_status_batch(result),
            RemoteOutcome::ConfigCheck { result } => self.finish_config_check(result, now),
        }
    }

    fn finish_general_save(&mut self, result: CallResult, now: Instant) {
        self.end_busy(ControlKind::SaveGeneral);
        let Some(form_id) = self.page.forms().first().map(FormModel::id) else {
            return;
        };
        match result {
            Ok(response) if response.success => {
                self.push_notice(
                    NoticeLevel::Success,
                    or_default(response.data.message, "Settings saved."),
                    now,
                );
                self.effects.push(UiEffect::ClearFieldAnnotations { form_id });
                self.rebaseline(form_id);
            }
            Ok(response) => {
                self.push_notice(
                    NoticeLevel::Error,
                    or_default(response.data.message, "The settings could not be saved."),
                    now,
                );
                self.render_server_errors(form_id, &response.data.errors);
            }
            Err(err) => self.transport_failure("save_general_settings", &err, now),
        }
    }

    fn finish_form_save(
        &mut self,
        form_id: FormId,
        submitted_enabled: bool,
        result: CallResult,
        now: Instant,
    ) {
        self.end_busy(ControlKind::SaveForm);
        match result {
            Ok(response) if response.success => {
                self.push_notice(
                    NoticeLevel::Success,
                    or_default(response.data.message, "Notification settings saved."),
                    now,
                );
                self.effects.push(UiEffect::ClearFieldAnnotations { form_id });
                self.rebaseline(form_id);
                let enabled = response.data.status.unwrap_or(submitted_enabled);
                self.record_last_status(LastKnownStatus::new(form_id, enabled));
            }
            Ok(response) => {
                self.push_notice(
                    NoticeLevel::Error,
                    or_default(response.data.message, "The settings could not be saved."),
                    now,
                );
                self.render_server_errors(form_id, &response.data.errors);
            }
            Err(err) => self.transport_failure("save_form_settings", &err, now),
        }
    }

    fn finish_auto_adjust(&mut self, form_id: FormId, result: CallResult, now: Instant) {
        match result {
            Ok(response) if response.success => {
                debug!(%form_id, "recipient mode correction persisted");
            }
            Ok(response) => {
                warn!(%form_id, message = %response.data.message, "recipient mode correction rejected");
                self.push_notice(
                    NoticeLevel::Error,
                    "The corrected recipient mode could not be saved. It will be kept on the next save.",
                    now,
                );
            }
            Err(err) => self.transport_failure("auto_adjust_form_settings", &err, now),
        }
    }

    fn finish_toggle(&mut self, form_id: FormId, result: CallResult, now: Instant) {
        match result {
            Ok(response) if response.success => {
                let Some(enabled) = self.toggles.confirm(form_id, response.data.status) else {
                    return;
                };
                self.effects.push(UiEffect::SetToggleDisplay {
                    form_id,
                    display: ToggleDisplay::settled(enabled),
                });
                let fallback = if enabled {
                    "Form notifications activated."
                } else {
                    "Form notifications deactivated."
                };
                self.push_notice(
                    NoticeLevel::Success,
                    or_default(response.data.message, fallback),
                    now,
                );
                self.record_last_status(LastKnownStatus::new(form_id, enabled));
                self.mirror_into_detail(form_id, enabled);
            }
            Ok(response) => {
                self.rollback_toggle(form_id);
                self.push_notice(
                    NoticeLevel::Error,
                    or_default(response.data.message, "The form status could not be changed."),
                    now,
                );
            }
            Err(err) => {
                self.rollback_toggle(form_id);
                self.transport_failure("toggle_form_status", &err, now);
            }
        }
    }

    fn rollback_toggle(&mut self, form_id: FormId) {
        if let Some(restored) = self.toggles.fail(form_id) {
            self.effects.push(UiEffect::SetToggleDisplay {
                form_id,
                display: ToggleDisplay::settled(restored),
            });
        }
    }

    /// Forward a confirmed toggle value into an open detail view.
    fn mirror_into_detail(&mut self, form_id: FormId, enabled: bool) {
        if self.page.kind() != PageKind::FormDetail {
            return;
        }
        let Some(form) = self.page.form_mut(form_id) else {
            return;
        };
        if form.flag(fields::ENABLED) != enabled {
            form.set(fields::ENABLED, enabled);
            self.effects.push(UiEffect::SetFieldValue {
                form_id,
                field: FieldId::from(fields::ENABLED),
                value: FieldValue::Flag(enabled),
            });
        }
        // Server truth joins the baseline, so the mirror never reads as an
        // unsaved edit while outstanding user edits keep comparing against
        // their own captured values. No keystroke happened, so the recheck
        // skips the debounce.
        self.dirty.absorb_field(form_id, fields::ENABLED, enabled);
        if let Some(form) = self.page.form(form_id) {
            if let Some(dirty) = self.dirty.recheck(form, &mut self.sync) {
                self.effects.push(UiEffect::SetDirtyIndicator { form_id, dirty });
            }
        }
    }

    fn finish_plain(
        &mut self,
        control: ControlKind,
        context: &'static str,
        result: CallResult,
        ok_default: &str,
        fail_default: &str,
        now: Instant,
    ) {
        self.end_busy(control);
        match result {
            Ok(response) if response.success => {
                self.push_notice(
                    NoticeLevel::Success,
                    or_default(response.data.message, ok_default),
                    now,
                );
            }
            Ok(response) => {
                self.push_notice(
                    NoticeLevel::Error,
                    or_default(response.data.message, fail_default),
                    now,
                );
            }
            Err(err) => self.transport_failure(context, &err, now),
        }
    }

    fn finish_clear_logs(&mut self, result: CallResult, now: Instant) {
        self.end_busy(ControlKind::ClearLogs);
        match result {
            Ok(response) if response.success => {
                self.effects.push(UiEffect::ClearLogPanel);
                self.push_notice(
                    NoticeLevel::Success,
                    or_default(response.data.message, "Logs cleared."),
                    now,
                );
            }
            Ok(response) => {
                self.push_notice(
                    NoticeLevel::Error,
                    or_default(response.data.message, "The logs could not be cleared."),
                    now,
                );
            }
            Err(err) => self.transport_failure("clear_logs", &err, now),
        }
    }

    fn finish_status_batch(&mut self, result: CallResult) {
        match result {
            Ok(response) if response.success => {
                for (form_id, enabled) in self.toggles.reconcile(&response.data.statuses) {
                    self.effects.push(UiEffect::SetToggleDisplay {
                        form_id,
                        display: ToggleDisplay::settled(enabled),
                    });
                }
            }
            // Background pass: displayed values stay as rendered and the
            // next scheduled pass gets another chance.
            Ok(_) => warn!("status reconciliation returned a failure verdict"),
            Err(err) => warn!(error = %err, "status reconciliation failed"),
        }
        self.apply_mailbox();
    }

    /// Overlay a forwarded status from the mailbox, consuming it.
    fn apply_mailbox(&mut self) {
        let status = match self.store.take_last_status() {
            Ok(Some(status)) => status,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "could not read the status mailbox");
                return;
            }
        };
        debug!(form_id = %status.form_id, enabled = status.enabled, "applying forwarded status");
        if let Some(enabled) = self.toggles.apply_last_known(status) {
            self.effects.push(UiEffect::SetToggleDisplay {
                form_id: status.form_id,
                display: ToggleDisplay::settled(enabled),
            });
        }
    }

    fn finish_config_check(&mut self, result: CallResult, now: Instant) {
        match result {
            Ok(response) if response.success && response.data.is_complete != Some(false) => {
                self.gate.record_complete();
            }
            // Any readable verdict short of confirmed-complete closes the
            // gate; the banner carries whatever findings came along. Only a
            // transport failure leaves the page usable.
            Ok(response) => {
                if !response.success {
                    warn!(message = %response.data.message, "configuration check returned a failure verdict");
                }
                let banner = self.gate.record_incomplete(&response.data.validation_results);
                self.effects.push(UiEffect::ShowConfigBanner(banner));
                self.disable_gated_actions();
            }
            Err(err) => {
                warn!(error = %err, "configuration check failed");
                self.push_notice(
                    NoticeLevel::Error,
                    "The configuration could not be verified.",
                    now,
                );
            }
        }
    }

    fn disable_gated_actions(&mut self) {
        let Some(reason) = self.gate.blocked_reason() else {
            return;
        };
        if self.page.kind() == PageKind::FormDetail {
            self.effects.push(UiEffect::DisableAction {
                action: GatedAction::TestNotification,
                reason: reason.to_owned(),
            });
        }
        let ids: Vec<FormId> = self.page.toggles().keys().copied().collect();
        for form_id in ids {
            self.effects.push(UiEffect::DisableAction {
                action: GatedAction::ToggleForm(form_id),
                reason: reason.to_owned(),
            });
        }
    }

    // ---- plumbing ----

    fn init_recipient_mode(&mut self, now: Instant) {
        if self.page.kind() != PageKind::FormDetail {
            return;
        }
        let Some(form_id) = self.detail_form_id() else {
            return;
        };
        let stored = self
            .page
            .form(form_id)
            .and_then(|form| RecipientMode::parse(form.text(fields::RECIPIENT_MODE)))
            .unwrap_or_default();
        let (controller, outcome) =
            RecipientModeController::new(stored, self.page.dynamic_capable());
        let mode = controller.mode();
        self.recipient = Some(controller);
        self.effects.push(UiEffect::ShowRecipientPanel { form_id, mode });

        if outcome != InitOutcome::Downgraded {
            return;
        }
        if let Some(form) = self.page.form_mut(form_id) {
            form.set(fields::RECIPIENT_MODE, FieldValue::choice(mode.as_str()));
        }
        self.effects.push(UiEffect::SetFieldValue {
            form_id,
            field: FieldId::from(fields::RECIPIENT_MODE),
            value: FieldValue::choice(mode.as_str()),
        });
        self.push_notice(
            NoticeLevel::Info,
            "Dynamic recipient mode needs a phone-type field, which this form does not have. \
             The default recipient is used instead.",
            now,
        );
        // Background save so the stored settings match what the user sees.
        let settings = self.page.form(form_id).map(|form| {
            let recipient = form.text(fields::RECIPIENT).to_owned();
            form_payload(form, mode, recipient)
        });
        if let Some(settings) = settings {
            self.spawn_call(
                AdminAction::AutoAdjustFormSettings { form_id, settings },
                move |result| RemoteOutcome::AutoAdjust { form_id, result },
            );
        }
    }

    fn detail_form_id(&self) -> Option<FormId> {
        (self.page.kind() == PageKind::FormDetail)
            .then(|| self.page.forms().first().map(FormModel::id))
            .flatten()
    }

    fn rebaseline(&mut self, form_id: FormId) {
        let Some(form) = self.page.form(form_id) else {
            return;
        };
        if let Some(dirty) = self.dirty.reset_baseline(form, &mut self.sync) {
            self.effects.push(UiEffect::SetDirtyIndicator { form_id, dirty });
        }
    }

    fn render_server_errors(&mut self, form_id: FormId, errors: &BTreeMap<String, String>) {
        let mut first: Option<FieldId> = None;
        for (field, message) in errors {
            let field = FieldId::from(field.as_str());
            if first.is_none() {
                first = Some(field.clone());
            }
            self.effects.push(UiEffect::SetFieldAnnotation {
                form_id,
                field,
                annotation: FieldAnnotation::error(message),
            });
        }
        if let Some(field) = first {
            self.effects.push(UiEffect::FocusField { form_id, field });
        }
    }

    fn record_last_status(&mut self, status: LastKnownStatus) {
        if let Err(err) = self.store.put_last_status(status) {
            warn!(error = %err, "could not record the last known status");
        }
    }

    fn transport_failure(&mut self, context: &'static str, err: &ClientError, now: Instant) {
        warn!(error = %err, context, transient = err.is_transient(), "admin request failed");
        self.push_notice(NoticeLevel::Error, TRANSPORT_FAILURE_NOTICE, now);
    }

    fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        let notice = self.notices.push(level, message, now);
        self.effects.push(UiEffect::ShowNotice(notice));
    }

    fn begin_busy(&mut self, control: ControlKind) {
        self.busy.insert(control);
        self.effects.push(UiEffect::SetControlBusy {
            control,
            busy: true,
        });
    }

    fn end_busy(&mut self, control: ControlKind) {
        if self.busy.remove(&control) {
            self.effects.push(UiEffect::SetControlBusy {
                control,
                busy: false,
            });
        }
    }

    fn request_confirmation(&mut self, action: PendingAction, prompt: &str) {
        let id = ConfirmId::new(self.next_confirm);
        self.next_confirm += 1;
        self.confirmations.push((id, action));
        self.effects
            .push(UiEffect::RequestConfirmation(ConfirmationRequest {
                id,
                prompt: prompt.to_owned(),
            }));
    }

    fn spawn_call<F>(&mut self, action: AdminAction, wrap: F)
    where
        F: FnOnce(CallResult) -> RemoteOutcome + Send + 'static,
    {
        self.pending_remote += 1;
        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = client.dispatch(&action).await;
            // The console may be gone during shutdown; a closed channel is fine.
            let _ = tx.send(wrap(result));
        });
    }
}

/// Assemble the save payload from a form's current fields.
fn form_payload(form: &FormModel, mode: RecipientMode, recipient: String) -> FormSettingsPayload {
    FormSettingsPayload {
        enabled: form.flag(fields::ENABLED),
        recipient_mode: mode,
        recipient,
        recipient_field: form.text(fields::RECIPIENT_FIELD).to_owned(),
        message_template: form.text(fields::MESSAGE_TEMPLATE).to_owned(),
        included_fields: if form.flag(fields::INCLUDE_ALL_FIELDS) {
            vec![FormSettingsPayload::INCLUDE_ALL.to_owned()]
        } else {
            form.included_field_names()
        },
    }
}

fn or_default(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notices::NOTICE_TTL;
    use crate::store::{MemoryStore, StoreError};
    use std::sync::{Arc, Mutex};

    /// Store handle the test keeps after the console takes ownership.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl StatusStore for SharedStore {
        fn put_last_status(&mut self, status: LastKnownStatus) -> Result<(), StoreError> {
            self.0.lock().unwrap().put_last_status(status)
        }

        fn take_last_status(&mut self) -> Result<Option<LastKnownStatus>, StoreError> {
            self.0.lock().unwrap().take_last_status()
        }

        fn set_returning_from_detail(&mut self) -> Result<(), StoreError> {
            self.0.lock().unwrap().set_returning_from_detail()
        }

        fn take_returning_from_detail(&mut self) -> Result<bool, StoreError> {
            self.0.lock().unwrap().take_returning_from_detail()
        }
    }

    fn test_client() -> AdminClient {
        // Nothing listens here; tests that need real responses live in the
        // integration suite.
        let target = switchboard_client::AdminTarget::new(
            "http://127.0.0.1:9/admin-ajax.php",
            "unit-test-token",
        )
        .unwrap();
        AdminClient::new(target)
    }

    fn detail_form(id: u64) -> FormModel {
        FormModel::new(FormId::new(id))
            .with_field(fields::ENABLED, true)
            .with_field(fields::RECIPIENT_MODE, FieldValue::choice("manual"))
            .with_field(fields::RECIPIENT, "+628123456789")
            .with_field(fields::MESSAGE_TEMPLATE, "New entry: {name}")
            .with_field(fields::INCLUDE_ALL_FIELDS, true)
    }

    fn settings_form() -> FormModel {
        FormModel::new(FormId::new(0))
            .with_field(fields::API_URL, "http://api.example.com/send")
            .with_field(fields::ACCESS_TOKEN, "secret-token")
            .with_field(fields::DEFAULT_RECIPIENT, "+628111222333")
            .with_field(fields::DEFAULT_TEMPLATE, "You have a new submission")
            .with_field(fields::ENABLE_LOGGING, true)
    }

    fn detail_console(dynamic_capable: bool) -> Console {
        let page = PageModel::form_detail(detail_form(7), dynamic_capable);
        Console::new(
            test_client(),
            page,
            Box::new(SharedStore::default()),
            None,
        )
    }

    fn contains_dirty_indicator(effects: &[UiEffect], want: bool) -> bool {
        effects
            .iter()
            .any(|effect| matches!(effect, UiEffect::SetDirtyIndicator { dirty, .. } if *dirty == want))
    }

    #[tokio::test(start_paused = true)]
    async fn edit_marks_dirty_after_one_debounce_window() {
        let mut console = detail_console(true);
        console.start();
        console.take_effects();

        console.handle(UiEvent::FieldEdited {
            form_id: FormId::new(7),
            field: FieldId::from(fields::MESSAGE_TEMPLATE),
            value: FieldValue::text("Changed template text"),
        });
        console.tick();
        assert!(!console.is_dirty());

        tokio::time::advance(crate::dirty::EDIT_DEBOUNCE).await;
        console.tick();
        assert!(console.is_dirty());
        assert!(contains_dirty_indicator(&console.take_effects(), true));
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_edit_goes_back_to_clean() {
        let mut console = detail_console(true);
        console.start();
        console.take_effects();
        let form_id = FormId::new(7);

        console.handle(UiEvent::FieldEdited {
            form_id,
            field: FieldId::from(fields::MESSAGE_TEMPLATE),
            value: FieldValue::text("Changed template text"),
        });
        tokio::time::advance(crate::dirty::EDIT_DEBOUNCE).await;
        console.tick();
        assert!(console.is_dirty());

        console.handle(UiEvent::FieldEdited {
            form_id,
            field: FieldId::from(fields::MESSAGE_TEMPLATE),
            value: FieldValue::text("New entry: {name}"),
        });
        tokio::time::advance(crate::dirty::EDIT_DEBOUNCE).await;
        console.tick();
        assert!(!console.is_dirty());
        assert!(contains_dirty_indicator(&console.take_effects(), false));
    }

    #[tokio::test(start_paused = true)]
    async fn next_deadline_tracks_the_earliest_timer() {
        let mut console = detail_console(true);
        let start = Instant::now();
        console.start();
        console.take_effects();

        // Page load arms the reconciliation pass.
        assert_eq!(console.next_deadline(), Some(start + RECONCILE_INITIAL_DELAY));

        // An edit arms the shorter debounce in front of it.
        console.handle(UiEvent::FieldEdited {
            form_id: FormId::new(7),
            field: FieldId::from(fields::MESSAGE_TEMPLATE),
            value: FieldValue::text("Changed template text"),
        });
        assert_eq!(
            console.next_deadline(),
            Some(start + crate::dirty::EDIT_DEBOUNCE)
        );

        tokio::time::advance(crate::dirty::EDIT_DEBOUNCE).await;
        console.tick();
        console.take_effects();
        assert_eq!(console.next_deadline(), Some(start + RECONCILE_INITIAL_DELAY));
    }

    #[tokio::test(start_paused = true)]
    async fn clean_navigation_proceeds_without_confirmation() {
        let mut console = detail_console(true);
        console.start();
        console.take_effects();

        console.handle(UiEvent::NavigationRequested {
            target: NavigationTarget::Away,
        });
        let effects = console.take_effects();
        assert!(effects
            .iter()
            .any(|e| matches!(e, UiEffect::ProceedNavigation(NavigationTarget::Away))));
        assert!(!effects
            .iter()
            .any(|e| matches!(e, UiEffect::RequestConfirmation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn dirty_navigation_requires_confirmation() {
        let store = SharedStore::default();
        let page = PageModel::form_detail(detail_form(7), true);
        let mut console = Console::new(test_client(), page, Box::new(store.clone()), None);
        console.start();
        console.take_effects();
        let form_id = FormId::new(7);

        console.handle(UiEvent::FieldEdited {
            form_id,
            field: FieldId::from(fields::MESSAGE_TEMPLATE),
            value: FieldValue::text("Changed template text"),
        });
        tokio::time::advance(crate::dirty::EDIT_DEBOUNCE).await;
        console.tick();

        console.handle(UiEvent::NavigationRequested {
            target: NavigationTarget::BackToList,
        });
        let effects = console.take_effects();
        let confirm_id = effects
            .iter()
            .find_map(|e| match e {
                UiEffect::RequestConfirmation(request) => Some(request.id),
                _ => None,
            })
            .expect("confirmation requested");
        assert!(!effects
            .iter()
            .any(|e| matches!(e, UiEffect::ProceedNavigation(_))));

        console.handle(UiEvent::ConfirmationAnswered {
            id: confirm_id,
            confirmed: true,
        });
        let effects = console.take_effects();
        assert!(effects
            .iter()
            .any(|e| matches!(e, UiEffect::ProceedNavigation(NavigationTarget::BackToList))));
        assert!(!console.is_dirty());

        // Back navigation leaves the mailbox and marker for the next page.
        assert!(store.clone().take_returning_from_detail().unwrap());
        assert_eq!(
            store.clone().take_last_status().unwrap(),
            Some(LastKnownStatus::new(form_id, true))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn declined_confirmation_stays_on_the_page() {
        let mut console = detail_console(true);
        console.start();
        console.take_effects();
        let form_id = FormId::new(7);

        console.handle(UiEvent::FieldEdited {
            form_id,
            field: FieldId::from(fields::MESSAGE_TEMPLATE),
            value: FieldValue::text("Changed template text"),
        });
        tokio::time::advance(crate::dirty::EDIT_DEBOUNCE).await;
        console.tick();

        console.handle(UiEvent::NavigationRequested {
            target: NavigationTarget::Away,
        });
        let confirm_id = console
            .take_effects()
            .iter()
            .find_map(|e| match e {
                UiEffect::RequestConfirmation(request) => Some(request.id),
                _ => None,
            })
            .expect("confirmation requested");

        console.handle(UiEvent::ConfirmationAnswered {
            id: confirm_id,
            confirmed: false,
        });
        assert!(!console
            .take_effects()
            .iter()
            .any(|e| matches!(e, UiEffect::ProceedNavigation(_))));
        assert!(console.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn stored_dynamic_mode_downgrades_cleanly_at_start() {
        let form = detail_form(7)
            .with_field(fields::RECIPIENT_MODE, FieldValue::choice("dynamic"));
        let page = PageModel::form_detail(form, false);
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();

        assert_eq!(console.recipient_mode(), Some(RecipientMode::Default));
        let effects = console.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::ShowRecipientPanel {
                mode: RecipientMode::Default,
                ..
            }
        )));
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldValue { field, .. } if field.as_str() == fields::RECIPIENT_MODE
        )));
        assert!(effects.iter().any(
            |e| matches!(e, UiEffect::ShowNotice(n) if n.level() == NoticeLevel::Info)
        ));

        // A system correction is not an unsaved edit.
        tokio::time::advance(crate::dirty::EDIT_DEBOUNCE).await;
        console.tick();
        assert!(!console.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_dynamic_without_capability_snaps_back() {
        let mut console = detail_console(false);
        console.start();
        console.take_effects();

        console.handle(UiEvent::ModeSelected {
            form_id: FormId::new(7),
            mode: RecipientMode::Dynamic,
        });
        let effects = console.take_effects();
        assert_eq!(console.recipient_mode(), Some(RecipientMode::Manual));
        assert!(effects.iter().any(
            |e| matches!(e, UiEffect::ShowNotice(n) if n.level() == NoticeLevel::Info)
        ));
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldValue { field, value, .. }
                if field.as_str() == fields::RECIPIENT_MODE
                    && value.as_str() == Some("manual")
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn entering_manual_mode_revalidates_the_recipient() {
        let form = detail_form(7)
            .with_field(fields::RECIPIENT_MODE, FieldValue::choice("default"))
            .with_field(fields::RECIPIENT, "");
        let page = PageModel::form_detail(form, true);
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();
        console.take_effects();

        console.handle(UiEvent::ModeSelected {
            form_id: FormId::new(7),
            mode: RecipientMode::Manual,
        });
        let effects = console.take_effects();
        // The stored empty number surfaces without waiting for an edit.
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldAnnotation { field, annotation, .. }
                if field.as_str() == fields::RECIPIENT && annotation.is_blocking()
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn entering_dynamic_mode_flags_the_placeholder_selection() {
        let form = detail_form(7).with_field(fields::RECIPIENT_FIELD, FieldValue::choice("--"));
        let page = PageModel::form_detail(form, true);
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();
        console.take_effects();

        console.handle(UiEvent::ModeSelected {
            form_id: FormId::new(7),
            mode: RecipientMode::Dynamic,
        });
        let effects = console.take_effects();
        assert_eq!(console.recipient_mode(), Some(RecipientMode::Dynamic));
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldAnnotation { field, .. }
                if field.as_str() == fields::RECIPIENT_FIELD
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn second_flip_while_pending_is_ignored() {
        let mut console = detail_console(true);
        console.start();
        console.take_effects();
        let form_id = FormId::new(7);

        console.handle(UiEvent::ToggleFlipped { form_id });
        let first = console.take_effects();
        assert!(first.iter().any(|e| matches!(
            e,
            UiEffect::SetToggleDisplay { display, .. } if display.pending
        )));

        console.handle(UiEvent::ToggleFlipped { form_id });
        let second = console.take_effects();
        assert!(!second
            .iter()
            .any(|e| matches!(e, UiEffect::SetToggleDisplay { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn blur_rewrites_local_number_to_international_form() {
        let page = PageModel::settings(
            settings_form().with_field(fields::DEFAULT_RECIPIENT, "08123456789"),
        );
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();
        console.take_effects();
        let form_id = FormId::new(0);

        console.handle(UiEvent::FieldBlurred {
            form_id,
            field: FieldId::from(fields::DEFAULT_RECIPIENT),
        });
        let effects = console.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldValue { field, value, .. }
                if field.as_str() == fields::DEFAULT_RECIPIENT
                    && value.as_str() == Some("+628123456789")
        )));
        assert_eq!(
            console.page().form(form_id).unwrap().text(fields::DEFAULT_RECIPIENT),
            "+628123456789"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn blurring_an_empty_number_is_flagged_at_once() {
        let page = PageModel::settings(settings_form().with_field(fields::DEFAULT_RECIPIENT, "  "));
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();
        console.take_effects();

        console.handle(UiEvent::FieldBlurred {
            form_id: FormId::new(0),
            field: FieldId::from(fields::DEFAULT_RECIPIENT),
        });
        let effects = console.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldAnnotation { field, annotation, .. }
                if field.as_str() == fields::DEFAULT_RECIPIENT && annotation.is_blocking()
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_general_settings_block_the_save() {
        let page = PageModel::settings(
            settings_form().with_field(fields::API_URL, "example.com"),
        );
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();
        console.take_effects();
        let form_id = FormId::new(0);

        console.handle(UiEvent::SubmitRequested { form_id });
        let effects = console.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldAnnotation { field, annotation, .. }
                if field.as_str() == fields::API_URL && annotation.is_blocking()
        )));
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::FocusField { field, .. } if field.as_str() == fields::API_URL
        )));
        assert!(effects.iter().any(
            |e| matches!(e, UiEffect::ShowNotice(n) if n.level() == NoticeLevel::Error)
        ));
        // No request was started.
        assert!(!effects
            .iter()
            .any(|e| matches!(e, UiEffect::SetControlBusy { .. })));
        assert!(console.idle());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_mode_submit_requires_a_recipient() {
        let form = detail_form(7).with_field(fields::RECIPIENT, "");
        let page = PageModel::form_detail(form, true);
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();
        console.take_effects();

        console.handle(UiEvent::SubmitRequested {
            form_id: FormId::new(7),
        });
        let effects = console.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetFieldAnnotation { field, .. } if field.as_str() == fields::RECIPIENT
        )));
        // The save request never started.
        assert!(!effects
            .iter()
            .any(|e| matches!(e, UiEffect::SetControlBusy { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn notices_expire_after_their_ttl() {
        let mut console = detail_console(false);
        console.start();
        console.take_effects();

        // The rejection notice comes from selecting an impossible mode.
        console.handle(UiEvent::ModeSelected {
            form_id: FormId::new(7),
            mode: RecipientMode::Dynamic,
        });
        let shown = console
            .take_effects()
            .iter()
            .find_map(|e| match e {
                UiEffect::ShowNotice(notice) => Some(notice.id()),
                _ => None,
            })
            .expect("notice shown");

        tokio::time::advance(NOTICE_TTL).await;
        console.tick();
        let effects = console.take_effects();
        assert!(effects
            .iter()
            .any(|e| matches!(e, UiEffect::DismissNotice(id) if *id == shown)));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_logs_waits_for_confirmation() {
        let page = PageModel::settings(settings_form());
        let mut console = Console::new(test_client(), page, Box::new(SharedStore::default()), None);
        console.start();
        console.take_effects();

        console.handle(UiEvent::ClearLogsRequested);
        let effects = console.take_effects();
        let confirm_id = effects
            .iter()
            .find_map(|e| match e {
                UiEffect::RequestConfirmation(request) => Some(request.id),
                _ => None,
            })
            .expect("confirmation requested");
        assert!(console.idle());

        console.handle(UiEvent::ConfirmationAnswered {
            id: confirm_id,
            confirmed: true,
        });
        let effects = console.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            UiEffect::SetControlBusy {
                control: ControlKind::ClearLogs,
                busy: true,
            }
        )));
        assert!(!console.idle());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_notice_dismissal_emits_the_effect_once() {
        let mut console = detail_console(false);
        console.start();
        console.take_effects();
        console.handle(UiEvent::ModeSelected {
            form_id: FormId::new(7),
            mode: RecipientMode::Dynamic,
        });
        let id = console
            .take_effects()
            .iter()
            .find_map(|e| match e {
                UiEffect::ShowNotice(notice) => Some(notice.id()),
                _ => None,
            })
            .expect("notice shown");

        console.handle(UiEvent::NoticeDismissed { id });
        assert!(console
            .take_effects()
            .iter()
            .any(|e| matches!(e, UiEffect::DismissNotice(got) if *got == id)));

        // A second dismissal of the same id is a no-op.
        console.handle(UiEvent::NoticeDismissed { id });
        assert!(console.take_effects().is_empty());
    }
}
