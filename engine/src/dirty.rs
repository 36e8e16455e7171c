//! Unsaved-changes tracking against captured baselines.
//!
//! When a page loads, every tracked form's fields are canonicalized into a
//! baseline snapshot. Edits arm a short debounce; when it lapses the current
//! snapshot is compared with the baseline and the shared [`SyncState`] is
//! updated. A successful save re-captures the baseline, so reverting an edit
//! by hand makes the form clean again without touching the server.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use switchboard_types::{FieldId, FieldValue, FormId, FormSnapshot};

use crate::page::FormModel;

/// Quiet period after an edit before the snapshot comparison runs.
pub const EDIT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Whether anything on the page diverges from its baseline.
///
/// Owned by the console and passed into the components that change it; the
/// navigation guard reads it to decide whether leaving needs confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncState {
    dirty_form: Option<FormId>,
}

impl SyncState {
    pub fn is_dirty(&self) -> bool {
        self.dirty_form.is_some()
    }

    pub fn dirty_form(&self) -> Option<FormId> {
        self.dirty_form
    }

    fn record(&mut self, form_id: FormId, dirty: bool) {
        if dirty {
            self.dirty_form = Some(form_id);
        } else if self.dirty_form == Some(form_id) {
            self.dirty_form = None;
        }
    }

    /// Drop the dirty flag without a save, as when the user confirms
    /// discarding their changes.
    pub fn force_clean(&mut self) {
        self.dirty_form = None;
    }
}

/// Per-form baselines and debounce deadlines.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    baselines: BTreeMap<FormId, FormSnapshot>,
    deadlines: BTreeMap<FormId, Instant>,
    reported: BTreeMap<FormId, bool>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the form's current fields as its baseline.
    pub fn track(&mut self, form: &FormModel) {
        self.baselines.insert(form.id(), form.snapshot());
        self.reported.insert(form.id(), false);
    }

    /// Note an edit and arm (or re-arm) the form's debounce deadline.
    pub fn note_edit(&mut self, form_id: FormId, now: Instant) {
        if self.baselines.contains_key(&form_id) {
            self.deadlines.insert(form_id, now + EDIT_DEBOUNCE);
        }
    }

    /// Forms whose debounce has lapsed, ready for a recheck.
    pub fn due(&mut self, now: Instant) -> Vec<FormId> {
        let due: Vec<FormId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &due {
            self.deadlines.remove(id);
        }
        due
    }

    /// Compare the form against its baseline and update `sync`.
    ///
    /// Returns `Some(dirty)` when the indicator needs updating, `None` when
    /// the reported state is unchanged.
    pub fn recheck(&mut self, form: &FormModel, sync: &mut SyncState) -> Option<bool> {
        let baseline = self.baselines.get(&form.id())?;
        let dirty = form.snapshot() != *baseline;
        sync.record(form.id(), dirty);
        let previous = self.reported.insert(form.id(), dirty);
        (previous != Some(dirty)).then_some(dirty)
    }

    /// Adopt the form's current fields as the new baseline after a save.
    ///
    /// Returns `Some(false)` if the indicator was showing dirty and must be
    /// cleared.
    pub fn reset_baseline(&mut self, form: &FormModel, sync: &mut SyncState) -> Option<bool> {
        self.baselines.insert(form.id(), form.snapshot());
        self.deadlines.remove(&form.id());
        sync.record(form.id(), false);
        let previous = self.reported.insert(form.id(), false);
        (previous == Some(true)).then_some(false)
    }

    /// Fold a server-confirmed value for one field into the stored baseline.
    ///
    /// The rest of the baseline is untouched, so the user's own unsaved edits
    /// still read as dirty and reverting them by hand restores clean.
    pub fn absorb_field(
        &mut self,
        form_id: FormId,
        field: impl Into<FieldId>,
        value: impl Into<FieldValue>,
    ) {
        if let Some(baseline) = self.baselines.get_mut(&form_id) {
            *baseline = baseline.with_field(&field.into(), &value.into());
        }
    }

    /// Earliest armed deadline, for sleep scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }
}
