//! Status toggle synchronization.
//!
//! Flipping a toggle updates the display immediately and sends the request in
//! the background. The server's verdict is authoritative: a success adopts
//! whatever status the server reports, a failure or transport error rolls the
//! display back to the value before the flip. Per toggle there is at most one
//! request in flight; the control ignores input until the verdict lands.
//!
//! A periodic batched reconciliation overwrites displayed values with the
//! server's, correcting staleness from other tabs or sessions.

use std::collections::BTreeMap;

use switchboard_types::{FormId, LastKnownStatus};

/// An optimistic flip awaiting its server verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFlip {
    /// Displayed value before the flip, restored on failure.
    pub previous: bool,
    /// Value the user asked for.
    pub requested: bool,
}

/// One toggle's displayed value and in-flight request, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    displayed: bool,
    pending: Option<PendingFlip>,
}

impl ToggleState {
    pub fn displayed(&self) -> bool {
        self.displayed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Outcome of a flip attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// The display flipped; dispatch a request for `requested`.
    Started { requested: bool },
    /// A verdict is already outstanding; the input is dropped.
    AlreadyPending,
    /// No such toggle on this page.
    Unknown,
}

/// All toggles on the current page.
#[derive(Debug, Default)]
pub struct ToggleSynchronizer {
    toggles: BTreeMap<FormId, ToggleState>,
}

impl ToggleSynchronizer {
    /// Seed from the server-rendered initial positions.
    pub fn new(initial: impl IntoIterator<Item = (FormId, bool)>) -> Self {
        Self {
            toggles: initial
                .into_iter()
                .map(|(id, displayed)| {
                    (
                        id,
                        ToggleState {
                            displayed,
                            pending: None,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn get(&self, id: FormId) -> Option<ToggleState> {
        self.toggles.get(&id).copied()
    }

    pub fn displayed(&self, id: FormId) -> Option<bool> {
        self.toggles.get(&id).map(|state| state.displayed)
    }

    /// Flip optimistically and record the pending request.
    pub fn begin_flip(&mut self, id: FormId) -> FlipOutcome {
        let Some(state) = self.toggles.get_mut(&id) else {
            return FlipOutcome::Unknown;
        };
        if state.pending.is_some() {
            return FlipOutcome::AlreadyPending;
        }
        let requested = !state.displayed;
        state.pending = Some(PendingFlip {
            previous: state.displayed,
            requested,
        });
        state.displayed = requested;
        FlipOutcome::Started { requested }
    }

    /// Adopt the server's verdict for a successful flip.
    ///
    /// The server may report a status differing from the request; its value
    /// wins. With no reported status the requested value stands. Returns the
    /// settled display value.
    pub fn confirm(&mut self, id: FormId, server_status: Option<bool>) -> Option<bool> {
        let state = self.toggles.get_mut(&id)?;
        let fallback = match state.pending.take() {
            Some(flip) => flip.requested,
            None => state.displayed,
        };
        state.displayed = server_status.unwrap_or(fallback);
        Some(state.displayed)
    }

    /// Roll back a failed flip to the value before it.
    ///
    /// Returns the restored display value, or `None` when nothing was
    /// pending.
    pub fn fail(&mut self, id: FormId) -> Option<bool> {
        let state = self.toggles.get_mut(&id)?;
        let flip = state.pending.take()?;
        state.displayed = flip.previous;
        Some(state.displayed)
    }

    /// Overwrite displayed values with a batch of server statuses.
    ///
    /// A toggle with a flip in flight is skipped; its own verdict is fresher
    /// than the batch. Identifiers not on this page are ignored. Returns the
    /// toggles whose display changed.
    pub fn reconcile(&mut self, statuses: &BTreeMap<FormId, bool>) -> Vec<(FormId, bool)> {
        let mut changed = Vec::new();
        for (id, state) in &mut self.toggles {
            if state.pending.is_some() {
                continue;
            }
            if let Some(&server) = statuses.get(id) {
                if state.displayed != server {
                    state.displayed = server;
                    changed.push((*id, server));
                }
            }
        }
        changed
    }

    /// Apply a mailbox value carried over from another page.
    ///
    /// Returns `Some(value)` when the toggle exists, is idle, and actually
    /// changed.
    pub fn apply_last_known(&mut self, status: LastKnownStatus) -> Option<bool> {
        let state = self.toggles.get_mut(&status.form_id)?;
        if state.pending.is_some() || state.displayed == status.enabled {
            return None;
        }
        state.displayed = status.enabled;
        Some(state.displayed)
    }
}
