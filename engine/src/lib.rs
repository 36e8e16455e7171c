//! State synchronization engine for the Switchboard admin console.
//!
//! This crate contains the [`Console`] coordinator and its parts, with no
//! rendering dependencies. A frontend owns a `Console`, feeds it [`UiEvent`]
//! values, drives [`Console::tick`] on a timer, and applies the [`UiEffect`]
//! values it drains. Remote traffic goes through `switchboard-client`; every
//! comparison, validation, and rollback decision happens here.
//!
//! The moving parts, each usable on its own:
//!
//! - [`DirtyTracker`] and [`SyncState`]: baseline snapshots and the debounced
//!   unsaved-changes flag.
//! - [`ToggleSynchronizer`]: optimistic enable/disable flips with rollback
//!   and batched reconciliation.
//! - [`RecipientModeController`]: the recipient mode state machine including
//!   the automatic downgrade of impossible stored modes.
//! - [`ConfigurationGate`]: one-shot incomplete-configuration blocking.
//! - [`NoticeStack`]: transient notices with automatic dismissal.
//! - [`StatusStore`]: the cross-page mailbox for forwarded statuses and the
//!   back-navigation marker, file-backed or in-memory.

mod console;
mod dirty;
mod effects;
mod gate;
mod notices;
mod page;
mod recipient;
mod store;
mod toggles;

pub use console::{
    BACK_NAV_PASS_DELAY, BACK_NAV_RETRY_DELAY, Console, RECONCILE_INITIAL_DELAY, UiEvent,
};
pub use dirty::{DirtyTracker, EDIT_DEBOUNCE, SyncState};
pub use effects::{
    ConfirmId, ConfirmationRequest, ControlKind, EffectQueue, FieldAnnotation, GatedAction,
    NavigationTarget, ToggleDisplay, UiEffect,
};
pub use gate::{ConfigBanner, ConfigurationGate, GateFinding};
pub use notices::{NOTICE_TTL, Notice, NoticeId, NoticeLevel, NoticeStack};
pub use page::{FormModel, PageKind, PageModel, fields};
pub use recipient::{InitOutcome, ModeChange, RecipientModeController};
pub use store::{FileStore, MemoryStore, StatusStore, StoreError};
pub use toggles::{FlipOutcome, PendingFlip, ToggleState, ToggleSynchronizer};
