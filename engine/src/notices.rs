//! Transient notices with automatic dismissal.
//!
//! Success, error, and info messages share one stack. Each notice gets a
//! monotonically increasing id and a dismissal deadline; the console reaps
//! expired notices on tick and emits a dismiss effect for each, so a burst of
//! notices disappears in the order it appeared.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// How long a notice stays up before it dismisses itself.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Identifier for one rendered notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NoticeId(u64);

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notice-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One transient message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    id: NoticeId,
    level: NoticeLevel,
    message: String,
}

impl Notice {
    pub fn id(&self) -> NoticeId {
        self.id
    }

    pub fn level(&self) -> NoticeLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

/// Active notices ordered by creation, each with its dismissal deadline.
#[derive(Debug, Default)]
pub struct NoticeStack {
    next_id: u64,
    active: Vec<(Notice, Instant)>,
}

impl NoticeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notice expiring [`NOTICE_TTL`] from `now` and return a copy
    /// for the show effect.
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) -> Notice {
        let notice = Notice {
            id: NoticeId(self.next_id),
            level,
            message: message.into(),
        };
        self.next_id += 1;
        self.active.push((notice.clone(), now + NOTICE_TTL));
        notice
    }

    /// Remove a notice early, as when the user closes it by hand.
    ///
    /// Returns false if the id is unknown or already expired, which the
    /// console treats as a no-op rather than an error.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.active.len();
        self.active.retain(|(notice, _)| notice.id() != id);
        self.active.len() != before
    }

    /// Remove every notice whose deadline has passed, oldest first.
    pub fn reap_expired(&mut self, now: Instant) -> Vec<NoticeId> {
        let mut expired = Vec::new();
        self.active.retain(|(notice, deadline)| {
            if *deadline <= now {
                expired.push(notice.id());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Earliest outstanding deadline, for frontends that want to sleep
    /// exactly until the next dismissal.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.iter().map(|(_, deadline)| *deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }
}
